//! Build configuration.
//!
//! A [`BuildConfig`] names the token layers, the designs and slide sizes to
//! generate and every recovery policy. It is plain serde data, loaded from
//! YAML or JSON:
//!
//! ```yaml
//! layers:
//!   - { name: core, kind: core, path: tokens/core.json }
//! designs:
//!   - name: Corporate Blue
//!     layers:
//!       - { name: blue, kind: org, path: tokens/blue.yaml }
//! ratios: ["16:9", "4:3"]
//! variant_recovery: continue
//! output: dist/corporate.thmx
//! ```

use crate::common::{Error, Result};
use crate::geometry::MissingRatioPolicy;
use crate::patch::{ParseLimits, ParseMode, RecoveryStrategy};
use crate::supertheme::VariantRecovery;
use crate::tokens::layer::LayerFormat;
use crate::tokens::{LayerKind, ResolutionContext, TokenLayer};
use crate::validation::ValidatorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One token layer file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub kind: LayerKind,
    pub path: PathBuf,
}

impl LayerConfig {
    pub fn load(&self) -> Result<TokenLayer> {
        TokenLayer::from_path(self.name.clone(), self.kind, &self.path)
    }
}

/// A design: its name and the layers stacked on top of the shared ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignConfig {
    pub name: String,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

/// A baseline package and the plan to apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub baseline: PathBuf,
    pub plan: PathBuf,
}

/// What a build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    /// A patched copy of a baseline package
    Template,
    /// A multi-variant `.thmx`
    SuperTheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Layers shared by every design, in cascade order
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub designs: Vec<DesignConfig>,
    #[serde(default)]
    pub ratios: Vec<String>,
    /// Facts for conditional tokens (`channel: print`, ...)
    #[serde(default)]
    pub context: ResolutionContext,
    #[serde(default)]
    pub missing_ratio: MissingRatioPolicy,
    #[serde(default)]
    pub variant_recovery: VariantRecovery,
    #[serde(default)]
    pub patch_recovery: RecoveryStrategy,
    #[serde(default)]
    pub parse_mode: ParseMode,
    #[serde(default)]
    pub parse_limits: ParseLimits,
    #[serde(default)]
    pub validator: ValidatorConfig,
    /// Validation warnings become errors and any error blocks the output
    #[serde(default)]
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateConfig>,
    pub output: PathBuf,
}

impl BuildConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(format!("invalid JSON build config: {}", e)))
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_saphyr::from_str(text).map_err(|e| Error::Config(format!("invalid YAML build config: {}", e)))
    }

    /// Load a config file. Relative paths inside it are taken relative to
    /// the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = match LayerFormat::from_path(path)? {
            LayerFormat::Json => Self::from_json_str(&text)?,
            #[cfg(feature = "yaml")]
            LayerFormat::Yaml => Self::from_yaml_str(&text)?,
        };
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        config.validate()?;
        tracing::debug!(
            "loaded build config from {}: {} shared layer(s), {} design(s), {} ratio(s)",
            path.display(),
            config.layers.len(),
            config.designs.len(),
            config.ratios.len()
        );
        Ok(config)
    }

    /// Make every relative path relative to `base`.
    pub fn rebase(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.layers.iter_mut().for_each(|l| join(&mut l.path));
        for design in &mut self.designs {
            design.layers.iter_mut().for_each(|l| join(&mut l.path));
        }
        if let Some(template) = &mut self.template {
            join(&mut template.baseline);
            join(&mut template.plan);
        }
        join(&mut self.output);
    }

    pub fn target(&self) -> BuildTarget {
        if self.template.is_some() {
            BuildTarget::Template
        } else {
            BuildTarget::SuperTheme
        }
    }

    /// Validator settings with the build's strict flag applied.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            strict: self.strict || self.validator.strict,
            ..self.validator.clone()
        }
    }

    /// Check the config describes a buildable target.
    pub fn validate(&self) -> Result<()> {
        if self.output.as_os_str().is_empty() {
            return Err(Error::Config("no output path".to_string()));
        }
        match self.target() {
            BuildTarget::SuperTheme => {
                if self.designs.is_empty() {
                    return Err(Error::Config("a SuperTheme build needs at least one design".to_string()));
                }
                if self.ratios.is_empty() {
                    return Err(Error::Config("a SuperTheme build needs at least one ratio".to_string()));
                }
            },
            BuildTarget::Template => {
                if self.ratios.len() > 1 {
                    return Err(Error::Config(format!(
                        "a template build takes at most one ratio, got {}",
                        self.ratios.len()
                    )));
                }
                if self.designs.len() > 1 {
                    return Err(Error::Config(format!(
                        "a template build takes at most one design, got {}",
                        self.designs.len()
                    )));
                }
            },
        }
        if self.parse_limits.max_bytes == 0 || self.parse_limits.max_depth == 0 {
            return Err(Error::Config("parse limits must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "layers": [{"name": "core", "kind": "core", "path": "tokens/core.json"}],
        "designs": [
            {"name": "Acme", "layers": [{"name": "acme", "kind": "org", "path": "tokens/acme.json"}]},
            {"name": "Globex"}
        ],
        "ratios": ["16:9", "4:3"],
        "context": {"channel": "print"},
        "missing_ratio": "first_defined",
        "variant_recovery": "continue",
        "patch_recovery": "retry_with_fallback",
        "validator": {"max_file_bytes": 1024},
        "output": "dist/acme.thmx"
    }"#;

    #[test]
    fn test_json_config() {
        let config = BuildConfig::from_json_str(JSON).unwrap();
        config.validate().unwrap();
        assert_eq!(config.target(), BuildTarget::SuperTheme);
        assert_eq!(config.designs[1].layers.len(), 0);
        assert_eq!(config.context.get("channel"), Some("print"));
        assert_eq!(config.missing_ratio, MissingRatioPolicy::FirstDefined);
        assert_eq!(config.variant_recovery, VariantRecovery::Continue);
        assert_eq!(config.patch_recovery, RecoveryStrategy::RetryWithFallback);
        assert_eq!(config.parse_mode, ParseMode::Lenient);
        assert_eq!(config.validator.max_file_bytes, 1024);
        assert_eq!(config.validator.max_package_bytes, ValidatorConfig::default().max_package_bytes);
        assert!(!config.validator_config().strict);
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_config() {
        let config = BuildConfig::from_yaml_str(
            "designs:\n  - name: Acme\nratios: [\"16:9\"]\nmissing_ratio:\n  explicit_default_key: \"16:9\"\nstrict: true\noutput: out.thmx\n",
        )
        .unwrap();
        assert_eq!(
            config.missing_ratio,
            MissingRatioPolicy::ExplicitDefaultKey("16:9".to_string())
        );
        assert!(config.validator_config().strict);
    }

    #[test]
    fn test_rebase_relative_paths() {
        let mut config = BuildConfig::from_json_str(JSON).unwrap();
        config.rebase(Path::new("/srv/brand"));
        assert_eq!(config.layers[0].path, Path::new("/srv/brand/tokens/core.json"));
        assert_eq!(config.designs[0].layers[0].path, Path::new("/srv/brand/tokens/acme.json"));
        assert_eq!(config.output, Path::new("/srv/brand/dist/acme.thmx"));
    }

    #[test]
    fn test_rejects_unbuildable() {
        let no_designs = BuildConfig::from_json_str(r#"{"ratios": ["16:9"], "output": "x.thmx"}"#).unwrap();
        assert!(matches!(no_designs.validate(), Err(Error::Config(_))));

        let template = BuildConfig::from_json_str(
            r#"{"ratios": ["16:9", "4:3"], "template": {"baseline": "a.pptx", "plan": "p.json"}, "output": "x.pptx"}"#,
        )
        .unwrap();
        assert_eq!(template.target(), BuildTarget::Template);
        assert!(matches!(template.validate(), Err(Error::Config(_))));

        assert!(matches!(
            BuildConfig::from_json_str(r#"{"designs": []}"#),
            Err(Error::Config(_))
        ));
    }
}
