//! End-to-end builds driven by a [`BuildConfig`].
//!
//! The pipeline resolves each design's layers, generates and assembles the
//! SuperTheme (or patches the baseline template), validates the result and
//! writes it atomically. Nothing is written when a strict build fails
//! validation.

use crate::common::{Error, Result};
use crate::config::{BuildConfig, BuildTarget, TemplateConfig};
use crate::geometry::AspectRatioResolver;
use crate::patch::PatchEngine;
use crate::supertheme::{PackageAssembler, SuperThemeGenerator, VariantOmission};
use crate::template::{PatchPlan, TemplateBuilder, TemplateReport};
use crate::tokens::{ResolvedTokenSet, ResolvedTokens, TokenLayer, TokenResolver};
use crate::validation::{ValidationResult, Validator};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What a build wrote and what it found on the way.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub output: PathBuf,
    pub bytes_written: usize,
    pub variant_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub omissions: Vec<VariantOmission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateReport>,
}

pub struct Pipeline {
    config: BuildConfig,
}

impl Pipeline {
    pub fn new(config: BuildConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BuildConfig::from_path(path)?)
    }

    #[inline]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the configured target and write it to the output path.
    pub fn run(&self) -> Result<BuildReport> {
        match self.config.target() {
            BuildTarget::SuperTheme => self.run_supertheme(),
            BuildTarget::Template => match &self.config.template {
                Some(template) => self.run_template(template),
                None => Err(Error::Config("template build without a template".to_string())),
            },
        }
    }

    /// Resolve every design against the shared layers, which are loaded
    /// once.
    pub fn resolve_designs(&self) -> Result<Vec<(String, ResolvedTokens)>> {
        let shared = load_layers(&self.config.layers)?;
        let resolver = TokenResolver::new();
        self.config
            .designs
            .iter()
            .map(|design| {
                let mut layers = shared.clone();
                layers.extend(load_layers(&design.layers)?);
                let tokens = resolver.resolve(&layers, &self.config.context)?;
                Ok((design.name.clone(), tokens))
            })
            .collect()
    }

    fn ratio_resolver(&self) -> AspectRatioResolver {
        AspectRatioResolver::with_policy(self.config.missing_ratio.clone())
    }

    fn run_supertheme(&self) -> Result<BuildReport> {
        let designs = self.resolve_designs()?;
        let generator = SuperThemeGenerator::new(self.ratio_resolver(), self.config.variant_recovery);
        let package = generator.generate(&designs, &self.config.ratios)?;
        let bytes = PackageAssembler::new().assemble(&package)?;

        let validation = Validator::new(self.config.validator_config()).validate(&bytes);
        for issue in &validation.warnings {
            tracing::warn!("{}", issue);
        }
        let validation = if self.config.strict {
            validation.into_result()?
        } else {
            for issue in &validation.errors {
                tracing::warn!("{}", issue);
            }
            validation
        };

        write_atomic(&self.config.output, &bytes)?;
        Ok(BuildReport {
            output: self.config.output.clone(),
            bytes_written: bytes.len(),
            variant_count: package.variants().len(),
            omissions: package.omissions().to_vec(),
            validation: Some(validation),
            template: None,
        })
    }

    fn run_template(&self, template: &TemplateConfig) -> Result<BuildReport> {
        let tokens = self.template_tokens()?;
        let plan = PatchPlan::from_path(&template.plan)?;
        let baseline = std::fs::read(&template.baseline)?;

        let builder = TemplateBuilder::new(
            PatchEngine::new(self.config.patch_recovery),
            self.config.parse_mode,
            self.config.parse_limits,
        );
        let (bytes, report) = builder.build(&baseline, &plan, &tokens)?;
        if self.config.strict {
            let summary = report.summary();
            if let Some(first) = summary.warnings.first() {
                return Err(Error::ValidationFailed {
                    error_count: summary.warnings.len(),
                    first: first.clone(),
                });
            }
        }

        write_atomic(&self.config.output, &bytes)?;
        Ok(BuildReport {
            output: self.config.output.clone(),
            bytes_written: bytes.len(),
            variant_count: 0,
            omissions: Vec::new(),
            validation: None,
            template: Some(report),
        })
    }

    /// Flat tokens for a template build: the shared layers plus the single
    /// design, at the single ratio when one is configured.
    fn template_tokens(&self) -> Result<ResolvedTokenSet> {
        let mut layers = load_layers(&self.config.layers)?;
        if let Some(design) = self.config.designs.first() {
            layers.extend(load_layers(&design.layers)?);
        }
        let tokens = TokenResolver::new().resolve(&layers, &self.config.context)?;
        match self.config.ratios.first() {
            Some(ratio) => self.ratio_resolver().resolve(&tokens, ratio),
            None => tokens.flatten(),
        }
    }
}

fn load_layers(configs: &[crate::config::LayerConfig]) -> Result<Vec<TokenLayer>> {
    configs.iter().map(|layer| layer.load()).collect()
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// renamed into place once complete.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
