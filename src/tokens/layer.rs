//! Token layers: named, ordered sources of token overrides.

use super::value::TokenValue;
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Position of a layer in the override cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Core,
    Fork,
    Org,
    Group,
    Personal,
    Channel,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Core => "core",
            Self::Fork => "fork",
            Self::Org => "org",
            Self::Group => "group",
            Self::Personal => "personal",
            Self::Channel => "channel",
        })
    }
}

/// Source format of a layer file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerFormat {
    Json,
    #[cfg(feature = "yaml")]
    Yaml,
}

impl LayerFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(Error::Config(format!(
                "unsupported file extension: {}",
                path.display()
            ))),
        }
    }
}

/// One immutable layer of tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLayer {
    name: String,
    kind: LayerKind,
    source: Option<PathBuf>,
    tokens: TokenValue,
}

impl TokenLayer {
    /// Build a layer from an already-parsed token tree. The root must be a group.
    pub fn new(name: impl Into<String>, kind: LayerKind, tokens: TokenValue) -> Result<Self> {
        let name = name.into();
        if !matches!(tokens, TokenValue::Object(_)) {
            return Err(Error::InvalidToken {
                path: String::new(),
                reason: format!("root of layer '{}' must be a mapping", name),
            });
        }
        Ok(Self {
            name,
            kind,
            source: None,
            tokens,
        })
    }

    pub fn from_value(
        name: impl Into<String>,
        kind: LayerKind,
        value: &serde_json::Value,
    ) -> Result<Self> {
        Self::new(name, kind, TokenValue::from_json("", value)?)
    }

    pub fn from_json_str(name: impl Into<String>, kind: LayerKind, text: &str) -> Result<Self> {
        let name = name.into();
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::parse(name.clone(), format!("invalid JSON: {}", e)))?;
        Self::from_value(name, kind, &value)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(name: impl Into<String>, kind: LayerKind, text: &str) -> Result<Self> {
        let name = name.into();
        let value: serde_json::Value = serde_saphyr::from_str(text)
            .map_err(|e| Error::parse(name.clone(), format!("invalid YAML: {}", e)))?;
        Self::from_value(name, kind, &value)
    }

    /// Load a layer file, choosing the parser by extension.
    pub fn from_path(name: impl Into<String>, kind: LayerKind, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = name.into();
        let format = LayerFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;

        let mut layer = match format {
            LayerFormat::Json => Self::from_json_str(name, kind, &text)?,
            #[cfg(feature = "yaml")]
            LayerFormat::Yaml => Self::from_yaml_str(name, kind, &text)?,
        };
        tracing::debug!("loaded token layer '{}' ({}) from {}", layer.name, kind, path.display());
        layer.source = Some(path.to_path_buf());
        Ok(layer)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[inline]
    pub fn tokens(&self) -> &TokenValue {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_str() {
        let layer = TokenLayer::from_json_str(
            "core",
            LayerKind::Core,
            r##"{"colors": {"primary": "#0066CC"}}"##,
        )
        .unwrap();
        assert_eq!(layer.name(), "core");
        assert_eq!(layer.kind(), LayerKind::Core);
        assert!(layer.tokens().get("colors.primary").is_some());
    }

    #[test]
    fn test_root_must_be_mapping() {
        assert!(TokenLayer::from_json_str("core", LayerKind::Core, "\"x\"").is_err());
        let err = TokenLayer::from_json_str("core", LayerKind::Core, "{").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_keeps_ratio_order() {
        let text = "size:\n  $aspectRatio:\n    \"4:3\": 40\n    \"16:9\": 44\n";
        let layer = TokenLayer::from_yaml_str("org", LayerKind::Org, text).unwrap();
        match layer.tokens().get("size") {
            Some(TokenValue::AspectRatio(entries)) => {
                assert_eq!(entries[0].0, "4:3");
                assert_eq!(entries[1].0, "16:9");
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.json");
        std::fs::write(&path, r#"{"spacing": {"sm": 4}}"#).unwrap();
        let layer = TokenLayer::from_path("print", LayerKind::Channel, &path).unwrap();
        assert_eq!(layer.source(), Some(path.as_path()));

        let bad = dir.path().join("channel.toml");
        std::fs::write(&bad, "").unwrap();
        assert!(matches!(
            TokenLayer::from_path("print", LayerKind::Channel, &bad),
            Err(Error::Config(_))
        ));
    }
}
