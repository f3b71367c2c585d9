//! Unified error types for StyleStack.
//!
//! Every failure the build pipeline can report is a variant of [`Error`].
//! Variants carry the offending token path, xpath or package path so a
//! caller can report precisely what failed without parsing messages.
use thiserror::Error;

/// The pipeline component an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Component {
    TokenResolver,
    AspectRatioResolver,
    DocumentTypeStrategy,
    PatchEngine,
    SuperThemeGenerator,
    PackageAssembler,
    Validator,
    Config,
    Io,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::TokenResolver => "TokenResolver",
            Self::AspectRatioResolver => "AspectRatioResolver",
            Self::DocumentTypeStrategy => "DocumentTypeStrategy",
            Self::PatchEngine => "PatchEngine",
            Self::SuperThemeGenerator => "SuperThemeGenerator",
            Self::PackageAssembler => "PackageAssembler",
            Self::Validator => "Validator",
            Self::Config => "Config",
            Self::Io => "Io",
        };
        f.write_str(name)
    }
}

/// Main error type for StyleStack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP container error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A token path transitively references itself
    #[error("Circular token reference at '{path}': {}", .chain.join(" -> "))]
    CircularReference { path: String, chain: Vec<String> },

    /// A reference or lookup named a token that does not exist
    #[error("Missing token '{path}'{}", .referenced_by.as_ref().map(|r| format!(" (referenced by '{}')", r)).unwrap_or_default())]
    MissingToken {
        path: String,
        referenced_by: Option<String>,
    },

    /// A token value has a shape or content that cannot be used
    #[error("Invalid token at '{path}': {reason}")]
    InvalidToken { path: String, reason: String },

    /// A conditional could not be decided with the available context
    #[error("Unresolved conditional at '{path}'")]
    UnresolvedConditional { path: String },

    /// An aspect-ratio conditional has no value for the requested ratio
    #[error("Aspect-ratio conditional at '{path}' has no value for '{ratio}'")]
    MissingAspectRatio { path: String, ratio: String },

    /// The ratio id is neither standard nor a valid custom `W:H`
    #[error("Unknown aspect ratio: {0}")]
    UnknownAspectRatio(String),

    /// The ratio dimensions are unusable (zero width or height)
    #[error("Invalid aspect ratio: {0}")]
    InvalidAspectRatio(String),

    /// An xpath matched no node under fail-fast recovery
    #[error("XPath '{xpath}' matched no elements")]
    Targeting { xpath: String },

    /// An xpath could not be compiled or evaluated
    #[error("Invalid XPath '{xpath}': {reason}")]
    InvalidXPath { xpath: String, reason: String },

    /// XML could not be parsed (or repaired, in lenient mode)
    #[error("Parse error in {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// A single theme variant failed to generate
    #[error("Failed to generate variant '{design}' @ '{ratio}': {reason}")]
    Generation {
        design: String,
        ratio: String,
        reason: String,
    },

    /// Two different design names hashed to the same GUID
    #[error("GUID collision: '{first}' and '{second}' both map to {guid}")]
    GuidCollision {
        guid: String,
        first: String,
        second: String,
    },

    /// Missing part, broken relationship or content-type mismatch
    #[error("Package integrity error at '{path}': {reason}")]
    PackageIntegrity { path: String, reason: String },

    /// Validation found errors and the build runs in strict mode
    #[error("Validation failed with {error_count} error(s): {first}")]
    ValidationFailed { error_count: usize, first: String },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// XML writing or low-level XML error
    #[error("XML error: {0}")]
    Xml(String),
}

impl Error {
    /// The component that raised this error.
    pub fn component(&self) -> Component {
        match self {
            Self::Io(_) => Component::Io,
            Self::Zip(_) | Self::PackageIntegrity { .. } => Component::PackageAssembler,
            Self::CircularReference { .. }
            | Self::MissingToken { .. }
            | Self::InvalidToken { .. }
            | Self::UnresolvedConditional { .. } => Component::TokenResolver,
            Self::MissingAspectRatio { .. }
            | Self::UnknownAspectRatio(_)
            | Self::InvalidAspectRatio(_) => Component::AspectRatioResolver,
            Self::Targeting { .. } | Self::InvalidXPath { .. } | Self::Parse { .. } | Self::Xml(_) => {
                Component::PatchEngine
            },
            Self::Generation { .. } | Self::GuidCollision { .. } => Component::SuperThemeGenerator,
            Self::ValidationFailed { .. } => Component::Validator,
            Self::Config(_) => Component::Config,
        }
    }

    /// Whether this error always aborts a build regardless of recovery settings.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::GuidCollision { .. }
                | Self::PackageIntegrity { .. }
                | Self::Io(_)
                | Self::Zip(_)
        )
    }

    pub(crate) fn parse(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn integrity(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PackageIntegrity {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Result type for StyleStack operations.
pub type Result<T> = std::result::Result<T, Error>;
