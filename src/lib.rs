//! StyleStack - design tokens to branded Office templates
//!
//! This library resolves layered design tokens and applies them to Office
//! packages: patching baseline OOXML/ODF templates and generating
//! multi-variant SuperTheme (`.thmx`) packages.
//!
//! # Features
//!
//! - **Token resolution**: ordered layers merged leaf by leaf, `{a.b}`
//!   references, `$aspectRatio` and `$conditional` nodes
//! - **Geometry**: EMU slide sizes for standard and custom aspect ratios
//! - **Patching**: namespace-aware XPath edits with explicit recovery
//! - **SuperThemes**: designs × ratios in one deterministic package
//! - **Validation**: structural, content-type, namespace, relationship,
//!   size and path portability checks of a finished package
//!
//! # Example - Resolving tokens
//!
//! ```
//! use stylestack::tokens::{LayerKind, ResolutionContext, TokenLayer, TokenResolver};
//!
//! let core = TokenLayer::from_json_str("core", LayerKind::Core, r##"{"colors": {"primary": "#0066CC"}}"##)?;
//! let org = TokenLayer::from_json_str("org", LayerKind::Org, r##"{"typography": {"color": "{colors.primary}"}}"##)?;
//! let tokens = TokenResolver::new().resolve_flat(&[core, org], &ResolutionContext::new())?;
//! assert_eq!(tokens.get_str("typography.color"), Some("#0066CC"));
//! # Ok::<(), stylestack::Error>(())
//! ```
//!
//! # Example - Building a SuperTheme
//!
//! ```
//! use stylestack::supertheme::{PackageAssembler, SuperThemeGenerator};
//! use stylestack::tokens::{LayerKind, ResolutionContext, TokenLayer, TokenResolver};
//! use stylestack::validation::Validator;
//!
//! let layer = TokenLayer::from_json_str("blue", LayerKind::Org, r##"{"colors": {"primary": "#1F4E79"}}"##)?;
//! let tokens = TokenResolver::new().resolve(&[layer], &ResolutionContext::new())?;
//! let designs = vec![("Corporate Blue".to_string(), tokens)];
//! let ratios = vec!["16:9".to_string(), "4:3".to_string()];
//!
//! let package = SuperThemeGenerator::default().generate(&designs, &ratios)?;
//! let thmx = PackageAssembler::new().assemble(&package)?;
//! assert!(Validator::default().validate(&thmx).is_valid);
//! # Ok::<(), stylestack::Error>(())
//! ```
//!
//! # Example - A configured build
//!
//! ```no_run
//! use stylestack::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = Pipeline::from_path("brand/build.yaml")?.run()?;
//! println!("wrote {} ({} variants)", report.output.display(), report.variant_count);
//! # Ok(())
//! # }
//! ```

/// Errors, identifiers, units and XML helpers shared by every component
pub mod common;

/// Build configuration
pub mod config;

/// Aspect ratios, EMU slide sizes and per-ratio token selection
pub mod geometry;

/// OPC packaging and document-type conventions
pub mod ooxml;

/// XML repair, parsing and XPath-targeted patching
pub mod patch;

/// Configured end-to-end builds with atomic output
pub mod pipeline;

/// Multi-variant SuperTheme generation and assembly
pub mod supertheme;

/// Patch plans applied to baseline templates
pub mod template;

/// Design-token layers and resolution
pub mod tokens;

/// Post-build package validation
pub mod validation;

// Re-export commonly used types
pub use common::{Component, Error, Result, guid_for};
pub use geometry::{AspectRatioSpec, detect_aspect_ratio};
pub use ooxml::{DocumentStrategy, DocumentType};
pub use tokens::{ResolvedTokenSet, TokenLayer, TokenResolver};
