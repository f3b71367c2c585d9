//! Multi-variant SuperTheme packages.
//!
//! A SuperTheme bundles several designs at several slide sizes. Every
//! `(design, ratio)` pair becomes a [`ThemeVariant`] with its own theme and
//! presentation parts; `themeVariantManager.xml` ties them together by
//! design GUID and slide size.
//!
//! # Example
//!
//! ```
//! use stylestack::supertheme::{PackageAssembler, SuperThemeGenerator};
//! use stylestack::tokens::{LayerKind, ResolutionContext, TokenLayer, TokenResolver};
//!
//! let layer = TokenLayer::from_json_str("acme", LayerKind::Core, r##"{"colors": {"primary": "#1F4E79"}}"##)?;
//! let tokens = TokenResolver::new().resolve(&[layer], &ResolutionContext::new())?;
//! let designs = vec![("Acme".to_string(), tokens)];
//! let ratios = vec!["16:9".to_string(), "4:3".to_string()];
//!
//! let package = SuperThemeGenerator::default().generate(&designs, &ratios)?;
//! assert_eq!(package.variants().len(), 2);
//! let thmx = PackageAssembler::new().assemble(&package)?;
//! assert!(!thmx.is_empty());
//! # Ok::<(), stylestack::Error>(())
//! ```

pub mod assembler;
pub mod context;
pub mod generator;
pub mod layout;
pub mod manager;
pub mod presentation;
pub mod theme;
pub mod variant;

pub use assembler::PackageAssembler;
pub use context::GenerationContext;
pub use generator::{SuperThemeGenerator, SuperThemePackage};
pub use manager::variant_manager_xml;
pub use presentation::PresentationBuilder;
pub use theme::{ColorScheme, ThemeBuilder};
pub use variant::{ThemeVariant, VariantOmission, VariantRecovery};
