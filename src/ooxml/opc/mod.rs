//! Open Packaging Conventions (OPC) implementation.
//!
//! Package structure (parts, relationships), content type management and
//! the ZIP-based physical container, as needed to read templates and to
//! assemble theme packages.
//!
//! - `quick-xml` for `.rels` and `[Content_Types].xml` parsing
//! - `atoi_simd` for `rIdN` parsing
//! - `zip` for the physical container, with deterministic output

pub mod constants;
pub mod content_types;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod rel;

// Re-export commonly used types
pub use content_types::ContentTypes;
pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::{DocumentPart, PartContent};
pub use phys_pkg::{PhysPkgReader, PhysPkgWriter, ZipEntry};
pub use rel::{Relationship, Relationships};
