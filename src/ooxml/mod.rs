//! Office Open XML packaging and document-type conventions.
//!
//! 1. **OPC Layer** (`opc`): package handling (ZIP, parts, relationships,
//!    content types)
//! 2. **Strategy** (`strategy`): document-type detection from the root
//!    namespace, prefix tables and shape-property xpaths per type
pub mod opc;
pub mod strategy;

// Re-export commonly used types
pub use opc::{OpcPackage, PackURI};
pub use strategy::{DocumentStrategy, DocumentType};
