//! XPath-targeted XML patching.
//!
//! Documents are parsed into an [`XmlTree`] (repairing recoverable defects
//! in [`ParseMode::Lenient`]), then a [`PatchEngine`] applies ordered
//! [`PatchOperation`]s using the namespace table of the document's
//! [`DocumentStrategy`](crate::ooxml::DocumentStrategy).
//!
//! # Example
//!
//! ```
//! use stylestack::ooxml::DocumentStrategy;
//! use stylestack::patch::{PatchEngine, PatchOperation, RecoveryStrategy, XmlTree};
//!
//! let xml = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:srgbClr val="FF0000"/></a:theme>"#;
//! let tree = XmlTree::parse_str("theme1.xml", xml)?;
//! let strategy = DocumentStrategy::for_type(tree.document_type());
//! let patch = PatchOperation::set_attribute("//a:srgbClr", "val", "1F4E79");
//! let (tree, result) = PatchEngine::new(RecoveryStrategy::FailFast).apply(tree, &[patch], &strategy)?;
//! assert_eq!(result.elements_modified, 1);
//! assert!(tree.to_xml_string()?.contains("1F4E79"));
//! # Ok::<(), stylestack::Error>(())
//! ```

pub mod engine;
pub mod operation;
pub mod repair;
pub mod tree;
pub mod xpath;

pub use engine::{PatchEngine, ProcessingResult, RecoveryStrategy};
pub use operation::{PatchAction, PatchOperation};
pub use repair::ParseLimits;
pub use tree::{ParseMode, XmlTree};
pub use xpath::to_local_name_xpath;
