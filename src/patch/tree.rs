//! Parsed XML documents for patching.

use crate::common::{Error, Result};
use crate::ooxml::strategy::DocumentType;
use crate::patch::repair::{self, ParseLimits};
use serde::{Deserialize, Serialize};
use sxd_document::Package;
use sxd_document::dom::{ChildOfRoot, Document};

/// How defects in input XML are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Repair recoverable defects and report each repair
    #[default]
    Lenient,
    /// Reject any defect
    Strict,
}

/// A parsed, mutable XML document.
///
/// Owns its DOM; patch application takes the tree by value and hands back
/// the modified tree.
pub struct XmlTree {
    package: Package,
    source_name: String,
    repairs: Vec<String>,
}

impl XmlTree {
    /// Parse `xml`, repairing it first in lenient mode.
    pub fn parse(source_name: &str, xml: &str, mode: ParseMode, limits: &ParseLimits) -> Result<Self> {
        let repaired = repair::repair(source_name, xml, limits, mode == ParseMode::Lenient)?;
        let package = sxd_document::parser::parse(&repaired.xml)
            .map_err(|e| Error::parse(source_name, format!("{:?}", e)))?;
        if !repaired.repairs.is_empty() {
            tracing::debug!("{}: parsed with {} repair(s)", source_name, repaired.repairs.len());
        }
        Ok(Self {
            package,
            source_name: source_name.to_string(),
            repairs: repaired.repairs,
        })
    }

    /// Lenient parse with default limits.
    pub fn parse_str(source_name: &str, xml: &str) -> Result<Self> {
        Self::parse(source_name, xml, ParseMode::Lenient, &ParseLimits::default())
    }

    #[inline]
    pub fn document(&self) -> Document<'_> {
        self.package.as_document()
    }

    #[inline]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Repairs applied while parsing (lenient mode only).
    #[inline]
    pub fn repairs(&self) -> &[String] {
        &self.repairs
    }

    /// Namespace URI of the root element.
    pub fn root_namespace(&self) -> Option<String> {
        let document = self.document();
        document.root().children().into_iter().find_map(|child| match child {
            ChildOfRoot::Element(e) => e.name().namespace_uri().map(str::to_string),
            _ => None,
        })
    }

    pub fn document_type(&self) -> DocumentType {
        DocumentType::from_namespace(self.root_namespace().as_deref())
    }

    /// Serialize the document.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut out = Vec::new();
        sxd_document::writer::format_document(&self.document(), &mut out)?;
        String::from_utf8(out).map_err(|e| Error::Xml(e.to_string()))
    }
}

impl std::fmt::Debug for XmlTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlTree")
            .field("source_name", &self.source_name)
            .field("repairs", &self.repairs)
            .finish_non_exhaustive()
    }
}
