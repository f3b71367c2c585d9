//! Parts of an OPC package.
//!
//! A part is a named piece of content with a content type. XML parts are
//! held as text so they can be patched or inspected; everything else is
//! kept as raw bytes.

use crate::common::{Error, Result};
use crate::ooxml::opc::packuri::PackURI;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    Xml(String),
    Bytes(Vec<u8>),
}

impl PartContent {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Xml(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One part of a package, owned by whoever assembles the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPart {
    partname: PackURI,
    content: PartContent,
    content_type: String,
}

impl DocumentPart {
    pub fn new(partname: PackURI, content: PartContent, content_type: impl Into<String>) -> Self {
        Self {
            partname,
            content,
            content_type: content_type.into(),
        }
    }

    pub fn xml(partname: PackURI, xml: String, content_type: impl Into<String>) -> Self {
        Self::new(partname, PartContent::Xml(xml), content_type)
    }

    /// Load a part from raw bytes, keeping XML content types as text.
    pub fn load(partname: PackURI, content_type: impl Into<String>, blob: Vec<u8>) -> Result<Self> {
        let content_type = content_type.into();
        let content = if is_xml_content_type(&content_type) {
            match String::from_utf8(blob) {
                Ok(text) => PartContent::Xml(text),
                Err(e) => {
                    return Err(Error::parse(
                        partname.as_str(),
                        format!("XML part is not valid UTF-8: {}", e.utf8_error()),
                    ));
                },
            }
        } else {
            PartContent::Bytes(blob)
        };
        Ok(Self::new(partname, content, content_type))
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn content(&self) -> &PartContent {
        &self.content
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        self.content.as_bytes()
    }

    /// XML text, if this is an XML part.
    pub fn xml_str(&self) -> Option<&str> {
        match &self.content {
            PartContent::Xml(s) => Some(s),
            PartContent::Bytes(_) => None,
        }
    }
}

/// Whether a content type denotes XML content.
pub fn is_xml_content_type(content_type: &str) -> bool {
    content_type.ends_with("+xml") || content_type == "application/xml" || content_type == "text/xml"
}
