//! The `[Content_Types].xml` table.
//!
//! Maps extensions (`Default`) and individual part names (`Override`) to
//! content types. Parsed with quick-xml, written with `write!` in sorted
//! order so identical packages serialize identically.

use crate::common::xml::escape_xml;
use crate::common::{Error, Result};
use crate::ooxml::opc::constants::{content_type as ct, namespace};
use crate::ooxml::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the `rels` and `xml` defaults every package carries.
    pub fn with_standard_defaults() -> Self {
        let mut types = Self::new();
        types.add_default("rels", ct::OPC_RELATIONSHIPS);
        types.add_default("xml", ct::XML);
        types
    }

    pub fn add_default(&mut self, extension: impl AsRef<str>, content_type: impl Into<String>) {
        self.defaults
            .insert(extension.as_ref().to_ascii_lowercase(), content_type.into());
    }

    pub fn add_override(&mut self, partname: &PackURI, content_type: impl Into<String>) {
        self.overrides
            .insert(partname.as_str().to_string(), content_type.into());
    }

    /// Record `content_type` for `partname`, as a default when the extension
    /// already maps to it and as an override otherwise.
    pub fn add_for_part(&mut self, partname: &PackURI, content_type: &str) {
        match self.defaults.get(&partname.ext().to_ascii_lowercase()) {
            Some(existing) if existing == content_type => {},
            _ => self.add_override(partname, content_type),
        }
    }

    /// Content type for a part: override first, then extension default.
    pub fn content_type_for(&self, partname: &PackURI) -> Option<&str> {
        self.overrides
            .get(partname.as_str())
            .or_else(|| self.defaults.get(&partname.ext().to_ascii_lowercase()))
            .map(String::as_str)
    }

    #[inline]
    pub fn override_for(&self, partname: &str) -> Option<&str> {
        self.overrides.get(partname).map(String::as_str)
    }

    #[inline]
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether any default or override declares `content_type`.
    pub fn declares(&self, content_type: &str) -> bool {
        self.defaults.values().chain(self.overrides.values()).any(|v| v == content_type)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse `[Content_Types].xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"Default" => {
                        let mut extension = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Extension" => extension = Some(attr.unescape_value()?.to_string()),
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string())
                                },
                                _ => {},
                            }
                        }
                        if let (Some(ext), Some(ct)) = (extension, content_type) {
                            map.add_default(ext, ct);
                        }
                    },
                    b"Override" => {
                        let mut partname = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"PartName" => partname = Some(attr.unescape_value()?.to_string()),
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string())
                                },
                                _ => {},
                            }
                        }
                        if let (Some(pn), Some(ct)) = (partname, content_type) {
                            map.overrides.insert(pn, ct);
                        }
                    },
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::parse(
                        "[Content_Types].xml",
                        format!("at byte {}: {}", reader.buffer_position(), e),
                    ));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Serialize to XML: defaults sorted by extension, overrides by part name.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(512 + self.overrides.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        write!(xml, r#"<Types xmlns="{}">"#, namespace::OPC_CONTENT_TYPES)?;

        for (ext, content_type) in &self.defaults {
            write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            )?;
        }
        for (partname, content_type) in &self.overrides {
            write!(
                xml,
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            )?;
        }

        xml.push_str("</Types>");
        Ok(xml)
    }
}
