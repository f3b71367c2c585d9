//! Relationships between parts of an OPC package.
//!
//! A `.rels` part lists, for one source part, the relationships it holds by
//! `rId`. Internal targets are resolved relative to the source's directory.

use crate::common::xml::escape_xml;
use crate::common::{Error, Result};
use crate::ooxml::opc::constants::{namespace, target_mode};
use crate::ooxml::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as _;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    base_uri: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: impl Into<String>,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        base_uri: impl Into<String>,
        is_external: bool,
    ) -> Self {
        Self {
            r_id: r_id.into(),
            reltype: reltype.into(),
            target_ref: target_ref.into(),
            base_uri: base_uri.into(),
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Relative part reference, or an absolute URL for external targets.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Absolute target partname. External relationships have none.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(Error::integrity(
                self.target_ref.clone(),
                "external relationship has no target part",
            ));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref)
    }

    /// Numeric suffix of `rIdN`, used for ordering.
    fn id_number(&self) -> Option<u32> {
        self.r_id
            .strip_prefix("rId")
            .and_then(|n| atoi_simd::parse::<u32, false, false>(n.as_bytes()).ok())
    }
}

/// Relationships held by a single source part, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationships {
    base_uri: String,
    rels: Vec<Relationship>,
}

impl Relationships {
    /// An empty collection whose targets resolve against `base_uri`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: Vec::new(),
        }
    }

    /// Relationships of `source`, resolving against its directory.
    pub fn for_source(source: &PackURI) -> Self {
        Self::new(source.base_uri())
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship with an explicit id. Re-using an id replaces the
    /// previous entry.
    pub fn add_relationship(
        &mut self,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        r_id: impl Into<String>,
        is_external: bool,
    ) -> &Relationship {
        let rel = Relationship::new(r_id, reltype, target_ref, self.base_uri.clone(), is_external);
        let idx = match self.rels.iter().position(|r| r.r_id == rel.r_id) {
            Some(idx) => {
                self.rels[idx] = rel;
                idx
            },
            None => {
                self.rels.push(rel);
                self.rels.len() - 1
            },
        };
        &self.rels[idx]
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.r_id == r_id)
    }

    /// Existing internal relationship of this type and target, or a new one
    /// with the next free `rId`.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> &Relationship {
        if let Some(idx) = self
            .rels
            .iter()
            .position(|r| r.reltype == reltype && r.target_ref == target_ref && !r.is_external)
        {
            return &self.rels[idx];
        }
        let r_id = self.next_r_id();
        self.add_relationship(reltype, target_ref, r_id, false)
    }

    /// Next available `rIdN`, filling gaps first.
    pub fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self.rels.iter().filter_map(Relationship::id_number).collect();
        used.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }
        format!("rId{}", next_num)
    }

    /// The single relationship of `reltype`.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|r| r.reltype == reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(Error::integrity(
                self.base_uri.clone(),
                format!("no relationship of type '{}'", reltype),
            )),
            (Some(_), Some(_)) => Err(Error::integrity(
                self.base_uri.clone(),
                format!("multiple relationships of type '{}'", reltype),
            )),
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Parse a `.rels` part.
    pub fn from_xml(base_uri: impl Into<String>, xml: &[u8]) -> Result<Self> {
        let mut rels = Self::new(base_uri);
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut r_id = None;
                    let mut reltype = None;
                    let mut target_ref = None;
                    let mut is_external = false;

                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                            b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                            b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                            b"TargetMode" => {
                                is_external = attr.unescape_value()? == target_mode::EXTERNAL
                            },
                            _ => {},
                        }
                    }

                    match (r_id, reltype, target_ref) {
                        (Some(id), Some(ty), Some(target)) => {
                            rels.add_relationship(ty, target, id, is_external);
                        },
                        _ => {
                            return Err(Error::integrity(
                                rels.base_uri.clone(),
                                "relationship is missing Id, Type or Target",
                            ));
                        },
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::parse(
                        "relationships",
                        format!("at byte {}: {}", reader.buffer_position(), e),
                    ));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Serialize to `.rels` XML, ordered by numeric `rId`.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        write!(xml, r#"<Relationships xmlns="{}">"#, namespace::OPC_RELATIONSHIPS)?;

        let mut rels: Vec<&Relationship> = self.rels.iter().collect();
        rels.sort_by(|a, b| {
            a.id_number()
                .unwrap_or(u32::MAX)
                .cmp(&b.id_number().unwrap_or(u32::MAX))
                .then_with(|| a.r_id.cmp(&b.r_id))
        });

        for rel in rels {
            let target_mode = if rel.is_external {
                r#" TargetMode="External""#
            } else {
                ""
            };
            write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(&rel.r_id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target_ref),
                target_mode
            )?;
        }

        xml.push_str("</Relationships>");
        Ok(xml)
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/")
    }
}
