//! In-memory OPC packages.
//!
//! An [`OpcPackage`] owns its parts and the relationship table of every
//! source (the package itself or a part). Serialization derives
//! `[Content_Types].xml` from the parts and refuses to write a package whose
//! relationships point at parts that do not exist.

use crate::common::{Error, Result};
use crate::ooxml::opc::constants::part_name;
use crate::ooxml::opc::content_types::ContentTypes;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::DocumentPart;
use crate::ooxml::opc::phys_pkg::{PhysPkgReader, PhysPkgWriter};
use crate::ooxml::opc::rel::{Relationship, Relationships};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcPackage {
    parts: BTreeMap<PackURI, DocumentPart>,
    rels: BTreeMap<PackURI, Relationships>,
}

impl OpcPackage {
    pub fn new() -> Self {
        Self {
            parts: BTreeMap::new(),
            rels: BTreeMap::new(),
        }
    }

    /// The package pseudo-part `/`.
    #[inline]
    pub fn root_uri() -> PackURI {
        PackURI::package()
    }

    /// Add a part. Part names are unique.
    pub fn add_part(&mut self, part: DocumentPart) -> Result<()> {
        if self.parts.contains_key(part.partname()) {
            return Err(Error::integrity(part.partname().as_str(), "duplicate part name"));
        }
        self.parts.insert(part.partname().clone(), part);
        Ok(())
    }

    #[inline]
    pub fn part(&self, partname: &PackURI) -> Option<&DocumentPart> {
        self.parts.get(partname)
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Relationships held by `source` (`/` for the package).
    pub fn rels_for(&self, source: &PackURI) -> Option<&Relationships> {
        self.rels.get(source)
    }

    /// Package-level relationships (`/_rels/.rels`).
    pub fn rels(&self) -> Option<&Relationships> {
        self.rels.get(&Self::root_uri())
    }

    fn rels_entry(&mut self, source: &PackURI) -> &mut Relationships {
        self.rels
            .entry(source.clone())
            .or_insert_with(|| Relationships::for_source(source))
    }

    /// Relate `source` to `target`, re-using an existing relationship of the
    /// same type and target. Returns the `rId`.
    pub fn relate(&mut self, source: &PackURI, reltype: &str, target: &PackURI) -> String {
        let rels = self.rels_entry(source);
        let target_ref = target.relative_ref(rels.base_uri());
        rels.get_or_add(reltype, &target_ref).r_id().to_string()
    }

    /// Relate `source` to `target` under a caller-chosen `rId`, for parts
    /// whose XML already names the id.
    pub fn relate_with_id(&mut self, source: &PackURI, reltype: &str, target: &PackURI, r_id: &str) {
        let rels = self.rels_entry(source);
        let target_ref = target.relative_ref(rels.base_uri());
        rels.add_relationship(reltype, target_ref, r_id, false);
    }

    /// Content types derived from the parts.
    pub fn content_types(&self) -> ContentTypes {
        let mut types = ContentTypes::with_standard_defaults();
        for part in self.parts.values() {
            types.add_for_part(part.partname(), part.content_type());
        }
        types
    }

    /// Every internal relationship must resolve to an existing part, and
    /// every relationship source must be a part or a package root.
    pub fn check_integrity(&self) -> Result<()> {
        for (source, rels) in &self.rels {
            if !source.is_package_root() && !self.parts.contains_key(source) {
                return Err(Error::integrity(
                    source.as_str(),
                    "relationships declared for a part that does not exist",
                ));
            }
            for rel in rels.iter().filter(|r| !r.is_external()) {
                let target = rel.target_partname()?;
                if !self.parts.contains_key(&target) {
                    return Err(Error::integrity(
                        target.as_str(),
                        format!("dangling relationship {} from {}", rel.r_id(), source),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Serialize to ZIP bytes: content types, package-root relationships
    /// (outermost first), then every part in name order followed by its
    /// relationships.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.check_integrity()?;

        let mut writer = PhysPkgWriter::new();
        let content_types_uri = PackURI::new(part_name::CONTENT_TYPES)?;
        writer.write(&content_types_uri, self.content_types().to_xml()?.as_bytes())?;

        for (root, rels) in self.rels.iter().filter(|(source, _)| source.is_package_root()) {
            writer.write(&root.rels_uri(), rels.to_xml()?.as_bytes())?;
        }

        for part in self.parts.values() {
            writer.write(part.partname(), part.blob())?;
            if let Some(rels) = self.rels.get(part.partname()).filter(|r| !r.is_empty()) {
                writer.write(&part.partname().rels_uri(), rels.to_xml()?.as_bytes())?;
            }
        }

        let bytes = writer.finish()?;
        tracing::debug!(
            "serialized OPC package: {} part(s), {} byte(s)",
            self.parts.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Load a package from ZIP bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = PhysPkgReader::new(data)?;
        let content_types_uri = PackURI::new(part_name::CONTENT_TYPES)?;
        let types_xml = reader
            .blob_if_present(&content_types_uri)?
            .ok_or_else(|| Error::integrity(part_name::CONTENT_TYPES, "missing content types"))?;
        let types = ContentTypes::from_xml(&types_xml)?;

        let mut package = Self::new();
        for entry in reader.read_all()? {
            let uri = PackURI::from_member_name(&entry.name)?;
            if uri == content_types_uri {
                continue;
            }
            if uri.is_rels() {
                if let Some(source) = uri.rels_source() {
                    let rels = Relationships::from_xml(source.base_uri(), &entry.data)?;
                    package.rels.insert(source, rels);
                    continue;
                }
            }
            let content_type = types
                .content_type_for(&uri)
                .ok_or_else(|| Error::integrity(uri.as_str(), "no content type declared"))?
                .to_string();
            package.add_part(DocumentPart::load(uri, content_type, entry.data)?)?;
        }
        Ok(package)
    }

    /// Target part of the single package relationship of `reltype`.
    pub fn part_by_reltype(&self, reltype: &str) -> Result<&DocumentPart> {
        let rels = self
            .rels()
            .ok_or_else(|| Error::integrity(part_name::PACKAGE_RELS, "package has no relationships"))?;
        let rel: &Relationship = rels.part_with_reltype(reltype)?;
        let target = rel.target_partname()?;
        self.part(&target)
            .ok_or_else(|| Error::integrity(target.as_str(), "relationship target missing"))
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}
