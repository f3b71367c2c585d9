//! Applying a patch plan to a baseline package.

use crate::common::{Error, Result};
use crate::ooxml::opc::constants::part_name;
use crate::ooxml::opc::{PhysPkgReader, PhysPkgWriter, ZipEntry};
use crate::patch::{ParseLimits, ParseMode, PatchEngine, ProcessingResult};
use crate::template::plan::PatchPlan;
use crate::tokens::ResolvedTokenSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Container convention of a baseline package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackageKind {
    /// Office Open XML: `[Content_Types].xml` at the root
    Ooxml,
    /// OpenDocument: a `mimetype` member, stored first
    Odf,
}

impl PackageKind {
    pub fn detect(entries: &[ZipEntry]) -> Option<Self> {
        let has = |name: &str| entries.iter().any(|e| e.name == name);
        if has(member(part_name::CONTENT_TYPES)) {
            Some(Self::Ooxml)
        } else if has(member(part_name::ODF_MIMETYPE)) {
            Some(Self::Odf)
        } else {
            None
        }
    }
}

/// What a template build did, per patched part.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateReport {
    pub kind: PackageKind,
    /// Members written, every original part included
    pub part_count: usize,
    pub parts: BTreeMap<String, ProcessingResult>,
}

impl TemplateReport {
    /// Totals across every patched part.
    pub fn summary(&self) -> ProcessingResult {
        let mut total = ProcessingResult::default();
        for result in self.parts.values() {
            total.absorb(result.clone());
        }
        total
    }
}

/// Patches the XML parts of a baseline OOXML or ODF package.
///
/// Parts the plan does not name are copied byte for byte with their
/// original compression. In ODF output `mimetype` is always the first
/// member and stored.
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    engine: PatchEngine,
    mode: ParseMode,
    limits: ParseLimits,
}

impl TemplateBuilder {
    pub fn new(engine: PatchEngine, mode: ParseMode, limits: ParseLimits) -> Self {
        Self { engine, mode, limits }
    }

    /// Apply `plan` to the package in `template`, interpolating token
    /// references from `tokens` first.
    pub fn build(&self, template: &[u8], plan: &PatchPlan, tokens: &ResolvedTokenSet) -> Result<(Vec<u8>, TemplateReport)> {
        plan.validate()?;
        let plan = plan.interpolate(tokens)?;

        let mut entries = PhysPkgReader::new(template)?
            .with_max_entry_bytes(self.limits.max_bytes as u64)
            .read_all()?;
        let kind = PackageKind::detect(&entries)
            .ok_or_else(|| Error::integrity("/", "template is neither an OOXML nor an ODF package"))?;

        for (part, _) in plan.parts() {
            if !entries.iter().any(|e| e.name == part) {
                return Err(Error::integrity(part, "patch plan names a part the template does not contain"));
            }
        }

        let mut parts = BTreeMap::new();
        for entry in entries.iter_mut() {
            let Some(operations) = plan.operations_for(&entry.name) else {
                continue;
            };
            let xml = std::str::from_utf8(&entry.data)
                .map_err(|e| Error::parse(entry.name.clone(), format!("part is not UTF-8: {}", e)))?;
            let (patched, result) = self
                .engine
                .apply_to_str(&entry.name, xml, operations, self.mode, &self.limits)?;
            entry.data = patched.into_bytes();
            parts.insert(entry.name.clone(), result);
        }

        let bytes = write_package(kind, &entries)?;
        let report = TemplateReport {
            kind,
            part_count: entries.len(),
            parts,
        };
        let summary = report.summary();
        tracing::info!(
            "built {:?} template: {} part(s), {} patched, {} patch(es) applied, {} skipped",
            kind,
            report.part_count,
            report.parts.len(),
            summary.patches_applied,
            summary.patches_skipped
        );
        Ok((bytes, report))
    }
}

fn write_package(kind: PackageKind, entries: &[ZipEntry]) -> Result<Vec<u8>> {
    let mut writer = PhysPkgWriter::new();
    let mimetype = member(part_name::ODF_MIMETYPE);

    if kind == PackageKind::Odf {
        if let Some(entry) = entries.iter().find(|e| e.name == mimetype) {
            writer.write_member(&entry.name, &entry.data, true)?;
        }
    }
    for entry in entries {
        if kind == PackageKind::Odf && entry.name == mimetype {
            continue;
        }
        writer.write_member(&entry.name, &entry.data, entry.stored)?;
    }
    writer.finish()
}

fn member(partname: &str) -> &str {
    partname.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::namespace;
    use crate::patch::{PatchOperation, RecoveryStrategy};

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree><p:sp><p:spPr><a:solidFill><a:srgbClr val="000000"/></a:solidFill></p:spPr></p:sp></p:spTree></p:cSld></p:sld>"#;

    const CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"><office:body><office:text><text:p>Title</text:p></office:text></office:body></office:document-content>"#;

    fn zip(members: &[(&str, &[u8], bool)]) -> Vec<u8> {
        let mut writer = PhysPkgWriter::new();
        for (name, data, stored) in members {
            writer.write_member(name, data, *stored).unwrap();
        }
        writer.finish().unwrap()
    }

    fn pptx() -> Vec<u8> {
        zip(&[
            ("[Content_Types].xml", b"<Types/>", false),
            ("_rels/.rels", b"<Relationships/>", false),
            ("ppt/slides/slide1.xml", SLIDE.as_bytes(), false),
            ("ppt/media/image1.png", b"\x89PNG not really", true),
        ])
    }

    fn tokens() -> ResolvedTokenSet {
        let mut tokens = ResolvedTokenSet::new();
        tokens.insert("colors.primary", "1F4E79");
        tokens.insert("brand.title", "Acme");
        tokens
    }

    #[test]
    fn test_ooxml_build_keeps_every_part() {
        let plan = PatchPlan::new().with(
            "ppt/slides/slide1.xml",
            [PatchOperation::set_attribute("//p:spPr//a:srgbClr", "val", "{colors.primary}")],
        );
        let (bytes, report) = TemplateBuilder::default().build(&pptx(), &plan, &tokens()).unwrap();
        assert_eq!(report.kind, PackageKind::Ooxml);
        assert_eq!(report.part_count, 4);
        assert_eq!(report.summary().patches_applied, 1);

        let entries = PhysPkgReader::new(&bytes).unwrap().read_all().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["[Content_Types].xml", "_rels/.rels", "ppt/slides/slide1.xml", "ppt/media/image1.png"]
        );
        let slide = String::from_utf8(entries[2].data.clone()).unwrap();
        assert!(slide.contains("1F4E79"));
        assert!(slide.contains(namespace::PML_MAIN));
        assert_eq!(entries[3].data, b"\x89PNG not really");
        assert!(entries[3].stored);
    }

    #[test]
    fn test_plan_file_with_absolute_part_names() {
        let plan = PatchPlan::from_json_str(
            r#"{"/ppt/slides/slide1.xml": [
                {"xpath": "//a:srgbClr", "action": "set_attribute", "attribute": "val", "value": "{colors.primary}"}
            ]}"#,
        )
        .unwrap();
        let (bytes, report) = TemplateBuilder::default().build(&pptx(), &plan, &tokens()).unwrap();
        assert!(report.parts.contains_key("ppt/slides/slide1.xml"));
        assert_eq!(report.summary().patches_applied, 1);

        let entries = PhysPkgReader::new(&bytes).unwrap().read_all().unwrap();
        let slide = String::from_utf8(entries[2].data.clone()).unwrap();
        assert!(slide.contains(r#"val="1F4E79""#));
    }

    #[test]
    fn test_odf_mimetype_first_and_stored() {
        // mimetype deliberately not first in the baseline
        let odt = zip(&[
            ("content.xml", CONTENT.as_bytes(), false),
            ("mimetype", b"application/vnd.oasis.opendocument.text", false),
            ("META-INF/manifest.xml", b"<manifest/>", false),
        ]);
        let plan = PatchPlan::new().with("content.xml", [PatchOperation::set_text("//text:p", "{brand.title} Report")]);
        let (bytes, report) = TemplateBuilder::default().build(&odt, &plan, &tokens()).unwrap();
        assert_eq!(report.kind, PackageKind::Odf);

        let entries = PhysPkgReader::new(&bytes).unwrap().read_all().unwrap();
        assert_eq!(entries[0].name, "mimetype");
        assert!(entries[0].stored);
        assert_eq!(entries.len(), 3);
        let content = String::from_utf8(entries[1].data.clone()).unwrap();
        assert!(content.contains("Acme Report"));
    }

    #[test]
    fn test_plan_defects() {
        let builder = TemplateBuilder::default();
        let missing_part = PatchPlan::new().with("ppt/slides/slide9.xml", [PatchOperation::remove("//p:sp")]);
        assert!(matches!(
            builder.build(&pptx(), &missing_part, &tokens()),
            Err(Error::PackageIntegrity { .. })
        ));

        let missing_token = PatchPlan::new().with(
            "ppt/slides/slide1.xml",
            [PatchOperation::set_attribute("//a:srgbClr", "val", "{colors.nope}")],
        );
        assert!(matches!(
            builder.build(&pptx(), &missing_token, &tokens()),
            Err(Error::MissingToken { .. })
        ));

        let not_a_package = zip(&[("readme.txt", b"hello", false)]);
        assert!(builder.build(&not_a_package, &PatchPlan::new(), &tokens()).is_err());
    }

    #[test]
    fn test_recovery_applies_per_part() {
        let plan = PatchPlan::new().with(
            "ppt/slides/slide1.xml",
            [
                PatchOperation::remove("//p:graphicFrame"),
                PatchOperation::set_attribute("//a:srgbClr", "val", "FFFFFF"),
            ],
        );
        assert!(matches!(
            TemplateBuilder::default().build(&pptx(), &plan, &tokens()),
            Err(Error::Targeting { .. })
        ));

        let builder = TemplateBuilder::new(
            PatchEngine::new(RecoveryStrategy::Continue),
            ParseMode::Lenient,
            ParseLimits::default(),
        );
        let (_, report) = builder.build(&pptx(), &plan, &tokens()).unwrap();
        let summary = report.summary();
        assert_eq!(summary.patches_skipped, 1);
        assert_eq!(summary.patches_applied, 1);
    }
}
