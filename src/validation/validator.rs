//! SuperTheme package validation.
//!
//! A run walks six stages in order: structure, content types, namespaces,
//! relationships, performance and cross-platform paths. No stage
//! short-circuits the others, so one run reports every defect it can see.

use crate::common::Result;
use crate::ooxml::opc::constants::{content_type as CT, namespace, part_name};
use crate::ooxml::opc::packuri::portability_issue;
use crate::ooxml::opc::{ContentTypes, PackURI, PhysPkgReader, Relationships, ZipEntry};
use crate::common::id::is_braced_guid;
use crate::supertheme::layout;
use crate::validation::result::{IssueCategory, ValidationResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Thresholds and strictness for a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Promote warnings to errors
    pub strict: bool,
    pub max_package_bytes: u64,
    pub max_file_bytes: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_package_bytes: 50 * 1024 * 1024,
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Checks finished `.thmx` packages.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate package bytes. Never fails: an unreadable archive is a
    /// single `Structure` error.
    pub fn validate(&self, bytes: &[u8]) -> ValidationResult {
        let mut result = ValidationResult::new(bytes.len() as u64);

        let entries = match PhysPkgReader::new(bytes).and_then(|mut reader| reader.read_all()) {
            Ok(entries) => entries,
            Err(e) => {
                result.error(IssueCategory::Structure, None, format!("unreadable archive: {}", e));
                return self.finish(result);
            },
        };
        result.file_count = entries.len();

        let members = Members::new(&entries);
        let scans = scan_xml_parts(&entries);

        self.check_structure(&members, &mut result);
        self.check_content_types(&members, &mut result);
        self.check_namespaces(&scans, &mut result);
        self.check_relationships(&members, &scans, &mut result);
        self.check_performance(&entries, &mut result);
        self.check_cross_platform(&entries, &mut result);

        self.finish(result)
    }

    /// Read and validate a package file.
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<ValidationResult> {
        let bytes = std::fs::read(path)?;
        Ok(self.validate(&bytes))
    }

    fn finish(&self, result: ValidationResult) -> ValidationResult {
        let result = result.finish(self.config.strict);
        tracing::info!(
            "validated package ({} bytes, {} file(s), {} variant(s)): {} error(s), {} warning(s)",
            result.package_size,
            result.file_count,
            result.variant_count,
            result.errors.len(),
            result.warnings.len()
        );
        result
    }

    fn check_structure(&self, members: &Members<'_>, result: &mut ValidationResult) {
        let required = [
            member(part_name::CONTENT_TYPES),
            member(part_name::PACKAGE_RELS),
            member(layout::ROOT_THEME),
            member(layout::ROOT_PRESENTATION),
            member(layout::VARIANT_MANAGER),
            member(layout::VARIANT_MANAGER_RELS),
        ];
        for name in required {
            if !members.contains(name) {
                result.error(IssueCategory::Structure, Some(name), "required part is missing");
            }
        }

        let manager_name = member(layout::VARIANT_MANAGER);
        let Some(manager) = members.get(manager_name) else {
            return;
        };
        let entries = match manager_entries(&manager.data) {
            Ok(entries) => entries,
            Err(e) => {
                result.error(IssueCategory::Structure, Some(manager_name), format!("unreadable variant manager: {}", e));
                return;
            },
        };

        result.variant_count = entries.len();
        if entries.is_empty() {
            result.error(IssueCategory::Structure, Some(manager_name), "variant manager lists no variants");
        }
        for (index, entry) in entries.iter().enumerate() {
            let label = entry.name.as_deref().unwrap_or("<unnamed>");
            match entry.vid.as_deref() {
                Some(vid) if is_braced_guid(vid) => {},
                Some(vid) => result.error(
                    IssueCategory::Structure,
                    Some(manager_name),
                    format!("variant {} ('{}') has malformed vid '{}'", index + 1, label, vid),
                ),
                None => result.error(
                    IssueCategory::Structure,
                    Some(manager_name),
                    format!("variant {} ('{}') has no vid", index + 1, label),
                ),
            }
            for (attr, value) in [("cx", &entry.cx), ("cy", &entry.cy)] {
                if !value.as_deref().is_some_and(is_positive_integer) {
                    result.error(
                        IssueCategory::Structure,
                        Some(manager_name),
                        format!(
                            "variant {} ('{}') needs a positive {}, found '{}'",
                            index + 1,
                            label,
                            attr,
                            value.as_deref().unwrap_or_default()
                        ),
                    );
                }
            }
            if entry.r_id.is_none() {
                result.error(
                    IssueCategory::Structure,
                    Some(manager_name),
                    format!("variant {} ('{}') has no r:id", index + 1, label),
                );
            }
        }

        self.check_variant_parts(members, &entries, result);
    }

    /// Every variant the manager lists needs its theme, presentation and
    /// relationship parts. Variants are located through the manager's
    /// relationships; unresolvable r:ids are reported by the relationships
    /// stage.
    fn check_variant_parts(&self, members: &Members<'_>, entries: &[ManagerEntry], result: &mut ValidationResult) {
        let Some(rels_entry) = members.get(member(layout::VARIANT_MANAGER_RELS)) else {
            return;
        };
        let Ok(manager) = PackURI::new(layout::VARIANT_MANAGER) else {
            return;
        };
        let Ok(rels) = Relationships::from_xml(manager.base_uri(), &rels_entry.data) else {
            return;
        };

        let mut seen = HashSet::new();
        for entry in entries {
            let variant_id = entry
                .r_id
                .as_deref()
                .and_then(|r_id| rels.get(r_id))
                .and_then(|rel| rel.target_partname().ok())
                .and_then(|target| layout::variant_id_of(target.as_str()));
            let Some(variant_id) = variant_id else {
                continue;
            };
            if !seen.insert(variant_id) {
                continue;
            }
            let label = entry.name.as_deref().unwrap_or("<unnamed>");
            for required in [
                layout::variant_rels(variant_id),
                layout::variant_theme(variant_id),
                layout::variant_presentation(variant_id),
                layout::variant_presentation_rels(variant_id),
            ] {
                let name = member(&required);
                if !members.contains(name) {
                    result.error(
                        IssueCategory::Structure,
                        Some(name),
                        format!("part of variant {} ('{}') is missing", variant_id, label),
                    );
                }
            }
        }
    }

    fn check_content_types(&self, members: &Members<'_>, result: &mut ValidationResult) {
        let types_name = member(part_name::CONTENT_TYPES);
        let Some(entry) = members.get(types_name) else {
            return;
        };
        let types = match ContentTypes::from_xml(&entry.data) {
            Ok(types) => types,
            Err(e) => {
                result.error(IssueCategory::ContentTypes, Some(types_name), format!("unreadable content types: {}", e));
                return;
            },
        };

        for required in [CT::OFC_THEME, CT::THEME_VARIANT_MANAGER] {
            if !types.declares(required) {
                result.error(
                    IssueCategory::ContentTypes,
                    Some(types_name),
                    format!("content type '{}' is not declared", required),
                );
            }
        }

        for entry in members.entries {
            if entry.name == types_name {
                continue;
            }
            // unportable names are reported by the cross-platform stage
            let Ok(partname) = PackURI::from_member_name(&entry.name) else {
                continue;
            };
            let actual = types.content_type_for(&partname);
            match (expected_content_type(&entry.name), actual) {
                (Some(expected), Some(actual)) if expected == actual => {},
                (Some(expected), actual) => result.error(
                    IssueCategory::ContentTypes,
                    Some(entry.name.as_str()),
                    format!("content type is '{}', expected '{}'", actual.unwrap_or("<none>"), expected),
                ),
                (None, None) => result.warning(IssueCategory::ContentTypes, Some(entry.name.as_str()), "part has no content type"),
                (None, Some(_)) => {},
            }
        }

        for (partname, _) in types.overrides() {
            if !members.contains(member(partname)) {
                result.warning(
                    IssueCategory::ContentTypes,
                    Some(partname),
                    "override names a part that is not in the archive",
                );
            }
        }
    }

    fn check_namespaces(&self, scans: &Scans<'_>, result: &mut ValidationResult) {
        for (&name, scan) in scans {
            let scan = match scan {
                Ok(scan) => scan,
                Err(reason) => {
                    result.error(IssueCategory::Namespaces, Some(name), format!("not well-formed XML: {}", reason));
                    continue;
                },
            };
            let required: &[&str] = if name == member(layout::VARIANT_MANAGER) {
                &[namespace::THEMEML_2012, namespace::OFC_RELATIONSHIPS]
            } else if is_theme_part(name) {
                &[namespace::DML_MAIN]
            } else if is_presentation_part(name) {
                &[namespace::PML_MAIN]
            } else {
                &[]
            };
            for uri in required {
                if !scan.namespaces.contains(*uri) {
                    result.error(
                        IssueCategory::Namespaces,
                        Some(name),
                        format!("namespace '{}' is not declared", uri),
                    );
                }
            }
        }
    }

    fn check_relationships(&self, members: &Members<'_>, scans: &Scans<'_>, result: &mut ValidationResult) {
        let mut by_source: HashMap<String, Relationships> = HashMap::new();

        for entry in members.entries.iter().filter(|e| e.name.ends_with(".rels")) {
            let Ok(rels_uri) = PackURI::from_member_name(&entry.name) else {
                continue;
            };
            let Some(source) = rels_uri.rels_source() else {
                result.error(
                    IssueCategory::Relationships,
                    Some(entry.name.as_str()),
                    "relationships part is not inside a _rels directory",
                );
                continue;
            };
            let rels = match Relationships::from_xml(source.base_uri(), &entry.data) {
                Ok(rels) => rels,
                Err(e) => {
                    result.error(
                        IssueCategory::Relationships,
                        Some(entry.name.as_str()),
                        format!("unreadable relationships: {}", e),
                    );
                    continue;
                },
            };

            if !source.is_package_root() && !members.contains(source.membername()) {
                result.error(
                    IssueCategory::Relationships,
                    Some(entry.name.as_str()),
                    format!("source part '{}' does not exist", source),
                );
            }
            for rel in rels.iter().filter(|rel| !rel.is_external()) {
                match rel.target_partname() {
                    Ok(target) if members.contains(target.membername()) => {},
                    Ok(target) => result.error(
                        IssueCategory::Relationships,
                        Some(entry.name.as_str()),
                        format!("{} targets missing part '{}'", rel.r_id(), target),
                    ),
                    Err(e) => result.error(
                        IssueCategory::Relationships,
                        Some(entry.name.as_str()),
                        format!("{} has an unusable target: {}", rel.r_id(), e),
                    ),
                }
            }
            by_source.insert(source.as_str().to_string(), rels);
        }

        for (&name, scan) in scans {
            let Ok(scan) = scan else {
                continue;
            };
            if scan.rel_refs.is_empty() {
                continue;
            }
            let Ok(partname) = PackURI::from_member_name(name) else {
                continue;
            };
            let rels = by_source.get(partname.as_str());
            for r_id in &scan.rel_refs {
                if rels.and_then(|rels| rels.get(r_id)).is_none() {
                    result.error(
                        IssueCategory::Relationships,
                        Some(name),
                        format!("'{}' has no entry in {}", r_id, partname.rels_uri().membername()),
                    );
                }
            }
        }
    }

    fn check_performance(&self, entries: &[ZipEntry], result: &mut ValidationResult) {
        if result.package_size > self.config.max_package_bytes {
            let message = format!(
                "package is {} bytes, threshold is {}",
                result.package_size, self.config.max_package_bytes
            );
            result.warning(IssueCategory::Performance, None, message);
        }
        for entry in entries {
            let size = entry.data.len() as u64;
            if size > self.config.max_file_bytes {
                result.warning(
                    IssueCategory::Performance,
                    Some(entry.name.as_str()),
                    format!("part is {} bytes, threshold is {}", size, self.config.max_file_bytes),
                );
            }
        }
    }

    fn check_cross_platform(&self, entries: &[ZipEntry], result: &mut ValidationResult) {
        for entry in entries {
            if let Some(reason) = portability_issue(&entry.name) {
                result.error(IssueCategory::CrossPlatform, Some(entry.name.as_str()), reason);
            }
        }
    }
}

/// Member name for a partname.
fn member(partname: &str) -> &str {
    partname.trim_start_matches('/')
}

fn is_theme_part(name: &str) -> bool {
    let mut segments = name.rsplit('/');
    let file = segments.next().unwrap_or_default();
    file.starts_with("theme") && file.ends_with(".xml") && segments.next() == Some("theme")
}

fn is_presentation_part(name: &str) -> bool {
    name == "presentation.xml" || name.ends_with("/presentation.xml")
}

fn expected_content_type(name: &str) -> Option<&'static str> {
    if name == member(layout::VARIANT_MANAGER) {
        Some(CT::THEME_VARIANT_MANAGER)
    } else if is_theme_part(name) {
        Some(CT::OFC_THEME)
    } else if is_presentation_part(name) {
        Some(CT::PML_PRESENTATION_MAIN)
    } else {
        None
    }
}

fn is_positive_integer(value: &str) -> bool {
    atoi_simd::parse::<u64, false, false>(value.as_bytes()).is_ok_and(|n| n > 0)
}

/// Archive members by name.
struct Members<'a> {
    entries: &'a [ZipEntry],
    by_name: HashMap<&'a str, &'a ZipEntry>,
}

impl<'a> Members<'a> {
    fn new(entries: &'a [ZipEntry]) -> Self {
        let by_name = entries.iter().map(|e| (e.name.as_str(), e)).collect();
        Self { entries, by_name }
    }

    fn get(&self, name: &str) -> Option<&'a ZipEntry> {
        self.by_name.get(name).copied()
    }

    fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

/// What one pass over an XML part finds.
#[derive(Debug, Default)]
struct PartScan {
    /// Every namespace URI declared anywhere in the part
    namespaces: HashSet<String>,
    /// Values of attributes in the office relationships namespace
    rel_refs: Vec<String>,
}

type Scans<'a> = BTreeMap<&'a str, std::result::Result<PartScan, String>>;

/// Scan every XML part except content types and relationships.
fn scan_xml_parts(entries: &[ZipEntry]) -> Scans<'_> {
    entries
        .iter()
        .filter(|e| e.name.ends_with(".xml") && e.name != member(part_name::CONTENT_TYPES))
        .map(|e| (e.name.as_str(), scan_part(&e.data).map_err(|err| err.to_string())))
        .collect()
}

type Scope = Vec<(Vec<u8>, String)>;

fn scan_part(xml: &[u8]) -> Result<PartScan> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut scan = PartScan::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let scope = scan_element(e, &scopes, &mut scan)?;
                scopes.push(scope);
            },
            Ok(Event::Empty(ref e)) => {
                scan_element(e, &scopes, &mut scan)?;
            },
            Ok(Event::End(_)) => {
                scopes.pop();
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(crate::common::Error::parse(
                    "package part",
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ));
            },
            _ => {},
        }
        buf.clear();
    }
    Ok(scan)
}

/// Record namespace declarations and relationship references on one
/// element; returns the prefixes it declares.
fn scan_element(e: &BytesStart<'_>, scopes: &[Scope], scan: &mut PartScan) -> Result<Scope> {
    let mut declared: Scope = Vec::new();
    let mut prefixed = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        let value = attr.unescape_value()?.into_owned();
        if key == b"xmlns" {
            scan.namespaces.insert(value.clone());
            declared.push((Vec::new(), value));
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            scan.namespaces.insert(value.clone());
            declared.push((prefix.to_vec(), value));
        } else if let Some(colon) = memchr::memchr(b':', key) {
            prefixed.push((key[..colon].to_vec(), value));
        }
    }

    for (prefix, value) in prefixed {
        let uri = declared
            .iter()
            .rev()
            .chain(scopes.iter().rev().flat_map(|scope| scope.iter().rev()))
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| uri.as_str());
        if uri == Some(namespace::OFC_RELATIONSHIPS) {
            scan.rel_refs.push(value);
        }
    }
    Ok(declared)
}

/// One `themeVariant` entry of the manager.
#[derive(Debug, Default)]
struct ManagerEntry {
    name: Option<String>,
    vid: Option<String>,
    cx: Option<String>,
    cy: Option<String>,
    r_id: Option<String>,
}

fn manager_entries(xml: &[u8]) -> Result<Vec<ManagerEntry>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut entries = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"themeVariant" => {
                let mut entry = ManagerEntry::default();
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = Some(attr.unescape_value()?.into_owned());
                    match attr.key.local_name().as_ref() {
                        b"name" => entry.name = value,
                        b"vid" => entry.vid = value,
                        b"cx" => entry.cx = value,
                        b"cy" => entry.cy = value,
                        b"id" => entry.r_id = value,
                        _ => {},
                    }
                }
                entries.push(entry);
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(crate::common::Error::parse(
                    "variant manager",
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ));
            },
            _ => {},
        }
        buf.clear();
    }
    Ok(entries)
}
