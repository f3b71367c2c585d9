//! XPath-targeted patch application.

use crate::common::xml::escape_xml;
use crate::common::{Error, Result};
use crate::ooxml::strategy::DocumentStrategy;
use crate::patch::operation::{PatchAction, PatchOperation};
use crate::patch::repair::ParseLimits;
use crate::patch::tree::{ParseMode, XmlTree};
use crate::patch::xpath::to_local_name_xpath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sxd_document::QName;
use sxd_document::dom::{self, ChildOfElement, ChildOfRoot, Document};
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value};

/// What to do when a patch cannot be applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Abort on the first failing patch
    #[default]
    FailFast,
    /// Record a warning and move on
    Continue,
    /// Retry a non-matching xpath with namespace-agnostic steps, then warn
    RetryWithFallback,
}

/// Counters and warnings from one [`PatchEngine::apply`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    /// Nodes selected across all applied patches
    pub elements_processed: usize,
    /// Nodes whose content actually changed
    pub elements_modified: usize,
    pub patches_applied: usize,
    pub patches_skipped: usize,
    pub warnings: Vec<String>,
}

impl ProcessingResult {
    /// Fold another result into this one.
    pub fn absorb(&mut self, other: ProcessingResult) {
        self.elements_processed += other.elements_processed;
        self.elements_modified += other.elements_modified;
        self.patches_applied += other.patches_applied;
        self.patches_skipped += other.patches_skipped;
        self.warnings.extend(other.warnings);
    }
}

#[derive(Debug, Default)]
struct Applied {
    processed: usize,
    modified: usize,
    notes: Vec<String>,
}

/// Applies [`PatchOperation`]s to parsed documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchEngine {
    recovery: RecoveryStrategy,
}

impl PatchEngine {
    pub fn new(recovery: RecoveryStrategy) -> Self {
        Self { recovery }
    }

    #[inline]
    pub fn recovery(&self) -> RecoveryStrategy {
        self.recovery
    }

    /// Apply `patches` in order and return the modified tree.
    pub fn apply(
        &self,
        tree: XmlTree,
        patches: &[PatchOperation],
        strategy: &DocumentStrategy,
    ) -> Result<(XmlTree, ProcessingResult)> {
        let mut result = ProcessingResult::default();
        {
            let document = tree.document();
            for patch in patches {
                match self.apply_one(&document, patch, strategy) {
                    Ok(applied) => {
                        result.patches_applied += 1;
                        result.elements_processed += applied.processed;
                        result.elements_modified += applied.modified;
                        result.warnings.extend(applied.notes);
                    },
                    Err(e) if self.recovery == RecoveryStrategy::FailFast => return Err(e),
                    Err(e) => {
                        tracing::warn!("{}: skipped {} patch: {}", tree.source_name(), patch.action, e);
                        result.patches_skipped += 1;
                        result.warnings.push(format!("{}: skipped: {}", tree.source_name(), e));
                    },
                }
            }
        }
        tracing::debug!(
            "{}: {} patch(es) applied, {} skipped, {} node(s) modified",
            tree.source_name(),
            result.patches_applied,
            result.patches_skipped,
            result.elements_modified
        );
        Ok((tree, result))
    }

    /// Parse, patch and serialize one document. Parse repairs are reported
    /// as warnings ahead of patch warnings.
    pub fn apply_to_str(
        &self,
        source_name: &str,
        xml: &str,
        patches: &[PatchOperation],
        mode: ParseMode,
        limits: &ParseLimits,
    ) -> Result<(String, ProcessingResult)> {
        let tree = XmlTree::parse(source_name, xml, mode, limits)?;
        let strategy = DocumentStrategy::for_type(tree.document_type());
        let repairs: Vec<String> = tree
            .repairs()
            .iter()
            .map(|r| format!("{}: repaired {}", source_name, r))
            .collect();
        let (tree, mut result) = self.apply(tree, patches, &strategy)?;
        result.warnings.splice(0..0, repairs);
        Ok((tree.to_xml_string()?, result))
    }

    fn apply_one<'d>(
        &self,
        document: &Document<'d>,
        patch: &PatchOperation,
        strategy: &DocumentStrategy,
    ) -> Result<Applied> {
        patch.validate()?;

        let mut namespaces: BTreeMap<String, String> = strategy
            .namespaces()
            .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
            .collect();
        for (prefix, uri) in &patch.namespaces {
            namespaces.insert(prefix.clone(), uri.clone());
        }

        let mut notes = Vec::new();
        let nodes = match select(document, &patch.xpath, &namespaces) {
            Ok(nodes) if !nodes.is_empty() => nodes,
            outcome => {
                if self.recovery != RecoveryStrategy::RetryWithFallback {
                    outcome?;
                    return Err(Error::Targeting {
                        xpath: patch.xpath.clone(),
                    });
                }
                let fallback = to_local_name_xpath(&patch.xpath);
                tracing::debug!("retrying '{}' as '{}'", patch.xpath, fallback);
                let nodes = select(document, &fallback, &BTreeMap::new())?;
                if nodes.is_empty() {
                    return Err(Error::Targeting { xpath: fallback });
                }
                notes.push(format!("'{}' matched only as '{}'", patch.xpath, fallback));
                nodes
            },
        };

        let mut applied = Applied {
            processed: nodes.len(),
            modified: 0,
            notes,
        };
        for node in nodes {
            match apply_to_node(document, node, patch, &namespaces)? {
                Some(true) => applied.modified += 1,
                Some(false) => {},
                None => applied
                    .notes
                    .push(format!("{} cannot target a {} node at '{}'", patch.action, node_kind(&node), patch.xpath)),
            }
        }
        Ok(applied)
    }
}

/// Evaluate `xpath` and return the selected nodes in document order.
fn select<'d>(document: &Document<'d>, xpath: &str, namespaces: &BTreeMap<String, String>) -> Result<Vec<Node<'d>>> {
    let invalid = |reason: String| Error::InvalidXPath {
        xpath: xpath.to_string(),
        reason,
    };
    let compiled = Factory::new()
        .build(xpath)
        .map_err(|e| invalid(format!("{:?}", e)))?
        .ok_or_else(|| invalid("empty expression".to_string()))?;

    let mut context = Context::new();
    for (prefix, uri) in namespaces {
        context.set_namespace(prefix, uri);
    }

    match compiled.evaluate(&context, document.root()) {
        Ok(Value::Nodeset(nodes)) => Ok(nodes.document_order()),
        Ok(_) => Err(invalid("expression does not select nodes".to_string())),
        Err(e) => Err(invalid(format!("{:?}", e))),
    }
}

/// Apply `patch` to one node. `Some(changed)` when the action applies to
/// this kind of node, `None` when it does not.
fn apply_to_node<'d>(
    document: &Document<'d>,
    node: Node<'d>,
    patch: &PatchOperation,
    namespaces: &BTreeMap<String, String>,
) -> Result<Option<bool>> {
    let value = patch.value.as_deref().unwrap_or_default();
    match (node, patch.action) {
        (Node::Element(element), PatchAction::SetAttribute) => {
            let attribute = patch.attribute.as_deref().unwrap_or_default();
            let (prefix, local, uri) = qualify(attribute, namespaces)?;
            if element.attribute_value(QName::with_namespace_uri(uri, local)) == Some(value) {
                return Ok(Some(false));
            }
            let attr = element.set_attribute_value(QName::with_namespace_uri(uri, local), value);
            if prefix.is_some() {
                attr.set_preferred_prefix(prefix);
            }
            Ok(Some(true))
        },
        (Node::Element(element), PatchAction::SetText) => {
            let children = element.children();
            let unchanged = match children.as_slice() {
                [ChildOfElement::Text(text)] => text.text() == value,
                [] => value.is_empty(),
                _ => false,
            };
            if unchanged {
                return Ok(Some(false));
            }
            element.set_text(value);
            Ok(Some(true))
        },
        (Node::Element(element), PatchAction::AppendChild) => {
            let children = parse_fragment(document, value, namespaces)?;
            for child in children {
                element.append_child(child);
            }
            Ok(Some(true))
        },
        (Node::Element(element), PatchAction::RemoveElement) => {
            element.remove_from_parent();
            Ok(Some(true))
        },
        (Node::Attribute(attr), PatchAction::SetAttribute | PatchAction::SetText) => {
            if attr.value() == value {
                return Ok(Some(false));
            }
            match attr.parent() {
                Some(parent) => {
                    let prefix = attr.preferred_prefix();
                    let updated = parent.set_attribute_value(attr.name(), value);
                    updated.set_preferred_prefix(prefix);
                    Ok(Some(true))
                },
                None => Ok(Some(false)),
            }
        },
        (Node::Attribute(attr), PatchAction::RemoveElement) => match attr.parent() {
            Some(parent) => {
                parent.remove_attribute(attr.name());
                Ok(Some(true))
            },
            None => Ok(Some(false)),
        },
        (Node::Text(text), PatchAction::SetText) => {
            if text.text() == value {
                return Ok(Some(false));
            }
            text.set_text(value);
            Ok(Some(true))
        },
        _ => Ok(None),
    }
}

/// Split `prefix:local` and look the prefix up.
fn qualify<'a>(
    name: &'a str,
    namespaces: &'a BTreeMap<String, String>,
) -> Result<(Option<&'a str>, &'a str, Option<&'a str>)> {
    match name.split_once(':') {
        Some((prefix, local)) => {
            let uri = namespaces.get(prefix).ok_or_else(|| {
                Error::Config(format!("attribute '{}' uses unbound prefix '{}'", name, prefix))
            })?;
            Ok((Some(prefix), local, Some(uri.as_str())))
        },
        None => Ok((None, name, None)),
    }
}

/// Parse an XML fragment with `namespaces` in scope and copy its top-level
/// nodes into `document`.
fn parse_fragment<'d>(
    document: &Document<'d>,
    fragment: &str,
    namespaces: &BTreeMap<String, String>,
) -> Result<Vec<ChildOfElement<'d>>> {
    let mut wrapped = String::with_capacity(fragment.len() + 256);
    wrapped.push_str("<fragment");
    for (prefix, uri) in namespaces {
        wrapped.push_str(" xmlns:");
        wrapped.push_str(prefix);
        wrapped.push_str("=\"");
        wrapped.push_str(&escape_xml(uri));
        wrapped.push('"');
    }
    wrapped.push('>');
    wrapped.push_str(fragment);
    wrapped.push_str("</fragment>");

    let package = sxd_document::parser::parse(&wrapped)
        .map_err(|e| Error::Config(format!("append_child fragment is not well-formed: {:?}", e)))?;
    let source = package.as_document();
    let wrapper = source.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(e) => Some(e),
        _ => None,
    });

    Ok(wrapper
        .map(|w| w.children().into_iter().map(|c| import_child(document, c)).collect())
        .unwrap_or_default())
}

/// Deep-copy a node from another document into `document`.
fn import_child<'d>(document: &Document<'d>, child: ChildOfElement<'_>) -> ChildOfElement<'d> {
    match child {
        ChildOfElement::Element(e) => ChildOfElement::Element(import_element(document, e)),
        ChildOfElement::Text(t) => ChildOfElement::Text(document.create_text(t.text())),
        ChildOfElement::Comment(c) => ChildOfElement::Comment(document.create_comment(c.text())),
        ChildOfElement::ProcessingInstruction(pi) => {
            ChildOfElement::ProcessingInstruction(document.create_processing_instruction(pi.target(), pi.value()))
        },
    }
}

fn import_element<'d>(document: &Document<'d>, source: dom::Element<'_>) -> dom::Element<'d> {
    let name = source.name();
    let element = document.create_element(QName::with_namespace_uri(name.namespace_uri(), name.local_part()));
    element.set_preferred_prefix(source.preferred_prefix());
    for attr in source.attributes() {
        let attr_name = attr.name();
        let copied = element.set_attribute_value(
            QName::with_namespace_uri(attr_name.namespace_uri(), attr_name.local_part()),
            attr.value(),
        );
        copied.set_preferred_prefix(attr.preferred_prefix());
    }
    for child in source.children() {
        element.append_child(import_child(document, child));
    }
    element
}

fn node_kind(node: &Node<'_>) -> &'static str {
    match node {
        Node::Root(_) => "root",
        Node::Element(_) => "element",
        Node::Attribute(_) => "attribute",
        Node::Text(_) => "text",
        Node::Comment(_) => "comment",
        Node::Namespace(_) => "namespace",
        Node::ProcessingInstruction(_) => "processing-instruction",
    }
}
