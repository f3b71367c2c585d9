//! Patch operations.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchAction {
    SetAttribute,
    SetText,
    AppendChild,
    RemoveElement,
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SetAttribute => "set_attribute",
            Self::SetText => "set_text",
            Self::AppendChild => "append_child",
            Self::RemoveElement => "remove_element",
        })
    }
}

/// One targeted mutation of an XML document.
///
/// `xpath` selects elements or attributes. `namespaces` adds prefix bindings
/// on top of the document strategy's table. For `append_child`, `value` is an
/// XML fragment that may use any bound prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub xpath: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, String>,
    pub action: PatchAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl PatchOperation {
    fn new(xpath: impl Into<String>, action: PatchAction) -> Self {
        Self {
            xpath: xpath.into(),
            namespaces: BTreeMap::new(),
            action,
            attribute: None,
            value: None,
        }
    }

    pub fn set_attribute(xpath: impl Into<String>, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            value: Some(value.into()),
            ..Self::new(xpath, PatchAction::SetAttribute)
        }
    }

    pub fn set_text(xpath: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(xpath, PatchAction::SetText)
        }
    }

    pub fn append_child(xpath: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            value: Some(fragment.into()),
            ..Self::new(xpath, PatchAction::AppendChild)
        }
    }

    pub fn remove(xpath: impl Into<String>) -> Self {
        Self::new(xpath, PatchAction::RemoveElement)
    }

    /// Bind an extra namespace prefix for this operation.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Check the fields the action needs are present.
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| {
            Err(Error::Config(format!(
                "{} patch on '{}' requires '{}'",
                self.action, self.xpath, field
            )))
        };
        if self.xpath.trim().is_empty() {
            return Err(Error::Config(format!("{} patch has an empty xpath", self.action)));
        }
        match self.action {
            PatchAction::SetAttribute if self.attribute.is_none() => missing("attribute"),
            PatchAction::SetAttribute | PatchAction::SetText | PatchAction::AppendChild
                if self.value.is_none() =>
            {
                missing("value")
            },
            _ => Ok(()),
        }
    }

    /// Copy of this operation with every string field passed through `f`.
    pub fn map_strings<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        Ok(Self {
            xpath: f(&self.xpath)?,
            namespaces: self.namespaces.clone(),
            action: self.action,
            attribute: self.attribute.as_deref().map(&mut f).transpose()?,
            value: self.value.as_deref().map(&mut f).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_plan_entry() {
        let json = r#"{"xpath": "//a:srgbClr", "action": "set_attribute", "attribute": "val", "value": "1F4E79"}"#;
        let op: PatchOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op, PatchOperation::set_attribute("//a:srgbClr", "val", "1F4E79"));
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_validate_required_fields() {
        let mut op = PatchOperation::set_attribute("//a:srgbClr", "val", "000000");
        op.attribute = None;
        assert!(matches!(op.validate(), Err(Error::Config(_))));

        let mut op = PatchOperation::append_child("//p:spTree", "<p:sp/>");
        op.value = None;
        assert!(op.validate().is_err());

        assert!(PatchOperation::remove("//p:sp").validate().is_ok());
        assert!(PatchOperation::remove("  ").validate().is_err());
    }

    #[test]
    fn test_map_strings() {
        let op = PatchOperation::set_text("//a:t", "{brand}").with_namespace("x", "urn:x");
        let mapped = op.map_strings(|s| Ok(s.replace("{brand}", "Acme"))).unwrap();
        assert_eq!(mapped.value.as_deref(), Some("Acme"));
        assert_eq!(mapped.namespaces.get("x").map(String::as_str), Some("urn:x"));
    }
}
