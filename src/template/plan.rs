//! Patch plans: which operations run against which package part.

use crate::common::{Error, Result};
use crate::ooxml::opc::PackURI;
use crate::patch::PatchOperation;
use crate::tokens::ResolvedTokenSet;
use crate::tokens::layer::LayerFormat;
use crate::tokens::value::find_references;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Ordered patch operations keyed by package part.
///
/// Part names are archive member names (`ppt/theme/theme1.xml`); a leading
/// slash is accepted and dropped. Operations may reference tokens with
/// `{a.b}` in their xpath, attribute or value.
///
/// ```yaml
/// ppt/theme/theme1.xml:
///   - xpath: //a:accent1/a:srgbClr
///     action: set_attribute
///     attribute: val
///     value: "{colors.primary}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PatchPlan {
    parts: BTreeMap<String, Vec<PatchOperation>>,
}

impl<'de> Deserialize<'de> for PatchPlan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<PatchOperation>>::deserialize(deserializer)?;
        let mut plan = Self::new();
        for (part, operations) in raw {
            plan.add(&part, operations);
        }
        Ok(plan)
    }
}

impl PatchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append operations for `part`.
    pub fn add(&mut self, part: &str, operations: impl IntoIterator<Item = PatchOperation>) {
        self.parts
            .entry(normalize_part(part).to_string())
            .or_default()
            .extend(operations);
    }

    pub fn with(mut self, part: &str, operations: impl IntoIterator<Item = PatchOperation>) -> Self {
        self.add(part, operations);
        self
    }

    /// Operations for a member name, if the plan targets it.
    pub fn operations_for(&self, member: &str) -> Option<&[PatchOperation]> {
        self.parts.get(normalize_part(member)).map(Vec::as_slice)
    }

    pub fn parts(&self) -> impl Iterator<Item = (&str, &[PatchOperation])> {
        self.parts.iter().map(|(name, ops)| (name.as_str(), ops.as_slice()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Total operations across every part.
    pub fn operation_count(&self) -> usize {
        self.parts.values().map(Vec::len).sum()
    }

    /// Reject unportable part names and incomplete operations.
    pub fn validate(&self) -> Result<()> {
        for (part, operations) in &self.parts {
            PackURI::from_member_name(part)
                .map_err(|e| Error::Config(format!("patch plan part '{}': {}", part, e)))?;
            for (index, op) in operations.iter().enumerate() {
                op.validate()
                    .map_err(|e| Error::Config(format!("patch plan part '{}', operation {}: {}", part, index + 1, e)))?;
            }
        }
        Ok(())
    }

    /// The plan with every `{a.b}` reference replaced by its token value.
    pub fn interpolate(&self, tokens: &ResolvedTokenSet) -> Result<Self> {
        let mut parts = BTreeMap::new();
        for (part, operations) in &self.parts {
            let resolved = operations
                .iter()
                .map(|op| op.map_strings(|s| interpolate(s, tokens, part)))
                .collect::<Result<Vec<_>>>()?;
            parts.insert(part.clone(), resolved);
        }
        Ok(Self { parts })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::parse("patch plan", format!("invalid JSON: {}", e)))
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_saphyr::from_str(text).map_err(|e| Error::parse("patch plan", format!("invalid YAML: {}", e)))
    }

    /// Load a plan file, choosing the parser by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = LayerFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let plan = match format {
            LayerFormat::Json => Self::from_json_str(&text)?,
            #[cfg(feature = "yaml")]
            LayerFormat::Yaml => Self::from_yaml_str(&text)?,
        };
        tracing::debug!(
            "loaded patch plan from {}: {} part(s), {} operation(s)",
            path.display(),
            plan.len(),
            plan.operation_count()
        );
        Ok(plan)
    }
}

fn normalize_part(part: &str) -> &str {
    part.trim_start_matches('/')
}

/// Replace every `{a.b}` fragment of `text` with the token's value.
pub fn interpolate(text: &str, tokens: &ResolvedTokenSet, referenced_by: &str) -> Result<String> {
    let references = find_references(text);
    if references.is_empty() {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (range, path) in references {
        let value = tokens.get(path).ok_or_else(|| Error::MissingToken {
            path: path.to_string(),
            referenced_by: Some(referenced_by.to_string()),
        })?;
        out.push_str(&text[last..range.start]);
        out.push_str(&value.to_string());
        last = range.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchAction;

    fn tokens() -> ResolvedTokenSet {
        let mut tokens = ResolvedTokenSet::new();
        tokens.insert("colors.primary", "1F4E79");
        tokens.insert("spacing.base", 8i64);
        tokens
    }

    #[test]
    fn test_interpolate_fragments() {
        let tokens = tokens();
        assert_eq!(interpolate("{colors.primary}", &tokens, "p").unwrap(), "1F4E79");
        assert_eq!(interpolate("pad {spacing.base}pt", &tokens, "p").unwrap(), "pad 8pt");
        assert_eq!(interpolate("no refs {}", &tokens, "p").unwrap(), "no refs {}");
        assert!(matches!(
            interpolate("{colors.missing}", &tokens, "ppt/theme/theme1.xml"),
            Err(Error::MissingToken { ref path, referenced_by: Some(ref by) })
                if path == "colors.missing" && by == "ppt/theme/theme1.xml"
        ));
    }

    #[test]
    fn test_plan_from_json() {
        let plan = PatchPlan::from_json_str(
            r#"{
                "/ppt/theme/theme1.xml": [
                    {"xpath": "//a:accent1/a:srgbClr", "action": "set_attribute", "attribute": "val", "value": "{colors.primary}"}
                ],
                "ppt/slides/slide1.xml": [
                    {"xpath": "//p:sp", "action": "remove_element"}
                ]
            }"#,
        )
        .unwrap();
        plan.validate().unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.operation_count(), 2);

        assert_eq!(
            plan.parts().map(|(name, _)| name).collect::<Vec<_>>(),
            ["ppt/slides/slide1.xml", "ppt/theme/theme1.xml"]
        );
        let ops = plan.operations_for("ppt/theme/theme1.xml").unwrap();
        assert_eq!(ops[0].action, PatchAction::SetAttribute);

        let resolved = plan.interpolate(&tokens()).unwrap();
        let ops = resolved.operations_for("/ppt/theme/theme1.xml").unwrap();
        assert_eq!(ops[0].value.as_deref(), Some("1F4E79"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_plan_from_yaml() {
        let plan = PatchPlan::from_yaml_str(
            "word/document.xml:\n  - xpath: //w:body\n    action: append_child\n    value: <w:p/>\n",
        )
        .unwrap();
        assert_eq!(plan.operations_for("word/document.xml").unwrap().len(), 1);
    }

    #[test]
    fn test_validate_rejects_defects() {
        let plan = PatchPlan::new().with("../escape.xml", [PatchOperation::remove("//x")]);
        assert!(matches!(plan.validate(), Err(Error::Config(_))));

        let mut incomplete = PatchOperation::set_text("//a:t", "x");
        incomplete.value = None;
        let plan = PatchPlan::new().with("ppt/slides/slide1.xml", [incomplete]);
        assert!(matches!(plan.validate(), Err(Error::Config(_))));
    }
}
