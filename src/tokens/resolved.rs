//! Resolution outputs.
//!
//! [`ResolvedTokens`] is the reference-free tree that may still hold
//! aspect-ratio and deferred conditional nodes. [`ResolvedTokenSet`] is the
//! fully concrete, flat form consumed by generators.

use super::context::ResolutionContext;
use super::value::{Scalar, TokenValue, join_path};
use crate::common::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// A merged token tree with every reference resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTokens {
    root: TokenValue,
    context: ResolutionContext,
}

impl ResolvedTokens {
    pub(crate) fn new(root: TokenValue, context: ResolutionContext) -> Self {
        Self { root, context }
    }

    #[inline]
    pub fn root(&self) -> &TokenValue {
        &self.root
    }

    /// The context the tree was resolved with.
    #[inline]
    pub fn context(&self) -> &ResolutionContext {
        &self.context
    }

    pub fn get(&self, path: &str) -> Option<&TokenValue> {
        self.root.get(path)
    }

    /// Whether aspect-ratio or conditional nodes remain.
    pub fn has_deferred(&self) -> bool {
        self.root.has_deferred()
    }

    /// Flatten a tree that holds no deferred nodes.
    pub fn flatten(&self) -> Result<ResolvedTokenSet> {
        ResolvedTokenSet::from_tree(&self.root)
    }

    /// Canonical JSON text of the tree (sorted keys, compact).
    pub fn to_canonical_json(&self) -> String {
        self.root.to_json().to_string()
    }
}

/// Flat `path -> value` map with no references or conditionals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedTokenSet {
    tokens: BTreeMap<String, Scalar>,
}

impl ResolvedTokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a concrete tree. Any aspect-ratio or conditional node is an
    /// [`Error::UnresolvedConditional`] at its path.
    pub fn from_tree(root: &TokenValue) -> Result<Self> {
        let mut set = Self::new();
        flatten_into("", root, &mut set.tokens)?;
        Ok(set)
    }

    #[inline]
    pub fn get(&self, path: &str) -> Option<&Scalar> {
        self.tokens.get(path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Scalar::as_str)
    }

    /// First path in `paths` that has a value.
    pub fn first_of<'a>(&'a self, paths: &[&str]) -> Option<(&'a str, &'a Scalar)> {
        paths
            .iter()
            .find_map(|p| self.tokens.get_key_value(*p))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Scalar>) {
        self.tokens.insert(path.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Canonical JSON text (sorted keys, compact).
    pub fn to_canonical_json(&self) -> String {
        let mut map = serde_json::Map::new();
        for (path, value) in &self.tokens {
            map.insert(path.clone(), value.to_json());
        }
        serde_json::Value::Object(map).to_string()
    }
}

fn flatten_into(path: &str, node: &TokenValue, out: &mut BTreeMap<String, Scalar>) -> Result<()> {
    match node {
        TokenValue::Scalar(s) => {
            out.insert(path.to_string(), s.clone());
            Ok(())
        },
        TokenValue::Object(children) => {
            for (key, child) in children {
                flatten_into(&join_path(path, key), child, out)?;
            }
            Ok(())
        },
        TokenValue::AspectRatio(_) | TokenValue::Conditional(_) => Err(Error::UnresolvedConditional {
            path: path.to_string(),
        }),
        TokenValue::Reference(target) => Err(Error::InvalidToken {
            path: path.to_string(),
            reason: format!("unresolved reference to '{}'", target),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_sorted() {
        let tree = TokenValue::from_json(
            "",
            &json!({"typography": {"size": 12}, "colors": {"primary": "#0066CC", "bg": "#FFFFFF"}}),
        )
        .unwrap();
        let set = ResolvedTokenSet::from_tree(&tree).unwrap();
        let paths: Vec<_> = set.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["colors.bg", "colors.primary", "typography.size"]);
        assert_eq!(
            set.to_canonical_json(),
            r##"{"colors.bg":"#FFFFFF","colors.primary":"#0066CC","typography.size":12}"##
        );
        assert_eq!(set.first_of(&["x", "colors.bg"]).map(|(p, _)| p), Some("colors.bg"));
    }

    #[test]
    fn test_flatten_rejects_deferred() {
        let tree = TokenValue::from_json(
            "",
            &json!({"layout": {"width": {"$aspectRatio": {"16:9": 10}}}}),
        )
        .unwrap();
        let err = ResolvedTokenSet::from_tree(&tree).unwrap_err();
        assert!(matches!(err, Error::UnresolvedConditional { ref path } if path == "layout.width"));
    }
}
