//! Selecting per-ratio token values.

use super::ratio::{AspectRatioSpec, normalize_ratio_id};
use crate::common::{Error, Result};
use crate::tokens::{ResolutionContext, ResolvedTokenSet, ResolvedTokens, TokenValue};
use crate::tokens::value::join_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do when an `$aspectRatio` node has no entry for the target ratio.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRatioPolicy {
    /// Fail with [`Error::MissingAspectRatio`].
    #[default]
    Error,
    /// Use the entry for this ratio id instead.
    ExplicitDefaultKey(String),
    /// Use the first entry in declaration order.
    FirstDefined,
}

/// Resolves aspect-ratio conditionals and late-bound conditionals for one
/// target ratio, producing a flat token set.
#[derive(Debug, Clone, Default)]
pub struct AspectRatioResolver {
    policy: MissingRatioPolicy,
}

impl AspectRatioResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MissingRatioPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MissingRatioPolicy {
        &self.policy
    }

    /// Dimensions for a ratio id (standard table, then custom `W:H`).
    pub fn dimensions(&self, ratio_id: &str) -> Result<AspectRatioSpec> {
        AspectRatioSpec::lookup(ratio_id)
    }

    /// Flatten `tokens` for `ratio_id`.
    pub fn resolve(&self, tokens: &ResolvedTokens, ratio_id: &str) -> Result<ResolvedTokenSet> {
        let target = normalize_ratio_id(ratio_id);
        let context = tokens.context().clone().with_aspect_ratio(target.clone());
        let selector = Selector {
            policy: &self.policy,
            target: &target,
            context: &context,
        };
        let root = selector.select("", tokens.root())?.unwrap_or_else(TokenValue::empty);
        ResolvedTokenSet::from_tree(&root)
    }
}

struct Selector<'a> {
    policy: &'a MissingRatioPolicy,
    target: &'a str,
    context: &'a ResolutionContext,
}

impl Selector<'_> {
    fn select(&self, path: &str, node: &TokenValue) -> Result<Option<TokenValue>> {
        match node {
            TokenValue::Scalar(_) => Ok(Some(node.clone())),
            TokenValue::Object(children) => {
                let mut out = BTreeMap::new();
                for (key, child) in children {
                    if let Some(v) = self.select(&join_path(path, key), child)? {
                        out.insert(key.clone(), v);
                    }
                }
                Ok(Some(TokenValue::Object(out)))
            },
            TokenValue::AspectRatio(entries) => {
                let chosen = self.choose(path, entries)?;
                self.select(path, chosen)
            },
            TokenValue::Conditional(cond) => match self.context.evaluate(&cond.predicate) {
                Some(true) => self.select(path, &cond.then),
                Some(false) => match &cond.otherwise {
                    Some(otherwise) => self.select(path, otherwise),
                    None => Ok(None),
                },
                None => Err(Error::UnresolvedConditional {
                    path: path.to_string(),
                }),
            },
            TokenValue::Reference(target) => Err(Error::InvalidToken {
                path: path.to_string(),
                reason: format!("unresolved reference to '{}'", target),
            }),
        }
    }

    fn choose<'n>(&self, path: &str, entries: &'n [(String, TokenValue)]) -> Result<&'n TokenValue> {
        let find = |id: &str| {
            entries
                .iter()
                .find(|(key, _)| normalize_ratio_id(key) == id)
                .map(|(_, v)| v)
        };
        if let Some(v) = find(self.target) {
            return Ok(v);
        }

        let fallback = match self.policy {
            MissingRatioPolicy::Error => None,
            MissingRatioPolicy::ExplicitDefaultKey(key) => find(&normalize_ratio_id(key)),
            MissingRatioPolicy::FirstDefined => entries.first().map(|(_, v)| v),
        };
        match fallback {
            Some(v) => {
                tracing::debug!(
                    "'{}' has no value for ratio '{}'; using {:?} fallback",
                    path,
                    self.target,
                    self.policy
                );
                Ok(v)
            },
            None => Err(Error::MissingAspectRatio {
                path: path.to_string(),
                ratio: self.target.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{LayerKind, Scalar, TokenLayer, TokenResolver};
    use serde_json::json;

    fn resolved(value: serde_json::Value) -> ResolvedTokens {
        let layer = TokenLayer::from_value("core", LayerKind::Core, &value).unwrap();
        TokenResolver::new()
            .resolve(&[layer], &ResolutionContext::new())
            .unwrap()
    }

    #[test]
    fn test_selects_ratio_value() {
        let tokens = resolved(json!({
            "title": {"size": {"$aspectRatio": {"16:9": 44, "4:3": 40}}},
            "body": {"$conditional": {"if": "aspectRatio == 4:3", "then": "narrow", "else": "wide"}}
        }));
        let resolver = AspectRatioResolver::new();

        let wide = resolver.resolve(&tokens, "16:9").unwrap();
        assert_eq!(wide.get("title.size"), Some(&Scalar::Integer(44)));
        assert_eq!(wide.get_str("body"), Some("wide"));

        let narrow = resolver.resolve(&tokens, "4:3").unwrap();
        assert_eq!(narrow.get("title.size"), Some(&Scalar::Integer(40)));
        assert_eq!(narrow.get_str("body"), Some("narrow"));
    }

    #[test]
    fn test_missing_ratio_policies() {
        let tokens = resolved(json!({"w": {"$aspectRatio": {"4:3": 1, "16:9": 2}}}));

        let err = AspectRatioResolver::new().resolve(&tokens, "16:10").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAspectRatio { ref path, ref ratio } if path == "w" && ratio == "16:10"
        ));

        let first = AspectRatioResolver::with_policy(MissingRatioPolicy::FirstDefined)
            .resolve(&tokens, "16:10")
            .unwrap();
        assert_eq!(first.get("w"), Some(&Scalar::Integer(1)));

        let explicit =
            AspectRatioResolver::with_policy(MissingRatioPolicy::ExplicitDefaultKey("16:9".into()))
                .resolve(&tokens, "16:10")
                .unwrap();
        assert_eq!(explicit.get("w"), Some(&Scalar::Integer(2)));

        let absent =
            AspectRatioResolver::with_policy(MissingRatioPolicy::ExplicitDefaultKey("a4-landscape".into()))
                .resolve(&tokens, "16:10");
        assert!(absent.is_err());
    }

    #[test]
    fn test_unresolvable_conditional() {
        let tokens = resolved(json!({"x": {"$conditional": {"if": "locale == fr", "then": 1}}}));
        let err = AspectRatioResolver::new().resolve(&tokens, "16:9").unwrap_err();
        assert!(matches!(err, Error::UnresolvedConditional { ref path } if path == "x"));
    }

    #[test]
    fn test_dimensions_and_policy_serde() {
        let resolver = AspectRatioResolver::new();
        assert_eq!(resolver.dimensions("4:3").unwrap().width_emu, 9_144_000);
        assert_eq!(resolver.dimensions("2:1").unwrap().width_emu, 13_716_000);

        let policy: MissingRatioPolicy =
            serde_json::from_str(r#"{"explicit_default_key": "16:9"}"#).unwrap();
        assert_eq!(policy, MissingRatioPolicy::ExplicitDefaultKey("16:9".into()));
        let policy: MissingRatioPolicy = serde_json::from_str(r#""first_defined""#).unwrap();
        assert_eq!(policy, MissingRatioPolicy::FirstDefined);
    }
}
