//! Layer merging and reference resolution.

use super::context::ResolutionContext;
use super::layer::TokenLayer;
use super::resolved::{ResolvedTokenSet, ResolvedTokens};
use super::value::{Conditional, Scalar, TokenValue, find_references, join_path};
use crate::common::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Merges token layers and resolves references and concrete conditionals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenResolver;

impl TokenResolver {
    pub fn new() -> Self {
        Self
    }

    /// Merge layers in order; later layers win at the leaf level.
    pub fn merge(&self, layers: &[TokenLayer]) -> TokenValue {
        let mut merged = TokenValue::empty();
        for layer in layers {
            merge_into(&mut merged, layer.tokens());
            tracing::trace!("merged token layer '{}' ({})", layer.name(), layer.kind());
        }
        merged
    }

    /// Merge and resolve. Conditionals whose predicate is not concrete in
    /// `context` are kept, with both branches resolved.
    pub fn resolve(&self, layers: &[TokenLayer], context: &ResolutionContext) -> Result<ResolvedTokens> {
        let merged = self.merge(layers);
        let mut cache = ResolutionCache::new(&merged, context);
        let root = cache.resolve_node("", &merged)?.unwrap_or_else(TokenValue::empty);

        tracing::debug!(
            "resolved {} token layer(s), {} path(s) visited, deferred nodes: {}",
            layers.len(),
            cache.resolved.len(),
            root.has_deferred()
        );
        Ok(ResolvedTokens::new(root, context.clone()))
    }

    /// Resolve and flatten. Fails if any conditional or aspect-ratio node
    /// could not be decided from `context`.
    pub fn resolve_flat(
        &self,
        layers: &[TokenLayer],
        context: &ResolutionContext,
    ) -> Result<ResolvedTokenSet> {
        self.resolve(layers, context)?.flatten()
    }
}

/// Look up `rest` below a resolved node. A deferred conditional yields a
/// conditional over the same lookup in each branch.
fn descend(base: &TokenValue, rest: &str) -> Option<TokenValue> {
    match base {
        TokenValue::Conditional(cond) => {
            let then = descend(&cond.then, rest)?;
            let otherwise = match &cond.otherwise {
                Some(v) => Some(descend(v, rest)?),
                None => None,
            };
            Some(TokenValue::Conditional(Box::new(Conditional {
                predicate: cond.predicate.clone(),
                then,
                otherwise,
            })))
        },
        _ => base.get(rest).cloned(),
    }
}

fn merge_into(base: &mut TokenValue, overlay: &TokenValue) {
    match (base, overlay) {
        (TokenValue::Object(base), TokenValue::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    },
                }
            }
        },
        (TokenValue::AspectRatio(base), TokenValue::AspectRatio(overlay)) => {
            for (ratio, value) in overlay {
                match base.iter_mut().find(|(r, _)| r == ratio) {
                    Some((_, existing)) => *existing = value.clone(),
                    None => base.push((ratio.clone(), value.clone())),
                }
            }
        },
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Per-call memo of resolved paths plus the in-progress stack used for
/// cycle detection.
struct ResolutionCache<'a> {
    merged: &'a TokenValue,
    context: &'a ResolutionContext,
    // None records a token removed by a false conditional
    resolved: HashMap<String, Option<TokenValue>>,
    stack: Vec<String>,
}

impl<'a> ResolutionCache<'a> {
    fn new(merged: &'a TokenValue, context: &'a ResolutionContext) -> Self {
        Self {
            merged,
            context,
            resolved: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Resolve an addressable path of the merged tree.
    fn resolve_path(&mut self, target: &str, referenced_by: Option<&str>) -> Result<Option<TokenValue>> {
        if let Some(done) = self.resolved.get(target) {
            return Ok(done.clone());
        }

        if let Some(pos) = self.stack.iter().position(|p| p == target) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(target.to_string());
            return Err(Error::CircularReference {
                path: target.to_string(),
                chain,
            });
        }

        let node = match self.merged.get(target) {
            Some(node) => node,
            None => return self.resolve_through_alias(target, referenced_by),
        };

        self.stack.push(target.to_string());
        let result = self.resolve_node(target, node);
        self.stack.pop();

        let value = result?;
        self.resolved.insert(target.to_string(), value.clone());
        Ok(value)
    }

    /// `{alias.primary}` where `alias` is a reference to a group or a
    /// conditional whose branches are groups.
    fn resolve_through_alias(&mut self, target: &str, referenced_by: Option<&str>) -> Result<Option<TokenValue>> {
        let missing = || Error::MissingToken {
            path: target.to_string(),
            referenced_by: referenced_by.map(str::to_string),
        };

        let mut split = target.len();
        while let Some(dot) = target[..split].rfind('.') {
            split = dot;
            let prefix = &target[..split];
            if let Some(TokenValue::Reference(_) | TokenValue::Conditional(_)) = self.merged.get(prefix) {
                let base = self.resolve_path(prefix, referenced_by)?.ok_or_else(missing)?;
                return descend(&base, &target[split + 1..]).map(Some).ok_or_else(missing);
            }
        }
        Err(missing())
    }

    fn resolve_node(&mut self, path: &str, node: &TokenValue) -> Result<Option<TokenValue>> {
        match node {
            TokenValue::Scalar(Scalar::String(s)) => self.interpolate(path, s).map(Some),
            TokenValue::Scalar(s) => Ok(Some(TokenValue::Scalar(s.clone()))),
            TokenValue::Reference(target) => {
                let value = self.resolve_path(target, Some(path))?;
                value.map(Some).ok_or_else(|| Error::MissingToken {
                    path: target.clone(),
                    referenced_by: Some(path.to_string()),
                })
            },
            TokenValue::AspectRatio(entries) => {
                let mut resolved = Vec::with_capacity(entries.len());
                for (ratio, value) in entries {
                    let branch_path = format!("{}[{}]", path, ratio);
                    if let Some(v) = self.resolve_branch(&branch_path, path, value)? {
                        resolved.push((ratio.clone(), v));
                    }
                }
                Ok(Some(TokenValue::AspectRatio(resolved)))
            },
            TokenValue::Conditional(cond) => self.resolve_conditional(path, cond),
            TokenValue::Object(children) => {
                let mut resolved = BTreeMap::new();
                for key in children.keys() {
                    let child_path = join_path(path, key);
                    if let Some(v) = self.resolve_path(&child_path, None)? {
                        resolved.insert(key.clone(), v);
                    }
                }
                Ok(Some(TokenValue::Object(resolved)))
            },
        }
    }

    /// Resolve a node that is not addressable by path (a conditional or
    /// aspect-ratio branch). Object children inside a branch are resolved
    /// in place rather than through the merged tree.
    fn resolve_branch(&mut self, label: &str, owner: &str, node: &TokenValue) -> Result<Option<TokenValue>> {
        match node {
            TokenValue::Object(children) => {
                let mut resolved = BTreeMap::new();
                for (key, child) in children {
                    let child_label = join_path(label, key);
                    if let Some(v) = self.resolve_branch(&child_label, owner, child)? {
                        resolved.insert(key.clone(), v);
                    }
                }
                Ok(Some(TokenValue::Object(resolved)))
            },
            TokenValue::Reference(target) => {
                let value = self.resolve_path(target, Some(owner))?;
                value.map(Some).ok_or_else(|| Error::MissingToken {
                    path: target.clone(),
                    referenced_by: Some(owner.to_string()),
                })
            },
            TokenValue::Scalar(Scalar::String(s)) => self.interpolate(owner, s).map(Some),
            TokenValue::Scalar(s) => Ok(Some(TokenValue::Scalar(s.clone()))),
            TokenValue::AspectRatio(entries) => {
                let mut resolved = Vec::with_capacity(entries.len());
                for (ratio, value) in entries {
                    let branch_label = format!("{}[{}]", label, ratio);
                    if let Some(v) = self.resolve_branch(&branch_label, owner, value)? {
                        resolved.push((ratio.clone(), v));
                    }
                }
                Ok(Some(TokenValue::AspectRatio(resolved)))
            },
            TokenValue::Conditional(cond) => self.resolve_conditional(owner, cond),
        }
    }

    fn resolve_conditional(&mut self, path: &str, cond: &Conditional) -> Result<Option<TokenValue>> {
        match self.context.evaluate(&cond.predicate) {
            Some(true) => self.resolve_branch(&format!("{}[then]", path), path, &cond.then),
            Some(false) => match &cond.otherwise {
                Some(otherwise) => self.resolve_branch(&format!("{}[else]", path), path, otherwise),
                None => {
                    tracing::trace!("conditional '{}' is false without else; token removed", path);
                    Ok(None)
                },
            },
            None => {
                let then = self
                    .resolve_branch(&format!("{}[then]", path), path, &cond.then)?
                    .ok_or_else(|| Error::InvalidToken {
                        path: path.to_string(),
                        reason: "deferred conditional has an empty 'then' branch".to_string(),
                    })?;
                let otherwise = match &cond.otherwise {
                    Some(v) => self.resolve_branch(&format!("{}[else]", path), path, v)?,
                    None => None,
                };
                Ok(Some(TokenValue::Conditional(Box::new(Conditional {
                    predicate: cond.predicate.clone(),
                    then,
                    otherwise,
                }))))
            },
        }
    }

    /// Substitute every `{a.b}` fragment of `s` with its scalar value.
    fn interpolate(&mut self, path: &str, s: &str) -> Result<TokenValue> {
        let refs = find_references(s);
        if refs.is_empty() {
            return Ok(TokenValue::Scalar(Scalar::String(s.to_string())));
        }

        let mut out = String::with_capacity(s.len());
        let mut last = 0;
        for (range, target) in refs {
            out.push_str(&s[last..range.start]);
            match self.resolve_path(target, Some(path))? {
                Some(TokenValue::Scalar(value)) => out.push_str(&value.to_string()),
                Some(_) => {
                    return Err(Error::InvalidToken {
                        path: path.to_string(),
                        reason: format!("'{{{}}}' does not resolve to a single value", target),
                    });
                },
                None => {
                    return Err(Error::MissingToken {
                        path: target.to_string(),
                        referenced_by: Some(path.to_string()),
                    });
                },
            }
            last = range.end;
        }
        out.push_str(&s[last..]);
        Ok(TokenValue::Scalar(Scalar::String(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::layer::LayerKind;
    use proptest::prelude::*;
    use serde_json::json;

    fn layer(name: &str, value: serde_json::Value) -> TokenLayer {
        TokenLayer::from_value(name, LayerKind::Core, &value).unwrap()
    }

    #[test]
    fn test_primary_color_reference() {
        let layers = [layer(
            "core",
            json!({"colors": {"primary": "#0066CC"}, "typography": {"color": "{colors.primary}"}}),
        )];
        let set = TokenResolver::new()
            .resolve_flat(&layers, &ResolutionContext::new())
            .unwrap();
        assert_eq!(set.get_str("typography.color"), Some("#0066CC"));
    }

    #[test]
    fn test_circular_reference() {
        let layers = [layer("core", json!({"a": "{b}", "b": "{a}"}))];
        let err = TokenResolver::new()
            .resolve(&layers, &ResolutionContext::new())
            .unwrap_err();
        match err {
            Error::CircularReference { chain, .. } => {
                assert_eq!(chain, ["a", "b", "a"]);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_through_parent() {
        let layers = [layer("core", json!({"a": {"b": "{a}"}}))];
        let err = TokenResolver::new()
            .resolve(&layers, &ResolutionContext::new())
            .unwrap_err();
        assert!(matches!(err, Error::CircularReference { .. }));
    }

    #[test]
    fn test_missing_token() {
        let layers = [layer("core", json!({"typography": {"color": "{colors.brand}"}}))];
        let err = TokenResolver::new()
            .resolve(&layers, &ResolutionContext::new())
            .unwrap_err();
        match err {
            Error::MissingToken { path, referenced_by } => {
                assert_eq!(path, "colors.brand");
                assert_eq!(referenced_by.as_deref(), Some("typography.color"));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reference_into_conditional_group() {
        let layers = [layer(
            "core",
            json!({
                "a": {"$conditional": {"if": "channel == print", "then": {"b": 1}, "else": {"b": 2}}},
                "x": "{a.b}"
            }),
        )];
        let print = ResolutionContext::new().with_channel("print");
        let set = TokenResolver::new().resolve_flat(&layers, &print).unwrap();
        assert_eq!(set.get("x").map(|v| v.to_string()).as_deref(), Some("1"));

        let screen = ResolutionContext::new().with_channel("screen");
        let set = TokenResolver::new().resolve_flat(&layers, &screen).unwrap();
        assert_eq!(set.get("x").map(|v| v.to_string()).as_deref(), Some("2"));

        // undecided: the reference stays conditional and flattening fails
        let resolved = TokenResolver::new()
            .resolve(&layers, &ResolutionContext::new())
            .unwrap();
        assert!(resolved.root().has_deferred());
        assert!(matches!(resolved.flatten(), Err(Error::UnresolvedConditional { .. })));
    }

    #[test]
    fn test_leaf_merge_keeps_siblings() {
        let layers = [
            layer("core", json!({"colors": {"primary": "#000000", "secondary": "#111111"}})),
            layer("org", json!({"colors": {"primary": "#0066CC"}})),
        ];
        let set = TokenResolver::new()
            .resolve_flat(&layers, &ResolutionContext::new())
            .unwrap();
        assert_eq!(set.get_str("colors.primary"), Some("#0066CC"));
        assert_eq!(set.get_str("colors.secondary"), Some("#111111"));
    }

    #[test]
    fn test_aspect_ratio_merge_per_key() {
        let layers = [
            layer("core", json!({"w": {"$aspectRatio": {"16:9": 1, "4:3": 2}}})),
            layer("org", json!({"w": {"$aspectRatio": {"4:3": 3, "16:10": 4}}})),
        ];
        let resolved = TokenResolver::new()
            .resolve(&layers, &ResolutionContext::new())
            .unwrap();
        match resolved.get("w") {
            Some(TokenValue::AspectRatio(entries)) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, ["16:9", "4:3", "16:10"]);
                assert_eq!(entries[1].1, TokenValue::Scalar(Scalar::Integer(3)));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_interpolation_and_alias() {
        let layers = [layer(
            "core",
            json!({
                "colors": {"border": "#CCCCCC"},
                "palette": "{colors}",
                "border": "1px solid {palette.border}",
                "size": {"base": 4, "label": "{size.base}pt"}
            }),
        )];
        let set = TokenResolver::new()
            .resolve_flat(&layers, &ResolutionContext::new())
            .unwrap();
        assert_eq!(set.get_str("border"), Some("1px solid #CCCCCC"));
        assert_eq!(set.get_str("palette.border"), Some("#CCCCCC"));
        assert_eq!(set.get_str("size.label"), Some("4pt"));
    }

    #[test]
    fn test_conditionals() {
        let layers = [layer(
            "core",
            json!({
                "colors": {"primary": "#0066CC"},
                "mode": {"$conditional": {"if": "channel == print", "then": "cmyk", "else": "rgb"}},
                "bleed": {"$conditional": {"if": "channel == print", "then": 3}},
                "title": {"$conditional": {"if": "aspectRatio == '4:3'", "then": 40, "else": "{colors.primary}"}}
            }),
        )];
        let resolver = TokenResolver::new();

        let web = resolver
            .resolve(&layers, &ResolutionContext::new().with_channel("web"))
            .unwrap();
        assert_eq!(
            web.get("mode"),
            Some(&TokenValue::Scalar(Scalar::String("rgb".to_string())))
        );
        assert!(web.get("bleed").is_none());

        // aspectRatio unknown: deferred with resolved branches
        match web.get("title") {
            Some(TokenValue::Conditional(cond)) => {
                assert_eq!(
                    cond.otherwise,
                    Some(TokenValue::Scalar(Scalar::String("#0066CC".to_string())))
                );
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(!web.root().has_references());

        let err = resolver
            .resolve_flat(&layers, &ResolutionContext::new().with_channel("web"))
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedConditional { ref path } if path == "title"));

        let set = resolver
            .resolve_flat(
                &layers,
                &ResolutionContext::new().with_channel("print").with_aspect_ratio("4:3"),
            )
            .unwrap();
        assert_eq!(set.get("title"), Some(&Scalar::Integer(40)));
        assert_eq!(set.get("bleed"), Some(&Scalar::Integer(3)));
    }

    fn token_tree() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            "[a-z#0-9]{1,8}".prop_map(serde_json::Value::from),
            any::<i32>().prop_map(serde_json::Value::from),
            any::<bool>().prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map("[a-z]{1,4}", inner, 1..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect()))
        })
        .prop_map(|v| match v {
            serde_json::Value::Object(_) => v,
            other => json!({ "root": other }),
        })
    }

    proptest! {
        #[test]
        fn prop_resolution_is_deterministic(a in token_tree(), b in token_tree()) {
            let layers = [layer("core", a), layer("org", b)];
            let resolver = TokenResolver::new();
            let ctx = ResolutionContext::new();
            let first = resolver.resolve(&layers, &ctx).unwrap();
            let second = resolver.resolve(&layers, &ctx).unwrap();
            prop_assert_eq!(first.to_canonical_json(), second.to_canonical_json());
            prop_assert!(!first.root().has_references());
        }
    }
}
