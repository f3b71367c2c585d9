//! Memo caches for one generation run.

use crate::common::{Result, guid_for};
use crate::geometry::{AspectRatioResolver, AspectRatioSpec, normalize_ratio_id};
use crate::tokens::{ResolvedTokenSet, ResolvedTokens};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Caches owned by a single `generate` call and shared by its workers.
///
/// Every key is a deterministic input (design name, ratio id, design
/// index), so a hit always returns what a fresh computation would.
#[derive(Debug, Default)]
pub struct GenerationContext {
    guids: RwLock<HashMap<String, String>>,
    ratios: RwLock<HashMap<String, AspectRatioSpec>>,
    token_sets: RwLock<HashMap<(usize, String), Arc<ResolvedTokenSet>>>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Design GUID for `design_name`.
    pub fn guid(&self, design_name: &str) -> String {
        if let Some(guid) = self.guids.read().get(design_name) {
            return guid.clone();
        }
        let guid = guid_for(design_name);
        self.guids
            .write()
            .entry(design_name.to_string())
            .or_insert(guid)
            .clone()
    }

    /// Dimensions for `ratio_id`.
    pub fn dimensions(&self, resolver: &AspectRatioResolver, ratio_id: &str) -> Result<AspectRatioSpec> {
        let key = normalize_ratio_id(ratio_id);
        if let Some(spec) = self.ratios.read().get(&key) {
            return Ok(spec.clone());
        }
        let spec = resolver.dimensions(ratio_id)?;
        Ok(self.ratios.write().entry(key).or_insert(spec).clone())
    }

    /// Flattened tokens of design `design_index` at `ratio_id`.
    pub fn token_set(
        &self,
        resolver: &AspectRatioResolver,
        design_index: usize,
        tokens: &ResolvedTokens,
        ratio_id: &str,
    ) -> Result<Arc<ResolvedTokenSet>> {
        let key = (design_index, normalize_ratio_id(ratio_id));
        if let Some(set) = self.token_sets.read().get(&key) {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(resolver.resolve(tokens, ratio_id)?);
        Ok(Arc::clone(self.token_sets.write().entry(key).or_insert(set)))
    }

    /// Number of cached token sets.
    pub fn cached_token_sets(&self) -> usize {
        self.token_sets.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{ResolutionContext, TokenLayer, LayerKind, TokenResolver};

    #[test]
    fn test_caches_return_same_values() {
        let ctx = GenerationContext::new();
        assert_eq!(ctx.guid("Acme"), guid_for("Acme"));
        assert_eq!(ctx.guid("Acme"), ctx.guid("Acme"));

        let resolver = AspectRatioResolver::new();
        let a = ctx.dimensions(&resolver, "16:9").unwrap();
        let b = ctx.dimensions(&resolver, " 16:9 ").unwrap();
        assert_eq!(a, b);
        assert!(ctx.dimensions(&resolver, "wide").is_err());
    }

    #[test]
    fn test_token_set_memoized() {
        let layer = TokenLayer::from_json_str(
            "core",
            LayerKind::Core,
            r#"{"spacing": {"$aspectRatio": {"16:9": "10", "4:3": "8"}}}"#,
        )
        .unwrap();
        let tokens = TokenResolver::new()
            .resolve(&[layer], &ResolutionContext::new())
            .unwrap();
        let ctx = GenerationContext::new();
        let resolver = AspectRatioResolver::new();
        let first = ctx.token_set(&resolver, 0, &tokens, "16:9").unwrap();
        let again = ctx.token_set(&resolver, 0, &tokens, "16:9").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.get_str("spacing"), Some("10"));
        assert_eq!(ctx.token_set(&resolver, 0, &tokens, "4:3").unwrap().get_str("spacing"), Some("8"));
        assert_eq!(ctx.cached_token_sets(), 2);
    }
}
