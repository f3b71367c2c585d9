//! Resolution context: the key/value facts conditionals are evaluated against.

use super::value::Predicate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Context key holding the target aspect-ratio id.
pub const ASPECT_RATIO: &str = "aspectRatio";
/// Context key holding the output channel (`print`, `web`, ...).
pub const CHANNEL: &str = "channel";

/// Keys that are bound late in the pipeline. A predicate on one of these
/// keys is deferred while the key is absent instead of being read as unset.
const LATE_BOUND_KEYS: &[&str] = &[ASPECT_RATIO];

/// Facts available while resolving tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionContext {
    values: BTreeMap<String, String>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_aspect_ratio(self, ratio_id: impl Into<String>) -> Self {
        self.with(ASPECT_RATIO, ratio_id)
    }

    pub fn with_channel(self, channel: impl Into<String>) -> Self {
        self.with(CHANNEL, channel)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn aspect_ratio(&self) -> Option<&str> {
        self.get(ASPECT_RATIO)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Evaluate a predicate.
    ///
    /// Returns `None` when the predicate is not concrete yet: comparisons on
    /// an absent key, and any test of an absent late-bound key such as
    /// `aspectRatio`. Presence tests on other keys read absence as unset.
    pub fn evaluate(&self, predicate: &Predicate) -> Option<bool> {
        let key = predicate.key();
        let current = self.get(key);
        let late_bound = LATE_BOUND_KEYS.contains(&key);

        match predicate {
            Predicate::Equals { value, .. } => current.map(|c| c == value),
            Predicate::NotEquals { value, .. } => current.map(|c| c != value),
            Predicate::OneOf { values, .. } => current.map(|c| values.iter().any(|v| v == c)),
            Predicate::IsSet { .. } => match current {
                Some(_) => Some(true),
                None if late_bound => None,
                None => Some(false),
            },
            Predicate::IsUnset { .. } => match current {
                Some(_) => Some(false),
                None if late_bound => None,
                None => Some(true),
            },
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResolutionContext {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(s: &str) -> Predicate {
        Predicate::parse(s).unwrap()
    }

    #[test]
    fn test_comparisons() {
        let ctx = ResolutionContext::new().with_channel("print");
        assert_eq!(ctx.evaluate(&pred("channel == print")), Some(true));
        assert_eq!(ctx.evaluate(&pred("channel != print")), Some(false));
        assert_eq!(ctx.evaluate(&pred("channel in [web, print]")), Some(true));
        assert_eq!(ctx.evaluate(&pred("locale == en")), None);
    }

    #[test]
    fn test_presence_and_late_binding() {
        let ctx = ResolutionContext::new();
        assert_eq!(ctx.evaluate(&pred("channel")), Some(false));
        assert_eq!(ctx.evaluate(&pred("!channel")), Some(true));
        assert_eq!(ctx.evaluate(&pred("aspectRatio")), None);
        assert_eq!(ctx.evaluate(&pred("!aspectRatio")), None);

        let ctx = ctx.with_aspect_ratio("16:9");
        assert_eq!(ctx.evaluate(&pred("aspectRatio")), Some(true));
        assert_eq!(ctx.evaluate(&pred("aspectRatio == '16:9'")), Some(true));
        assert_eq!(ctx.aspect_ratio(), Some("16:9"));
    }

    #[test]
    fn test_collect() {
        let ctx: ResolutionContext = [("channel", "web")].into_iter().collect();
        assert_eq!(ctx.get("channel"), Some("web"));
        assert_eq!(serde_json::to_string(&ctx).unwrap(), r#"{"channel":"web"}"#);
    }
}
