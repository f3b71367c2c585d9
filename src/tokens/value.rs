//! The token value model.
//!
//! Token sources are free-form JSON/YAML trees. They are converted once, at
//! load time, into the closed [`TokenValue`] union so the resolver never has
//! to guess at the shape of a node.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// Key introducing an aspect-ratio conditional node.
pub const ASPECT_RATIO_KEY: &str = "$aspectRatio";
/// Key introducing a conditional expression node.
pub const CONDITIONAL_KEY: &str = "$conditional";
/// W3C design-token value key.
pub const VALUE_KEY: &str = "$value";

/// A concrete token value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// The value as a string slice, if it is a string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an integer, accepting integral floats.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Float(_) => None,
            Self::String(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => {
                let mut buf = ryu::Buffer::new();
                f.write_str(buf.format(*v))
            },
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A condition evaluated against the resolution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `key == value`
    Equals { key: String, value: String },
    /// `key != value`
    NotEquals { key: String, value: String },
    /// `key in [a, b, c]`
    OneOf { key: String, values: Vec<String> },
    /// `key`
    IsSet { key: String },
    /// `!key`
    IsUnset { key: String },
}

impl Predicate {
    /// Parse the predicate grammar used in `$conditional.if`.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }

        if let Some((key, value)) = expr.split_once("==") {
            return Some(Self::Equals {
                key: clean_operand(key)?,
                value: clean_operand(value)?,
            });
        }
        if let Some((key, value)) = expr.split_once("!=") {
            return Some(Self::NotEquals {
                key: clean_operand(key)?,
                value: clean_operand(value)?,
            });
        }
        if let Some((key, list)) = expr.split_once(" in ") {
            let list = list.trim();
            let inner = list.strip_prefix('[')?.strip_suffix(']')?;
            let values = inner
                .split(',')
                .map(clean_operand)
                .collect::<Option<Vec<_>>>()?;
            return Some(Self::OneOf {
                key: clean_operand(key)?,
                values,
            });
        }
        if let Some(key) = expr.strip_prefix('!') {
            return Some(Self::IsUnset {
                key: clean_operand(key)?,
            });
        }
        Some(Self::IsSet {
            key: clean_operand(expr)?,
        })
    }

    /// The context key this predicate inspects.
    pub fn key(&self) -> &str {
        match self {
            Self::Equals { key, .. }
            | Self::NotEquals { key, .. }
            | Self::OneOf { key, .. }
            | Self::IsSet { key }
            | Self::IsUnset { key } => key,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { key, value } => write!(f, "{} == {}", key, value),
            Self::NotEquals { key, value } => write!(f, "{} != {}", key, value),
            Self::OneOf { key, values } => write!(f, "{} in [{}]", key, values.join(", ")),
            Self::IsSet { key } => f.write_str(key),
            Self::IsUnset { key } => write!(f, "!{}", key),
        }
    }
}

fn clean_operand(s: &str) -> Option<String> {
    let s = s.trim();
    let s = s
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(s);
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// `$conditional: {if, then, else}`
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub predicate: Predicate,
    pub then: TokenValue,
    pub otherwise: Option<TokenValue>,
}

/// A node of the token tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// A concrete value, possibly containing `{path}` fragments to interpolate.
    Scalar(Scalar),
    /// A whole-value reference `{a.b.c}`.
    Reference(String),
    /// Per-ratio values, in declaration order.
    AspectRatio(Vec<(String, TokenValue)>),
    /// A value chosen by a context predicate.
    Conditional(Box<Conditional>),
    /// A group of named tokens.
    Object(BTreeMap<String, TokenValue>),
}

impl TokenValue {
    /// An empty group.
    pub fn empty() -> Self {
        Self::Object(BTreeMap::new())
    }

    /// Convert a JSON tree into a token tree.
    ///
    /// `path` is the dotted location of `value`, used in error messages.
    pub fn from_json(path: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Err(Error::InvalidToken {
                path: path.to_string(),
                reason: "null is not a valid token value".to_string(),
            }),
            Value::Bool(b) => Ok(Self::Scalar(Scalar::Bool(*b))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Scalar(Scalar::Integer(i)))
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() => Ok(Self::Scalar(Scalar::Float(f))),
                        _ => Err(Error::InvalidToken {
                            path: path.to_string(),
                            reason: format!("number {} is not representable", n),
                        }),
                    }
                }
            },
            Value::String(s) => Ok(Self::from_string(s)),
            Value::Array(_) => Err(Error::InvalidToken {
                path: path.to_string(),
                reason: "arrays are not supported as token values".to_string(),
            }),
            Value::Object(map) => {
                if let Some(inner) = map.get(ASPECT_RATIO_KEY) {
                    return Self::aspect_ratio_from_json(path, inner);
                }
                if let Some(inner) = map.get(CONDITIONAL_KEY) {
                    return Self::conditional_from_json(path, inner);
                }
                if let Some(inner) = map.get(VALUE_KEY) {
                    return Self::from_json(path, inner);
                }

                let mut children = BTreeMap::new();
                for (key, child) in map {
                    // $type, $description and friends are metadata
                    if key.starts_with('$') {
                        continue;
                    }
                    if key.is_empty() || key.contains('.') {
                        return Err(Error::InvalidToken {
                            path: join_path(path, key),
                            reason: "token names must be non-empty and must not contain '.'"
                                .to_string(),
                        });
                    }
                    let child_path = join_path(path, key);
                    children.insert(key.clone(), Self::from_json(&child_path, child)?);
                }
                Ok(Self::Object(children))
            },
        }
    }

    fn from_string(s: &str) -> Self {
        match whole_reference(s) {
            Some(target) => Self::Reference(target.to_string()),
            None => Self::Scalar(Scalar::String(s.to_string())),
        }
    }

    fn aspect_ratio_from_json(path: &str, inner: &serde_json::Value) -> Result<Self> {
        let map = inner.as_object().ok_or_else(|| Error::InvalidToken {
            path: path.to_string(),
            reason: format!("{} must map ratio ids to values", ASPECT_RATIO_KEY),
        })?;
        if map.is_empty() {
            return Err(Error::InvalidToken {
                path: path.to_string(),
                reason: format!("{} has no ratio entries", ASPECT_RATIO_KEY),
            });
        }
        let mut entries = Vec::with_capacity(map.len());
        for (ratio, value) in map {
            let child_path = format!("{}[{}]", path, ratio);
            entries.push((ratio.clone(), Self::from_json(&child_path, value)?));
        }
        Ok(Self::AspectRatio(entries))
    }

    fn conditional_from_json(path: &str, inner: &serde_json::Value) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidToken {
            path: path.to_string(),
            reason,
        };
        let map = inner
            .as_object()
            .ok_or_else(|| invalid(format!("{} must be an object", CONDITIONAL_KEY)))?;
        let expr = map
            .get("if")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("conditional requires a string 'if'".to_string()))?;
        let predicate =
            Predicate::parse(expr).ok_or_else(|| invalid(format!("cannot parse predicate '{}'", expr)))?;
        let then = map
            .get("then")
            .ok_or_else(|| invalid("conditional requires 'then'".to_string()))?;
        let then = Self::from_json(&format!("{}[then]", path), then)?;
        let otherwise = match map.get("else") {
            Some(v) => Some(Self::from_json(&format!("{}[else]", path), v)?),
            None => None,
        };
        Ok(Self::Conditional(Box::new(Conditional {
            predicate,
            then,
            otherwise,
        })))
    }

    /// Canonical JSON form. Object keys come out sorted.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Map, Value};

        match self {
            Self::Scalar(s) => s.to_json(),
            Self::Reference(path) => Value::String(format!("{{{}}}", path)),
            Self::AspectRatio(entries) => {
                let mut inner = Map::new();
                for (ratio, value) in entries {
                    inner.insert(ratio.clone(), value.to_json());
                }
                let mut outer = Map::new();
                outer.insert(ASPECT_RATIO_KEY.to_string(), Value::Object(inner));
                Value::Object(outer)
            },
            Self::Conditional(cond) => {
                let mut inner = Map::new();
                inner.insert("if".to_string(), Value::String(cond.predicate.to_string()));
                inner.insert("then".to_string(), cond.then.to_json());
                if let Some(otherwise) = &cond.otherwise {
                    inner.insert("else".to_string(), otherwise.to_json());
                }
                let mut outer = Map::new();
                outer.insert(CONDITIONAL_KEY.to_string(), Value::Object(inner));
                Value::Object(outer)
            },
            Self::Object(children) => {
                let mut map = Map::new();
                for (key, value) in children {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            },
        }
    }

    /// Follow a dotted path through nested objects.
    pub fn get(&self, path: &str) -> Option<&TokenValue> {
        let mut node = self;
        for segment in path.split('.') {
            match node {
                Self::Object(children) => node = children.get(segment)?,
                _ => return None,
            }
        }
        Some(node)
    }

    /// Whether any reference or conditional node remains in this subtree.
    pub fn has_deferred(&self) -> bool {
        match self {
            Self::Scalar(_) => false,
            Self::Reference(_) | Self::AspectRatio(_) | Self::Conditional(_) => true,
            Self::Object(children) => children.values().any(Self::has_deferred),
        }
    }

    /// Whether any reference node remains in this subtree, including inside
    /// conditional branches.
    pub fn has_references(&self) -> bool {
        match self {
            Self::Scalar(_) => false,
            Self::Reference(_) => true,
            Self::AspectRatio(entries) => entries.iter().any(|(_, v)| v.has_references()),
            Self::Conditional(cond) => {
                cond.then.has_references()
                    || cond.otherwise.as_ref().is_some_and(|v| v.has_references())
            },
            Self::Object(children) => children.values().any(Self::has_references),
        }
    }
}

/// Join a parent path and a key with a dot.
#[inline]
pub fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        let mut out = String::with_capacity(parent.len() + key.len() + 1);
        out.push_str(parent);
        out.push('.');
        out.push_str(key);
        out
    }
}

/// Whether `s` is a dotted token path (`a.b_c.d-e`).
pub fn is_token_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        })
}

/// The target path when the whole string is a single `{a.b.c}` reference.
pub fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    is_token_path(inner).then_some(inner)
}

/// Locate every `{a.b.c}` fragment in `s`.
///
/// Returns the byte range of each fragment (braces included) and the path.
pub fn find_references(s: &str) -> SmallVec<[(Range<usize>, &str); 4]> {
    let mut found = SmallVec::new();
    let bytes = s.as_bytes();
    let mut offset = 0;
    while let Some(open) = memchr::memchr(b'{', &bytes[offset..]) {
        let start = offset + open;
        let Some(close) = memchr::memchr(b'}', &bytes[start + 1..]) else {
            break;
        };
        let end = start + 1 + close;
        let inner = &s[start + 1..end];
        if is_token_path(inner) {
            found.push((start..end + 1, inner));
            offset = end + 1;
        } else {
            offset = start + 1;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_reference() {
        assert_eq!(whole_reference("{colors.primary}"), Some("colors.primary"));
        assert_eq!(whole_reference("{colors.primary} "), None);
        assert_eq!(whole_reference("{}"), None);
        assert_eq!(whole_reference("#0066CC"), None);
    }

    #[test]
    fn test_find_references() {
        let s = "1px solid {colors.border} / {spacing.sm}{not a path}";
        let refs = find_references(s);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].1, "colors.border");
        assert_eq!(&s[refs[0].0.clone()], "{colors.border}");
        assert_eq!(refs[1].1, "spacing.sm");
    }

    #[test]
    fn test_from_json_shapes() {
        let value = json!({
            "colors": {
                "primary": "#0066CC",
                "$type": "color",
                "accent": { "$value": "{colors.primary}", "$description": "accent" }
            },
            "size": { "$aspectRatio": { "16:9": 44, "4:3": 40 } },
            "mode": { "$conditional": { "if": "channel == print", "then": "cmyk", "else": "rgb" } }
        });
        let tree = TokenValue::from_json("", &value).unwrap();

        assert_eq!(
            tree.get("colors.primary"),
            Some(&TokenValue::Scalar(Scalar::String("#0066CC".to_string())))
        );
        assert_eq!(
            tree.get("colors.accent"),
            Some(&TokenValue::Reference("colors.primary".to_string()))
        );
        assert!(tree.get("colors.$type").is_none());

        match tree.get("size") {
            Some(TokenValue::AspectRatio(entries)) => {
                assert_eq!(entries[0].0, "16:9");
                assert_eq!(entries[1].0, "4:3");
            },
            other => panic!("unexpected {:?}", other),
        }
        match tree.get("mode") {
            Some(TokenValue::Conditional(cond)) => {
                assert_eq!(
                    cond.predicate,
                    Predicate::Equals {
                        key: "channel".to_string(),
                        value: "print".to_string()
                    }
                );
                assert!(cond.otherwise.is_some());
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_from_json_rejects_null_and_arrays() {
        let err = TokenValue::from_json("", &json!({"a": {"b": null}})).unwrap_err();
        assert!(matches!(err, Error::InvalidToken { ref path, .. } if path == "a.b"));
        assert!(TokenValue::from_json("", &json!({"a": [1, 2]})).is_err());
    }

    #[test]
    fn test_predicate_parse() {
        assert_eq!(
            Predicate::parse("aspectRatio == '16:9'"),
            Some(Predicate::Equals {
                key: "aspectRatio".to_string(),
                value: "16:9".to_string()
            })
        );
        assert_eq!(
            Predicate::parse("channel in [print, web]"),
            Some(Predicate::OneOf {
                key: "channel".to_string(),
                values: vec!["print".to_string(), "web".to_string()]
            })
        );
        assert_eq!(
            Predicate::parse("!channel"),
            Some(Predicate::IsUnset {
                key: "channel".to_string()
            })
        );
        assert_eq!(Predicate::parse("   "), None);
        assert_eq!(Predicate::parse("channel == "), None);
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::Float(1.5).to_string(), "1.5");
        assert_eq!(Scalar::Integer(12).to_string(), "12");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        assert_eq!(Scalar::String("x".into()).as_i64(), None);
        assert_eq!(Scalar::String("44".into()).as_i64(), Some(44));
    }
}
