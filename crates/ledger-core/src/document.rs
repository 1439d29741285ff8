//! Semi-structured payload documents.
//!
//! `old_values` / `new_values` are schema-less key-value trees. They are kept
//! as a tagged variant tree rather than raw `serde_json::Value` so that index
//! maintenance can walk top-level keys with an exhaustive match.
//!
//! Serialization is plain JSON (`#[serde(untagged)]`). Mappings use a
//! `BTreeMap`, so `to_canonical_json` is stable for equal documents; the
//! inverted index and the integrity chain both rely on that.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A leaf value inside a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// A semi-structured payload: scalar, sequence, or mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Document {
    Scalar(Scalar),
    Sequence(Vec<Document>),
    Mapping(BTreeMap<String, Document>),
}

impl Document {
    /// The JSON `null` document.
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Build a mapping document from `(key, value)` pairs.
    ///
    /// ```
    /// use ledger_core::document::Document;
    ///
    /// let doc = Document::mapping([("amount", Document::from(100)), ("status", "paid".into())]);
    /// assert_eq!(doc.get("amount"), Some(&Document::from(100)));
    /// ```
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// An empty mapping (`{}`).
    #[must_use]
    pub const fn empty_mapping() -> Self {
        Self::Mapping(BTreeMap::new())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    #[must_use]
    pub const fn as_mapping(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Whether every float in the tree is finite.
    ///
    /// JSON has no encoding for NaN or the infinities, so a document holding
    /// one cannot be stored or hashed without changing its value.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Scalar(Scalar::Float(f)) => f.is_finite(),
            Self::Scalar(_) => true,
            Self::Sequence(items) => items.iter().all(Self::is_finite),
            Self::Mapping(map) => map.values().all(Self::is_finite),
        }
    }

    /// Look up a top-level key. Returns `None` for non-mapping documents.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Top-level `(key, value)` pairs, in key order.
    ///
    /// Only mappings have addressable keys; scalars and sequences yield nothing.
    pub fn top_level_entries(&self) -> impl Iterator<Item = (&str, &Self)> {
        self.as_mapping()
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Canonical JSON encoding (sorted keys, no whitespace).
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        // Serializing a tree of strings, numbers and BTreeMaps cannot fail
        // except for non-finite floats, which are emitted as `null` by serde_json.
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Parse a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed input.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::null()
    }
}

impl From<bool> for Document {
    fn from(v: bool) -> Self {
        Self::Scalar(Scalar::Bool(v))
    }
}

impl From<i64> for Document {
    fn from(v: i64) -> Self {
        Self::Scalar(Scalar::Int(v))
    }
}

impl From<i32> for Document {
    fn from(v: i32) -> Self {
        Self::Scalar(Scalar::Int(i64::from(v)))
    }
}

impl From<f64> for Document {
    fn from(v: f64) -> Self {
        Self::Scalar(Scalar::Float(v))
    }
}

impl From<&str> for Document {
    fn from(v: &str) -> Self {
        Self::Scalar(Scalar::Text(v.to_string()))
    }
}

impl From<String> for Document {
    fn from(v: String) -> Self {
        Self::Scalar(Scalar::Text(v))
    }
}

impl From<Vec<Self>> for Document {
    fn from(v: Vec<Self>) -> Self {
        Self::Sequence(v)
    }
}

impl From<BTreeMap<String, Self>> for Document {
    fn from(v: BTreeMap<String, Self>) -> Self {
        Self::Mapping(v)
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::null(),
            Value::Bool(b) => b.into(),
            Value::Number(n) => n.as_i64().map_or_else(
                || Self::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
                Self::from,
            ),
            Value::String(s) => s.into(),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Mapping(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<Document> for serde_json::Value {
    fn from(doc: Document) -> Self {
        use serde_json::Value;
        match doc {
            Document::Scalar(Scalar::Null) => Value::Null,
            Document::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Document::Scalar(Scalar::Int(i)) => Value::from(i),
            Document::Scalar(Scalar::Float(f)) => {
                serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
            }
            Document::Scalar(Scalar::Text(s)) => Value::String(s),
            Document::Sequence(items) => Value::Array(items.into_iter().map(Self::from).collect()),
            Document::Mapping(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn deserializes_nested_json() {
        let doc: Document =
            serde_json::from_str(r#"{"amount":100,"tags":["a",1.5,null],"owner":{"id":"u1"}}"#)
                .unwrap();

        assert_eq!(doc.get("amount"), Some(&Document::from(100)));
        assert_eq!(
            doc.get("tags"),
            Some(&Document::Sequence(vec![
                "a".into(),
                Document::from(1.5),
                Document::null()
            ]))
        );
        assert!(doc.get("owner").is_some_and(Document::is_mapping));
    }

    #[test]
    fn integers_stay_integers() {
        let doc: Document = serde_json::from_str("42").unwrap();
        assert_eq!(doc, Document::Scalar(Scalar::Int(42)));

        let doc: Document = serde_json::from_str("42.0").unwrap();
        assert_eq!(doc, Document::Scalar(Scalar::Float(42.0)));
    }

    #[test]
    fn finiteness_checks_the_whole_tree() {
        assert!(Document::mapping([("amount", Document::from(1.5))]).is_finite());
        assert!(!Document::from(f64::NAN).is_finite());
        let nested = Document::mapping([(
            "lines",
            Document::from(vec![Document::from(1), Document::from(f64::INFINITY)]),
        )]);
        assert!(!nested.is_finite());
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let a = Document::mapping([("b", Document::from(2)), ("a", Document::from(1))]);
        let b: Document = serde_json::from_str(r#"{ "a": 1, "b": 2 }"#).unwrap();
        assert_eq!(a.to_canonical_json(), r#"{"a":1,"b":2}"#);
        assert_eq!(a.to_canonical_json(), b.to_canonical_json());
    }

    #[test]
    fn top_level_entries_only_for_mappings() {
        let doc = Document::mapping([("status", Document::from("paid")), ("amount", 150.into())]);
        let keys: Vec<&str> = doc.top_level_entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["amount", "status"]);

        assert_eq!(Document::from(7).top_level_entries().count(), 0);
        assert_eq!(Document::Sequence(vec![]).top_level_entries().count(), 0);
    }

    #[test]
    fn converts_from_and_to_serde_json() {
        let value = json!({"amount": 100, "ratio": 0.5, "ok": true, "items": [1, "x"]});
        let doc = Document::from(value.clone());
        let back: serde_json::Value = doc.into();
        assert_eq!(back, value);
    }
}
