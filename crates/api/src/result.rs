//! A single result object.

use crate::error::ApiError;
use crate::path;
use serde_json::Value;
use std::sync::Arc;

/// Read-only view of one object from a response's `results` list.
///
/// The payload is shared with the [`ResultSet`](crate::ResultSet) it came
/// from; materialising a `QueryResult` copies nothing. A `QueryResult` also
/// behaves as a sequence of length one so code can treat one and many
/// results alike.
#[derive(Debug, Clone)]
pub struct QueryResult {
    payload: Arc<Vec<Value>>,
    index: usize,
}

impl QueryResult {
    pub(crate) fn new(payload: Arc<Vec<Value>>, index: usize) -> Self {
        QueryResult { payload, index }
    }

    /// Wraps a standalone JSON value (an event from a stream, a nested mapping).
    pub fn from_value(value: Value) -> Self {
        QueryResult {
            payload: Arc::new(vec![value]),
            index: 0,
        }
    }

    /// The wrapped JSON value.
    pub fn value(&self) -> &Value {
        // Indices are only produced in range by ResultSet.
        &self.payload[self.index]
    }

    /// Value at the dot-path. A present `null` is returned as `Value::Null`.
    pub fn get(&self, path: &str) -> Result<&Value, ApiError> {
        path::lookup(self.value(), path)
    }

    /// Nested mapping at `path` as its own result.
    pub fn get_result(&self, path: &str) -> Result<QueryResult, ApiError> {
        Ok(QueryResult::from_value(self.get(path)?.clone()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Top-level field names, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.value()
            .as_object()
            .map(|m| m.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.value().get("name").and_then(|v| v.as_str())
    }

    pub fn type_name(&self) -> Option<&str> {
        self.value().get("type").and_then(|v| v.as_str())
    }

    // ── Sequence view ───────────────────────────

    pub fn len(&self) -> usize {
        1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `index(0)` is the result itself; anything else is out of range.
    pub fn index(&self, i: isize) -> Result<&QueryResult, ApiError> {
        if i == 0 {
            Ok(self)
        } else {
            Err(ApiError::IndexOutOfRange { index: i, len: 1 })
        }
    }

    pub fn iter(&self) -> std::iter::Once<&QueryResult> {
        std::iter::once(self)
    }
}

impl PartialEq for QueryResult {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a QueryResult;
    type IntoIter = std::iter::Once<&'a QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Display for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn host() -> QueryResult {
        QueryResult::from_value(json!({
            "name": "localhost",
            "type": "Host",
            "attrs": {"state": 0, "vars": null, "address": "127.0.0.1"},
        }))
    }

    #[test]
    fn get_matches_manual_traversal() {
        let r = host();
        let manual = &r.value()["attrs"]["state"];
        assert_eq!(r.get("attrs.state").unwrap(), manual);
        assert_eq!(r.get("name").unwrap(), &json!("localhost"));
    }

    #[test]
    fn null_field_is_not_missing() {
        let r = host();
        assert_eq!(r.get("attrs.vars").unwrap(), &Value::Null);
        assert!(matches!(
            r.get("attrs.vars.os"),
            Err(ApiError::KeyNotFound { .. })
        ));
        assert!(matches!(r.get("joins"), Err(ApiError::KeyNotFound { .. })));
    }

    #[test]
    fn keys_are_sorted() {
        assert_eq!(host().keys(), vec!["attrs", "name", "type"]);
    }

    #[test]
    fn behaves_as_single_element_sequence() {
        let r = host();
        assert_eq!(r.len(), 1);
        assert_eq!(r.iter().count(), 1);
        assert_eq!(r.index(0).unwrap(), &r);
        assert!(matches!(
            r.index(1),
            Err(ApiError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            r.index(-1),
            Err(ApiError::IndexOutOfRange { index: -1, len: 1 })
        ));
        let mut n = 0;
        for item in &r {
            assert_eq!(item.name(), Some("localhost"));
            n += 1;
        }
        assert_eq!(n, 1);
    }

    #[test]
    fn nested_result() {
        let attrs = host().get_result("attrs").unwrap();
        assert_eq!(attrs.get("address").unwrap(), &json!("127.0.0.1"));
        assert_eq!(host().type_name(), Some("Host"));
    }
}
