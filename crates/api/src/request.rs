//! Request descriptors.
//!
//! An [`ApiRequest`] is a plain value: method, API-relative path, JSON body and
//! query parameters. It is executed by a [`Transport`](crate::Transport) and may
//! be executed any number of times (the cache controller re-sends it on reload).

use serde::Serialize;
use serde_json::{Map, Value};

/// HTTP verb of an API request.
///
/// Transports are free to tunnel every verb through `POST` with an override
/// header; the descriptor keeps the logical method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request against the API, relative to the versioned base URL
/// (`objects/hosts`, `actions/reschedule-check`, `types`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Map<String, Value>,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into().trim_matches('/').to_string(),
            body: Map::new(),
            params: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Same path, body and parameters with another method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Sets the `filter` expression of the body.
    pub fn with_filter(self, filter: impl Into<String>) -> Self {
        self.with_body("filter", filter.into())
    }

    /// The `filter` expression of the body, if any.
    pub fn filter(&self) -> Option<&str> {
        self.body.get("filter").and_then(|v| v.as_str())
    }

    /// Names listed in the body's `joins` array.
    pub fn joins(&self) -> Vec<&str> {
        self.body
            .get("joins")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }

    /// Non-empty path segments: `objects/hosts/h1` → `["objects", "hosts", "h1"]`.
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Body as a JSON value, for transports.
    pub fn body_value(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_sets_fields() {
        let req = ApiRequest::get("/objects/hosts/")
            .with_filter("host.name==\"h1\"")
            .with_body("joins", json!(["zone"]))
            .with_param("cascade", "1");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "objects/hosts");
        assert_eq!(req.filter(), Some("host.name==\"h1\""));
        assert_eq!(req.joins(), vec!["zone"]);
        assert_eq!(req.params, vec![("cascade".into(), "1".into())]);
    }

    #[test]
    fn path_segments_split() {
        let req = ApiRequest::get("objects/services/h1!ping");
        assert_eq!(req.path_segments(), vec!["objects", "services", "h1!ping"]);
    }

    #[test]
    fn with_method_keeps_body() {
        let req = ApiRequest::get("objects/hosts")
            .with_filter("x")
            .with_method(Method::Delete);
        assert_eq!(req.method, Method::Delete);
        assert_eq!(req.filter(), Some("x"));
    }

    #[test]
    fn method_serializes_uppercase() {
        let v = serde_json::to_value(ApiRequest::post("actions/x")).unwrap();
        assert_eq!(v["method"], json!("POST"));
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
