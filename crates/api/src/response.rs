//! Decoded API responses.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status code and decoded JSON body of one API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Outcome the server reported for a single object of a modify, delete or
/// action request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectOutcome {
    pub code: u16,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ObjectOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        ApiResponse { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `results` list of the body.
    pub fn results(&self) -> Result<&Vec<Value>, ApiError> {
        self.body
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ApiError::InvalidResponse("missing 'results' array".into()))
    }

    /// Human-readable error text: the body's `status` field, then the
    /// first failing outcome's status, then the bare status code.
    pub fn error_message(&self) -> String {
        if let Some(s) = self.body.get("status").and_then(|v| v.as_str()) {
            return s.to_string();
        }
        if let Some(o) = self.outcomes().into_iter().find(|o| !o.is_success()) {
            return o.status;
        }
        format!("HTTP {}", self.status)
    }

    /// Per-object outcomes listed under `results`. Entries that do not look
    /// like outcomes (no numeric `code`) are skipped.
    pub fn outcomes(&self) -> Vec<ObjectOutcome> {
        self.body
            .get("results")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter(|v| v.get("code").map(|c| c.is_u64()).unwrap_or(false))
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `Ok(self)` on success, `RequestFailed` otherwise.
    pub fn into_result(self) -> Result<ApiResponse, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::RequestFailed {
                status: self.status,
                message: self.error_message(),
                outcomes: self.outcomes(),
            })
        }
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
    fn results_requires_array() {
        let ok = ApiResponse::new(200, json!({"results": [{"name": "a"}]}));
        assert_eq!(ok.results().unwrap().len(), 1);

        let bad = ApiResponse::new(200, json!({"error": 404}));
        assert!(matches!(bad.results(), Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn outcomes_parsed_from_results() {
        let resp = ApiResponse::new(
            500,
            json!({"results": [
                {"code": 200, "name": "h1", "status": "Attributes updated", "type": "Host"},
                {"code": 500, "name": "h2", "status": "Attribute could not be set.",
                 "type": "Host", "errors": ["boom"]}
            ]}),
        );
        let outcomes = resp.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].errors, vec!["boom".to_string()]);
        assert_eq!(outcomes[1].type_name.as_deref(), Some("Host"));
        assert_eq!(resp.error_message(), "Attribute could not be set.");
    }

    #[test]
    fn into_result_maps_failure() {
        let resp = ApiResponse::new(404, json!({"error": 404, "status": "No objects found."}));
        match resp.into_result() {
            Err(ApiError::RequestFailed {
                status, message, ..
            }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "No objects found.");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn error_message_falls_back_to_code() {
        let resp = ApiResponse::new(503, Value::Null);
        assert_eq!(resp.error_message(), "HTTP 503");
    }
}
