//! In-memory transport for tests.
//!
//! `MockTransport` answers requests from a queue of one-shot expectations,
//! falling back to persistent routes, and records everything it was sent.
//!
//! ```
//! use icinga2_api::mock::MockTransport;
//! use icinga2_api::{ApiRequest, Method, Transport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! mock.expect(Method::Get, "objects/hosts")
//!     .respond(200, json!({"results": [{"name": "localhost"}]}));
//!
//! let response = mock.send(&ApiRequest::get("objects/hosts")).unwrap();
//! assert_eq!(response.status, 200);
//! mock.verify();
//! ```

use crate::error::ApiError;
use crate::request::{ApiRequest, Method};
use crate::response::ApiResponse;
use crate::transport::Transport;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

struct Expectation {
    method: Method,
    path: String,
    reply: Result<ApiResponse, ApiError>,
}

#[derive(Default)]
pub struct MockTransport {
    expectations: Mutex<VecDeque<Expectation>>,
    routes: Mutex<Vec<Expectation>>,
    sent: Mutex<Vec<ApiRequest>>,
}

/// Builder returned by [`MockTransport::expect`] and [`MockTransport::route`].
pub struct ExpectationBuilder<'a> {
    mock: &'a MockTransport,
    method: Method,
    path: String,
    persistent: bool,
}

impl ExpectationBuilder<'_> {
    pub fn respond(self, status: u16, body: Value) {
        self.finish(Ok(ApiResponse::new(status, body)));
    }

    /// Shorthand for a 200 response with the given `results` list.
    pub fn respond_results(self, results: Value) {
        self.respond(200, serde_json::json!({ "results": results }));
    }

    pub fn fail(self, error: ApiError) {
        self.finish(Err(error));
    }

    fn finish(self, reply: Result<ApiResponse, ApiError>) {
        let expectation = Expectation {
            method: self.method,
            path: self.path,
            reply,
        };
        if self.persistent {
            lock(&self.mock.routes).push(expectation);
        } else {
            lock(&self.mock.expectations).push_back(expectation);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next matching request once.
    pub fn expect(&self, method: Method, path: &str) -> ExpectationBuilder<'_> {
        ExpectationBuilder {
            mock: self,
            method,
            path: path.trim_matches('/').to_string(),
            persistent: false,
        }
    }

    /// Answer every matching request not claimed by a one-shot expectation.
    pub fn route(&self, method: Method, path: &str) -> ExpectationBuilder<'_> {
        ExpectationBuilder {
            persistent: true,
            ..self.expect(method, path)
        }
    }

    /// Every request sent so far, in order.
    pub fn sent(&self) -> Vec<ApiRequest> {
        lock(&self.sent).clone()
    }

    /// Number of requests sent with `method` to `path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        let path = path.trim_matches('/');
        lock(&self.sent)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last_sent(&self) -> Option<ApiRequest> {
        lock(&self.sent).last().cloned()
    }

    pub fn clear_sent(&self) {
        lock(&self.sent).clear();
    }

    /// Panics if one-shot expectations are left unconsumed.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations);
        if !remaining.is_empty() {
            let pending: Vec<String> = remaining
                .iter()
                .map(|e| format!("{} {}", e.method, e.path))
                .collect();
            panic!("unmet expectations: {}", pending.join(", "));
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        lock(&self.sent).push(request.clone());

        let matches = |e: &Expectation| e.method == request.method && e.path == request.path;

        let mut queue = lock(&self.expectations);
        if let Some(pos) = queue.iter().position(matches) {
            if let Some(e) = queue.remove(pos) {
                return e.reply;
            }
        }
        drop(queue);

        if let Some(route) = lock(&self.routes).iter().find(|e| matches(*e)) {
            return route.reply.clone();
        }

        Err(ApiError::Transport(format!(
            "unexpected request: {} {}",
            request.method, request.path
        )))
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
    fn one_shot_before_route() {
        let mock = MockTransport::new();
        mock.route(Method::Get, "status").respond(200, json!({"results": []}));
        mock.expect(Method::Get, "status").respond(500, json!({}));

        let req = ApiRequest::get("status");
        assert_eq!(mock.send(&req).unwrap().status, 500);
        assert_eq!(mock.send(&req).unwrap().status, 200);
        assert_eq!(mock.send(&req).unwrap().status, 200);
        assert_eq!(mock.count(Method::Get, "status"), 3);
        mock.verify();
    }

    #[test]
    fn expectations_consumed_in_order() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "a").respond(200, json!(1));
        mock.expect(Method::Get, "a").respond(200, json!(2));
        let req = ApiRequest::get("a");
        assert_eq!(mock.send(&req).unwrap().body, json!(1));
        assert_eq!(mock.send(&req).unwrap().body, json!(2));
    }

    #[test]
    fn unmatched_request_is_transport_error() {
        let mock = MockTransport::new();
        let err = mock.send(&ApiRequest::delete("objects/hosts")).unwrap_err();
        assert_eq!(
            err,
            ApiError::Transport("unexpected request: DELETE objects/hosts".into())
        );
    }

    #[test]
    #[should_panic(expected = "unmet expectations: POST actions/x")]
    fn verify_panics_on_leftovers() {
        let mock = MockTransport::new();
        mock.expect(Method::Post, "actions/x").respond(200, json!({}));
        mock.verify();
    }

    #[test]
    fn fail_returns_error() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "types")
            .fail(ApiError::Transport("connection refused".into()));
        assert!(mock.send(&ApiRequest::get("types")).is_err());
    }
}
