//! Event streams.
//!
//! The `events` endpoint keeps the connection open and writes one JSON object
//! per line. [`EventStream`] turns any buffered reader over such a body into
//! an iterator of [`QueryResult`]s.

use std::io::BufRead;

use icinga2_api::{ApiError, ApiRequest, QueryResult};
use serde_json::Value;

/// Request subscribing `queue` to the given event types, optionally filtered.
pub fn events_request(queue: &str, types: &[&str], filter: Option<&str>) -> ApiRequest {
    let types: Vec<Value> = types.iter().map(|t| Value::from(*t)).collect();
    let request = ApiRequest::post("events")
        .with_body("queue", queue)
        .with_body("types", types);
    match filter {
        Some(f) => request.with_filter(f),
        None => request,
    }
}

pub struct EventStream<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> EventStream<R> {
    pub fn new(reader: R) -> Self {
        EventStream {
            reader,
            line: String::new(),
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = Result<QueryResult, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = self.line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<Value>(line)
                            .map(QueryResult::from_value)
                            .map_err(|e| {
                                ApiError::InvalidResponse(format!("malformed event: {}", e))
                            }),
                    );
                }
                Err(e) => return Some(Err(ApiError::Transport(e.to_string()))),
            }
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
    use std::io::Cursor;

    #[test]
    fn yields_one_result_per_line_skipping_blanks() {
        let body = "{\"type\":\"CheckResult\",\"host\":\"h1\"}\n\n{\"type\":\"StateChange\",\"host\":\"h2\"}\n";
        let events: Vec<_> = EventStream::new(Cursor::new(body))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].type_name(), Some("CheckResult"));
        assert_eq!(events[1].get("host").unwrap(), &json!("h2"));
    }

    #[test]
    fn malformed_line_is_an_error_item() {
        let mut stream = EventStream::new(Cursor::new("not json\n{\"a\":1}\n"));
        assert!(matches!(
            stream.next(),
            Some(Err(ApiError::InvalidResponse(_)))
        ));
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().is_none());
    }

    #[test]
    fn events_request_body() {
        let req = events_request("q1", &["CheckResult", "StateChange"], Some("event.host==\"h1\""));
        assert_eq!(req.path, "events");
        assert_eq!(req.body["queue"], json!("q1"));
        assert_eq!(req.body["types"], json!(["CheckResult", "StateChange"]));
        assert_eq!(req.filter(), Some("event.host==\"h1\""));
    }
}
