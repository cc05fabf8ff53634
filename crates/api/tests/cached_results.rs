//! Cached result set integration tests.
//!
//! Drives `CachedResultSet` through the mock transport and a manual clock:
//!
//! 1. Host query scenario — filter, project, aggregate predicates
//! 2. Expiry boundary — no fetch just before, exactly one just after
//! 3. Hold across expiry, nested with an early return
//! 4. Invalidate always costs exactly one fetch
//! 5. Failed reload — error surfaced, last known results still readable

use std::sync::Arc;
use std::time::Duration;

use icinga2_api::mock::MockTransport;
use icinga2_api::{
    ApiError, ApiRequest, CacheDuration, CachedResultSet, Clock, ManualClock, Method, OnMissing,
};
use serde_json::json;

// ──────────────────────────────────────────────
// Test fixtures
// ──────────────────────────────────────────────

const TTL: Duration = Duration::from_secs(30);

fn host_query(mock: &Arc<MockTransport>, clock: &Arc<ManualClock>) -> CachedResultSet {
    CachedResultSet::new(
        ApiRequest::get("objects/hosts").with_body("attrs", json!(["state"])),
        mock.clone(),
        clock.clone(),
        CacheDuration::Finite(TTL),
    )
}

fn localhost_only() -> Arc<MockTransport> {
    let mock = Arc::new(MockTransport::new());
    mock.route(Method::Get, "objects/hosts")
        .respond(200, json!({"results": [{"name": "localhost", "attrs": {"state": 0}}]}));
    mock
}

// ──────────────────────────────────────────────
// 1. Host query scenario
// ──────────────────────────────────────────────

#[test]
fn localhost_scenario() {
    let mock = localhost_only();
    let clock = Arc::new(ManualClock::new());
    let hosts = host_query(&mock, &clock);

    assert_eq!(hosts.len().unwrap(), 1);
    let results = hosts.results().unwrap();
    assert_eq!(results.filter("attrs.state", &json!(0)).len(), 1);
    assert_eq!(results.filter("attrs.state", &json!(1)).len(), 0);

    let names: Vec<_> = results
        .project("name", OnMissing::Raise)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(names, vec![json!("localhost")]);

    assert!(results.all_match("attrs.state", &json!(0)));
    assert!(results.count_in_range("attrs.state", &json!(0), 1, 1));
    assert_eq!(mock.count(Method::Get, "objects/hosts"), 1);

    let sent = mock.last_sent().unwrap();
    assert_eq!(sent.body.get("attrs"), Some(&json!(["state"])));
}

// ──────────────────────────────────────────────
// 2. Expiry boundary
// ──────────────────────────────────────────────

#[test]
fn expiry_boundary() {
    let mock = localhost_only();
    let clock = Arc::new(ManualClock::new());
    let hosts = host_query(&mock, &clock);
    let eps = Duration::from_millis(5);

    hosts.get(0).unwrap();
    let t0 = hosts.loaded_at().unwrap();
    clock.advance(TTL - eps);
    hosts.get(0).unwrap();
    assert_eq!(mock.count(Method::Get, "objects/hosts"), 1);

    clock.advance(eps * 2);
    hosts.get(0).unwrap();
    assert_eq!(mock.count(Method::Get, "objects/hosts"), 2);
    assert!(hosts.loaded_at().unwrap() > t0);
    assert_eq!(hosts.loaded_at().unwrap(), clock.now());
}

// ──────────────────────────────────────────────
// 3. Hold
// ──────────────────────────────────────────────

fn read_under_hold(hosts: &CachedResultSet, clock: &ManualClock) -> Result<usize, ApiError> {
    let _hold = hosts.hold();
    clock.advance(TTL * 10);
    let n = hosts.len()?;
    hosts.get(5)?;
    Ok(n)
}

#[test]
fn hold_survives_error_path() {
    let mock = localhost_only();
    let clock = Arc::new(ManualClock::new());
    let hosts = host_query(&mock, &clock);
    hosts.load(false).unwrap();

    let err = read_under_hold(&hosts, &clock).unwrap_err();
    assert!(matches!(err, ApiError::IndexOutOfRange { index: 5, len: 1 }));
    assert_eq!(mock.count(Method::Get, "objects/hosts"), 1);
    assert_eq!(hosts.suspend_depth(), 0);

    hosts.len().unwrap();
    assert_eq!(mock.count(Method::Get, "objects/hosts"), 2);
}

// ──────────────────────────────────────────────
// 4. Invalidate
// ──────────────────────────────────────────────

#[test]
fn invalidate_then_access_fetches_once() {
    let mock = localhost_only();
    let clock = Arc::new(ManualClock::new());
    let hosts = host_query(&mock, &clock);

    hosts.load(false).unwrap();
    for _ in 0..3 {
        hosts.suspend();
    }
    hosts.invalidate();
    hosts.len().unwrap();
    hosts.results().unwrap();
    hosts.fixed().unwrap();
    assert_eq!(mock.count(Method::Get, "objects/hosts"), 2);
}

// ──────────────────────────────────────────────
// 5. Failed reload
// ──────────────────────────────────────────────

#[test]
fn failed_reload_surfaces_error_then_retries() {
    let mock = Arc::new(MockTransport::new());
    mock.expect(Method::Get, "objects/hosts")
        .respond_results(json!([{"name": "h1"}, {"name": "h2"}]));
    mock.expect(Method::Get, "objects/hosts")
        .fail(ApiError::Transport("connection reset".into()));
    mock.expect(Method::Get, "objects/hosts")
        .respond_results(json!([{"name": "h1"}]));
    let clock = Arc::new(ManualClock::new());
    let hosts = host_query(&mock, &clock);

    assert_eq!(hosts.len().unwrap(), 2);
    clock.advance(TTL * 2);
    assert!(matches!(hosts.len(), Err(ApiError::Transport(_))));
    assert!(!hosts.is_loaded());
    assert_eq!(hosts.last_known().unwrap().len(), 2);

    assert_eq!(hosts.len().unwrap(), 1);
    assert_eq!(hosts.last_known().unwrap().len(), 1);
    mock.verify();
}
