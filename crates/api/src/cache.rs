//! Cached result sets.
//!
//! A [`CachedResultSet`] binds a request to a transport and keeps the decoded
//! results of the last successful execution. It is either unloaded or loaded;
//! every read goes through [`CachedResultSet::ensure_fresh`], which loads
//! when unloaded and reloads when the cache duration has elapsed, unless
//! reloading is suspended with [`CachedResultSet::hold`].
//!
//! The controller is meant for one thread at a time: state lives in
//! `RefCell`/`Cell`, so it is `Send` but not `Sync`.

use crate::clock::Clock;
use crate::error::ApiError;
use crate::request::ApiRequest;
use crate::result::QueryResult;
use crate::result_set::ResultSet;
use crate::transport::{execute, Transport};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long loaded results stay fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDuration {
    Infinite,
    Finite(Duration),
}

impl CacheDuration {
    pub fn from_secs(secs: u64) -> Self {
        CacheDuration::Finite(Duration::from_secs(secs))
    }

    /// Whether `elapsed` is strictly past this duration.
    pub fn is_expired(&self, elapsed: Duration) -> bool {
        match self {
            CacheDuration::Infinite => false,
            CacheDuration::Finite(d) => elapsed > *d,
        }
    }
}

impl Default for CacheDuration {
    fn default() -> Self {
        CacheDuration::from_secs(60)
    }
}

#[derive(Debug, Clone)]
enum CacheState {
    Unloaded,
    Loaded {
        payload: Arc<Vec<Value>>,
        loaded_at: Instant,
    },
}

pub struct CachedResultSet {
    request: ApiRequest,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    duration: Cell<CacheDuration>,
    state: RefCell<CacheState>,
    last_known: RefCell<Option<Arc<Vec<Value>>>>,
    suspend_depth: Cell<usize>,
}

impl std::fmt::Debug for CachedResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedResultSet")
            .field("request", &self.request)
            .field("duration", &self.duration.get())
            .field("loaded", &self.is_loaded())
            .field("suspend_depth", &self.suspend_depth.get())
            .finish()
    }
}

impl CachedResultSet {
    /// An unloaded controller; nothing is sent until the first read.
    pub fn new(
        request: ApiRequest,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        duration: CacheDuration,
    ) -> Self {
        CachedResultSet {
            request,
            transport,
            clock,
            duration: Cell::new(duration),
            state: RefCell::new(CacheState::Unloaded),
            last_known: RefCell::new(None),
            suspend_depth: Cell::new(0),
        }
    }

    /// A controller that starts loaded with `payload` as of `loaded_at`, so it
    /// expires together with the set it was split off from.
    pub fn preloaded(
        request: ApiRequest,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        duration: CacheDuration,
        payload: Vec<Value>,
        loaded_at: Instant,
    ) -> Self {
        let set = Self::new(request, transport, clock, duration);
        let payload = Arc::new(payload);
        *set.last_known.borrow_mut() = Some(Arc::clone(&payload));
        *set.state.borrow_mut() = CacheState::Loaded { payload, loaded_at };
        set
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cache_duration(&self) -> CacheDuration {
        self.duration.get()
    }

    pub fn set_cache_duration(&self, duration: CacheDuration) {
        self.duration.set(duration);
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.borrow(), CacheState::Loaded { .. })
    }

    /// Time of the last successful load while loaded.
    pub fn loaded_at(&self) -> Option<Instant> {
        match &*self.state.borrow() {
            CacheState::Loaded { loaded_at, .. } => Some(*loaded_at),
            CacheState::Unloaded => None,
        }
    }

    pub fn suspend_depth(&self) -> usize {
        self.suspend_depth.get()
    }

    // ── State transitions ───────────────────────

    /// Executes the request when unloaded or when `force` is set.
    ///
    /// On failure the controller is left unloaded, so the next read retries.
    /// The last successfully loaded payload stays reachable through
    /// [`last_known`](Self::last_known).
    pub fn load(&self, force: bool) -> Result<(), ApiError> {
        if !force && self.is_loaded() {
            return Ok(());
        }
        match self.fetch() {
            Ok(payload) => {
                let payload = Arc::new(payload);
                *self.last_known.borrow_mut() = Some(Arc::clone(&payload));
                *self.state.borrow_mut() = CacheState::Loaded {
                    payload,
                    loaded_at: self.clock.now(),
                };
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %self.request.path, error = %e, "Load failed");
                *self.state.borrow_mut() = CacheState::Unloaded;
                Err(e)
            }
        }
    }

    fn fetch(&self) -> Result<Vec<Value>, ApiError> {
        let response = execute(self.transport.as_ref(), &self.request)?;
        let results = response.results()?.clone();
        tracing::debug!(path = %self.request.path, count = results.len(), "Loaded");
        Ok(results)
    }

    /// Drops the loaded payload; the next read fetches.
    pub fn invalidate(&self) {
        *self.state.borrow_mut() = CacheState::Unloaded;
    }

    /// Loads if unloaded, reloads if expired and not held, and returns the
    /// current payload.
    pub fn ensure_fresh(&self) -> Result<Arc<Vec<Value>>, ApiError> {
        let current = self.state.borrow().clone();
        if let CacheState::Loaded { payload, loaded_at } = current {
            let elapsed = self.clock.now().saturating_duration_since(loaded_at);
            if self.suspend_depth.get() > 0 || !self.duration.get().is_expired(elapsed) {
                return Ok(payload);
            }
            tracing::debug!(path = %self.request.path, ?elapsed, "Cache expired");
            self.invalidate();
        }
        self.load(false)?;
        match &*self.state.borrow() {
            CacheState::Loaded { payload, .. } => Ok(Arc::clone(payload)),
            CacheState::Unloaded => Err(ApiError::InvalidResponse(
                "result set unloaded after successful load".into(),
            )),
        }
    }

    // ── Suspension ──────────────────────────────

    /// Suspends expiry-driven reloads until the guard is dropped. Guards nest.
    pub fn hold(&self) -> HoldGuard<'_> {
        self.suspend();
        HoldGuard { set: self }
    }

    pub fn suspend(&self) {
        self.suspend_depth.set(self.suspend_depth.get() + 1);
    }

    /// Undoes one `suspend`; the depth never drops below zero.
    pub fn resume(&self) {
        self.suspend_depth
            .set(self.suspend_depth.get().saturating_sub(1));
    }

    // ── Reads ───────────────────────────────────

    /// The current results, loading or reloading as needed.
    pub fn results(&self) -> Result<ResultSet, ApiError> {
        Ok(ResultSet::from_shared(self.ensure_fresh()?))
    }

    /// Snapshot of the current results that later reloads do not affect.
    pub fn fixed(&self) -> Result<ResultSet, ApiError> {
        let payload = self.ensure_fresh()?;
        Ok(ResultSet::new(payload.as_ref().clone()))
    }

    pub fn get(&self, i: isize) -> Result<QueryResult, ApiError> {
        self.results()?.get(i)
    }

    /// Results in order, from one consistent payload.
    pub fn iter(&self) -> Result<std::vec::IntoIter<QueryResult>, ApiError> {
        let results = self.results()?;
        let items: Vec<QueryResult> = results.iter().collect();
        Ok(items.into_iter())
    }

    pub fn len(&self) -> Result<usize, ApiError> {
        Ok(self.ensure_fresh()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ApiError> {
        Ok(self.len()? == 0)
    }

    /// Results of the most recent successful load, even after invalidation
    /// or a failed reload. Never triggers a fetch.
    pub fn last_known(&self) -> Option<ResultSet> {
        self.last_known
            .borrow()
            .as_ref()
            .map(|p| ResultSet::from_shared(Arc::clone(p)))
    }

    /// Applies an acknowledged change to the loaded payload without fetching.
    /// Does nothing while unloaded. Results materialised earlier keep the
    /// previous payload.
    pub fn apply_local<F>(&self, change: F) -> Result<(), ApiError>
    where
        F: FnOnce(&mut Vec<Value>) -> Result<(), ApiError>,
    {
        let mut state = self.state.borrow_mut();
        if let CacheState::Loaded { payload, .. } = &mut *state {
            let mut updated = payload.as_ref().clone();
            change(&mut updated)?;
            let updated = Arc::new(updated);
            *self.last_known.borrow_mut() = Some(Arc::clone(&updated));
            *payload = updated;
        }
        Ok(())
    }
}

/// Keeps a [`CachedResultSet`] from reloading on expiry while alive.
#[must_use = "reloads resume as soon as the guard is dropped"]
pub struct HoldGuard<'a> {
    set: &'a CachedResultSet,
}

impl Drop for HoldGuard<'_> {
    fn drop(&mut self) {
        self.set.resume();
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
