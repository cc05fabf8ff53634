//! Ordered result sequences with projection and predicate helpers.

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::result::QueryResult;
use serde_json::Value;
use std::sync::Arc;

/// What [`ResultSet::project`] does for an item lacking the field.
#[derive(Debug, Clone, PartialEq)]
pub enum OnMissing {
    Raise,
    Default(Value),
}

/// An ordered view over a shared list of raw result payloads.
///
/// Items are materialised as [`QueryResult`]s on access. Slicing and
/// filtering produce new views over the same payload.
#[derive(Debug, Clone)]
pub struct ResultSet {
    payload: Arc<Vec<Value>>,
    indices: Vec<usize>,
}

impl ResultSet {
    pub fn new(values: Vec<Value>) -> Self {
        Self::from_shared(Arc::new(values))
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn from_shared(payload: Arc<Vec<Value>>) -> Self {
        let indices = (0..payload.len()).collect();
        ResultSet { payload, indices }
    }

    /// Decodes the `results` list of an already received response.
    pub fn from_response(response: &ApiResponse) -> Result<Self, ApiError> {
        Ok(Self::new(response.results()?.clone()))
    }

    fn view(&self, indices: Vec<usize>) -> Self {
        ResultSet {
            payload: Arc::clone(&self.payload),
            indices,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// A bare result set is always loaded.
    pub fn loaded(&self) -> bool {
        true
    }

    pub fn load(&self) {}

    fn absolute(&self, i: isize) -> Result<usize, ApiError> {
        let len = self.len() as isize;
        let pos = if i < 0 { i + len } else { i };
        if pos < 0 || pos >= len {
            return Err(ApiError::IndexOutOfRange {
                index: i,
                len: self.len(),
            });
        }
        Ok(self.indices[pos as usize])
    }

    /// Result at `i`; negative indices count from the end.
    pub fn get(&self, i: isize) -> Result<QueryResult, ApiError> {
        let abs = self.absolute(i)?;
        Ok(QueryResult::new(Arc::clone(&self.payload), abs))
    }

    /// Raw payload of the result at `i`.
    pub fn get_value(&self, i: isize) -> Result<&Value, ApiError> {
        let abs = self.absolute(i)?;
        Ok(&self.payload[abs])
    }

    /// Sub-view with ordinary sequence slice semantics. `step` must not be zero.
    pub fn slice(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    ) -> Result<ResultSet, ApiError> {
        let positions = slice_positions(self.len(), start, stop, step)?;
        Ok(self.view(positions.into_iter().map(|p| self.indices[p]).collect()))
    }

    pub fn iter(&self) -> impl Iterator<Item = QueryResult> + '_ {
        self.indices
            .iter()
            .map(move |&i| QueryResult::new(Arc::clone(&self.payload), i))
    }

    /// Raw payloads in view order.
    pub fn raw(&self) -> impl Iterator<Item = &Value> + '_ {
        self.indices.iter().map(move |&i| &self.payload[i])
    }

    pub fn to_values(&self) -> Vec<Value> {
        self.raw().cloned().collect()
    }

    // ── Projection and predicates ───────────────

    /// Lazily yields the value at `path` for every item.
    pub fn project<'a>(
        &'a self,
        path: &'a str,
        on_missing: OnMissing,
    ) -> impl Iterator<Item = Result<Value, ApiError>> + 'a {
        self.raw().map(move |v| match crate::path::lookup(v, path) {
            Ok(found) => Ok(found.clone()),
            Err(e) => match &on_missing {
                OnMissing::Raise => Err(e),
                OnMissing::Default(d) => Ok(d.clone()),
            },
        })
    }

    /// Collected projection; fails on the first missing field.
    pub fn values(&self, path: &str) -> Result<Vec<Value>, ApiError> {
        self.project(path, OnMissing::Raise).collect()
    }

    /// Items whose value at `path` equals `expected`. Equality is type-strict
    /// (`1`, `1.0` and `"1"` all differ); items lacking the field are dropped.
    pub fn filter(&self, path: &str, expected: &Value) -> ResultSet {
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| matches(&self.payload[i], path, expected))
            .collect();
        self.view(indices)
    }

    pub fn count_matching(&self, path: &str, expected: &Value) -> usize {
        self.raw().filter(|v| matches(v, path, expected)).count()
    }

    /// True when every item matches; vacuously true for an empty set.
    pub fn all_match(&self, path: &str, expected: &Value) -> bool {
        self.raw().all(|v| matches(v, path, expected))
    }

    pub fn any_match(&self, path: &str, expected: &Value) -> bool {
        self.raw().any(|v| matches(v, path, expected))
    }

    /// True when `min <= count_matching(..) <= max`.
    pub fn count_in_range(&self, path: &str, expected: &Value, min: usize, max: usize) -> bool {
        let n = self.count_matching(path, expected);
        min <= n && n <= max
    }
}

fn matches(value: &Value, path: &str, expected: &Value) -> bool {
    crate::path::lookup(value, path)
        .map(|found| found == expected)
        .unwrap_or(false)
}

/// Positions selected by a `[start:stop:step]` slice over `len` items.
pub fn slice_positions(
    len: usize,
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
) -> Result<Vec<usize>, ApiError> {
    if step == 0 {
        return Err(ApiError::InvalidArgument("slice step cannot be zero".into()));
    }
    let len = len as isize;
    let resolve = |bound: isize, lower: isize, upper: isize| {
        let b = if bound < 0 { bound + len } else { bound };
        b.clamp(lower, upper)
    };

    let mut out = Vec::new();
    if step > 0 {
        let mut i = start.map_or(0, |s| resolve(s, 0, len));
        let end = stop.map_or(len, |s| resolve(s, 0, len));
        while i < end {
            out.push(i as usize);
            i += step;
        }
    } else {
        let mut i = start.map_or(len - 1, |s| resolve(s, -1, len - 1));
        let end = stop.map_or(-1, |s| resolve(s, -1, len - 1));
        while i > end {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

impl PartialEq for ResultSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.raw().zip(other.raw()).all(|(a, b)| a == b)
    }
}

impl From<Vec<Value>> for ResultSet {
    fn from(values: Vec<Value>) -> Self {
        ResultSet::new(values)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
