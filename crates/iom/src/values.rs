//! Typed wrappers for field values.
//!
//! [`ArrayValue`] and [`DictionaryValue`] keep a local copy of the field and
//! route every change through the owning object as a partial update of the
//! addressed element. Wrappers handed out for nested containers share the
//! local copy of the field they came from.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use icinga2_api::{path, ApiError};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::objects::{put, MappedObject, ModifyOptions, OperationReport};
use crate::types::ValueKind;

type Change = (Vec<String>, Value);

// ──────────────────────────────────────────────
// Scalars
// ──────────────────────────────────────────────

/// A plain field value tagged with its declared kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    kind: ValueKind,
    value: Value,
}

impl Scalar {
    pub fn new(kind: ValueKind, value: Value) -> Self {
        Scalar { kind, value }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    /// Seconds since the epoch, as Icinga reports timestamps.
    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        let secs = self.value.as_f64()?;
        OffsetDateTime::from_unix_timestamp_nanos((secs * 1e9) as i128).ok()
    }

    pub fn as_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.value.as_f64()?).ok()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

// ──────────────────────────────────────────────
// Field handle
// ──────────────────────────────────────────────

/// Where a container lives: the owning object, the field path on it and the
/// path of this container inside the field's value.
#[derive(Debug, Clone)]
struct Handle {
    owner: MappedObject,
    field: Vec<String>,
    sub: Vec<String>,
    local: Rc<RefCell<Value>>,
    options: ModifyOptions,
}

impl Handle {
    fn new(owner: MappedObject, field: Vec<String>, raw: Value, empty: Value) -> Self {
        let raw = if raw.is_null() { empty } else { raw };
        Handle {
            owner,
            field,
            sub: Vec::new(),
            local: Rc::new(RefCell::new(raw)),
            options: ModifyOptions::default(),
        }
    }

    fn child(&self, key: String) -> Handle {
        let mut sub = self.sub.clone();
        sub.push(key);
        Handle {
            owner: self.owner.clone(),
            field: self.field.clone(),
            sub,
            local: Rc::clone(&self.local),
            options: self.options,
        }
    }

    fn current(&self) -> Result<Value, ApiError> {
        let local = self.local.borrow();
        if self.sub.is_empty() {
            return Ok(local.clone());
        }
        path::lookup(&local, &path::join(&self.sub)).cloned()
    }

    fn full_path(&self, rel: &[String]) -> Vec<String> {
        self.field
            .iter()
            .chain(self.sub.iter())
            .chain(rel.iter())
            .cloned()
            .collect()
    }

    /// Sends `changes` (relative to this container) and mirrors them locally
    /// once accepted.
    fn commit(&self, changes: Vec<Change>, opts: ModifyOptions) -> Result<OperationReport, ApiError> {
        if changes.is_empty() {
            return Ok(OperationReport::default());
        }
        let routed = changes
            .iter()
            .map(|(rel, v)| (self.full_path(rel), v.clone()))
            .collect();
        let report = self.owner.modify_paths(routed, opts)?;

        let mut local = self.local.borrow_mut();
        for (rel, v) in changes {
            let at: Vec<String> = self.sub.iter().chain(rel.iter()).cloned().collect();
            put(&mut local, &at, v)?;
        }
        Ok(report)
    }

    fn replace(&self, value: Value) -> Result<OperationReport, ApiError> {
        self.commit(vec![(Vec::new(), value)], self.options)
    }
}

fn index_of(i: isize, len: usize) -> Result<usize, ApiError> {
    let pos = if i < 0 { i + len as isize } else { i };
    if pos < 0 || pos >= len as isize {
        return Err(ApiError::IndexOutOfRange { index: i, len });
    }
    Ok(pos as usize)
}

fn expect_array(value: Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::InvalidResponse(format!("expected an array, got {other}"))),
    }
}

fn expect_object(value: Value) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ApiError::InvalidResponse(format!("expected a dictionary, got {other}"))),
    }
}

// ──────────────────────────────────────────────
// Arrays
// ──────────────────────────────────────────────

/// An array field. Element assignment updates `<field>.<index>` only;
/// inserting or removing elements replaces the whole array.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    handle: Handle,
}

impl ArrayValue {
    pub(crate) fn new(owner: MappedObject, field: Vec<String>, raw: Value) -> Self {
        ArrayValue {
            handle: Handle::new(owner, field, raw, Value::Array(Vec::new())),
        }
    }

    /// The same array, sending later changes with `opts`.
    pub fn with_options(mut self, opts: ModifyOptions) -> Self {
        self.handle.options = opts;
        self
    }

    pub fn values(&self) -> Result<Vec<Value>, ApiError> {
        expect_array(self.handle.current()?)
    }

    pub fn len(&self) -> Result<usize, ApiError> {
        Ok(self.values()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ApiError> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, i: isize) -> Result<Value, ApiError> {
        let mut items = self.values()?;
        let pos = index_of(i, items.len())?;
        Ok(items.swap_remove(pos))
    }

    pub fn set(&self, i: isize, value: impl Into<Value>) -> Result<OperationReport, ApiError> {
        let pos = index_of(i, self.len()?)?;
        self.handle
            .commit(vec![(vec![pos.to_string()], value.into())], self.handle.options)
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<OperationReport, ApiError> {
        let mut items = self.values()?;
        items.push(value.into());
        self.handle.replace(Value::Array(items))
    }

    /// Inserts before position `i`; `i == len` appends.
    pub fn insert(&self, i: usize, value: impl Into<Value>) -> Result<OperationReport, ApiError> {
        let mut items = self.values()?;
        if i > items.len() {
            return Err(ApiError::IndexOutOfRange {
                index: i as isize,
                len: items.len(),
            });
        }
        items.insert(i, value.into());
        self.handle.replace(Value::Array(items))
    }

    /// Removes and returns the element at `i`.
    pub fn remove(&self, i: isize) -> Result<Value, ApiError> {
        let mut items = self.values()?;
        let pos = index_of(i, items.len())?;
        let removed = items.remove(pos);
        self.handle.replace(Value::Array(items))?;
        Ok(removed)
    }

    /// The dictionary at `i`, sharing this array's local copy.
    pub fn get_dictionary(&self, i: isize) -> Result<DictionaryValue, ApiError> {
        let pos = index_of(i, self.len()?)?;
        Ok(DictionaryValue {
            handle: self.handle.child(pos.to_string()),
        })
    }

    pub fn get_array(&self, i: isize) -> Result<ArrayValue, ApiError> {
        let pos = index_of(i, self.len()?)?;
        Ok(ArrayValue {
            handle: self.handle.child(pos.to_string()),
        })
    }

    /// Collects element assignments into one request. Keys are indices or
    /// dot paths below an index (`"0.name"`).
    pub fn batch(&self) -> Batch<'_> {
        Batch::for_field(&self.handle)
    }
}

// ──────────────────────────────────────────────
// Dictionaries
// ──────────────────────────────────────────────

/// A dictionary field. Keys may be dot paths (`"disks.root.warn"`); each
/// assignment updates exactly that leaf.
#[derive(Debug, Clone)]
pub struct DictionaryValue {
    handle: Handle,
}

impl DictionaryValue {
    pub(crate) fn new(owner: MappedObject, field: Vec<String>, raw: Value) -> Self {
        DictionaryValue {
            handle: Handle::new(owner, field, raw, Value::Object(Map::new())),
        }
    }

    pub fn with_options(mut self, opts: ModifyOptions) -> Self {
        self.handle.options = opts;
        self
    }

    pub fn to_map(&self) -> Result<Map<String, Value>, ApiError> {
        expect_object(self.handle.current()?)
    }

    pub fn keys(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.to_map()?.keys().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, ApiError> {
        Ok(self.to_map()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ApiError> {
        Ok(self.len()? == 0)
    }

    pub fn contains_key(&self, key: &str) -> Result<bool, ApiError> {
        Ok(self.to_map()?.contains_key(key))
    }

    pub fn get(&self, key: &str) -> Result<Value, ApiError> {
        let value = Value::Object(self.to_map()?);
        path::lookup(&value, key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<OperationReport, ApiError> {
        let rel = split_key(key)?;
        self.handle.commit(vec![(rel, value.into())], self.handle.options)
    }

    /// Removes the leaf at `key` by sending the container that held it
    /// without it.
    pub fn remove(&self, key: &str) -> Result<Value, ApiError> {
        let rel = split_key(key)?;
        let parent = &rel[..rel.len() - 1];
        let mut whole = Value::Object(self.to_map()?);
        let removed = path::remove(&mut whole, key)?;
        let container = if parent.is_empty() {
            whole
        } else {
            path::lookup(&whole, &path::join(parent))?.clone()
        };
        self.handle
            .commit(vec![(parent.to_vec(), container)], self.handle.options)?;
        Ok(removed)
    }

    pub fn get_dictionary(&self, key: &str) -> Result<DictionaryValue, ApiError> {
        Ok(DictionaryValue {
            handle: self.nested(key)?,
        })
    }

    pub fn get_array(&self, key: &str) -> Result<ArrayValue, ApiError> {
        Ok(ArrayValue {
            handle: self.nested(key)?,
        })
    }

    fn nested(&self, key: &str) -> Result<Handle, ApiError> {
        let rel = split_key(key)?;
        self.get(key)?;
        Ok(rel
            .into_iter()
            .fold(self.handle.clone(), |handle, segment| handle.child(segment)))
    }

    pub fn batch(&self) -> Batch<'_> {
        Batch::for_field(&self.handle)
    }
}

fn split_key(key: &str) -> Result<Vec<String>, ApiError> {
    let rel: Vec<String> = key.split('.').map(str::to_string).collect();
    if rel.iter().any(|s| s.is_empty()) {
        return Err(ApiError::InvalidArgument(format!("malformed key '{key}'")));
    }
    Ok(rel)
}

// ──────────────────────────────────────────────
// Batches
// ──────────────────────────────────────────────

#[derive(Debug)]
enum Target<'a> {
    Object(&'a MappedObject),
    Field(&'a Handle),
}

/// Changes collected for a single request. The last write to a path wins,
/// including writes to a path inside or around an earlier one; committing
/// an empty batch sends nothing.
#[derive(Debug)]
pub struct Batch<'a> {
    target: Target<'a>,
    changes: Vec<Change>,
}

impl<'a> Batch<'a> {
    pub(crate) fn for_object(object: &'a MappedObject) -> Self {
        Batch {
            target: Target::Object(object),
            changes: Vec::new(),
        }
    }

    fn for_field(handle: &'a Handle) -> Self {
        Batch {
            target: Target::Field(handle),
            changes: Vec::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, ApiError> {
        let path = match self.target {
            Target::Object(object) => object.change_path(key)?,
            Target::Field(_) => split_key(key)?,
        };
        let value = value.into();
        // Pending paths never overlap: a write below a pending path lands
        // inside it, a write above one replaces it.
        if let Some((prefix, pending)) = self.changes.iter_mut().find(|(p, _)| path.starts_with(p)) {
            let mut merged = pending.clone();
            put(&mut merged, &path[prefix.len()..], value)?;
            *pending = merged;
            return Ok(self);
        }
        self.changes.retain(|(p, _)| !p.starts_with(&path));
        self.changes.push((path, value));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn commit(self, opts: ModifyOptions) -> Result<OperationReport, ApiError> {
        match self.target {
            Target::Object(object) => object.modify_paths(self.changes, opts),
            Target::Field(handle) => handle.commit(self.changes, opts),
        }
    }
}
