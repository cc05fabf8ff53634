//! Dot-path addressing into JSON values.
//!
//! `attrs.vars.os` walks the `attrs` mapping, then `vars`, then `os`. A
//! numeric segment indexes into an array (`attrs.groups.0`).

use crate::error::ApiError;
use serde_json::{Map, Value};

pub fn split(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

/// Looks up `path` in `value`. Fails with `KeyNotFound` naming the full path
/// when any segment is absent.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Result<&'a Value, ApiError> {
    let mut current = value;
    for segment in split(path) {
        current = step(current, segment).ok_or_else(|| ApiError::key_not_found(path))?;
    }
    Ok(current)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str, create: bool) -> Option<&'a mut Value> {
    if create && value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => {
            if create {
                Some(map.entry(segment).or_insert(Value::Null))
            } else {
                map.get_mut(segment)
            }
        }
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Writes `new` at `path`, creating missing intermediate mappings. Array
/// segments must address an existing element.
pub fn assign(value: &mut Value, path: &str, new: Value) -> Result<(), ApiError> {
    let mut current = value;
    for segment in split(path) {
        current = step_mut(current, segment, true).ok_or_else(|| ApiError::key_not_found(path))?;
    }
    *current = new;
    Ok(())
}

/// Removes the leaf at `path` and returns it.
pub fn remove(value: &mut Value, path: &str) -> Result<Value, ApiError> {
    let segments = split(path);
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ApiError::key_not_found(path))?;
    let mut current = value;
    for segment in parents {
        current = step_mut(current, segment, false).ok_or_else(|| ApiError::key_not_found(path))?;
    }
    let removed = match current {
        Value::Object(map) => map.remove(*last),
        Value::Array(items) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => Some(items.remove(i)),
            _ => None,
        },
        _ => None,
    };
    removed.ok_or_else(|| ApiError::key_not_found(path))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
