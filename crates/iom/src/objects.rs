//! Mapped objects.
//!
//! [`ObjectSet`] is any number of objects of one type, [`MappedObject`]
//! exactly one. Both are either backed by a [`CachedResultSet`] (objects
//! fetched from the API) or nested inside a field of another mapped object.
//!
//! A nested object knows its parent and the path below it. Modifying it
//! prefixes that path and hands the change to the parent, until it reaches
//! the fetched object at the root, which sends a single partial update
//! addressed by the full dot path (`vars.disks.root.warn`). Local copies are
//! only touched once the API accepted the change.
//!
//! There is no identity map: two navigations to the same remote object give
//! two independent objects, each with its own cache.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use icinga2_api::{
    path, slice_positions, ApiError, ApiRequest, CachedResultSet, Method, ObjectOutcome,
    ResultSet,
};
use serde_json::{Map, Value};

use crate::filter::objects_filter;
use crate::session::Session;
use crate::types::{Form, ObjectClass, TypeClass, ValueKind};
use crate::values::{ArrayValue, Batch, DictionaryValue, Scalar};

/// Top-level keys of an objects query result.
const RESULT_KEYS: [&str; 5] = ["name", "type", "attrs", "joins", "meta"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifyOptions {
    /// Apply the accepted change to the cached results instead of dropping them.
    pub no_invalidate: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub cascade: bool,
    pub no_invalidate: bool,
}

/// Per-object outcomes of an accepted modify or delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationReport {
    pub status: u16,
    pub outcomes: Vec<ObjectOutcome>,
}

/// Where a mapped object hangs: directly off the session, or below a field
/// of another mapped object.
#[derive(Debug, Clone)]
pub enum ParentDescriptor {
    Session(Session),
    Field {
        parent: MappedObject,
        path: Vec<String>,
    },
}

// ──────────────────────────────────────────────
// Shared core
// ──────────────────────────────────────────────

#[derive(Debug)]
enum Backing {
    Remote(CachedResultSet),
    Nested {
        parent: MappedObject,
        /// Path of this value below the parent's fields.
        path: Vec<String>,
        items: RefCell<Vec<Value>>,
        /// Array positions of the items when built from an array value.
        positions: Option<Vec<String>>,
    },
}

#[derive(Debug)]
struct ObjectCore {
    session: Session,
    class: Rc<ObjectClass>,
    backing: Backing,
}

type Change = (Vec<String>, Value);

fn concat(prefix: &[String], rest: &[String]) -> Vec<String> {
    prefix.iter().chain(rest.iter()).cloned().collect()
}

fn split_path(key: &str) -> Result<Vec<String>, ApiError> {
    let segments: Vec<String> = key.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ApiError::InvalidArgument(format!("malformed path '{key}'")));
    }
    Ok(segments)
}

/// Writes `value` at `segments` below `target`; an empty path replaces it.
pub(crate) fn put(target: &mut Value, segments: &[String], value: Value) -> Result<(), ApiError> {
    if segments.is_empty() {
        *target = value;
        Ok(())
    } else {
        path::assign(target, &path::join(segments), value)
    }
}

fn absolute_index(i: isize, len: usize) -> Result<usize, ApiError> {
    let pos = if i < 0 { i + len as isize } else { i };
    if pos < 0 || pos >= len as isize {
        return Err(ApiError::IndexOutOfRange { index: i, len });
    }
    Ok(pos as usize)
}

fn unsupported(operation: &str, class: &ObjectClass) -> ApiError {
    ApiError::Unsupported {
        operation: operation.to_string(),
        type_name: class.name.clone(),
    }
}

/// Copy of `base` limited to its target selection, for write requests.
fn scoped_request(base: &ApiRequest, method: Method) -> ApiRequest {
    let mut request = ApiRequest::new(method, base.path.clone());
    for key in ["filter", "filter_vars"] {
        if let Some(v) = base.body.get(key) {
            request = request.with_body(key, v.clone());
        }
    }
    request
}

impl ObjectCore {
    fn items(&self) -> Result<Arc<Vec<Value>>, ApiError> {
        match &self.backing {
            Backing::Remote(cache) => cache.ensure_fresh(),
            Backing::Nested { items, .. } => Ok(Arc::new(items.borrow().clone())),
        }
    }

    fn is_remote(&self) -> bool {
        matches!(self.backing, Backing::Remote(_))
    }

    /// Fetched objects keep their fields under `attrs`; nested values are the fields.
    fn field_path(&self, rest: &[String]) -> Vec<String> {
        if self.is_remote() {
            concat(&["attrs".to_string()], rest)
        } else {
            rest.to_vec()
        }
    }

    fn parse_attrs(&self, attr: &str) -> Vec<String> {
        let split: Vec<String> = attr.split('.').map(str::to_string).collect();
        let Backing::Remote(cache) = &self.backing else {
            return split;
        };
        let first = split[0].as_str();
        if RESULT_KEYS.contains(&first) {
            split
        } else if first.eq_ignore_ascii_case(&self.class.name) {
            concat(&["attrs".to_string()], &split[1..])
        } else if cache
            .request()
            .joins()
            .iter()
            .any(|j| j.split('.').next() == Some(first))
        {
            concat(&["joins".to_string()], &split)
        } else {
            concat(&["attrs".to_string()], &split)
        }
    }

    /// Field path (below `attrs` for fetched objects) addressed by a modify key.
    fn change_path(&self, key: &str) -> Result<Vec<String>, ApiError> {
        if !self.is_remote() {
            return split_path(key);
        }
        let parsed = self.parse_attrs(key);
        split_path(&parsed.join("."))?;
        match parsed[0].as_str() {
            "attrs" if parsed.len() > 1 => Ok(parsed[1..].to_vec()),
            "joins" => Err(ApiError::NoUserModify {
                field: key.to_string(),
                reason: "joined objects cannot be modified".into(),
            }),
            _ => Err(ApiError::NoUserModify {
                field: key.to_string(),
                reason: "not an attribute".into(),
            }),
        }
    }

    fn parse_changes(&self, changes: &Value) -> Result<Vec<Change>, ApiError> {
        let map = changes
            .as_object()
            .ok_or_else(|| ApiError::InvalidArgument("changes must be a JSON object".into()))?;
        map.iter()
            .map(|(k, v)| Ok((self.change_path(k)?, v.clone())))
            .collect()
    }

    fn modify_paths(&self, changes: Vec<Change>, opts: ModifyOptions) -> Result<OperationReport, ApiError> {
        if changes.is_empty() {
            return Ok(OperationReport::default());
        }
        match &self.backing {
            Backing::Remote(cache) => self.modify_remote(cache, &changes, opts),
            Backing::Nested {
                parent,
                path,
                items,
                positions,
            } => {
                if let Some((p, _)) = changes.iter().find(|(p, _)| {
                    p.first()
                        .and_then(|f| self.class.field(f))
                        .is_some_and(|d| !d.can_modify())
                }) {
                    return Err(ApiError::NoUserModify {
                        field: path::join(p),
                        reason: "field is not user modifiable".into(),
                    });
                }
                let prefixes: Vec<Vec<String>> = match positions {
                    None => vec![path.clone()],
                    Some(positions) => positions
                        .iter()
                        .map(|p| concat(path, std::slice::from_ref(p)))
                        .collect(),
                };
                let forwarded: Vec<Change> = prefixes
                    .iter()
                    .flat_map(|prefix| {
                        changes
                            .iter()
                            .map(move |(p, v)| (concat(prefix, p), v.clone()))
                    })
                    .collect();

                let report = parent.core.modify_paths(forwarded, opts)?;
                let mut items = items.borrow_mut();
                for item in items.iter_mut() {
                    for (p, v) in &changes {
                        put(item, p, v.clone())?;
                    }
                }
                Ok(report)
            }
        }
    }

    fn modify_remote(
        &self,
        cache: &CachedResultSet,
        changes: &[Change],
        opts: ModifyOptions,
    ) -> Result<OperationReport, ApiError> {
        if !self.class.capabilities.modify {
            return Err(unsupported("modify", &self.class));
        }
        let mut attrs = Map::new();
        for (p, v) in changes {
            let Some(field) = p.first() else {
                return Err(ApiError::InvalidArgument("empty attribute path".into()));
            };
            let allowed = self.class.field(field).map(|d| d.can_modify());
            match allowed {
                None => {
                    return Err(ApiError::NoUserModify {
                        field: field.clone(),
                        reason: format!("not a field of {}", self.class.name),
                    })
                }
                Some(false) => {
                    return Err(ApiError::NoUserModify {
                        field: path::join(p),
                        reason: "field is not user modifiable".into(),
                    })
                }
                Some(true) => {}
            }
            attrs.insert(path::join(p), v.clone());
        }

        let request = scoped_request(cache.request(), Method::Post).with_body("attrs", Value::Object(attrs));
        let report = self.run(&request)?;
        tracing::debug!(type_name = %self.class.name, changes = changes.len(), "Modified");

        if opts.no_invalidate {
            cache.apply_local(|items| {
                for item in items.iter_mut() {
                    for (p, v) in changes {
                        put(item, &self.field_path(p), v.clone())?;
                    }
                }
                Ok(())
            })?;
        } else {
            cache.invalidate();
        }
        Ok(report)
    }

    /// Sends a write request; any failing per-object outcome fails the call.
    fn run(&self, request: &ApiRequest) -> Result<OperationReport, ApiError> {
        let response = self.session.send(request)?;
        let outcomes = response.outcomes();
        if let Some(failed) = outcomes.iter().find(|o| !o.is_success()) {
            tracing::warn!(
                type_name = %self.class.name,
                object = ?failed.name,
                status = %failed.status,
                "Object rejected change"
            );
            return Err(ApiError::RequestFailed {
                status: response.status,
                message: failed.status.clone(),
                outcomes,
            });
        }
        Ok(OperationReport {
            status: response.status,
            outcomes,
        })
    }

    fn delete(&self, opts: DeleteOptions) -> Result<OperationReport, ApiError> {
        let Backing::Remote(cache) = &self.backing else {
            return Err(unsupported("delete of a nested object", &self.class));
        };
        if !self.class.capabilities.delete {
            return Err(unsupported("delete", &self.class));
        }
        let request = scoped_request(cache.request(), Method::Delete)
            .with_param("cascade", if opts.cascade { "1" } else { "0" });
        let report = self.run(&request)?;
        tracing::debug!(type_name = %self.class.name, cascade = opts.cascade, "Deleted");
        if opts.no_invalidate {
            cache.apply_local(|items| {
                items.clear();
                Ok(())
            })?;
        } else {
            cache.invalidate();
        }
        Ok(report)
    }

    fn names(&self) -> Result<Vec<String>, ApiError> {
        self.items()?
            .iter()
            .map(|item| {
                item.get("name")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::key_not_found("name"))
            })
            .collect()
    }

    fn action(&self, name: &str, params: Value) -> Result<ResultSet, ApiError> {
        if !self.is_remote() {
            return Err(unsupported("actions on a nested object", &self.class));
        }
        if !self.class.capabilities.actions {
            return Err(unsupported("actions", &self.class));
        }
        let extra = match params {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => {
                return Err(ApiError::InvalidArgument(
                    "action parameters must be a JSON object".into(),
                ))
            }
        };
        let Some(filter) = objects_filter(&self.class.name, self.names()?) else {
            return Ok(ResultSet::empty());
        };

        let mut request = ApiRequest::post(format!("actions/{name}"))
            .with_body("type", self.class.name.clone())
            .with_filter(filter);
        for (k, v) in extra {
            request = request.with_body(k, v);
        }
        let response = self.session.send(&request)?;
        tracing::debug!(action = name, type_name = %self.class.name, "Action sent");
        ResultSet::from_response(&response)
    }

    /// A new core over the items at `positions`, in the requested form.
    fn subset(&self, positions: &[usize], form: Form) -> Result<Rc<ObjectCore>, ApiError> {
        let class = self.session.types().resolve_object(&self.class.name, form)?;
        let backing = match &self.backing {
            Backing::Remote(cache) => {
                let _hold = cache.hold();
                let items = cache.ensure_fresh()?;
                let loaded_at = cache.loaded_at().unwrap_or_else(|| cache.clock().now());
                let selected: Vec<Value> = positions.iter().map(|&p| items[p].clone()).collect();
                let names: Vec<&str> = selected
                    .iter()
                    .map(|item| item.get("name").and_then(|v| v.as_str()).unwrap_or_default())
                    .collect();
                let filter = objects_filter(&self.class.name, names).unwrap_or_else(|| "false".into());
                let mut request = cache.request().clone().with_filter(filter);
                request.method = Method::Get;
                Backing::Remote(CachedResultSet::preloaded(
                    request,
                    Arc::clone(cache.transport()),
                    Arc::clone(cache.clock()),
                    cache.cache_duration(),
                    selected,
                    loaded_at,
                ))
            }
            Backing::Nested {
                parent,
                path,
                items,
                positions: own,
            } => {
                let items = items.borrow();
                let selected: Vec<Value> = positions.iter().map(|&p| items[p].clone()).collect();
                let own: Vec<String> = match own {
                    Some(own) => own.clone(),
                    None => (0..items.len()).map(|i| i.to_string()).collect(),
                };
                let chosen: Vec<String> = positions.iter().map(|&p| own[p].clone()).collect();
                match form {
                    Form::Singular if chosen.len() == 1 => Backing::Nested {
                        parent: parent.clone(),
                        path: concat(path, &chosen),
                        items: RefCell::new(selected),
                        positions: None,
                    },
                    _ => Backing::Nested {
                        parent: parent.clone(),
                        path: path.clone(),
                        items: RefCell::new(selected),
                        positions: Some(chosen),
                    },
                }
            }
        };
        Ok(Rc::new(ObjectCore {
            session: self.session.clone(),
            class,
            backing,
        }))
    }

    fn parent(&self) -> ParentDescriptor {
        match &self.backing {
            Backing::Remote(_) => ParentDescriptor::Session(self.session.clone()),
            Backing::Nested { parent, path, .. } => ParentDescriptor::Field {
                parent: parent.clone(),
                path: path.clone(),
            },
        }
    }

    fn cache(&self) -> Option<&CachedResultSet> {
        match &self.backing {
            Backing::Remote(cache) => Some(cache),
            Backing::Nested { .. } => None,
        }
    }
}

// ──────────────────────────────────────────────
// ObjectSet
// ──────────────────────────────────────────────

/// Any number of objects of one type.
#[derive(Debug, Clone)]
pub struct ObjectSet {
    core: Rc<ObjectCore>,
}

impl ObjectSet {
    pub(crate) fn remote(session: Session, class: Rc<ObjectClass>, cache: CachedResultSet) -> Self {
        ObjectSet {
            core: Rc::new(ObjectCore {
                session,
                class,
                backing: Backing::Remote(cache),
            }),
        }
    }

    pub(crate) fn nested(parent: MappedObject, path: Vec<String>, class: Rc<ObjectClass>, items: Vec<Value>) -> Self {
        let positions = (0..items.len()).map(|i| i.to_string()).collect();
        ObjectSet {
            core: Rc::new(ObjectCore {
                session: parent.core.session.clone(),
                class,
                backing: Backing::Nested {
                    parent,
                    path,
                    items: RefCell::new(items),
                    positions: Some(positions),
                },
            }),
        }
    }

    pub fn class(&self) -> &Rc<ObjectClass> {
        &self.core.class
    }

    pub fn type_name(&self) -> &str {
        &self.core.class.name
    }

    pub fn session(&self) -> &Session {
        &self.core.session
    }

    pub fn parent(&self) -> ParentDescriptor {
        self.core.parent()
    }

    /// The backing cache of fetched objects; `None` when nested.
    pub fn cache(&self) -> Option<&CachedResultSet> {
        self.core.cache()
    }

    /// Drops cached results of fetched objects; a no-op when nested.
    pub fn invalidate(&self) {
        if let Some(cache) = self.core.cache() {
            cache.invalidate();
        }
    }

    pub fn results(&self) -> Result<ResultSet, ApiError> {
        match self.core.cache() {
            Some(cache) => cache.results(),
            None => Ok(ResultSet::new(self.core.items()?.as_ref().clone())),
        }
    }

    pub fn len(&self) -> Result<usize, ApiError> {
        Ok(self.core.items()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ApiError> {
        Ok(self.len()? == 0)
    }

    pub fn names(&self) -> Result<Vec<String>, ApiError> {
        self.core.names()
    }

    /// The object at `i`; negative indices count from the end. A fetched
    /// object gets its own cache that expires with this set's.
    pub fn get(&self, i: isize) -> Result<MappedObject, ApiError> {
        let len = self.len()?;
        let pos = absolute_index(i, len)?;
        Ok(MappedObject {
            core: self.core.subset(&[pos], Form::Singular)?,
        })
    }

    /// Every object in order. The length is taken once, up front.
    pub fn iter(&self) -> Result<impl Iterator<Item = Result<MappedObject, ApiError>> + '_, ApiError> {
        let len = self.len()? as isize;
        Ok((0..len).map(move |i| self.get(i)))
    }

    pub fn to_vec(&self) -> Result<Vec<MappedObject>, ApiError> {
        self.iter()?.collect()
    }

    pub fn slice(&self, start: Option<isize>, stop: Option<isize>, step: isize) -> Result<ObjectSet, ApiError> {
        let positions = slice_positions(self.len()?, start, stop, step)?;
        Ok(ObjectSet {
            core: self.core.subset(&positions, Form::Plural)?,
        })
    }

    /// Objects whose `attr` equals `expected`, as a new set.
    pub fn filter_by(&self, attr: &str, expected: &Value) -> Result<ObjectSet, ApiError> {
        let key = path::join(&self.parse_attrs(attr));
        let items = self.core.items()?;
        let positions: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| path::lookup(item, &key).map(|v| v == expected).unwrap_or(false))
            .map(|(i, _)| i)
            .collect();
        Ok(ObjectSet {
            core: self.core.subset(&positions, Form::Plural)?,
        })
    }

    /// Value of `attr` for every object.
    pub fn values(&self, attr: &str) -> Result<Vec<Value>, ApiError> {
        let key = path::join(&self.parse_attrs(attr));
        self.core
            .items()?
            .iter()
            .map(|item| path::lookup(item, &key).cloned())
            .collect()
    }

    /// Result path addressed by `attr`.
    ///
    /// `"state"` → `attrs.state`, `"name"` → `name`, `"host.state"` on hosts →
    /// `attrs.state`, `"zone.name"` with `zone` joined → `joins.zone.name`.
    pub fn parse_attrs(&self, attr: &str) -> Vec<String> {
        self.core.parse_attrs(attr)
    }

    /// A new, unloaded set whose query only returns the given attributes and joins.
    pub fn select(&self, attrs: &[&str]) -> Result<ObjectSet, ApiError> {
        let cache = self
            .core
            .cache()
            .ok_or_else(|| unsupported("select on a nested set", &self.core.class))?;
        let mut selected: Vec<String> = Vec::new();
        let mut joins: Vec<String> = Vec::new();
        for attr in attrs {
            let parsed = self.parse_attrs(attr);
            let (target, entry) = match parsed[0].as_str() {
                "attrs" if parsed.len() > 1 => (&mut selected, parsed[1].clone()),
                "joins" if parsed.len() > 1 => (&mut joins, parsed[1].clone()),
                _ => continue,
            };
            if !target.contains(&entry) {
                target.push(entry);
            }
        }

        let mut request = cache.request().clone();
        if !selected.is_empty() {
            request = request.with_body("attrs", selected);
        }
        if !joins.is_empty() {
            request = request.with_body("joins", joins);
        }
        Ok(ObjectSet::remote(
            self.core.session.clone(),
            Rc::clone(&self.core.class),
            self.core.session.cached(request),
        ))
    }

    /// Partial update of every object in the set. Keys are attribute paths
    /// (`"vars.os"`, `"attrs.address"`), values replace the addressed leaves.
    pub fn modify(&self, changes: Value, opts: ModifyOptions) -> Result<OperationReport, ApiError> {
        let changes = self.core.parse_changes(&changes)?;
        self.core.modify_paths(changes, opts)
    }

    pub fn delete(&self, opts: DeleteOptions) -> Result<OperationReport, ApiError> {
        self.core.delete(opts)
    }

    /// Runs action `name` on every object in the set and returns the
    /// per-object results.
    pub fn action(&self, name: &str, params: Value) -> Result<ResultSet, ApiError> {
        self.core.action(name, params)
    }
}

// ──────────────────────────────────────────────
// MappedObject
// ──────────────────────────────────────────────

/// A field value as presented by [`MappedObject::get_field`].
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    Scalar(Scalar),
    Array(ArrayValue),
    Dictionary(DictionaryValue),
    Object(MappedObject),
    Objects(ObjectSet),
    /// A field the schema does not describe, or of a type it does not know.
    Raw(Value),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            FieldValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&DictionaryValue> {
        match self {
            FieldValue::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&MappedObject> {
        match self {
            FieldValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&ObjectSet> {
        match self {
            FieldValue::Objects(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Exactly one object.
#[derive(Debug, Clone)]
pub struct MappedObject {
    core: Rc<ObjectCore>,
}

impl MappedObject {
    pub(crate) fn remote(session: Session, class: Rc<ObjectClass>, cache: CachedResultSet) -> Self {
        MappedObject {
            core: Rc::new(ObjectCore {
                session,
                class,
                backing: Backing::Remote(cache),
            }),
        }
    }

    pub(crate) fn nested(parent: MappedObject, path: Vec<String>, class: Rc<ObjectClass>, value: Value) -> Self {
        MappedObject {
            core: Rc::new(ObjectCore {
                session: parent.core.session.clone(),
                class,
                backing: Backing::Nested {
                    parent,
                    path,
                    items: RefCell::new(vec![value]),
                    positions: None,
                },
            }),
        }
    }

    pub fn class(&self) -> &Rc<ObjectClass> {
        &self.core.class
    }

    pub fn type_name(&self) -> &str {
        &self.core.class.name
    }

    pub fn session(&self) -> &Session {
        &self.core.session
    }

    pub fn parent(&self) -> ParentDescriptor {
        self.core.parent()
    }

    pub fn cache(&self) -> Option<&CachedResultSet> {
        self.core.cache()
    }

    pub fn invalidate(&self) {
        if let Some(cache) = self.core.cache() {
            cache.invalidate();
        }
    }

    /// The same object viewed as a set of one.
    pub fn as_set(&self) -> ObjectSet {
        ObjectSet {
            core: Rc::clone(&self.core),
        }
    }

    /// The object's current payload.
    pub fn value(&self) -> Result<Value, ApiError> {
        let items = self.core.items()?;
        items
            .first()
            .cloned()
            .ok_or(ApiError::IndexOutOfRange { index: 0, len: 0 })
    }

    pub fn name(&self) -> Result<Option<String>, ApiError> {
        Ok(self
            .value()?
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    /// Raw value at `attr`, interpreted like [`ObjectSet::parse_attrs`].
    pub fn get(&self, attr: &str) -> Result<Value, ApiError> {
        let key = path::join(&self.core.parse_attrs(attr));
        path::lookup(&self.value()?, &key).cloned()
    }

    /// Typed view of field `name`.
    ///
    /// Object-typed fields become nested objects whose changes are routed
    /// through this object, or references to other fetched objects when the
    /// value is a name. Arrays and dictionaries become mutable wrappers.
    pub fn get_field(&self, name: &str) -> Result<FieldValue, ApiError> {
        let desc = self.core.class.field(name).cloned();
        if let Some(desc) = &desc {
            if !desc.can_view() {
                return Err(ApiError::NoUserView {
                    field: name.to_string(),
                });
            }
        }

        let field_path = self.core.field_path(&[name.to_string()]);
        let raw = path::lookup(&self.value()?, &path::join(&field_path))?.clone();

        let Some(desc) = desc else {
            return Ok(FieldValue::Raw(raw));
        };
        let kind = match self.core.session.types().resolve(&desc.type_name, Form::Singular) {
            Ok(kind) => kind,
            Err(ApiError::UnknownType { .. }) => return Ok(FieldValue::Raw(raw)),
            Err(e) => return Err(e),
        };
        let path = vec![name.to_string()];

        let value = match kind {
            TypeClass::Value(ValueKind::Array) => FieldValue::Array(ArrayValue::new(self.clone(), path, raw)),
            TypeClass::Value(_) if desc.array_rank > 0 && raw.is_array() => {
                FieldValue::Array(ArrayValue::new(self.clone(), path, raw))
            }
            TypeClass::Value(ValueKind::Dictionary) => {
                FieldValue::Dictionary(DictionaryValue::new(self.clone(), path, raw))
            }
            TypeClass::Value(_) if raw.is_null() => FieldValue::Null,
            TypeClass::Value(kind) => FieldValue::Scalar(Scalar::new(kind, raw)),
            TypeClass::Object(class) => self.object_field(class, path, raw)?,
        };
        Ok(value)
    }

    fn object_field(&self, class: Rc<ObjectClass>, path: Vec<String>, raw: Value) -> Result<FieldValue, ApiError> {
        let session = &self.core.session;
        match raw {
            Value::Null => Ok(FieldValue::Null),
            Value::String(name) => Ok(FieldValue::Object(session.object(&class.name, &name)?)),
            Value::Array(items) if items.iter().all(|v| v.is_string()) && !items.is_empty() => {
                let names = items.iter().filter_map(|v| v.as_str());
                let filter = objects_filter(&class.name, names);
                Ok(FieldValue::Objects(session.objects(&class.name, filter.as_deref())?))
            }
            Value::Array(items) => {
                let plural = session.types().resolve_object(&class.name, Form::Plural)?;
                Ok(FieldValue::Objects(ObjectSet::nested(self.clone(), path, plural, items)))
            }
            value => Ok(FieldValue::Object(MappedObject::nested(self.clone(), path, class, value))),
        }
    }

    /// Shorthand for modifying a single field.
    pub fn set_field(&self, name: &str, value: Value) -> Result<OperationReport, ApiError> {
        let mut changes = Map::new();
        changes.insert(name.to_string(), value);
        self.modify(Value::Object(changes), ModifyOptions::default())
    }

    /// Partial update; see [`ObjectSet::modify`].
    pub fn modify(&self, changes: Value, opts: ModifyOptions) -> Result<OperationReport, ApiError> {
        self.as_set().modify(changes, opts)
    }

    pub fn delete(&self, opts: DeleteOptions) -> Result<OperationReport, ApiError> {
        self.core.delete(opts)
    }

    pub fn action(&self, name: &str, params: Value) -> Result<ResultSet, ApiError> {
        self.core.action(name, params)
    }

    /// Collects several changes into one request.
    pub fn batch(&self) -> Batch<'_> {
        Batch::for_object(self)
    }

    pub(crate) fn change_path(&self, key: &str) -> Result<Vec<String>, ApiError> {
        self.core.change_path(key)
    }

    /// Sends changes addressed relative to this object's fields.
    pub(crate) fn modify_paths(
        &self,
        changes: Vec<(Vec<String>, Value)>,
        opts: ModifyOptions,
    ) -> Result<OperationReport, ApiError> {
        self.core.modify_paths(changes, opts)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use icinga2_api::mock::MockTransport;
    use icinga2_api::{CacheDuration, ManualClock};
    use serde_json::json;

    fn rw(type_name: &str) -> Value {
        json!({"type": type_name, "array_rank": 0,
               "attributes": {"no_user_view": false, "no_user_modify": false}})
    }

    fn session_with(mock: &Arc<MockTransport>) -> Session {
        mock.route(Method::Get, "types").respond_results(json!([
            {"name": "ConfigObject", "plural_name": "ConfigObjects", "fields": {
                "name": {"type": "String", "attributes": {"no_user_view": false, "no_user_modify": true}}}},
            {"name": "Host", "plural_name": "Hosts", "base": "ConfigObject", "fields": {
                "address": rw("String"),
                "vars": rw("Dictionary"),
                "secret": {"type": "String", "attributes": {"no_user_view": true, "no_user_modify": true}},
            }},
        ]));
        Session::with_clock(mock.clone(), Arc::new(ManualClock::new()), CacheDuration::Infinite)
    }

    fn hosts_mock() -> Arc<MockTransport> {
        let mock = Arc::new(MockTransport::new());
        mock.route(Method::Get, "objects/hosts").respond_results(json!([
            {"name": "h1", "type": "Host", "attrs": {"address": "10.0.0.1", "vars": null}},
            {"name": "h2", "type": "Host", "attrs": {"address": "10.0.0.2", "vars": {"os": "Linux"}}},
        ]));
        mock
    }

    #[test]
    fn parse_attrs_prefixes() {
        let mock = hosts_mock();
        let session = session_with(&mock);
        let hosts = session.objects("Host", None).unwrap();
        assert_eq!(hosts.parse_attrs("state"), vec!["attrs", "state"]);
        assert_eq!(hosts.parse_attrs("name"), vec!["name"]);
        assert_eq!(hosts.parse_attrs("attrs.vars.os"), vec!["attrs", "vars", "os"]);
        assert_eq!(hosts.parse_attrs("host.vars.os"), vec!["attrs", "vars", "os"]);

        let joined = hosts.select(&["joins.zone.name"]).unwrap();
        assert_eq!(joined.parse_attrs("zone.name"), vec!["joins", "zone", "name"]);
    }

    #[test]
    fn get_builds_filtered_singular() {
        let mock = hosts_mock();
        let session = session_with(&mock);
        let hosts = session.objects("Host", None).unwrap();
        let h2 = hosts.get(-1).unwrap();
        assert_eq!(h2.name().unwrap().as_deref(), Some("h2"));
        assert_eq!(h2.class().form, Form::Singular);
        assert_eq!(
            h2.cache().unwrap().request().filter(),
            Some("host.name==\"h2\"")
        );
        assert_eq!(mock.count(Method::Get, "objects/hosts"), 1);
        assert!(matches!(
            hosts.get(2),
            Err(ApiError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn modify_rejects_unknown_and_read_only_fields() {
        let mock = hosts_mock();
        let session = session_with(&mock);
        let hosts = session.objects("Host", None).unwrap();

        let err = hosts.modify(json!({"nope": 1}), ModifyOptions::default()).unwrap_err();
        assert!(matches!(err, ApiError::NoUserModify { ref field, .. } if field == "nope"));

        let err = hosts.modify(json!({"name": "x"}), ModifyOptions::default()).unwrap_err();
        assert!(matches!(err, ApiError::NoUserModify { .. }));

        let err = hosts.modify(json!({"secret": "x"}), ModifyOptions::default()).unwrap_err();
        assert!(matches!(err, ApiError::NoUserModify { .. }));
        assert_eq!(mock.count(Method::Post, "objects/hosts"), 0);
    }

    #[test]
    fn no_user_view_blocks_field_access() {
        let mock = hosts_mock();
        let session = session_with(&mock);
        let h1 = session.objects("Host", None).unwrap().get(0).unwrap();
        assert!(matches!(
            h1.get_field("secret"),
            Err(ApiError::NoUserView { .. })
        ));
        assert!(matches!(
            h1.get_field("address").unwrap(),
            FieldValue::Scalar(ref s) if s.as_str() == Some("10.0.0.1")
        ));
        assert!(matches!(h1.get_field("undeclared"), Err(ApiError::KeyNotFound { .. })));
    }

    #[test]
    fn filter_by_and_values() {
        let mock = hosts_mock();
        let session = session_with(&mock);
        let hosts = session.objects("Host", None).unwrap();
        assert_eq!(
            hosts.values("address").unwrap(),
            vec![json!("10.0.0.1"), json!("10.0.0.2")]
        );
        let linux = hosts.filter_by("vars.os", &json!("Linux")).unwrap();
        assert_eq!(linux.names().unwrap(), vec!["h2".to_string()]);
        assert_eq!(
            linux.cache().unwrap().request().filter(),
            Some("host.name==\"h2\"")
        );
    }

    #[test]
    fn action_sends_type_and_filter() {
        let mock = hosts_mock();
        mock.expect(Method::Post, "actions/reschedule-check").respond_results(json!([
            {"code": 200, "status": "Successfully rescheduled check for object 'h1'."},
            {"code": 200, "status": "Successfully rescheduled check for object 'h2'."},
        ]));
        let session = session_with(&mock);
        let hosts = session.objects("Host", None).unwrap();
        let results = hosts.action("reschedule-check", json!({"force": true})).unwrap();
        assert_eq!(results.len(), 2);

        let sent = mock.last_sent().unwrap();
        assert_eq!(sent.body["type"], json!("Host"));
        assert_eq!(sent.body["force"], json!(true));
        assert_eq!(sent.filter(), Some("host.name==\"h1\" || host.name==\"h2\""));
    }

    #[test]
    fn delete_sends_cascade_and_invalidates() {
        let mock = hosts_mock();
        mock.expect(Method::Delete, "objects/hosts").respond_results(json!([
            {"code": 200, "name": "h1", "status": "Object was deleted.", "type": "Host"},
        ]));
        let session = session_with(&mock);
        let h1 = session.objects("Host", None).unwrap().get(0).unwrap();
        let report = h1
            .delete(DeleteOptions {
                cascade: true,
                no_invalidate: false,
            })
            .unwrap();
        assert_eq!(report.outcomes.len(), 1);
        let sent = mock.last_sent().unwrap();
        assert_eq!(sent.params, vec![("cascade".to_string(), "1".to_string())]);
        assert_eq!(sent.filter(), Some("host.name==\"h1\""));
        assert!(!h1.cache().unwrap().is_loaded());
    }
}
