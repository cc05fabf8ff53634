//! Type resolution.
//!
//! Icinga describes its object types at `GET types`: a name, a plural name,
//! a base type and the declared fields. [`TypeRegistry`] turns that schema
//! into [`ObjectClass`] records, one singular and one plural per entry, and
//! hands out the same `Rc` for every later lookup. A fixed table of
//! foundational names (`Object`, `ConfigObject`, the value types) resolves
//! without touching the schema.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use icinga2_api::{ApiError, ApiRequest, CacheDuration, CachedResultSet, Clock, Transport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ──────────────────────────────────────────────
// Schema records
// ──────────────────────────────────────────────

/// One field of a type as declared by the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDesc {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub array_rank: u32,
    #[serde(default)]
    pub attributes: BTreeMap<String, bool>,
    #[serde(default)]
    pub navigation_name: Option<String>,
}

impl FieldDesc {
    fn flag(&self, name: &str) -> bool {
        // An absent permission flag denies.
        self.attributes.get(name).copied().unwrap_or(true)
    }

    pub fn can_view(&self) -> bool {
        !self.flag("no_user_view")
    }

    pub fn can_modify(&self) -> bool {
        !self.flag("no_user_modify")
    }

    pub fn is_config(&self) -> bool {
        self.attributes.get("config").copied().unwrap_or(false)
    }
}

/// A raw entry of the `types` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default)]
    pub plural_name: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDesc>,
    #[serde(default)]
    pub prototype_keys: Vec<String>,
}

impl TypeEntry {
    pub fn plural(&self) -> String {
        self.plural_name
            .clone()
            .unwrap_or_else(|| format!("{}s", self.name))
    }
}

// ──────────────────────────────────────────────
// Resolved classes
// ──────────────────────────────────────────────

/// Singular or plural form of a type. `AsNamed` resolves to the form the
/// name itself is in (`Host` singular, `Hosts` plural).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Singular,
    Plural,
    AsNamed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    String,
    Boolean,
    Timestamp,
    Array,
    Dictionary,
    Value,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseKind {
    /// Runtime objects (check results, comments' payloads...) that are read only.
    Object,
    /// Named configuration objects that can be modified, deleted and acted upon.
    ConfigObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub modify: bool,
    pub delete: bool,
    pub actions: bool,
}

impl Capabilities {
    fn for_base(base: BaseKind) -> Self {
        match base {
            BaseKind::ConfigObject => Capabilities {
                modify: true,
                delete: true,
                actions: true,
            },
            BaseKind::Object => Capabilities::default(),
        }
    }
}

/// Resolved description of an object type in one form.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectClass {
    pub name: String,
    pub plural_name: String,
    pub form: Form,
    pub base: BaseKind,
    /// Own fields plus every ancestor's; the closest declaration wins.
    pub fields: BTreeMap<String, FieldDesc>,
    /// Base type names, closest first.
    pub ancestors: Vec<String>,
    pub is_abstract: bool,
    pub capabilities: Capabilities,
}

impl ObjectClass {
    fn foundational(name: &str, base: BaseKind, form: Form) -> Self {
        ObjectClass {
            name: name.to_string(),
            plural_name: format!("{name}s"),
            form,
            base,
            fields: BTreeMap::new(),
            ancestors: Vec::new(),
            is_abstract: true,
            capabilities: Capabilities::for_base(base),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.get(name)
    }

    /// The name in this class's form.
    pub fn display_name(&self) -> &str {
        match self.form {
            Form::Plural => &self.plural_name,
            _ => &self.name,
        }
    }

    /// URL segment of the objects endpoint: `hosts`, `services`.
    pub fn url_segment(&self) -> String {
        self.plural_name.to_lowercase()
    }

    pub fn descends_from(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.ancestors.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// What a type name resolves to.
#[derive(Debug, Clone)]
pub enum TypeClass {
    Value(ValueKind),
    Object(Rc<ObjectClass>),
}

impl TypeClass {
    pub fn as_object(&self) -> Option<&Rc<ObjectClass>> {
        match self {
            TypeClass::Object(class) => Some(class),
            TypeClass::Value(_) => None,
        }
    }

    /// Identity for object classes, equality for value kinds.
    pub fn same(&self, other: &TypeClass) -> bool {
        match (self, other) {
            (TypeClass::Object(a), TypeClass::Object(b)) => Rc::ptr_eq(a, b),
            (TypeClass::Value(a), TypeClass::Value(b)) => a == b,
            _ => false,
        }
    }
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

#[derive(Debug)]
struct Pair {
    singular: TypeClass,
    plural: TypeClass,
    /// Lower-cased plural name, to tell the forms apart for `Form::AsNamed`.
    plural_key: String,
}

impl Pair {
    fn pick(&self, key: &str, form: Form) -> TypeClass {
        let plural = match form {
            Form::Singular => false,
            Form::Plural => true,
            Form::AsNamed => key == self.plural_key,
        };
        if plural {
            self.plural.clone()
        } else {
            self.singular.clone()
        }
    }
}

/// Session-scoped resolver from type names to classes.
pub struct TypeRegistry {
    schema: CachedResultSet,
    overrides: HashMap<String, Rc<Pair>>,
    classes: RefCell<HashMap<String, Rc<Pair>>>,
    synthesized: Cell<bool>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("synthesized", &self.synthesized.get())
            .field("classes", &self.classes.borrow().len())
            .finish()
    }
}

fn override_table() -> HashMap<String, Rc<Pair>> {
    let mut table = HashMap::new();

    for (name, base) in [("Object", BaseKind::Object), ("ConfigObject", BaseKind::ConfigObject)] {
        let pair = Rc::new(Pair {
            singular: TypeClass::Object(Rc::new(ObjectClass::foundational(
                name,
                base,
                Form::Singular,
            ))),
            plural: TypeClass::Object(Rc::new(ObjectClass::foundational(
                name,
                base,
                Form::Plural,
            ))),
            plural_key: format!("{name}s").to_lowercase(),
        });
        table.insert(name.to_lowercase(), Rc::clone(&pair));
        table.insert(format!("{name}s").to_lowercase(), pair);
    }

    let values = [
        ("Number", ValueKind::Number),
        ("String", ValueKind::String),
        ("Boolean", ValueKind::Boolean),
        ("Timestamp", ValueKind::Timestamp),
        ("Array", ValueKind::Array),
        ("Dictionary", ValueKind::Dictionary),
        ("Value", ValueKind::Value),
        ("Duration", ValueKind::Duration),
    ];
    for (name, kind) in values {
        table.insert(
            name.to_lowercase(),
            Rc::new(Pair {
                singular: TypeClass::Value(kind),
                plural: TypeClass::Value(kind),
                plural_key: String::new(),
            }),
        );
    }
    table
}

impl TypeRegistry {
    pub fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        TypeRegistry {
            schema: CachedResultSet::new(
                ApiRequest::get("types"),
                transport,
                clock,
                CacheDuration::Infinite,
            ),
            overrides: override_table(),
            classes: RefCell::new(HashMap::new()),
            synthesized: Cell::new(false),
        }
    }

    /// Resolves `name` (singular or plural, any case) in the requested form.
    ///
    /// The schema is fetched on the first name that is neither foundational
    /// nor already known. Fails with `UnknownType` when the schema lacks it.
    pub fn resolve(&self, name: &str, form: Form) -> Result<TypeClass, ApiError> {
        let key = name.to_lowercase();
        if let Some(pair) = self.overrides.get(&key) {
            return Ok(pair.pick(&key, form));
        }
        if let Some(pair) = self.classes.borrow().get(&key) {
            return Ok(pair.pick(&key, form));
        }
        if !self.synthesized.get() {
            self.synthesize()?;
            if let Some(pair) = self.classes.borrow().get(&key) {
                return Ok(pair.pick(&key, form));
            }
        }
        Err(ApiError::UnknownType {
            name: name.to_string(),
        })
    }

    /// Resolves `name` and requires an object type.
    pub fn resolve_object(&self, name: &str, form: Form) -> Result<Rc<ObjectClass>, ApiError> {
        match self.resolve(name, form)? {
            TypeClass::Object(class) => Ok(class),
            TypeClass::Value(_) => Err(ApiError::Unsupported {
                operation: "object access".into(),
                type_name: name.to_string(),
            }),
        }
    }

    /// Class of a declared field's type, always singular.
    pub fn field_type(&self, class: &ObjectClass, field: &str) -> Result<TypeClass, ApiError> {
        let desc = class
            .field(field)
            .ok_or_else(|| ApiError::key_not_found(field))?;
        self.resolve(&desc.type_name, Form::Singular)
    }

    /// Raw schema entries, fetching them if needed.
    pub fn descriptions(&self) -> Result<Vec<TypeEntry>, ApiError> {
        self.schema
            .results()?
            .raw()
            .map(parse_entry)
            .collect()
    }

    pub fn is_synthesized(&self) -> bool {
        self.synthesized.get()
    }

    fn synthesize(&self) -> Result<(), ApiError> {
        let entries = self.descriptions()?;
        let by_name: HashMap<String, &TypeEntry> = entries
            .iter()
            .map(|e| (e.name.to_lowercase(), e))
            .collect();

        let mut classes = HashMap::new();
        for entry in &entries {
            let pair = Rc::new(synthesize_pair(entry, &by_name)?);
            classes.insert(entry.name.to_lowercase(), Rc::clone(&pair));
            classes.insert(pair.plural_key.clone(), pair);
        }

        tracing::info!(types = entries.len(), "Type schema loaded");
        *self.classes.borrow_mut() = classes;
        self.synthesized.set(true);
        Ok(())
    }
}

fn parse_entry(value: &Value) -> Result<TypeEntry, ApiError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ApiError::SchemaError(format!("malformed type description: {}", e)))
}

fn synthesize_pair(entry: &TypeEntry, by_name: &HashMap<String, &TypeEntry>) -> Result<Pair, ApiError> {
    // Walk the base chain; a missing base ends it, a repeated one is a cycle.
    let mut lineage = vec![entry];
    let mut ancestors = Vec::new();
    let mut seen = HashSet::from([entry.name.to_lowercase()]);
    let mut current = entry;
    while let Some(base) = current.base.as_deref().filter(|b| !b.is_empty()) {
        let key = base.to_lowercase();
        if !seen.insert(key.clone()) {
            return Err(ApiError::SchemaError(format!(
                "inheritance cycle: {} reaches {} again",
                entry.name, base
            )));
        }
        ancestors.push(base.to_string());
        match by_name.get(&key) {
            Some(parent) => {
                lineage.push(*parent);
                current = *parent;
            }
            None => break,
        }
    }

    let mut fields = BTreeMap::new();
    for ancestor in lineage.iter().rev() {
        for (name, desc) in &ancestor.fields {
            fields.insert(name.clone(), desc.clone());
        }
    }

    let is_config = entry.name.eq_ignore_ascii_case("ConfigObject")
        || ancestors.iter().any(|a| a.eq_ignore_ascii_case("ConfigObject"));
    let base = if is_config {
        BaseKind::ConfigObject
    } else {
        BaseKind::Object
    };

    let class = |form| ObjectClass {
        name: entry.name.clone(),
        plural_name: entry.plural(),
        form,
        base,
        fields: fields.clone(),
        ancestors: ancestors.clone(),
        is_abstract: entry.is_abstract,
        capabilities: Capabilities::for_base(base),
    };

    Ok(Pair {
        singular: TypeClass::Object(Rc::new(class(Form::Singular))),
        plural: TypeClass::Object(Rc::new(class(Form::Plural))),
        plural_key: entry.plural().to_lowercase(),
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use icinga2_api::mock::MockTransport;
    use icinga2_api::{ManualClock, Method};
    use serde_json::json;

    fn field(type_name: &str, modify: bool) -> Value {
        json!({
            "type": type_name,
            "array_rank": 0,
            "attributes": {"no_user_view": false, "no_user_modify": !modify, "config": true}
        })
    }

    fn schema() -> Value {
        json!([
            {"name": "ConfigObject", "plural_name": "ConfigObjects", "base": "ConfigObjectBase",
             "abstract": true, "fields": {"name": field("String", false), "zone": field("String", false)}},
            {"name": "ConfigObjectBase", "plural_name": "ConfigObjectBases", "abstract": true, "fields": {}},
            {"name": "CustomVarObject", "plural_name": "CustomVarObjects", "base": "ConfigObject",
             "abstract": true, "fields": {"vars": field("Dictionary", true)}},
            {"name": "Host", "plural_name": "Hosts", "base": "CustomVarObject",
             "fields": {"address": field("String", true), "zone": field("Zone", false)}},
            {"name": "CheckResult", "plural_name": "CheckResults", "base": "Object",
             "fields": {"output": field("String", false)}},
        ])
    }

    fn registry(schema: Value) -> (Arc<MockTransport>, TypeRegistry) {
        let mock = Arc::new(MockTransport::new());
        mock.route(Method::Get, "types").respond_results(schema);
        let registry = TypeRegistry::new(mock.clone(), Arc::new(ManualClock::new()));
        (mock, registry)
    }

    #[test]
    fn overrides_resolve_without_schema() {
        let (mock, reg) = registry(schema());
        assert!(matches!(
            reg.resolve("number", Form::Singular).unwrap(),
            TypeClass::Value(ValueKind::Number)
        ));
        let objects = reg.resolve_object("ConfigObjects", Form::AsNamed).unwrap();
        assert_eq!(objects.form, Form::Plural);
        assert_eq!(objects.base, BaseKind::ConfigObject);
        assert_eq!(mock.count(Method::Get, "types"), 0);
    }

    #[test]
    fn resolution_is_case_insensitive_and_identical() {
        let (mock, reg) = registry(schema());
        let a = reg.resolve("Host", Form::Singular).unwrap();
        let b = reg.resolve("host", Form::Singular).unwrap();
        let c = reg.resolve("HOSTS", Form::Singular).unwrap();
        assert!(a.same(&b));
        assert!(a.same(&c));
        assert_eq!(mock.count(Method::Get, "types"), 1);
    }

    #[test]
    fn singular_and_plural_are_distinct() {
        let (_, reg) = registry(schema());
        let one = reg.resolve_object("hosts", Form::Singular).unwrap();
        let many = reg.resolve_object("host", Form::Plural).unwrap();
        assert!(!Rc::ptr_eq(&one, &many));
        assert_eq!(many.display_name(), "Hosts");
        let named = reg.resolve_object("Hosts", Form::AsNamed).unwrap();
        assert!(Rc::ptr_eq(&named, &many));
    }

    #[test]
    fn fields_are_inherited() {
        let (_, reg) = registry(schema());
        let host = reg.resolve_object("Host", Form::Singular).unwrap();
        let names: Vec<_> = host.fields.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["address", "name", "vars", "zone"]);
        assert_eq!(host.field("zone").unwrap().type_name, "Zone");
        assert_eq!(
            host.ancestors,
            vec!["CustomVarObject", "ConfigObject", "ConfigObjectBase"]
        );
        assert_eq!(host.base, BaseKind::ConfigObject);
        assert!(host.capabilities.modify);

        let cr = reg.resolve_object("CheckResult", Form::Singular).unwrap();
        assert_eq!(cr.base, BaseKind::Object);
        assert!(!cr.capabilities.delete);
        assert_eq!(cr.ancestors, vec!["Object"]);
    }

    #[test]
    fn unknown_type_after_fetch() {
        let (mock, reg) = registry(schema());
        assert!(matches!(
            reg.resolve("Nope", Form::Singular),
            Err(ApiError::UnknownType { .. })
        ));
        assert!(reg.resolve("Nope", Form::Singular).is_err());
        assert_eq!(mock.count(Method::Get, "types"), 1);
    }

    #[test]
    fn inheritance_cycle_is_schema_error() {
        let (_, reg) = registry(json!([
            {"name": "A", "plural_name": "As", "base": "B", "fields": {}},
            {"name": "B", "plural_name": "Bs", "base": "A", "fields": {}},
        ]));
        assert!(matches!(
            reg.resolve("A", Form::Singular),
            Err(ApiError::SchemaError(_))
        ));
        assert!(!reg.is_synthesized());
    }

    #[test]
    fn failed_schema_fetch_is_retried() {
        let mock = Arc::new(MockTransport::new());
        mock.expect(Method::Get, "types")
            .fail(ApiError::Transport("down".into()));
        mock.expect(Method::Get, "types").respond_results(schema());
        let reg = TypeRegistry::new(mock.clone(), Arc::new(ManualClock::new()));
        assert!(reg.resolve("Host", Form::Singular).is_err());
        assert!(reg.resolve("Host", Form::Singular).is_ok());
        mock.verify();
    }

    #[test]
    fn field_permissions_default_to_denied() {
        let desc: FieldDesc = serde_json::from_value(json!({"type": "String"})).unwrap();
        assert!(!desc.can_view());
        assert!(!desc.can_modify());
        let desc: FieldDesc = serde_json::from_value(field("String", true)).unwrap();
        assert!(desc.can_view());
        assert!(desc.can_modify());
        assert!(desc.is_config());
    }
}
