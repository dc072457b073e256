//! Connector object model: the opaque values that flow through a facade call.
//!
//! The framework never interprets these beyond what filter matching needs; a
//! backend connector assigns them meaning.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime value of a single attribute entry.
///
/// Supports all JSON-compatible types plus binary data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// Uses `BTreeMap` for deterministic serialization order.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The string payload, if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering between two values of comparable kinds.
    ///
    /// Integers and floats compare numerically with each other; strings, booleans
    /// and byte strings compare within their own kind. Every other pairing is
    /// incomparable and yields `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// A named, possibly multi-valued attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Value>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// A single-valued attribute.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, vec![value.into()])
    }

    /// Attribute names compare case-insensitively, as connector schemas do.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The only value of a single-valued attribute.
    #[must_use]
    pub fn single_value(&self) -> Option<&Value> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }
}

/// The category of object a call targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectClass(String);

impl ObjectClass {
    pub const ACCOUNT_NAME: &'static str = "__ACCOUNT__";
    pub const GROUP_NAME: &'static str = "__GROUP__";

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn account() -> Self {
        Self::new(Self::ACCOUNT_NAME)
    }

    #[must_use]
    pub fn group() -> Self {
        Self::new(Self::GROUP_NAME)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend identifier of an object, with an optional revision for
/// optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uid {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub revision: Option<String>,
}

impl Uid {
    /// Name of the pseudo-attribute carrying the uid inside a [`ConnectorObject`].
    pub const ATTRIBUTE_NAME: &'static str = "__UID__";

    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            revision: None,
        }
    }

    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// An object returned by search or get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorObject {
    pub object_class: ObjectClass,
    pub uid: Uid,
    pub attributes: Vec<Attribute>,
}

impl ConnectorObject {
    #[must_use]
    pub fn new(object_class: ObjectClass, uid: Uid) -> Self {
        Self {
            object_class,
            uid,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Look up an attribute by case-insensitive name.
    ///
    /// `__UID__` resolves to the object's uid even when no such attribute was
    /// stored explicitly.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<std::borrow::Cow<'_, Attribute>> {
        if let Some(found) = self.attributes.iter().find(|a| a.is(name)) {
            return Some(std::borrow::Cow::Borrowed(found));
        }
        if name.eq_ignore_ascii_case(Uid::ATTRIBUTE_NAME) {
            return Some(std::borrow::Cow::Owned(Attribute::single(
                Uid::ATTRIBUTE_NAME,
                self.uid.value.as_str(),
            )));
        }
        None
    }
}

/// Free-form per-call options (page size, attributes to get, run-as user, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationOptions(BTreeMap<String, Value>);

impl OperationOptions {
    pub const ATTRIBUTES_TO_GET: &'static str = "ATTRS_TO_GET";
    pub const PAGE_SIZE: &'static str = "PAGE_SIZE";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn page_size(&self) -> Option<i64> {
        match self.0.get(Self::PAGE_SIZE) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn attributes_to_get(&self) -> Option<Vec<&str>> {
        match self.0.get(Self::ATTRIBUTES_TO_GET) {
            Some(Value::Array(names)) => Some(names.iter().filter_map(Value::as_str).collect()),
            _ => None,
        }
    }
}

/// Opaque position in a backend's change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncToken(pub Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDeltaType {
    Create,
    Update,
    CreateOrUpdate,
    Delete,
}

/// One change reported by a sync call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncDelta {
    pub token: SyncToken,
    pub delta_type: SyncDeltaType,
    pub uid: Uid,
    /// Absent for deletions.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object: Option<ConnectorObject>,
}

/// A script to run on the connector or on the target resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptContext {
    pub language: String,
    pub text: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
}

/// A secret whose contents never appear in `Debug` output, logs, or
/// serialized form. It deserializes from clear text.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct GuardedString(String);

impl GuardedString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Hands the clear text to `f` without letting it escape as an owned copy.
    pub fn access<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.0)
    }
}

impl fmt::Debug for GuardedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GuardedString(***)")
    }
}

impl Serialize for GuardedString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// Schema as reported by a connector. Produced by the backend, passed through
/// unchanged by the framework.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub object_classes: Vec<ObjectClassInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectClassInfo {
    pub name: String,
    pub attributes: Vec<String>,
}
