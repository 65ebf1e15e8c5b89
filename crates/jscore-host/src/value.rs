//! Host-side value representation
//!
//! `HostValue` is what crosses the bridge in both directions: host code
//! builds one to hand data to the engine, and every engine value projects
//! back into one. Plain data is copied; host objects travel as shared
//! references so they round-trip by identity.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::object::{HostObject, HostRef};

/// A host value that can be handed to, or recovered from, the engine
#[derive(Clone, Debug)]
pub enum HostValue {
    /// Absent value (null or undefined on the engine side)
    Null,
    Bool(bool),
    /// Signed integer; widened to f64 on conversion
    Integer(i64),
    /// Unsigned integer; widened to f64 on conversion
    Unsigned(u64),
    Number(f64),
    String(String),
    /// Ordered sequence, converted element by element into an array
    Array(Vec<HostValue>),
    /// String-keyed mapping; the projection of plain engine objects
    Map(HashMap<String, HostValue>),
    /// Shared reference to a wrapped host object
    Object(HostRef),
    /// Any other host value. The engine has no representation for it.
    Opaque(Opaque),
}

impl HostValue {
    /// Short name of the variant, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Integer(_) => "integer",
            HostValue::Unsigned(_) => "unsigned integer",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Array(_) => "array",
            HostValue::Map(_) => "map",
            HostValue::Object(_) => "host object",
            HostValue::Opaque(_) => "opaque value",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of any of the numeric variants
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Integer(i) => Some(*i as f64),
            HostValue::Unsigned(u) => Some(*u as f64),
            HostValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, HostValue>> {
        match self {
            HostValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostRef> {
        match self {
            HostValue::Object(host) => Some(host),
            _ => None,
        }
    }

    /// Recover a typed host object, if this value wraps one of type `T`
    pub fn downcast<T: HostObject>(&self) -> Option<Arc<T>> {
        self.as_object().and_then(HostRef::downcast::<T>)
    }

    /// Render the data subset as JSON.
    ///
    /// Non-finite numbers become `null` the way `JSON.stringify` renders
    /// them. Host objects and opaque values have no JSON form.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;

        Some(match self {
            HostValue::Null => Json::Null,
            HostValue::Bool(b) => Json::Bool(*b),
            HostValue::Integer(i) => Json::from(*i),
            HostValue::Unsigned(u) => Json::from(*u),
            HostValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            HostValue::String(s) => Json::String(s.clone()),
            HostValue::Array(items) => Json::Array(
                items
                    .iter()
                    .map(HostValue::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            HostValue::Map(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key.clone(), value.to_json()?);
                }
                Json::Object(object)
            }
            HostValue::Object(_) | HostValue::Opaque(_) => return None,
        })
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Integer(a), HostValue::Integer(b)) => a == b,
            (HostValue::Unsigned(a), HostValue::Unsigned(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => a == b,
            (HostValue::Map(a), HostValue::Map(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a.ptr_eq(b),
            (HostValue::Opaque(a), HostValue::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// A host value with no engine representation.
///
/// Converting one into an engine value fails with an unsupported-type
/// error naming `type_name`.
#[derive(Clone)]
pub struct Opaque {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Opaque {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.type_name).finish()
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for HostValue {
            fn from(v: $t) -> Self {
                HostValue::Integer(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for HostValue {
            fn from(v: $t) -> Self {
                HostValue::Unsigned(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for HostValue {
    fn from(v: f32) -> Self {
        HostValue::Number(v as f64)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Number(v)
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Bool(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::String(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::String(v)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(v: Vec<T>) -> Self {
        HostValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(HostValue::Null)
    }
}

impl From<HashMap<String, HostValue>> for HostValue {
    fn from(v: HashMap<String, HostValue>) -> Self {
        HostValue::Map(v)
    }
}

impl<T: HostObject> From<Arc<T>> for HostValue {
    fn from(v: Arc<T>) -> Self {
        HostValue::Object(HostRef::new(v))
    }
}

impl From<HostRef> for HostValue {
    fn from(v: HostRef) -> Self {
        HostValue::Object(v)
    }
}

impl From<Opaque> for HostValue {
    fn from(v: Opaque) -> Self {
        HostValue::Opaque(v)
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match v {
            Json::Null => HostValue::Null,
            Json::Bool(b) => HostValue::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    HostValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    HostValue::Unsigned(u)
                } else {
                    HostValue::Number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => HostValue::String(s),
            Json::Array(items) => HostValue::Array(items.into_iter().map(Into::into).collect()),
            Json::Object(map) => {
                HostValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
