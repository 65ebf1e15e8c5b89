//! Engine values and their conversion to and from host data

use std::fmt;

use deno_core::v8;
use jscore_host::{HostValue, TokenTable};

use crate::class;
use crate::error::{Error, Result, ScriptException};
use crate::object::Object;
use crate::string::new_string;
use crate::types::{classify, JsType};

/// Handle to an engine value, valid for the handle scope `'s`.
///
/// Values are immutable; constructors and conversions return new handles.
#[derive(Clone, Copy)]
pub struct Value<'s> {
    local: v8::Local<'s, v8::Value>,
}

impl<'s> Value<'s> {
    /// Convert host data into an engine value.
    ///
    /// Numbers of every width become doubles, sequences become arrays,
    /// maps become plain objects and host objects are wrapped. Opaque
    /// values have no representation and fail with `UnsupportedType`.
    pub fn new(scope: &mut v8::HandleScope<'s>, data: &HostValue) -> Result<Self> {
        match data {
            HostValue::Null => Ok(Value::null(scope)),
            HostValue::Bool(b) => Ok(Value::boolean(scope, *b)),
            HostValue::Integer(i) => Ok(Value::number(scope, *i as f64)),
            HostValue::Unsigned(u) => Ok(Value::number(scope, *u as f64)),
            HostValue::Number(n) => Ok(Value::number(scope, *n)),
            HostValue::String(s) => Value::string(scope, s),
            HostValue::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(Value::new(scope, item)?);
                }
                Ok(Object::new_array(scope, &values).value())
            }
            HostValue::Map(map) => {
                let object = Object::new(scope);
                for (name, item) in map {
                    let item = Value::new(scope, item)?;
                    object.set(scope, name, item)?;
                }
                Ok(object.value())
            }
            HostValue::Object(host) => Ok(class::wrap_host(scope, host.clone())?.value()),
            HostValue::Opaque(opaque) => Err(Error::UnsupportedType {
                found: opaque.type_name().to_string(),
            }),
        }
    }

    pub fn null(scope: &mut v8::HandleScope<'s>) -> Self {
        Value::from_local(v8::null(scope).into())
    }

    pub fn undefined(scope: &mut v8::HandleScope<'s>) -> Self {
        Value::from_local(v8::undefined(scope).into())
    }

    pub fn number(scope: &mut v8::HandleScope<'s>, x: f64) -> Self {
        Value::from_local(v8::Number::new(scope, x).into())
    }

    pub fn boolean(scope: &mut v8::HandleScope<'s>, b: bool) -> Self {
        Value::from_local(v8::Boolean::new(scope, b).into())
    }

    pub fn string(scope: &mut v8::HandleScope<'s>, text: &str) -> Result<Self> {
        Ok(Value::from_local(new_string(scope, text)?.into()))
    }

    /// A fresh, unique symbol with the given description
    pub fn symbol(scope: &mut v8::HandleScope<'s>, description: &str) -> Result<Self> {
        let description = new_string(scope, description)?;
        Ok(Value::from_local(v8::Symbol::new(scope, Some(description)).into()))
    }

    pub fn from_local(local: v8::Local<'s, v8::Value>) -> Self {
        Value { local }
    }

    pub fn local(self) -> v8::Local<'s, v8::Value> {
        self.local
    }

    /// Keep the value alive beyond this handle scope
    pub fn protect(self, scope: &mut v8::HandleScope<'s>) -> Protected {
        Protected {
            global: v8::Global::new(scope, self.local),
        }
    }

    pub fn js_type(self, scope: &mut v8::HandleScope<'s>) -> Result<JsType> {
        classify(self.local).ok_or_else(|| unknown_kind(scope, self.local))
    }

    /// Numeric value under the engine's `ToNumber` rules
    pub fn to_number(self, scope: &mut v8::HandleScope<'s>) -> Result<f64> {
        catch(scope, |tc| self.local.number_value(tc))
    }

    /// Truthiness under the engine's `ToBoolean` rules
    pub fn to_boolean(self, scope: &mut v8::HandleScope<'s>) -> bool {
        self.local.boolean_value(scope)
    }

    /// Textual form under the engine's `ToString` rules
    pub fn to_rust_string(self, scope: &mut v8::HandleScope<'s>) -> Result<String> {
        let string = catch(scope, |tc| self.local.to_string(tc))?;
        Ok(string.to_rust_string_lossy(scope))
    }

    pub fn to_object(self, scope: &mut v8::HandleScope<'s>) -> Result<Object<'s>> {
        match v8::Local::<v8::Object>::try_from(self.local) {
            Ok(object) => Ok(Object::from_local(object)),
            Err(_) => Err(Error::NotAnObject {
                found: self.js_type(scope)?,
            }),
        }
    }

    /// Project the value into host data.
    ///
    /// Wrapped host objects come back as the same shared reference,
    /// arrays as sequences and other objects as maps of their enumerable
    /// own properties.
    pub fn to_host(self, scope: &mut v8::HandleScope<'s>) -> Result<HostValue> {
        let limit = class::max_depth(scope);
        let tc = &mut v8::TryCatch::new(scope);
        let mut path = Vec::new();
        match project(tc, self.local, &mut path, limit) {
            Ok(value) => Ok(value),
            Err(_) if tc.has_caught() => Err(exception_from(tc)),
            Err(err) => Err(err),
        }
    }

    /// Identity for objects, `===` for everything else
    pub fn strict_equals(self, other: Value) -> bool {
        self.local.strict_equals(other.local)
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = classify(self.local).map(|t| t.to_string());
        f.debug_tuple("Value")
            .field(&kind.as_deref().unwrap_or("?"))
            .finish()
    }
}

/// A value kept alive independently of any handle scope.
///
/// Dropping it, or calling [`Protected::unprotect`], lets the engine
/// collect the value again.
pub struct Protected {
    global: v8::Global<v8::Value>,
}

impl Protected {
    /// Re-open the value in `scope`
    pub fn open<'s>(&self, scope: &mut v8::HandleScope<'s>) -> Value<'s> {
        Value::from_local(v8::Local::new(scope, &self.global))
    }

    pub fn unprotect(self) {}
}

impl fmt::Debug for Protected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Protected")
    }
}

/// Run `f` under a try-catch, turning a thrown value into `Error::Script`
pub(crate) fn catch<'s, T>(
    scope: &mut v8::HandleScope<'s>,
    f: impl FnOnce(&mut v8::HandleScope<'s>) -> Option<T>,
) -> Result<T> {
    let tc = &mut v8::TryCatch::new(scope);
    let inner: &mut v8::HandleScope<'s> = tc;
    match f(inner) {
        Some(value) => Ok(value),
        None => Err(exception_from(tc)),
    }
}

pub(crate) fn exception_from(tc: &mut v8::TryCatch<v8::HandleScope>) -> Error {
    let Some(exception) = tc.exception() else {
        return Error::Engine("execution was terminated".into());
    };
    let message = exception.to_rust_string_lossy(tc);
    let exception = v8::Global::new(tc, exception);
    Error::Script(ScriptException::new(message, exception))
}

fn unknown_kind(scope: &mut v8::HandleScope, value: v8::Local<v8::Value>) -> Error {
    let kind = value.type_of(scope).to_rust_string_lossy(scope);
    log::error!("engine produced a value of unknown kind {}", kind);
    Error::UnknownKind(kind)
}

fn project<'s>(
    scope: &mut v8::HandleScope<'s>,
    value: v8::Local<'s, v8::Value>,
    path: &mut Vec<v8::Local<'s, v8::Object>>,
    limit: usize,
) -> Result<HostValue> {
    let object = match classify(value) {
        None | Some(JsType::Unknown(_)) => return Err(unknown_kind(scope, value)),
        Some(JsType::Undefined) | Some(JsType::Null) => return Ok(HostValue::Null),
        Some(JsType::Boolean) => return Ok(HostValue::Bool(value.boolean_value(scope))),
        Some(JsType::Number) => {
            return Ok(HostValue::Number(value.number_value(scope).unwrap_or(f64::NAN)))
        }
        Some(JsType::String) => return Ok(HostValue::String(value.to_rust_string_lossy(scope))),
        Some(JsType::Symbol) => return Err(Error::SymbolNotRepresentable),
        Some(JsType::Object) => v8::Local::<v8::Object>::try_from(value)
            .map_err(|_| Error::Engine("object-kind value is not an object".into()))?,
    };

    if let Some(token) = class::read_token(scope, object) {
        return TokenTable::global()
            .get(token)
            .map(HostValue::Object)
            .ok_or(Error::StaleToken(token));
    }

    if path.iter().any(|seen| *seen == object) {
        return Err(Error::CircularReference);
    }
    if path.len() >= limit {
        return Err(Error::TooDeep { limit });
    }

    path.push(object);
    let result = if let Ok(array) = v8::Local::<v8::Array>::try_from(value) {
        project_array(scope, array, path, limit)
    } else {
        project_map(scope, object, path, limit)
    };
    path.pop();
    result
}

fn project_array<'s>(
    scope: &mut v8::HandleScope<'s>,
    array: v8::Local<'s, v8::Array>,
    path: &mut Vec<v8::Local<'s, v8::Object>>,
    limit: usize,
) -> Result<HostValue> {
    let mut items = Vec::with_capacity(array.length() as usize);
    for i in 0..array.length() {
        let item = array.get_index(scope, i).ok_or_else(thrown)?;
        items.push(project(scope, item, path, limit)?);
    }
    Ok(HostValue::Array(items))
}

fn project_map<'s>(
    scope: &mut v8::HandleScope<'s>,
    object: v8::Local<'s, v8::Object>,
    path: &mut Vec<v8::Local<'s, v8::Object>>,
    limit: usize,
) -> Result<HostValue> {
    let names = object
        .get_own_property_names(scope, v8::GetPropertyNamesArgs::default())
        .ok_or_else(thrown)?;
    let mut map = std::collections::HashMap::with_capacity(names.length() as usize);
    for i in 0..names.length() {
        let key = names.get_index(scope, i).ok_or_else(thrown)?;
        let item = object.get(scope, key).ok_or_else(thrown)?;
        let name = key.to_rust_string_lossy(scope);
        map.insert(name, project(scope, item, path, limit)?);
    }
    Ok(HostValue::Map(map))
}

// Placeholder; `to_host` swaps it for the pending exception.
fn thrown() -> Error {
    Error::Engine("property access threw".into())
}
