//! Engine objects: property access, arrays and host object wrapping

use std::fmt;
use std::sync::Arc;

use deno_core::v8;
use jscore_host::{HostObject, HostRef, HostValue, Token, TokenTable};

use crate::class;
use crate::error::{Error, Result};
use crate::string::new_key;
use crate::value::{catch, Value};

/// Handle to an engine object. Equality is object identity.
#[derive(Clone, Copy)]
pub struct Object<'s> {
    local: v8::Local<'s, v8::Object>,
}

impl<'s> Object<'s> {
    /// A plain empty object
    pub fn new(scope: &mut v8::HandleScope<'s>) -> Self {
        Object::from_local(v8::Object::new(scope))
    }

    /// Wrap dynamically typed host data, which must be a host object
    pub fn new_host(scope: &mut v8::HandleScope<'s>, data: &HostValue) -> Result<Self> {
        match data {
            HostValue::Object(host) => class::wrap_host(scope, host.clone()),
            other => Err(Error::InvalidWrapTarget {
                found: other.kind_name(),
            }),
        }
    }

    /// Wrap a host object.
    ///
    /// Script code sees the fields the type exposes; `Value::to_host`
    /// on the result gives back `object` itself.
    pub fn wrap<T: HostObject>(scope: &mut v8::HandleScope<'s>, object: Arc<T>) -> Result<Self> {
        class::wrap_host(scope, HostRef::new(object))
    }

    /// An array holding exactly `values`, in order
    pub fn new_array(scope: &mut v8::HandleScope<'s>, values: &[Value<'s>]) -> Self {
        let elements: Vec<v8::Local<v8::Value>> = values.iter().map(|v| v.local()).collect();
        Object::from_local(v8::Array::new_with_elements(scope, &elements).into())
    }

    pub fn from_local(local: v8::Local<'s, v8::Object>) -> Self {
        Object { local }
    }

    pub fn local(self) -> v8::Local<'s, v8::Object> {
        self.local
    }

    pub fn value(self) -> Value<'s> {
        Value::from_local(self.local.into())
    }

    pub fn is_array(self) -> bool {
        self.local.is_array()
    }

    /// Whether the object or its prototype chain has the property
    pub fn has(self, scope: &mut v8::HandleScope<'s>, name: &str) -> Result<bool> {
        let key = new_key(scope, name)?;
        catch(scope, |tc| self.local.has(tc, key.into()))
    }

    /// Property value; `undefined` when the property is missing
    pub fn get(self, scope: &mut v8::HandleScope<'s>, name: &str) -> Result<Value<'s>> {
        let key = new_key(scope, name)?;
        catch(scope, |tc| self.local.get(tc, key.into())).map(Value::from_local)
    }

    pub fn set(self, scope: &mut v8::HandleScope<'s>, name: &str, value: Value<'s>) -> Result<()> {
        let key = new_key(scope, name)?;
        catch(scope, |tc| self.local.set(tc, key.into(), value.local())).map(|_| ())
    }

    /// Indexed property value; `undefined` past the end
    pub fn at(self, scope: &mut v8::HandleScope<'s>, index: u32) -> Result<Value<'s>> {
        catch(scope, |tc| self.local.get_index(tc, index)).map(Value::from_local)
    }

    pub fn set_at(self, scope: &mut v8::HandleScope<'s>, index: u32, value: Value<'s>) -> Result<()> {
        catch(scope, |tc| self.local.set_index(tc, index, value.local())).map(|_| ())
    }

    /// Delete an own property. Returns false when it is not configurable.
    pub fn delete(self, scope: &mut v8::HandleScope<'s>, name: &str) -> Result<bool> {
        let key = new_key(scope, name)?;
        catch(scope, |tc| self.local.delete(tc, key.into()))
    }

    /// Names of the enumerable own properties
    pub fn property_names(self, scope: &mut v8::HandleScope<'s>) -> Result<Vec<String>> {
        let names = catch(scope, |tc| {
            self.local
                .get_own_property_names(tc, v8::GetPropertyNamesArgs::default())
        })?;
        let mut result = Vec::with_capacity(names.length() as usize);
        for i in 0..names.length() {
            let name = catch(scope, |tc| names.get_index(tc, i))?;
            result.push(name.to_rust_string_lossy(scope));
        }
        Ok(result)
    }

    /// Elements at indices 0, 1, 2, ... up to the first `undefined`.
    ///
    /// The array's `length` is not consulted: an `undefined` element ends
    /// the slice even when defined elements follow it.
    pub fn slice(self, scope: &mut v8::HandleScope<'s>) -> Result<Vec<Value<'s>>> {
        let mut values = Vec::new();
        for i in 0..u32::MAX {
            let value = self.at(scope, i)?;
            if value.local().is_undefined() {
                break;
            }
            values.push(value);
        }
        Ok(values)
    }

    /// Ownership token, if this object wraps a host object
    pub fn token(self, scope: &mut v8::HandleScope<'s>) -> Option<Token> {
        class::read_token(scope, self.local)
    }

    /// The wrapped host object, if any
    pub fn host(self, scope: &mut v8::HandleScope<'s>) -> Result<Option<HostRef>> {
        match self.token(scope) {
            None => Ok(None),
            Some(token) => TokenTable::global()
                .get(token)
                .map(Some)
                .ok_or(Error::StaleToken(token)),
        }
    }
}

impl PartialEq for Object<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local
    }
}

impl fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("array", &self.local.is_array())
            .finish_non_exhaustive()
    }
}
