//! Native side of the host object bridge
//!
//! The process-wide [`ClassRegistry`] holds one engine-independent
//! descriptor per host type. Each context adds its own state on top,
//! kept in an isolate slot:
//!
//! - one object template per host type, with a getter for every exposed
//!   field name. Names a type does not expose have no getter, so reads of
//!   them fall through to the ordinary prototype lookup.
//! - one weak handle per wrapped object, whose finalizer releases the
//!   object's ownership token.
//!
//! The token lives on the native object under a private key. Script code
//! can neither see nor forge it.
//!
//! Finalizers run inside a garbage collection pass. They only release the
//! token and queue it; the weak handle itself is dropped on the next
//! sweep, since dropping a pending weak handle would cancel its finalizer.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use deno_core::v8;
use jscore_host::{ClassDescriptor, ClassRegistry, HostRef, Token, TokenTable};

use crate::config::DEFAULT_MAX_INTERFACE_DEPTH;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::string::{new_key, new_string};
use crate::value::Value;

const TOKEN_KEY: &str = "jscore::token";

pub(crate) struct BridgeState {
    templates: HashMap<TypeId, v8::Global<v8::ObjectTemplate>>,
    live: HashMap<Token, v8::Weak<v8::Object>>,
    reclaimed: Rc<RefCell<Vec<Token>>>,
    max_depth: usize,
}

impl BridgeState {
    fn new(max_depth: usize) -> Self {
        BridgeState {
            templates: HashMap::new(),
            live: HashMap::new(),
            reclaimed: Rc::new(RefCell::new(Vec::new())),
            max_depth,
        }
    }

    /// Drop the weak handles of objects whose finalizer already ran
    fn sweep(&mut self) {
        let reclaimed = std::mem::take(&mut *self.reclaimed.borrow_mut());
        for token in reclaimed {
            self.live.remove(&token);
        }
    }
}

/// Attach fresh bridge state to a context's isolate
pub(crate) fn install(isolate: &mut v8::Isolate, max_depth: usize) {
    isolate.set_slot(BridgeState::new(max_depth));
}

/// Tear down bridge state, releasing the tokens of objects still alive.
///
/// Returns how many tokens were released.
pub(crate) fn dispose(isolate: &mut v8::Isolate) -> usize {
    let Some(mut state) = isolate.remove_slot::<BridgeState>() else {
        return 0;
    };
    state.sweep();

    let mut released = 0;
    for (token, weak) in state.live.drain() {
        // Cancels the finalizer, so the release below is the only one
        drop(weak);
        if TokenTable::global().release(token).is_some() {
            released += 1;
        }
    }
    released
}

/// Number of wrapped objects not yet finalized
pub(crate) fn live_objects(isolate: &mut v8::Isolate) -> usize {
    match isolate.get_slot_mut::<BridgeState>() {
        Some(state) => {
            state.sweep();
            state.live.len()
        }
        None => 0,
    }
}

pub(crate) fn sweep(isolate: &mut v8::Isolate) {
    if let Some(state) = isolate.get_slot_mut::<BridgeState>() {
        state.sweep();
    }
}

pub(crate) fn max_depth(isolate: &v8::Isolate) -> usize {
    isolate
        .get_slot::<BridgeState>()
        .map(|state| state.max_depth)
        .unwrap_or(DEFAULT_MAX_INTERFACE_DEPTH)
}

fn no_bridge() -> Error {
    Error::Engine("scope does not belong to a GlobalContext".into())
}

/// Wrap a host object into a new native object of its class
pub(crate) fn wrap_host<'s>(scope: &mut v8::HandleScope<'s>, host: HostRef) -> Result<Object<'s>> {
    let reclaimed = {
        let state = scope.get_slot_mut::<BridgeState>().ok_or_else(no_bridge)?;
        state.sweep();
        Rc::clone(&state.reclaimed)
    };

    let class = ClassRegistry::global().class_for(host.class());
    let template = template_for(scope, &class)?;
    let object = template
        .new_instance(scope)
        .ok_or_else(|| Error::Engine(format!("failed to instantiate {}", class.name())))?;
    let key = token_key(scope)?;

    let token = TokenTable::global().mint(host);
    let raw = v8::BigInt::new_from_u64(scope, token.get());
    if object.set_private(scope, key, raw.into()) != Some(true) {
        TokenTable::global().release(token);
        return Err(Error::Engine(format!(
            "failed to attach ownership token to {}",
            class.name()
        )));
    }

    let weak = v8::Weak::with_finalizer(
        scope,
        object,
        Box::new(move |_: &mut v8::Isolate| finalize(token, &reclaimed)),
    );
    match scope.get_slot_mut::<BridgeState>() {
        Some(state) => {
            state.live.insert(token, weak);
        }
        None => {
            drop(weak);
            TokenTable::global().release(token);
            return Err(no_bridge());
        }
    }

    initialize(class.name(), token);
    Ok(Object::from_local(object))
}

/// Cached object template for a class, built on first use in this context
fn template_for<'s>(
    scope: &mut v8::HandleScope<'s>,
    class: &ClassDescriptor,
) -> Result<v8::Local<'s, v8::ObjectTemplate>> {
    let cached = scope
        .get_slot::<BridgeState>()
        .ok_or_else(no_bridge)?
        .templates
        .get(&class.type_id())
        .cloned();
    if let Some(template) = cached {
        return Ok(v8::Local::new(scope, &template));
    }

    let template = v8::ObjectTemplate::new(scope);
    for name in class.exposed_names() {
        let key = new_key(scope, name)?;
        template.set_accessor(key.into(), get_property);
    }
    let global = v8::Global::new(scope, template);
    scope
        .get_slot_mut::<BridgeState>()
        .ok_or_else(no_bridge)?
        .templates
        .insert(class.type_id(), global);
    log::debug!("built object template for {}", class.name());
    Ok(template)
}

fn initialize(class: &str, token: Token) {
    log::trace!("initialized {} object {}", class, token);
}

/// Release the token of a collected object.
///
/// Runs mid-collection: no engine calls are allowed here.
fn finalize(token: Token, reclaimed: &RefCell<Vec<Token>>) {
    if TokenTable::global().release(token).is_none() {
        log::error!("finalizer found no live entry for ownership token {}", token);
        std::process::abort();
    }
    log::trace!("finalized object {}", token);
    reclaimed.borrow_mut().push(token);
}

fn token_key<'s>(scope: &mut v8::HandleScope<'s>) -> Result<v8::Local<'s, v8::Private>> {
    let name = new_key(scope, TOKEN_KEY)?;
    Ok(v8::Private::for_api(scope, Some(name)))
}

pub(crate) fn read_token(scope: &mut v8::HandleScope, object: v8::Local<v8::Object>) -> Option<Token> {
    let key = token_key(scope).ok()?;
    let raw = object.get_private(scope, key)?;
    let raw = v8::Local::<v8::BigInt>::try_from(raw).ok()?;
    match raw.u64_value() {
        (value, true) => Token::from_raw(value),
        _ => None,
    }
}

fn get_property(
    scope: &mut v8::HandleScope,
    key: v8::Local<v8::Name>,
    args: v8::PropertyCallbackArguments,
    mut rv: v8::ReturnValue,
) {
    let name = key.to_rust_string_lossy(scope);
    // The holder carries the token; the receiver may be an object that
    // merely inherits from it
    match read_property(scope, args.holder(), &name) {
        Ok(Some(value)) => rv.set(value),
        Ok(None) => {}
        Err(err) => {
            log::warn!("reading property {:?}: {}", name, err);
            if let Ok(message) = new_string(scope, &err.to_string()) {
                let exception = v8::Exception::type_error(scope, message);
                scope.throw_exception(exception);
            }
        }
    }
}

fn read_property<'s>(
    scope: &mut v8::HandleScope<'s>,
    holder: v8::Local<v8::Object>,
    name: &str,
) -> Result<Option<v8::Local<'s, v8::Value>>> {
    let Some(token) = read_token(scope, holder) else {
        return Ok(None);
    };
    let host = TokenTable::global().get(token).ok_or_else(|| {
        log::error!("property read on object with stale token {}", token);
        Error::StaleToken(token)
    })?;
    let class = ClassRegistry::global().class_for(host.class());
    let Some(field) = class.read(&host, name) else {
        return Ok(None);
    };

    match Value::new(scope, &field) {
        Ok(value) => Ok(Some(value.local())),
        Err(Error::UnsupportedType { found }) => Err(Error::UnsupportedFieldType {
            class: class.name(),
            field: class.declared_name(name).unwrap_or(name).to_string(),
            found,
        }),
        Err(err) => Err(err),
    }
}
