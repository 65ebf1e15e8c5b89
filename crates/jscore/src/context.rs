//! Global execution contexts and script entry points

use std::cell::RefCell;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU64, Ordering};

use deno_core::{v8, JsRuntime, RuntimeOptions};

use crate::class;
use crate::config::ContextConfig;
use crate::error::Result;
use crate::object::Object;
use crate::string::new_string;
use crate::value::{catch, Value};

/// One engine execution environment with its own global object.
///
/// Operations run through a handle scope from [`GlobalContext::scope`];
/// handles cannot outlive the scope, and so cannot outlive the context.
/// Dropping the context (or calling [`GlobalContext::release`]) releases
/// the ownership tokens of every host object still wrapped in it.
///
/// A context is bound to the thread that created it. Handles from one
/// context must not be passed to another.
///
/// Contexts on one thread may be released in any order. The engine
/// requires its isolates to be torn down last-created first, so a context
/// released while a newer one is still alive releases its host objects
/// at once but keeps its isolate until every newer context is gone.
pub struct GlobalContext {
    id: u64,
    runtime: ManuallyDrop<JsRuntime>,
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

struct Entry {
    id: u64,
    retired: Option<JsRuntime>,
}

/// Contexts of this thread in creation order
struct ContextStack(Vec<Entry>);

impl ContextStack {
    fn push(&mut self, id: u64) {
        self.0.push(Entry { id, retired: None });
    }

    /// Park a released runtime, then hand back every runtime that can now
    /// be dropped, newest first
    fn retire(&mut self, id: u64, runtime: JsRuntime) -> Vec<JsRuntime> {
        match self.0.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.retired = Some(runtime),
            None => return vec![runtime],
        }
        let mut finished = Vec::new();
        while self.0.last().is_some_and(|entry| entry.retired.is_some()) {
            if let Some(entry) = self.0.pop() {
                finished.extend(entry.retired);
            }
        }
        finished
    }

    fn parked(&self) -> usize {
        self.0.iter().filter(|entry| entry.retired.is_some()).count()
    }
}

impl Drop for ContextStack {
    fn drop(&mut self) {
        while let Some(entry) = self.0.pop() {
            drop(entry.retired);
        }
    }
}

thread_local! {
    static CONTEXTS: RefCell<ContextStack> = const { RefCell::new(ContextStack(Vec::new())) };
}

impl GlobalContext {
    pub fn new() -> Self {
        Self::build(&ContextConfig::default())
    }

    pub fn with_config(config: &ContextConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &ContextConfig) -> Self {
        let mut runtime = JsRuntime::new(RuntimeOptions {
            create_params: config.create_params(),
            ..Default::default()
        });
        class::install(runtime.v8_isolate(), config.max_interface_depth);
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        CONTEXTS.with(|stack| stack.borrow_mut().push(id));
        log::debug!(
            "created global context {} (max heap {:?}, max interface depth {})",
            id,
            config.max_heap_size,
            config.max_interface_depth
        );
        GlobalContext {
            id,
            runtime: ManuallyDrop::new(runtime),
        }
    }

    /// Open a handle scope in the context
    pub fn scope(&mut self) -> v8::HandleScope<'_> {
        self.runtime.handle_scope()
    }

    pub(crate) fn isolate(&mut self) -> &mut v8::Isolate {
        self.runtime.v8_isolate()
    }

    /// Force a full collection and run the finalizers it makes pending
    pub fn collect_garbage(&mut self) {
        let isolate = self.runtime.v8_isolate();
        isolate.low_memory_notification();
        let platform = v8::V8::get_current_platform();
        while v8::Platform::pump_message_loop(&platform, isolate, false) {}
        class::sweep(isolate);
    }

    /// Number of wrapped host objects the engine has not collected yet
    pub fn live_objects(&mut self) -> usize {
        class::live_objects(self.runtime.v8_isolate())
    }

    pub fn release(self) {}
}

impl Default for GlobalContext {
    fn default() -> Self {
        GlobalContext::new()
    }
}

impl Drop for GlobalContext {
    fn drop(&mut self) {
        let released = class::dispose(self.runtime.v8_isolate());
        log::debug!(
            "released global context {} ({} host object(s) still wrapped)",
            self.id,
            released
        );
        // SAFETY: `runtime` is never touched again after this
        let runtime = unsafe { ManuallyDrop::take(&mut self.runtime) };
        let id = self.id;
        // During thread teardown the stack may already be gone; the closure
        // then drops the runtime on its own
        let finished = CONTEXTS
            .try_with(move |stack| stack.borrow_mut().retire(id, runtime))
            .unwrap_or_default();
        if finished.is_empty() {
            log::debug!("context {} keeps its isolate until newer contexts are released", id);
        }
        // Newest first, as the engine requires
        drop(finished);
    }
}

/// Released contexts whose isolate waits for a newer context to go
#[cfg(test)]
fn parked_contexts() -> usize {
    CONTEXTS.with(|stack| stack.borrow().parked())
}

/// The context's global object. Every call returns the same object.
pub fn global_object<'s>(scope: &mut v8::HandleScope<'s>) -> Object<'s> {
    let context = scope.get_current_context();
    Object::from_local(context.global(scope))
}

/// Whether `source` parses as a script. Nothing is executed.
pub fn check_script_syntax(scope: &mut v8::HandleScope, source: &str) -> bool {
    validate_script(scope, source).is_ok()
}

/// Parse `source` without executing it, reporting the syntax error if any
pub fn validate_script(scope: &mut v8::HandleScope, source: &str) -> Result<()> {
    let code = new_string(scope, source)?;
    catch(scope, |tc| v8::Script::compile(tc, code, None)).map(|_| ())
}

/// Run `source` in the global scope and return its completion value.
///
/// An uncaught exception fails with `Error::Script` carrying the thrown
/// value.
pub fn evaluate_script<'s>(scope: &mut v8::HandleScope<'s>, source: &str) -> Result<Value<'s>> {
    let code = new_string(scope, source)?;
    log::debug!("evaluating script ({} bytes)", source.len());
    catch(scope, |tc| {
        let script = v8::Script::compile(tc, code, None)?;
        script.run(tc)
    })
    .map(Value::from_local)
}
