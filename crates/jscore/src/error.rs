//! Error types for the engine binding

use std::fmt;

use deno_core::v8;
use jscore_host::Token;
use thiserror::Error;

use crate::types::JsType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors of the binding.
///
/// Not `Send` or `Sync`: the `Script` variant holds an engine handle.
/// Use [`ScriptException::into_message`] or the `Display` output to move
/// a failure off the context's thread.
#[derive(Debug, Error)]
pub enum Error {
    /// Only host objects (shared references to a `HostObject`) can be wrapped
    #[error("only host objects can be wrapped into native objects, got {found}")]
    InvalidWrapTarget { found: &'static str },

    #[error("can't create JS value from {found}")]
    UnsupportedType { found: String },

    #[error("field {class}.{field} holds {found}, which has no JS representation")]
    UnsupportedFieldType {
        class: &'static str,
        field: String,
        found: String,
    },

    /// The engine reported a value kind outside the seven known ones
    #[error("unknown JS type: {0}")]
    UnknownKind(String),

    #[error("JS value is a symbol")]
    SymbolNotRepresentable,

    #[error("expected an object, got {found}")]
    NotAnObject { found: JsType },

    #[error(transparent)]
    Script(#[from] ScriptException),

    #[error("object graph contains a cycle")]
    CircularReference,

    #[error("object graph nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("ownership token {0} is no longer live")]
    StaleToken(Token),

    #[error("string of {len} bytes exceeds the engine's maximum string length")]
    StringTooLong { len: usize },

    #[error("engine error: {0}")]
    Engine(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// A value thrown by script code and not caught inside the engine.
///
/// Keeps the thrown value alive so host code can inspect it in any later
/// scope of the same context. The handle ties it to that context's
/// thread, so the type is neither `Send` nor `Sync`.
pub struct ScriptException {
    message: String,
    exception: v8::Global<v8::Value>,
}

impl ScriptException {
    pub(crate) fn new(message: String, exception: v8::Global<v8::Value>) -> Self {
        ScriptException { message, exception }
    }

    /// Rendered message, e.g. `"ReferenceError: x is not defined"`
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Drop the thrown value and keep the message, which can cross threads
    pub fn into_message(self) -> String {
        self.message
    }

    /// The thrown value
    pub fn exception<'s>(&self, scope: &mut v8::HandleScope<'s>) -> crate::Value<'s> {
        crate::Value::from_local(v8::Local::new(scope, &self.exception))
    }
}

impl fmt::Debug for ScriptException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptException")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ScriptException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uncaught exception: {}", self.message)
    }
}

impl std::error::Error for ScriptException {}
