//! jscore: host object and value bridge for an embedded V8 engine
//!
//! Host code creates a [`GlobalContext`], builds engine values from host
//! data, wraps host objects so scripts can read their fields, evaluates
//! scripts and projects the results back into [`HostValue`]s.
//!
//! ```no_run
//! use std::sync::Arc;
//! use jscore::{evaluate_script, global_object, host_object, GlobalContext, Object};
//!
//! struct Person {
//!     name: String,
//!     age: u32,
//!     password: String,
//! }
//!
//! host_object!(Person {
//!     name,
//!     age: "years",
//!     password: "-",
//! });
//!
//! # fn main() -> jscore::Result<()> {
//! let mut ctx = GlobalContext::new();
//! let scope = &mut ctx.scope();
//!
//! let person = Arc::new(Person { name: "Ada".into(), age: 36, password: "x".into() });
//! let object = Object::wrap(scope, person.clone())?;
//! global_object(scope).set(scope, "person", object.value())?;
//!
//! let greeting = evaluate_script(scope, "`${person.name} is ${person.years}`")?;
//! assert_eq!(greeting.to_rust_string(scope)?, "Ada is 36");
//!
//! let back = object.value().to_host(scope)?;
//! assert!(Arc::ptr_eq(&back.downcast::<Person>().unwrap(), &person));
//! # Ok(())
//! # }
//! ```
//!
//! The engine owns every script value. Host objects handed to it are kept
//! alive by an ownership token until the engine collects the wrapping
//! native object, or until the context is released.

mod class;
mod config;
mod context;
mod error;
mod object;
mod string;
mod types;
mod value;

pub use deno_core::v8;
pub use jscore_host::{
    host_object, ClassDescriptor, ClassKey, ClassRegistry, FieldTag, Fields, HostObject, HostRef,
    HostValue, Opaque, Token, TokenTable,
};

pub use config::{ContextConfig, DEFAULT_MAX_INTERFACE_DEPTH};
pub use context::{check_script_syntax, evaluate_script, global_object, validate_script, GlobalContext};
pub use error::{Error, Result, ScriptException};
pub use object::Object;
pub use string::{new_key, new_string, to_rust_string};
pub use types::JsType;
pub use value::{Protected, Value};
