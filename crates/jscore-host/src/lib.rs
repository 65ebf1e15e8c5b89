//! Host side of the jscore bridge
//!
//! Everything here is independent of the JavaScript engine:
//! - `HostValue`: host data crossing the bridge in either direction
//! - `HostObject` / `Fields`: which fields of a host type script may read
//! - `ClassRegistry`: per-type descriptors, built once and cached
//! - `TokenTable`: ownership tokens tying native objects to host references

pub mod handle;
pub mod object;
pub mod registry;
pub mod value;

pub use handle::{Token, TokenTable};
pub use object::{FieldTag, Fields, HostObject, HostRef};
pub use registry::{ClassDescriptor, ClassKey, ClassRegistry};
pub use value::{HostValue, Opaque};
