//! Host text <-> engine string conversion

use deno_core::v8;

use crate::error::{Error, Result};

/// Create an engine string from host text
pub fn new_string<'s>(scope: &mut v8::HandleScope<'s>, text: &str) -> Result<v8::Local<'s, v8::String>> {
    v8::String::new(scope, text).ok_or(Error::StringTooLong { len: text.len() })
}

/// Create an internalized string for use as a property key
pub fn new_key<'s>(scope: &mut v8::HandleScope<'s>, name: &str) -> Result<v8::Local<'s, v8::String>> {
    v8::String::new_from_utf8(scope, name.as_bytes(), v8::NewStringType::Internalized)
        .ok_or(Error::StringTooLong { len: name.len() })
}

/// Copy an engine string into host text. Lone surrogates become U+FFFD.
pub fn to_rust_string(scope: &mut v8::HandleScope, string: v8::Local<v8::String>) -> String {
    string.to_rust_string_lossy(scope)
}
