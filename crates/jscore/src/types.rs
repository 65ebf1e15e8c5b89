//! Dynamic type classification of engine values

use std::fmt;

use deno_core::v8;

/// One of the seven value kinds script code can observe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JsType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    Symbol,
    /// A numeric kind code outside the known range
    Unknown(i32),
}

impl JsType {
    /// Decode a numeric kind code (0 = undefined ... 6 = symbol)
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => JsType::Undefined,
            1 => JsType::Null,
            2 => JsType::Boolean,
            3 => JsType::Number,
            4 => JsType::String,
            5 => JsType::Object,
            6 => JsType::Symbol,
            n => JsType::Unknown(n),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            JsType::Undefined => 0,
            JsType::Null => 1,
            JsType::Boolean => 2,
            JsType::Number => 3,
            JsType::String => 4,
            JsType::Object => 5,
            JsType::Symbol => 6,
            JsType::Unknown(n) => n,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, JsType::Unknown(_))
    }
}

impl fmt::Display for JsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsType::Undefined => f.write_str("undefined"),
            JsType::Null => f.write_str("null"),
            JsType::Boolean => f.write_str("boolean"),
            JsType::Number => f.write_str("number"),
            JsType::String => f.write_str("string"),
            JsType::Object => f.write_str("object"),
            JsType::Symbol => f.write_str("symbol"),
            JsType::Unknown(n) => write!(f, "unknown JS type: {}", n),
        }
    }
}

/// Classify an engine value.
///
/// Functions count as objects. Returns `None` for kinds with no place in
/// the seven-kind model, such as BigInt.
pub(crate) fn classify(value: v8::Local<v8::Value>) -> Option<JsType> {
    if value.is_undefined() {
        Some(JsType::Undefined)
    } else if value.is_null() {
        Some(JsType::Null)
    } else if value.is_boolean() {
        Some(JsType::Boolean)
    } else if value.is_number() {
        Some(JsType::Number)
    } else if value.is_string() {
        Some(JsType::String)
    } else if value.is_symbol() {
        Some(JsType::Symbol)
    } else if value.is_object() {
        Some(JsType::Object)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        let names: Vec<String> = (0..7).map(|c| JsType::from_code(c).to_string()).collect();
        assert_eq!(
            names,
            vec!["undefined", "null", "boolean", "number", "string", "object", "symbol"]
        );
    }

    #[test]
    fn test_unknown_type_fallback() {
        assert_eq!(JsType::from_code(42), JsType::Unknown(42));
        assert_eq!(JsType::from_code(42).to_string(), "unknown JS type: 42");
        assert_eq!(JsType::Unknown(-1).to_string(), "unknown JS type: -1");
        assert!(!JsType::Unknown(7).is_known());
    }

    #[test]
    fn test_codes() {
        for code in 0..7 {
            let ty = JsType::from_code(code);
            assert!(ty.is_known());
            assert_eq!(ty.code(), code);
        }
    }
}
