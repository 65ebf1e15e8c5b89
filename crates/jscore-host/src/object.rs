//! Host objects and their field declarations
//!
//! A host type becomes wrappable by implementing [`HostObject`], which
//! lists the fields script code may read. Each field carries a tag with
//! the same grammar as a struct field marker:
//!
//! - `""`: exposed under its declared name
//! - `"-"`: never exposed
//! - anything else: exposed under the first comma-separated component
//!
//! The [`host_object!`](crate::host_object) macro writes the impl for
//! plain structs whose fields convert into [`HostValue`].

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::registry::ClassKey;
use crate::value::HostValue;

/// A host type that can be wrapped into a native object
pub trait HostObject: Any + Send + Sync + Sized {
    /// Declares the fields exposed to script code
    fn fields() -> Fields<Self>;
}

/// Parsed form of a field tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldTag<'a> {
    /// Expose under the declared name
    Default,
    /// Never expose
    Excluded,
    /// Expose under this name
    Rename(&'a str),
}

impl<'a> FieldTag<'a> {
    pub fn parse(tag: &'a str) -> Self {
        if tag == "-" {
            return FieldTag::Excluded;
        }
        match tag.split(',').next() {
            Some(name) if !name.is_empty() => FieldTag::Rename(name),
            _ => FieldTag::Default,
        }
    }

    /// Name the field is exposed under, if any
    pub fn exposed_name(self, declared: &'a str) -> Option<&'a str> {
        match self {
            FieldTag::Default => Some(declared),
            FieldTag::Excluded => None,
            FieldTag::Rename(name) => Some(name),
        }
    }
}

pub(crate) type FieldReader<T> = Box<dyn Fn(&T) -> HostValue + Send + Sync>;

pub(crate) struct FieldDecl<T> {
    pub(crate) declared: &'static str,
    pub(crate) tag: &'static str,
    pub(crate) read: Option<FieldReader<T>>,
}

/// Field declarations for a host type, in declaration order
pub struct Fields<T> {
    pub(crate) decls: Vec<FieldDecl<T>>,
}

impl<T: 'static> Fields<T> {
    pub fn new() -> Self {
        Fields { decls: Vec::new() }
    }

    /// Declare a field with its tag and a reader producing its current value
    pub fn field<F>(mut self, declared: &'static str, tag: &'static str, read: F) -> Self
    where
        F: Fn(&T) -> HostValue + Send + Sync + 'static,
    {
        self.decls.push(FieldDecl {
            declared,
            tag,
            read: Some(Box::new(read)),
        });
        self
    }

    /// Declare a field that is never exposed
    pub fn exclude(mut self, declared: &'static str) -> Self {
        self.decls.push(FieldDecl {
            declared,
            tag: "-",
            read: None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl<T: 'static> Default for Fields<T> {
    fn default() -> Self {
        Fields::new()
    }
}

/// Shared, type-erased reference to a host object.
///
/// Clones share the same object; equality is reference identity.
#[derive(Clone)]
pub struct HostRef {
    object: Arc<dyn Any + Send + Sync>,
    class: ClassKey,
}

impl HostRef {
    pub fn new<T: HostObject>(object: Arc<T>) -> Self {
        HostRef {
            object,
            class: ClassKey::of::<T>(),
        }
    }

    /// Key of the class descriptor for the referenced type
    pub fn class(&self) -> &ClassKey {
        &self.class
    }

    pub fn type_id(&self) -> TypeId {
        self.class.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.class.type_name()
    }

    pub fn is<T: HostObject>(&self) -> bool {
        self.class.type_id() == TypeId::of::<T>()
    }

    pub fn downcast<T: HostObject>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }

    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    pub(crate) fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.object
    }

    pub fn ptr_eq(&self, other: &HostRef) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }

    /// Whether this reference points at exactly `object`
    pub fn same_as<T: HostObject>(&self, object: &Arc<T>) -> bool {
        Arc::as_ptr(&self.object) as *const () == Arc::as_ptr(object) as *const ()
    }

    /// Number of strong references to the object, this one included
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.object)
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for HostRef {}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRef")
            .field("type", &self.class.type_name())
            .field("ptr", &Arc::as_ptr(&self.object))
            .finish()
    }
}

/// Implement [`HostObject`] for a struct from a field list.
///
/// Each entry is `field`, `field: "tag"` or `field: "-"`. Exposed fields
/// are cloned and converted with `HostValue::from`; excluded fields need
/// no conversion.
///
/// ```
/// use jscore_host::host_object;
///
/// struct Account {
///     owner: String,
///     balance: f64,
///     pin: u32,
/// }
///
/// host_object!(Account {
///     owner,
///     balance: "funds",
///     pin: "-",
/// });
/// ```
#[macro_export]
macro_rules! host_object {
    (@fields $acc:expr;) => {
        $acc
    };
    (@fields $acc:expr; $field:ident : "-" $(, $($rest:tt)*)?) => {
        $crate::host_object!(@fields $acc.exclude(stringify!($field)); $($($rest)*)?)
    };
    (@fields $acc:expr; $field:ident : $tag:literal $(, $($rest:tt)*)?) => {
        $crate::host_object!(@fields $acc.field(
            stringify!($field),
            $tag,
            |o: &Self| $crate::HostValue::from(o.$field.clone()),
        ); $($($rest)*)?)
    };
    (@fields $acc:expr; $field:ident $(, $($rest:tt)*)?) => {
        $crate::host_object!(@fields $acc; $field: "" $(, $($rest)*)?)
    };
    ($ty:ty { $($body:tt)* }) => {
        impl $crate::HostObject for $ty {
            fn fields() -> $crate::Fields<Self> {
                $crate::host_object!(@fields $crate::Fields::<$ty>::new(); $($body)*)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: f64,
        y: f64,
        label: String,
        secret: std::sync::Mutex<u8>,
    }

    host_object!(Point {
        x,
        y: "Y",
        label: "name,omitempty",
        secret: "-",
    });

    fn point() -> Arc<Point> {
        Arc::new(Point {
            x: 1.0,
            y: 2.0,
            label: "p".into(),
            secret: std::sync::Mutex::new(0),
        })
    }

    #[test]
    fn test_tag_grammar() {
        assert_eq!(FieldTag::parse(""), FieldTag::Default);
        assert_eq!(FieldTag::parse("-"), FieldTag::Excluded);
        assert_eq!(FieldTag::parse("id"), FieldTag::Rename("id"));
        assert_eq!(FieldTag::parse("id,omitempty"), FieldTag::Rename("id"));
        assert_eq!(FieldTag::parse(",omitempty"), FieldTag::Default);
        // Only a lone dash excludes
        assert_eq!(FieldTag::parse("-,"), FieldTag::Rename("-"));
    }

    #[test]
    fn test_exposed_name() {
        assert_eq!(FieldTag::Default.exposed_name("Name"), Some("Name"));
        assert_eq!(FieldTag::Excluded.exposed_name("Name"), None);
        assert_eq!(FieldTag::Rename("n").exposed_name("Name"), Some("n"));
    }

    #[test]
    fn test_macro_declares_fields_in_order() {
        let fields = Point::fields();
        let decls: Vec<_> = fields.decls.iter().map(|d| (d.declared, d.tag)).collect();
        assert_eq!(
            decls,
            vec![
                ("x", ""),
                ("y", "Y"),
                ("label", "name,omitempty"),
                ("secret", "-"),
            ]
        );
        assert!(fields.decls[3].read.is_none());

        let p = point();
        let read = fields.decls[2].read.as_ref().unwrap();
        assert_eq!(read(p.as_ref()), HostValue::String("p".into()));
        assert_eq!(*p.secret.lock().unwrap(), 0);
    }

    #[test]
    fn test_host_ref_identity() {
        let p = point();
        let a = HostRef::new(p.clone());
        let b = HostRef::new(p.clone());
        let other = HostRef::new(point());

        assert_eq!(a, b);
        assert_ne!(a, other);
        assert!(a.same_as(&p));
        assert!(!other.same_as(&p));
        assert!(a.is::<Point>());
        assert_eq!(a.type_id(), TypeId::of::<Point>());

        let back = a.downcast::<Point>().unwrap();
        assert!(Arc::ptr_eq(&back, &p));
        assert_eq!(a.downcast_ref::<Point>().map(|p| p.y), Some(2.0));
        assert_eq!(a.strong_count(), 4);
    }
}
