//! Class registry
//!
//! Every wrappable host type gets one [`ClassDescriptor`]: the table from
//! exposed property name to field reader that the engine's property-get
//! callback consults. Descriptors are built lazily on the first wrap of a
//! type and then cached for the life of the process. They are never
//! invalidated or rebuilt, since a host type's field list cannot change
//! at runtime.
//!
//! The registry is a concurrent map keyed by `TypeId`. Registration uses
//! the map's entry API, so when several threads wrap a new type at the
//! same time exactly one descriptor is built and all of them observe it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::object::{FieldTag, HostObject, HostRef};
use crate::value::HostValue;

/// Identity of a host type plus the recipe for its descriptor
#[derive(Clone, Copy)]
pub struct ClassKey {
    type_id: TypeId,
    type_name: &'static str,
    build: fn() -> ClassDescriptor,
}

impl ClassKey {
    pub fn of<T: HostObject>() -> Self {
        ClassKey {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            build: ClassDescriptor::build::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassKey").field(&self.type_name).finish()
    }
}

type ErasedReader = Box<dyn Fn(&(dyn Any + Send + Sync)) -> Option<HostValue> + Send + Sync>;

struct Slot {
    declared: &'static str,
    read: ErasedReader,
}

/// Per-type table of exposed property names
pub struct ClassDescriptor {
    type_id: TypeId,
    name: &'static str,
    /// Exposed names in declaration order
    exposed: Vec<String>,
    index: HashMap<String, usize>,
    slots: Vec<Slot>,
}

impl ClassDescriptor {
    /// Scan the declared fields of `T` once
    pub fn build<T: HostObject>() -> Self {
        let mut descriptor = ClassDescriptor {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            exposed: Vec::new(),
            index: HashMap::new(),
            slots: Vec::new(),
        };

        for decl in T::fields().decls {
            let Some(name) = FieldTag::parse(decl.tag).exposed_name(decl.declared) else {
                continue;
            };
            let Some(read) = decl.read else {
                continue;
            };
            let slot = Slot {
                declared: decl.declared,
                read: Box::new(move |object: &(dyn Any + Send + Sync)| {
                    object.downcast_ref::<T>().map(&read)
                }),
            };

            // A later field exposed under the same name replaces the earlier one
            if let Some(&i) = descriptor.index.get(name) {
                descriptor.slots[i] = slot;
            } else {
                descriptor.index.insert(name.to_string(), descriptor.slots.len());
                descriptor.exposed.push(name.to_string());
                descriptor.slots.push(slot);
            }
        }

        descriptor
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn exposed_names(&self) -> impl Iterator<Item = &str> {
        self.exposed.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.exposed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exposed.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared field behind an exposed name
    pub fn declared_name(&self, name: &str) -> Option<&'static str> {
        self.index.get(name).map(|&i| self.slots[i].declared)
    }

    /// Read the field exposed as `name` from `object`.
    ///
    /// Returns `None` when the name is not exposed or `object` is not an
    /// instance of this class.
    pub fn read(&self, object: &HostRef, name: &str) -> Option<HostValue> {
        if object.type_id() != self.type_id {
            return None;
        }
        let &i = self.index.get(name)?;
        (self.slots[i].read)(object.as_any())
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("exposed", &self.exposed)
            .finish()
    }
}

/// Concurrent cache of class descriptors
pub struct ClassRegistry {
    classes: DashMap<TypeId, Arc<ClassDescriptor>>,
    registrations: AtomicUsize,
}

static CLASSES: Lazy<ClassRegistry> = Lazy::new(ClassRegistry::new);

impl ClassRegistry {
    pub fn new() -> Self {
        ClassRegistry {
            classes: DashMap::new(),
            registrations: AtomicUsize::new(0),
        }
    }

    /// The process-wide registry, created on first use and never torn down
    pub fn global() -> &'static ClassRegistry {
        &CLASSES
    }

    /// Descriptor for the keyed type, building it if this is the first request
    pub fn class_for(&self, key: &ClassKey) -> Arc<ClassDescriptor> {
        if let Some(class) = self.classes.get(&key.type_id) {
            return Arc::clone(class.value());
        }

        self.classes
            .entry(key.type_id)
            .or_insert_with(|| {
                self.registrations.fetch_add(1, Ordering::SeqCst);
                let class = (key.build)();
                log::debug!(
                    "registered host class {} with {} exposed field(s)",
                    class.name,
                    class.len()
                );
                Arc::new(class)
            })
            .value()
            .clone()
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(&type_id).map(|class| Arc::clone(class.value()))
    }

    /// Number of descriptors built since creation or the last `clear`
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Drop every cached descriptor. Meant for test harnesses only.
    pub fn clear(&self) {
        self.classes.clear();
        self.registrations.store(0, Ordering::SeqCst);
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        ClassRegistry::new()
    }
}
