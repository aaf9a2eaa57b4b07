//! Refs: single observable slots.
//!
//! A value ref owns its contents and a private, lazily created Dep. A
//! property ref (from [`to_ref`] / [`to_refs`]) owns nothing: it reads and
//! writes one property of an object, so tracking happens on the object.
//!
//! [`ProxyRefs`] is the view component setup state is exposed through: it
//! reads through refs transparently and writes into them when the new
//! value is not itself a ref.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::effect::untracked;
use crate::reactive::{Reactive, to_reactive};
use crate::store::DepSlot;
use crate::value::{Key, Object, Value, ValueAccess};

enum RefInner {
    Value {
        raw: RefCell<Value>,
        value: RefCell<Value>,
        dep: DepSlot,
        shallow: bool,
    },
    Property {
        object: Value,
        key: Key,
        default: Value,
    },
}

/// An observable slot.
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

impl Ref {
    /// Deep ref: object contents are stored wrapped as reactive.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_depth(value.into(), false)
    }

    /// Shallow ref: contents are stored as given, and only replacing the
    /// whole value notifies.
    pub fn shallow(value: impl Into<Value>) -> Self {
        Self::with_depth(value.into(), true)
    }

    fn with_depth(raw: Value, shallow: bool) -> Self {
        let value = if shallow {
            raw.clone()
        } else {
            to_reactive(raw.clone())
        };
        Self(Rc::new(RefInner::Value {
            raw: RefCell::new(raw),
            value: RefCell::new(value),
            dep: DepSlot::default(),
            shallow,
        }))
    }

    /// Tracked read.
    pub fn get(&self) -> Value {
        match &*self.0 {
            RefInner::Value { value, dep, .. } => {
                dep.track();
                value.borrow().clone()
            }
            RefInner::Property {
                object,
                key,
                default,
            } => {
                let current = object.get(key.clone());
                if current.is_null() {
                    default.clone()
                } else {
                    current
                }
            }
        }
    }

    /// Untracked read.
    pub fn peek(&self) -> Value {
        untracked(|| self.get())
    }

    /// Write. A value ref skips the write (and the notification) when the
    /// new value is strictly equal to the last one written.
    pub fn set(&self, new_value: impl Into<Value>) {
        let new_value = new_value.into();
        match &*self.0 {
            RefInner::Value {
                raw,
                value,
                dep,
                shallow,
            } => {
                if raw.borrow().strict_eq(&new_value) {
                    return;
                }
                let wrapped = if *shallow {
                    new_value.clone()
                } else {
                    to_reactive(new_value.clone())
                };
                *raw.borrow_mut() = new_value;
                *value.borrow_mut() = wrapped;
                dep.trigger();
            }
            RefInner::Property { object, key, .. } => {
                object.set(key.clone(), new_value);
            }
        }
    }

    /// Notify subscribers without changing the value (for shallow refs
    /// whose contents were mutated in place).
    pub fn trigger(&self) {
        if let RefInner::Value { dep, .. } = &*self.0 {
            dep.trigger();
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&self.peek()).finish()
    }
}

/// Whether `value` is a ref.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// Read through a ref; other values are returned unchanged.
pub fn unref(value: Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other,
    }
}

/// Normalize a value into a ref: a ref is returned as is, anything else
/// becomes the contents of a fresh ref.
pub fn into_ref(value: Value) -> Ref {
    match value {
        Value::Ref(existing) => existing,
        other => Ref::new(other),
    }
}

/// A ref bound to one property of `object`. If the property already holds
/// a ref, that ref is returned.
///
/// A ref or a non-object passed as `object` goes through [`into_ref`]
/// instead and `key` is ignored.
pub fn to_ref(object: &Value, key: impl Into<Key>) -> Ref {
    to_ref_with_default(object, key, Value::Null)
}

/// Like [`to_ref`], reading as `default` while the property is null.
pub fn to_ref_with_default(object: &Value, key: impl Into<Key>, default: Value) -> Ref {
    if !object.is_object() {
        return into_ref(object.clone());
    }
    let key = key.into();
    if let Value::Ref(existing) = untracked(|| object.get(key.clone())) {
        return existing;
    }
    Ref(Rc::new(RefInner::Property {
        object: object.clone(),
        key,
        default,
    }))
}

/// One property ref per own key of `object`, in a fresh raw object (a list
/// for list-shaped inputs).
pub fn to_refs(object: &Value) -> Object {
    let Some(raw) = object.as_object() else {
        return Object::new();
    };
    if raw.is_list() {
        Object::list(
            raw.keys()
                .into_iter()
                .map(|key| Value::Ref(to_ref(object, key))),
        )
    } else {
        let refs = Object::new();
        for key in raw.keys() {
            refs.set(key.clone(), Value::Ref(to_ref(object, key)));
        }
        refs
    }
}

/// Ref-unwrapping view over an object.
///
/// Built by [`proxy_refs`]. A reactive input is kept as is: reads and
/// writes go straight to the wrapper.
#[derive(Clone, Debug)]
pub enum ProxyRefs {
    /// Unwrapping view over a raw object.
    Unwrap(Object),
    /// Reactive input, passed through unchanged.
    Reactive(Reactive),
}

/// Build the ref-unwrapping view of `value`. Non-objects yield an empty view.
pub fn proxy_refs(value: Value) -> ProxyRefs {
    match value {
        Value::Reactive(reactive) => ProxyRefs::Reactive(reactive),
        Value::Object(obj) => ProxyRefs::Unwrap(obj),
        _ => ProxyRefs::Unwrap(Object::new()),
    }
}

impl ProxyRefs {
    /// Read, unwrapping a ref stored under `key`.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        match self {
            ProxyRefs::Unwrap(obj) => unref(obj.get(&key).unwrap_or_default()),
            ProxyRefs::Reactive(reactive) => reactive.get(key),
        }
    }

    /// Write. When the old value is a ref and the new one is not, the
    /// write goes into the ref; otherwise the property is replaced.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        match self {
            ProxyRefs::Unwrap(obj) => {
                if let (Some(Value::Ref(old)), false) = (obj.get(&key), is_ref(&value)) {
                    old.set(value);
                } else {
                    obj.set(key, value);
                }
                true
            }
            ProxyRefs::Reactive(reactive) => reactive.set(key, value),
        }
    }

    /// Whether `key` exists on the underlying object.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match self {
            ProxyRefs::Unwrap(obj) => obj.contains(&key),
            ProxyRefs::Reactive(reactive) => reactive.to_raw().contains(&key),
        }
    }
}

impl ValueAccess for ProxyRefs {
    fn get_key(&self, key: &Key) -> Value {
        self.get(key.clone())
    }

    fn set_key(&self, key: &Key, value: Value) -> bool {
        self.set(key.clone(), value)
    }

    fn has_key(&self, key: &Key) -> bool {
        self.has(key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::effect;
    use crate::reactive::{is_reactive, reactive_object};
    use std::cell::Cell;

    #[test]
    fn ref_write_of_equal_value_is_skipped() {
        let count = Ref::new(1);
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let reader = count.clone();
        let _runner = effect(move || {
            counter.set(counter.get() + 1);
            reader.get();
        });
        count.set(1);
        assert_eq!(runs.get(), 1);
        count.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn deep_ref_wraps_objects_and_shallow_does_not() {
        let deep = Ref::new(Object::new());
        assert!(is_reactive(&deep.get()));
        let shallow = Ref::shallow(Object::new());
        assert!(!is_reactive(&shallow.get()));
    }

    #[test]
    fn property_ref_reads_and_writes_through() {
        let state = Value::Reactive(reactive_object(Object::new().with("a", 1)));
        let a = to_ref(&state, "a");
        assert_eq!(a.get(), Value::Int(1));
        a.set(5);
        assert_eq!(state.get("a"), Value::Int(5));
    }

    #[test]
    fn to_ref_normalizes_refs_and_primitives() {
        let count = Ref::new(1);
        let same = to_ref(&Value::Ref(count.clone()), "ignored");
        same.set(4);
        assert_eq!(count.get(), Value::Int(4));
        assert!(into_ref(Value::Ref(count.clone())).ptr_eq(&count));

        let fresh = to_ref(&Value::Int(7), "ignored");
        assert_eq!(fresh.get(), Value::Int(7));
        fresh.set(8);
        assert_eq!(fresh.get(), Value::Int(8));
        assert_eq!(into_ref(Value::from("s")).get(), Value::from("s"));
    }

    #[test]
    fn to_refs_covers_every_key() {
        let state = Value::Reactive(reactive_object(Object::new().with("a", 1).with("b", 2)));
        let refs = to_refs(&state);
        assert_eq!(refs.len(), 2);
        let b = refs.get(&"b".into()).unwrap_or_default();
        let Value::Ref(b) = b else {
            panic!("expected a ref");
        };
        state.set("b", 3);
        assert_eq!(b.get(), Value::Int(3));
    }

    #[test]
    fn proxy_refs_unwraps_and_writes_into_refs() {
        let count = Ref::new(1);
        let view = proxy_refs(Value::Object(
            Object::new().with("count", count.clone()).with("plain", 1),
        ));
        assert_eq!(view.get("count"), Value::Int(1));

        view.set("count", 2);
        assert_eq!(count.get(), Value::Int(2));

        let replacement = Ref::new(9);
        view.set("count", replacement.clone());
        assert_eq!(view.get("count"), Value::Int(9));
        assert_eq!(count.get(), Value::Int(2));
    }

    #[test]
    fn proxy_refs_passes_reactive_through() {
        let state = reactive_object(Object::new());
        match proxy_refs(Value::Reactive(state.clone())) {
            ProxyRefs::Reactive(same) => assert!(same.ptr_eq(&state)),
            ProxyRefs::Unwrap(_) => panic!("reactive input must pass through"),
        }
    }
}
