//! Reactive wrappers around raw objects.
//!
//! A [`Reactive`] intercepts reads and writes of one [`Object`]: reads
//! subscribe the current effect to `(target, key)`, writes that change a
//! value notify the subscribers. At most one wrapper exists per object, so
//! wrapping twice yields the same handle and identity checks keep working.
//!
//! Nested objects are wrapped lazily, on read.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::hash::FastHashMap;
use crate::store::{TrackKey, track, trigger};
use crate::value::{Key, Object, TargetId, Value, ValueAccess};

/// Property name that reads as `true` on every reactive wrapper without
/// being tracked.
pub const IS_REACTIVE_FLAG: &str = "__v_isReactive";

const LENGTH: &str = "length";

thread_local! {
    static REACTIVE_MAP: RefCell<FastHashMap<TargetId, Weak<ReactiveInner>>> =
        RefCell::new(FastHashMap::default());
}

struct ReactiveInner {
    target: Object,
}

/// Observing wrapper around a raw [`Object`].
#[derive(Clone)]
pub struct Reactive(Rc<ReactiveInner>);

/// Wrap a value: objects get their (cached) wrapper, wrappers are returned
/// unchanged, and everything else passes through as is.
pub fn reactive(value: Value) -> Value {
    match value {
        Value::Object(obj) => Value::Reactive(reactive_object(obj)),
        other => other,
    }
}

/// Wrap an object, reusing the existing wrapper if there is one.
pub fn reactive_object(target: Object) -> Reactive {
    let id = target.id();
    let cached = REACTIVE_MAP.with(|map| map.borrow().get(&id).and_then(Weak::upgrade));
    if let Some(inner) = cached {
        return Reactive(inner);
    }
    let inner = Rc::new(ReactiveInner { target });
    REACTIVE_MAP.with(|map| map.borrow_mut().insert(id, Rc::downgrade(&inner)));
    Reactive(inner)
}

/// Whether `value` is a reactive wrapper.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(_))
}

/// The raw object behind a wrapper; other values are returned unchanged.
pub fn to_raw(value: &Value) -> Value {
    match value {
        Value::Reactive(reactive) => Value::Object(reactive.to_raw()),
        other => other.clone(),
    }
}

/// Object values become reactive; everything else is unchanged.
pub fn to_reactive(value: Value) -> Value {
    reactive(value)
}

pub(crate) fn forget_wrapper(target: TargetId) {
    let _ = REACTIVE_MAP.try_with(|map| map.borrow_mut().remove(&target));
}

impl Reactive {
    /// Tracked read. Object values come back wrapped.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        if key.as_name() == Some(IS_REACTIVE_FLAG) {
            return Value::Bool(true);
        }
        let target = &self.0.target;
        track(target.id(), &key);
        reactive(target.get(&key).unwrap_or_default())
    }

    /// Write through to the target and notify readers of `key` if the
    /// stored value changed. Adding a key also notifies enumerations.
    /// Shrinking a list through `length` notifies readers of every index
    /// that was cut off. Always succeeds.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        let target = &self.0.target;
        let is_length = target.is_list() && key.as_name() == Some(LENGTH);
        let outcome = target.set(key.clone(), value.clone());
        let changed = match &outcome.previous {
            Some(previous) => !previous.strict_eq(&value),
            None => true,
        };
        if is_length {
            let old_len = outcome
                .previous
                .as_ref()
                .and_then(Value::as_int)
                .map_or(0, |n| n.max(0) as usize);
            let new_len = target.len();
            if new_len != old_len {
                trigger(target.id(), LENGTH);
                for index in new_len..old_len {
                    trigger(target.id(), Key::Index(index));
                }
                trigger(target.id(), TrackKey::Iterate);
            }
            return true;
        }
        if changed {
            trigger(target.id(), &key);
        }
        if outcome.added {
            trigger(target.id(), TrackKey::Iterate);
            if target.is_list() {
                trigger(target.id(), LENGTH);
            }
        }
        true
    }

    /// Remove a key, notifying its readers and enumerations.
    pub fn delete(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        let target = &self.0.target;
        let existed = target.contains(&key);
        target.delete(&key);
        if existed {
            trigger(target.id(), &key);
            trigger(target.id(), TrackKey::Iterate);
        }
        existed
    }

    /// Tracked membership test.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        track(self.0.target.id(), &key);
        self.0.target.contains(&key)
    }

    /// Keys in order; subscribes to key additions and removals.
    pub fn keys(&self) -> Vec<Key> {
        track(self.0.target.id(), TrackKey::Iterate);
        self.0.target.keys()
    }

    /// Number of entries; subscribes to key additions and removals.
    pub fn len(&self) -> usize {
        track(self.0.target.id(), TrackKey::Iterate);
        self.0.target.len()
    }

    /// Whether there are no entries (tracked like [`len`](Self::len)).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to a list-shaped target.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let len = self.0.target.len();
        self.set(Key::Index(len), value);
        len + 1
    }

    /// The wrapped object.
    pub fn to_raw(&self) -> Object {
        self.0.target.clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl ValueAccess for Reactive {
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

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive").field(&self.0.target).finish()
    }
}
