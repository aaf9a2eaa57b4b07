use std::cell::RefCell;
use std::rc::Rc;

use crate::effect::ReactiveEffect;
use crate::scope::{ScopedEffect, register_in_active_scope};
use crate::store::DepSlot;

/// Lazily evaluated, memoized derived value
///
/// A Computed wraps an effect whose scheduler does not recompute: a change
/// in any dependency only marks the computed dirty and notifies the
/// computed's own subscribers. The getter runs on the next [`get`] that
/// finds it dirty, and subscribers are notified again only if the new value
/// differs from the cached one (requires `T: PartialEq`).
///
/// # Example
/// ```ignore
/// let state = reactive_object(Object::new().with("count", 2));
/// let doubled = Computed::new(move || state.get("count").as_int().unwrap_or(0) * 2);
///
/// // Getter has not run yet
/// let d1 = doubled.get();  // runs now
/// let d2 = doubled.get();  // cached
///
/// state.set("count", 3);   // marks dirty, does not run the getter
/// let d3 = doubled.get();  // recomputes
/// ```
///
/// [`get`]: Computed::get
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    value: Rc<RefCell<Option<T>>>,
    effect: ReactiveEffect<T>,
    dep: DepSlot,
    setter: Option<Box<dyn Fn(T)>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    /// Create a read-only computed. The getter does not run until the first
    /// [`get`](Self::get).
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(move |_| getter(), None)
    }

    /// Create a read-only computed whose getter also receives the value of
    /// the previous evaluation (`None` the first time).
    pub fn with_previous<F>(getter: F) -> Self
    where
        F: Fn(Option<&T>) -> T + 'static,
    {
        Self::build(getter, None)
    }

    /// Create a computed whose [`set`](Self::set) forwards to `setter`.
    pub fn writable<F, S>(getter: F, setter: S) -> Self
    where
        F: Fn() -> T + 'static,
        S: Fn(T) + 'static,
    {
        Self::build(move |_| getter(), Some(Box::new(setter)))
    }

    fn build<F>(getter: F, setter: Option<Box<dyn Fn(T)>>) -> Self
    where
        F: Fn(Option<&T>) -> T + 'static,
    {
        let dep = DepSlot::default();
        let notify = dep.clone();
        let value: Rc<RefCell<Option<T>>> = Rc::default();
        let previous = value.clone();
        let effect = ReactiveEffect::new(
            move || getter(previous.borrow().as_ref()),
            Some(Rc::new(move || notify.trigger())),
        );
        let inner = Rc::new(ComputedInner {
            value,
            effect,
            dep,
            setter,
        });
        register_in_active_scope(inner.clone());
        Self { inner }
    }

    /// Current value, recomputing first if a dependency changed.
    ///
    /// Subscribes the current effect to this computed.
    pub fn get(&self) -> T {
        let inner = &self.inner;
        let cached = if inner.effect.is_dirty() {
            None
        } else {
            inner.value.borrow().clone()
        };
        let value = match cached {
            Some(value) => value,
            None => {
                let fresh = inner.effect.run();
                let changed = inner.value.borrow().as_ref() != Some(&fresh);
                *inner.value.borrow_mut() = Some(fresh.clone());
                if changed {
                    inner.dep.trigger();
                }
                fresh
            }
        };
        inner.dep.track();
        value
    }

    /// Write through the setter. Returns `false` (and logs) for a read-only
    /// computed.
    pub fn set(&self, value: T) -> bool {
        match &self.inner.setter {
            Some(setter) => {
                setter(value);
                true
            }
            None => {
                tracing::warn!("write operation failed: computed value is readonly");
                false
            }
        }
    }

    /// Whether a dependency changed since the last evaluation.
    pub fn is_dirty(&self) -> bool {
        self.inner.effect.is_dirty()
    }

    /// Stop tracking dependencies; the cached value is kept.
    pub fn stop(&self) {
        self.inner.effect.stop();
    }
}

impl<T> ScopedEffect for ComputedInner<T> {
    fn stop(&self) {
        self.effect.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::effect;
    use crate::reactive::reactive_object;
    use crate::refs::Ref;
    use crate::value::{Object, Value};
    use std::cell::Cell;

    #[test]
    fn getter_runs_lazily_and_once() {
        let calls = Rc::new(Cell::new(0));
        let source = Ref::new(2);
        let counter = calls.clone();
        let input = source.clone();
        let doubled = Computed::new(move || {
            counter.set(counter.get() + 1);
            input.get().as_int().unwrap_or(0) * 2
        });
        assert_eq!(calls.get(), 0);

        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(calls.get(), 1);

        source.set(5);
        assert_eq!(calls.get(), 1);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.get(), 10);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn dependent_effect_reruns_through_computed() {
        let state = reactive_object(Object::new().with("n", 1));
        let reader = state.clone();
        let parity = Computed::new(move || reader.get("n").as_int().unwrap_or(0) % 2);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let view = parity.clone();
        let _runner = effect(move || log.borrow_mut().push(view.get()));

        state.set("n", 2);
        state.set("n", 3);
        assert_eq!(*seen.borrow(), vec![1, 0, 1]);
    }

    #[test]
    fn computed_of_computed_stays_consistent() {
        let base = Ref::new(1);
        let input = base.clone();
        let plus_one = Computed::new(move || input.get().as_int().unwrap_or(0) + 1);
        let inner = plus_one.clone();
        let times_ten = Computed::new(move || inner.get() * 10);

        assert_eq!(times_ten.get(), 20);
        base.set(4);
        assert_eq!(times_ten.get(), 50);
    }

    #[test]
    fn getter_sees_the_previous_value() {
        let source = Ref::new(1);
        let input = source.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let running_max = Computed::with_previous(move |previous: Option<&i64>| {
            log.borrow_mut().push(previous.copied());
            let next = input.get().as_int().unwrap_or(0);
            previous.map_or(next, |&prev| prev.max(next))
        });

        assert_eq!(running_max.get(), 1);
        source.set(5);
        assert_eq!(running_max.get(), 5);
        source.set(3);
        assert_eq!(running_max.get(), 5);
        assert_eq!(*seen.borrow(), vec![None, Some(1), Some(5)]);
    }

    #[test]
    fn writable_computed_forwards_set() {
        let base = Ref::new(1);
        let input = base.clone();
        let output = base.clone();
        let mirror = Computed::writable(
            move || input.get(),
            move |value: Value| output.set(value),
        );
        assert!(mirror.set(Value::Int(7)));
        assert_eq!(base.get(), Value::Int(7));
        assert_eq!(mirror.get(), Value::Int(7));

        let readonly = Computed::new(|| 1);
        assert!(!readonly.set(2));
    }
}
