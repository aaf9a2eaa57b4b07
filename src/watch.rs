//! Watchers: run a callback when a source changes.
//!
//! A watcher is one effect whose function is the source getter and whose
//! scheduler is the watcher job. The job re-reads the source, runs the
//! cleanup registered by the previous callback, then calls the callback
//! with the new and previous values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::computed::Computed;
use crate::effect::ReactiveEffect;
use crate::hash::FastHashSet;
use crate::reactive::Reactive;
use crate::refs::Ref;
use crate::scope::register_in_active_scope;
use crate::value::{Object, TargetId, Value};

/// What a watcher observes.
#[derive(Clone)]
pub enum WatchSource {
    /// A ref's value.
    Ref(Ref),
    /// A reactive object, traversed to subscribe to nested properties.
    Reactive(Reactive),
    /// An arbitrary tracked getter.
    Getter(Rc<dyn Fn() -> Value>),
    /// Several sources, read positionally into a list.
    Many(Vec<WatchSource>),
}

impl WatchSource {
    /// Getter source.
    pub fn getter(f: impl Fn() -> Value + 'static) -> Self {
        WatchSource::Getter(Rc::new(f))
    }
}

impl From<Ref> for WatchSource {
    fn from(source: Ref) -> Self {
        WatchSource::Ref(source)
    }
}

impl From<Reactive> for WatchSource {
    fn from(source: Reactive) -> Self {
        WatchSource::Reactive(source)
    }
}

impl From<Computed<Value>> for WatchSource {
    fn from(source: Computed<Value>) -> Self {
        WatchSource::getter(move || source.get())
    }
}

impl From<Vec<WatchSource>> for WatchSource {
    fn from(sources: Vec<WatchSource>) -> Self {
        WatchSource::Many(sources)
    }
}

/// Watcher configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct WatchOptions {
    /// `None` follows the source (reactive objects are deep); `Some(true)`
    /// traverses whatever the getter returns; `Some(false)` limits a
    /// reactive source to one level.
    pub deep: Option<bool>,
    /// Run the callback once right away.
    pub immediate: bool,
}

impl WatchOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `deep` flag.
    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = Some(deep);
        self
    }

    /// Set the `immediate` flag.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

type CleanupFn = Box<dyn FnOnce()>;

/// Registers the cleanup to run before the next callback invocation (or
/// when the watcher stops).
#[derive(Clone, Default)]
pub struct OnCleanup {
    slot: Rc<RefCell<Option<CleanupFn>>>,
}

impl OnCleanup {
    /// Replace the pending cleanup.
    pub fn register(&self, f: impl FnOnce() + 'static) {
        *self.slot.borrow_mut() = Some(Box::new(f));
    }

    fn run_pending(&self) {
        let pending = self.slot.borrow_mut().take();
        if let Some(cleanup) = pending {
            cleanup();
        }
    }
}

impl fmt::Debug for OnCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnCleanup")
            .field("pending", &self.slot.borrow().is_some())
            .finish()
    }
}

/// Disposer returned by [`watch`] and [`watch_effect`].
///
/// Dropping the last handle of a watcher created outside any
/// [`EffectScope`](crate::EffectScope) stops it; inside a scope (e.g. a
/// component's setup) the scope keeps it alive.
#[must_use = "dropping the handle outside an effect scope stops the watcher"]
pub struct WatchHandle {
    effect: Rc<ReactiveEffect<Value>>,
    cleanup: OnCleanup,
}

impl WatchHandle {
    /// Stop the watcher and run its pending cleanup.
    pub fn stop(&self) {
        self.effect.stop();
        self.cleanup.run_pending();
    }

    /// Whether the watcher is still tracking.
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }
}

/// Watch `source`, calling `callback(new, old, on_cleanup)` when it changes.
///
/// Without `immediate` the source is read once up front to establish the
/// baseline, and the callback only runs on later changes.
pub fn watch<F>(source: impl Into<WatchSource>, callback: F, options: WatchOptions) -> WatchHandle
where
    F: Fn(&Value, &Value, &OnCleanup) + 'static,
{
    do_watch(source.into(), Some(Rc::new(callback)), options)
}

/// Run `f` now and again whenever anything it read changes.
pub fn watch_effect(f: impl Fn() + 'static) -> WatchHandle {
    do_watch(
        WatchSource::getter(move || {
            f();
            Value::Null
        }),
        None,
        WatchOptions::default(),
    )
}

type WatchCallback = Rc<dyn Fn(&Value, &Value, &OnCleanup)>;

fn do_watch(source: WatchSource, callback: Option<WatchCallback>, options: WatchOptions) -> WatchHandle {
    let base = build_getter(source, options.deep);
    let getter: Box<dyn Fn() -> Value> = if callback.is_some() && options.deep == Some(true) {
        Box::new(move || traverse(base(), None))
    } else {
        Box::new(move || base())
    };

    let effect = Rc::new(ReactiveEffect::new(getter, None));
    let cleanup = OnCleanup::default();
    let old_value = Rc::new(RefCell::new(Value::Null));
    let has_callback = callback.is_some();

    let weak = Rc::downgrade(&effect);
    let job_cleanup = cleanup.clone();
    let job_old = old_value.clone();
    let job: Rc<dyn Fn()> = Rc::new(move || {
        let Some(effect) = weak.upgrade() else {
            return;
        };
        match &callback {
            Some(callback) => {
                let new_value = effect.run();
                job_cleanup.run_pending();
                let old = job_old.replace(Value::Null);
                callback(&new_value, &old, &job_cleanup);
                *job_old.borrow_mut() = new_value;
            }
            None => {
                effect.run();
            }
        }
    });
    effect.set_scheduler(Some(job.clone()));
    register_in_active_scope(effect.clone());

    if has_callback && options.immediate {
        job();
    } else if has_callback {
        *old_value.borrow_mut() = effect.run();
    } else {
        effect.run();
    }
    WatchHandle { effect, cleanup }
}

fn build_getter(source: WatchSource, deep: Option<bool>) -> Rc<dyn Fn() -> Value> {
    match source {
        WatchSource::Ref(source) => Rc::new(move || source.get()),
        WatchSource::Reactive(source) => reactive_getter(source, deep),
        WatchSource::Getter(getter) => getter,
        WatchSource::Many(sources) => {
            let getters: Vec<_> = sources
                .into_iter()
                .map(|source| build_getter(source, deep))
                .collect();
            Rc::new(move || Value::Object(Object::list(getters.iter().map(|getter| getter()))))
        }
    }
}

fn reactive_getter(source: Reactive, deep: Option<bool>) -> Rc<dyn Fn() -> Value> {
    match deep {
        // Traversed later by the deep wrapper.
        Some(true) => Rc::new(move || Value::Reactive(source.clone())),
        Some(false) => Rc::new(move || traverse(Value::Reactive(source.clone()), Some(1))),
        None => Rc::new(move || traverse(Value::Reactive(source.clone()), None)),
    }
}

/// Read every nested property of `value` (through refs, lists, and
/// objects) so the current effect subscribes to all of them. `depth`
/// limits how many object levels are entered; `None` means unlimited.
/// Returns `value` unchanged.
pub fn traverse(value: Value, depth: Option<usize>) -> Value {
    let mut seen = Visited::default();
    traverse_inner(&value, depth, &mut seen);
    value
}

#[derive(Default)]
struct Visited {
    targets: FastHashSet<TargetId>,
    refs: FastHashSet<usize>,
}

fn traverse_inner(value: &Value, depth: Option<usize>, seen: &mut Visited) {
    if depth == Some(0) {
        return;
    }
    let next_depth = depth.map(|d| d - 1);
    match value {
        Value::Ref(inner) => {
            if seen.refs.insert(inner.addr()) {
                traverse_inner(&inner.get(), next_depth, seen);
            }
        }
        Value::Reactive(reactive) => {
            if !seen.targets.insert(reactive.to_raw().id()) {
                return;
            }
            for key in reactive.keys() {
                traverse_inner(&reactive.get(key), next_depth, seen);
            }
        }
        Value::Object(obj) => {
            if !seen.targets.insert(obj.id()) {
                return;
            }
            for child in obj.values() {
                traverse_inner(&child, next_depth, seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::reactive_object;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<(Value, Value)>>>, impl Fn(&Value, &Value, &OnCleanup)) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        (calls, move |new: &Value, old: &Value, _: &OnCleanup| {
            log.borrow_mut().push((new.clone(), old.clone()))
        })
    }

    #[test]
    fn ref_source_reports_new_and_old() {
        let count = Ref::new(1);
        let (calls, callback) = recorder();
        let _handle = watch(count.clone(), callback, WatchOptions::new());
        assert!(calls.borrow().is_empty());

        count.set(2);
        count.set(3);
        assert_eq!(
            *calls.borrow(),
            vec![
                (Value::Int(2), Value::Int(1)),
                (Value::Int(3), Value::Int(2))
            ]
        );
    }

    #[test]
    fn immediate_runs_callback_with_null_old_value() {
        let count = Ref::new(1);
        let (calls, callback) = recorder();
        let _handle = watch(count, callback, WatchOptions::new().immediate(true));
        assert_eq!(*calls.borrow(), vec![(Value::Int(1), Value::Null)]);
    }

    #[test]
    fn reactive_source_is_deep_by_default() {
        let nested = Object::new().with("leaf", 1);
        let state = reactive_object(Object::new().with("nested", nested));
        let (calls, callback) = recorder();
        let _handle = watch(state.clone(), callback, WatchOptions::new());

        state.get("nested").set("leaf", 2);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn shallow_reactive_source_ignores_nested_writes() {
        let nested = Object::new().with("leaf", 1);
        let state = reactive_object(Object::new().with("nested", nested));
        let (calls, callback) = recorder();
        let _handle = watch(state.clone(), callback, WatchOptions::new().deep(false));

        state.get("nested").set("leaf", 2);
        assert!(calls.borrow().is_empty());
        state.set("nested", 5);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn deep_getter_traverses_returned_object() {
        let state = reactive_object(Object::new().with("inner", Object::new().with("x", 1)));
        let reader = state.clone();
        let (calls, callback) = recorder();
        let _handle = watch(
            WatchSource::getter(move || reader.get("inner")),
            callback,
            WatchOptions::new().deep(true),
        );
        state.get("inner").set("x", 2);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn many_sources_are_read_positionally() {
        let a = Ref::new(1);
        let b = Ref::new("x");
        let (calls, callback) = recorder();
        let _handle = watch(
            vec![WatchSource::from(a.clone()), WatchSource::from(b.clone())],
            callback,
            WatchOptions::new(),
        );
        b.set("y");
        let calls = calls.borrow();
        let (new, old) = &calls[0];
        assert_eq!(new.get(0usize), Value::Int(1));
        assert_eq!(new.get(1usize), Value::from("y"));
        assert_eq!(old.get(1usize), Value::from("x"));
    }

    #[test]
    fn cleanup_runs_before_next_callback_and_on_stop() {
        let count = Ref::new(0);
        let cleanups = Rc::new(Cell::new(0));
        let counter = cleanups.clone();
        let handle = watch(
            count.clone(),
            move |_, _, on_cleanup| {
                let counter = counter.clone();
                on_cleanup.register(move || counter.set(counter.get() + 1));
            },
            WatchOptions::new(),
        );
        count.set(1);
        assert_eq!(cleanups.get(), 0);
        count.set(2);
        assert_eq!(cleanups.get(), 1);
        handle.stop();
        assert_eq!(cleanups.get(), 2);
    }

    #[test]
    fn stopped_watcher_no_longer_fires() {
        let count = Ref::new(0);
        let (calls, callback) = recorder();
        let handle = watch(count.clone(), callback, WatchOptions::new());
        handle.stop();
        assert!(!handle.is_active());
        count.set(1);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn watch_effect_reruns_on_change() {
        let count = Ref::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let reader = count.clone();
        let _handle = watch_effect(move || log.borrow_mut().push(reader.get()));
        count.set(1);
        assert_eq!(*seen.borrow(), vec![Value::Int(0), Value::Int(1)]);
    }

    #[test]
    fn traverse_survives_cycles() {
        let a = Object::new();
        let b = Object::new().with("a", a.clone());
        a.set("b".into(), Value::Object(b));
        let value = Value::Object(a.clone());
        assert_eq!(traverse(value.clone(), None), value);
        // Break the cycle so both objects drop.
        a.delete(&"b".into());
    }
}
