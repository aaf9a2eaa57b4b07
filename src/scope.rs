//! Effect ownership.
//!
//! An [`EffectScope`] collects the effects, watchers, and computeds created
//! while it is active and stops them all at once. Every component instance
//! owns one, so everything created during `setup` dies with the component.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Anything a scope can stop.
pub trait ScopedEffect {
    /// Stop reacting.
    fn stop(&self);
}

thread_local! {
    static ACTIVE_SCOPE: RefCell<Option<EffectScope>> = const { RefCell::new(None) };
}

struct ScopeInner {
    effects: RefCell<Vec<Rc<dyn ScopedEffect>>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    active: Cell<bool>,
}

/// A group of effects stopped together.
#[derive(Clone)]
pub struct EffectScope(Rc<ScopeInner>);

impl Default for EffectScope {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectScope {
    /// Create an empty, active scope.
    pub fn new() -> Self {
        Self(Rc::new(ScopeInner {
            effects: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            active: Cell::new(true),
        }))
    }

    /// Run `f` with this scope active. Effects created inside are owned by
    /// the scope. A stopped scope runs `f` without collecting anything.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        if !self.is_active() {
            return f();
        }
        let _guard = ActiveScopeGuard::new(Some(self.clone()));
        f()
    }

    /// Whether the scope has not been stopped.
    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Number of effects the scope owns.
    pub fn len(&self) -> usize {
        self.0.effects.borrow().len()
    }

    /// Whether the scope owns no effects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take ownership of an effect.
    pub fn adopt(&self, effect: Rc<dyn ScopedEffect>) {
        if self.is_active() {
            self.0.effects.borrow_mut().push(effect);
        } else {
            effect.stop();
        }
    }

    /// Run `f` when the scope stops.
    pub fn on_dispose(&self, f: impl FnOnce() + 'static) {
        self.0.cleanups.borrow_mut().push(Box::new(f));
    }

    /// Stop every owned effect and release them.
    pub fn stop(&self) {
        if !self.0.active.replace(false) {
            return;
        }
        let effects = std::mem::take(&mut *self.0.effects.borrow_mut());
        for effect in &effects {
            effect.stop();
        }
        let cleanups = std::mem::take(&mut *self.0.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }
    }
}

struct ActiveScopeGuard {
    previous: Option<EffectScope>,
}

impl ActiveScopeGuard {
    fn new(scope: Option<EffectScope>) -> Self {
        let previous = ACTIVE_SCOPE.with(|active| active.replace(scope));
        Self { previous }
    }
}

impl Drop for ActiveScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = ACTIVE_SCOPE.try_with(|active| active.replace(previous));
    }
}

/// The scope currently collecting effects, if any.
pub fn active_scope() -> Option<EffectScope> {
    ACTIVE_SCOPE.with(|active| active.borrow().clone())
}

/// Hand `effect` to the active scope, if there is one.
pub(crate) fn register_in_active_scope(effect: Rc<dyn ScopedEffect>) {
    if let Some(scope) = active_scope() {
        scope.adopt(effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::effect;
    use crate::reactive::reactive_object;
    use crate::value::Object;

    #[test]
    fn scope_owns_effects_created_inside() {
        let state = reactive_object(Object::new().with("a", 1));
        let runs = Rc::new(Cell::new(0));
        let scope = EffectScope::new();

        scope.run(|| {
            let counter = runs.clone();
            let reader = state.clone();
            // The handle is dropped right away; the scope keeps the effect alive.
            let _ = effect(move || {
                counter.set(counter.get() + 1);
                reader.get("a");
            });
        });
        assert_eq!(scope.len(), 1);

        state.set("a", 2);
        assert_eq!(runs.get(), 2);

        scope.stop();
        state.set("a", 3);
        assert_eq!(runs.get(), 2);
        assert!(!scope.is_active());
    }

    #[test]
    fn nested_scope_restores_outer() {
        let outer = EffectScope::new();
        let inner = EffectScope::new();
        outer.run(|| {
            inner.run(|| {
                assert!(active_scope().is_some_and(|s| Rc::ptr_eq(&s.0, &inner.0)));
            });
            assert!(active_scope().is_some_and(|s| Rc::ptr_eq(&s.0, &outer.0)));
        });
        assert!(active_scope().is_none());
    }

    #[test]
    fn dispose_callbacks_run_once() {
        let scope = EffectScope::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        scope.on_dispose(move || counter.set(counter.get() + 1));
        scope.stop();
        scope.stop();
        assert_eq!(hits.get(), 1);
    }
}
