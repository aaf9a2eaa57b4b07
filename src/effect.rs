use std::rc::Rc;

use crate::arena::{
    CurrentEffectGuard, DirtyLevel, EffectId, EffectMetadata, Scheduler, effect_arena_insert,
    effect_arena_remove,
};
use crate::scope::{ScopedEffect, register_in_active_scope};

/// Run a closure without tracking dependencies
///
/// Reads inside `f` do not subscribe the surrounding effect.
///
/// # Example
/// ```ignore
/// let runner = effect(move || {
///     let tracked = state.get("a");                  // re-runs when `a` changes
///     let peeked = untracked(|| state.get("b"));     // does not
/// });
/// ```
pub fn untracked<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    // The guard restores the current effect even if f panics
    let _guard = CurrentEffectGuard::new(None);
    f()
}

/// Ends a run when dropped: decrements the running counter and prunes the
/// deps the run did not re-read.
struct RunGuard(EffectId);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.end_run();
    }
}

/// A tracked computation.
///
/// The function runs with this effect as the current effect, so every
/// reactive read inside it subscribes the effect. When a dependency changes
/// the effect is marked dirty and its scheduler (if any) is called; the
/// effect never re-runs by itself.
///
/// Dropping a `ReactiveEffect` stops it and frees its arena slot.
pub struct ReactiveEffect<T> {
    id: EffectId,
    func: Box<dyn Fn() -> T>,
}

impl<T> ReactiveEffect<T> {
    /// Create an effect without running it.
    pub fn new<F>(f: F, scheduler: Option<Scheduler>) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let id = effect_arena_insert(EffectMetadata::new(scheduler));
        Self {
            id,
            func: Box::new(f),
        }
    }

    /// Arena id of this effect.
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Run the function, tracking its reads.
    ///
    /// A stopped effect still runs its function, but records nothing.
    pub fn run(&self) -> T {
        if !self.id.is_active() {
            return (self.func)();
        }
        // Declared in this order so the run ends (pruning stale deps) before
        // the previous current effect is restored.
        let _current = CurrentEffectGuard::new(Some(self.id));
        self.id.begin_run();
        let _run = RunGuard(self.id);
        (self.func)()
    }

    /// Unsubscribe from everything and stop tracking.
    pub fn stop(&self) {
        self.id.stop();
    }

    /// Whether the effect still tracks.
    pub fn is_active(&self) -> bool {
        self.id.is_active()
    }

    /// Whether a dependency changed since the last run.
    pub fn is_dirty(&self) -> bool {
        self.id.dirty_level() != DirtyLevel::NotDirty
    }

    /// Replace the scheduler a trigger calls.
    pub fn set_scheduler(&self, scheduler: Option<Scheduler>) {
        self.id.set_scheduler(scheduler);
    }
}

impl<T> ScopedEffect for ReactiveEffect<T> {
    fn stop(&self) {
        ReactiveEffect::stop(self);
    }
}

impl<T> Drop for ReactiveEffect<T> {
    fn drop(&mut self) {
        self.id.stop();
        effect_arena_remove(self.id);
    }
}

/// Handle returned by [`effect`]: re-run or stop the effect by hand.
///
/// Dropping the last handle stops the effect, unless it was created inside
/// an [`EffectScope`](crate::EffectScope), which then owns it.
#[derive(Clone)]
pub struct EffectRunner {
    effect: Rc<ReactiveEffect<()>>,
}

impl EffectRunner {
    /// Run the effect now.
    pub fn run(&self) {
        self.effect.run();
    }

    /// Stop the effect.
    pub fn stop(&self) {
        self.effect.stop();
    }

    /// Whether the effect still tracks.
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// Arena id of the underlying effect.
    pub fn id(&self) -> EffectId {
        self.effect.id()
    }
}

/// Run `f` now and again whenever anything it read changes.
pub fn effect<F>(f: F) -> EffectRunner
where
    F: Fn() + 'static,
{
    let effect = Rc::new(ReactiveEffect::new(f, None));
    let weak = Rc::downgrade(&effect);
    effect.set_scheduler(Some(Rc::new(move || {
        if let Some(effect) = weak.upgrade() {
            effect.run();
        }
    })));
    finish_effect(effect)
}

/// Like [`effect`], but triggers call `scheduler` instead of re-running.
pub fn effect_with_scheduler<F, S>(f: F, scheduler: S) -> EffectRunner
where
    F: Fn() + 'static,
    S: Fn() + 'static,
{
    let effect = Rc::new(ReactiveEffect::new(f, Some(Rc::new(scheduler))));
    finish_effect(effect)
}

fn finish_effect(effect: Rc<ReactiveEffect<()>>) -> EffectRunner {
    register_in_active_scope(effect.clone());
    effect.run();
    EffectRunner { effect }
}
