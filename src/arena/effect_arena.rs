// Effect arena - bookkeeping for every reactive effect on this thread
//
// Each slot holds the state the dependency graph needs about one effect:
// - deps: the Deps it read during its latest run, in read order
// - deps_length: how many entries of `deps` are valid for the run in progress
// - track_id: run generation, bumped at the start of every run
// - running: re-entrancy counter; triggers never schedule a running effect
// - dirty: leveled dirty flag (NotDirty / Dirty)
// - scheduler: what a trigger calls instead of re-running directly
//
// The effect function itself lives in `ReactiveEffect`, not here, so a run
// never holds an arena borrow while user code executes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use slab::Slab;

use super::dep_arena::{DepId, cleanup_dep_effect};

thread_local! {
    static EFFECT_ARENA: RefCell<Slab<EffectMetadata>> = const { RefCell::new(Slab::new()) };
    static CURRENT_EFFECT: Cell<Option<EffectId>> = const { Cell::new(None) };
}

/// Leveled dirty flag.
///
/// Only two levels are meaningful today; the numeric gap leaves room for
/// "maybe dirty" levels between them.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DirtyLevel {
    /// Cached results are current.
    NotDirty = 0,
    /// A dependency changed since the last run.
    Dirty = 4,
}

impl DirtyLevel {
    /// Convert from u8 to DirtyLevel
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => DirtyLevel::NotDirty,
            _ => DirtyLevel::Dirty,
        }
    }
}

/// Scheduler invoked by a trigger in place of re-running the effect.
pub type Scheduler = Rc<dyn Fn()>;

/// Metadata stored in the arena for one effect.
pub struct EffectMetadata {
    pub(crate) deps: Vec<DepId>,
    pub(crate) deps_length: usize,
    pub(crate) track_id: u64,
    pub(crate) running: u32,
    pub(crate) dirty: DirtyLevel,
    pub(crate) active: bool,
    pub(crate) scheduler: Option<Scheduler>,
}

impl EffectMetadata {
    /// Fresh metadata: active, dirty, no deps yet.
    pub fn new(scheduler: Option<Scheduler>) -> Self {
        Self {
            deps: Vec::new(),
            deps_length: 0,
            track_id: 0,
            running: 0,
            dirty: DirtyLevel::Dirty,
            active: true,
            scheduler,
        }
    }
}

/// Get the currently executing effect (if any)
pub fn current_effect() -> Option<EffectId> {
    CURRENT_EFFECT.with(Cell::get)
}

/// Set the currently executing effect, returning the previous one
pub fn set_current_effect(effect_id: Option<EffectId>) -> Option<EffectId> {
    CURRENT_EFFECT.with(|c| c.replace(effect_id))
}

/// RAII guard that restores CURRENT_EFFECT when dropped.
/// This ensures CURRENT_EFFECT is always restored even if the effect panics.
pub struct CurrentEffectGuard {
    previous: Option<EffectId>,
}

impl CurrentEffectGuard {
    /// Sets CURRENT_EFFECT to `new_value` until the guard drops.
    pub fn new(new_value: Option<EffectId>) -> Self {
        let previous = set_current_effect(new_value);
        Self { previous }
    }
}

impl Drop for CurrentEffectGuard {
    fn drop(&mut self) {
        set_current_effect(self.previous);
    }
}

/// Unique identifier for an effect in the arena.
///
/// This is a zero-cost wrapper around a slab index. When a `ReactiveEffect`
/// is dropped it removes itself from the arena, making this id stale.
/// Accessing a stale id returns `None`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EffectId(u32);

impl EffectId {
    /// Create a new EffectId from a raw index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Convert to usize for slab indexing
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Access the effect metadata with a closure (read-only)
    ///
    /// Returns None if the effect has been removed (stale access).
    pub fn with<F, R>(self, f: F) -> Option<R>
    where
        F: FnOnce(&EffectMetadata) -> R,
    {
        EFFECT_ARENA
            .try_with(|arena| arena.borrow().get(self.index()).map(f))
            .ok()
            .flatten()
    }

    /// Access the effect metadata mutably. The closure must not touch the
    /// arena again.
    pub fn with_mut<F, R>(self, f: F) -> Option<R>
    where
        F: FnOnce(&mut EffectMetadata) -> R,
    {
        EFFECT_ARENA
            .try_with(|arena| arena.borrow_mut().get_mut(self.index()).map(f))
            .ok()
            .flatten()
    }

    /// Run generation of the current (or latest) run.
    pub fn track_id(self) -> Option<u64> {
        self.with(|meta| meta.track_id)
    }

    /// Whether the effect is inside its own function right now.
    pub fn is_running(self) -> bool {
        self.with(|meta| meta.running > 0).unwrap_or(false)
    }

    /// Whether the effect still participates in tracking.
    pub fn is_active(self) -> bool {
        self.with(|meta| meta.active).unwrap_or(false)
    }

    /// Current dirty level. Stale ids read as clean.
    pub fn dirty_level(self) -> DirtyLevel {
        self.with(|meta| meta.dirty).unwrap_or(DirtyLevel::NotDirty)
    }

    /// Overwrite the dirty level.
    pub fn set_dirty_level(self, level: DirtyLevel) {
        self.with_mut(|meta| meta.dirty = level);
    }

    /// Raise the dirty level, never lowering it.
    ///
    /// Returns true if the level actually changed.
    pub fn upgrade_dirty_level(self, level: DirtyLevel) -> bool {
        self.with_mut(|meta| {
            if meta.dirty < level {
                meta.dirty = level;
                true
            } else {
                false
            }
        })
        .unwrap_or(false)
    }

    /// Scheduler callback, cloned out so callers can invoke it with no
    /// arena borrow held.
    pub fn scheduler(self) -> Option<Scheduler> {
        self.with(|meta| meta.scheduler.clone()).flatten()
    }

    /// Replace the scheduler.
    pub fn set_scheduler(self, scheduler: Option<Scheduler>) {
        self.with_mut(|meta| meta.scheduler = scheduler);
    }

    /// Deps recorded by the latest run (valid prefix only).
    pub fn deps(self) -> Vec<DepId> {
        self.with(|meta| meta.deps[..meta.deps_length].to_vec())
            .unwrap_or_default()
    }

    /// Start of a run: reset the valid-prefix counter, bump the run
    /// generation, and mark the effect running.
    pub fn begin_run(self) {
        self.with_mut(|meta| {
            meta.dirty = DirtyLevel::NotDirty;
            meta.deps_length = 0;
            meta.track_id += 1;
            meta.running += 1;
        });
    }

    /// End of a run: unmark running and drop deps beyond the valid prefix.
    pub fn end_run(self) {
        self.with_mut(|meta| meta.running = meta.running.saturating_sub(1));
        self.prune_stale_deps();
    }

    /// Unsubscribe from every Dep the effect is no longer reading.
    ///
    /// Deps at positions `>= deps_length` were not re-read during the last
    /// run. They are only unsubscribed when their recorded generation for
    /// this effect is stale, so a Dep that was re-read at an earlier
    /// position keeps the subscription.
    pub fn prune_stale_deps(self) {
        let stale = self
            .with_mut(|meta| {
                let keep = meta.deps_length.min(meta.deps.len());
                meta.deps.split_off(keep)
            })
            .unwrap_or_default();
        if !stale.is_empty() {
            cov_mark::hit!(stale_deps_pruned);
        }
        for dep in stale {
            cleanup_dep_effect(dep, self);
        }
    }

    /// Deactivate: clear every subscription and stop tracking for good.
    pub fn stop(self) {
        let was_active = self
            .with_mut(|meta| {
                let was_active = meta.active;
                meta.active = false;
                meta.deps_length = 0;
                meta.track_id += 1;
                was_active
            })
            .unwrap_or(false);
        if was_active {
            self.prune_stale_deps();
        }
    }
}

/// Record that `effect` read `dep` during its current run.
///
/// Reads of the same Dep within one run are deduplicated by comparing the
/// Dep's recorded generation against the effect's current one. A Dep read
/// at a position previously occupied by a different Dep replaces it; the
/// displaced Dep is cleaned up if this run never re-read it.
pub fn track_effect(effect: EffectId, dep: DepId) {
    let Some(track_id) = effect.track_id() else {
        return;
    };
    if dep.tracked_run(effect) == Some(track_id) {
        cov_mark::hit!(track_deduplicated_within_run);
        return;
    }
    dep.insert_subscriber(effect, track_id);

    let displaced = effect
        .with_mut(|meta| {
            let pos = meta.deps_length;
            meta.deps_length += 1;
            match meta.deps.get(pos).copied() {
                Some(old) if old == dep => None,
                Some(old) => {
                    meta.deps[pos] = dep;
                    Some(old)
                }
                None => {
                    meta.deps.push(dep);
                    None
                }
            }
        })
        .flatten();

    if let Some(old) = displaced {
        cleanup_dep_effect(old, effect);
    }
}

/// Add new effect metadata to the arena
pub fn effect_arena_insert(metadata: EffectMetadata) -> EffectId {
    EFFECT_ARENA.with(|arena| {
        let key = arena.borrow_mut().insert(metadata);
        EffectId::new(key as u32)
    })
}

/// Remove effect metadata from the arena.
///
/// The effect must already be stopped; its Deps are not touched here.
pub fn effect_arena_remove(id: EffectId) -> Option<EffectMetadata> {
    EFFECT_ARENA
        .try_with(|arena| arena.borrow_mut().try_remove(id.index()))
        .ok()
        .flatten()
}

/// Number of live effects on this thread.
pub fn effect_count() -> usize {
    EFFECT_ARENA.with(|arena| arena.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::dep_arena::{dep_arena_insert, dep_subscriber_count};

    #[test]
    fn stale_effect_id_reads_as_none() {
        let id = effect_arena_insert(EffectMetadata::new(None));
        assert!(id.is_active());
        effect_arena_remove(id);
        assert_eq!(id.track_id(), None);
        assert!(!id.is_active());
        assert_eq!(id.dirty_level(), DirtyLevel::NotDirty);
    }

    #[test]
    fn dirty_level_only_upgrades() {
        let id = effect_arena_insert(EffectMetadata::new(None));
        id.set_dirty_level(DirtyLevel::NotDirty);
        assert!(id.upgrade_dirty_level(DirtyLevel::Dirty));
        assert!(!id.upgrade_dirty_level(DirtyLevel::Dirty));
        assert!(!id.upgrade_dirty_level(DirtyLevel::NotDirty));
        assert_eq!(id.dirty_level(), DirtyLevel::Dirty);
        effect_arena_remove(id);
    }

    #[test]
    fn current_effect_guard_restores_previous() {
        let outer = effect_arena_insert(EffectMetadata::new(None));
        let inner = effect_arena_insert(EffectMetadata::new(None));
        {
            let _outer = CurrentEffectGuard::new(Some(outer));
            {
                let _inner = CurrentEffectGuard::new(Some(inner));
                assert_eq!(current_effect(), Some(inner));
            }
            assert_eq!(current_effect(), Some(outer));
        }
        assert_eq!(current_effect(), None);
        effect_arena_remove(outer);
        effect_arena_remove(inner);
    }

    #[test]
    fn reading_same_dep_twice_in_one_run_subscribes_once() {
        cov_mark::check!(track_deduplicated_within_run);
        let effect = effect_arena_insert(EffectMetadata::new(None));
        let dep = dep_arena_insert(None);

        effect.begin_run();
        track_effect(effect, dep);
        track_effect(effect, dep);
        effect.end_run();

        assert_eq!(effect.deps(), vec![dep]);
        assert_eq!(dep_subscriber_count(dep), 1);

        effect.stop();
        effect_arena_remove(effect);
    }

    #[test]
    fn reordered_reads_keep_both_subscriptions() {
        let effect = effect_arena_insert(EffectMetadata::new(None));
        let observer = effect_arena_insert(EffectMetadata::new(None));
        let a = dep_arena_insert(None);
        let b = dep_arena_insert(None);

        // A second subscriber keeps both deps alive across the reorder.
        observer.begin_run();
        track_effect(observer, a);
        track_effect(observer, b);
        observer.end_run();

        effect.begin_run();
        track_effect(effect, a);
        track_effect(effect, b);
        effect.end_run();

        // Second run reads b first: it displaces a at position 0, but a is
        // read again at position 1 and must stay subscribed.
        effect.begin_run();
        track_effect(effect, b);
        track_effect(effect, a);
        effect.end_run();

        assert_eq!(effect.deps(), vec![b, a]);
        assert_eq!(dep_subscriber_count(a), 2);
        assert_eq!(dep_subscriber_count(b), 2);

        effect.stop();
        observer.stop();
        effect_arena_remove(effect);
        effect_arena_remove(observer);
    }

    #[test]
    fn deps_not_reread_are_pruned_after_run() {
        cov_mark::check!(stale_deps_pruned);
        let effect = effect_arena_insert(EffectMetadata::new(None));
        let keep = dep_arena_insert(None);
        let drop_me = dep_arena_insert(None);

        effect.begin_run();
        track_effect(effect, keep);
        track_effect(effect, drop_me);
        effect.end_run();

        effect.begin_run();
        track_effect(effect, keep);
        effect.end_run();

        assert_eq!(effect.deps(), vec![keep]);
        assert_eq!(dep_subscriber_count(keep), 1);
        // An emptied dep destroys itself.
        assert_eq!(dep_subscriber_count(drop_me), 0);

        effect.stop();
        effect_arena_remove(effect);
    }
}
