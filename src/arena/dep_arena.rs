// Dep arena - subscriber sets for every observed (target, key) and ref
//
// A Dep maps each subscribed effect to the run generation in which the
// effect last read it. Comparing that generation with the effect's current
// one gives O(1) per-run deduplication and tells pruning whether a
// subscription is stale.
//
// A Dep owns an optional cleanup callback. It runs once, when the last
// subscriber leaves and the Dep is destroyed; the dependency store uses it
// to drop its (target, key) entry and refs use it to forget their lazily
// created Dep.

use std::cell::RefCell;

use indexmap::IndexMap;
use slab::Slab;

use super::effect_arena::{DirtyLevel, EffectId};
use crate::hash::FastHashBuilder;

thread_local! {
    static DEP_ARENA: RefCell<Slab<DepMetadata>> = const { RefCell::new(Slab::new()) };
}

/// Callback run when a Dep is destroyed.
pub type DepCleanup = Box<dyn FnOnce(DepId)>;

/// Metadata stored in the arena for one Dep.
pub struct DepMetadata {
    subscribers: IndexMap<EffectId, u64, FastHashBuilder>,
    cleanup: Option<DepCleanup>,
}

/// Unique identifier for a Dep in the arena.
///
/// Like [`EffectId`], a stale id (Dep destroyed) reads as empty.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct DepId(u32);

impl DepId {
    /// Create a new DepId from a raw index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Convert to usize for slab indexing
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Access the Dep metadata with a closure (read-only)
    pub fn with<F, R>(self, f: F) -> Option<R>
    where
        F: FnOnce(&DepMetadata) -> R,
    {
        DEP_ARENA
            .try_with(|arena| arena.borrow().get(self.index()).map(f))
            .ok()
            .flatten()
    }

    fn with_mut<F, R>(self, f: F) -> Option<R>
    where
        F: FnOnce(&mut DepMetadata) -> R,
    {
        DEP_ARENA
            .try_with(|arena| arena.borrow_mut().get_mut(self.index()).map(f))
            .ok()
            .flatten()
    }

    /// Run generation recorded for `effect`, if it is subscribed.
    pub fn tracked_run(self, effect: EffectId) -> Option<u64> {
        self.with(|meta| meta.subscribers.get(&effect).copied())
            .flatten()
    }

    /// Subscribe `effect` (or refresh its generation).
    pub fn insert_subscriber(self, effect: EffectId, track_id: u64) {
        self.with_mut(|meta| {
            meta.subscribers.insert(effect, track_id);
        });
    }

    /// Snapshot of the subscribers in subscription order.
    pub fn subscribers(self) -> Vec<EffectId> {
        self.with(|meta| meta.subscribers.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether the Dep is still alive in the arena.
    pub fn is_alive(self) -> bool {
        self.with(|_| ()).is_some()
    }
}

/// Number of subscribers of `dep`; zero for a destroyed Dep.
pub fn dep_subscriber_count(dep: DepId) -> usize {
    dep.with(|meta| meta.subscribers.len()).unwrap_or(0)
}

/// Create a Dep with an optional destruction callback.
pub fn dep_arena_insert(cleanup: Option<DepCleanup>) -> DepId {
    DEP_ARENA.with(|arena| {
        let key = arena.borrow_mut().insert(DepMetadata {
            subscribers: IndexMap::default(),
            cleanup,
        });
        DepId::new(key as u32)
    })
}

/// Destroy a Dep and run its cleanup callback.
///
/// The arena borrow is released before the callback runs.
pub fn dep_arena_remove(dep: DepId) {
    let cleanup = DEP_ARENA
        .try_with(|arena| arena.borrow_mut().try_remove(dep.index()))
        .ok()
        .flatten()
        .and_then(|meta| meta.cleanup);
    if let Some(cleanup) = cleanup {
        cleanup(dep);
    }
}

/// Unsubscribe `effect` from `dep` unless the effect re-read `dep` during
/// its current run. Destroys the Dep once it has no subscribers left.
pub fn cleanup_dep_effect(dep: DepId, effect: EffectId) {
    let Some(recorded) = dep.tracked_run(effect) else {
        return;
    };
    if Some(recorded) == effect.track_id() {
        return;
    }
    let now_empty = dep
        .with_mut(|meta| {
            meta.subscribers.shift_remove(&effect);
            meta.subscribers.is_empty()
        })
        .unwrap_or(false);
    if now_empty {
        dep_arena_remove(dep);
    }
}

/// Mark every subscriber of `dep` dirty and run its scheduler.
///
/// An effect that is currently running is left alone: it is neither marked
/// dirty nor scheduled, so an effect that writes what it reads does not
/// re-trigger itself.
///
/// Subscribers are snapshotted first; schedulers run with no arena borrow
/// held, so they may freely track, trigger, or create effects.
pub fn trigger_effects(dep: DepId) {
    for effect in dep.subscribers() {
        if effect.is_running() {
            cov_mark::hit!(trigger_skips_running_effect);
            continue;
        }
        effect.upgrade_dirty_level(DirtyLevel::Dirty);
        if let Some(scheduler) = effect.scheduler() {
            scheduler();
        }
    }
}
