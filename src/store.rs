//! The dependency store: `target → key → Dep`.
//!
//! Entries are created lazily by [`track`] when an effect is running and
//! removed by the Dep itself when its last subscriber leaves. Dropping a
//! raw [`Object`](crate::Object) forgets whatever is left for it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::arena::{DepId, current_effect, dep_arena_insert, track_effect, trigger_effects};
use crate::hash::FastHashMap;
use crate::value::{Key, TargetId};

/// Key under which a Dep is stored for a target.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TrackKey {
    /// A single property.
    Key(Key),
    /// The target's key set (enumeration, list length). Triggered when
    /// keys are added or removed.
    Iterate,
}

impl From<Key> for TrackKey {
    fn from(key: Key) -> Self {
        TrackKey::Key(key)
    }
}

impl From<&Key> for TrackKey {
    fn from(key: &Key) -> Self {
        TrackKey::Key(key.clone())
    }
}

impl From<&str> for TrackKey {
    fn from(name: &str) -> Self {
        TrackKey::Key(name.into())
    }
}

type KeyToDep = FastHashMap<TrackKey, DepId>;

thread_local! {
    static TARGET_MAP: RefCell<FastHashMap<TargetId, KeyToDep>> =
        RefCell::new(FastHashMap::default());
}

/// Record that the current effect read `key` of `target`. No-op outside an
/// effect.
pub fn track(target: TargetId, key: impl Into<TrackKey>) {
    let Some(effect) = current_effect() else {
        return;
    };
    let key = key.into();
    let existing = TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target)
            .and_then(|deps| deps.get(&key))
            .copied()
    });
    let dep = existing.unwrap_or_else(|| create_dep(target, key));
    track_effect(effect, dep);
}

fn create_dep(target: TargetId, key: TrackKey) -> DepId {
    let cleanup_key = key.clone();
    let dep = dep_arena_insert(Some(Box::new(move |dep| {
        remove_entry(target, &cleanup_key, dep)
    })));
    TARGET_MAP.with(|map| {
        map.borrow_mut()
            .entry(target)
            .or_default()
            .insert(key, dep);
    });
    dep
}

fn remove_entry(target: TargetId, key: &TrackKey, dep: DepId) {
    let _ = TARGET_MAP.try_with(|map| {
        let mut map = map.borrow_mut();
        if let Some(deps) = map.get_mut(&target) {
            // The target may have been dropped and its address reused.
            if deps.get(key) != Some(&dep) {
                return;
            }
            deps.remove(key);
            if deps.is_empty() {
                map.remove(&target);
            }
        }
    });
}

/// Notify every effect that read `key` of `target`.
pub fn trigger(target: TargetId, key: impl Into<TrackKey>) {
    let key = key.into();
    let dep = TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target)
            .and_then(|deps| deps.get(&key))
            .copied()
    });
    if let Some(dep) = dep {
        trigger_effects(dep);
    }
}

/// Drop every entry for a target that no longer exists.
pub(crate) fn forget_target(target: TargetId) {
    let _ = TARGET_MAP.try_with(|map| map.borrow_mut().remove(&target));
}

/// Number of keys currently observed on `target`.
pub fn observed_key_count(target: TargetId) -> usize {
    TARGET_MAP.with(|map| map.borrow().get(&target).map_or(0, |deps| deps.len()))
}

/// Shared handle to a lazily created, self-forgetting Dep slot.
///
/// Refs and computeds own one of these instead of a store entry: the Dep
/// is created on the first tracked read and the slot is cleared again when
/// the Dep empties.
#[derive(Clone, Default)]
pub(crate) struct DepSlot(Rc<std::cell::Cell<Option<DepId>>>);

impl DepSlot {
    /// Subscribe the current effect, creating the Dep on first use.
    pub(crate) fn track(&self) {
        let Some(effect) = current_effect() else {
            return;
        };
        let dep = match self.0.get() {
            Some(dep) => dep,
            None => {
                let slot = Rc::downgrade(&self.0);
                let dep = dep_arena_insert(Some(Box::new(move |dep| {
                    if let Some(slot) = slot.upgrade() {
                        if slot.get() == Some(dep) {
                            slot.set(None);
                        }
                    }
                })));
                self.0.set(Some(dep));
                dep
            }
        };
        track_effect(effect, dep);
    }

    /// Notify the Dep's subscribers, if any.
    pub(crate) fn trigger(&self) {
        if let Some(dep) = self.0.get() {
            trigger_effects(dep);
        }
    }

    /// The Dep, if one has been created.
    pub(crate) fn dep(&self) -> Option<DepId> {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::ReactiveEffect;
    use crate::value::Object;

    #[test]
    fn track_outside_effect_creates_nothing() {
        let obj = Object::new();
        track(obj.id(), "a");
        assert_eq!(observed_key_count(obj.id()), 0);
    }

    #[test]
    fn entry_disappears_with_last_subscriber() {
        let obj = Object::new();
        let id = obj.id();
        let effect = ReactiveEffect::new(move || track(id, "a"), None);
        effect.run();
        assert_eq!(observed_key_count(id), 1);

        effect.stop();
        assert_eq!(observed_key_count(id), 0);
    }

    #[test]
    fn dep_slot_clears_when_emptied() {
        let slot = DepSlot::default();
        let tracked = slot.clone();
        let effect = ReactiveEffect::new(move || tracked.track(), None);
        effect.run();
        assert!(slot.dep().is_some());
        effect.stop();
        assert!(slot.dep().is_none());
    }
}
