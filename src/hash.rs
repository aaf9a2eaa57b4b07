//! Zero-sized hash builder for the runtime's internal tables.
//!
//! Every map keyed by arena ids, target addresses, or vnode keys uses
//! `FastHashBuilder`: foldhash with a fixed seed, no per-collection state.
//! None of these tables are exposed to untrusted keys, so HashDoS
//! resistance is not a concern.

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;

use foldhash::fast::{FixedState, FoldHasher};
use indexmap::{IndexMap, IndexSet};

/// A zero-sized `BuildHasher` backed by foldhash with a fixed seed.
///
/// # Properties
/// - Zero-sized (`size_of::<FastHashBuilder>()` == 0)
/// - Deterministic (same input = same hash across all instances)
#[derive(Clone, Copy, Debug, Default)]
pub struct FastHashBuilder;

impl BuildHasher for FastHashBuilder {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FixedState::with_seed(0x517cc1b727220a95).build_hasher()
    }
}

/// `HashMap` using [`FastHashBuilder`].
pub type FastHashMap<K, V> = HashMap<K, V, FastHashBuilder>;
/// `HashSet` using [`FastHashBuilder`].
pub type FastHashSet<T> = HashSet<T, FastHashBuilder>;
/// Insertion-ordered map using [`FastHashBuilder`].
pub type FastIndexMap<K, V> = IndexMap<K, V, FastHashBuilder>;
/// Insertion-ordered set using [`FastHashBuilder`].
pub type FastIndexSet<T> = IndexSet<T, FastHashBuilder>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_hash_builder_is_zero_sized() {
        assert_eq!(std::mem::size_of::<FastHashBuilder>(), 0);
    }

    #[test]
    fn ordered_aliases_keep_insertion_order() {
        let mut set = FastIndexSet::default();
        set.insert("c");
        set.insert("a");
        set.insert("b");
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), ["c", "a", "b"]);

        let mut map: FastIndexMap<u32, &str> = FastIndexMap::default();
        map.insert(2, "two");
        map.insert(1, "one");
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [2, 1]);
    }
}
