// Arena-based storage for the dependency graph
//
// Two thread-local slabs:
// - Effect arena: EffectMetadata (deps list, run generation, dirty level, scheduler)
// - Dep arena: DepMetadata (subscriber -> run generation, cleanup callback)
//
// EffectId and DepId are lightweight newtypes that index into the slabs.

// effect_arena first: dep_arena depends on EffectId
pub mod effect_arena;
pub mod dep_arena;

pub use effect_arena::{
    CurrentEffectGuard, DirtyLevel, EffectId, EffectMetadata, Scheduler, current_effect,
    effect_arena_insert, effect_arena_remove, effect_count, track_effect,
};

pub use dep_arena::{
    DepCleanup, DepId, dep_arena_insert, dep_arena_remove, dep_subscriber_count, trigger_effects,
};
