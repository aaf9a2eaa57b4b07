#![deny(missing_docs)]

//! Fine-grained reactivity and a virtual-node reconciler.
//!
//! The crate has two halves. The reactivity engine tracks which effects
//! read which properties and re-runs exactly those effects when the
//! properties change. The reconciler turns trees of [`VNode`]s into calls
//! on a [`Host`] and keeps them in sync with as few host mutations as it
//! can, using components whose render functions are themselves effects.
//!
//! # Quick Start
//!
//! ```ignore
//! use vireo::{Component, Object, Renderer, SetupResult, flush_jobs, h, reactive};
//!
//! let counter = Component::builder("Counter")
//!     .setup(|_, _| {
//!         let state = reactive(Object::new().with("count", 0).into());
//!         SetupResult::state(state)
//!     })
//!     .render(|this| h("span", None, this.get("count").to_string()))
//!     .build();
//!
//! let renderer = Renderer::new(my_host);
//! renderer.render(Some(h(&counter, None, ())), root);
//!
//! // Writes only queue the component's update job.
//! instance.set("count", 1);
//! flush_jobs();
//! ```
//!
//! # Reactivity
//!
//! - [`reactive`] wraps objects and lists in a tracking proxy ([`Reactive`]).
//!   Nested objects are wrapped lazily on read.
//! - [`Ref`] holds a single value; [`Computed`] caches a derived one.
//! - [`effect`] runs a closure and re-runs it when what it read changes.
//!   [`watch`] and [`watch_effect`] add old/new values and cleanup.
//! - [`EffectScope`] collects effects so they can be stopped together.
//! - [`Transaction::run`] batches writes; queued jobs flush on exit.
//!
//! # Rendering
//!
//! - [`h`], [`text`], [`comment`], [`fragment`], and [`teleport`] build vnodes;
//!   [`open_block`] and [`create_element_block`] opt a subtree into the
//!   dynamic-children fast path.
//! - [`Component::builder`] defines stateful components; [`Component::functional`]
//!   defines render-only ones. Lifecycle hooks ([`on_mounted`] and friends),
//!   [`provide`], and [`inject`] are available during setup.
//! - [`keep_alive`], [`transition`], and [`define_async_component`] are
//!   built-in components.
//! - Component re-renders go through the job queue; call [`flush_jobs`], or
//!   install a flush trigger with [`SchedulerConfig`].

pub(crate) mod arena;
mod async_component;
mod component;
mod computed;
mod effect;
mod error;
mod hash;
pub mod host;
mod keep_alive;
mod lifecycle;
mod provide;
mod reactive;
mod refs;
mod renderer;
mod scheduler;
mod scope;
mod sequence;
mod shape;
mod store;
mod teleport;
#[cfg(any(test, feature = "test-host"))]
pub mod test_host;
mod transaction;
mod transition;
mod value;
mod vnode;
mod watch;

// Reactivity
pub use computed::Computed;
pub use effect::{EffectRunner, ReactiveEffect, effect, effect_with_scheduler, untracked};
pub use reactive::{Reactive, is_reactive, reactive, reactive_object, to_raw, to_reactive};
pub use refs::{
    ProxyRefs, Ref, into_ref, is_ref, proxy_refs, to_ref, to_ref_with_default, to_refs, unref,
};
pub use scope::{EffectScope, ScopedEffect, active_scope};
pub use store::{TrackKey, track, trigger};
pub use transaction::Transaction;
pub use value::{Callback, Key, Object, TargetId, Value, ValueAccess, WriteOutcome};
pub use watch::{OnCleanup, WatchHandle, WatchOptions, WatchSource, traverse, watch, watch_effect};

// Scheduling
pub use scheduler::{
    FlushTrigger, Job, SchedulerConfig, flush_jobs, invalidate_job, is_flush_pending,
    queue_job, queued_job_count,
};

// Rendering
pub use async_component::{
    AsyncComponentOptions, AsyncErrorHandler, AsyncFail, AsyncResolver, AsyncRetry, AsyncTimer,
    define_async_component,
};
pub use component::{
    Component, ComponentBuilder, ComponentInstance, FunctionalFn, PublicInstance, RenderFn,
    SetupContext, SetupFn, SetupResult, current_instance,
};
pub use host::{Host, HostNode};
pub use keep_alive::keep_alive;
pub use lifecycle::{
    LifecycleHook, inject_hook, on_before_mount, on_before_unmount, on_before_update,
    on_mounted, on_unmounted, on_updated,
};
pub use provide::{inject, provide};
pub use renderer::Renderer;
pub use sequence::get_sequence;
pub use shape::{PatchFlags, ShapeFlags};
pub use transition::{
    TransitionClasses, TransitionDone, TransitionHooks, transition, with_transition,
};
pub use vnode::{
    Children, Props, SlotFn, Slots, VNode, VNodeKey, VNodeType, close_block, comment,
    create_element_block, create_vnode, create_vnode_with_flags, fragment, h, is_same_vnode,
    open_block, setup_block, teleport, text,
};

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
