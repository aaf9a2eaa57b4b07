//! Lifecycle hooks.
//!
//! Hooks are registered during `setup` against the current instance and
//! run by the renderer around mount, update, and unmount. Each hook runs
//! with its instance current and dependency tracking paused, so reading
//! reactive state in a hook never subscribes the surrounding render.

use std::rc::Rc;

use crate::component::{ComponentInstance, CurrentInstanceGuard, current_instance};
use crate::effect::untracked;

/// Lifecycle stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    /// Before the first render is patched in.
    BeforeMount,
    /// After the first render is in the host tree.
    Mounted,
    /// Before a re-render is patched in.
    BeforeUpdate,
    /// After a re-render is in the host tree.
    Updated,
    /// Before the subtree is torn down.
    BeforeUnmount,
    /// After the subtree is torn down.
    Unmounted,
}

impl LifecycleHook {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        self as usize
    }
}

type Hook = Rc<dyn Fn()>;

/// Registered hooks of one instance, by stage.
#[derive(Default)]
pub(crate) struct Hooks([Vec<Hook>; LifecycleHook::COUNT]);

impl Hooks {
    fn push(&mut self, stage: LifecycleHook, hook: Hook) {
        self.0[stage.index()].push(hook);
    }

    fn get(&self, stage: LifecycleHook) -> Vec<Hook> {
        self.0[stage.index()].clone()
    }
}

/// Register `hook` for `stage` on the current instance. Outside setup
/// there is no instance and the hook is dropped with a warning.
pub fn inject_hook(stage: LifecycleHook, hook: impl Fn() + 'static) {
    match current_instance() {
        Some(instance) => instance.with_hooks(|hooks| hooks.push(stage, Rc::new(hook))),
        None => tracing::warn!(?stage, "lifecycle hook registered outside of component setup"),
    }
}

/// Run every hook registered for `stage`, in registration order.
pub(crate) fn invoke_hooks(instance: &ComponentInstance, stage: LifecycleHook) {
    let hooks = instance.with_hooks(|hooks| hooks.get(stage));
    for hook in hooks {
        let _current = CurrentInstanceGuard::new(Some(instance.clone()));
        untracked(|| hook());
    }
}

/// Run `hook` before the first render is patched in.
pub fn on_before_mount(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::BeforeMount, hook);
}

/// Run `hook` once the component is in the host tree.
pub fn on_mounted(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::Mounted, hook);
}

/// Run `hook` before each re-render is patched in.
pub fn on_before_update(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::BeforeUpdate, hook);
}

/// Run `hook` after each re-render.
pub fn on_updated(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::Updated, hook);
}

/// Run `hook` before the component is torn down.
pub fn on_before_unmount(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::BeforeUnmount, hook);
}

/// Run `hook` after the component is torn down.
pub fn on_unmounted(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::Unmounted, hook);
}
