//! Keep-alive: caches component subtrees instead of destroying them.
//!
//! The component renders its default slot. Every component child it
//! renders is flagged so that unmounting it only moves its host nodes into
//! a detached storage element, and rendering it again later moves them
//! back and reuses the instance without running `setup` again.
//!
//! Entries are keyed by the child's vnode key, or by its component when it
//! has none, and evicted least recently used first once the cache holds
//! more than the `max` prop allows.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::component::{Component, ComponentInstance, SetupResult, WeakInstance, current_instance};
use crate::hash::{FastHashMap, FastIndexSet};
use crate::host::HostNode;
use crate::lifecycle::{on_before_unmount, on_mounted, on_updated};
use crate::reactive::Reactive;
use crate::shape::ShapeFlags;
use crate::vnode::{VNode, VNodeKey, VNodeType, comment, is_same_vnode};

/// Hooks the renderer uses on children of a keep-alive.
#[derive(Clone)]
pub(crate) struct KeepAliveContext {
    /// Move a cached child back into the tree and patch it with `vnode`.
    pub(crate) activate: Rc<dyn Fn(&VNode, HostNode, Option<HostNode>)>,
    /// Move a child out of the tree into storage.
    pub(crate) deactivate: Rc<dyn Fn(&VNode)>,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum CacheKey {
    Key(VNodeKey),
    Component(usize),
}

impl CacheKey {
    fn of(vnode: &VNode) -> Self {
        match (vnode.key(), vnode.kind()) {
            (Some(key), _) => CacheKey::Key(key.clone()),
            (None, VNodeType::Component(component)) => CacheKey::Component(component.addr()),
            (None, _) => CacheKey::Component(0),
        }
    }
}

#[derive(Default)]
struct Cache {
    entries: RefCell<FastHashMap<CacheKey, VNode>>,
    // Recency order, oldest first.
    keys: RefCell<FastIndexSet<CacheKey>>,
    pending: RefCell<Option<CacheKey>>,
}

impl Cache {
    fn touch(&self, key: &CacheKey) {
        let mut keys = self.keys.borrow_mut();
        keys.shift_remove(key);
        keys.insert(key.clone());
    }

    fn store_pending(&self, instance: &ComponentInstance) {
        let Some(key) = self.pending.borrow_mut().take() else {
            return;
        };
        if let Some(tree) = instance.sub_tree() {
            self.entries.borrow_mut().insert(key, tree);
        }
    }
}

fn reset_shape_flag(vnode: &VNode) {
    vnode.remove_shape_flag(ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE | ShapeFlags::COMPONENT_KEPT_ALIVE);
}

thread_local! {
    static KEEP_ALIVE: Component = build_keep_alive();
}

/// The `KeepAlive` component. Pass `max` to bound the cache.
pub fn keep_alive() -> Component {
    KEEP_ALIVE.with(Clone::clone)
}

fn build_keep_alive() -> Component {
    Component::builder("KeepAlive")
        .props(["max"])
        .setup(|props, ctx| {
            let Some(instance) = current_instance() else {
                return SetupResult::None;
            };
            let Some(internals) = instance.internals() else {
                return SetupResult::None;
            };
            let storage = internals.create_element("div");
            let this = instance.downgrade();
            instance.set_keep_alive_context(context(&this, storage));

            let cache = Rc::new(Cache::default());
            {
                let cache = cache.clone();
                let this = this.clone();
                on_mounted(move || {
                    if let Some(instance) = this.upgrade() {
                        cache.store_pending(&instance);
                    }
                });
            }
            {
                let cache = cache.clone();
                let this = this.clone();
                on_updated(move || {
                    if let Some(instance) = this.upgrade() {
                        cache.store_pending(&instance);
                    }
                });
            }
            {
                let cache = cache.clone();
                let this = this.clone();
                on_before_unmount(move || {
                    if let Some(instance) = this.upgrade() {
                        unmount_all(&cache, &instance);
                    }
                });
            }

            let props = props.clone();
            let slots = ctx.clone();
            SetupResult::render(move |_| {
                render(&cache, &this, &props, slots.slots().render("default"))
            })
        })
        .build()
}

fn context(this: &WeakInstance, storage: HostNode) -> KeepAliveContext {
    let activate_owner = this.clone();
    let deactivate_owner = this.clone();
    KeepAliveContext {
        activate: Rc::new(move |vnode, container, anchor| {
            let Some(owner) = activate_owner.upgrade() else {
                return;
            };
            let (Some(internals), Some(child)) = (owner.internals(), vnode.component()) else {
                return;
            };
            internals.move_vnode(vnode, container, anchor);
            internals.patch(Some(&child.vnode()), vnode, container, anchor, Some(&owner));
            trace!(component = child.component().name(), "keep-alive: activated");
        }),
        deactivate: Rc::new(move |vnode| {
            let Some(internals) = deactivate_owner.upgrade().and_then(|owner| owner.internals()) else {
                return;
            };
            internals.move_vnode(vnode, storage, None);
            trace!("keep-alive: deactivated");
        }),
    }
}

fn render(
    cache: &Cache,
    this: &WeakInstance,
    props: &Reactive,
    child: Option<VNode>,
) -> VNode {
    let Some(child) = child else {
        cache.pending.borrow_mut().take();
        return comment("");
    };
    if !child.shape_flag().intersects(ShapeFlags::COMPONENT) {
        cache.pending.borrow_mut().take();
        return child;
    }

    let key = CacheKey::of(&child);
    let cached = cache.entries.borrow().get(&key).cloned();
    *cache.pending.borrow_mut() = Some(key.clone());
    match cached {
        Some(cached) => {
            cov_mark::hit!(keep_alive_cache_hit);
            child.set_el(cached.el());
            child.set_component(cached.component());
            child.insert_shape_flag(ShapeFlags::COMPONENT_KEPT_ALIVE);
            cache.touch(&key);
        }
        None => {
            cache.keys.borrow_mut().insert(key);
            let max = props.get("max").as_int().filter(|max| *max > 0);
            if let Some(max) = max {
                let oldest = {
                    let keys = cache.keys.borrow();
                    if keys.len() > max as usize {
                        keys.first().cloned()
                    } else {
                        None
                    }
                };
                if let (Some(oldest), Some(owner)) = (oldest, this.upgrade()) {
                    prune_entry(cache, &owner, &oldest);
                }
            }
        }
    }
    child.insert_shape_flag(ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE);
    child
}

/// Drop one entry; unless it is what is rendered right now, unmount it.
fn prune_entry(cache: &Cache, owner: &ComponentInstance, key: &CacheKey) {
    cache.keys.borrow_mut().shift_remove(key);
    let Some(cached) = cache.entries.borrow_mut().remove(key) else {
        return;
    };
    let current = owner.sub_tree();
    match current {
        Some(current) if is_same_vnode(&current, &cached) => reset_shape_flag(&current),
        _ => {
            cov_mark::hit!(keep_alive_evicts_lru);
            debug!(key = ?key, "keep-alive: evicting least recently used entry");
            reset_shape_flag(&cached);
            if let Some(internals) = owner.internals() {
                internals.unmount(&cached, Some(owner), true);
            }
        }
    }
}

fn unmount_all(cache: &Cache, owner: &ComponentInstance) {
    let current = owner.sub_tree();
    if let Some(current) = &current {
        reset_shape_flag(current);
    }
    let entries: Vec<VNode> = cache.entries.borrow_mut().drain().map(|(_, vnode)| vnode).collect();
    cache.keys.borrow_mut().clear();
    for cached in entries {
        match &current {
            // Unmounted with the keep-alive itself.
            Some(current) if is_same_vnode(current, &cached) => {}
            _ => {
                reset_shape_flag(&cached);
                if let Some(internals) = owner.internals() {
                    internals.unmount(&cached, Some(owner), true);
                }
            }
        }
    }
}
