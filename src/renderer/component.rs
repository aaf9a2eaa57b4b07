use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use super::RendererInner;
use crate::component::{ComponentInstance, should_update_component};
use crate::effect::ReactiveEffect;
use crate::host::{Host, HostNode};
use crate::lifecycle::{LifecycleHook, invoke_hooks};
use crate::scheduler::{Job, invalidate_job, queue_job};
use crate::shape::ShapeFlags;
use crate::vnode::VNode;

impl<H: Host + 'static> RendererInner<H> {
    pub(super) fn process_component(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        match old {
            Some(old) => self.update_component(old, new),
            None => {
                if new.shape_flag().contains(ShapeFlags::COMPONENT_KEPT_ALIVE) {
                    if let Some(ctx) = parent.and_then(ComponentInstance::keep_alive_context) {
                        (ctx.activate)(new, container, anchor);
                        return;
                    }
                }
                self.mount_component(new, container, anchor, parent);
            }
        }
    }

    fn mount_component(
        &self,
        vnode: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        let instance = ComponentInstance::new(vnode, parent, self.internals());
        vnode.set_component(Some(instance.clone()));
        instance.setup();
        self.setup_render_effect(&instance, container, anchor);
    }

    /// Install the instance's render effect and run it once to mount.
    ///
    /// Triggers only queue the update job; the job re-runs the effect if it
    /// is still dirty by the time the queue is flushed, so an update the
    /// parent already forced is not rendered twice.
    fn setup_render_effect(
        &self,
        instance: &ComponentInstance,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let renderer = self.this.clone();
        let target = instance.downgrade();
        let mount_at = Cell::new(Some((container, anchor)));
        let effect = Rc::new(ReactiveEffect::new(
            move || {
                let (Some(renderer), Some(instance)) = (renderer.upgrade(), target.upgrade()) else {
                    return;
                };
                renderer.run_component_update(&instance, mount_at.take());
            },
            None,
        ));

        let weak_effect = Rc::downgrade(&effect);
        let job = Job::new(move || {
            if let Some(effect) = weak_effect.upgrade() {
                if effect.is_active() && effect.is_dirty() {
                    effect.run();
                }
            }
        });
        let queued = job.clone();
        effect.set_scheduler(Some(Rc::new(move || queue_job(queued.clone()))));

        instance.scope().adopt(effect.clone());
        instance.set_effect(effect.clone(), job);
        effect.run();
    }

    /// Body of the render effect: first mount, or re-render.
    fn run_component_update(
        &self,
        instance: &ComponentInstance,
        mount_at: Option<(HostNode, Option<HostNode>)>,
    ) {
        if !instance.is_mounted() {
            let Some((container, anchor)) = mount_at else {
                return;
            };
            invoke_hooks(instance, LifecycleHook::BeforeMount);
            let tree = instance.render_root();
            self.patch(None, &tree, container, anchor, Some(instance));
            instance.vnode().set_el(tree.el());
            instance.set_sub_tree(Some(tree));
            instance.set_mounted(true);
            debug!(
                component = instance.component().name(),
                uid = instance.uid(),
                "component mounted"
            );
            invoke_hooks(instance, LifecycleHook::Mounted);
            return;
        }

        let next = instance.take_next();
        if let Some(next) = &next {
            next.set_el(instance.vnode().el());
            instance.set_vnode(next.clone());
            instance.update_props(next.props());
            instance.update_slots(next.children());
        }
        let vnode = instance.vnode();

        invoke_hooks(instance, LifecycleHook::BeforeUpdate);
        let next_tree = instance.render_root();
        let Some(prev_tree) = instance.sub_tree() else {
            return;
        };
        let container = prev_tree.el().and_then(|el| self.host.parent_node(el));
        let Some(container) = container else {
            warn!(
                component = instance.component().name(),
                "skipping update of a detached component"
            );
            return;
        };
        let anchor = self.next_host_node(&prev_tree);
        instance.set_sub_tree(Some(next_tree.clone()));
        self.patch(Some(&prev_tree), &next_tree, container, anchor, Some(instance));
        vnode.set_el(next_tree.el());
        invoke_hooks(instance, LifecycleHook::Updated);
    }

    /// Parent-driven update of a mounted component.
    fn update_component(&self, old: &VNode, new: &VNode) {
        let Some(instance) = old.component() else {
            panic!("updating a component vnode that has no instance: {old:?}");
        };
        new.set_component(Some(instance.clone()));
        if should_update_component(old, new) {
            instance.set_next(Some(new.clone()));
            if let Some(job) = instance.update_job() {
                invalidate_job(&job);
            }
            if let Some(effect) = instance.effect() {
                effect.run();
            }
        } else {
            new.set_el(old.el());
            instance.set_vnode(new.clone());
        }
    }

    pub(super) fn unmount_component(&self, vnode: &VNode, do_remove: bool) {
        let Some(instance) = vnode.component() else {
            return;
        };
        invoke_hooks(&instance, LifecycleHook::BeforeUnmount);
        instance.scope().stop();
        if let Some(job) = instance.update_job() {
            invalidate_job(&job);
        }
        if let Some(tree) = instance.sub_tree() {
            self.unmount(&tree, Some(&instance), do_remove);
        }
        instance.set_unmounted();
        invoke_hooks(&instance, LifecycleHook::Unmounted);
        debug!(
            component = instance.component().name(),
            uid = instance.uid(),
            "component unmounted"
        );
        instance.vnode().set_component(None);
        instance.release();
        vnode.set_component(None);
    }
}
