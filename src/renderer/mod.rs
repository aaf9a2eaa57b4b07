//! The reconciler.
//!
//! [`Renderer::render`] patches a vnode tree into a host container,
//! diffing against whatever was rendered there before. [`patch`] is the
//! single entry point every level of the tree goes through: it short
//! circuits identical vnodes, replaces nodes that fail the same-node rule,
//! and dispatches on the vnode type.
//!
//! The component machinery (keep-alive, the render effect, template refs)
//! reaches back into the renderer through [`RendererInternals`], an
//! object-safe view of the renderer that does not carry the host type.
//!
//! [`patch`]: RendererInner::patch

mod children;
mod component;
mod element;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::component::ComponentInstance;
use crate::hash::FastHashMap;
use crate::host::{Host, HostNode};
use crate::shape::ShapeFlags;
use crate::teleport;
use crate::transition::TransitionTarget;
use crate::value::Value;
use crate::vnode::{VNode, VNodeType, is_same_vnode};

/// What component-level code needs from the renderer.
pub(crate) trait RendererInternals {
    fn patch(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    );
    fn unmount(&self, vnode: &VNode, parent: Option<&ComponentInstance>, do_remove: bool);
    fn move_vnode(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>);
    fn create_element(&self, tag: &str) -> HostNode;
}

/// Drives a [`Host`] from vnode trees.
pub struct Renderer<H: Host + 'static> {
    inner: Rc<RendererInner<H>>,
}

pub(crate) struct RendererInner<H: Host + 'static> {
    host: H,
    this: Weak<RendererInner<H>>,
    roots: RefCell<FastHashMap<HostNode, VNode>>,
}

impl<H: Host + 'static> Renderer<H> {
    /// Create a renderer over `host`.
    pub fn new(host: H) -> Self {
        let inner = Rc::new_cyclic(|this| RendererInner {
            host,
            this: this.clone(),
            roots: RefCell::new(FastHashMap::default()),
        });
        Self { inner }
    }

    /// The host this renderer drives.
    pub fn host(&self) -> &H {
        &self.inner.host
    }

    /// Render `vnode` into `container`, patching against the previous
    /// render there. `None` unmounts whatever is rendered.
    pub fn render(&self, vnode: Option<VNode>, container: HostNode) {
        let previous = self.inner.roots.borrow().get(&container).cloned();
        match vnode {
            Some(vnode) => {
                self.inner
                    .patch(previous.as_ref(), &vnode, container, None, None);
                self.inner.roots.borrow_mut().insert(container, vnode);
            }
            None => {
                if let Some(previous) = previous {
                    self.inner.unmount(&previous, None, true);
                }
                self.inner.roots.borrow_mut().remove(&container);
            }
        }
    }

    /// The tree last rendered into `container`.
    pub fn root(&self, container: HostNode) -> Option<VNode> {
        self.inner.roots.borrow().get(&container).cloned()
    }
}

/// Host node of a vnode that has to be mounted at this point.
fn mounted_el(vnode: &VNode) -> HostNode {
    match vnode.el() {
        Some(el) => el,
        None => panic!("patching a vnode that was never mounted: {vnode:?}"),
    }
}

impl<H: Host + 'static> RendererInner<H> {
    pub(crate) fn host(&self) -> &H {
        &self.host
    }

    fn transition_target(&self) -> Weak<dyn TransitionTarget> {
        self.this.clone()
    }

    fn internals(&self) -> Weak<dyn RendererInternals> {
        self.this.clone()
    }

    pub(crate) fn patch(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        if old.is_some_and(|old| old.ptr_eq(new)) {
            return;
        }
        let mut old = old;
        let mut anchor = anchor;
        if let Some(previous) = old {
            if !is_same_vnode(previous, new) {
                anchor = self.next_host_node(previous);
                self.unmount(previous, parent, true);
                old = None;
            }
        }

        match new.kind() {
            VNodeType::Text => self.process_text(old, new, container, anchor),
            VNodeType::Comment => self.process_comment(old, new, container, anchor),
            VNodeType::Fragment => self.process_fragment(old, new, container, anchor, parent),
            VNodeType::Teleport => teleport::process(self, old, new, container, anchor, parent),
            VNodeType::Element(_) => self.process_element(old, new, container, anchor, parent),
            VNodeType::Component(_) => self.process_component(old, new, container, anchor, parent),
        }

        self.set_ref(old, new);
    }

    fn process_text(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let content = new.children().as_text().unwrap_or_default();
        match old {
            None => {
                let el = self.host.create_text(content);
                new.set_el(Some(el));
                self.host.insert(el, container, anchor);
            }
            Some(old) => {
                let el = mounted_el(old);
                new.set_el(Some(el));
                if old.children().as_text() != Some(content) {
                    self.host.set_text(el, content);
                }
            }
        }
    }

    fn process_comment(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match old {
            None => {
                let el = self
                    .host
                    .create_comment(new.children().as_text().unwrap_or_default());
                new.set_el(Some(el));
                self.host.insert(el, container, anchor);
            }
            // Comments are static.
            Some(old) => new.set_el(old.el()),
        }
    }

    fn process_fragment(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        match old {
            None => {
                let start = self.host.create_text("");
                let end = self.host.create_text("");
                new.set_el(Some(start));
                new.set_anchor(Some(end));
                self.host.insert(start, container, anchor);
                self.host.insert(end, container, anchor);
                self.mount_children(new.children().as_list(), container, Some(end), parent);
            }
            Some(old) => {
                new.set_el(old.el());
                new.set_anchor(old.anchor());
                match (old.dynamic_children(), new.dynamic_children()) {
                    (Some(old_dynamic), Some(new_dynamic))
                        if old_dynamic.len() == new_dynamic.len() =>
                    {
                        self.patch_block_children(&old_dynamic, &new_dynamic, container, parent);
                    }
                    _ => self.patch_children(old, new, container, old.anchor(), parent),
                }
            }
        }
    }

    /// Bind the new vnode's ref to its node or instance, clearing a ref the
    /// old vnode held that the new one dropped.
    fn set_ref(&self, old: Option<&VNode>, new: &VNode) {
        if let Some(stale) = old.and_then(VNode::ref_binding) {
            let kept = new.ref_binding().is_some_and(|binding| binding.strict_eq(stale));
            if !kept {
                assign_ref(stale, Value::Null);
            }
        }
        let Some(binding) = new.ref_binding() else {
            return;
        };
        let target = match new.component() {
            Some(instance) => instance.ref_value(),
            None => new.el().map_or(Value::Null, Value::Node),
        };
        assign_ref(binding, target);
    }

    pub(crate) fn unmount(
        &self,
        vnode: &VNode,
        parent: Option<&ComponentInstance>,
        do_remove: bool,
    ) {
        if let Some(binding) = vnode.ref_binding() {
            assign_ref(binding, Value::Null);
        }
        if vnode
            .shape_flag()
            .contains(ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE)
        {
            if let Some(ctx) = parent.and_then(ComponentInstance::keep_alive_context) {
                (ctx.deactivate)(vnode);
                return;
            }
        }
        match vnode.kind() {
            VNodeType::Component(_) => self.unmount_component(vnode, do_remove),
            VNodeType::Teleport => teleport::remove(self, vnode, parent, do_remove),
            VNodeType::Element(_) | VNodeType::Fragment => {
                self.unmount_children(vnode.children().as_list(), parent, false);
                if do_remove {
                    self.remove(vnode);
                }
            }
            VNodeType::Text | VNodeType::Comment => {
                if do_remove {
                    self.remove(vnode);
                }
            }
        }
    }

    /// Detach a vnode's host nodes. Elements with a leave hook stay
    /// attached until the hook calls `done`.
    fn remove(&self, vnode: &VNode) {
        if matches!(vnode.kind(), VNodeType::Fragment) {
            if let (Some(start), Some(end)) = (vnode.el(), vnode.anchor()) {
                self.remove_range(start, end);
            }
            return;
        }
        let Some(el) = vnode.el() else {
            return;
        };
        match vnode.transition() {
            Some(hooks) if hooks.has_leave() && matches!(vnode.kind(), VNodeType::Element(_)) => {
                let this = self.this.clone();
                hooks.call_leave(&self.transition_target(), el, move || {
                    if let Some(renderer) = this.upgrade() {
                        renderer.host.remove(el);
                    }
                });
            }
            _ => self.host.remove(el),
        }
    }

    /// Remove `start`, `end`, and every sibling between them.
    fn remove_range(&self, start: HostNode, end: HostNode) {
        let mut current = start;
        loop {
            let next = self.host.next_sibling(current);
            self.host.remove(current);
            if current == end {
                break;
            }
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
    }

    pub(crate) fn move_vnode(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        match vnode.kind() {
            VNodeType::Component(_) => {
                if let Some(tree) = vnode.component().and_then(|instance| instance.sub_tree()) {
                    self.move_vnode(&tree, container, anchor);
                }
            }
            VNodeType::Fragment => {
                if let Some(start) = vnode.el() {
                    self.host.insert(start, container, anchor);
                }
                for child in vnode.children().as_list() {
                    self.move_vnode(child, container, anchor);
                }
                if let Some(end) = vnode.anchor() {
                    self.host.insert(end, container, anchor);
                }
            }
            // A teleport's children stay in the target; only the
            // placeholder follows the logical position.
            _ => {
                if let Some(el) = vnode.el() {
                    self.host.insert(el, container, anchor);
                }
            }
        }
    }

    /// First host node after everything `vnode` rendered.
    pub(crate) fn next_host_node(&self, vnode: &VNode) -> Option<HostNode> {
        if let VNodeType::Component(_) = vnode.kind() {
            let tree = vnode.component().and_then(|instance| instance.sub_tree());
            return tree.and_then(|tree| self.next_host_node(&tree));
        }
        let last = vnode.anchor().or_else(|| vnode.el())?;
        self.host.next_sibling(last)
    }
}

fn assign_ref(binding: &Value, target: Value) {
    match binding {
        Value::Ref(slot) => slot.set(target),
        Value::Func(callback) => {
            callback.call(&[target]);
        }
        other => trace!(binding = ?other, "ignoring unsupported ref binding"),
    }
}

impl<H: Host + 'static> TransitionTarget for RendererInner<H> {
    fn add_class(&self, el: HostNode, class: &str) {
        self.host.add_class(el, class);
    }

    fn remove_class(&self, el: HostNode, class: &str) {
        self.host.remove_class(el, class);
    }

    fn next_frame(&self, f: Box<dyn FnOnce()>) {
        self.host.next_frame(f);
    }

    fn on_transition_end(&self, el: HostNode, f: Box<dyn FnOnce()>) {
        self.host.on_transition_end(el, f);
    }
}

impl<H: Host + 'static> RendererInternals for RendererInner<H> {
    fn patch(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        RendererInner::patch(self, old, new, container, anchor, parent);
    }

    fn unmount(&self, vnode: &VNode, parent: Option<&ComponentInstance>, do_remove: bool) {
        RendererInner::unmount(self, vnode, parent, do_remove);
    }

    fn move_vnode(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        RendererInner::move_vnode(self, vnode, container, anchor);
    }

    fn create_element(&self, tag: &str) -> HostNode {
        self.host.create_element(tag)
    }
}
