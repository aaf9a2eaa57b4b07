use tracing::trace;

use super::{RendererInner, mounted_el};
use crate::component::ComponentInstance;
use crate::host::{Host, HostNode};
use crate::shape::PatchFlags;
use crate::value::Value;
use crate::vnode::{Children, Props, VNode, VNodeType, is_same_vnode};

impl<H: Host + 'static> RendererInner<H> {
    pub(super) fn process_element(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        match old {
            None => self.mount_element(new, container, anchor, parent),
            Some(old) => self.patch_element(old, new, parent),
        }
    }

    fn mount_element(
        &self,
        vnode: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        let VNodeType::Element(tag) = vnode.kind() else {
            unreachable!("mount_element on a non-element vnode");
        };
        let el = self.host.create_element(tag);
        vnode.set_el(Some(el));

        match vnode.children() {
            Children::Text(content) => self.host.set_element_text(el, content),
            Children::List(children) => self.mount_children(children, el, None, parent),
            Children::None | Children::Slots(_) => {}
        }
        if let Some(props) = vnode.props() {
            for (key, value) in props.iter() {
                self.host.patch_prop(el, key, &Value::Null, value);
            }
        }

        let transition = vnode.transition();
        let target = self.transition_target();
        if let Some(hooks) = &transition {
            hooks.call_before_enter(&target, el);
        }
        self.host.insert(el, container, anchor);
        if let Some(hooks) = &transition {
            hooks.call_enter(&target, el);
        }
    }

    fn patch_element(&self, old: &VNode, new: &VNode, parent: Option<&ComponentInstance>) {
        let el = mounted_el(old);
        new.set_el(Some(el));
        let flag = new.patch_flag();

        let as_block = match (old.dynamic_children(), new.dynamic_children()) {
            (Some(old_dynamic), Some(new_dynamic)) if old_dynamic.len() == new_dynamic.len() => {
                self.patch_block_children(&old_dynamic, &new_dynamic, el, parent);
                true
            }
            _ => {
                self.patch_children(old, new, el, None, parent);
                false
            }
        };

        let full_diff = flag.contains(PatchFlags::FULL_PROPS)
            || (flag.is_empty() && new.dynamic_children().is_none());
        if full_diff {
            trace!("element: full prop diff");
            self.patch_props(el, old.props(), new.props());
        } else {
            if flag.contains(PatchFlags::CLASS) {
                self.patch_one(el, "class", old, new);
            }
            if flag.contains(PatchFlags::STYLE) {
                self.patch_one(el, "style", old, new);
            }
            if flag.contains(PatchFlags::PROPS) {
                for key in new.dynamic_props() {
                    self.patch_one(el, key, old, new);
                }
            }
        }

        // The full children diff already covered text.
        if as_block && flag.contains(PatchFlags::TEXT) {
            if let (Some(previous), Some(next)) = (old.children().as_text(), new.children().as_text()) {
                if previous != next {
                    self.host.set_element_text(el, next);
                }
            }
        }
    }

    fn patch_one(&self, el: HostNode, key: &str, old: &VNode, new: &VNode) {
        let previous = old.prop(key);
        let next = new.prop(key);
        if !previous.strict_eq(&next) {
            self.host.patch_prop(el, key, &previous, &next);
        }
    }

    /// Apply every changed prop, and clear props that disappeared.
    fn patch_props(&self, el: HostNode, old: Option<&Props>, new: Option<&Props>) {
        let empty = Props::new();
        let old = old.unwrap_or(&empty);
        let new = new.unwrap_or(&empty);
        for (key, next) in new.iter() {
            let previous = old.get(key).cloned().unwrap_or_default();
            if previous.strict_eq(next) {
                trace!(key = &**key, "element: prop unchanged");
                continue;
            }
            self.host.patch_prop(el, key, &previous, next);
        }
        for (key, previous) in old.iter() {
            if !new.contains(key) {
                self.host.patch_prop(el, key, previous, &Value::Null);
            }
        }
    }

    /// Patch the flattened dynamic descendants of two blocks pair by pair.
    pub(super) fn patch_block_children(
        &self,
        old: &[VNode],
        new: &[VNode],
        fallback: HostNode,
        parent: Option<&ComponentInstance>,
    ) {
        cov_mark::hit!(block_children_patched_pairwise);
        trace!(count = new.len(), "element: patching block children");
        for (old_child, new_child) in old.iter().zip(new) {
            // Block members may live anywhere below the root; only nodes
            // that can be replaced or moved need their real parent.
            let needs_parent = matches!(
                old_child.kind(),
                VNodeType::Fragment | VNodeType::Component(_) | VNodeType::Teleport
            ) || !is_same_vnode(old_child, new_child);
            let container = if needs_parent {
                self.container_of(old_child).unwrap_or(fallback)
            } else {
                fallback
            };
            self.patch(Some(old_child), new_child, container, None, parent);
        }
    }

    fn container_of(&self, vnode: &VNode) -> Option<HostNode> {
        let el = match vnode.kind() {
            VNodeType::Component(_) => vnode
                .component()
                .and_then(|instance| instance.sub_tree())
                .and_then(|tree| tree.el()),
            _ => vnode.el(),
        }?;
        self.host.parent_node(el)
    }
}
