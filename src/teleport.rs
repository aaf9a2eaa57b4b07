//! Teleports: children rendered into a container elsewhere in the host
//! tree.
//!
//! At its logical position a teleport leaves only a comment placeholder.
//! Its children are mounted into the container the `to` prop resolves to,
//! either a selector handed to [`Host::query_selector`] or a host node.

use tracing::{trace, warn};

use crate::component::ComponentInstance;
use crate::error::Error;
use crate::host::{Host, HostNode};
use crate::renderer::RendererInner;
use crate::value::Value;
use crate::vnode::VNode;

fn resolve_target<H: Host + 'static>(renderer: &RendererInner<H>, to: &Value) -> Option<HostNode> {
    match to {
        Value::Node(node) => Some(*node),
        Value::Str(selector) => renderer.host().query_selector(selector),
        _ => None,
    }
}

fn report_missing(to: &Value) {
    let err = Error::TeleportTargetMissing(to.to_string());
    warn!(error = %err, "teleport children not mounted");
}

pub(crate) fn process<H: Host + 'static>(
    renderer: &RendererInner<H>,
    old: Option<&VNode>,
    new: &VNode,
    container: HostNode,
    anchor: Option<HostNode>,
    parent: Option<&ComponentInstance>,
) {
    let to = new.prop("to");
    let Some(old) = old else {
        let placeholder = renderer.host().create_comment("teleport");
        new.set_el(Some(placeholder));
        new.set_anchor(Some(placeholder));
        renderer.host().insert(placeholder, container, anchor);

        let target = resolve_target(renderer, &to);
        new.set_target(target);
        match target {
            Some(target) => renderer.mount_children(new.children().as_list(), target, None, parent),
            None => report_missing(&to),
        }
        return;
    };

    new.set_el(old.el());
    new.set_anchor(old.anchor());
    let current = old.target();
    let retargeted = !old.prop("to").strict_eq(&to);
    let target = if retargeted {
        resolve_target(renderer, &to)
    } else {
        current
    };
    new.set_target(target);

    match (current, target) {
        (Some(current), _) => {
            renderer.patch_children(old, new, current, None, parent);
            if retargeted {
                match target {
                    Some(target) if target != current => {
                        trace!(?current, ?target, "teleport: moving children");
                        for child in new.children().as_list() {
                            renderer.move_vnode(child, target, None);
                        }
                    }
                    Some(_) => {}
                    None => {
                        // Nowhere to go; keep the children where they are.
                        report_missing(&to);
                        new.set_target(Some(current));
                    }
                }
            }
        }
        (None, Some(target)) => {
            renderer.mount_children(new.children().as_list(), target, None, parent);
        }
        (None, None) => report_missing(&to),
    }
}

/// Unmount a teleport: its children always leave the target; the
/// placeholder goes only when the caller removes host nodes.
pub(crate) fn remove<H: Host + 'static>(
    renderer: &RendererInner<H>,
    vnode: &VNode,
    parent: Option<&ComponentInstance>,
    do_remove: bool,
) {
    if vnode.target().is_some() {
        renderer.unmount_children(vnode.children().as_list(), parent, true);
    }
    if do_remove {
        if let Some(placeholder) = vnode.el() {
            renderer.host().remove(placeholder);
        }
    }
}
