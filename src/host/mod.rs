//! The host capability table.
//!
//! The reconciler never touches a concrete display tree. Everything it
//! does to the host goes through [`Host`], so the same diff engine drives a
//! real widget tree, an off-screen buffer, or the recording test host.

pub mod props;

use crate::value::Value;

/// Opaque handle to a node owned by the host.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct HostNode(u32);

impl HostNode {
    /// Wrap a host-assigned index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The host-assigned index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Primitive operations a rendering backend provides.
///
/// Methods take `&self`; hosts keep their tree behind interior mutability,
/// since hooks and event handlers may call back into the renderer while a
/// patch is in progress.
pub trait Host {
    /// Insert `child` into `parent` before `anchor` (at the end if `None`).
    /// Inserting a node that already has a parent moves it.
    fn insert(&self, child: HostNode, parent: HostNode, anchor: Option<HostNode>);
    /// Detach `child` from its parent.
    fn remove(&self, child: HostNode);
    /// Create a detached element.
    fn create_element(&self, tag: &str) -> HostNode;
    /// Create a detached text node.
    fn create_text(&self, text: &str) -> HostNode;
    /// Create a detached comment node.
    fn create_comment(&self, text: &str) -> HostNode;
    /// Replace the content of a text or comment node.
    fn set_text(&self, node: HostNode, text: &str);
    /// Replace all children of an element with a single text.
    fn set_element_text(&self, node: HostNode, text: &str);
    /// Parent of `node`, if attached.
    fn parent_node(&self, node: HostNode) -> Option<HostNode>;
    /// Next sibling of `node`, if any.
    fn next_sibling(&self, node: HostNode) -> Option<HostNode>;
    /// Apply one prop change. `prev` or `next` is [`Value::Null`] when the
    /// prop is being added or removed.
    fn patch_prop(&self, node: HostNode, key: &str, prev: &Value, next: &Value);
    /// Resolve a teleport target selector.
    fn query_selector(&self, _selector: &str) -> Option<HostNode> {
        None
    }
    /// Add one class to an element's class list. Hosts without classes
    /// ignore it.
    fn add_class(&self, _node: HostNode, _class: &str) {}
    /// Remove one class from an element's class list.
    fn remove_class(&self, _node: HostNode, _class: &str) {}
    /// Run `f` once the current state has been presented. Hosts without a
    /// frame clock run it right away.
    fn next_frame(&self, f: Box<dyn FnOnce()>) {
        f();
    }
    /// Run `f` when the transition running on `node` ends. Hosts without
    /// animated transitions run it right away.
    fn on_transition_end(&self, _node: HostNode, f: Box<dyn FnOnce()>) {
        f();
    }
}
