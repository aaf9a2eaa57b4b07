//! Recording in-memory host.
//!
//! [`TestHost`] keeps a small node tree in a slab and logs every host call
//! as a [`HostOp`], so tests can assert on the exact mutations a patch
//! produced as well as on the resulting tree ([`TestHost::serialize`]).

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use slab::Slab;

use crate::hash::FastIndexMap;
use crate::host::props::{InvokerCache, Invoker, PropTarget, patch_prop};
use crate::host::{Host, HostNode};
use crate::value::Value;

/// One recorded host call.
#[derive(Clone, Debug, PartialEq)]
pub enum HostOp {
    /// `insert`; `moved` is set when the node already had a parent.
    Insert {
        /// Inserted node.
        node: HostNode,
        /// New parent.
        parent: HostNode,
        /// Node inserted before.
        anchor: Option<HostNode>,
        /// Whether this relocated an attached node.
        moved: bool,
    },
    /// `remove`.
    Remove(HostNode),
    /// `create_element`.
    CreateElement(String),
    /// `create_text`.
    CreateText(String),
    /// `create_comment`.
    CreateComment(String),
    /// `set_text`.
    SetText(HostNode, String),
    /// `set_element_text`.
    SetElementText(HostNode, String),
    /// `add_class`.
    AddClass(HostNode, String),
    /// `remove_class`.
    RemoveClass(HostNode, String),
    /// `patch_prop`.
    PatchProp {
        /// Target element.
        node: HostNode,
        /// Prop key.
        key: String,
        /// Previous value.
        prev: Value,
        /// Next value.
        next: Value,
    },
}

#[derive(Debug)]
enum NodeKind {
    Element(Rc<str>),
    Text,
    Comment,
}

#[derive(Debug)]
struct TestNode {
    kind: NodeKind,
    text: String,
    parent: Option<HostNode>,
    children: Vec<HostNode>,
    class: Option<String>,
    style: FastIndexMap<String, String>,
    attrs: FastIndexMap<String, String>,
    listeners: FastIndexMap<String, Invoker>,
}

impl TestNode {
    fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_owned(),
            parent: None,
            children: Vec::new(),
            class: None,
            style: FastIndexMap::default(),
            attrs: FastIndexMap::default(),
            listeners: FastIndexMap::default(),
        }
    }
}

type Deferred = Box<dyn FnOnce()>;

/// In-memory host that records every call.
///
/// Frames and transition ends do not happen on their own: callbacks wait
/// for [`run_frame`](Self::run_frame) and
/// [`end_transition`](Self::end_transition).
#[derive(Default)]
pub struct TestHost {
    nodes: RefCell<Slab<TestNode>>,
    ops: RefCell<Vec<HostOp>>,
    invokers: InvokerCache,
    frames: RefCell<Vec<Deferred>>,
    transition_ends: RefCell<Vec<(HostNode, Deferred)>>,
}

impl TestHost {
    /// Empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// A detached `root` element to render into. Not recorded.
    pub fn create_root(&self) -> HostNode {
        self.alloc(TestNode::new(NodeKind::Element("root".into()), ""))
    }

    fn alloc(&self, node: TestNode) -> HostNode {
        let index = self.nodes.borrow_mut().insert(node);
        HostNode::new(index as u32)
    }

    fn record(&self, op: HostOp) {
        self.ops.borrow_mut().push(op);
    }

    fn with_node<R>(&self, node: HostNode, f: impl FnOnce(&mut TestNode) -> R) -> R {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node.index() as usize) {
            Some(entry) => f(entry),
            None => panic!("unknown host node {node:?}"),
        }
    }

    fn detach(&self, node: HostNode) -> bool {
        let Some(parent) = self.with_node(node, |entry| entry.parent.take()) else {
            return false;
        };
        self.with_node(parent, |entry| entry.children.retain(|child| *child != node));
        true
    }

    /// Every call recorded since the last [`clear_ops`](Self::clear_ops).
    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.borrow().clone()
    }

    /// Forget the recorded calls.
    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    /// Children of `node`.
    pub fn children(&self, node: HostNode) -> Vec<HostNode> {
        self.with_node(node, |entry| entry.children.clone())
    }

    /// Text of a text or comment node.
    pub fn text(&self, node: HostNode) -> String {
        self.with_node(node, |entry| entry.text.clone())
    }

    /// An attribute of an element.
    pub fn attr(&self, node: HostNode, name: &str) -> Option<String> {
        self.with_node(node, |entry| entry.attrs.get(name).cloned())
    }

    /// Class string of an element.
    pub fn class(&self, node: HostNode) -> Option<String> {
        self.with_node(node, |entry| entry.class.clone())
    }

    /// Run the callbacks waiting for the next frame. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let frames = std::mem::take(&mut *self.frames.borrow_mut());
        let count = frames.len();
        for frame in frames {
            frame();
        }
        count
    }

    /// Signal the end of the transition running on `node`. Returns how
    /// many callbacks ran.
    pub fn end_transition(&self, node: HostNode) -> usize {
        let ready: Vec<Deferred> = {
            let mut waiting = self.transition_ends.borrow_mut();
            let (ready, rest) = std::mem::take(&mut *waiting)
                .into_iter()
                .partition::<Vec<_>, _>(|(target, _)| *target == node);
            *waiting = rest;
            ready.into_iter().map(|(_, f)| f).collect()
        };
        let count = ready.len();
        for f in ready {
            f();
        }
        count
    }

    /// One inline style property of an element.
    pub fn style(&self, node: HostNode, name: &str) -> Option<String> {
        self.with_node(node, |entry| entry.style.get(name).cloned())
    }

    /// Fire `event` on `node`; `None` when nothing listens.
    pub fn dispatch(&self, node: HostNode, event: &str, args: &[Value]) -> Option<Value> {
        let invoker = self.with_node(node, |entry| entry.listeners.get(event).cloned())?;
        Some(invoker.invoke(args))
    }

    /// Markup of `node` and its subtree. Text is written raw, comments as
    /// `<!--text-->`, elements as `<tag attrs>children</tag>`; empty text
    /// nodes (fragment markers) vanish.
    pub fn serialize(&self, node: HostNode) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    /// Serialized children of `node`, without the node itself.
    pub fn inner(&self, node: HostNode) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, node: HostNode, out: &mut String) {
        let (open, children, close) = {
            let nodes = self.nodes.borrow();
            let Some(entry) = nodes.get(node.index() as usize) else {
                return;
            };
            match &entry.kind {
                NodeKind::Text => (entry.text.clone(), Vec::new(), String::new()),
                NodeKind::Comment => (format!("<!--{}-->", entry.text), Vec::new(), String::new()),
                NodeKind::Element(tag) => {
                    let mut open = format!("<{tag}");
                    if let Some(class) = &entry.class {
                        let _ = write!(open, " class=\"{class}\"");
                    }
                    if !entry.style.is_empty() {
                        let style: Vec<String> = entry
                            .style
                            .iter()
                            .map(|(name, value)| format!("{name}:{value}"))
                            .collect();
                        let _ = write!(open, " style=\"{}\"", style.join(";"));
                    }
                    for (name, value) in &entry.attrs {
                        let _ = write!(open, " {name}=\"{value}\"");
                    }
                    open.push('>');
                    (open, entry.children.clone(), format!("</{tag}>"))
                }
            }
        };
        out.push_str(&open);
        for child in children {
            self.write_node(child, out);
        }
        out.push_str(&close);
    }
}

impl Host for TestHost {
    fn insert(&self, child: HostNode, parent: HostNode, anchor: Option<HostNode>) {
        let moved = self.detach(child);
        self.with_node(parent, |entry| {
            let position = anchor
                .and_then(|anchor| entry.children.iter().position(|node| *node == anchor))
                .unwrap_or(entry.children.len());
            entry.children.insert(position, child);
        });
        self.with_node(child, |entry| entry.parent = Some(parent));
        self.record(HostOp::Insert {
            node: child,
            parent,
            anchor,
            moved,
        });
    }

    fn remove(&self, child: HostNode) {
        self.detach(child);
        self.invokers.forget_node(child);
        self.record(HostOp::Remove(child));
    }

    fn create_element(&self, tag: &str) -> HostNode {
        self.record(HostOp::CreateElement(tag.to_owned()));
        self.alloc(TestNode::new(NodeKind::Element(tag.into()), ""))
    }

    fn create_text(&self, text: &str) -> HostNode {
        self.record(HostOp::CreateText(text.to_owned()));
        self.alloc(TestNode::new(NodeKind::Text, text))
    }

    fn create_comment(&self, text: &str) -> HostNode {
        self.record(HostOp::CreateComment(text.to_owned()));
        self.alloc(TestNode::new(NodeKind::Comment, text))
    }

    fn set_text(&self, node: HostNode, text: &str) {
        self.with_node(node, |entry| entry.text = text.to_owned());
        self.record(HostOp::SetText(node, text.to_owned()));
    }

    fn set_element_text(&self, node: HostNode, text: &str) {
        let old_children = self.with_node(node, |entry| std::mem::take(&mut entry.children));
        for child in old_children {
            self.with_node(child, |entry| entry.parent = None);
        }
        if !text.is_empty() {
            let content = self.alloc(TestNode::new(NodeKind::Text, text));
            self.with_node(content, |entry| entry.parent = Some(node));
            self.with_node(node, |entry| entry.children.push(content));
        }
        self.record(HostOp::SetElementText(node, text.to_owned()));
    }

    fn parent_node(&self, node: HostNode) -> Option<HostNode> {
        self.with_node(node, |entry| entry.parent)
    }

    fn next_sibling(&self, node: HostNode) -> Option<HostNode> {
        let parent = self.parent_node(node)?;
        self.with_node(parent, |entry| {
            let position = entry.children.iter().position(|child| *child == node)?;
            entry.children.get(position + 1).copied()
        })
    }

    fn patch_prop(&self, node: HostNode, key: &str, prev: &Value, next: &Value) {
        self.record(HostOp::PatchProp {
            node,
            key: key.to_owned(),
            prev: prev.clone(),
            next: next.clone(),
        });
        patch_prop(self, node, key, prev, next);
    }

    fn add_class(&self, node: HostNode, class: &str) {
        self.with_node(node, |entry| {
            let mut classes: Vec<&str> = entry
                .class
                .as_deref()
                .unwrap_or("")
                .split_whitespace()
                .collect();
            if !classes.contains(&class) {
                classes.push(class);
            }
            entry.class = Some(classes.join(" "));
        });
        self.record(HostOp::AddClass(node, class.to_owned()));
    }

    fn remove_class(&self, node: HostNode, class: &str) {
        self.with_node(node, |entry| {
            let remaining: Vec<&str> = entry
                .class
                .as_deref()
                .unwrap_or("")
                .split_whitespace()
                .filter(|existing| *existing != class)
                .collect();
            entry.class = (!remaining.is_empty()).then(|| remaining.join(" "));
        });
        self.record(HostOp::RemoveClass(node, class.to_owned()));
    }

    fn next_frame(&self, f: Box<dyn FnOnce()>) {
        self.frames.borrow_mut().push(f);
    }

    fn on_transition_end(&self, node: HostNode, f: Box<dyn FnOnce()>) {
        self.transition_ends.borrow_mut().push((node, f));
    }

    fn query_selector(&self, selector: &str) -> Option<HostNode> {
        let id = selector.strip_prefix('#')?;
        let nodes = self.nodes.borrow();
        nodes
            .iter()
            .find(|(_, entry)| entry.attrs.get("id").is_some_and(|value| value == id))
            .map(|(index, _)| HostNode::new(index as u32))
    }
}

impl PropTarget for TestHost {
    fn set_class(&self, node: HostNode, class: Option<&str>) {
        self.with_node(node, |entry| entry.class = class.map(str::to_owned));
    }

    fn set_style(&self, node: HostNode, name: &str, value: Option<&str>) {
        self.with_node(node, |entry| match value {
            Some(value) => {
                entry.style.insert(name.to_owned(), value.to_owned());
            }
            None => {
                entry.style.shift_remove(name);
            }
        });
    }

    fn set_attribute(&self, node: HostNode, name: &str, value: &str) {
        self.with_node(node, |entry| {
            entry.attrs.insert(name.to_owned(), value.to_owned());
        });
    }

    fn remove_attribute(&self, node: HostNode, name: &str) {
        self.with_node(node, |entry| {
            entry.attrs.shift_remove(name);
        });
    }

    fn add_listener(&self, node: HostNode, event: &str, invoker: Invoker) {
        self.with_node(node, |entry| {
            entry.listeners.insert(event.to_owned(), invoker);
        });
    }

    fn remove_listener(&self, node: HostNode, event: &str, invoker: &Invoker) {
        self.with_node(node, |entry| {
            if entry.listeners.get(event).is_some_and(|bound| bound.ptr_eq(invoker)) {
                entry.listeners.shift_remove(event);
            }
        });
    }

    fn invokers(&self) -> &InvokerCache {
        &self.invokers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_anchor_and_move() {
        let host = TestHost::new();
        let root = host.create_root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        host.insert(a, root, None);
        host.insert(b, root, Some(a));
        assert_eq!(host.inner(root), "ba");

        host.clear_ops();
        host.insert(b, root, None);
        assert_eq!(host.inner(root), "ab");
        assert!(matches!(host.ops()[0], HostOp::Insert { moved: true, .. }));
        assert_eq!(host.next_sibling(a), Some(b));
    }

    #[test]
    fn class_list_edits_keep_order_and_drop_empty() {
        let host = TestHost::new();
        let el = host.create_element("div");
        host.add_class(el, "a");
        host.add_class(el, "b");
        host.add_class(el, "a");
        assert_eq!(host.class(el).as_deref(), Some("a b"));
        host.remove_class(el, "a");
        host.remove_class(el, "b");
        assert_eq!(host.class(el), None);
    }

    #[test]
    fn deferred_callbacks_wait_for_their_signal() {
        let host = TestHost::new();
        let el = host.create_element("div");
        let other = host.create_element("div");
        let hits = Rc::new(RefCell::new(Vec::new()));
        let log = hits.clone();
        host.next_frame(Box::new(move || log.borrow_mut().push("frame")));
        let log = hits.clone();
        host.on_transition_end(el, Box::new(move || log.borrow_mut().push("end")));
        assert!(hits.borrow().is_empty());

        assert_eq!(host.end_transition(other), 0);
        assert_eq!(host.run_frame(), 1);
        assert_eq!(host.end_transition(el), 1);
        assert_eq!(host.end_transition(el), 0);
        assert_eq!(*hits.borrow(), ["frame", "end"]);
    }

    #[test]
    fn props_render_into_markup() {
        let host = TestHost::new();
        let el = host.create_element("div");
        host.patch_prop(el, "id", &Value::Null, &Value::from("main"));
        host.patch_prop(el, "class", &Value::Null, &Value::from("big"));
        assert_eq!(host.serialize(el), "<div class=\"big\" id=\"main\"></div>");
        assert_eq!(host.query_selector("#main"), Some(el));
        assert_eq!(host.query_selector("#other"), None);
    }
}
