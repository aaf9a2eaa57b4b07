//! Virtual nodes.
//!
//! A [`VNode`] is an immutable description (type, props, children, key)
//! plus the mutable slots the reconciler fills in while mounting: the
//! realized host node, the fragment end marker, the teleport target, and
//! the component instance. Handles are cheap `Rc` clones; the reconciler
//! relies on identity, so a vnode is never deep-copied.
//!
//! ## Blocks
//!
//! Between [`open_block`] and [`setup_block`] every vnode created with a
//! patch flag (and every component vnode) is collected into the innermost
//! open block. The block root keeps that flat list as its dynamic children
//! and the reconciler diffs only those, pairwise, skipping static parts.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::component::{Component, ComponentInstance};
use crate::hash::FastIndexMap;
use crate::host::HostNode;
use crate::shape::{PatchFlags, ShapeFlags};
use crate::transition::TransitionHooks;
use crate::value::Value;

/// What a vnode renders as.
#[derive(Clone)]
pub enum VNodeType {
    /// Host element with a tag.
    Element(Rc<str>),
    /// Text node.
    Text,
    /// Comment node.
    Comment,
    /// Children without a wrapper, delimited by two empty text markers.
    Fragment,
    /// Children rendered into another container.
    Teleport,
    /// Component.
    Component(Component),
}

impl VNodeType {
    fn same(&self, other: &VNodeType) -> bool {
        match (self, other) {
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Component(a), VNodeType::Component(b)) => a.ptr_eq(b),
            (VNodeType::Text, VNodeType::Text)
            | (VNodeType::Comment, VNodeType::Comment)
            | (VNodeType::Fragment, VNodeType::Fragment)
            | (VNodeType::Teleport, VNodeType::Teleport) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "Element({tag})"),
            VNodeType::Text => f.write_str("Text"),
            VNodeType::Comment => f.write_str("Comment"),
            VNodeType::Fragment => f.write_str("Fragment"),
            VNodeType::Teleport => f.write_str("Teleport"),
            VNodeType::Component(component) => write!(f, "Component({})", component.name()),
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(tag.into())
    }
}

impl From<Rc<str>> for VNodeType {
    fn from(tag: Rc<str>) -> Self {
        VNodeType::Element(tag)
    }
}

impl From<Component> for VNodeType {
    fn from(component: Component) -> Self {
        VNodeType::Component(component)
    }
}

impl From<&Component> for VNodeType {
    fn from(component: &Component) -> Self {
        VNodeType::Component(component.clone())
    }
}

/// Identity key used by the keyed diff.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum VNodeKey {
    /// String key.
    Str(Rc<str>),
    /// Integer key.
    Int(i64),
}

impl From<&Value> for VNodeKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Str(s) => VNodeKey::Str(s.clone()),
            other => match other.as_int() {
                Some(i) => VNodeKey::Int(i),
                None => VNodeKey::Str(other.to_string().into()),
            },
        }
    }
}

impl From<&str> for VNodeKey {
    fn from(key: &str) -> Self {
        VNodeKey::Str(key.into())
    }
}

impl From<i64> for VNodeKey {
    fn from(key: i64) -> Self {
        VNodeKey::Int(key)
    }
}

/// Ordered prop map.
#[derive(Clone, Default)]
pub struct Props(FastIndexMap<Rc<str>, Value>);

impl Props {
    /// Empty props.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one prop.
    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value of one prop.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the prop is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Props in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.0.iter()
    }

    /// Number of props.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no props.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Build [`Props`] from `key => value` pairs.
///
/// ```ignore
/// let props = props! { "id" => "main", "onClick" => handler };
/// ```
#[macro_export]
macro_rules! props {
    () => { $crate::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $( props.insert($key, $value); )+
        props
    }};
}

/// A slot body.
pub type SlotFn = Rc<dyn Fn() -> VNode>;

/// Named slot table passed as a component's children.
#[derive(Clone, Default)]
pub struct Slots(Rc<FastIndexMap<Rc<str>, SlotFn>>);

impl Slots {
    /// No slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only a `default` slot.
    pub fn default_slot(f: impl Fn() -> VNode + 'static) -> Self {
        Self::new().slot("default", f)
    }

    /// Builder: add a named slot.
    pub fn slot(mut self, name: impl Into<Rc<str>>, f: impl Fn() -> VNode + 'static) -> Self {
        Rc::make_mut(&mut self.0).insert(name.into(), Rc::new(f));
        self
    }

    /// The slot body registered under `name`.
    pub fn get(&self, name: &str) -> Option<SlotFn> {
        self.0.get(name).cloned()
    }

    /// Render the slot registered under `name`.
    pub fn render(&self, name: &str) -> Option<VNode> {
        self.get(name).map(|f| f())
    }

    /// Whether a slot named `name` exists.
    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Slots) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}

/// Normalized vnode children.
#[derive(Clone, Default, Debug)]
pub enum Children {
    /// No children.
    #[default]
    None,
    /// Text content.
    Text(Rc<str>),
    /// Child vnodes.
    List(Vec<VNode>),
    /// Component slots.
    Slots(Slots),
}

impl Children {
    /// Child list, or an empty slice.
    pub fn as_list(&self) -> &[VNode] {
        match self {
            Children::List(list) => list,
            _ => &[],
        }
    }

    /// Text content, if text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<()> for Children {
    fn from(_: ()) -> Self {
        Children::None
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(text.into())
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(text.into())
    }
}

impl From<Rc<str>> for Children {
    fn from(text: Rc<str>) -> Self {
        Children::Text(text)
    }
}

/// Values render as their text; null renders nothing.
impl From<Value> for Children {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Children::None,
            Value::Slots(slots) => Children::Slots(slots),
            other => Children::Text(other.to_string().into()),
        }
    }
}

impl From<Vec<VNode>> for Children {
    fn from(list: Vec<VNode>) -> Self {
        Children::List(list)
    }
}

impl<const N: usize> From<[VNode; N]> for Children {
    fn from(list: [VNode; N]) -> Self {
        Children::List(list.into())
    }
}

impl From<VNode> for Children {
    fn from(child: VNode) -> Self {
        Children::List(vec![child])
    }
}

impl From<Slots> for Children {
    fn from(slots: Slots) -> Self {
        Children::Slots(slots)
    }
}

struct VNodeInner {
    kind: VNodeType,
    props: Option<Props>,
    children: Children,
    key: Option<VNodeKey>,
    ref_binding: Option<Value>,
    patch_flag: PatchFlags,
    dynamic_props: Vec<Rc<str>>,
    shape_flag: Cell<ShapeFlags>,
    el: Cell<Option<HostNode>>,
    anchor: Cell<Option<HostNode>>,
    target: Cell<Option<HostNode>>,
    component: RefCell<Option<ComponentInstance>>,
    dynamic_children: RefCell<Option<Vec<VNode>>>,
    transition: RefCell<Option<TransitionHooks>>,
}

/// Virtual node handle.
#[derive(Clone)]
pub struct VNode(Rc<VNodeInner>);

impl VNode {
    /// Type tag.
    pub fn kind(&self) -> &VNodeType {
        &self.0.kind
    }

    /// Props, without `key` and `ref`.
    pub fn props(&self) -> Option<&Props> {
        self.0.props.as_ref()
    }

    /// One prop, or null.
    pub fn prop(&self, key: &str) -> Value {
        self.props()
            .and_then(|props| props.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Children.
    pub fn children(&self) -> &Children {
        &self.0.children
    }

    /// Diff key.
    pub fn key(&self) -> Option<&VNodeKey> {
        self.0.key.as_ref()
    }

    /// The `ref` prop, bound to the mounted node or instance.
    pub fn ref_binding(&self) -> Option<&Value> {
        self.0.ref_binding.as_ref()
    }

    /// Shape bits.
    pub fn shape_flag(&self) -> ShapeFlags {
        self.0.shape_flag.get()
    }

    pub(crate) fn insert_shape_flag(&self, flag: ShapeFlags) {
        self.0.shape_flag.set(self.shape_flag() | flag);
    }

    pub(crate) fn remove_shape_flag(&self, flag: ShapeFlags) {
        self.0.shape_flag.set(self.shape_flag() - flag);
    }

    /// Patch hint.
    pub fn patch_flag(&self) -> PatchFlags {
        self.0.patch_flag
    }

    /// Props named dynamic by [`PatchFlags::PROPS`].
    pub fn dynamic_props(&self) -> &[Rc<str>] {
        &self.0.dynamic_props
    }

    /// Realized host node: the element, text or comment node, a fragment's
    /// start marker, a teleport's placeholder, or a component's root.
    pub fn el(&self) -> Option<HostNode> {
        self.0.el.get()
    }

    pub(crate) fn set_el(&self, el: Option<HostNode>) {
        self.0.el.set(el);
    }

    /// End marker of a fragment (a teleport's placeholder).
    pub fn anchor(&self) -> Option<HostNode> {
        self.0.anchor.get()
    }

    pub(crate) fn set_anchor(&self, anchor: Option<HostNode>) {
        self.0.anchor.set(anchor);
    }

    /// Container a teleport's children live in.
    pub fn target(&self) -> Option<HostNode> {
        self.0.target.get()
    }

    pub(crate) fn set_target(&self, target: Option<HostNode>) {
        self.0.target.set(target);
    }

    /// Instance backing a component vnode.
    pub fn component(&self) -> Option<ComponentInstance> {
        self.0.component.borrow().clone()
    }

    pub(crate) fn set_component(&self, instance: Option<ComponentInstance>) {
        *self.0.component.borrow_mut() = instance;
    }

    /// Dynamic descendants collected by a block.
    pub fn dynamic_children(&self) -> Option<Vec<VNode>> {
        self.0.dynamic_children.borrow().clone()
    }

    /// Enter/leave hooks.
    pub fn transition(&self) -> Option<TransitionHooks> {
        self.0.transition.borrow().clone()
    }

    /// Attach enter/leave hooks.
    pub fn set_transition(&self, hooks: Option<TransitionHooks>) {
        *self.0.transition.borrow_mut() = hooks;
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("VNode");
        debug.field("type", self.kind());
        if let Some(key) = self.key() {
            debug.field("key", key);
        }
        debug.field("children", self.children()).finish()
    }
}

/// Same-node rule: equal type and equal key.
pub fn is_same_vnode(a: &VNode, b: &VNode) -> bool {
    a.kind().same(b.kind()) && a.key() == b.key()
}

thread_local! {
    static BLOCK_STACK: RefCell<Vec<Vec<VNode>>> = const { RefCell::new(Vec::new()) };
}

/// Start collecting dynamic vnodes into a new block.
pub fn open_block() {
    BLOCK_STACK.with(|stack| stack.borrow_mut().push(Vec::new()));
}

/// Discard the innermost block.
pub fn close_block() {
    BLOCK_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

fn track_in_block(vnode: &VNode) {
    BLOCK_STACK.with(|stack| {
        if let Some(block) = stack.borrow_mut().last_mut() {
            block.push(vnode.clone());
        }
    });
}

/// Make `vnode` the root of the innermost block: it takes the collected
/// list as its dynamic children, the block is closed, and `vnode` joins the
/// enclosing block (if any) as a dynamic node itself.
pub fn setup_block(vnode: VNode) -> VNode {
    let collected = BLOCK_STACK.with(|stack| stack.borrow_mut().pop());
    *vnode.0.dynamic_children.borrow_mut() = Some(collected.unwrap_or_default());
    track_in_block(&vnode);
    vnode
}

/// Create an element that roots the innermost open block.
pub fn create_element_block(
    tag: &str,
    props: Option<Props>,
    children: impl Into<Children>,
    patch_flag: PatchFlags,
    dynamic_props: Vec<Rc<str>>,
) -> VNode {
    let vnode = build_vnode(
        tag.into(),
        props,
        children.into(),
        patch_flag,
        dynamic_props,
        true,
    );
    setup_block(vnode)
}

/// Create a vnode, classifying its shape and normalizing its children.
pub fn create_vnode(kind: VNodeType, props: Option<Props>, children: Children) -> VNode {
    build_vnode(kind, props, children, PatchFlags::empty(), Vec::new(), false)
}

/// [`create_vnode`] with a patch hint and the list of dynamic prop names.
pub fn create_vnode_with_flags(
    kind: VNodeType,
    props: Option<Props>,
    children: Children,
    patch_flag: PatchFlags,
    dynamic_props: Vec<Rc<str>>,
) -> VNode {
    build_vnode(kind, props, children, patch_flag, dynamic_props, false)
}

fn build_vnode(
    kind: VNodeType,
    mut props: Option<Props>,
    children: Children,
    patch_flag: PatchFlags,
    dynamic_props: Vec<Rc<str>>,
    is_block_root: bool,
) -> VNode {
    let key = props
        .as_mut()
        .and_then(|props| props.take("key"))
        .map(|value| VNodeKey::from(&value));
    let ref_binding = props.as_mut().and_then(|props| props.take("ref"));

    let mut shape = match &kind {
        VNodeType::Element(_) => ShapeFlags::ELEMENT,
        VNodeType::Teleport => ShapeFlags::TELEPORT,
        VNodeType::Component(component) if component.is_functional() => {
            ShapeFlags::FUNCTIONAL_COMPONENT
        }
        VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
        VNodeType::Text | VNodeType::Comment | VNodeType::Fragment => ShapeFlags::empty(),
    };
    let children = match (children, &kind) {
        // Fragment and teleport content is always a list.
        (Children::Text(content), VNodeType::Fragment | VNodeType::Teleport) => {
            Children::List(vec![text(content)])
        }
        (children, _) => children,
    };
    shape |= match &children {
        Children::None => ShapeFlags::empty(),
        Children::Text(_) => ShapeFlags::TEXT_CHILDREN,
        Children::List(_) => ShapeFlags::ARRAY_CHILDREN,
        Children::Slots(_) => ShapeFlags::SLOTS_CHILDREN,
    };

    let vnode = VNode(Rc::new(VNodeInner {
        kind,
        props,
        children,
        key,
        ref_binding,
        patch_flag,
        dynamic_props,
        shape_flag: Cell::new(shape),
        el: Cell::new(None),
        anchor: Cell::new(None),
        target: Cell::new(None),
        component: RefCell::new(None),
        dynamic_children: RefCell::new(None),
        transition: RefCell::new(None),
    }));
    if !is_block_root && (!patch_flag.is_empty() || shape.intersects(ShapeFlags::COMPONENT)) {
        track_in_block(&vnode);
    }
    vnode
}

/// Hyperscript helper: `h("div", props! { "id" => "a" }, "text")`.
pub fn h(
    kind: impl Into<VNodeType>,
    props: impl Into<Option<Props>>,
    children: impl Into<Children>,
) -> VNode {
    create_vnode(kind.into(), props.into(), children.into())
}

/// Text vnode.
pub fn text(content: impl Into<Rc<str>>) -> VNode {
    create_vnode(VNodeType::Text, None, Children::Text(content.into()))
}

/// Comment vnode.
pub fn comment(content: impl Into<Rc<str>>) -> VNode {
    create_vnode(VNodeType::Comment, None, Children::Text(content.into()))
}

/// Fragment vnode.
pub fn fragment(props: impl Into<Option<Props>>, children: impl Into<Children>) -> VNode {
    create_vnode(VNodeType::Fragment, props.into(), children.into())
}

/// Teleport vnode rendering `children` into the container `to` resolves
/// to: a selector string or a [`Value::Node`].
pub fn teleport(to: impl Into<Value>, children: impl Into<Children>) -> VNode {
    create_vnode(
        VNodeType::Teleport,
        Some(Props::new().with("to", to)),
        children.into(),
    )
}
