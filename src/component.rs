//! Components: definitions, live instances, and the public instance view.
//!
//! A [`Component`] is an immutable definition built once and shared by
//! every vnode that renders it. Mounting a component vnode creates a
//! [`ComponentInstance`], which owns the reactive props, the effect scope
//! everything created during `setup` belongs to, and the render effect the
//! renderer installs.
//!
//! Render functions receive a [`PublicInstance`]. Reads through it resolve
//! `data` first, then props, then setup state, then the `$`-prefixed
//! built-ins (`$attrs`, `$slots`, `$props`, `$data`, `$el`).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::effect::{ReactiveEffect, untracked};
use crate::error::{Error, Result};
use crate::keep_alive::KeepAliveContext;
use crate::lifecycle::Hooks;
use crate::provide::Provides;
use crate::reactive::{Reactive, reactive, reactive_object};
use crate::refs::{ProxyRefs, proxy_refs};
use crate::renderer::RendererInternals;
use crate::scheduler::Job;
use crate::scope::EffectScope;
use crate::shape::ShapeFlags;
use crate::value::{Key, Object, Value, ValueAccess};
use crate::vnode::{Children, Props, Slots, VNode, VNodeType, comment, fragment, text};

/// Render function of a stateful component.
pub type RenderFn = Rc<dyn Fn(&PublicInstance) -> VNode>;

/// `setup` function: receives the reactive props and the setup context.
pub type SetupFn = Rc<dyn Fn(&Reactive, &SetupContext) -> SetupResult>;

/// Render function of a functional component: attrs and slots in, tree out.
pub type FunctionalFn = Rc<dyn Fn(&Object, &Slots) -> VNode>;

/// What `setup` hands back.
pub enum SetupResult {
    /// A render function, used instead of the definition's own.
    Render(RenderFn),
    /// State exposed to the render function through ref unwrapping.
    State(Value),
    /// Nothing.
    None,
}

impl SetupResult {
    /// Wrap a render closure.
    pub fn render(f: impl Fn(&PublicInstance) -> VNode + 'static) -> Self {
        SetupResult::Render(Rc::new(f))
    }

    /// Expose `state` (usually an object of refs) to the render function.
    pub fn state(state: impl Into<Value>) -> Self {
        SetupResult::State(state.into())
    }
}

enum ComponentKind {
    Stateful,
    Functional(FunctionalFn),
}

struct ComponentDef {
    name: Rc<str>,
    props: Vec<Rc<str>>,
    setup: Option<SetupFn>,
    data: Option<Value>,
    render: Option<RenderFn>,
    kind: ComponentKind,
}

/// Shared component definition. Equality is identity.
#[derive(Clone)]
pub struct Component(Rc<ComponentDef>);

impl Component {
    /// Start building a stateful component.
    pub fn builder(name: &str) -> ComponentBuilder {
        ComponentBuilder {
            name: name.into(),
            props: Vec::new(),
            setup: None,
            data: None,
            render: None,
        }
    }

    /// A functional component: no instance state, re-rendered whenever its
    /// parent re-renders it.
    pub fn functional(name: &str, f: impl Fn(&Object, &Slots) -> VNode + 'static) -> Self {
        Self(Rc::new(ComponentDef {
            name: name.into(),
            props: Vec::new(),
            setup: None,
            data: None,
            render: None,
            kind: ComponentKind::Functional(Rc::new(f)),
        }))
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared prop names; everything else passed in lands in attrs.
    pub fn declared_props(&self) -> &[Rc<str>] {
        &self.0.props
    }

    fn declares(&self, key: &str) -> bool {
        self.0.props.iter().any(|prop| &**prop == key)
    }

    fn declares_key(&self, key: &Key) -> bool {
        key.as_name().is_some_and(|name| self.declares(name))
    }

    /// Whether this is a functional component.
    pub fn is_functional(&self) -> bool {
        matches!(self.0.kind, ComponentKind::Functional(_))
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name())
    }
}

/// Builder for stateful components.
pub struct ComponentBuilder {
    name: Rc<str>,
    props: Vec<Rc<str>>,
    setup: Option<SetupFn>,
    data: Option<Value>,
    render: Option<RenderFn>,
}

impl ComponentBuilder {
    /// Declare props.
    pub fn props<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.props.extend(names.into_iter().map(Rc::from));
        self
    }

    /// Set the `setup` function.
    pub fn setup(
        mut self,
        f: impl Fn(&Reactive, &SetupContext) -> SetupResult + 'static,
    ) -> Self {
        self.setup = Some(Rc::new(f));
        self
    }

    /// Set the `data` option. It must be a [`Value::Func`] returning the
    /// initial state; anything else is reported and ignored at mount.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the render function used when `setup` does not return one.
    pub fn render(mut self, f: impl Fn(&PublicInstance) -> VNode + 'static) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    /// Finish the definition.
    pub fn build(self) -> Component {
        Component(Rc::new(ComponentDef {
            name: self.name,
            props: self.props,
            setup: self.setup,
            data: self.data,
            render: self.render,
            kind: ComponentKind::Stateful,
        }))
    }
}

thread_local! {
    static NEXT_UID: Cell<usize> = const { Cell::new(0) };
    static CURRENT_INSTANCE: RefCell<Option<ComponentInstance>> = const { RefCell::new(None) };
}

pub(crate) struct InstanceInner {
    uid: usize,
    def: Component,
    vnode: RefCell<VNode>,
    next: RefCell<Option<VNode>>,
    parent: Option<Weak<InstanceInner>>,
    props: Reactive,
    attrs: Object,
    slots: RefCell<Slots>,
    sub_tree: RefCell<Option<VNode>>,
    is_mounted: Cell<bool>,
    is_unmounted: Cell<bool>,
    hooks: RefCell<Hooks>,
    provides: RefCell<Rc<Provides>>,
    setup_state: RefCell<Option<ProxyRefs>>,
    data: RefCell<Option<Reactive>>,
    render: RefCell<Option<RenderFn>>,
    exposed: RefCell<Option<Value>>,
    scope: EffectScope,
    effect: RefCell<Option<Rc<ReactiveEffect<()>>>>,
    update: RefCell<Option<Job>>,
    keep_alive: RefCell<Option<KeepAliveContext>>,
    internals: Weak<dyn RendererInternals>,
}

/// A mounted component.
#[derive(Clone)]
pub struct ComponentInstance(Rc<InstanceInner>);

impl ComponentInstance {
    pub(crate) fn new(
        vnode: &VNode,
        parent: Option<&ComponentInstance>,
        internals: Weak<dyn RendererInternals>,
    ) -> Self {
        let VNodeType::Component(def) = vnode.kind() else {
            panic!("component instance created for a non-component vnode");
        };
        let uid = NEXT_UID.with(|next| next.replace(next.get() + 1));
        let provides = parent.map_or_else(Provides::root, ComponentInstance::provides);
        Self(Rc::new(InstanceInner {
            uid,
            def: def.clone(),
            vnode: RefCell::new(vnode.clone()),
            next: RefCell::new(None),
            parent: parent.map(|parent| Rc::downgrade(&parent.0)),
            props: reactive_object(Object::new()),
            attrs: Object::new(),
            slots: RefCell::new(Slots::new()),
            sub_tree: RefCell::new(None),
            is_mounted: Cell::new(false),
            is_unmounted: Cell::new(false),
            hooks: RefCell::new(Hooks::default()),
            provides: RefCell::new(provides),
            setup_state: RefCell::new(None),
            data: RefCell::new(None),
            render: RefCell::new(None),
            exposed: RefCell::new(None),
            scope: EffectScope::new(),
            effect: RefCell::new(None),
            update: RefCell::new(None),
            keep_alive: RefCell::new(None),
            internals,
        }))
    }

    /// Monotonic id, unique per thread.
    pub fn uid(&self) -> usize {
        self.0.uid
    }

    /// The definition this instance renders.
    pub fn component(&self) -> &Component {
        &self.0.def
    }

    /// The vnode currently representing this instance in its parent's tree.
    pub fn vnode(&self) -> VNode {
        self.0.vnode.borrow().clone()
    }

    pub(crate) fn set_vnode(&self, vnode: VNode) {
        *self.0.vnode.borrow_mut() = vnode;
    }

    pub(crate) fn set_next(&self, vnode: Option<VNode>) {
        *self.0.next.borrow_mut() = vnode;
    }

    pub(crate) fn take_next(&self) -> Option<VNode> {
        self.0.next.borrow_mut().take()
    }

    /// The parent instance, if still alive.
    pub fn parent(&self) -> Option<ComponentInstance> {
        self.0.parent.as_ref()?.upgrade().map(ComponentInstance)
    }

    /// Reactive declared props.
    pub fn props(&self) -> &Reactive {
        &self.0.props
    }

    /// Undeclared props passed by the parent.
    pub fn attrs(&self) -> &Object {
        &self.0.attrs
    }

    /// Current slot table.
    pub fn slots(&self) -> Slots {
        self.0.slots.borrow().clone()
    }

    /// Root vnode of the last render.
    pub fn sub_tree(&self) -> Option<VNode> {
        self.0.sub_tree.borrow().clone()
    }

    pub(crate) fn set_sub_tree(&self, tree: Option<VNode>) {
        *self.0.sub_tree.borrow_mut() = tree;
    }

    /// Whether the first render is in the host tree.
    pub fn is_mounted(&self) -> bool {
        self.0.is_mounted.get()
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.0.is_mounted.set(mounted);
    }

    /// Whether the instance has been torn down.
    pub fn is_unmounted(&self) -> bool {
        self.0.is_unmounted.get()
    }

    pub(crate) fn set_unmounted(&self) {
        self.0.is_unmounted.set(true);
    }

    /// Scope owning every effect created during setup and the render effect.
    pub fn scope(&self) -> &EffectScope {
        &self.0.scope
    }

    pub(crate) fn with_hooks<R>(&self, f: impl FnOnce(&mut Hooks) -> R) -> R {
        f(&mut self.0.hooks.borrow_mut())
    }

    pub(crate) fn provides(&self) -> Rc<Provides> {
        self.0.provides.borrow().clone()
    }

    pub(crate) fn set_provides(&self, provides: Rc<Provides>) {
        *self.0.provides.borrow_mut() = provides;
    }

    pub(crate) fn effect(&self) -> Option<Rc<ReactiveEffect<()>>> {
        self.0.effect.borrow().clone()
    }

    pub(crate) fn set_effect(&self, effect: Rc<ReactiveEffect<()>>, update: Job) {
        *self.0.effect.borrow_mut() = Some(effect);
        *self.0.update.borrow_mut() = Some(update);
    }

    pub(crate) fn update_job(&self) -> Option<Job> {
        self.0.update.borrow().clone()
    }

    pub(crate) fn keep_alive_context(&self) -> Option<KeepAliveContext> {
        self.0.keep_alive.borrow().clone()
    }

    pub(crate) fn set_keep_alive_context(&self, ctx: KeepAliveContext) {
        *self.0.keep_alive.borrow_mut() = Some(ctx);
    }

    pub(crate) fn internals(&self) -> Option<Rc<dyn RendererInternals>> {
        self.0.internals.upgrade()
    }

    /// What a template ref bound to this component receives: the exposed
    /// value if `expose` was called, else the public instance.
    pub fn ref_value(&self) -> Value {
        self.0
            .exposed
            .borrow()
            .clone()
            .unwrap_or_else(|| Value::Instance(self.public()))
    }

    /// The view render functions and template refs see.
    pub fn public(&self) -> PublicInstance {
        PublicInstance(Rc::downgrade(&self.0))
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ComponentInstance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.0))
    }

    /// Split the vnode's props into declared props and attrs, capture the
    /// slots, and run `setup` and `data`.
    pub(crate) fn setup(&self) {
        let vnode = self.vnode();
        self.assign_props(vnode.props());
        *self.0.slots.borrow_mut() = normalize_slots(vnode.children());
        if self.0.def.is_functional() {
            return;
        }

        let def = self.0.def.clone();
        if let Some(setup) = def.0.setup.clone() {
            let ctx = SetupContext {
                instance: Rc::downgrade(&self.0),
            };
            let result = self.0.scope.run(|| {
                let _current = CurrentInstanceGuard::new(Some(self.clone()));
                untracked(|| setup(&self.0.props, &ctx))
            });
            match result {
                SetupResult::Render(render) => *self.0.render.borrow_mut() = Some(render),
                SetupResult::State(state) => {
                    *self.0.setup_state.borrow_mut() = Some(proxy_refs(state));
                }
                SetupResult::None => {}
            }
        }

        if let Some(data) = &def.0.data {
            match data {
                Value::Func(factory) => {
                    let public = Value::Instance(self.public());
                    let state = untracked(|| reactive(factory.call(&[public])));
                    let state = match state {
                        Value::Reactive(state) => state,
                        _ => reactive_object(Object::new()),
                    };
                    *self.0.data.borrow_mut() = Some(state);
                }
                _ => warn!(
                    component = def.name(),
                    error = %Error::DataNotFunction,
                    "ignoring data option"
                ),
            }
        }

        if self.0.render.borrow().is_none() {
            *self.0.render.borrow_mut() = def.0.render.clone();
        }
        trace!(component = def.name(), uid = self.0.uid, "component set up");
    }

    fn assign_props(&self, raw: Option<&Props>) {
        let Some(raw) = raw else {
            return;
        };
        let target = self.0.props.to_raw();
        for (key, value) in raw.iter() {
            if self.0.def.declares(key) {
                target.set(Key::from(key), value.clone());
            } else {
                self.0.attrs.set(Key::from(key), value.clone());
            }
        }
    }

    /// Apply the props of a re-rendered vnode: changed declared props
    /// trigger, vanished ones are deleted.
    pub(crate) fn update_props(&self, raw: Option<&Props>) {
        let present = |key: &Key| {
            key.as_name()
                .is_some_and(|name| raw.is_some_and(|raw| raw.contains(name)))
        };
        if let Some(raw) = raw {
            for (key, value) in raw.iter() {
                if self.0.def.declares(key) {
                    self.0.props.set(Key::from(key), value.clone());
                } else {
                    self.0.attrs.set(Key::from(key), value.clone());
                }
            }
        }
        for key in self.0.props.to_raw().keys() {
            if !present(&key) {
                self.0.props.delete(key);
            }
        }
        for key in self.0.attrs.keys() {
            if !present(&key) {
                self.0.attrs.delete(&key);
            }
        }
    }

    pub(crate) fn update_slots(&self, children: &Children) {
        *self.0.slots.borrow_mut() = normalize_slots(children);
    }

    /// Produce the subtree for the next patch.
    pub(crate) fn render_root(&self) -> VNode {
        let tree = match &self.0.def.0.kind {
            ComponentKind::Functional(f) => f(&self.0.attrs, &self.slots()),
            ComponentKind::Stateful => {
                let render = self.0.render.borrow().clone();
                match render {
                    Some(render) => {
                        let _current = CurrentInstanceGuard::new(Some(self.clone()));
                        render(&self.public())
                    }
                    None => {
                        warn!(component = self.0.def.name(), "component is missing a render function");
                        comment("")
                    }
                }
            }
        };
        if let Some(hooks) = self.vnode().transition() {
            if tree.transition().is_none() {
                tree.set_transition(Some(hooks));
            }
        }
        tree
    }

    /// Drop everything that keeps other instances or vnodes alive.
    pub(crate) fn release(&self) {
        self.0.sub_tree.borrow_mut().take();
        self.0.next.borrow_mut().take();
        self.0.effect.borrow_mut().take();
        self.0.update.borrow_mut().take();
        self.0.render.borrow_mut().take();
        self.0.setup_state.borrow_mut().take();
        self.0.exposed.borrow_mut().take();
        self.0.keep_alive.borrow_mut().take();
        *self.0.hooks.borrow_mut() = Hooks::default();
    }
}

/// Non-owning instance handle for closures the instance itself keeps.
#[derive(Clone)]
pub(crate) struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub(crate) fn upgrade(&self) -> Option<ComponentInstance> {
        self.0.upgrade().map(ComponentInstance)
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.0.uid)
            .field("component", &self.0.def.name())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// Slot table of a component vnode. A child list or text becomes the
/// default slot.
fn normalize_slots(children: &Children) -> Slots {
    match children {
        Children::None => Slots::new(),
        Children::Slots(slots) => slots.clone(),
        Children::Text(content) => {
            let content = content.clone();
            Slots::default_slot(move || text(content.clone()))
        }
        Children::List(list) => {
            let list = list.clone();
            Slots::default_slot(move || fragment(None, list.clone()))
        }
    }
}

/// Whether a parent re-render must re-render the child: when it has slot
/// content, or any prop changed under strict equality.
pub(crate) fn should_update_component(prev: &VNode, next: &VNode) -> bool {
    if !matches!(next.children(), Children::None) {
        return true;
    }
    if next.shape_flag().contains(ShapeFlags::SLOTS_CHILDREN) {
        return true;
    }
    match (prev.props(), next.props()) {
        (None, None) => false,
        (Some(prev), None) => !prev.is_empty(),
        (None, Some(next)) => !next.is_empty(),
        (Some(prev), Some(next)) => {
            prev.len() != next.len()
                || next.iter().any(|(key, value)| {
                    prev.get(key).is_none_or(|old| !old.strict_eq(value))
                })
        }
    }
}

/// The instance whose `setup` (or hook, or render) is running.
pub fn current_instance() -> Option<ComponentInstance> {
    CURRENT_INSTANCE.with(|current| current.borrow().clone())
}

/// Makes an instance current until dropped.
pub(crate) struct CurrentInstanceGuard {
    previous: Option<ComponentInstance>,
}

impl CurrentInstanceGuard {
    pub(crate) fn new(instance: Option<ComponentInstance>) -> Self {
        let previous = CURRENT_INSTANCE.with(|current| current.replace(instance));
        Self { previous }
    }
}

impl Drop for CurrentInstanceGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = CURRENT_INSTANCE.try_with(|current| current.replace(previous));
    }
}

/// Second argument of `setup`.
#[derive(Clone)]
pub struct SetupContext {
    instance: Weak<InstanceInner>,
}

impl SetupContext {
    fn instance(&self) -> Option<ComponentInstance> {
        self.instance.upgrade().map(ComponentInstance)
    }

    /// Undeclared props.
    pub fn attrs(&self) -> Object {
        self.instance()
            .map(|instance| instance.attrs().clone())
            .unwrap_or_default()
    }

    /// Current slots. Read at render time; the table is replaced whenever
    /// the parent re-renders.
    pub fn slots(&self) -> Slots {
        self.instance()
            .map(|instance| instance.slots())
            .unwrap_or_default()
    }

    /// Call the parent's `on<Event>` handler with `args`.
    pub fn emit(&self, event: &str, args: &[Value]) {
        let Some(instance) = self.instance() else {
            return;
        };
        let handler_name = handler_key(event);
        match instance.vnode().prop(&handler_name) {
            Value::Func(handler) => {
                handler.call(args);
            }
            _ => trace!(event, "emit without a listener"),
        }
    }

    /// Replace what template refs to this component receive.
    pub fn expose(&self, value: impl Into<Value>) {
        if let Some(instance) = self.instance() {
            *instance.0.exposed.borrow_mut() = Some(value.into());
        }
    }
}

/// `change` becomes `onChange`.
fn handler_key(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_owned(),
    }
}

/// The proxy-like view of an instance handed to render functions.
#[derive(Clone)]
pub struct PublicInstance(Weak<InstanceInner>);

impl PublicInstance {
    /// The instance, if still alive.
    pub fn instance(&self) -> Option<ComponentInstance> {
        self.0.upgrade().map(ComponentInstance)
    }

    /// Tracked read: data, then props, then setup state, then built-ins.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        let Some(inner) = self.0.upgrade() else {
            return Value::Null;
        };
        let data = inner.data.borrow().clone();
        if let Some(data) = data {
            if data.to_raw().contains(&key) {
                return data.get(key);
            }
        }
        if inner.props.to_raw().contains(&key) || inner.def.declares_key(&key) {
            return inner.props.get(key);
        }
        let state = inner.setup_state.borrow().clone();
        if let Some(state) = state {
            if state.has(key.clone()) {
                return state.get(key);
            }
        }
        match key.as_name() {
            Some("$") => Value::Instance(self.clone()),
            Some("$attrs") => Value::Object(inner.attrs.clone()),
            Some("$slots") => Value::Slots(inner.slots.borrow().clone()),
            Some("$props") => Value::Reactive(inner.props.clone()),
            Some("$data") => inner.data.borrow().clone().map_or(Value::Null, Value::Reactive),
            Some("$el") => inner
                .sub_tree
                .borrow()
                .as_ref()
                .and_then(VNode::el)
                .map_or(Value::Null, Value::Node),
            _ => Value::Null,
        }
    }

    /// Write through to data or setup state. Props are readonly.
    pub fn try_set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let Some(inner) = self.0.upgrade() else {
            return Ok(());
        };
        let data = inner.data.borrow().clone();
        if let Some(data) = data {
            if data.to_raw().contains(&key) {
                data.set(key, value);
                return Ok(());
            }
        }
        if inner.props.to_raw().contains(&key) || inner.def.declares_key(&key) {
            return Err(Error::ReadonlyProp(key.to_string()));
        }
        let state = inner.setup_state.borrow().clone();
        if let Some(state) = state {
            if state.has(key.clone()) {
                state.set(key, value);
            }
        }
        Ok(())
    }

    /// Like [`try_set`](Self::try_set), reporting a rejected write with a
    /// warning and `false`.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        match self.try_set(key, value) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "rejected write through public instance");
                false
            }
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &PublicInstance) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl ValueAccess for PublicInstance {
    fn get_key(&self, key: &Key) -> Value {
        self.get(key.clone())
    }

    fn set_key(&self, key: &Key, value: Value) -> bool {
        self.set(key.clone(), value)
    }

    fn has_key(&self, key: &Key) -> bool {
        let Some(inner) = self.0.upgrade() else {
            return false;
        };
        let in_data = inner
            .data
            .borrow()
            .as_ref()
            .is_some_and(|data| data.to_raw().contains(key));
        let in_state = inner
            .setup_state
            .borrow()
            .as_ref()
            .is_some_and(|state| state.has(key.clone()));
        in_data || in_state || inner.props.to_raw().contains(key) || inner.def.declares_key(key)
    }
}

impl fmt::Debug for PublicInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance() {
            Some(instance) => write!(f, "PublicInstance({})", instance.component().name()),
            None => f.write_str("PublicInstance(<dropped>)"),
        }
    }
}
