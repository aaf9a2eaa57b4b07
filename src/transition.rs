//! Enter/leave transitions.
//!
//! The reconciler calls `before_enter(el)` before inserting an element and
//! `enter(el, done)` right after. On removal it hands the element to
//! `leave(el, done)`; the element is only detached once `done` is called.
//!
//! With [`TransitionClasses`] attached the element also walks through the
//! `from`, `active` and `to` classes of each phase. The `from` class is
//! swapped for the `to` class on the host's next frame, and the `active`
//! and `to` classes come off when the phase finishes. A user `enter` or
//! `leave` hook owns its `done`; without one, the host's transition-end
//! signal finishes the phase.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::component::{Component, SetupResult};
use crate::host::HostNode;
use crate::value::{Callback, Value};
use crate::vnode::{VNode, comment};

const DEFAULT_NAME: &str = "v";

/// Host operations an animated enter or leave needs.
pub(crate) trait TransitionTarget {
    fn add_class(&self, el: HostNode, class: &str);
    fn remove_class(&self, el: HostNode, class: &str);
    fn next_frame(&self, f: Box<dyn FnOnce()>);
    fn on_transition_end(&self, el: HostNode, f: Box<dyn FnOnce()>);
}

/// Finishes an enter or leave phase.
///
/// Clones share one finishing step, which runs on the first call only.
#[derive(Clone)]
pub struct TransitionDone(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl TransitionDone {
    /// Wrap the finishing step.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// Finish the phase.
    pub fn finish(&self) {
        let step = self.0.borrow_mut().take();
        if let Some(step) = step {
            step();
        }
    }

    /// Whether [`finish`](Self::finish) was called.
    pub fn is_finished(&self) -> bool {
        self.0.borrow().is_none()
    }

    fn into_callback(self) -> Value {
        Value::Func(Callback::new(move |_| {
            self.finish();
            Value::Null
        }))
    }
}

impl fmt::Debug for TransitionDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransitionDone")
            .field(&self.is_finished())
            .finish()
    }
}

/// Class names applied while an element enters and leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionClasses {
    /// Added before insertion, swapped out on the next frame.
    pub enter_from: Rc<str>,
    /// Present for the whole enter phase.
    pub enter_active: Rc<str>,
    /// Added on the frame after insertion, removed when enter finishes.
    pub enter_to: Rc<str>,
    /// Added when leave starts, swapped out on the next frame.
    pub leave_from: Rc<str>,
    /// Present for the whole leave phase.
    pub leave_active: Rc<str>,
    /// Added on the frame after leave starts.
    pub leave_to: Rc<str>,
}

impl TransitionClasses {
    /// `{name}-enter-from`, `{name}-enter-active`, and so on.
    pub fn from_name(name: &str) -> Self {
        let class = |suffix: &str| -> Rc<str> { format!("{name}-{suffix}").into() };
        Self {
            enter_from: class("enter-from"),
            enter_active: class("enter-active"),
            enter_to: class("enter-to"),
            leave_from: class("leave-from"),
            leave_active: class("leave-active"),
            leave_to: class("leave-to"),
        }
    }

    /// Classes named by the `name` prop (default `v`), with any of the
    /// `enterFromClass` .. `leaveToClass` props taking precedence.
    fn from_props(get: &impl Fn(&str) -> Value) -> Self {
        let name = get("name");
        let mut classes = Self::from_name(name.as_str().unwrap_or(DEFAULT_NAME));
        let overrides = [
            ("enterFromClass", &mut classes.enter_from),
            ("enterActiveClass", &mut classes.enter_active),
            ("enterToClass", &mut classes.enter_to),
            ("leaveFromClass", &mut classes.leave_from),
            ("leaveActiveClass", &mut classes.leave_active),
            ("leaveToClass", &mut classes.leave_to),
        ];
        for (prop, slot) in overrides {
            let value = get(prop);
            if let Some(class) = value.as_str() {
                *slot = class.into();
            }
        }
        classes
    }
}

impl Default for TransitionClasses {
    fn default() -> Self {
        Self::from_name(DEFAULT_NAME)
    }
}

/// Hooks attached to an element vnode.
#[derive(Clone, Default)]
pub struct TransitionHooks {
    /// Before the element is inserted.
    pub before_enter: Option<Rc<dyn Fn(HostNode)>>,
    /// After the element is inserted; the enter phase ends with `done`.
    pub enter: Option<Rc<dyn Fn(HostNode, TransitionDone)>>,
    /// Before the element is removed; removal waits for `done`.
    pub leave: Option<Rc<dyn Fn(HostNode, TransitionDone)>>,
    /// Classes stepped through during each phase.
    pub classes: Option<TransitionClasses>,
}

impl TransitionHooks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the before-enter hook.
    pub fn before_enter(mut self, f: impl Fn(HostNode) + 'static) -> Self {
        self.before_enter = Some(Rc::new(f));
        self
    }

    /// Set the enter hook.
    pub fn enter(mut self, f: impl Fn(HostNode, TransitionDone) + 'static) -> Self {
        self.enter = Some(Rc::new(f));
        self
    }

    /// Set the leave hook.
    pub fn leave(mut self, f: impl Fn(HostNode, TransitionDone) + 'static) -> Self {
        self.leave = Some(Rc::new(f));
        self
    }

    /// Step through `classes` on enter and leave.
    pub fn classes(mut self, classes: TransitionClasses) -> Self {
        self.classes = Some(classes);
        self
    }

    /// Whether removal has to wait for a leave phase.
    pub(crate) fn has_leave(&self) -> bool {
        self.leave.is_some() || self.classes.is_some()
    }

    pub(crate) fn call_before_enter(&self, target: &Weak<dyn TransitionTarget>, el: HostNode) {
        if let Some(hook) = &self.before_enter {
            hook(el);
        }
        if let (Some(classes), Some(host)) = (&self.classes, target.upgrade()) {
            host.add_class(el, &classes.enter_from);
            host.add_class(el, &classes.enter_active);
        }
    }

    pub(crate) fn call_enter(&self, target: &Weak<dyn TransitionTarget>, el: HostNode) {
        let done = match &self.classes {
            Some(classes) => {
                let target = target.clone();
                let classes = classes.clone();
                TransitionDone::new(move || {
                    if let Some(host) = target.upgrade() {
                        host.remove_class(el, &classes.enter_to);
                        host.remove_class(el, &classes.enter_active);
                    }
                })
            }
            None => TransitionDone::new(|| {}),
        };
        if let Some(hook) = &self.enter {
            hook(el, done.clone());
        }
        if let Some(classes) = &self.classes {
            swap_on_next_frame(
                target,
                el,
                classes.enter_from.clone(),
                classes.enter_to.clone(),
                done,
                self.enter.is_none(),
            );
        }
    }

    /// Start the leave phase; `remove` runs once it finishes, immediately
    /// when there is nothing to wait for.
    pub(crate) fn call_leave(
        &self,
        target: &Weak<dyn TransitionTarget>,
        el: HostNode,
        remove: impl FnOnce() + 'static,
    ) {
        let done = match &self.classes {
            Some(classes) => {
                let target = target.clone();
                let classes = classes.clone();
                TransitionDone::new(move || {
                    if let Some(host) = target.upgrade() {
                        host.remove_class(el, &classes.leave_active);
                        host.remove_class(el, &classes.leave_to);
                    }
                    remove();
                })
            }
            None => TransitionDone::new(remove),
        };
        match &self.leave {
            Some(hook) => hook(el, done.clone()),
            None if self.classes.is_none() => done.finish(),
            None => {}
        }
        let Some(classes) = &self.classes else {
            return;
        };
        if done.is_finished() {
            return;
        }
        if let Some(host) = target.upgrade() {
            host.add_class(el, &classes.leave_from);
            host.add_class(el, &classes.leave_active);
        }
        swap_on_next_frame(
            target,
            el,
            classes.leave_from.clone(),
            classes.leave_to.clone(),
            done,
            self.leave.is_none(),
        );
    }

    /// Hooks for the `Transition` component: the `onBeforeEnter`,
    /// `onEnter`, and `onLeave` callbacks found in `props`, plus the
    /// classes its naming props resolve to. `onEnter` and `onLeave`
    /// receive the element and a `done` callback.
    fn from_props(get: impl Fn(&str) -> Value) -> Self {
        let mut hooks = Self::new().classes(TransitionClasses::from_props(&get));
        if let Some(cb) = get("onBeforeEnter").as_func().cloned() {
            hooks = hooks.before_enter(move |el| {
                cb.call(&[Value::Node(el)]);
            });
        }
        if let Some(cb) = get("onEnter").as_func().cloned() {
            hooks = hooks.enter(move |el, done| {
                cb.call(&[Value::Node(el), done.into_callback()]);
            });
        }
        if let Some(cb) = get("onLeave").as_func().cloned() {
            hooks = hooks.leave(move |el, done| {
                cb.call(&[Value::Node(el), done.into_callback()]);
            });
        }
        hooks
    }
}

/// On the host's next frame swap `from` for `to`, or only drop `from` if
/// the phase already finished. When nothing else owns `done`, the host's
/// transition end finishes the phase.
fn swap_on_next_frame(
    target: &Weak<dyn TransitionTarget>,
    el: HostNode,
    from: Rc<str>,
    to: Rc<str>,
    done: TransitionDone,
    finish_on_end: bool,
) {
    let Some(host) = target.upgrade() else {
        return;
    };
    let target = target.clone();
    host.next_frame(Box::new(move || {
        let Some(host) = target.upgrade() else {
            return;
        };
        host.remove_class(el, &from);
        if done.is_finished() {
            return;
        }
        host.add_class(el, &to);
        if finish_on_end {
            host.on_transition_end(el, Box::new(move || done.finish()));
        }
    }));
}

impl fmt::Debug for TransitionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionHooks")
            .field("before_enter", &self.before_enter.is_some())
            .field("enter", &self.enter.is_some())
            .field("leave", &self.leave.is_some())
            .field("classes", &self.classes)
            .finish()
    }
}

thread_local! {
    static TRANSITION: Component = build_transition();
}

/// The `Transition` component: renders its default slot with enter/leave
/// hooks taken from its props.
///
/// `name` (default `v`) names the classes, and `enterFromClass`,
/// `enterActiveClass`, `enterToClass`, `leaveFromClass`,
/// `leaveActiveClass` and `leaveToClass` override single ones.
/// `onBeforeEnter`, `onEnter`, and `onLeave` are called with the element;
/// the last two also get `done`.
pub fn transition() -> Component {
    TRANSITION.with(Clone::clone)
}

fn build_transition() -> Component {
    Component::builder("Transition")
        .props([
            "name",
            "enterFromClass",
            "enterActiveClass",
            "enterToClass",
            "leaveFromClass",
            "leaveActiveClass",
            "leaveToClass",
            "onBeforeEnter",
            "onEnter",
            "onLeave",
        ])
        .setup(|props, ctx| {
            let props = props.clone();
            let slots = ctx.clone();
            SetupResult::render(move |_| {
                let Some(child) = slots.slots().render("default") else {
                    return comment("");
                };
                child.set_transition(Some(TransitionHooks::from_props(|key| props.get(key))));
                child
            })
        })
        .build()
}

/// Attach `hooks` to `vnode` and return it.
pub fn with_transition(vnode: VNode, hooks: TransitionHooks) -> VNode {
    vnode.set_transition(Some(hooks));
    vnode
}
