//! Components whose definition is loaded on demand.
//!
//! [`define_async_component`] returns a wrapper component. The first time
//! one is set up it calls the loader with an [`AsyncResolver`]; the loader
//! settles it, now or later, with the real component or an error. Until
//! then the wrapper renders the loading component (or an empty `div`);
//! afterwards the loaded component, with the wrapper's attrs and slots
//! passed through, or the error component.
//!
//! A failure goes to `on_error` when one is configured, together with a
//! retry handle that runs the loader again and a fail handle that gives
//! up. The load state is shared by every instance of the wrapper.
//!
//! `delay` and `timeout` need a timer from the host
//! ([`AsyncComponentOptions::timer`]). The wrapper keeps rendering the
//! placeholder for `delay` before switching to the loading component, and
//! fails with [`Error::Timeout`] when nothing settled within `timeout`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{trace, warn};

use crate::component::{Component, SetupResult};
use crate::error::Error;
use crate::refs::Ref;
use crate::value::Value;
use crate::vnode::{Children, Props, create_vnode, h};

/// Error handler: the error, a retry handle, a fail handle, and the number
/// of attempts made so far.
pub type AsyncErrorHandler = Rc<dyn Fn(&Error, AsyncRetry, AsyncFail, u32)>;

/// Runs a callback once a duration has elapsed.
pub type AsyncTimer = Rc<dyn Fn(Duration, Box<dyn FnOnce()>)>;

/// Loader configuration.
pub struct AsyncComponentOptions {
    loader: Rc<dyn Fn(AsyncResolver)>,
    loading_component: Option<Component>,
    error_component: Option<Component>,
    on_error: Option<AsyncErrorHandler>,
    delay: Option<Duration>,
    timeout: Option<Duration>,
    timer: Option<AsyncTimer>,
}

impl AsyncComponentOptions {
    /// Options around `loader`.
    pub fn new(loader: impl Fn(AsyncResolver) + 'static) -> Self {
        Self {
            loader: Rc::new(loader),
            loading_component: None,
            error_component: None,
            on_error: None,
            delay: None,
            timeout: None,
            timer: None,
        }
    }

    /// Rendered while the loader is pending.
    pub fn loading_component(mut self, component: Component) -> Self {
        self.loading_component = Some(component);
        self
    }

    /// Rendered after a failure, with the message as its `error` prop.
    pub fn error_component(mut self, component: Component) -> Self {
        self.error_component = Some(component);
        self
    }

    /// Called on every failure instead of giving up right away.
    pub fn on_error(mut self, f: impl Fn(&Error, AsyncRetry, AsyncFail, u32) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    /// Keep the placeholder up this long before showing the loading
    /// component.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay).filter(|delay| !delay.is_zero());
        self
    }

    /// Fail if the loader has not settled after this long.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timer used for `delay` and `timeout`.
    pub fn timer(mut self, timer: impl Fn(Duration, Box<dyn FnOnce()>) + 'static) -> Self {
        self.timer = Some(Rc::new(timer));
        self
    }
}

struct LoadState {
    options: AsyncComponentOptions,
    resolved: RefCell<Option<Component>>,
    started: Cell<bool>,
    attempts: Cell<u32>,
    // Reactive mirrors of the outcome, read by the wrapper's render.
    loaded: Ref,
    error: Ref,
    delayed: Ref,
}

impl LoadState {
    /// Arm the delay and timeout timers.
    fn arm_timers(self: &Rc<Self>) {
        let (delay, timeout) = (self.options.delay, self.options.timeout);
        if delay.is_none() && timeout.is_none() {
            return;
        }
        let Some(timer) = self.options.timer.clone() else {
            warn!("async component: delay and timeout need a timer; ignoring them");
            return;
        };
        if let Some(delay) = delay {
            self.delayed.set(true);
            let state = Rc::downgrade(self);
            timer(
                delay,
                Box::new(move || {
                    if let Some(state) = state.upgrade() {
                        state.delayed.set(false);
                    }
                }),
            );
        }
        if let Some(timeout) = timeout {
            let state = Rc::downgrade(self);
            timer(
                timeout,
                Box::new(move || {
                    let Some(state) = state.upgrade() else {
                        return;
                    };
                    if !state.loaded.get().truthy() && state.error.get().is_null() {
                        state.fail(&Error::Timeout(timeout));
                    }
                }),
            );
        }
    }

    fn start(self: &Rc<Self>) {
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);
        self.started.set(true);
        trace!(attempt, "async component: loading");
        let resolver = AsyncResolver {
            state: Rc::downgrade(self),
            settled: Rc::new(Cell::new(false)),
        };
        (self.options.loader)(resolver);
    }

    fn fail(&self, err: &Error) {
        warn!(error = %err, "async component failed to load");
        self.error.set(err.to_string());
    }
}

/// Settles one loader attempt. Only the first call has an effect.
#[derive(Clone)]
pub struct AsyncResolver {
    state: Weak<LoadState>,
    settled: Rc<Cell<bool>>,
}

impl AsyncResolver {
    fn settle(&self) -> Option<Rc<LoadState>> {
        if self.settled.replace(true) {
            return None;
        }
        self.state.upgrade()
    }

    /// The load succeeded.
    pub fn resolve(&self, component: Component) {
        let Some(state) = self.settle() else {
            return;
        };
        *state.resolved.borrow_mut() = Some(component);
        state.delayed.set(false);
        state.error.set(Value::Null);
        state.loaded.set(true);
    }

    /// The load failed.
    pub fn reject(&self, message: impl Into<String>) {
        let Some(state) = self.settle() else {
            return;
        };
        let err = Error::Load(message.into());
        state.delayed.set(false);
        match state.options.on_error.clone() {
            Some(handler) => {
                let attempts = state.attempts.get();
                let retry = AsyncRetry(Rc::downgrade(&state));
                let fail = AsyncFail {
                    state: Rc::downgrade(&state),
                    err: err.clone(),
                };
                handler(&err, retry, fail, attempts);
            }
            None => state.fail(&err),
        }
    }
}

impl fmt::Debug for AsyncResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResolver")
            .field("settled", &self.settled.get())
            .finish()
    }
}

/// Runs the loader again.
pub struct AsyncRetry(Weak<LoadState>);

impl AsyncRetry {
    /// Start another attempt.
    pub fn retry(self) {
        if let Some(state) = self.0.upgrade() {
            state.start();
        }
    }
}

/// Gives up after a failure.
pub struct AsyncFail {
    state: Weak<LoadState>,
    err: Error,
}

impl AsyncFail {
    /// Show the error state.
    pub fn fail(self) {
        if let Some(state) = self.state.upgrade() {
            state.fail(&self.err);
        }
    }
}

/// Wrap a lazily loaded component.
pub fn define_async_component(options: AsyncComponentOptions) -> Component {
    let state = Rc::new(LoadState {
        options,
        resolved: RefCell::new(None),
        started: Cell::new(false),
        attempts: Cell::new(0),
        loaded: Ref::new(false),
        error: Ref::new(Value::Null),
        delayed: Ref::new(false),
    });

    Component::builder("AsyncComponentWrapper")
        .setup(move |_, ctx| {
            if !state.started.get() {
                state.arm_timers();
                state.start();
            }
            let state = state.clone();
            let ctx = ctx.clone();
            SetupResult::render(move |_| {
                let loaded = state.loaded.get().truthy();
                let error = state.error.get();
                let delayed = state.delayed.get().truthy();
                let resolved = state.resolved.borrow().clone();
                match resolved {
                    Some(component) if loaded => {
                        let mut props = Props::new();
                        for (key, value) in ctx.attrs().entries() {
                            props.insert(key.to_string(), value);
                        }
                        let slots = ctx.slots();
                        let children = if slots.is_empty() {
                            Children::None
                        } else {
                            Children::Slots(slots)
                        };
                        create_vnode(component.into(), Some(props), children)
                    }
                    _ => {
                        if !error.is_null() {
                            if let Some(component) = &state.options.error_component {
                                return h(component, Props::new().with("error", error), ());
                            }
                        }
                        match &state.options.loading_component {
                            Some(component) if error.is_null() && !delayed => {
                                h(component, None, ())
                            }
                            _ => h("div", None, ()),
                        }
                    }
                }
            })
        })
        .build()
}
