//! Dependency injection down the component tree.
//!
//! Every instance starts out sharing its parent's provides table. The first
//! [`provide`] in a component replaces that with a fresh table chained to
//! the parent's, so values provided below never leak upwards. [`inject`]
//! reads from the parent's table and walks the chain.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::current_instance;
use crate::hash::FastHashMap;
use crate::value::Value;

/// One link of the provides chain.
#[derive(Default)]
pub(crate) struct Provides {
    parent: Option<Rc<Provides>>,
    values: RefCell<FastHashMap<Rc<str>, Value>>,
}

impl Provides {
    pub(crate) fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn child_of(parent: Rc<Provides>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(parent),
            values: RefCell::default(),
        })
    }

    pub(crate) fn insert(&self, key: Rc<str>, value: Value) {
        self.values.borrow_mut().insert(key, value);
    }

    pub(crate) fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(key) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(key))
    }
}

/// Make `value` available to every descendant of the current component.
pub fn provide(key: impl Into<Rc<str>>, value: impl Into<Value>) {
    let key = key.into();
    let Some(instance) = current_instance() else {
        tracing::warn!(key = %key, "provide() called outside of component setup");
        return;
    };
    let own = instance.provides();
    let inherited = instance.parent().map(|parent| parent.provides());
    let table = match inherited {
        Some(parent) if Rc::ptr_eq(&own, &parent) => {
            let table = Provides::child_of(parent);
            instance.set_provides(table.clone());
            table
        }
        _ => own,
    };
    table.insert(key, value.into());
}

/// The closest ancestor's value for `key`, or `default`.
pub fn inject(key: &str, default: impl Into<Value>) -> Value {
    let Some(instance) = current_instance() else {
        tracing::warn!(key, "inject() called outside of component setup");
        return default.into();
    };
    instance
        .parent()
        .and_then(|parent| parent.provides().lookup(key))
        .unwrap_or_else(|| default.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_chain_and_child_shadows() {
        let root = Provides::root();
        root.insert("theme".into(), Value::from("dark"));
        root.insert("lang".into(), Value::from("en"));
        let child = Provides::child_of(root.clone());
        child.insert("theme".into(), Value::from("light"));

        assert_eq!(child.lookup("theme"), Some(Value::from("light")));
        assert_eq!(child.lookup("lang"), Some(Value::from("en")));
        assert_eq!(root.lookup("theme"), Some(Value::from("dark")));
        assert_eq!(child.lookup("missing"), None);
    }

    #[test]
    fn outside_setup_inject_returns_default() {
        assert_eq!(inject("anything", 7), Value::Int(7));
    }
}
