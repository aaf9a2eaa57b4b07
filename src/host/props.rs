//! Prop categories shared by element-tree hosts.
//!
//! A host that has classes, inline styles, event listeners, and attributes
//! implements [`PropTarget`] and forwards [`Host::patch_prop`] to
//! [`patch_prop`]:
//!
//! - `class`: assigned directly, null clears it
//! - `style`: an object of properties; keys present before but missing (or
//!   null) now are cleared one by one
//! - `on<Event>`: one stable [`Invoker`] per node and event; updating the
//!   handler swaps the invoker's target instead of re-registering
//! - everything else: attribute set, or removal for null
//!
//! [`Host::patch_prop`]: super::Host::patch_prop

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::HostNode;
use crate::hash::FastHashMap;
use crate::value::{Callback, Value};

/// Element-level operations behind [`patch_prop`].
pub trait PropTarget {
    /// Set or clear the class string.
    fn set_class(&self, node: HostNode, class: Option<&str>);
    /// Set or clear one style property.
    fn set_style(&self, node: HostNode, name: &str, value: Option<&str>);
    /// Set an attribute.
    fn set_attribute(&self, node: HostNode, name: &str, value: &str);
    /// Remove an attribute.
    fn remove_attribute(&self, node: HostNode, name: &str);
    /// Register `invoker` for `event` on `node`.
    fn add_listener(&self, node: HostNode, event: &str, invoker: Invoker);
    /// Unregister `invoker` for `event` on `node`.
    fn remove_listener(&self, node: HostNode, event: &str, invoker: &Invoker);
    /// Per-host invoker table.
    fn invokers(&self) -> &InvokerCache;
}

/// Stable listener whose handler can be swapped.
#[derive(Clone)]
pub struct Invoker(Rc<RefCell<Callback>>);

impl Invoker {
    fn new(handler: Callback) -> Self {
        Self(Rc::new(RefCell::new(handler)))
    }

    /// Call the current handler.
    pub fn invoke(&self, args: &[Value]) -> Value {
        let handler = self.0.borrow().clone();
        handler.call(args)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Invoker) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn swap(&self, handler: Callback) {
        *self.0.borrow_mut() = handler;
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invoker({:p})", Rc::as_ptr(&self.0))
    }
}

/// Invokers by node and prop key (`onClick`, not `click`).
#[derive(Default)]
pub struct InvokerCache(RefCell<FastHashMap<(HostNode, Rc<str>), Invoker>>);

impl InvokerCache {
    /// The invoker bound for `key` on `node`.
    pub fn get(&self, node: HostNode, key: &str) -> Option<Invoker> {
        self.0.borrow().get(&(node, Rc::from(key))).cloned()
    }

    /// Drop every invoker bound to `node`.
    pub fn forget_node(&self, node: HostNode) {
        self.0.borrow_mut().retain(|(owner, _), _| *owner != node);
    }

    fn insert(&self, node: HostNode, key: &str, invoker: Invoker) {
        self.0.borrow_mut().insert((node, Rc::from(key)), invoker);
    }

    fn remove(&self, node: HostNode, key: &str) -> Option<Invoker> {
        self.0.borrow_mut().remove(&(node, Rc::from(key)))
    }
}

/// Whether `key` names an event handler: `on` followed by an uppercase
/// letter.
pub fn is_on(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() > 2 && bytes.starts_with(b"on") && bytes[2].is_ascii_uppercase()
}

/// `onClick` → `click`.
pub fn event_name(key: &str) -> String {
    key[2..].to_ascii_lowercase()
}

/// Dispatch one prop change to its category.
pub fn patch_prop<T: PropTarget + ?Sized>(
    target: &T,
    node: HostNode,
    key: &str,
    prev: &Value,
    next: &Value,
) {
    match key {
        "class" => patch_class(target, node, next),
        "style" => patch_style(target, node, prev, next),
        _ if is_on(key) => patch_event(target, node, key, next),
        _ => patch_attr(target, node, key, next),
    }
}

fn patch_class<T: PropTarget + ?Sized>(target: &T, node: HostNode, next: &Value) {
    if next.is_null() {
        target.set_class(node, None);
    } else {
        target.set_class(node, Some(&next.to_string()));
    }
}

fn patch_style<T: PropTarget + ?Sized>(target: &T, node: HostNode, prev: &Value, next: &Value) {
    let next_style = next.as_object();
    if let Some(style) = &next_style {
        for (name, value) in style.entries() {
            let name = name.to_string();
            if value.is_null() {
                target.set_style(node, &name, None);
            } else {
                target.set_style(node, &name, Some(&value.to_string()));
            }
        }
    }
    let Some(prev_style) = prev.as_object() else {
        return;
    };
    for name in prev_style.keys() {
        let still_set = next_style
            .as_ref()
            .and_then(|style| style.get(&name))
            .is_some_and(|value| !value.is_null());
        if !still_set {
            target.set_style(node, &name.to_string(), None);
        }
    }
}

fn patch_event<T: PropTarget + ?Sized>(target: &T, node: HostNode, key: &str, next: &Value) {
    let invokers = target.invokers();
    let existing = invokers.get(node, key);
    match (next.as_func(), existing) {
        (Some(handler), Some(invoker)) => invoker.swap(handler.clone()),
        (Some(handler), None) => {
            let invoker = Invoker::new(handler.clone());
            invokers.insert(node, key, invoker.clone());
            target.add_listener(node, &event_name(key), invoker);
        }
        (None, Some(_)) => {
            if let Some(invoker) = invokers.remove(node, key) {
                target.remove_listener(node, &event_name(key), &invoker);
            }
        }
        (None, None) => {}
    }
}

fn patch_attr<T: PropTarget + ?Sized>(target: &T, node: HostNode, key: &str, next: &Value) {
    if next.is_null() {
        target.remove_attribute(node, key);
    } else {
        target.set_attribute(node, key, &next.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<String>>,
        invokers: InvokerCache,
    }

    impl PropTarget for Recorder {
        fn set_class(&self, _: HostNode, class: Option<&str>) {
            self.log.borrow_mut().push(format!("class={class:?}"));
        }
        fn set_style(&self, _: HostNode, name: &str, value: Option<&str>) {
            self.log.borrow_mut().push(format!("style.{name}={value:?}"));
        }
        fn set_attribute(&self, _: HostNode, name: &str, value: &str) {
            self.log.borrow_mut().push(format!("attr {name}={value}"));
        }
        fn remove_attribute(&self, _: HostNode, name: &str) {
            self.log.borrow_mut().push(format!("attr {name} removed"));
        }
        fn add_listener(&self, _: HostNode, event: &str, _: Invoker) {
            self.log.borrow_mut().push(format!("listen {event}"));
        }
        fn remove_listener(&self, _: HostNode, event: &str, _: &Invoker) {
            self.log.borrow_mut().push(format!("unlisten {event}"));
        }
        fn invokers(&self) -> &InvokerCache {
            &self.invokers
        }
    }

    const NODE: HostNode = HostNode::new(1);

    #[test]
    fn event_keys_need_an_uppercase_letter() {
        assert!(is_on("onClick"));
        assert!(!is_on("once"));
        assert!(!is_on("on"));
        assert_eq!(event_name("onMouseMove"), "mousemove");
    }

    #[test]
    fn style_clears_keys_dropped_from_next() {
        let host = Recorder::default();
        let prev = Value::from(Object::new().with("color", "red").with("margin", "0"));
        let next = Value::from(Object::new().with("color", "blue"));
        patch_prop(&host, NODE, "style", &prev, &next);
        assert_eq!(
            *host.log.borrow(),
            vec![
                "style.color=Some(\"blue\")".to_string(),
                "style.margin=None".to_string()
            ]
        );
    }

    #[test]
    fn handler_swap_keeps_one_listener() {
        let host = Recorder::default();
        let first = Value::Func(Callback::new(|_| Value::Int(1)));
        let second = Value::Func(Callback::new(|_| Value::Int(2)));

        patch_prop(&host, NODE, "onClick", &Value::Null, &first);
        let invoker = host.invokers.get(NODE, "onClick").expect("bound");
        assert_eq!(invoker.invoke(&[]), Value::Int(1));

        patch_prop(&host, NODE, "onClick", &first, &second);
        assert_eq!(invoker.invoke(&[]), Value::Int(2));
        assert_eq!(*host.log.borrow(), vec!["listen click".to_string()]);

        patch_prop(&host, NODE, "onClick", &second, &Value::Null);
        assert!(host.invokers.get(NODE, "onClick").is_none());
        assert_eq!(host.log.borrow().last().map(String::as_str), Some("unlisten click"));
    }

    #[test]
    fn null_class_and_attribute_clear() {
        let host = Recorder::default();
        patch_prop(&host, NODE, "class", &Value::Null, &Value::from("a b"));
        patch_prop(&host, NODE, "class", &Value::from("a b"), &Value::Null);
        patch_prop(&host, NODE, "id", &Value::Null, &Value::from("x"));
        patch_prop(&host, NODE, "id", &Value::from("x"), &Value::Null);
        assert_eq!(
            *host.log.borrow(),
            vec![
                "class=Some(\"a b\")".to_string(),
                "class=None".to_string(),
                "attr id=x".to_string(),
                "attr id removed".to_string(),
            ]
        );
    }
}
