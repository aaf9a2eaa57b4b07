//! Dynamic values and the raw objects reactive wrappers observe.
//!
//! [`Value`] is the currency of the runtime: props, reactive state, ref
//! contents, and handler arguments are all values. Primitives compare by
//! value; objects, wrappers, refs, callbacks, and instances compare by
//! identity, mirroring strict equality in a dynamic language.
//!
//! [`Object`] is a shared, mutable, *untracked* target. Reading or writing
//! it directly never touches the dependency graph; wrap it with
//! [`reactive`](crate::reactive()) to observe it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::component::PublicInstance;
use crate::hash::FastIndexMap;
use crate::host::HostNode;
use crate::reactive::{Reactive, forget_wrapper};
use crate::refs::Ref;
use crate::store::forget_target;
use crate::vnode::Slots;

/// A property key: a name, or a list index.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    /// Named property.
    Name(Rc<str>),
    /// List position.
    Index(usize),
}

impl Key {
    /// The name of this key, if it is a named key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Index(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.into())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name.into())
    }
}

impl From<Rc<str>> for Key {
    fn from(name: Rc<str>) -> Self {
        Key::Name(name)
    }
}

impl From<&Rc<str>> for Key {
    fn from(name: &Rc<str>) -> Self {
        Key::Name(name.clone())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// Identity of a raw [`Object`] allocation.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TargetId(usize);

/// Shared callable stored in values: event handlers, slot bodies, `data`
/// factories.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&[Value]) -> Value>);

impl Callback {
    /// Wrap a closure.
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke with positional arguments.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0))
    }
}

/// A dynamically typed runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Immutable string.
    Str(Rc<str>),
    /// Raw, untracked object or list.
    Object(Object),
    /// Reactive wrapper around an object.
    Reactive(Reactive),
    /// Ref box.
    Ref(Ref),
    /// Callable.
    Func(Callback),
    /// Realized host node (e.g. an element bound through a template ref).
    Node(HostNode),
    /// Component public instance.
    Instance(PublicInstance),
    /// Component slot table.
    Slots(Slots),
}

impl Value {
    /// Strict (`===`) equality: primitives by value, handles by identity.
    /// `NaN` is never equal to itself.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Reactive(a), Value::Reactive(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Slots(a), Value::Slots(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `Object.is` semantics: like [`strict_eq`](Self::strict_eq) except
    /// `NaN` equals `NaN` and `+0` differs from `-0`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => {
                (a.is_nan() && b.is_nan()) || (a == b && a.is_sign_negative() == b.is_sign_negative())
            }
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b && !(*a == 0 && b.is_sign_negative())
            }
            _ => self.strict_eq(other),
        }
    }

    /// Whether this is an object-like value that a reactive wrapper can observe.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Reactive(_))
    }

    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Loose truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Integer view, if numeric and integral.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Float view, if numeric.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view, if a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The raw object, for both raw objects and reactive wrappers.
    pub fn as_object(&self) -> Option<Object> {
        match self {
            Value::Object(obj) => Some(obj.clone()),
            Value::Reactive(reactive) => Some(reactive.to_raw()),
            _ => None,
        }
    }

    /// The reactive wrapper, if this is one.
    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(reactive) => Some(reactive),
            _ => None,
        }
    }

    /// The ref, if this is one.
    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// The callback, if this is one.
    pub fn as_func(&self) -> Option<&Callback> {
        match self {
            Value::Func(f) => Some(f),
            _ => None,
        }
    }

    /// Property read through whichever accessor this value supports.
    /// Primitives read as null.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        match self {
            Value::Object(obj) => obj.get_key(&key),
            Value::Reactive(reactive) => reactive.get_key(&key),
            Value::Instance(instance) => instance.get_key(&key),
            _ => Value::Null,
        }
    }

    /// Property write through whichever accessor this value supports.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        match self {
            Value::Object(obj) => obj.set_key(&key, value),
            Value::Reactive(reactive) => reactive.set_key(&key, value),
            Value::Instance(instance) => instance.set_key(&key, value),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(obj) => write!(f, "Object({:?})", obj.id()),
            Value::Reactive(r) => write!(f, "Reactive({:?})", r.to_raw().id()),
            Value::Ref(_) => f.write_str("Ref"),
            Value::Func(cb) => fmt::Debug::fmt(cb, f),
            Value::Node(node) => write!(f, "Node({node:?})"),
            Value::Instance(_) => f.write_str("Instance"),
            Value::Slots(_) => f.write_str("Slots"),
        }
    }
}

/// Text rendering used for text children and attribute values.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{}", *x as i64),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Object(obj) if obj.is_list() => {
                let parts: Vec<String> = obj.values().iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(","))
            }
            Value::Reactive(r) => fmt::Display::fmt(&Value::Object(r.to_raw()), f),
            Value::Ref(r) => fmt::Display::fmt(&r.peek(), f),
            _ => f.write_str("[object Object]"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(v: Rc<str>) -> Self {
        Value::Str(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Reactive> for Value {
    fn from(v: Reactive) -> Self {
        Value::Reactive(v)
    }
}

impl From<Ref> for Value {
    fn from(v: Ref) -> Self {
        Value::Ref(v)
    }
}

impl From<Callback> for Value {
    fn from(v: Callback) -> Self {
        Value::Func(v)
    }
}

impl From<HostNode> for Value {
    fn from(v: HostNode) -> Self {
        Value::Node(v)
    }
}

impl From<PublicInstance> for Value {
    fn from(v: PublicInstance) -> Self {
        Value::Instance(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Uniform keyed access implemented by raw objects, reactive wrappers,
/// ref-unwrapping views, and component public instances.
pub trait ValueAccess {
    /// Read a property; absent properties read as null.
    fn get_key(&self, key: &Key) -> Value;
    /// Write a property; `false` reports a rejected write.
    fn set_key(&self, key: &Key, value: Value) -> bool;
    /// Whether the property exists.
    fn has_key(&self, key: &Key) -> bool;
}

#[derive(Clone)]
enum Fields {
    Map(FastIndexMap<Key, Value>),
    List(Vec<Value>),
}

struct ObjectData {
    fields: RefCell<Fields>,
}

impl Drop for ObjectData {
    fn drop(&mut self) {
        let id = TargetId(self as *const ObjectData as usize);
        forget_target(id);
        forget_wrapper(id);
    }
}

/// Outcome of a raw write.
#[derive(Clone, Debug, Default)]
pub struct WriteOutcome {
    /// Value previously stored under the key, if any.
    pub previous: Option<Value>,
    /// Whether the write created a new key (or grew a list).
    pub added: bool,
}

/// Raw shared object: an ordered map or a list.
///
/// Cloning an `Object` clones the handle, not the contents.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

const LENGTH: &str = "length";

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl Object {
    /// Empty map-shaped object.
    pub fn new() -> Self {
        Self(Rc::new(ObjectData {
            fields: RefCell::new(Fields::Map(FastIndexMap::default())),
        }))
    }

    /// List-shaped object.
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Self(Rc::new(ObjectData {
            fields: RefCell::new(Fields::List(values.into_iter().collect())),
        }))
    }

    /// Builder-style insert, for literals.
    pub fn with(self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.set(key.into(), value.into());
        self
    }

    /// Identity of this allocation.
    pub fn id(&self) -> TargetId {
        TargetId(Rc::as_ptr(&self.0) as usize)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether this object is list-shaped.
    pub fn is_list(&self) -> bool {
        matches!(*self.0.fields.borrow(), Fields::List(_))
    }

    /// Raw read. Lists answer `length` and index keys.
    pub fn get(&self, key: &Key) -> Option<Value> {
        match &*self.0.fields.borrow() {
            Fields::Map(map) => map.get(key).cloned(),
            Fields::List(list) => match key {
                Key::Index(i) => list.get(*i).cloned(),
                Key::Name(name) if &**name == LENGTH => Some(Value::Int(list.len() as i64)),
                Key::Name(_) => None,
            },
        }
    }

    /// Whether the key exists.
    pub fn contains(&self, key: &Key) -> bool {
        match &*self.0.fields.borrow() {
            Fields::Map(map) => map.contains_key(key),
            Fields::List(list) => match key {
                Key::Index(i) => *i < list.len(),
                Key::Name(name) => &**name == LENGTH,
            },
        }
    }

    /// Raw write. Writing one past the end of a list appends; further out
    /// pads with nulls. Writing `length` on a list truncates or pads.
    pub fn set(&self, key: Key, value: Value) -> WriteOutcome {
        match &mut *self.0.fields.borrow_mut() {
            Fields::Map(map) => {
                let previous = map.insert(key, value);
                WriteOutcome {
                    added: previous.is_none(),
                    previous,
                }
            }
            Fields::List(list) => match key {
                Key::Index(i) if i < list.len() => WriteOutcome {
                    previous: Some(std::mem::replace(&mut list[i], value)),
                    added: false,
                },
                Key::Index(i) => {
                    list.resize(i, Value::Null);
                    list.push(value);
                    WriteOutcome {
                        previous: None,
                        added: true,
                    }
                }
                Key::Name(name) if &*name == LENGTH => {
                    let old_len = list.len();
                    let new_len = value.as_int().map_or(old_len, |n| n.max(0) as usize);
                    list.resize(new_len, Value::Null);
                    WriteOutcome {
                        previous: Some(Value::Int(old_len as i64)),
                        added: new_len != old_len,
                    }
                }
                Key::Name(_) => WriteOutcome::default(),
            },
        }
    }

    /// Raw delete. Deleting a list index leaves a null hole.
    pub fn delete(&self, key: &Key) -> Option<Value> {
        match &mut *self.0.fields.borrow_mut() {
            Fields::Map(map) => map.shift_remove(key),
            Fields::List(list) => match key {
                Key::Index(i) if *i < list.len() => Some(std::mem::take(&mut list[*i])),
                _ => None,
            },
        }
    }

    /// Append to a list; on a map this is a no-op. Returns the new length.
    pub fn push(&self, value: Value) -> usize {
        match &mut *self.0.fields.borrow_mut() {
            Fields::List(list) => {
                list.push(value);
                list.len()
            }
            Fields::Map(map) => map.len(),
        }
    }

    /// Own keys in order.
    pub fn keys(&self) -> Vec<Key> {
        match &*self.0.fields.borrow() {
            Fields::Map(map) => map.keys().cloned().collect(),
            Fields::List(list) => (0..list.len()).map(Key::Index).collect(),
        }
    }

    /// Own values in order.
    pub fn values(&self) -> Vec<Value> {
        match &*self.0.fields.borrow() {
            Fields::Map(map) => map.values().cloned().collect(),
            Fields::List(list) => list.clone(),
        }
    }

    /// Own entries in order.
    pub fn entries(&self) -> Vec<(Key, Value)> {
        match &*self.0.fields.borrow() {
            Fields::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Fields::List(list) => list
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v.clone()))
                .collect(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match &*self.0.fields.borrow() {
            Fields::Map(map) => map.len(),
            Fields::List(list) => list.len(),
        }
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) {
        match &mut *self.0.fields.borrow_mut() {
            Fields::Map(map) => map.clear(),
            Fields::List(list) => list.clear(),
        }
    }
}

impl ValueAccess for Object {
    fn get_key(&self, key: &Key) -> Value {
        self.get(key).unwrap_or_default()
    }

    fn set_key(&self, key: &Key, value: Value) -> bool {
        self.set(key.clone(), value);
        true
    }

    fn has_key(&self, key: &Key) -> bool {
        self.contains(key)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.entries() {
            map.entry(&key, &value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_compares_handles_by_identity() {
        let a = Object::new();
        let b = Object::new();
        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a), Value::from(b));
        assert_eq!(Value::from("x"), Value::from(String::from("x")));
        assert_eq!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn nan_is_changed_under_strict_but_not_same_value() {
        let nan = Value::Float(f64::NAN);
        assert!(!nan.strict_eq(&nan.clone()));
        assert!(nan.same_value(&nan.clone()));
        assert!(!Value::Float(0.0).same_value(&Value::Float(-0.0)));
    }

    #[test]
    fn list_writes_append_and_resize() {
        let list = Object::list([Value::Int(1)]);
        assert!(list.set(Key::Index(1), Value::Int(2)).added);
        assert_eq!(list.get(&"length".into()), Some(Value::Int(2)));
        list.set("length".into(), Value::Int(1));
        assert_eq!(list.values(), vec![Value::Int(1)]);
    }

    #[test]
    fn map_keys_keep_insertion_order() {
        let obj = Object::new().with("b", 1).with("a", 2);
        assert_eq!(obj.keys(), vec![Key::from("b"), Key::from("a")]);
        obj.delete(&"b".into());
        assert_eq!(obj.keys(), vec![Key::from("a")]);
    }

    #[test]
    fn display_matches_text_rendering() {
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(Object::list([1.into(), 2.into()])).to_string(), "1,2");
    }
}
