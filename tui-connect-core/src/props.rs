//! Prop values and prop mappings
//!
//! Connected components receive their data as a [`Props`] mapping: an
//! insertion-ordered map from prop name to [`PropValue`].
//!
//! # Identity semantics
//!
//! Change detection never compares values deeply. Two prop values are the
//! "same" when:
//!
//! - scalars (`Null`, `Bool`, `Int`, `Float`) and strings compare equal by value
//! - lists, maps, callbacks and opaque values point to the same allocation
//!
//! [`Props::shallow_eq`] applies this one level deep: same key set, and each
//! value the same under the rules above.
//!
//! ```
//! use tui_connect_core::{props, PropValue, Props};
//!
//! let a = props! { "count" => 1, "label" => "clicks" };
//! let b = props! { "count" => 1, "label" => "clicks" };
//! assert!(a.shallow_eq(&b));
//!
//! // Nested mappings are compared by reference, not by content
//! let c = props! { "inner" => Props::new() };
//! let d = props! { "inner" => Props::new() };
//! assert!(!c.shallow_eq(&d));
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// A single prop value
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<[PropValue]>),
    Map(Rc<Props>),
    Callback(Callback),
    /// Any other value; compared by reference
    Opaque(Rc<dyn Any>),
}

impl PropValue {
    /// Wrap an arbitrary value as an opaque prop.
    pub fn opaque<T: Any>(value: T) -> Self {
        PropValue::Opaque(Rc::new(value))
    }

    /// Identity comparison used by shallow equality.
    ///
    /// Floats follow IEEE comparison, so `NaN` is never the same as itself.
    pub fn same(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::List(a), PropValue::List(b)) => Rc::ptr_eq(a, b),
            (PropValue::Map(a), PropValue::Map(b)) => Rc::ptr_eq(a, b),
            (PropValue::Callback(a), PropValue::Callback(b)) => a.ptr_eq(b),
            (PropValue::Opaque(a), PropValue::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Short name of the value kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            PropValue::Null => "null",
            PropValue::Bool(_) => "bool",
            PropValue::Int(_) => "int",
            PropValue::Float(_) => "float",
            PropValue::Str(_) => "string",
            PropValue::List(_) => "list",
            PropValue::Map(_) => "map",
            PropValue::Callback(_) => "callback",
            PropValue::Opaque(_) => "opaque",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropValue::Float(f) => Some(*f),
            PropValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Props> {
        match self {
            PropValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            PropValue::Callback(c) => Some(c),
            _ => None,
        }
    }

    /// Downcast an opaque value.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            PropValue::Opaque(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Strict identity equality, see [`PropValue::same`].
impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Int(i) => write!(f, "{i}"),
            PropValue::Float(x) => write!(f, "{x}"),
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::List(items) => f.debug_list().entries(items.iter()).finish(),
            PropValue::Map(map) => fmt::Debug::fmt(&**map, f),
            PropValue::Callback(cb) => fmt::Debug::fmt(cb, f),
            PropValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(PropValue::Float(value as f64), PropValue::Int)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<Props> for PropValue {
    fn from(value: Props) -> Self {
        PropValue::Map(Rc::new(value))
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(value: Vec<PropValue>) -> Self {
        PropValue::List(value.into())
    }
}

impl From<Callback> for PropValue {
    fn from(value: Callback) -> Self {
        PropValue::Callback(value)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for PropValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => PropValue::Null,
            Value::Bool(b) => PropValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropValue::Int(i),
                None => PropValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => PropValue::Str(s.into()),
            Value::Array(items) => {
                PropValue::List(items.into_iter().map(PropValue::from).collect())
            }
            Value::Object(fields) => PropValue::Map(Rc::new(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, PropValue::from(v)))
                    .collect(),
            )),
        }
    }
}

/// A callable prop, compared by identity
///
/// Callbacks are how dispatch-derived props reach a component: invoking one
/// typically dispatches an action to the store.
#[derive(Clone)]
pub struct Callback {
    name: Rc<str>,
    func: Rc<dyn Fn(&[PropValue])>,
}

impl Callback {
    pub fn new(name: impl Into<Rc<str>>, func: impl Fn(&[PropValue]) + 'static) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the callback with positional arguments.
    pub fn call(&self, args: &[PropValue]) {
        (self.func)(args)
    }

    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({})", self.name)
    }
}

/// An insertion-ordered prop mapping
#[derive(Clone, Default)]
pub struct Props {
    entries: IndexMap<String, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a prop, returning the previous value.
    ///
    /// Replacing keeps the key's original position.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropValue>,
    ) -> Option<PropValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropValue::as_int)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropValue::as_bool)
    }

    pub fn get_callback(&self, key: &str) -> Option<&Callback> {
        self.get(key).and_then(PropValue::as_callback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every entry of `other` over this mapping (later entries win).
    pub fn assign(&mut self, other: &Props) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// One-level comparison: same key set, each value [`PropValue::same`].
    pub fn shallow_eq(&self, other: &Props) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(key, value)| {
            other
                .entries
                .get(key)
                .is_some_and(|other_value| value.same(other_value))
        })
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<PropValue>> Extend<(K, V)> for Props {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for Props {
    type Item = (String, PropValue);
    type IntoIter = indexmap::map::IntoIter<String, PropValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Shallow equality of two prop mappings, see [`Props::shallow_eq`].
pub fn shallow_equal(a: &Props, b: &Props) -> bool {
    a.shallow_eq(b)
}

/// Build a [`Props`] mapping from `key => value` pairs.
///
/// ```
/// use tui_connect_core::props;
///
/// let p = props! { "count" => 3, "title" => "Inbox" };
/// assert_eq!(p.get_int("count"), Some(3));
/// ```
#[macro_export]
macro_rules! props {
    () => {
        $crate::Props::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $( props.insert($key, $value); )+
        props
    }};
}
