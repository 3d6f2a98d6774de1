//! Shared, attribute-accessible configuration mappings.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::format::{self, Format};
use super::{ConfigError, Value};

/// Method names that can never be read through [`AttrMap::attr`].
const RESERVED_NAMES: &[&str] = &[
    "attr",
    "clear",
    "contains_key",
    "deep_clone",
    "dump",
    "dump_as",
    "entries",
    "extract",
    "from_serialize",
    "from_value",
    "get",
    "get_opt",
    "insert",
    "is_empty",
    "keys",
    "len",
    "lookup",
    "new",
    "ptr_eq",
    "rebase",
    "remove",
    "update",
];

/// A string-keyed configuration mapping with keyed and named access.
///
/// `AttrMap` is a handle: cloning it yields another reference to the same
/// mapping, and every mutation happens in place. Code that captured a config
/// early keeps seeing the current contents after the config is reloaded.
///
/// Keyed access ([`get`](Self::get)) works for every key. Named access
/// ([`attr`](Self::attr)) is a projection onto keyed access for keys that are
/// identifiers and do not collide with a method name.
///
/// ```
/// use confdir::{AttrMap, Value};
///
/// let server = AttrMap::new();
/// server.insert("host", "localhost");
/// server.insert("port", 8080);
///
/// let overrides = AttrMap::new();
/// overrides.insert("port", 9090);
/// server.rebase(&overrides);
///
/// assert_eq!(server.attr("port")?, Value::Integer(9090));
/// assert_eq!(server.get("host")?.as_str(), Some("localhost"));
/// # Ok::<(), confdir::ConfigError>(())
/// ```
#[derive(Clone, Default)]
pub struct AttrMap {
    inner: Rc<Shared>,
}

#[derive(Default)]
struct Shared {
    entries: RefCell<BTreeMap<String, Value>>,
    /// Set by `clear`, reset when a cache refills the mapping.
    cleared: Cell<bool>,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from a [`Value`], copying every nested mapping.
    ///
    /// Fails with [`ConfigError::TypeMismatch`] if `value` is not a mapping.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Mapping(map) => Ok(map.deep_clone()),
            other => Err(ConfigError::TypeMismatch {
                expected: "mapping",
                found: other.type_name(),
            }),
        }
    }

    /// Builds a mapping from any serializable value, such as a struct or a map.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ConfigError> {
        let raw = serde_yaml::to_value(value)
            .map_err(|e| ConfigError::SerializeError(e.into()))?;
        let value =
            format::from_yaml_value(raw).map_err(ConfigError::SerializeError)?;
        Self::from_value(value)
    }

    /// Returns `true` if both handles point at the same mapping.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Looks up `key`, failing with [`ConfigError::KeyNotFound`] if it is absent.
    ///
    /// Mapping values are returned as handles to the stored mapping.
    pub fn get(&self, key: &str) -> Result<Value, ConfigError> {
        self.get_opt(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    pub fn get_opt(&self, key: &str) -> Option<Value> {
        self.inner.entries.borrow().get(key).cloned()
    }

    /// Named access to `key`.
    ///
    /// Behaves exactly like [`get`](Self::get) for identifier keys that do not
    /// shadow a method name, and fails with [`ConfigError::InvalidAttribute`]
    /// for any other name.
    pub fn attr(&self, name: &str) -> Result<Value, ConfigError> {
        if !is_attribute_name(name) {
            return Err(ConfigError::InvalidAttribute(name.to_string()));
        }
        self.get(name)
    }

    /// Follows a `/`-separated path of keys through nested mappings.
    pub fn lookup(&self, path: &str) -> Result<Value, ConfigError> {
        let not_found = || ConfigError::KeyNotFound(path.to_string());
        let mut segments = path.split('/');
        let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(not_found)?;
        let mut current = self.get_opt(first).ok_or_else(not_found)?;
        for segment in segments {
            current = current
                .as_mapping()
                .and_then(|map| map.get_opt(segment))
                .ok_or_else(not_found)?;
        }
        Ok(current)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Returns a snapshot of the current entries.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Stores `value` under `key`, returning the previous value.
    ///
    /// A mapping value is stored as the given handle, not copied. The value
    /// must not contain `self` at any depth: the mapping would then hold
    /// itself and could never be dropped, printed or serialized.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        debug_assert!(
            !value_contains(&value, self),
            "a mapping cannot be inserted into itself"
        );
        self.inner.entries.borrow_mut().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.entries.borrow_mut().remove(key)
    }

    /// Removes every key, keeping the identity of the mapping.
    ///
    /// Clearing a config handed out by a [`ConfigCache`](super::ConfigCache)
    /// invalidates its cache entry: the next resolution of that name reads the
    /// sources again and refills this same mapping.
    pub fn clear(&self) {
        self.clear_contents();
        self.inner.cleared.set(true);
    }

    /// Empties the mapping without marking it for reload.
    pub(crate) fn clear_contents(&self) {
        self.inner.entries.borrow_mut().clear();
    }

    /// Whether [`clear`](Self::clear) was called since the mapping was last filled.
    pub(crate) fn is_cleared(&self) -> bool {
        self.inner.cleared.get()
    }

    /// Shallow update: every top-level key of `other` replaces the one in `self`.
    ///
    /// Values are copied, so the two mappings stay independent afterwards.
    pub fn update(&self, other: &AttrMap) {
        if Self::ptr_eq(self, other) {
            return;
        }
        for (key, value) in other.entries() {
            self.insert(key, value.deep_clone());
        }
    }

    /// Deep-merges `other` into `self` in place.
    ///
    /// Merging descends only where both sides hold a mapping; anywhere else the
    /// value from `other` wins. Keys present only in `self` are left alone.
    pub fn rebase(&self, other: &AttrMap) {
        if Self::ptr_eq(self, other) {
            return;
        }
        for (key, value) in other.entries() {
            match (self.get_opt(&key), value) {
                (Some(Value::Mapping(mine)), Value::Mapping(theirs)) => mine.rebase(&theirs),
                (_, value) => {
                    self.insert(key, value.deep_clone());
                }
            }
        }
    }

    /// Returns an independent copy with its own identity at every depth.
    pub fn deep_clone(&self) -> AttrMap {
        let copy = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_clone()))
            .collect();
        AttrMap {
            inner: Rc::new(Shared {
                entries: RefCell::new(copy),
                cleared: Cell::new(false),
            }),
        }
    }

    /// Moves the contents of `other` into `self`, replacing what was there.
    pub(crate) fn take_from(&self, other: AttrMap) {
        self.inner.cleared.set(false);
        if Self::ptr_eq(self, &other) {
            return;
        }
        let contents = std::mem::take(&mut *other.inner.entries.borrow_mut());
        *self.inner.entries.borrow_mut() = contents;
    }

    /// Serializes the mapping as YAML.
    pub fn dump(&self) -> Result<String, ConfigError> {
        self.dump_as(Format::Yaml)
    }

    pub fn dump_as(&self, format: Format) -> Result<String, ConfigError> {
        format.encode(self).map_err(ConfigError::SerializeError)
    }

    /// Deserializes the whole mapping into a typed value.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let raw = serde_yaml::to_value(self)
            .map_err(|e| ConfigError::SerializeError(e.into()))?;
        serde_yaml::from_value(raw).map_err(ConfigError::DeserializeError)
    }
}

fn value_contains(value: &Value, target: &AttrMap) -> bool {
    match value {
        Value::Mapping(map) => {
            AttrMap::ptr_eq(map, target)
                || map
                    .inner
                    .entries
                    .borrow()
                    .values()
                    .any(|nested| value_contains(nested, target))
        }
        Value::Sequence(items) => items.iter().any(|item| value_contains(item, target)),
        _ => false,
    }
}

fn is_attribute_name(name: &str) -> bool {
    is_identifier(name) && !RESERVED_NAMES.contains(&name)
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl PartialEq for AttrMap {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || *self.inner.entries.borrow() == *other.inner.entries.borrow()
    }
}

impl fmt::Debug for AttrMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.entries.borrow().iter()).finish()
    }
}

impl Serialize for AttrMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let inner = self.inner.entries.borrow();
        let mut map = serializer.serialize_map(Some(inner.len()))?;
        for (key, value) in inner.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = AttrMap::new();
        for (key, value) in iter {
            map.insert(key, value.into().deep_clone());
        }
        map
    }
}
