use std::collections::BTreeMap;

use super::{AttrMap, Value};

/// In-memory overrides applied on top of every resolution of a config.
///
/// Keyed by logical config name. The store lives independently of the cache:
/// invalidating or reloading a config never touches it, and resolution copies
/// the overrides in rather than consuming them.
///
/// The store never shares a mapping with its callers. Overrides are copied on
/// the way in and on the way out, so the only way to change them is through a
/// `&mut RuntimeOverrides`.
#[derive(Debug, Default)]
pub struct RuntimeOverrides {
    entries: BTreeMap<String, AttrMap>,
}

impl RuntimeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the overrides for `name`.
    pub fn get(&self, name: &str) -> Option<AttrMap> {
        self.entries.get(name).map(AttrMap::deep_clone)
    }

    /// Reads a single top-level override value.
    pub fn value(&self, name: &str, key: &str) -> Option<Value> {
        self.entries
            .get(name)
            .and_then(|overrides| overrides.get_opt(key))
            .map(|value| value.deep_clone())
    }

    pub(crate) fn get_ref(&self, name: &str) -> Option<&AttrMap> {
        self.entries.get(name)
    }

    /// Returns the overrides for `name`, creating an empty set if needed.
    ///
    /// This allows nested assignment in one expression:
    /// `overrides.entry("db").insert("port", 5433)`. The returned mapping
    /// belongs to the store only until [`detach`](Self::detach) runs.
    pub fn entry(&mut self, name: impl Into<String>) -> &AttrMap {
        self.entries.entry(name.into()).or_default()
    }

    /// Sets a single top-level key in the overrides for `name`.
    pub fn set(&mut self, name: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) {
        let value: Value = value.into();
        self.entry(name).insert(key, value.deep_clone());
    }

    /// Stores a copy of `overrides` for `name`.
    pub fn insert(&mut self, name: impl Into<String>, overrides: &AttrMap) -> Option<AttrMap> {
        self.entries.insert(name.into(), overrides.deep_clone())
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrMap> {
        self.entries.remove(name)
    }

    /// Replaces the overrides of every name present in `other`.
    pub fn update(&mut self, other: RuntimeOverrides) {
        self.entries.extend(other.entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Gives every stored mapping a fresh identity, cutting off any handle
    /// obtained through [`entry`](Self::entry).
    pub fn detach(&mut self) {
        for overrides in self.entries.values_mut() {
            *overrides = overrides.deep_clone();
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Clone for RuntimeOverrides {
    fn clone(&self) -> Self {
        let mut copy = Self {
            entries: self.entries.clone(),
        };
        copy.detach();
        copy
    }
}

impl<K: Into<String>> FromIterator<(K, AttrMap)> for RuntimeOverrides {
    fn from_iter<I: IntoIterator<Item = (K, AttrMap)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.deep_clone()))
                .collect(),
        }
    }
}
