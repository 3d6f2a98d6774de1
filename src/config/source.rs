use std::collections::BTreeMap;

use super::{AttrMap, ConfigError};

/// A provider of configuration documents, looked up by logical name.
///
/// Local overrides are requested under `<name>.<local_suffix>`, so a source
/// sees them as ordinary names.
pub trait ConfigSource: std::fmt::Debug {
    /// Short human-readable description, recorded in the applied layers.
    fn describe(&self) -> String;

    /// Loads the document called `name`.
    ///
    /// Returns `Ok(None)` when this source has no such document.
    fn load(&self, name: &str) -> Result<Option<AttrMap>, ConfigError>;
}

/// An in-memory source, mostly useful for defaults baked into a binary.
///
/// Every load hands out a fresh copy, so resolved configs never alias the
/// documents stored here.
#[derive(Debug, Default)]
pub struct MemorySource {
    label: String,
    documents: BTreeMap<String, AttrMap>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            documents: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_document(mut self, name: impl Into<String>, document: AttrMap) -> Self {
        self.documents.insert(name.into(), document);
        self
    }
}

impl ConfigSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory:{}", self.label)
    }

    fn load(&self, name: &str) -> Result<Option<AttrMap>, ConfigError> {
        Ok(self.documents.get(name).map(AttrMap::deep_clone))
    }
}
