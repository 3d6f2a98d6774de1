//! Layered resolution and memoization of configs by logical name.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use super::inherit::resolve_inherits;
use super::source::ConfigSource;
use super::{AttrMap, ConfigError, RuntimeOverrides};

/// One layer that contributed to a resolved config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Base { origin: String },
    Local { origin: String },
    Runtime,
}

/// Whether a cached config currently holds resolved contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Loaded,
    Unloaded,
}

/// How to build a config from its sources.
///
/// Layers are applied as base → local override → runtime override, followed
/// by `inherit` resolution when enabled.
#[derive(Debug)]
pub struct Resolver {
    sources: Vec<Box<dyn ConfigSource>>,
    local_suffix: String,
    inheritance: bool,
}

impl Resolver {
    pub fn new(sources: Vec<Box<dyn ConfigSource>>, local_suffix: impl Into<String>) -> Self {
        Self {
            sources,
            local_suffix: local_suffix.into(),
            inheritance: true,
        }
    }

    #[must_use]
    pub fn with_inheritance(mut self, enabled: bool) -> Self {
        self.inheritance = enabled;
        self
    }

    pub fn local_name(&self, name: &str) -> String {
        format!("{}.{}", name, self.local_suffix)
    }

    /// Builds a fresh config for `name`. Nothing is cached here.
    pub fn build(
        &self,
        name: &str,
        runtime: &RuntimeOverrides,
    ) -> Result<(AttrMap, Vec<Layer>), ConfigError> {
        let mut layers = Vec::new();

        let (config, origin) = self
            .first_document(name)?
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
        layers.push(Layer::Base { origin });

        if let Some((local, origin)) = self.first_document(&self.local_name(name))? {
            config.rebase(&local);
            layers.push(Layer::Local { origin });
        }

        if let Some(overrides) = runtime.get_ref(name) {
            config.rebase(overrides);
            layers.push(Layer::Runtime);
        }

        if self.inheritance {
            resolve_inherits(&config)?;
        }

        Ok((config, layers))
    }

    fn first_document(&self, name: &str) -> Result<Option<(AttrMap, String)>, ConfigError> {
        for source in &self.sources {
            if let Some(document) = source.load(name)? {
                return Ok(Some((document, source.describe())));
            }
        }
        Ok(None)
    }
}

#[derive(Debug)]
struct CacheEntry {
    config: AttrMap,
    state: EntryState,
    layers: Vec<Layer>,
}

impl CacheEntry {
    /// A config cleared through any of its handles counts as unloaded.
    fn current_state(&self) -> EntryState {
        if self.config.is_cleared() {
            EntryState::Unloaded
        } else {
            self.state
        }
    }
}

/// Memoizes resolved configs by logical name.
///
/// Each name owns one [`AttrMap`] for its whole lifetime in the cache.
/// Invalidation empties that mapping in place and the next resolution fills
/// it again, so handles given out earlier stay current. Calling
/// [`AttrMap::clear`] on a served config invalidates its entry the same way.
#[derive(Debug, Default)]
pub struct ConfigCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the config for `name`, building it on a cache miss.
    ///
    /// On failure nothing is cached: a name seen for the first time gets no
    /// entry and an invalidated entry stays unloaded.
    pub fn resolve(
        &mut self,
        name: &str,
        resolver: &Resolver,
        runtime: &RuntimeOverrides,
    ) -> Result<AttrMap, ConfigError> {
        validate_name(name)?;

        if let Some(entry) = self.entries.get(name) {
            if entry.current_state() == EntryState::Loaded {
                trace!(name, "config cache hit");
                return Ok(entry.config.clone());
            }
        }

        let (resolved, layers) = resolver.build(name, runtime)?;
        debug!(name, layers = layers.len(), "resolved config");

        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| CacheEntry {
                config: AttrMap::new(),
                state: EntryState::Unloaded,
                layers: Vec::new(),
            });
        entry.config.take_from(resolved);
        entry.state = EntryState::Loaded;
        entry.layers = layers;

        Ok(entry.config.clone())
    }

    /// Marks `name` as unloaded and empties its config in place.
    ///
    /// Returns `false` if the name was never resolved.
    pub fn invalidate(&mut self, name: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.config.clear();
                entry.state = EntryState::Unloaded;
                entry.layers.clear();
                true
            }
            None => false,
        }
    }

    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.config.clear();
            entry.state = EntryState::Unloaded;
            entry.layers.clear();
        }
    }

    /// Re-reads `name` from its sources into the existing config.
    pub fn reload(
        &mut self,
        name: &str,
        resolver: &Resolver,
        runtime: &RuntimeOverrides,
    ) -> Result<AttrMap, ConfigError> {
        self.invalidate(name);
        self.resolve(name, resolver, runtime)
    }

    /// Reloads every loaded config.
    ///
    /// All entries are attempted; the first failure is returned and the
    /// failing entries stay unloaded.
    pub fn reload_loaded(
        &mut self,
        resolver: &Resolver,
        runtime: &RuntimeOverrides,
    ) -> Result<(), ConfigError> {
        let mut first_error = None;
        for name in self.loaded_names() {
            if let Err(e) = self.reload(&name, resolver, runtime) {
                warn!(name = %name, error = %e, "failed to reload config");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn state(&self, name: &str) -> Option<EntryState> {
        self.entries.get(name).map(CacheEntry::current_state)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state(name) == Some(EntryState::Loaded)
    }

    /// Layers applied to a loaded config, in application order.
    pub fn layers(&self, name: &str) -> Option<&[Layer]> {
        self.entries
            .get(name)
            .filter(|entry| entry.current_state() == EntryState::Loaded)
            .map(|entry| entry.layers.as_slice())
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.current_state() == EntryState::Loaded)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Logical names map straight onto file names, so they must not escape the
/// config directory.
pub(crate) fn validate_name(name: &str) -> Result<(), ConfigError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..");
    if invalid {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}
