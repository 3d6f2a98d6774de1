use std::path::{Path, PathBuf};

use super::cache::{ConfigCache, Resolver};
use super::directory::ConfigDirectory;
use super::file::FileSource;
use super::source::ConfigSource;
use super::{ConfigError, Format, RuntimeOverrides};

/// Builder for a [`ConfigDirectory`].
///
/// Defaults: YAML files, `local` as the override suffix (`db.local.yaml`),
/// `inherit` clauses resolved.
///
/// ## Example
///
/// ```no_run
/// use confdir::{ConfigDirectory, Format};
///
/// let mut conf = ConfigDirectory::builder("conf")
///     .with_format(Format::Toml)
///     .with_local_suffix("dev")
///     .build()?;
///
/// // Reads conf/db.toml, then conf/db.dev.toml if present
/// let db = conf.get("db")?;
/// # Ok::<(), confdir::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigDirectoryBuilder {
    dir: PathBuf,
    format: Format,
    local_suffix: String,
    inheritance: bool,
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigDirectoryBuilder {
    pub(crate) fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            format: Format::default(),
            local_suffix: "local".to_string(),
            inheritance: true,
            sources: Vec::new(),
        }
    }

    /// Sets the format, and so the file extension, of the directory's files.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the suffix that marks local override files.
    pub fn with_local_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.local_suffix = suffix.into();
        self
    }

    /// Enables or disables `inherit` clause resolution.
    pub fn with_inheritance(mut self, enabled: bool) -> Self {
        self.inheritance = enabled;
        self
    }

    /// Registers an extra source.
    ///
    /// Extra sources are consulted in registration order, before the
    /// directory's own files; the first one that has a document wins.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Builds the directory handle, checking that the directory exists.
    pub fn build(self) -> Result<ConfigDirectory, ConfigError> {
        if !self.dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound(self.dir));
        }

        let mut sources = self.sources;
        sources.push(Box::new(FileSource::new(&self.dir, self.format)));

        Ok(ConfigDirectory {
            dir: self.dir,
            format: self.format,
            resolver: Resolver::new(sources, self.local_suffix)
                .with_inheritance(self.inheritance),
            cache: ConfigCache::new(),
            runtime: RuntimeOverrides::new(),
        })
    }
}
