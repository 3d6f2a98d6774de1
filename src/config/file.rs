//! File-based configuration source.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::source::ConfigSource;
use super::{AttrMap, ConfigError, Format, Value};

/// A configuration source that reads `<dir>/<name>.<ext>` files.
///
/// A missing file is not an error; it simply yields no document.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
    format: Format,
}

impl FileSource {
    pub fn new(dir: impl AsRef<Path>, format: Format) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            format,
        }
    }

    /// Path of the file that holds the document called `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, self.format.extension()))
    }
}

impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn load(&self, name: &str) -> Result<Option<AttrMap>, ConfigError> {
        load_config_file(&self.path_for(name), self.format)
    }
}

/// Loads and parses a config file whose top level must be a mapping.
///
/// Returns `Ok(None)` if the file doesn't exist. An empty document counts as
/// an empty mapping.
fn load_config_file(path: &Path, format: Format) -> Result<Option<AttrMap>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            debug!(path = %path.display(), "loading config file");
            let value = format
                .decode(&contents)
                .map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            match value {
                Value::Mapping(map) => Ok(Some(map)),
                Value::Null => Ok(Some(AttrMap::new())),
                _ => Err(ConfigError::NotAMapping {
                    path: path.to_path_buf(),
                }),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
