use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by one of the underlying structured-data codecs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormatError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error("integer {0} does not fit in a signed 64-bit value")]
    IntegerOutOfRange(String),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("no configuration named '{0}'")]
    NotFound(String),

    #[error("config directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("invalid config name '{0}'")]
    InvalidName(String),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError { path: PathBuf, source: FormatError },

    #[error("top level of config file '{path}' is not a mapping")]
    NotAMapping { path: PathBuf },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("'{0}' cannot be used as an attribute name")]
    InvalidAttribute(String),

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] FormatError),

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[source] serde_yaml::Error),

    #[error("inherit path cannot be traversed: {path}")]
    InheritPathNotFound { path: String },

    #[error("circular inheritance detected in configuration")]
    CircularInherit,
}
