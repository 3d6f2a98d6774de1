use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the confdir library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no config directory installed on this thread")]
    NotInstalled,

    #[error("a config directory is already installed on this thread")]
    AlreadyInstalled,

    #[error("the installed config directory is already in use")]
    Busy,
}
