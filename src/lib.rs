pub mod config;
pub mod context;
mod error;

pub use config::{
    AttrMap, ConfigDirectory, ConfigError, ConfigSource, FileSource, Format, MemorySource,
    RuntimeOverrides, Value,
};
pub use error::Error;
