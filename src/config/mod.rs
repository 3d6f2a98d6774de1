//! Configuration loading, layering and caching.

mod attr_map;
mod builder;
mod cache;
mod directory;
mod error;
mod file;
mod format;
mod inherit;
mod runtime;
mod source;
mod value;

pub use attr_map::AttrMap;
pub use builder::ConfigDirectoryBuilder;
pub use cache::{ConfigCache, EntryState, Layer, Resolver};
pub use directory::ConfigDirectory;
pub use error::{ConfigError, FormatError};
pub use file::FileSource;
pub use format::Format;
pub use inherit::{resolve_inherits, INHERIT_KEY};
pub use runtime::RuntimeOverrides;
pub use source::{ConfigSource, MemorySource};
pub use value::Value;
