//! Structured-data formats a config directory can be stored in.

use super::error::FormatError;
use super::{AttrMap, Value};

/// On-disk format of the files in a config directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Yaml,
    Toml,
}

impl Format {
    /// File extension used for documents in this format, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Toml => "toml",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    /// Parses a single document.
    ///
    /// The caller decides what to do with a non-mapping top level.
    pub fn decode(self, text: &str) -> Result<Value, FormatError> {
        match self {
            Format::Yaml => from_yaml_value(serde_yaml::from_str(text)?),
            Format::Toml => {
                let table: toml::Table = toml::from_str(text)?;
                Ok(from_toml_value(toml::Value::Table(table)))
            }
        }
    }

    pub fn encode(self, map: &AttrMap) -> Result<String, FormatError> {
        match self {
            Format::Yaml => Ok(serde_yaml::to_string(map)?),
            Format::Toml => Ok(toml::to_string(map)?),
        }
    }
}

/// Converts a YAML tree into a [`Value`].
///
/// Tags are dropped. Scalar keys are stringified; complex keys are rendered
/// as compact YAML.
pub(crate) fn from_yaml_value(value: serde_yaml::Value) -> Result<Value, FormatError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(_)) => return Err(FormatError::IntegerOutOfRange(n.to_string())),
            (None, None) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(from_yaml_value)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let map = AttrMap::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, from_yaml_value(value)?);
            }
            Value::Mapping(map)
        }
        Yaml::Tagged(tagged) => from_yaml_value(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, FormatError> {
    use serde_yaml::Value as Yaml;

    Ok(match key {
        Yaml::String(s) => s,
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)?.trim_end().to_string(),
    })
}

fn from_toml_value(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Integer(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            Value::Sequence(items.into_iter().map(from_toml_value).collect())
        }
        toml::Value::Table(table) => {
            let map = AttrMap::new();
            for (key, value) in table {
                map.insert(key, from_toml_value(value));
            }
            Value::Mapping(map)
        }
    }
}
