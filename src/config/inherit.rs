//! `inherit` clause resolution for resolved configuration documents.
//!
//! A mapping containing `inherit: some/path` takes its contents from the value
//! at `some/path` (relative to the document root):
//!
//! ```yaml
//! defaults:
//!   timeout: 30
//!   retries: 3
//! service:
//!   inherit: defaults
//!   retries: 5        # own keys win over inherited ones
//! ```
//!
//! When the inherited value is not a mapping, the inheriting mapping is
//! replaced by it outright.

use super::{AttrMap, ConfigError, Value};

/// Key that marks a mapping as inheriting from another path.
pub const INHERIT_KEY: &str = "inherit";

/// Resolves every `inherit` clause in `root`, in place.
///
/// Clauses are resolved one at a time, outermost first, until none remain.
/// Inherited content may itself carry clauses, so a cycle would never settle.
pub fn resolve_inherits(root: &AttrMap) -> Result<(), ConfigError> {
    const MAX_PASSES: usize = 100;

    for _ in 0..MAX_PASSES {
        let mut path = Vec::new();
        match find_clause(root, &mut path) {
            Some(target) => apply_clause(root, &path, &target)?,
            None => return Ok(()),
        }
    }

    Err(ConfigError::CircularInherit)
}

/// Depth-first search for the first mapping with a string `inherit` value.
/// On success `path` holds the keys leading to that mapping.
fn find_clause(map: &AttrMap, path: &mut Vec<String>) -> Option<String> {
    if let Some(Value::String(target)) = map.get_opt(INHERIT_KEY) {
        return Some(target);
    }

    for (key, value) in map.entries() {
        if let Value::Mapping(child) = value {
            path.push(key);
            if let Some(target) = find_clause(&child, path) {
                return Some(target);
            }
            path.pop();
        }
    }

    None
}

fn apply_clause(root: &AttrMap, path: &[String], target: &str) -> Result<(), ConfigError> {
    let target_path: Vec<&str> = target.split('/').collect();
    if target_path.iter().any(|segment| segment.is_empty()) {
        return Err(ConfigError::InheritPathNotFound {
            path: target.to_string(),
        });
    }
    if target_path.iter().eq(path.iter()) {
        // A mapping inheriting itself never loses its clause.
        return Err(ConfigError::CircularInherit);
    }

    let inherited = root
        .lookup(target)
        .map_err(|_| ConfigError::InheritPathNotFound {
            path: target.to_string(),
        })?;
    let node = mapping_at(root, path).ok_or_else(|| ConfigError::InheritPathNotFound {
        path: path.join("/"),
    })?;

    match inherited {
        Value::Mapping(base) => {
            let base = base.deep_clone();
            // Inheriting from an ancestor: leave out the branch we are sitting in.
            if target_path.len() < path.len()
                && target_path.iter().zip(path).all(|(t, p)| *t == p)
            {
                base.remove(&path[target_path.len()]);
            }
            node.remove(INHERIT_KEY);
            base.rebase(&node);
            node.take_from(base);
        }
        other => {
            let (last, parent_path) = path.split_last().ok_or(ConfigError::TypeMismatch {
                expected: "mapping",
                found: other.type_name(),
            })?;
            let parent = mapping_at(root, parent_path).ok_or_else(|| {
                ConfigError::InheritPathNotFound {
                    path: parent_path.join("/"),
                }
            })?;
            parent.insert(last.clone(), other.deep_clone());
        }
    }

    Ok(())
}

fn mapping_at(root: &AttrMap, path: &[String]) -> Option<AttrMap> {
    let mut current = root.clone();
    for key in path {
        current = match current.get_opt(key)? {
            Value::Mapping(map) => map,
            _ => return None,
        };
    }
    Some(current)
}
