//! YAML data handling utilities.

use genesis_types::Result;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// Load YAML from string.
pub fn load_yaml(content: &str) -> Result<Value> {
    serde_yaml::from_str(content).map_err(Into::into)
}

/// Load YAML from file.
pub fn load_yaml_file(path: impl AsRef<Path>) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    load_yaml(&content)
}

/// Deep merge two YAML values (spruce-style).
/// Recursively merges mappings, with overlay values taking precedence.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                match base_map.remove(&key) {
                    Some(base_val) => {
                        base_map.insert(key, deep_merge(base_val, overlay_val));
                    }
                    None => {
                        base_map.insert(key, overlay_val);
                    }
                }
            }
            Value::Mapping(base_map)
        }
        (_, overlay_val) => overlay_val,
    }
}

/// Fetch a string out of a YAML mapping by key.
pub fn get_str<'a>(map: &'a Value, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Fetch a bool out of a YAML mapping by key, with a default.
pub fn get_bool(map: &Value, key: &str, default: bool) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_merge_nested() {
        let base = load_yaml("a: {x: 1, y: 2}\nb: keep").unwrap();
        let overlay = load_yaml("a: {y: 3, z: 4}").unwrap();

        let merged = deep_merge(base, overlay);
        assert_eq!(merged["a"]["x"].as_i64(), Some(1));
        assert_eq!(merged["a"]["y"].as_i64(), Some(3));
        assert_eq!(merged["a"]["z"].as_i64(), Some(4));
        assert_eq!(merged["b"].as_str(), Some("keep"));
    }

    #[test]
    fn test_deep_merge_scalar_replaces() {
        let base = load_yaml("a: {x: 1}").unwrap();
        let overlay = load_yaml("a: flat").unwrap();
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["a"].as_str(), Some("flat"));
    }
}
