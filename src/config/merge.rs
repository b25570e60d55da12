//! Configuration merge logic
//!
//! TOML documents are flattened into dotted keys before merging:
//! - Tables: one key per leaf (`rest.port`)
//! - Arrays: joined with `;` as a single value
//! - Scalars: override (last layer wins)

use std::collections::BTreeMap;

/// Flatten a TOML value into dotted keys.
pub fn flatten_toml(value: &toml::Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &toml::Value, path: String, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let current = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_into(val, current, out);
            }
        }
        toml::Value::Array(arr) => {
            let joined = arr.iter().map(scalar_to_string).collect::<Vec<_>>().join(";");
            out.insert(path, joined);
        }
        other => {
            out.insert(path, scalar_to_string(other));
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        other => other.to_string(),
    }
}

/// Merge flat layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<BTreeMap<String, String>>) -> BTreeMap<String, String> {
    layers.into_iter().fold(BTreeMap::new(), |mut merged, layer| {
        merged.extend(layer);
        merged
    })
}
