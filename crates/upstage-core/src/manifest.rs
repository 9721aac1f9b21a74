//! Dependency-table helpers for package manifests.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Dependency tables in the order they are searched.
pub const DEPENDENCY_TABLES: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

fn table_keys(manifest: &Value, table: &str) -> BTreeSet<String> {
    manifest
        .get(table)
        .and_then(Value::as_object)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

/// Names listed under `dependencies`.
pub fn dependencies(manifest: &Value) -> BTreeSet<String> {
    table_keys(manifest, "dependencies")
}

/// Names listed under `devDependencies`.
pub fn dev_dependencies(manifest: &Value) -> BTreeSet<String> {
    table_keys(manifest, "devDependencies")
}

/// Adds or replaces a development dependency.
///
/// Creates the `devDependencies` table if needed. Does nothing when the
/// manifest is not an object.
pub fn add_dev_dependency(manifest: &mut Value, name: &str, version: &str) {
    let Some(root) = manifest.as_object_mut() else {
        return;
    };
    let table = root
        .entry("devDependencies")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(deps) = table.as_object_mut() {
        deps.insert(name.to_string(), Value::String(version.to_string()));
    }
}

/// Renames a dependency in whichever table lists it, keeping its version.
///
/// Returns `true` if an entry was moved. The renamed entry takes the position
/// of the old one; other entries keep their order. An existing entry named
/// `to` is replaced.
///
/// ```
/// use serde_json::json;
/// use upstage_core::manifest::replace_dependency;
///
/// let mut manifest = json!({"devDependencies": {"babel-cli": "^6.0.0", "ava": "4.0.0"}});
/// assert!(replace_dependency(&mut manifest, "babel-cli", "@babel/cli"));
/// assert_eq!(
///     manifest,
///     json!({"devDependencies": {"@babel/cli": "^6.0.0", "ava": "4.0.0"}})
/// );
/// ```
pub fn replace_dependency(manifest: &mut Value, from: &str, to: &str) -> bool {
    let mut moved = false;
    for table in DEPENDENCY_TABLES {
        let Some(deps) = manifest.get_mut(table).and_then(Value::as_object_mut) else {
            continue;
        };
        if !deps.contains_key(from) {
            continue;
        }
        for (name, version) in std::mem::take(deps) {
            if name == from {
                deps.insert(to.to_string(), version);
            } else if name != to {
                deps.insert(name, version);
            }
        }
        moved = true;
    }
    moved
}

/// Recursively sorts object keys.
///
/// Arrays keep their element order; objects nested in them are sorted too.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted = map
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect::<std::collections::BTreeMap<_, _>>();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
