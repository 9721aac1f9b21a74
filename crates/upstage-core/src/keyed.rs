//! Order-preserving upserts into keyed JSON arrays.
//!
//! Tool configuration often stores plugin and preset lists as arrays whose
//! entries are either a bare name (`"power-assert"`) or a `[name, options]`
//! pair (`["transform-remove-console", {"exclude": ["log"]}]`). These helpers
//! treat such arrays as ordered maps keyed by the name.

use serde_json::Value;

/// Uniform `(key, optional value)` view of one array entry.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedEntry {
    /// The entry key; usually a string.
    pub key: Value,
    /// The associated options, if any.
    pub value: Option<Value>,
}

impl KeyedEntry {
    /// Creates an entry.
    pub fn new(key: impl Into<Value>, value: Option<Value>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Normalizes an array element.
    ///
    /// A two-element array whose first element is a string is a pair; anything
    /// else is a bare key.
    pub fn from_value(item: &Value) -> Self {
        match item {
            Value::Array(pair) if pair.len() == 2 && pair[0].is_string() => Self {
                key: pair[0].clone(),
                value: Some(pair[1].clone()),
            },
            other => Self {
                key: other.clone(),
                value: None,
            },
        }
    }

    /// Emits the compact form: a bare key when there is no value.
    pub fn into_value(self) -> Value {
        match self.value {
            Some(value) => Value::Array(vec![self.key, value]),
            None => self.key,
        }
    }
}

fn entries(collection: Option<&Value>) -> Vec<KeyedEntry> {
    match collection {
        Some(Value::Array(items)) => items.iter().map(KeyedEntry::from_value).collect(),
        _ => Vec::new(),
    }
}

fn collect(entries: Vec<KeyedEntry>) -> Value {
    Value::Array(entries.into_iter().map(KeyedEntry::into_value).collect())
}

/// Replaces the entry with the same key as `item`, or appends `item`.
///
/// The position of a replaced entry is kept. A missing or non-array
/// collection is treated as empty.
///
/// ```
/// use serde_json::json;
/// use upstage_core::keyed::replace_or_insert;
///
/// let plugins = json!(["a", ["b", {"x": 1}], "c"]);
/// assert_eq!(
///     replace_or_insert(Some(&plugins), &json!(["b", {"x": 2}])),
///     json!(["a", ["b", {"x": 2}], "c"])
/// );
/// assert_eq!(replace_or_insert(None, &json!("d")), json!(["d"]));
/// ```
pub fn replace_or_insert(collection: Option<&Value>, item: &Value) -> Value {
    let item = KeyedEntry::from_value(item);
    let mut entries = entries(collection);
    match entries.iter_mut().find(|entry| entry.key == item.key) {
        Some(entry) => entry.value = item.value,
        None => entries.push(item),
    }
    collect(entries)
}

/// Removes entries keyed by `key`.
///
/// When `value` is given only entries carrying exactly that value are removed.
///
/// ```
/// use serde_json::json;
/// use upstage_core::keyed::remove;
///
/// let args = json!([["--loader", "babel"], "--verbose"]);
/// assert_eq!(remove(Some(&args), &json!("--loader"), Some(&json!("core"))), args);
/// assert_eq!(remove(Some(&args), &json!("--loader"), None), json!(["--verbose"]));
/// ```
pub fn remove(collection: Option<&Value>, key: &Value, value: Option<&Value>) -> Value {
    let entries = entries(collection)
        .into_iter()
        .filter(|entry| {
            let same_key = entry.key == *key;
            let same_value = match value {
                Some(expected) => entry.value.as_ref() == Some(expected),
                None => true,
            };
            !(same_key && same_value)
        })
        .collect();
    collect(entries)
}

/// Returns `true` if an entry with the same key and value as `item` exists.
///
/// A bare key only matches a bare entry.
///
/// ```
/// use serde_json::json;
/// use upstage_core::keyed::includes;
///
/// let presets = json!(["power-assert", ["env", {"targets": "node"}]]);
/// assert!(includes(Some(&presets), &json!("power-assert")));
/// assert!(!includes(Some(&presets), &json!("env")));
/// assert!(includes(Some(&presets), &json!(["env", {"targets": "node"}])));
/// assert!(!includes(None, &json!("power-assert")));
/// ```
pub fn includes(collection: Option<&Value>, item: &Value) -> bool {
    let item = KeyedEntry::from_value(item);
    entries(collection).contains(&item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_absent_value_collapses_to_bare_key() {
        let entry = KeyedEntry::new("power-assert", None);
        assert_eq!(entry.into_value(), json!("power-assert"));

        let collection = json!([["a", 1]]);
        assert_eq!(
            replace_or_insert(Some(&collection), &json!("a")),
            json!(["a"])
        );
    }

    #[test]
    fn test_null_is_a_value() {
        let collection = json!(["a"]);
        assert_eq!(
            replace_or_insert(Some(&collection), &json!(["a", null])),
            json!([["a", null]])
        );
    }

    #[test]
    fn test_non_array_collection_is_empty() {
        assert_eq!(replace_or_insert(Some(&json!({})), &json!("a")), json!(["a"]));
        assert_eq!(remove(Some(&json!("oops")), &json!("a"), None), json!([]));
        assert!(!includes(Some(&json!(3)), &json!(3)));
    }

    #[test]
    fn test_insert_appends_at_end() {
        let collection = json!(["a", "b"]);
        assert_eq!(
            replace_or_insert(Some(&collection), &json!(["c", {"x": true}])),
            json!(["a", "b", ["c", {"x": true}]])
        );
    }

    fn collection_strategy() -> impl Strategy<Value = Vec<(String, Option<u8>)>> {
        proptest::collection::btree_map("[a-e]", proptest::option::of(0u8..4), 0..5)
            .prop_map(|map| map.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    }

    fn to_json(entries: &[(String, Option<u8>)]) -> Value {
        collect(
            entries
                .iter()
                .map(|(k, v)| KeyedEntry::new(k.clone(), v.map(Value::from)))
                .collect(),
        )
    }

    proptest! {
        #[test]
        fn prop_replace_or_insert(
            entries in collection_strategy(),
            key in "[a-f]",
            value in proptest::option::of(0u8..4),
        ) {
            let collection = to_json(&entries);
            let item = KeyedEntry::new(key.clone(), value.map(Value::from)).into_value();

            let once = replace_or_insert(Some(&collection), &item);
            let twice = replace_or_insert(Some(&once), &item);
            prop_assert_eq!(&once, &twice);

            let keys: Vec<Value> = match &once {
                Value::Array(items) => items.iter().map(|i| KeyedEntry::from_value(i).key).collect(),
                _ => unreachable!(),
            };
            prop_assert_eq!(keys.iter().filter(|k| **k == Value::from(key.clone())).count(), 1);
            prop_assert!(includes(Some(&once), &item));

            let others: Vec<Value> = keys.into_iter().filter(|k| *k != Value::from(key.clone())).collect();
            let original_others: Vec<Value> = entries
                .iter()
                .filter(|(k, _)| *k != key)
                .map(|(k, _)| Value::from(k.clone()))
                .collect();
            prop_assert_eq!(others, original_others);
        }
    }
}
