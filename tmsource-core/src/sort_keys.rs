//! Deterministic key ordering for stable, diffable serialization.

use std::cmp::Ordering;

use serde::Serialize;
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};

/// Recursively reorder the keys of every mapping in `value`.
///
/// Keys are compared case-insensitively, except that a key equal to `id`
/// (in any case) always comes first. Sequences keep their element order,
/// scalars are returned as is. Keys that compare equal keep their relative
/// order. A mapping with a key that has no textual form (a sequence or a
/// mapping used as a key) keeps its key order, its values are still sorted.
#[must_use]
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(sort_keys).collect()),
        Value::Mapping(map) => sort_mapping(map),
        Value::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            Value::Tagged(Box::new(TaggedValue {
                tag,
                value: sort_keys(value),
            }))
        }
        scalar => scalar,
    }
}

/// Serialize `value` to YAML with all mapping keys ordered by [`sort_keys`].
pub fn to_sorted_yaml<T: Serialize>(value: &T) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&sort_keys(serde_yaml::to_value(value)?))
}

fn sort_mapping(map: Mapping) -> Value {
    if map.keys().any(|k| key_name(k).is_none()) {
        return Value::Mapping(map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect());
    }

    let mut entries: Vec<(String, Value, Value)> = map
        .into_iter()
        .map(|(k, v)| (key_name(&k).unwrap_or_default(), k, v))
        .collect();
    entries.sort_by(|(a, ..), (b, ..)| compare_keys(a, b));

    Value::Mapping(
        entries
            .into_iter()
            .map(|(_, k, v)| (k, sort_keys(v)))
            .collect(),
    )
}

/// Lowercased textual form of a mapping key
fn key_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Tagged(tagged) => key_name(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a == "id", b == "id") {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}
