//! Key-path lookup over untyped JSON records.
//!
//! Upstream sources disagree on field names and nesting, so every extraction
//! in the crate is expressed as an ordered list of dot-separated key paths
//! (`"samhita.devanagari.text"`) evaluated with [`first_of`]: the first path
//! that resolves to a usable value wins. Nothing here fails: missing keys,
//! wrong types, and non-object intermediates all read as "absent".

use serde_json::Value;

/// Resolve a dot-separated key path against a JSON value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

/// A non-empty JSON string.
pub fn as_text(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// A positive integer, given either as a JSON integer or a numeric string.
pub fn as_ordinal(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }?;
    (n > 0).then_some(n)
}

/// Evaluate `accessor` at each path in order and return the first hit.
pub fn first_of<'a, T, P>(
    record: &'a Value,
    paths: &[P],
    accessor: impl Fn(&'a Value) -> Option<T>,
) -> Option<T>
where
    P: AsRef<str>,
{
    paths
        .iter()
        .find_map(|path| lookup(record, path.as_ref()).and_then(&accessor))
}

/// First non-empty string among `paths`, or the empty string.
pub fn first_text<P: AsRef<str>>(record: &Value, paths: &[P]) -> String {
    first_of(record, paths, as_text)
        .map(str::to_string)
        .unwrap_or_default()
}

/// First non-empty string among `paths`, or `None`.
pub fn first_opt_text<P: AsRef<str>>(record: &Value, paths: &[P]) -> Option<String> {
    first_of(record, paths, as_text).map(str::to_string)
}

/// First positive ordinal among `paths`.
pub fn first_ordinal<P: AsRef<str>>(record: &Value, paths: &[P]) -> Option<u32> {
    first_of(record, paths, as_ordinal)
}

/// First array among `paths` (possibly empty).
pub fn first_array<'a, P: AsRef<str>>(record: &'a Value, paths: &[P]) -> Option<&'a [Value]> {
    first_of(record, paths, |v| v.as_array().map(Vec::as_slice))
}
