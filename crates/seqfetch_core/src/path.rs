use serde_json::Value;

/// Walks a dot-separated path (`"data.list"`) through nested objects.
///
/// Numeric segments also index arrays. An empty path yields `value` itself.
/// Any missing key or non-container along the way yields `None`.
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Owned variant of [`extract_path`] that falls back to `default`.
pub fn extract_or(value: &Value, path: &str, default: Value) -> Value {
    extract_path(value, path).cloned().unwrap_or(default)
}

/// Path of the container holding the last segment; empty for top-level fields.
pub fn parent_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('.');
    match trimmed.rfind('.') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}
