// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - JSON Body Model
 * Deep key detection, dotted-path lookup, primitive flattening and
 * non-destructive deep set over request/response bodies
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde_json::{Map, Value};

use crate::errors::{RadarError, RadarResult};

/// Strict-parse UTF-8 text into a JSON object.
pub fn parse_object(text: &str) -> RadarResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(text).map_err(|_| RadarError::InvalidJsonBody)?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(RadarError::BodyNotObject),
    }
}

/// True for string, number, boolean and null nodes.
pub fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// DFS over objects and arrays; true if any object node has `key` as an
/// own key.
pub fn contains_key_deep(value: &Value, key: &str) -> bool {
    match value {
        Value::Object(map) => {
            if map.contains_key(key) {
                return true;
            }
            map.values().any(|v| contains_key_deep(v, key))
        }
        Value::Array(items) => items.iter().any(|v| contains_key_deep(v, key)),
        _ => false,
    }
}

/// Look up a primitive by candidate key or dotted path.
///
/// A key containing `.` is treated as a dotted path traversing object
/// children in order; the terminal value is returned iff it is primitive.
/// A plain key is resolved by DFS to the first object node carrying it
/// with a primitive value.
pub fn get_primitive_deep<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    if key.contains('.') {
        let mut node = value;
        for segment in key.split('.') {
            node = node.as_object()?.get(segment)?;
        }
        return is_primitive(node).then_some(node);
    }
    find_primitive(value, key)
}

fn find_primitive<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(key) {
                if is_primitive(v) {
                    return Some(v);
                }
            }
            map.values().find_map(|v| find_primitive(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_primitive(v, key)),
        _ => None,
    }
}

/// Flatten every primitive under the tree to `(path, stringified)` pairs
/// in document order. Paths use `a.b` for object descent and `a[i]` for
/// array indices.
pub fn get_all_primitives(value: &Value, prefix: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten(value, prefix, &mut out);
    out
}

fn flatten(value: &Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(child, &path, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(child, &format!("{}[{}]", prefix, index), out);
            }
        }
        _ => out.push((prefix.to_string(), safe_stringify(value))),
    }
}

/// Return a fresh object with `path` (dotted) created or overwritten.
///
/// Intermediate non-object nodes along the path are replaced by fresh
/// objects; everything off the path is carried over unchanged.
pub fn set_deep(obj: &Map<String, Value>, path: &str, value: Value) -> Map<String, Value> {
    let mut root = obj.clone();
    let segments: Vec<&str> = path.split('.').collect();

    let mut node = &mut root;
    for segment in &segments[..segments.len() - 1] {
        let entry = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        node = entry.as_object_mut().expect("entry forced to object");
    }
    node.insert(segments[segments.len() - 1].to_string(), value);
    root
}

/// The single stringification used both to label findings and to compare
/// values. Comparisons are always textual, never structural, so `"1"` and
/// `1` unify the way typical JSON APIs echo them.
pub fn safe_stringify(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Textual equality of two JSON values under `safe_stringify`.
pub fn stringify_eq(a: &Value, b: &Value) -> bool {
    safe_stringify(a) == safe_stringify(b)
}
