use serde_json::Value;

/// Depth-first search for the first occurrence of `key` anywhere in a JSON
/// tree, returning its value. Mirrors the original scraper's `find_key`
/// helper — the embed page's JSON shape shifts around `trackList` depending
/// on how deeply Spotify nests it, so a plain field access isn't reliable.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|v| find_key(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}
