//! Query store.
//!
//! # Data Flow
//! ```text
//! location search string ("?a=1&b=2")
//!     → parse() → QueryMap (ordered, unique keys)
//!     → merge(existing, overrides) on imperative updates
//!     → serialize() → search string written back by the location source
//! ```
//!
//! # Design Decisions
//! - Keys are unique; a repeated key keeps its first position and its last value
//! - Encoding is `application/x-www-form-urlencoded` via the `url` crate
//! - `parse(serialize(m)) == m` for any map of printable strings

use serde::ser::{Serialize, SerializeMap, Serializer};
use url::form_urlencoded;

/// Ordered key-value map backing the location search string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    entries: Vec<(String, String)>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite in place. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = QueryMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for QueryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Parse a search string. A leading `?` is optional.
pub fn parse(search: &str) -> QueryMap {
    let search = search.strip_prefix('?').unwrap_or(search);
    form_urlencoded::parse(search.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Serialize without the leading `?`. An empty map yields an empty string.
pub fn serialize(map: &QueryMap) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in map.iter() {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

/// Overrides win on collision; existing order is kept and new keys are appended.
pub fn merge(existing: &QueryMap, overrides: &QueryMap) -> QueryMap {
    let mut merged = existing.clone();
    for (k, v) in overrides.iter() {
        merged.insert(k, v);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairs() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("\\PC{1,8}", "\\PC{0,12}"), 0..8)
    }

    #[test]
    fn test_parse_basic() {
        let map = parse("?truth=42&x=y");
        assert_eq!(map.get("truth"), Some("42"));
        assert_eq!(map.get("x"), Some("y"));
        assert_eq!(map.len(), 2);

        assert!(parse("").is_empty());
        assert!(parse("?").is_empty());
    }

    #[test]
    fn test_repeated_key_keeps_first_position() {
        let map = parse("a=1&b=2&a=3");
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some("3"));
    }

    #[test]
    fn test_round_trip_with_reserved_characters() {
        let map: QueryMap = vec![
            ("q", "rust & routers"),
            ("path", "/a/b?c=d#e"),
            ("empty", ""),
            ("plus", "1+1=2"),
            ("ünï", "cödé"),
        ]
        .into_iter()
        .collect();

        assert_eq!(parse(&serialize(&map)), map);
    }

    #[test]
    fn test_merge_overrides_and_appends() {
        let existing: QueryMap = vec![("a", "1")].into_iter().collect();
        let overrides: QueryMap = vec![("a", "2"), ("b", "3")].into_iter().collect();

        let merged = merge(&existing, &overrides);
        let expected: QueryMap = vec![("a", "2"), ("b", "3")].into_iter().collect();
        assert_eq!(merged, expected);

        let existing: QueryMap = vec![("z", "0"), ("a", "1")].into_iter().collect();
        let merged = merge(&existing, &overrides);
        let keys: Vec<&str> = merged.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_serializes_as_ordered_json_object() {
        let map: QueryMap = vec![("truth", "42"), ("x", "y")].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"truth":"42","x":"y"}"#
        );
    }

    #[test]
    fn test_remove() {
        let mut map = parse("a=1&b=2");
        assert_eq!(map.remove("a"), Some("1".to_string()));
        assert!(!map.contains_key("a"));
        assert_eq!(serialize(&map), "b=2");
    }

    proptest! {
        #[test]
        fn prop_parse_inverts_serialize(pairs in pairs()) {
            let map: QueryMap = pairs.into_iter().collect();
            prop_assert_eq!(parse(&serialize(&map)), map);
        }

        #[test]
        fn prop_merge_keeps_order_and_prefers_overrides(existing in pairs(), overrides in pairs()) {
            let existing: QueryMap = existing.into_iter().collect();
            let overrides: QueryMap = overrides.into_iter().collect();
            let merged = merge(&existing, &overrides);

            let expected_keys: Vec<&str> = existing
                .iter()
                .map(|(k, _)| k)
                .chain(overrides.iter().map(|(k, _)| k).filter(|k| !existing.contains_key(k)))
                .collect();
            let keys: Vec<&str> = merged.iter().map(|(k, _)| k).collect();
            prop_assert_eq!(keys, expected_keys);

            for (k, v) in merged.iter() {
                let expected = overrides.get(k).or_else(|| existing.get(k));
                prop_assert_eq!(Some(v), expected);
            }
        }
    }
}
