//! Static topic-id → topic-name lookup.
//!
//! The classifier model emits integer topic ids; this map translates them
//! to human-readable names. It is loaded once at process start from a JSON
//! side file and injected read-only into the classifier job, so it can be
//! swapped or faked independently of the model client.
//!
//! An id absent from the map is a version mismatch between the model and
//! its topic table — `resolve` fails with `UnknownTopic` and the caller
//! must not paper over it.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Read-only topic-id lookup table.
#[derive(Debug, Clone, Default)]
pub struct TopicMap {
    entries: HashMap<i32, String>,
}

impl TopicMap {
    /// Build a map from explicit entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i32, String)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Parse the JSON side-file format: an object of stringified ids to
    /// names, e.g. `{"0": "none", "1": "politics"}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, name) in raw {
            let id: i32 = key
                .parse()
                .map_err(|_| Error::Config(format!("Non-integer topic id in map: {key:?}")))?;
            entries.insert(id, name);
        }
        Ok(Self { entries })
    }

    /// Load the map from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Resolve a topic id to its name.
    pub fn resolve(&self, topic_id: i32) -> Result<&str> {
        self.entries
            .get(&topic_id)
            .map(String::as_str)
            .ok_or(Error::UnknownTopic(topic_id))
    }

    /// True if the map contains the id.
    pub fn contains(&self, topic_id: i32) -> bool {
        self.entries.contains_key(&topic_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> TopicMap {
        TopicMap::from_entries([
            (0, "none".to_string()),
            (1, "politics".to_string()),
            (2, "health".to_string()),
        ])
    }

    #[test]
    fn test_resolve_known_id() {
        let map = sample_map();
        assert_eq!(map.resolve(1).unwrap(), "politics");
        assert_eq!(map.resolve(0).unwrap(), "none");
    }

    #[test]
    fn test_resolve_unknown_id_errors() {
        let map = sample_map();
        match map.resolve(99) {
            Err(Error::UnknownTopic(99)) => {}
            other => panic!("Expected UnknownTopic(99), got {other:?}"),
        }
    }

    #[test]
    fn test_from_json_str() {
        let map = TopicMap::from_json_str(r#"{"0": "none", "3": "religion"}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve(3).unwrap(), "religion");
        assert!(!map.contains(1));
    }

    #[test]
    fn test_from_json_str_rejects_non_integer_key() {
        let result = TopicMap::from_json_str(r#"{"politics": "politics"}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json_str_rejects_malformed_json() {
        let result = TopicMap::from_json_str("{not json");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_empty_map() {
        let map = TopicMap::default();
        assert!(map.is_empty());
        assert!(matches!(map.resolve(0), Err(Error::UnknownTopic(0))));
    }
}
