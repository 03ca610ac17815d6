//! In-memory key-value store

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::StorageResult;
use super::kv::KeyValueStore;

/// A [`KeyValueStore`] kept entirely in memory
///
/// Useful for tests and for embedding where the caller persists the
/// snapshot itself (see [`MemoryStore::snapshot`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    data: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an existing JSON object
    ///
    /// Non-object values produce an empty store.
    pub fn from_snapshot(snapshot: Value) -> Self {
        let data = match snapshot {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self { data }
    }

    /// The whole key space as one JSON object
    pub fn snapshot(&self) -> Value {
        Value::Object(self.data.clone().into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("books", json!([])).unwrap();
        assert_eq!(store.get("books").unwrap(), Some(json!([])));
        assert_eq!(store.len(), 1);
        assert!(store.get("chapters").unwrap().is_none());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut store = MemoryStore::new();
        store.set("bookIdCounter", json!(3)).unwrap();
        store.set("books", json!([{"id": 1}])).unwrap();

        let restored = MemoryStore::from_snapshot(store.snapshot());
        assert_eq!(restored, store);
    }

    #[test]
    fn test_from_non_object_snapshot() {
        let store = MemoryStore::from_snapshot(json!([1, 2, 3]));
        assert!(store.is_empty());
    }
}
