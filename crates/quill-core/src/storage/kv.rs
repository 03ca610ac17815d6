//! Key-value store abstraction
//!
//! The storage service persists whole collections as single JSON values
//! under a handful of string keys. Any backend that can get and set a JSON
//! value by key can host a Quill library.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::{StorageError, StorageResult};

/// Keys used in the store
pub mod keys {
    /// Array of books
    pub const BOOKS: &str = "books";
    /// Map of book id to that book's chapters
    pub const CHAPTERS: &str = "chapters";
    /// Map of book id to that book's related entries
    pub const RELATED: &str = "related";
    /// Last allocated book id
    pub const BOOK_ID_COUNTER: &str = "bookIdCounter";
    /// Schema version of the stored records
    pub const SCHEMA_VERSION: &str = "schemaVersion";
}

/// A synchronous key-value store holding JSON values
pub trait KeyValueStore {
    /// Read the value stored under `key`, `None` if unset
    fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: Value) -> StorageResult<()>;
}

/// Typed access on top of [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Read and deserialize the value under `key`
    ///
    /// A value of the wrong shape is reported as [`StorageError::CorruptValue`].
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StorageError::CorruptValue {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// Serialize and store `value` under `key`
    fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.set(key, value)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        (**self).set(key, value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        (**self).set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_get_json_missing_key() {
        let store = MemoryStore::new();
        let value: Option<Vec<u64>> = store.get_json("nothing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_get_json_null_is_none() {
        let mut store = MemoryStore::new();
        store.set("counter", Value::Null).unwrap();
        let value: Option<u64> = store.get_json("counter").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_get_json_wrong_shape_is_corrupt() {
        let mut store = MemoryStore::new();
        store.set("books", json!("not a list")).unwrap();

        let err = store.get_json::<Vec<u64>>("books").unwrap_err();
        assert!(matches!(err, StorageError::CorruptValue { ref key, .. } if key == "books"));
    }

    #[test]
    fn test_set_json_then_get_json() {
        let mut store = MemoryStore::new();
        store.set_json("numbers", &vec![1u64, 2, 3]).unwrap();

        let numbers: Vec<u64> = store.get_json("numbers").unwrap().unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_mut_ref_forwards() {
        fn write_counter<S: KeyValueStore>(mut store: S) {
            store.set_json(keys::BOOK_ID_COUNTER, &4u64).unwrap();
        }

        let mut store = MemoryStore::new();
        write_counter(&mut store);
        assert_eq!(store.get(keys::BOOK_ID_COUNTER).unwrap(), Some(json!(4)));
    }
}
