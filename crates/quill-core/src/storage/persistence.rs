//! File-backed key-value store
//!
//! The whole key space lives in one JSON object on disk. Every `set`
//! rewrites the file using an atomic write (write to temp file, then
//! rename), so a failed write leaves the previous snapshot in place.
//!
//! Storage location: `~/.local/share/quill/store.json` (configurable via `Config`)

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::kv::KeyValueStore;
use crate::config::Config;

/// A [`KeyValueStore`] persisted as a single JSON file
///
/// The file is read on open and kept in memory; reads are served from the
/// cached snapshot.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: Map<String, Value>,
}

impl FileStore {
    /// Open the store file at `path`
    ///
    /// A missing file is an empty store. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = load_snapshot(&path)?;
        debug!("Opened store {:?} with {} key(s)", path, data.len());
        Ok(Self { path, data })
    }

    /// Open the store file configured in `config`
    pub fn open_with_config(config: &Config) -> StorageResult<Self> {
        Self::open(config.store_path())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the backing file exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size of the backing file in bytes, 0 if it has not been written yet
    pub fn file_size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Keys currently stored
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    fn persist(&self, data: &Map<String, Value>) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec_pretty(data).map_err(|source| StorageError::Serialize {
                key: "*".to_string(),
                source,
            })?;
        atomic_write(&self.path, &bytes)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        let mut next = self.data.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        self.data = next;
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> StorageResult<Map<String, Value>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(StorageError::PermissionDenied {
                path: path.to_path_buf(),
                source: e,
            })
        }
        Err(e) => {
            return Err(StorageError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StorageError::CorruptFile {
            path: path.to_path_buf(),
            details: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
        Err(e) => Err(StorageError::CorruptFile {
            path: path.to_path_buf(),
            details: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("store.json")).unwrap();

        assert!(!store.exists());
        assert_eq!(store.keys().count(), 0);
        assert!(store.get("books").unwrap().is_none());
        assert_eq!(store.file_size(), 0);
    }

    #[test]
    fn test_set_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        {
            let mut store = FileStore::open(&path).unwrap();
            store.set("bookIdCounter", json!(2)).unwrap();
            store.set("books", json!([{"id": 1}, {"id": 2}])).unwrap();
            assert!(store.exists());
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("bookIdCounter").unwrap(), Some(json!(2)));
        assert_eq!(store.get("books").unwrap(), Some(json!([{"id": 1}, {"id": 2}])));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_open_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::CorruptFile { .. }));
    }

    #[test]
    fn test_open_non_object_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "[1, 2]").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_open_blank_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "\n").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.keys().count(), 0);
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("books", json!([])).unwrap();

        // A directory squatting on the temp path makes File::create fail
        fs::create_dir(path.with_extension("tmp")).unwrap();

        assert!(store.set("books", json!([{"id": 1}])).is_err());
        assert_eq!(store.get("books").unwrap(), Some(json!([])));

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("books").unwrap(), Some(json!([])));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("store.json");

        atomic_write(&nested_path, b"{}").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "{}");
    }
}
