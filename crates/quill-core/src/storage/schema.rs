//! Schema versioning and record upgrades
//!
//! The store carries a `schemaVersion` key. Stores written before the key
//! existed are version 0. Opening a [`crate::StorageService`] runs every
//! pending upgrade once and then bumps the version, so reads never have to
//! rewrite data.
//!
//! ## Versions
//!
//! - **0**: chapter records may lack `content`, `wordCount` or `volume`,
//!   and may carry an empty `volume` label.
//! - **1**: every chapter record has `content` (string) and `wordCount`
//!   (integer); `volume` is either a non-empty string or absent.

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::error::{StorageError, StorageResult};
use super::kv::{keys, KeyValueStore, KeyValueStoreExt};

/// Current schema version
pub const SCHEMA_VERSION: u64 = 1;

/// An upgrade from version `n` to `n + 1`, indexed by `n`
///
/// Returns `Some` with the number of records it changed, or `None` when
/// it could not read its input. `None` stops the run and leaves the
/// version key untouched.
type Upgrade = fn(&mut dyn KeyValueStore) -> StorageResult<Option<usize>>;

const UPGRADES: &[Upgrade] = &[upgrade_chapter_fields];

/// Outcome of a [`migrate`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationReport {
    /// Version found in the store
    pub from: u64,
    /// Version the store is at after the run
    pub to: u64,
    /// Number of records rewritten
    pub records_upgraded: usize,
    /// An upgrade could not read its input and the run stopped early
    pub skipped: bool,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.from == self.to && self.records_upgraded == 0
    }
}

/// Read the schema version recorded in the store (0 if absent)
pub fn stored_version<S: KeyValueStore + ?Sized>(store: &S) -> StorageResult<u64> {
    Ok(store.get_json::<u64>(keys::SCHEMA_VERSION)?.unwrap_or(0))
}

/// Check whether the store needs upgrading
pub fn needs_migration<S: KeyValueStore + ?Sized>(store: &S) -> StorageResult<bool> {
    Ok(stored_version(store)? < SCHEMA_VERSION)
}

/// Bring the store up to [`SCHEMA_VERSION`]
///
/// Read failures stop the run and are reported through
/// [`MigrationReport::skipped`] without touching the version key; the
/// affected data then reads as empty until it is repaired. Write failures
/// are returned. A store newer than this build fails with
/// [`StorageError::UnsupportedSchema`].
pub fn migrate<S: KeyValueStore>(store: &mut S) -> StorageResult<MigrationReport> {
    let from = match stored_version(&*store) {
        Ok(version) => version,
        Err(e) => {
            error!("Failed to read schema version, skipping migration: {}", e);
            return Ok(MigrationReport {
                skipped: true,
                ..MigrationReport::default()
            });
        }
    };

    if from > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchema {
            found: from,
            supported: SCHEMA_VERSION,
        });
    }

    let mut report = MigrationReport {
        from,
        to: from,
        ..MigrationReport::default()
    };

    for (version, upgrade) in UPGRADES.iter().enumerate().skip(from as usize) {
        let next = version as u64 + 1;
        match upgrade(&mut *store as &mut dyn KeyValueStore)? {
            Some(changed) => {
                report.records_upgraded += changed;
                store.set_json(keys::SCHEMA_VERSION, &next)?;
                report.to = next;
                info!(
                    "Upgraded store schema {} -> {} ({} record(s) changed)",
                    version, next, changed
                );
            }
            None => {
                report.skipped = true;
                break;
            }
        }
    }

    Ok(report)
}

/// 0 -> 1: backfill chapter `content`/`wordCount`, drop empty `volume`
fn upgrade_chapter_fields(store: &mut dyn KeyValueStore) -> StorageResult<Option<usize>> {
    let all = match store.get(keys::CHAPTERS) {
        Ok(Some(Value::Object(map))) => map,
        Ok(None) | Ok(Some(Value::Null)) => return Ok(Some(0)),
        Ok(Some(_)) => {
            error!("Chapter map is not an object, skipping chapter upgrade");
            return Ok(None);
        }
        Err(e) => {
            error!("Failed to read chapters for upgrade: {}", e);
            return Ok(None);
        }
    };

    let mut changed = 0;
    let mut upgraded = Map::with_capacity(all.len());

    for (book_id, list) in all {
        let list = match list {
            Value::Array(chapters) => Value::Array(
                chapters
                    .into_iter()
                    .map(|chapter| {
                        let (chapter, was_changed) = upgrade_chapter_record(chapter);
                        if was_changed {
                            changed += 1;
                        }
                        chapter
                    })
                    .collect(),
            ),
            other => {
                warn!("Chapters for book {} are not a list, leaving as-is", book_id);
                other
            }
        };
        upgraded.insert(book_id, list);
    }

    if changed > 0 {
        store.set(keys::CHAPTERS, Value::Object(upgraded))?;
    }

    Ok(Some(changed))
}

/// Normalize one version-0 chapter record
///
/// Returns the upgraded record and whether anything changed. Non-object
/// entries are returned untouched.
fn upgrade_chapter_record(record: Value) -> (Value, bool) {
    let mut fields = match record {
        Value::Object(fields) => fields,
        other => return (other, false),
    };
    let mut changed = false;

    match fields.get("title") {
        Some(Value::String(_)) => {}
        _ => {
            fields.insert("title".to_string(), Value::String(String::new()));
            changed = true;
        }
    }

    match fields.get("content") {
        Some(Value::String(_)) => {}
        None | Some(Value::Null) | Some(Value::Bool(false)) => {
            fields.insert("content".to_string(), Value::String(String::new()));
            changed = true;
        }
        Some(other) => {
            let text = other.to_string();
            fields.insert("content".to_string(), Value::String(text));
            changed = true;
        }
    }

    let word_count = fields.get("wordCount").cloned();
    match word_count {
        Some(Value::Number(n)) if n.is_u64() => {}
        Some(Value::Number(n)) => {
            let count = n.as_f64().filter(|f| *f > 0.0).map_or(0, |f| f.round() as u64);
            fields.insert("wordCount".to_string(), Value::from(count));
            changed = true;
        }
        _ => {
            fields.insert("wordCount".to_string(), Value::from(0u64));
            changed = true;
        }
    }

    let keep_volume = matches!(fields.get("volume"), Some(Value::String(s)) if !s.is_empty());
    if !keep_volume && fields.remove("volume").is_some() {
        changed = true;
    }

    (Value::Object(fields), changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn legacy_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .set(
                keys::CHAPTERS,
                json!({
                    "1": [
                        {"id": 1, "bookId": 1, "title": "Old"},
                        {"id": 2, "bookId": 1, "title": "Blank", "content": "", "wordCount": 0, "volume": ""},
                        {"id": 3, "bookId": 1, "title": "Good", "content": "x", "wordCount": 1, "volume": "V"}
                    ]
                }),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_fresh_store_is_version_zero() {
        let store = MemoryStore::new();
        assert_eq!(stored_version(&store).unwrap(), 0);
        assert!(needs_migration(&store).unwrap());
    }

    #[test]
    fn test_migrate_empty_store_sets_version() {
        let mut store = MemoryStore::new();
        let report = migrate(&mut store).unwrap();

        assert_eq!(report.from, 0);
        assert_eq!(report.to, SCHEMA_VERSION);
        assert_eq!(report.records_upgraded, 0);
        assert!(!report.skipped);
        assert!(store.get(keys::CHAPTERS).unwrap().is_none());
        assert!(!needs_migration(&store).unwrap());
    }

    #[test]
    fn test_migrate_backfills_legacy_chapters() {
        let mut store = legacy_store();
        let report = migrate(&mut store).unwrap();

        assert_eq!(report.records_upgraded, 2);
        let chapters = store.get(keys::CHAPTERS).unwrap().unwrap();
        let list = chapters["1"].as_array().unwrap();

        assert_eq!(list[0]["content"], "");
        assert_eq!(list[0]["wordCount"], 0);
        assert!(list[0].get("volume").is_none());
        assert!(list[1].get("volume").is_none());
        assert_eq!(list[2]["volume"], "V");
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let mut store = legacy_store();
        migrate(&mut store).unwrap();
        let after_first = store.clone();

        let report = migrate(&mut store).unwrap();
        assert!(report.is_noop());
        assert_eq!(store, after_first);
    }

    #[test]
    fn test_migrate_rejects_newer_schema() {
        let mut store = MemoryStore::new();
        store.set(keys::SCHEMA_VERSION, json!(SCHEMA_VERSION + 1)).unwrap();

        let err = migrate(&mut store).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedSchema { .. }));
    }

    #[test]
    fn test_migrate_skips_corrupt_chapter_map() {
        let mut store = MemoryStore::new();
        store.set(keys::CHAPTERS, json!("garbage")).unwrap();

        let report = migrate(&mut store).unwrap();
        assert!(report.skipped);
        assert_eq!(stored_version(&store).unwrap(), 0);
        assert_eq!(store.get(keys::CHAPTERS).unwrap(), Some(json!("garbage")));
    }

    #[test]
    fn test_upgrade_record_coerces_odd_values() {
        let (record, changed) = upgrade_chapter_record(json!({
            "id": 9, "bookId": 1, "title": null, "content": 42, "wordCount": 3.6
        }));

        assert!(changed);
        assert_eq!(record["title"], "");
        assert_eq!(record["content"], "42");
        assert_eq!(record["wordCount"], 4);
    }

    #[test]
    fn test_upgrade_record_leaves_current_records() {
        let current = json!({"id": 1, "bookId": 1, "title": "T", "content": "c", "wordCount": 1});
        let (record, changed) = upgrade_chapter_record(current.clone());
        assert!(!changed);
        assert_eq!(record, current);
    }
}
