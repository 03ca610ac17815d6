//! Storage service
//!
//! `StorageService` is the facade the app talks to. It owns an injected
//! [`KeyValueStore`] and performs every operation as one read-modify-write
//! over whole-collection snapshots:
//!
//! - `books`: array of [`Book`]
//! - `chapters`: map of book id to array of [`Chapter`]
//! - `related`: map of book id to array of [`Related`]
//! - `bookIdCounter`: last allocated book id
//!
//! Records are decoded one at a time. A record that does not decode is
//! skipped on read and written back unchanged, so one bad entry never hides
//! or destroys its neighbours.
//!
//! ## Error policy
//!
//! Read operations (`get_*`) log failures and return an empty or `None`
//! result so callers can keep going with degraded data. Write operations
//! log failures and return them, since the requested change did not take
//! effect.
//!
//! ## Usage
//!
//! ```
//! use quill_core::{Chapter, MemoryStore, NewBook, StorageService};
//!
//! let mut service = StorageService::open(MemoryStore::new()).unwrap();
//! let book = service.save_book(NewBook::new("A", "B")).unwrap();
//!
//! let chapter = Chapter::new(1, book.id, "Ch1").with_content("hello", 5);
//! service.save_chapter(&chapter).unwrap();
//!
//! let book = service.get_book(book.id).unwrap();
//! assert_eq!(book.word_count, 5);
//! assert_eq!(book.chapter_count, 1);
//! ```

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::models::{Book, BookStats, Chapter, NewBook, Related};
use crate::storage::schema::{self, MigrationReport};
use crate::storage::{keys, KeyValueStore, KeyValueStoreExt, StorageError, StorageResult};

/// Stored records as raw JSON
type Records = Vec<Value>;

/// Per-book record lists keyed by the book id as a string
type RecordMap = Map<String, Value>;

/// CRUD facade over a key-value store
pub struct StorageService<S: KeyValueStore> {
    store: S,
    migration: MigrationReport,
}

impl<S: KeyValueStore> StorageService<S> {
    /// Open the service on `store`, upgrading legacy records first
    ///
    /// The upgrade runs once here; later reads never write.
    pub fn open(mut store: S) -> StorageResult<Self> {
        let migration = schema::migrate(&mut store).inspect_err(|e| {
            error!("Failed to upgrade store: {}", e);
        })?;
        if !migration.is_noop() {
            warn!(
                "Store upgraded from schema {} to {} ({} record(s))",
                migration.from, migration.to, migration.records_upgraded
            );
        }
        Ok(Self { store, migration })
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the service and return the underlying store
    pub fn into_store(self) -> S {
        self.store
    }

    /// What the upgrade step did when the service was opened
    pub fn migration(&self) -> &MigrationReport {
        &self.migration
    }

    /// Schema version currently recorded in the store
    pub fn schema_version(&self) -> u64 {
        schema::stored_version(&self.store).unwrap_or(0)
    }

    // ==================== Book Operations ====================

    /// Get all books
    ///
    /// Returns an empty list if the book collection cannot be read.
    /// Records that are not valid books are left out.
    pub fn get_books(&self) -> Vec<Book> {
        decode_records(keys::BOOKS, &self.book_records())
    }

    /// Save a new book, allocating its id
    pub fn save_book(&mut self, book: NewBook) -> StorageResult<Book> {
        let book = self
            .try_save_book(book)
            .inspect_err(|e| error!("Failed to save book: {}", e))?;

        debug!("Saved book {} ({:?})", book.id, book.title);
        Ok(book)
    }

    fn try_save_book(&mut self, book: NewBook) -> StorageResult<Book> {
        let mut records = self.book_records();
        let book = book.into_book(self.next_book_id());
        records.push(encode_record(keys::BOOKS, &book)?);

        self.store.set(keys::BOOKS, Value::Array(records))?;
        Ok(book)
    }

    /// Get a book by id
    pub fn get_book(&self, id: u64) -> Option<Book> {
        self.get_books().into_iter().find(|b| b.id == id)
    }

    /// Replace the stored book with the same id
    ///
    /// Does nothing if no such book exists.
    pub fn update_book(&mut self, book: &Book) -> StorageResult<()> {
        self.try_update_book(book)
            .inspect_err(|e| error!("Failed to update book {}: {}", book.id, e))
    }

    fn try_update_book(&mut self, book: &Book) -> StorageResult<()> {
        let mut records = self.book_records();
        let Some(existing) = records.iter_mut().find(|r| record_id(r) == Some(book.id)) else {
            debug!("Book {} not found, nothing to update", book.id);
            return Ok(());
        };
        *existing = encode_record(keys::BOOKS, book)?;

        self.store.set(keys::BOOKS, Value::Array(records))?;
        debug!("Updated book {}", book.id);
        Ok(())
    }

    /// Raw book records, empty if the collection cannot be read
    fn book_records(&self) -> Records {
        match self.store.get_json::<Records>(keys::BOOKS) {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                error!("Failed to get books: {}", e);
                Vec::new()
            }
        }
    }

    /// Allocate the next book id
    ///
    /// Falls back to the current time in milliseconds when the counter
    /// cannot be read or written. The fallback is not guaranteed to stay
    /// clear of ids the counter hands out later.
    pub fn next_book_id(&mut self) -> u64 {
        match self.increment_book_counter() {
            Ok(id) => id,
            Err(e) => {
                let fallback = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
                warn!(
                    "Failed to allocate book id ({}), falling back to timestamp {}",
                    e, fallback
                );
                fallback
            }
        }
    }

    fn increment_book_counter(&mut self) -> StorageResult<u64> {
        let counter = self
            .store
            .get_json::<u64>(keys::BOOK_ID_COUNTER)?
            .unwrap_or(0)
            + 1;
        self.store.set_json(keys::BOOK_ID_COUNTER, &counter)?;
        Ok(counter)
    }

    // ==================== Chapter Operations ====================

    /// Get all chapters of a book
    ///
    /// Returns an empty list if the book has no chapters or its chapter
    /// list cannot be read.
    pub fn get_chapters(&self, book_id: u64) -> Vec<Chapter> {
        match self.load_book_entries(keys::CHAPTERS, book_id) {
            Ok(chapters) => chapters,
            Err(e) => {
                error!("Failed to get chapters for book {}: {}", book_id, e);
                Vec::new()
            }
        }
    }

    /// Get a single chapter
    pub fn get_chapter(&self, book_id: u64, chapter_id: u64) -> Option<Chapter> {
        self.get_chapters(book_id)
            .into_iter()
            .find(|c| c.id == chapter_id)
    }

    /// Insert or update a chapter and refresh the book's statistics
    ///
    /// An update that carries no volume keeps the volume already stored
    /// for that chapter.
    pub fn save_chapter(&mut self, chapter: &Chapter) -> StorageResult<()> {
        self.try_save_chapter(chapter)
            .inspect_err(|e| error!("Failed to save chapter {}: {}", chapter.id, e))
    }

    fn try_save_chapter(&mut self, chapter: &Chapter) -> StorageResult<()> {
        let mut all = self.load_record_map(keys::CHAPTERS)?;
        let mut records = book_entries(&all, keys::CHAPTERS, chapter.book_id)?;

        let mut incoming = chapter.clone().normalized();
        match records.iter().position(|r| record_id(r) == Some(incoming.id)) {
            Some(index) => {
                if incoming.volume.is_none() {
                    incoming.volume = stored_volume(&records[index]);
                }
                records[index] = encode_record(keys::CHAPTERS, &incoming)?;
                debug!("Updated chapter {} of book {}", chapter.id, chapter.book_id);
            }
            None => {
                records.push(encode_record(keys::CHAPTERS, &incoming)?);
                debug!("Added chapter {} to book {}", chapter.id, chapter.book_id);
            }
        }

        let stats = BookStats::from_chapters(&decode_records::<Chapter>(keys::CHAPTERS, &records));
        all.insert(chapter.book_id.to_string(), Value::Array(records));
        self.store.set(keys::CHAPTERS, Value::Object(all))?;
        self.refresh_book_stats(chapter.book_id, stats)
    }

    /// Delete a chapter and refresh the book's statistics
    ///
    /// Does nothing if the book has no chapter with that id.
    pub fn delete_chapter(&mut self, book_id: u64, chapter_id: u64) -> StorageResult<()> {
        self.try_delete_chapter(book_id, chapter_id)
            .inspect_err(|e| error!("Failed to delete chapter {}: {}", chapter_id, e))
    }

    fn try_delete_chapter(&mut self, book_id: u64, chapter_id: u64) -> StorageResult<()> {
        let mut all = self.load_record_map(keys::CHAPTERS)?;
        let mut records = book_entries(&all, keys::CHAPTERS, book_id)?;
        let Some(index) = records.iter().position(|r| record_id(r) == Some(chapter_id)) else {
            return Ok(());
        };

        records.remove(index);
        let stats = BookStats::from_chapters(&decode_records::<Chapter>(keys::CHAPTERS, &records));
        all.insert(book_id.to_string(), Value::Array(records));
        self.store.set(keys::CHAPTERS, Value::Object(all))?;
        debug!("Deleted chapter {} of book {}", chapter_id, book_id);

        self.refresh_book_stats(book_id, stats)
    }

    fn refresh_book_stats(&mut self, book_id: u64, stats: BookStats) -> StorageResult<()> {
        let Some(mut book) = self.get_book(book_id) else {
            return Ok(());
        };
        book.apply_stats(stats);
        self.update_book(&book)
    }

    // ==================== Related Operations ====================

    /// Get all related entries of a book
    pub fn get_related(&self, book_id: u64) -> Vec<Related> {
        match self.load_book_entries(keys::RELATED, book_id) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to get related entries for book {}: {}", book_id, e);
                Vec::new()
            }
        }
    }

    /// Insert or update a related entry
    pub fn save_related(&mut self, related: &Related) -> StorageResult<()> {
        self.try_save_related(related)
            .inspect_err(|e| error!("Failed to save related entry {}: {}", related.id, e))
    }

    fn try_save_related(&mut self, related: &Related) -> StorageResult<()> {
        let mut all = self.load_record_map(keys::RELATED)?;
        let mut records = book_entries(&all, keys::RELATED, related.book_id)?;

        let record = encode_record(keys::RELATED, related)?;
        match records.iter_mut().find(|r| record_id(r) == Some(related.id)) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }

        all.insert(related.book_id.to_string(), Value::Array(records));
        self.store.set(keys::RELATED, Value::Object(all))?;
        debug!(
            "Saved related entry {} for book {}",
            related.id, related.book_id
        );
        Ok(())
    }

    // ==================== Record Helpers ====================

    fn load_record_map(&self, key: &str) -> StorageResult<RecordMap> {
        Ok(self.store.get_json::<RecordMap>(key)?.unwrap_or_default())
    }

    /// Decode the entries of one book from a per-book map
    fn load_book_entries<T: DeserializeOwned>(
        &self,
        key: &str,
        book_id: u64,
    ) -> StorageResult<Vec<T>> {
        let all = self.load_record_map(key)?;
        let records = book_entries(&all, key, book_id)?;
        Ok(decode_records(key, &records))
    }
}

/// The raw entry list of one book; only this book's list has to be well formed
fn book_entries(all: &RecordMap, key: &str, book_id: u64) -> StorageResult<Records> {
    match all.get(&book_id.to_string()) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => Records::deserialize(list).map_err(|source| StorageError::CorruptValue {
            key: format!("{}.{}", key, book_id),
            source,
        }),
    }
}

/// Decode every record that has the expected shape, skipping the rest
fn decode_records<T: DeserializeOwned>(key: &str, records: &[Value]) -> Vec<T> {
    records
        .iter()
        .filter_map(|record| match T::deserialize(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping unreadable record in '{}': {}", key, e);
                None
            }
        })
        .collect()
}

fn encode_record<T: Serialize>(key: &str, record: &T) -> StorageResult<Value> {
    serde_json::to_value(record).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })
}

fn record_id(record: &Value) -> Option<u64> {
    record.get("id").and_then(Value::as_u64)
}

/// The non-empty volume label of a stored chapter record
fn stored_volume(record: &Value) -> Option<String> {
    record
        .get("volume")
        .and_then(Value::as_str)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}
