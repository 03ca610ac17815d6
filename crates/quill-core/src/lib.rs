//! Quill Core Library
//!
//! This crate provides the persistence layer for Quill, a note-writing app
//! that keeps books, their chapters, and worldbuilding notes (characters,
//! places, items) in a device-local key-value store.
//!
//! # Architecture
//!
//! - **Key-value store**: injected backend; each collection is one JSON value
//! - **Storage service**: CRUD facade that keeps book statistics in sync
//!   with the chapter list
//!
//! # Quick Start
//!
//! ```text
//! let store = FileStore::open_with_config(&Config::load()?)?;
//! let mut service = StorageService::open(store)?;
//!
//! let book = service.save_book(NewBook::new("Title", "Author"))?;
//! service.save_chapter(&Chapter::new(1, book.id, "Prologue"))?;
//! ```
//!
//! # Modules
//!
//! - `service`: the storage service (main entry point)
//! - `models`: books, chapters, related entries
//! - `storage`: key-value trait, backends, schema upgrades
//! - `config`: application configuration

pub mod config;
pub mod models;
pub mod service;
pub mod storage;

pub use config::Config;
pub use models::{Book, BookStats, Chapter, NewBook, Related, RelatedKind};
pub use service::StorageService;
pub use storage::{
    FileStore, KeyValueStore, KeyValueStoreExt, MemoryStore, MigrationReport, StorageError,
    StorageResult,
};
