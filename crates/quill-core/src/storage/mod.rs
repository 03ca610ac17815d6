//! Storage layer
//!
//! Handles the key-value seam the storage service is built on.
//!
//! ## Architecture
//!
//! - **kv**: the `KeyValueStore` trait and typed JSON helpers
//! - **memory** / **persistence**: in-memory and single-file backends
//! - **schema**: the schema version key and record upgrades

pub mod error;
pub mod kv;
pub mod memory;
pub mod persistence;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use kv::{keys, KeyValueStore, KeyValueStoreExt};
pub use memory::MemoryStore;
pub use persistence::FileStore;
pub use schema::{migrate, needs_migration, MigrationReport, SCHEMA_VERSION};
