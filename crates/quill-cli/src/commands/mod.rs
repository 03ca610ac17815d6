//! Command handlers

use quill_core::{FileStore, StorageService};

pub mod book;
pub mod chapter;
pub mod config;
pub mod related;
pub mod status;

/// The storage service as opened by the CLI
pub type Service = StorageService<FileStore>;
