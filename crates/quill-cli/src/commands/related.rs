//! Related entry command handlers

use anyhow::{bail, Context, Result};

use quill_core::{Related, RelatedKind};

use super::Service;
use crate::output::Output;

/// List related entries of a book, optionally filtered by kind
pub fn list(
    service: &Service,
    book_id: u64,
    kind: Option<RelatedKind>,
    output: &Output,
) -> Result<()> {
    let entries: Vec<Related> = service
        .get_related(book_id)
        .into_iter()
        .filter(|r| kind.map_or(true, |k| r.kind == k))
        .collect();

    output.print_related(&entries);
    Ok(())
}

/// Add or replace a related entry
pub fn add(
    service: &mut Service,
    book_id: u64,
    kind: RelatedKind,
    title: String,
    content: Option<String>,
    id: Option<u64>,
    output: &Output,
) -> Result<()> {
    if service.get_book(book_id).is_none() {
        bail!("Book not found: {}", book_id);
    }

    let existing = service.get_related(book_id);
    let id = id.unwrap_or_else(|| existing.iter().map(|r| r.id).max().unwrap_or(0) + 1);

    let mut entry = Related::new(id, book_id, kind, title);
    if let Some(previous) = existing.iter().find(|r| r.id == id) {
        entry.create_time = previous.create_time;
    }
    if let Some(content) = content {
        entry = entry.with_content(content);
    }

    service
        .save_related(&entry)
        .context("Failed to save related entry")?;

    output.success(&format!(
        "Saved {} {} for book {}: {}",
        entry.kind, entry.id, book_id, entry.title
    ));
    Ok(())
}
