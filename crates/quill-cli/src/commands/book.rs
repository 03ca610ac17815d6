//! Book command handlers

use anyhow::{Context, Result};

use quill_core::NewBook;

use super::Service;
use crate::output::Output;

/// Create a new book
pub fn add(
    service: &mut Service,
    title: String,
    author: String,
    tag: Option<String>,
    cover: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut book = NewBook::new(title, author);
    if let Some(tag) = tag {
        book = book.with_tag(tag);
    }
    if let Some(cover) = cover {
        book = book.with_cover(cover);
    }

    let book = service.save_book(book).context("Failed to save book")?;

    if output.is_json() {
        output.print_book(&book, &[]);
    } else {
        output.success(&format!("Created book {}: {}", book.id, book.title));
    }
    Ok(())
}

/// List all books
pub fn list(service: &Service, output: &Output) -> Result<()> {
    output.print_books(&service.get_books());
    Ok(())
}

/// Show a book and its chapter outline
pub fn show(service: &Service, id: u64, output: &Output) -> Result<()> {
    let book = service
        .get_book(id)
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", id))?;
    let chapters = service.get_chapters(id);

    output.print_book(&book, &chapters);
    Ok(())
}

/// Edit book metadata
///
/// Only the given fields change; the derived counters are left alone.
pub fn edit(
    service: &mut Service,
    id: u64,
    title: Option<String>,
    author: Option<String>,
    tag: Option<String>,
    cover: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut book = service
        .get_book(id)
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", id))?;

    if title.is_none() && author.is_none() && tag.is_none() && cover.is_none() {
        output.message("Nothing to change.");
        return Ok(());
    }

    if let Some(title) = title {
        book.title = title;
    }
    if let Some(author) = author {
        book.author = author;
    }
    if let Some(tag) = tag {
        book.tag = tag;
    }
    if let Some(cover) = cover {
        book.cover = cover;
    }

    service.update_book(&book).context("Failed to update book")?;
    output.success(&format!("Updated book {}", book.id));
    Ok(())
}
