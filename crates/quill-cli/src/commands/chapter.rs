//! Chapter command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use quill_core::Chapter;

use super::Service;
use crate::output::Output;

/// Fields given on the command line for `chapter save`
pub struct ChapterInput {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub file: Option<PathBuf>,
    pub words: Option<u64>,
    pub volume: Option<String>,
}

/// List the chapters of a book
pub fn list(service: &Service, book_id: u64, output: &Output) -> Result<()> {
    output.print_chapters(&service.get_chapters(book_id));
    Ok(())
}

/// Show one chapter
pub fn show(service: &Service, book_id: u64, chapter_id: u64, output: &Output) -> Result<()> {
    let chapter = service
        .get_chapter(book_id, chapter_id)
        .ok_or_else(|| anyhow::anyhow!("Chapter {} not found in book {}", chapter_id, book_id))?;

    output.print_chapter(&chapter);
    Ok(())
}

/// Create or update a chapter
///
/// Without `--id` a new chapter is appended with the next free id. When
/// updating, omitted fields keep their stored values.
pub fn save(
    service: &mut Service,
    book_id: u64,
    input: ChapterInput,
    output: &Output,
) -> Result<()> {
    if service.get_book(book_id).is_none() {
        bail!("Book not found: {}", book_id);
    }

    let existing = input.id.and_then(|id| service.get_chapter(book_id, id));
    let id = match input.id {
        Some(id) => id,
        None => next_chapter_id(&service.get_chapters(book_id)),
    };

    let content = match (input.content, input.file) {
        (Some(_), Some(_)) => bail!("Use either --content or --file, not both"),
        (Some(content), None) => Some(content),
        (None, Some(path)) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read chapter file {:?}", path))?,
        ),
        (None, None) => None,
    };

    let mut chapter = match existing {
        Some(chapter) => chapter,
        None => {
            let Some(title) = input.title.clone() else {
                bail!("A new chapter needs a --title");
            };
            Chapter::new(id, book_id, title)
        }
    };

    if let Some(title) = input.title {
        chapter.title = title;
    }
    if let Some(content) = content {
        chapter.word_count = count_words(&content);
        chapter.content = content;
    }
    if let Some(words) = input.words {
        chapter.word_count = words;
    }
    // Leaving the volume unset on update keeps the stored one
    chapter.volume = input.volume;

    service
        .save_chapter(&chapter)
        .context("Failed to save chapter")?;

    output.success(&format!(
        "Saved chapter {} of book {} ({} words)",
        chapter.id, book_id, chapter.word_count
    ));
    Ok(())
}

/// Delete a chapter
pub fn delete(service: &mut Service, book_id: u64, chapter_id: u64, output: &Output) -> Result<()> {
    if service.get_chapter(book_id, chapter_id).is_none() {
        output.message(&format!(
            "Chapter {} not found in book {}, nothing deleted.",
            chapter_id, book_id
        ));
        return Ok(());
    }

    service
        .delete_chapter(book_id, chapter_id)
        .context("Failed to delete chapter")?;

    output.success(&format!("Deleted chapter {} of book {}", chapter_id, book_id));
    Ok(())
}

/// One past the highest chapter id in use
fn next_chapter_id(chapters: &[Chapter]) -> u64 {
    chapters.iter().map(|c| c.id).max().unwrap_or(0) + 1
}

/// Count words the way the editor does: every non-whitespace character
///
/// Chapters are mostly CJK prose, where each character is a word.
fn count_words(content: &str) -> u64 {
    content.chars().filter(|c| !c.is_whitespace()).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_chapter_id() {
        assert_eq!(next_chapter_id(&[]), 1);

        let chapters = vec![Chapter::new(3, 1, "c"), Chapter::new(1, 1, "a")];
        assert_eq!(next_chapter_id(&chapters), 4);
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("hello"), 5);
        assert_eq!(count_words("风 起\n云涌"), 4);
        assert_eq!(count_words("   "), 0);
    }
}
