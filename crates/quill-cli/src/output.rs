//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use quill_core::{Book, Chapter, Related};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single book with its chapter outline
    pub fn print_book(&self, book: &Book, chapters: &[Chapter]) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", book.id);
                println!("Title:    {}", book.title);
                println!("Author:   {}", book.author);
                if !book.tag.is_empty() {
                    println!("Tag:      {}", book.tag);
                }
                if !book.cover.is_empty() {
                    println!("Cover:    {}", book.cover);
                }
                println!("Chapters: {}", book.chapter_count);
                println!("Volumes:  {}", book.volume_count);
                println!("Words:    {}", book.word_count);

                if !chapters.is_empty() {
                    println!();
                    println!("── Chapters ({}) ──", chapters.len());
                    let mut current_volume: Option<&str> = None;
                    for chapter in chapters {
                        let volume = chapter.counted_volume();
                        if let Some(label) = volume.filter(|_| volume != current_volume) {
                            println!("[{}]", label);
                        }
                        current_volume = volume;
                        println!(
                            "  {:>4}  {}  ({} words)",
                            chapter.id,
                            truncate(&chapter.title, 50),
                            chapter.word_count
                        );
                    }
                }
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "book": book,
                    "chapters": chapters,
                }));
            }
            OutputFormat::Quiet => {
                println!("{}", book.id);
            }
        }
    }

    /// Print a list of books
    pub fn print_books(&self, books: &[Book]) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for book in books {
                    println!(
                        "{:>4} | {} | {} | {} ch, {} words",
                        book.id,
                        truncate(&book.title, 30),
                        truncate(&book.author, 20),
                        book.chapter_count,
                        book.word_count
                    );
                }
                println!("\n{} book(s)", books.len());
            }
            OutputFormat::Json => print_json(books),
            OutputFormat::Quiet => {
                for book in books {
                    println!("{}", book.id);
                }
            }
        }
    }

    /// Print a single chapter including its content
    pub fn print_chapter(&self, chapter: &Chapter) {
        match self.format {
            OutputFormat::Human => {
                println!("Chapter {}: {}", chapter.id, chapter.title);
                if let Some(volume) = chapter.counted_volume() {
                    println!("Volume:  {}", volume);
                }
                println!("Words:   {}", chapter.word_count);
                println!("────────────────────────────────────────");
                println!("{}", chapter.content);
            }
            OutputFormat::Json => print_json(chapter),
            OutputFormat::Quiet => {
                println!("{}", chapter.id);
            }
        }
    }

    /// Print the chapters of a book
    pub fn print_chapters(&self, chapters: &[Chapter]) {
        match self.format {
            OutputFormat::Human => {
                if chapters.is_empty() {
                    println!("No chapters found.");
                    return;
                }
                for chapter in chapters {
                    println!(
                        "{:>4} | {} | {} | {}",
                        chapter.id,
                        truncate(chapter.counted_volume().unwrap_or("-"), 15),
                        truncate(&chapter.title, 40),
                        chapter.word_count
                    );
                }
                println!("\n{} chapter(s)", chapters.len());
            }
            OutputFormat::Json => print_json(chapters),
            OutputFormat::Quiet => {
                for chapter in chapters {
                    println!("{}", chapter.id);
                }
            }
        }
    }

    /// Print related entries of a book
    pub fn print_related(&self, entries: &[Related]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No related entries found.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{:>4} | {:<9} | {} | {}",
                        entry.id,
                        entry.kind,
                        truncate(&entry.title, 30),
                        truncate_line(&entry.content, 40)
                    );
                }
                println!("\n{} entr(ies)", entries.len());
            }
            OutputFormat::Json => print_json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render JSON: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("第一章开端", 5), "第一章开端");
        assert_eq!(truncate("第一章：风起云涌之时", 6), "第一章...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }
}
