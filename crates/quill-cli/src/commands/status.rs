//! Status command handler

use anyhow::Result;

use super::Service;
use crate::output::{Output, OutputFormat};

/// Show store location, schema version and collection sizes
pub fn show(service: &Service, output: &Output) -> Result<()> {
    let store = service.store();
    let books = service.get_books();
    let chapters: u64 = books.iter().map(|b| b.chapter_count).sum();
    let words: u64 = books.iter().map(|b| b.word_count).sum();
    let related: usize = books
        .iter()
        .map(|b| service.get_related(b.id).len())
        .sum();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store_path": store.path(),
                    "store_exists": store.exists(),
                    "store_size": store.file_size(),
                    "schema_version": service.schema_version(),
                    "counts": {
                        "books": books.len(),
                        "chapters": chapters,
                        "words": words,
                        "related": related
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.path().display());
        }
        OutputFormat::Human => {
            println!("Quill Status");
            println!("============");
            println!();
            println!("Store:");
            println!("  Path:    {}", store.path().display());
            if store.exists() {
                println!("  Size:    {}", format_bytes(store.file_size()));
            } else {
                println!("  Size:    (not written yet)");
            }
            println!("  Schema:  v{}", service.schema_version());
            println!();
            println!("Library:");
            println!("  Books:    {}", books.len());
            println!("  Chapters: {}", chapters);
            println!("  Words:    {}", words);
            println!("  Related:  {}", related);
        }
    }

    Ok(())
}

/// Format a byte count for display
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
