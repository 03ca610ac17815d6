//! Data models for Quill
//!
//! Defines the persisted records: Book, Chapter and Related.
//! Field names serialize in camelCase so stores written by the mobile
//! client stay readable.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A book with its derived chapter statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier, allocated by the storage service
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tag: String,
    /// Cover image reference (path or URL)
    #[serde(default)]
    pub cover: String,
    /// Number of distinct non-blank volume labels
    #[serde(default)]
    pub volume_count: u64,
    #[serde(default)]
    pub chapter_count: u64,
    /// Sum of the word counts of all chapters
    #[serde(default)]
    pub word_count: u64,
}

impl Book {
    /// Overwrite the derived counters with freshly computed statistics
    pub fn apply_stats(&mut self, stats: BookStats) {
        self.chapter_count = stats.chapter_count;
        self.word_count = stats.word_count;
        self.volume_count = stats.volume_count;
    }

    /// The counters currently stored on this book
    pub fn stats(&self) -> BookStats {
        BookStats {
            chapter_count: self.chapter_count,
            word_count: self.word_count,
            volume_count: self.volume_count,
        }
    }
}

/// A book that has not been assigned an id yet
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub tag: String,
    pub cover: String,
    #[serde(default)]
    pub volume_count: u64,
    #[serde(default)]
    pub chapter_count: u64,
    #[serde(default)]
    pub word_count: u64,
}

impl NewBook {
    /// Create a new book with the given title and author
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = cover.into();
        self
    }

    /// Attach an id, producing the stored record
    pub fn into_book(self, id: u64) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            tag: self.tag,
            cover: self.cover,
            volume_count: self.volume_count,
            chapter_count: self.chapter_count,
            word_count: self.word_count,
        }
    }
}

/// A chapter of a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Identifier, unique within the owning book
    pub id: u64,
    pub book_id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub word_count: u64,
    /// Optional volume label grouping chapters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
}

impl Chapter {
    /// Create an empty chapter
    pub fn new(id: u64, book_id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            book_id,
            title: title.into(),
            content: String::new(),
            word_count: 0,
            volume: None,
        }
    }

    /// Set the content and word count together
    pub fn with_content(mut self, content: impl Into<String>, word_count: u64) -> Self {
        self.content = content.into();
        self.word_count = word_count;
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    /// Treat an empty volume label as no volume
    pub fn normalized(mut self) -> Self {
        if self.volume.as_deref().is_some_and(str::is_empty) {
            self.volume = None;
        }
        self
    }

    /// The volume label, if it has any non-whitespace content
    pub fn counted_volume(&self) -> Option<&str> {
        self.volume
            .as_deref()
            .filter(|label| !label.trim().is_empty())
    }
}

/// Kind of an auxiliary worldbuilding entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RelatedKind {
    Note,
    Character,
    Place,
    Item,
}

impl RelatedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedKind::Note => "note",
            RelatedKind::Character => "character",
            RelatedKind::Place => "place",
            RelatedKind::Item => "item",
        }
    }
}

impl std::fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for RelatedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "note" => Ok(RelatedKind::Note),
            "character" => Ok(RelatedKind::Character),
            "place" => Ok(RelatedKind::Place),
            "item" => Ok(RelatedKind::Item),
            other => Err(format!(
                "unknown related kind '{}' (expected note, character, place or item)",
                other
            )),
        }
    }
}

/// An auxiliary note attached to a book (character, place, item, note)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Related {
    pub id: u64,
    pub book_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub kind: RelatedKind,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(default)]
    pub create_time: i64,
}

impl Related {
    /// Create a new entry stamped with the current time
    pub fn new(id: u64, book_id: u64, kind: RelatedKind, title: impl Into<String>) -> Self {
        Self {
            id,
            book_id,
            title: title.into(),
            content: String::new(),
            kind,
            create_time: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Statistics derived from a book's chapter list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub chapter_count: u64,
    pub word_count: u64,
    pub volume_count: u64,
}

impl BookStats {
    /// Compute statistics over a chapter list
    ///
    /// Volume labels are deduplicated by exact value; labels that are
    /// blank after trimming are not counted.
    pub fn from_chapters(chapters: &[Chapter]) -> Self {
        let volumes: HashSet<&str> = chapters.iter().filter_map(Chapter::counted_volume).collect();

        Self {
            chapter_count: chapters.len() as u64,
            word_count: chapters.iter().map(|c| c.word_count).sum(),
            volume_count: volumes.len() as u64,
        }
    }
}
