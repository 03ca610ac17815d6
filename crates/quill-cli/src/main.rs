//! Quill CLI
//!
//! Command-line interface for Quill - books, chapters and worldbuilding notes.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use quill_core::{Config, FileStore, RelatedKind, StorageError, StorageService};

mod commands;
mod output;

use commands::chapter::ChapterInput;
use commands::Service;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill - books, chapters and worldbuilding notes")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage books
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Manage chapters of a book
    Chapter {
        #[command(subcommand)]
        command: ChapterCommands,
    },
    /// Manage characters, places, items and notes of a book
    Related {
        #[command(subcommand)]
        command: RelatedCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show store location and library totals
    Status,
}

#[derive(Subcommand)]
enum BookCommands {
    /// Create a new book
    #[command(alias = "create")]
    Add {
        /// Book title
        title: String,
        /// Author name
        #[arg(short, long, default_value = "")]
        author: String,
        /// Category tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Cover image path or URL
        #[arg(long)]
        cover: Option<String>,
    },
    /// List all books
    #[command(alias = "ls")]
    List,
    /// Show a book and its chapters
    Show {
        /// Book ID
        id: u64,
    },
    /// Edit book metadata
    Edit {
        /// Book ID
        id: u64,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(long)]
        cover: Option<String>,
    },
}

#[derive(Subcommand)]
enum ChapterCommands {
    /// List chapters of a book
    #[command(alias = "ls")]
    List {
        /// Book ID
        book_id: u64,
    },
    /// Show a chapter
    Show {
        /// Book ID
        book_id: u64,
        /// Chapter ID
        chapter_id: u64,
    },
    /// Create or update a chapter
    #[command(alias = "add")]
    Save {
        /// Book ID
        book_id: u64,
        /// Chapter ID (new chapter with the next free ID if omitted)
        #[arg(long)]
        id: Option<u64>,
        /// Chapter title (required for new chapters)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Chapter content
        #[arg(short, long, conflicts_with = "file")]
        content: Option<String>,
        /// Read chapter content from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Word count (computed from content if omitted)
        #[arg(short, long)]
        words: Option<u64>,
        /// Volume label (kept from the stored chapter if omitted)
        #[arg(short, long)]
        volume: Option<String>,
    },
    /// Delete a chapter
    #[command(alias = "rm")]
    Delete {
        /// Book ID
        book_id: u64,
        /// Chapter ID
        chapter_id: u64,
    },
}

#[derive(Subcommand)]
enum RelatedCommands {
    /// List related entries of a book
    #[command(alias = "ls")]
    List {
        /// Book ID
        book_id: u64,
        /// Only show this kind (note, character, place, item)
        #[arg(short, long)]
        kind: Option<RelatedKind>,
    },
    /// Add or replace a related entry
    #[command(alias = "save")]
    Add {
        /// Book ID
        book_id: u64,
        /// Kind of entry (note, character, place, item)
        kind: RelatedKind,
        /// Entry title
        title: String,
        /// Entry content
        #[arg(short, long)]
        content: Option<String>,
        /// Entry ID (next free ID if omitted)
        #[arg(long)]
        id: Option<u64>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, store_file, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without opening the store
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key.clone(), value.clone(), config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut service = open_service(&config)?;

    match cli.command {
        Commands::Book { command } => handle_book_command(command, &mut service, &output),
        Commands::Chapter { command } => handle_chapter_command(command, &mut service, &output),
        Commands::Related { command } => handle_related_command(command, &mut service, &output),
        Commands::Status => commands::status::show(&service, &output),
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

fn open_service(config: &Config) -> Result<Service> {
    let store = FileStore::open_with_config(config).map_err(|e| {
        with_recovery_hint(e, format!("Failed to open store {:?}", config.store_path()))
    })?;
    debug!("Using store {:?}", store.path());
    StorageService::open(store)
        .map_err(|e| with_recovery_hint(e, "Failed to open library".to_string()))
}

/// Wrap a storage error, appending its recovery suggestion to the context
fn with_recovery_hint(err: StorageError, context: String) -> anyhow::Error {
    let context = match err.recovery_suggestion() {
        Some(hint) => format!("{}\nHint: {}", context, hint),
        None => context,
    };
    anyhow::Error::new(err).context(context)
}

fn handle_book_command(command: BookCommands, service: &mut Service, output: &Output) -> Result<()> {
    match command {
        BookCommands::Add {
            title,
            author,
            tag,
            cover,
        } => commands::book::add(service, title, author, tag, cover, output),
        BookCommands::List => commands::book::list(service, output),
        BookCommands::Show { id } => commands::book::show(service, id, output),
        BookCommands::Edit {
            id,
            title,
            author,
            tag,
            cover,
        } => commands::book::edit(service, id, title, author, tag, cover, output),
    }
}

fn handle_chapter_command(
    command: ChapterCommands,
    service: &mut Service,
    output: &Output,
) -> Result<()> {
    match command {
        ChapterCommands::List { book_id } => commands::chapter::list(service, book_id, output),
        ChapterCommands::Show {
            book_id,
            chapter_id,
        } => commands::chapter::show(service, book_id, chapter_id, output),
        ChapterCommands::Save {
            book_id,
            id,
            title,
            content,
            file,
            words,
            volume,
        } => {
            let input = ChapterInput {
                id,
                title,
                content,
                file,
                words,
                volume,
            };
            commands::chapter::save(service, book_id, input, output)
        }
        ChapterCommands::Delete {
            book_id,
            chapter_id,
        } => commands::chapter::delete(service, book_id, chapter_id, output),
    }
}

fn handle_related_command(
    command: RelatedCommands,
    service: &mut Service,
    output: &Output,
) -> Result<()> {
    match command {
        RelatedCommands::List { book_id, kind } => {
            commands::related::list(service, book_id, kind, output)
        }
        RelatedCommands::Add {
            book_id,
            kind,
            title,
            content,
            id,
        } => commands::related::add(service, book_id, kind, title, content, id, output),
    }
}

/// Initialize logging
///
/// Level comes from QUILL_LOG (default `warn`). Logs go to
/// `config.log_file` when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let log_level = std::env::var("QUILL_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!(
        "quill_core={},quill_cli={}",
        log_level, log_level
    ));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore error if already initialized
    match &config.log_file {
        Some(log_path) => match File::create(log_path) {
            Ok(file) => {
                let _ = builder
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .try_init();
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_store_error_carries_hint() {
        let err = StorageError::CorruptFile {
            path: PathBuf::from("store.json"),
            details: "expected value at line 1".to_string(),
        };
        let message = format!("{:#}", with_recovery_hint(err, "Failed to open store".to_string()));

        assert!(message.starts_with("Failed to open store\nHint: Move the corrupted store file"));
        assert!(message.contains("expected value at line 1"));
    }

    #[test]
    fn test_error_without_suggestion_keeps_context() {
        let err = StorageError::Backend {
            key: "books".to_string(),
            details: "offline".to_string(),
        };
        let message = format!("{:#}", with_recovery_hint(err, "Failed to open library".to_string()));

        assert!(message.starts_with("Failed to open library: "));
        assert!(!message.contains("Hint:"));
    }
}
