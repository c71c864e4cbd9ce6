//! # repo2md Library
//!
//! This crate turns a directory or a source archive (`.zip`, `.tar`,
//! `.tar.gz`/`.tgz`) into a single Markdown document: an ASCII directory
//! tree followed by one fenced code block per selected text file. Binary
//! files are detected and skipped, and files that fail to read become
//! inline markers instead of aborting the document.
//!
//! ## Usage
//!
//! ### Rendering an in-memory working set:
//!
//! ```rust
//! use repo2md::{Entry, Session};
//!
//! let entries = vec![
//!     Entry::from_bytes("demo/src/main.rs", "fn main() {}\n"),
//!     Entry::from_bytes("demo/logo.png", vec![0x89, b'P', b'N', b'G']),
//! ];
//! let mut session = Session::new("demo", entries)?;
//! session.select_all_visible();
//!
//! let markdown = repo2md::render(
//!     session.project_name(),
//!     session.entries(),
//!     session.effective_selection(),
//! )?;
//! assert!(markdown.contains("### `demo/src/main.rs`"));
//! assert!(markdown.contains("[binary file skipped]"));
//! # Ok::<(), repo2md::Error>(())
//! ```
//!
//! ### Converting a directory or archive to a file:
//!
//! ```rust,no_run
//! use repo2md::{Config, run_repo2md};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::new("project.tar.gz");
//!     config.output_path = Some("project.md".into());
//!     run_repo2md(config).await
//! }
//! ```

pub mod archive;
pub mod classify;
pub mod cli;
pub mod entry;
pub mod error;
pub mod filewalker;
pub mod markdown;
pub mod sensitive;
pub mod session;
pub mod tree;
pub mod utils;
pub mod writer;

pub use archive::{ArchiveFormat, Extraction, read_archive};
pub use classify::is_binary;
pub use cli::Config;
pub use entry::{ContentSource, Entry};
pub use error::Error;
pub use filewalker::collect_entries;
pub use markdown::{MarkdownAssembler, render};
pub use session::Session;
pub use tree::{TreeNode, build_tree, render_ascii};
pub use writer::MarkdownWriter;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// Loads the configured source, applies filters and selection, and writes the Markdown file.
pub async fn run_repo2md(config: Config) -> Result<()> {
    let session = load_session(&config).await?;

    if config.list_only {
        print_listing(&session);
        return Ok(());
    }

    let selection = session.effective_selection();
    if selection.is_empty() {
        warn!("No files selected; writing an empty overview");
    }

    let sensitive = session.sensitive_selection();
    if !sensitive.is_empty() && !config.assume_yes {
        for path in &sensitive {
            warn!("Possibly sensitive file selected: {path}");
        }
        bail!(
            "Refusing to include {} possibly sensitive file(s) ({}); re-run with --yes to include them",
            sensitive.len(),
            sensitive.join(", ")
        );
    }

    let output_path = resolve_output_path(&config, session.project_name())?;
    info!(
        "Writing {} files ({}) to {}",
        selection.len(),
        utils::format_bytes(session.selected_size()),
        output_path.display()
    );

    let file = File::create(&output_path)
        .await
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    let mut md_writer = MarkdownWriter::new(file);
    md_writer.write_document(session.assembler()?).await?;
    Ok(())
}

/// Builds the session for `config.source` with extension filters and selection applied.
pub async fn load_session(config: &Config) -> Result<Session> {
    let mut session = if config.source.is_dir() {
        load_directory(config)?
    } else {
        load_archive(config).await?
    };

    if !config.extensions.is_empty() {
        session.enable_only(&config.extensions);
    }
    for ext in &config.excluded_extensions {
        session.set_extension_enabled(&ext.trim_start_matches('.').to_lowercase(), false);
    }

    if config.selected_paths.is_empty() {
        session.select_all_visible();
    } else {
        for path in &config.selected_paths {
            let path = entry::normalize_path(path);
            if !session.select(&path) {
                warn!("Selected path not found: {path}");
            }
        }
    }
    Ok(session)
}

fn load_directory(config: &Config) -> Result<Session> {
    let root = config
        .source
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", config.source.display()))?;
    let project_name = config.project_name.clone().unwrap_or_else(|| {
        root.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project")
            .to_string()
    });

    let mut entries = collect_entries(&root, config.ignore_file.as_ref())?;

    // A previous run's output inside the tree must not end up in the new document.
    let output_path = resolve_output_path(config, &project_name)?;
    if let Some(rel) = output_path
        .canonicalize()
        .ok()
        .and_then(|p| p.strip_prefix(&root).ok().map(Path::to_path_buf))
    {
        let rel = rel.to_string_lossy().replace('\\', "/");
        entries.retain(|e| e.path() != rel);
    }

    Ok(Session::new(project_name, entries)?)
}

async fn load_archive(config: &Config) -> Result<Session> {
    let file_name = config
        .source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let format = match &config.format {
        Some(tag) => tag.parse::<ArchiveFormat>()?,
        None => ArchiveFormat::from_file_name(&file_name)?,
    };

    let bytes = tokio::fs::read(&config.source)
        .await
        .with_context(|| format!("Failed to read archive: {}", config.source.display()))?;

    let mut entries = Vec::new();
    for step in Extraction::new(bytes, format)? {
        entries.push(step.with_context(|| format!("Failed to extract {file_name}"))?);
        tokio::task::yield_now().await;
    }
    info!("Extracted {} files from {file_name}", entries.len());

    let project_name = config
        .project_name
        .clone()
        .unwrap_or_else(|| archive::project_name_for_archive(&file_name, &entries));
    Ok(Session::new(project_name, entries)?)
}

fn resolve_output_path(config: &Config, project_name: &str) -> Result<PathBuf> {
    match &config.output_path {
        Some(path) => Ok(path.clone()),
        None => {
            let name = utils::output_file_name(project_name, chrono::Utc::now().date_naive());
            Ok(std::env::current_dir()?.join(name))
        }
    }
}

fn print_listing(session: &Session) {
    for row in session.view_nodes() {
        let depth = match &row.parent_id {
            None => 0,
            Some(_) => row.id.matches('/').count() + 1,
        };
        let mut markers = String::new();
        if !row.visible {
            markers.push_str("  (filtered)");
        }
        if !row.is_directory && session.entry(&row.id).is_some_and(classify::classify) {
            markers.push_str("  (binary)");
        }
        println!("{}{}{}", "  ".repeat(depth), row.label, markers);
    }
    println!(
        "Selected: {} files, {}",
        session.effective_selection().len(),
        utils::format_bytes(session.selected_size())
    );
}
