//! Error type shared by the archive reader, tree builder and assembler.

use std::io;
use thiserror::Error;

/// Failures surfaced by the library.
///
/// `UnsupportedFormat` and `CorruptArchive` abort an extraction as a whole.
/// `EntryReadFailure` is normally caught per file and rendered inline by the
/// Markdown assembler. `StructuralConflict` means the entry set itself is
/// inconsistent and is returned as soon as it is detected.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("failed to read {path}: {source}")]
    EntryReadFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("path {path} is used both as a file and as a directory")]
    StructuralConflict { path: String },
}

pub type Result<T> = std::result::Result<T, Error>;
