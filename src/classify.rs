//! Cheap binary/text sniffing.
//!
//! This is a heuristic, not a content-type oracle: an extension denylist,
//! a two-byte magic probe and a NUL scan over the first [`SNIFF_LEN`] bytes.

use crate::entry::{Entry, extension_of};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 512;

/// Extensions that are always treated as binary.
pub static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // images
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "svg", "cur", "icns", "psd", "ai",
        "eps", "sketch",
        // audio / video
        "mp4", "mp3", "avi", "mov", "wmv", "flv", "webm",
        // documents
        "pdf", "xls", "xlsx", "ppt", "pptx", "doc", "docx",
        // archives and disk images
        "zip", "rar", "7z", "tar", "gz", "bz2", "iso", "img", "dmg", "jar", "war",
        // executables
        "exe", "dll", "so", "dylib", "class",
        // fonts
        "woff", "woff2", "ttf", "eot", "otf",
        // blobs
        "bin", "dat", "db", "sqlite",
    ]
    .into_iter()
    .collect()
});

/// Leading byte pairs of known binary containers.
const MAGIC_PREFIXES: &[[u8; 2]] = &[
    *b"%P",      // PDF
    *b"PK",      // ZIP
    [0x89, b'P'], // PNG
    [0xFF, 0xD8], // JPEG
    *b"GI",      // GIF
    [0x1F, 0x8B], // GZIP
    // Heuristic only: many executables start this way, so do some text encodings.
    [0x00, 0x00],
];

/// Returns `true` when `path`/`first_bytes` should be skipped as binary.
///
/// Only the first [`SNIFF_LEN`] bytes of `first_bytes` are looked at.
pub fn is_binary(path: &str, first_bytes: &[u8]) -> bool {
    let ext = extension_of(path);
    if BINARY_EXTENSIONS.contains(ext.as_str()) {
        return true;
    }

    let prefix = &first_bytes[..first_bytes.len().min(SNIFF_LEN)];
    if prefix.len() >= 2 && MAGIC_PREFIXES.iter().any(|m| prefix.starts_with(m)) {
        return true;
    }

    prefix.contains(&0)
}

/// Classifies an entry by reading only its prefix. Unreadable entries count as binary.
///
/// Used for listings, where reading whole files is wasted work. The
/// assembler classifies the content it has already read instead.
pub fn classify(entry: &Entry) -> bool {
    if BINARY_EXTENSIONS.contains(entry.extension().as_str()) {
        return true;
    }
    match entry.read_prefix(SNIFF_LEN) {
        Ok(prefix) => is_binary(entry.path(), &prefix),
        Err(err) => {
            debug!("Treating {} as binary, prefix read failed: {err}", entry.path());
            true
        }
    }
}
