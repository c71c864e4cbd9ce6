//! Entries and the lazy content providers behind them.

use memmap2::{Mmap, MmapOptions};
use std::fmt;
use std::fs::File;
use std::io;
use std::ops::{Deref, Range};
use std::path::PathBuf;
use std::sync::Arc;

/// Sentinel extension for files whose final segment has no `.`.
pub const NO_EXTENSION: &str = "[no extension]";

/// Raw bytes handed out by a [`ContentSource`].
pub enum Content {
    Shared(Arc<[u8]>, Range<usize>),
    Mapped(Mmap),
    Empty,
}

impl Deref for Content {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Content::Shared(buf, range) => &buf[range.clone()],
            Content::Mapped(mmap) => mmap,
            Content::Empty => &[],
        }
    }
}

/// Capability to obtain an entry's bytes on demand.
pub trait ContentSource: Send + Sync + fmt::Debug {
    fn read(&self) -> io::Result<Content>;

    /// Reads at most `len` leading bytes.
    fn read_prefix(&self, len: usize) -> io::Result<Vec<u8>> {
        let content = self.read()?;
        let end = len.min(content.len());
        Ok(content[..end].to_vec())
    }
}

/// A byte range inside a buffer shared with other entries of the same archive.
#[derive(Debug, Clone)]
pub struct SharedSource {
    buf: Arc<[u8]>,
    range: Range<usize>,
}

impl SharedSource {
    pub fn new(buf: Arc<[u8]>, range: Range<usize>) -> Self {
        Self { buf, range }
    }

    pub fn owned(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            buf: Arc::from(bytes),
            range: 0..len,
        }
    }
}

impl ContentSource for SharedSource {
    fn read(&self) -> io::Result<Content> {
        if self.range.end > self.buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "entry extends past end of buffer",
            ));
        }
        Ok(Content::Shared(self.buf.clone(), self.range.clone()))
    }
}

/// A file on disk, memory-mapped when read.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ContentSource for FileSource {
    fn read(&self) -> io::Result<Content> {
        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            // Mapping a zero-length file fails on some platforms.
            return Ok(Content::Empty);
        }
        // SAFETY: the map is read-only and dropped before the next render.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Content::Mapped(mmap))
    }

    fn read_prefix(&self, len: usize) -> io::Result<Vec<u8>> {
        use std::io::Read;

        let mut buf = Vec::with_capacity(len);
        File::open(&self.path)?
            .take(len as u64)
            .read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// One file of the working set.
#[derive(Debug, Clone)]
pub struct Entry {
    path: String,
    size_bytes: u64,
    content: Arc<dyn ContentSource>,
}

impl Entry {
    /// Builds an entry with a `/`-separated path free of empty and `.` segments.
    pub fn new(path: impl AsRef<str>, size_bytes: u64, content: Arc<dyn ContentSource>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            size_bytes,
            content,
        }
    }

    /// An entry backed by an owned byte buffer.
    pub fn from_bytes(path: impl AsRef<str>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(path, size, Arc::new(SharedSource::owned(bytes)))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }

    pub fn read(&self) -> io::Result<Content> {
        self.content.read()
    }

    pub fn read_prefix(&self, len: usize) -> io::Result<Vec<u8>> {
        self.content.read_prefix(len)
    }
}

/// Lowercased extension of the final path segment, or [`NO_EXTENSION`].
pub fn extension_of(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rfind('.') {
        Some(dot) => file_name[dot + 1..].to_lowercase(),
        None => NO_EXTENSION.to_string(),
    }
}

/// Forward slashes, no empty or `.` segments, no leading `/`.
///
/// Matches the segment splitting of the tree builder so an entry's key and
/// its tree path are the same string.
pub(crate) fn normalize_path(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Collapses duplicate paths: the last entry wins but keeps the first one's position.
pub fn dedup_entries(entries: impl IntoIterator<Item = Entry>) -> Vec<Entry> {
    let mut out: Vec<Entry> = Vec::new();
    let mut index = std::collections::HashMap::new();
    for entry in entries {
        match index.get(entry.path()) {
            Some(&i) => out[i] = entry,
            None => {
                index.insert(entry.path().to_string(), out.len());
                out.push(entry);
            }
        }
    }
    out
}
