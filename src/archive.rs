//! Archive decoding into entries.
//!
//! ZIP and GZIP are delegated to the `zip` and `flate2` crates. Raw TAR is
//! parsed here: fixed 512-byte USTAR headers, no extended headers, no sparse
//! files.
//!
//! Known limitation: header checksums are not validated and a size field
//! that is not valid octal is read as 0. A header that superficially parses
//! is trusted.

use crate::entry::{Entry, SharedSource, dedup_entries};
use crate::error::{Error, Result};
use crate::utils::strip_archive_suffix;
use log::{debug, info};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const BLOCK_SIZE: usize = 512;
const NAME_RANGE: std::ops::Range<usize> = 0..100;
const SIZE_RANGE: std::ops::Range<usize> = 124..136;
const TYPE_FLAG_OFFSET: usize = 156;
const PREFIX_RANGE: std::ops::Range<usize> = 345..500;
const DIRECTORY_FLAG: u8 = b'5';
/// Upper bound on preallocation from a size the archive declares about itself.
#[cfg(feature = "zip")]
const MAX_PREALLOC: u64 = 64 << 20;

/// Supported archive containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Detects the format from a file name suffix.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else if lower.ends_with(".tar") {
            Ok(ArchiveFormat::Tar)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") || lower.ends_with(".gz")
        {
            Ok(ArchiveFormat::TarGz)
        } else {
            Err(Error::UnsupportedFormat(name.to_string()))
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim_start_matches('.').to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            "tar.gz" | "tgz" | "gz" => Ok(ArchiveFormat::TarGz),
            _ => Err(Error::UnsupportedFormat(tag.to_string())),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
        })
    }
}

/// Step-wise extraction: each `next()` yields one entry.
///
/// Stops after the first error.
pub struct Extraction {
    inner: ExtractionInner,
    failed: bool,
}

enum ExtractionInner {
    Tar(TarEntries),
    #[cfg(feature = "zip")]
    Zip(ZipEntries),
}

impl Extraction {
    pub fn new(bytes: impl Into<Arc<[u8]>>, format: ArchiveFormat) -> Result<Self> {
        let bytes = bytes.into();
        debug!("Opening {format} archive ({} bytes)", bytes.len());
        let inner = match format {
            ArchiveFormat::Tar => ExtractionInner::Tar(TarEntries::new(bytes)),
            ArchiveFormat::TarGz => ExtractionInner::Tar(TarEntries::new(gunzip(&bytes)?)),
            ArchiveFormat::Zip => open_zip(bytes)?,
        };
        Ok(Self {
            inner,
            failed: false,
        })
    }
}

impl Iterator for Extraction {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = match &mut self.inner {
            ExtractionInner::Tar(tar) => tar.next(),
            #[cfg(feature = "zip")]
            ExtractionInner::Zip(zip) => zip.next(),
        };
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

/// Extracts every entry, or fails as a whole.
///
/// Duplicate paths keep the last occurrence.
pub fn read_archive(bytes: impl Into<Arc<[u8]>>, format: ArchiveFormat) -> Result<Vec<Entry>> {
    let entries = Extraction::new(bytes, format)?.collect::<Result<Vec<_>>>()?;
    let entries = dedup_entries(entries);
    info!("Extracted {} entries from {format} archive", entries.len());
    Ok(entries)
}

/// Project name for an archive: the first entry's top-level directory, else
/// the archive file name without its suffix.
pub fn project_name_for_archive(file_name: &str, entries: &[Entry]) -> String {
    entries
        .first()
        .and_then(|e| e.path().split_once('/'))
        .map(|(top, _)| top.to_string())
        .filter(|top| !top.is_empty())
        .unwrap_or_else(|| strip_archive_suffix(file_name).to_string())
}

#[cfg(feature = "gzip")]
fn gunzip(bytes: &[u8]) -> Result<Arc<[u8]>> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| Error::CorruptArchive(format!("gzip: {e}")))?;
    debug!("Decompressed gzip stream to {} bytes", out.len());
    Ok(Arc::from(out))
}

#[cfg(not(feature = "gzip"))]
fn gunzip(_bytes: &[u8]) -> Result<Arc<[u8]>> {
    Err(Error::UnsupportedFormat(
        "tar.gz (built without the `gzip` feature)".to_string(),
    ))
}

/// Lazy reader over a raw TAR buffer.
pub struct TarEntries {
    buf: Arc<[u8]>,
    offset: usize,
    done: bool,
}

/// Parsed view of one header block.
#[derive(Debug)]
struct TarHeader {
    name: String,
    size: usize,
    is_dir: bool,
}

impl TarEntries {
    pub fn new(buf: Arc<[u8]>) -> Self {
        Self {
            buf,
            offset: 0,
            done: false,
        }
    }
}

impl Iterator for TarEntries {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.offset.saturating_add(BLOCK_SIZE) <= self.buf.len() {
            let block = &self.buf[self.offset..self.offset + BLOCK_SIZE];
            if block.iter().all(|&b| b == 0) {
                self.done = true;
                break;
            }

            let header = parse_header(block);
            let data_start = self.offset + BLOCK_SIZE;
            let padded = header.size.div_ceil(BLOCK_SIZE).saturating_mul(BLOCK_SIZE);
            self.offset = data_start.saturating_add(padded);

            if header.is_dir || header.size == 0 || header.name.is_empty() {
                continue;
            }

            let data_end = match data_start.checked_add(header.size) {
                Some(end) if end <= self.buf.len() => end,
                _ => {
                    self.done = true;
                    return Some(Err(Error::CorruptArchive(format!(
                        "tar member {} needs {} bytes but the archive ends after {}",
                        header.name,
                        header.size,
                        self.buf.len() - data_start
                    ))));
                }
            };

            let source = SharedSource::new(self.buf.clone(), data_start..data_end);
            return Some(Ok(Entry::new(
                &header.name,
                header.size as u64,
                Arc::new(source),
            )));
        }
        self.done = true;
        None
    }
}

fn parse_header(block: &[u8]) -> TarHeader {
    let mut name = nul_terminated(&block[NAME_RANGE]);
    let prefix = nul_terminated(&block[PREFIX_RANGE]);
    if !prefix.is_empty() {
        name = format!("{prefix}/{name}");
    }

    TarHeader {
        name,
        size: parse_octal(&block[SIZE_RANGE]),
        is_dir: block[TYPE_FLAG_OFFSET] == DIRECTORY_FLAG,
    }
}

fn nul_terminated(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Octal size field; spaces and NULs are dropped, anything unparsable is 0.
fn parse_octal(field: &[u8]) -> usize {
    let digits: String = field
        .iter()
        .filter(|&&b| b != 0 && b != b' ')
        .map(|&b| b as char)
        .collect();
    usize::from_str_radix(&digits, 8).unwrap_or(0)
}

/// Buffer capacity for a member of declared size `declared`; reads grow past it if needed.
#[cfg(feature = "zip")]
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

#[cfg(feature = "zip")]
struct ZipEntries {
    archive: zip::ZipArchive<std::io::Cursor<Arc<[u8]>>>,
    index: usize,
}

#[cfg(feature = "zip")]
fn open_zip(bytes: Arc<[u8]>) -> Result<ExtractionInner> {
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| Error::CorruptArchive(format!("zip: {e}")))?;
    debug!("Zip archive has {} members", archive.len());
    Ok(ExtractionInner::Zip(ZipEntries { archive, index: 0 }))
}

#[cfg(not(feature = "zip"))]
fn open_zip(_bytes: Arc<[u8]>) -> Result<ExtractionInner> {
    Err(Error::UnsupportedFormat(
        "zip (built without the `zip` feature)".to_string(),
    ))
}

#[cfg(feature = "zip")]
impl Iterator for ZipEntries {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        use std::io::Read;

        while self.index < self.archive.len() {
            let i = self.index;
            self.index += 1;

            let mut member = match self.archive.by_index(i) {
                Ok(member) => member,
                Err(e) => {
                    return Some(Err(Error::CorruptArchive(format!(
                        "zip member {i}: {e}"
                    ))));
                }
            };
            if member.is_dir() {
                continue;
            }

            let name = member.name().to_string();
            let mut bytes = Vec::with_capacity(capacity_hint(member.size()));
            if let Err(e) = member.read_to_end(&mut bytes) {
                return Some(Err(Error::CorruptArchive(format!("zip member {name}: {e}"))));
            }
            return Some(Ok(Entry::from_bytes(name, bytes)));
        }
        None
    }
}
