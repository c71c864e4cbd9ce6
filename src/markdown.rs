//! Markdown document assembly.
//!
//! [`MarkdownAssembler`] is a lazy sequence of [`Block`]s: a preamble with
//! the title, directory tree and contents heading, then one block per
//! selected file in selection order. Hosts that must stay responsive pull
//! one block at a time; [`render`] simply drains it.

use crate::classify::is_binary;
use crate::entry::{Entry, NO_EXTENSION, extension_of};
use crate::error::{Error, Result};
use crate::tree::render_ascii;
use log::{debug, warn};
use std::collections::HashMap;

pub const BINARY_MARKER: &str = "[binary file skipped]";
pub const EMPTY_SELECTION_MARKER: &str = "*(no files selected)*";

/// How a selected file ended up in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Text,
    Binary,
    ReadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Preamble,
    File { path: String, outcome: FileOutcome },
}

/// One unit of assembled Markdown, without a trailing blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

pub struct MarkdownAssembler<'a> {
    preamble: Option<String>,
    entries: HashMap<&'a str, &'a Entry>,
    selected: Vec<String>,
    next: usize,
}

impl<'a> MarkdownAssembler<'a> {
    /// Prepares assembly of `selected` (looked up in `entries`).
    ///
    /// Fails only when the selected paths conflict structurally.
    pub fn new<I, S>(project_name: &str, entries: &'a [Entry], selected: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: Vec<String> = selected
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let preamble = preamble(project_name, &selected)?;
        Ok(Self {
            preamble: Some(preamble),
            entries: entries.iter().map(|e| (e.path(), e)).collect(),
            selected,
            next: 0,
        })
    }

    /// Number of file blocks this assembler produces.
    pub fn total_files(&self) -> usize {
        self.selected.len()
    }

    fn file_block(&self, path: &str) -> Block {
        let read = match self.entries.get(path) {
            None => Err("no such entry".to_string()),
            Some(entry) => entry.read().map_err(|source| {
                let reason = source.to_string();
                warn!(
                    "{}",
                    Error::EntryReadFailure {
                        path: path.to_string(),
                        source,
                    }
                );
                reason
            }),
        };

        let heading = format!("### `{path}`");
        match read {
            Err(reason) => Block {
                text: format!("{heading}\n```\n[read failed: {reason}]\n```"),
                kind: file_kind(path, FileOutcome::ReadFailed(reason)),
            },
            Ok(content) if is_binary(path, &content) => {
                debug!("Skipping binary file {path}");
                Block {
                    text: format!("{heading}\n```\n{BINARY_MARKER}\n```"),
                    kind: file_kind(path, FileOutcome::Binary),
                }
            }
            Ok(content) => {
                let text = String::from_utf8_lossy(&content);
                let ext = extension_of(path);
                let tag = if ext == NO_EXTENSION { "" } else { ext.as_str() };
                let fence = calculate_fence(&text);
                // Content goes in verbatim; the closing fence needs its own line.
                let newline = if text.ends_with('\n') { "" } else { "\n" };
                Block {
                    text: format!("{heading}\n{fence}{tag}\n{text}{newline}{fence}"),
                    kind: file_kind(path, FileOutcome::Text),
                }
            }
        }
    }
}

impl Iterator for MarkdownAssembler<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if let Some(text) = self.preamble.take() {
            return Some(Block {
                kind: BlockKind::Preamble,
                text,
            });
        }
        let path = self.selected.get(self.next)?.clone();
        self.next += 1;
        debug!("Rendering ({}/{}) {path}", self.next, self.selected.len());
        Some(self.file_block(&path))
    }
}

fn file_kind(path: &str, outcome: FileOutcome) -> BlockKind {
    BlockKind::File {
        path: path.to_string(),
        outcome,
    }
}

fn preamble(project_name: &str, selected: &[String]) -> Result<String> {
    let name = if project_name.is_empty() {
        "untitled"
    } else {
        project_name
    };
    let tree = render_ascii(name, selected)?;
    let contents = if selected.is_empty() {
        EMPTY_SELECTION_MARKER
    } else {
        "## File Contents"
    };
    Ok(format!(
        "# Project Overview: {name}\n\n## Directory Structure\n\n```\n{tree}```\n\n{contents}"
    ))
}

/// Fence long enough to wrap `content`: three backticks, or one more than
/// the longest backtick run opening a line.
fn calculate_fence(content: &str) -> String {
    let max_backtick_run = content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            trimmed
                .starts_with('`')
                .then(|| trimmed.chars().take_while(|&c| c == '`').count())
        })
        .max()
        .unwrap_or(0);

    "`".repeat(max_backtick_run.max(2) + 1)
}

/// Assembles the whole document at once.
pub fn render<I, S>(project_name: &str, entries: &[Entry], selected: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let blocks: Vec<String> = MarkdownAssembler::new(project_name, entries, selected)?
        .map(|block| block.text)
        .collect();
    let mut doc = blocks.join("\n\n");
    doc.push('\n');
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Content, ContentSource};
    use std::io;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Failing;

    impl ContentSource for Failing {
        fn read(&self) -> io::Result<Content> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_document_layout() {
        let entries = vec![
            Entry::from_bytes("src/main.rs", "fn main() {}\n"),
            Entry::from_bytes("Makefile", "all:\n\ttrue"),
        ];
        let doc = render("demo", &entries, &["src/main.rs", "Makefile"]).unwrap();
        let expected = "\
# Project Overview: demo

## Directory Structure

```
demo/
├── src/
│   └── main.rs
└── Makefile
```

## File Contents

### `src/main.rs`
```rs
fn main() {}
```

### `Makefile`
```
all:
\ttrue
```
";
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_content_is_emitted_verbatim() {
        let entries = vec![
            Entry::from_bytes("blank.txt", "x\n\n"),
            Entry::from_bytes("crlf.txt", "a\r\nb\r\n"),
            Entry::from_bytes("empty.txt", ""),
        ];
        let doc = render("p", &entries, &["blank.txt", "crlf.txt", "empty.txt"]).unwrap();
        assert!(doc.contains("### `blank.txt`\n```txt\nx\n\n```"));
        assert!(doc.contains("### `crlf.txt`\n```txt\na\r\nb\r\n```"));
        assert!(doc.contains("### `empty.txt`\n```txt\n\n```"));
    }

    #[test]
    fn test_selection_order_is_preserved() {
        let entries = vec![Entry::from_bytes("a.txt", "A"), Entry::from_bytes("z.txt", "Z")];
        let doc = render("p", &entries, &["z.txt", "a.txt"]).unwrap();
        let z = doc.find("### `z.txt`").unwrap();
        let a = doc.find("### `a.txt`").unwrap();
        assert!(z < a);
        // The tree is still sorted.
        assert!(doc.contains("├── a.txt\n└── z.txt\n"));
    }

    #[test]
    fn test_empty_selection() {
        let entries = vec![Entry::from_bytes("a.txt", "A")];
        let doc = render("p", &entries, &Vec::<String>::new()).unwrap();
        assert!(doc.contains("p/\n└── (no files selected)\n"));
        assert!(doc.contains(EMPTY_SELECTION_MARKER));
        assert!(!doc.contains("## File Contents"));
        assert!(!doc.contains("###"));
    }

    #[test]
    fn test_untitled_project() {
        let doc = render("", &[], &Vec::<String>::new()).unwrap();
        assert!(doc.starts_with("# Project Overview: untitled\n"));
        assert!(doc.contains("untitled/\n"));
    }

    #[test]
    fn test_read_failure_is_isolated() {
        let entries = vec![
            Entry::from_bytes("a.txt", "alpha"),
            Entry::new("b.bin", 4, Arc::new(Failing)),
            Entry::from_bytes("c.txt", "gamma"),
        ];
        let doc = render("p", &entries, &["a.txt", "b.bin", "c.txt"]).unwrap();
        assert!(doc.contains("### `a.txt`\n```txt\nalpha\n```"));
        assert!(doc.contains("### `b.bin`\n```\n[read failed: disk on fire]\n```"));
        assert!(doc.contains("### `c.txt`\n```txt\ngamma\n```"));
    }

    #[test]
    fn test_binary_files_are_skipped() {
        let entries = vec![
            Entry::from_bytes("logo.png", vec![0x89, b'P', b'N', b'G']),
            Entry::from_bytes("data.txt", vec![b'a', 0, b'b']),
        ];
        let doc = render("p", &entries, &["logo.png", "data.txt"]).unwrap();
        assert!(doc.contains("### `logo.png`\n```\n[binary file skipped]\n```"));
        assert!(doc.contains("### `data.txt`\n```\n[binary file skipped]\n```"));
    }

    #[test]
    fn test_missing_entry_is_read_failure() {
        let doc = render("p", &[], &["ghost.txt"]).unwrap();
        assert!(doc.contains("[read failed: no such entry]"));
    }

    #[test]
    fn test_blocks_are_yielded_one_per_file() {
        let entries = vec![Entry::from_bytes("a.txt", "A"), Entry::from_bytes("b.png", "")];
        let selected = ["a.txt", "b.png"];
        let mut assembler = MarkdownAssembler::new("p", &entries, &selected).unwrap();
        assert_eq!(assembler.total_files(), 2);
        assert_eq!(assembler.next().unwrap().kind, BlockKind::Preamble);
        assert_eq!(
            assembler.next().unwrap().kind,
            BlockKind::File {
                path: "a.txt".to_string(),
                outcome: FileOutcome::Text
            }
        );
        assert_eq!(
            assembler.next().unwrap().kind,
            BlockKind::File {
                path: "b.png".to_string(),
                outcome: FileOutcome::Binary
            }
        );
        assert!(assembler.next().is_none());
    }

    #[test]
    fn test_conflicting_selection_is_an_error() {
        let entries = vec![Entry::from_bytes("a", "x"), Entry::from_bytes("a/b", "y")];
        let err = render("p", &entries, &["a", "a/b"]).unwrap_err();
        assert!(matches!(err, Error::StructuralConflict { .. }));
    }

    #[test]
    fn test_fence_grows_around_backticks() {
        let entries = vec![Entry::from_bytes("README.md", "# Example\n\n```rust\nfn main() {}\n```\n")];
        let doc = render("p", &entries, &["README.md"]).unwrap();
        assert!(doc.contains("````md\n# Example"));
        assert!(doc.contains("```\n````"));
    }

    #[test]
    fn test_calculate_fence() {
        assert_eq!(calculate_fence("plain"), "```");
        assert_eq!(calculate_fence("``inline``"), "```");
        assert_eq!(calculate_fence("  ````\nx"), "`````");
    }
}
