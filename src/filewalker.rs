use crate::entry::{Entry, FileSource};
use anyhow::{Context, Result};
use ignore::{DirEntry, WalkBuilder};
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory names never descended into: VCS metadata, dependencies, build
/// output, caches and virtual environments.
static IGNORED_DIRECTORIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        ".git", ".svn", ".hg", ".cvs",
        "node_modules", "bower_components", "jspm_packages", "vendor", "composer", "packages",
        "out", "dist", "build", "target", "bin", "obj", "output", "release", "debug",
        "cache", "tmp", "temp", "logs", "log", "coverage", "__pycache__",
        "venv", "env",
    ]
    .into_iter()
    .collect()
});

/// Collects all files below `project_root` as entries with `/`-separated relative paths.
///
/// Hidden files and directories are skipped, `.gitignore` rules apply and an
/// optional extra ignore file can be given.
pub fn collect_entries(project_root: &Path, ignore_file: Option<&PathBuf>) -> Result<Vec<Entry>> {
    let mut builder = WalkBuilder::new(project_root);
    builder
        .hidden(true)
        .ignore(false)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|e| !is_ignored_dir(e));

    if let Some(ignore_path) = ignore_file {
        if let Some(err) = builder.add_ignore(ignore_path) {
            return Err(err)
                .with_context(|| format!("Failed to load ignore file: {}", ignore_path.display()));
        }
    }

    let mut entries = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error walking path: {err}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(rel_path) = relative_path(path, project_root) else {
            debug!("Skipping path outside root: {}", path.display());
            continue;
        };
        let size = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();

        entries.push(Entry::new(rel_path, size, Arc::new(FileSource::new(path))));
    }

    debug!(
        "Collected {} files from {}",
        entries.len(),
        project_root.display()
    );
    Ok(entries)
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_dir())
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRECTORIES.contains(name))
}

fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
