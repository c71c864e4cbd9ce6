//! The host-owned working set: entries, extension filter and selection.
//!
//! A [`Session`] is rebuilt from scratch whenever a new directory or archive
//! is loaded. Filter and selection changes only toggle visibility; the tree
//! itself is built once per load.

use crate::entry::{Entry, dedup_entries};
use crate::error::Result;
use crate::markdown::MarkdownAssembler;
use crate::sensitive::sensitive_paths;
use crate::tree::{TreeNode, ViewNode, build_tree, view_nodes};
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug)]
pub struct Session {
    project_name: String,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    tree: TreeNode,
    extensions: BTreeSet<String>,
    enabled: BTreeSet<String>,
    checked: Vec<String>,
}

impl Session {
    /// Loads a working set. All extensions start enabled and nothing is selected.
    pub fn new(project_name: impl Into<String>, entries: Vec<Entry>) -> Result<Self> {
        let entries = dedup_entries(entries);
        let tree = build_tree(entries.iter().map(Entry::path))?;
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path().to_string(), i))
            .collect();
        let extensions: BTreeSet<String> = entries.iter().map(Entry::extension).collect();

        let project_name = project_name.into();
        info!(
            "Loaded {} files with {} extensions for {project_name}",
            entries.len(),
            extensions.len()
        );

        Ok(Self {
            project_name,
            entries,
            index,
            tree,
            enabled: extensions.clone(),
            extensions,
            checked: Vec::new(),
        })
    }

    /// Replaces the working set. On error the session is left unchanged.
    pub fn reset(&mut self, project_name: impl Into<String>, entries: Vec<Entry>) -> Result<()> {
        *self = Self::new(project_name, entries)?;
        Ok(())
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, path: &str) -> Option<&Entry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    pub fn tree(&self) -> &TreeNode {
        &self.tree
    }

    /// Every extension found, sorted.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn is_extension_enabled(&self, ext: &str) -> bool {
        self.enabled.contains(ext)
    }

    /// Enables or disables one extension. Unknown extensions are ignored.
    pub fn set_extension_enabled(&mut self, ext: &str, enabled: bool) {
        if !self.extensions.contains(ext) {
            debug!("Ignoring unknown extension filter: {ext}");
            return;
        }
        if enabled {
            self.enabled.insert(ext.to_string());
        } else {
            self.enabled.remove(ext);
        }
    }

    /// Flips an extension and returns its new state.
    pub fn toggle_extension(&mut self, ext: &str) -> bool {
        let enabled = !self.is_extension_enabled(ext);
        self.set_extension_enabled(ext, enabled);
        self.is_extension_enabled(ext)
    }

    /// Enables exactly the given extensions (case-insensitive).
    pub fn enable_only<I, S>(&mut self, exts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: BTreeSet<String> = exts
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self.enabled = self.extensions.intersection(&wanted).cloned().collect();
    }

    /// Whether `path` is a loaded file passing the extension filter.
    pub fn is_visible(&self, path: &str) -> bool {
        self.entry(path)
            .is_some_and(|e| self.enabled.contains(&e.extension()))
    }

    /// Checks a file. Returns `false` for paths that are not loaded.
    pub fn select(&mut self, path: &str) -> bool {
        if self.entry(path).is_none() {
            return false;
        }
        if !self.checked.iter().any(|p| p == path) {
            self.checked.push(path.to_string());
        }
        true
    }

    pub fn deselect(&mut self, path: &str) {
        self.checked.retain(|p| p != path);
    }

    /// Checks every visible file, in tree order.
    pub fn select_all_visible(&mut self) {
        for path in self.tree.file_paths() {
            if self.is_visible(&path) && !self.checked.contains(&path) {
                self.checked.push(path);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.checked.clear();
    }

    /// Checked paths that are currently visible, in the order they were checked.
    pub fn effective_selection(&self) -> Vec<&str> {
        self.checked
            .iter()
            .map(String::as_str)
            .filter(|p| self.is_visible(p))
            .collect()
    }

    /// Total size of the effective selection.
    pub fn selected_size(&self) -> u64 {
        self.effective_selection()
            .into_iter()
            .filter_map(|p| self.entry(p))
            .map(Entry::size_bytes)
            .sum()
    }

    /// Effective selection members that look like they hold secrets.
    pub fn sensitive_selection(&self) -> Vec<&str> {
        sensitive_paths(self.effective_selection())
    }

    /// Rows for a checkbox tree, with filter visibility applied.
    pub fn view_nodes(&self) -> Vec<ViewNode> {
        view_nodes(
            &self.project_name,
            &self.tree,
            |p| self.entry(p).map_or(0, Entry::size_bytes),
            |p| self.is_visible(p),
        )
    }

    /// Assembler over the effective selection.
    pub fn assembler(&self) -> Result<MarkdownAssembler<'_>> {
        MarkdownAssembler::new(
            &self.project_name,
            &self.entries,
            self.effective_selection(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::NO_EXTENSION;
    use crate::error::Error;

    fn session() -> Session {
        Session::new(
            "demo",
            vec![
                Entry::from_bytes("src/main.rs", "fn main() {}"),
                Entry::from_bytes("src/lib.rs", "pub fn lib() {}"),
                Entry::from_bytes("README.md", "# Demo"),
                Entry::from_bytes("Makefile", "all:"),
                Entry::from_bytes(".env", "KEY=1"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_all_extensions_enabled_by_default() {
        let s = session();
        let exts: Vec<&str> = s.extensions().collect();
        assert_eq!(exts, vec!["[no extension]", "env", "md", "rs"]);
        assert!(exts.iter().all(|e| s.is_extension_enabled(e)));
        assert!(s.effective_selection().is_empty());
    }

    #[test]
    fn test_hidden_paths_leave_effective_selection() {
        let mut s = session();
        assert!(s.select("README.md"));
        assert!(s.select("src/main.rs"));
        assert_eq!(s.effective_selection(), vec!["README.md", "src/main.rs"]);

        s.set_extension_enabled("md", false);
        assert_eq!(s.effective_selection(), vec!["src/main.rs"]);

        assert!(s.toggle_extension("md"));
        assert_eq!(s.effective_selection(), vec!["README.md", "src/main.rs"]);
    }

    #[test]
    fn test_select_unknown_path() {
        let mut s = session();
        assert!(!s.select("nope.rs"));
        assert!(s.effective_selection().is_empty());
    }

    #[test]
    fn test_select_all_visible_uses_tree_order() {
        let mut s = session();
        s.enable_only([".RS", "md"]);
        s.select_all_visible();
        assert_eq!(
            s.effective_selection(),
            vec!["src/lib.rs", "src/main.rs", "README.md"]
        );
        assert_eq!(s.selected_size(), 15 + 12 + 6);
    }

    #[test]
    fn test_no_extension_filter() {
        let mut s = session();
        s.enable_only([NO_EXTENSION]);
        s.select_all_visible();
        assert_eq!(s.effective_selection(), vec!["Makefile"]);
    }

    #[test]
    fn test_sensitive_selection() {
        let mut s = session();
        s.select_all_visible();
        assert_eq!(s.sensitive_selection(), vec![".env"]);
        s.deselect(".env");
        assert!(s.sensitive_selection().is_empty());
    }

    #[test]
    fn test_reset_failure_keeps_previous_state() {
        let mut s = session();
        s.select("README.md");
        let err = s
            .reset(
                "broken",
                vec![Entry::from_bytes("a", "x"), Entry::from_bytes("a/b", "y")],
            )
            .unwrap_err();
        assert!(matches!(err, Error::StructuralConflict { .. }));
        assert_eq!(s.project_name(), "demo");
        assert_eq!(s.effective_selection(), vec!["README.md"]);
    }

    #[test]
    fn test_reset_clears_selection_and_filters() {
        let mut s = session();
        s.select("README.md");
        s.set_extension_enabled("md", false);
        s.reset("other", vec![Entry::from_bytes("x.md", "x")]).unwrap();
        assert_eq!(s.project_name(), "other");
        assert!(s.effective_selection().is_empty());
        assert!(s.is_extension_enabled("md"));
    }

    #[test]
    fn test_view_nodes_reflect_filter() {
        let mut s = session();
        s.set_extension_enabled("rs", false);
        let rows = s.view_nodes();
        let src = rows.iter().find(|r| r.id == "src").unwrap();
        assert!(!src.visible);
        let readme = rows.iter().find(|r| r.id == "README.md").unwrap();
        assert!(readme.visible);
        assert_eq!(readme.label, "README.md (6 B)");
    }

    #[test]
    fn test_irregular_separators_select_like_tree_paths() {
        let mut s = Session::new(
            "p",
            vec![
                Entry::from_bytes("a//b.txt", "bb"),
                Entry::from_bytes("/c/d.txt", "d"),
            ],
        )
        .unwrap();
        s.select_all_visible();
        assert_eq!(s.effective_selection(), vec!["a/b.txt", "c/d.txt"]);
        assert_eq!(s.selected_size(), 3);
        let rows = s.view_nodes();
        assert!(rows.iter().any(|r| r.id == "a/b.txt" && r.label == "b.txt (2 B)"));
    }

    #[test]
    fn test_view_nodes_ids_unique_for_archive_layout() {
        let s = Session::new("demo", vec![Entry::from_bytes("demo/a.txt", "x")]).unwrap();
        let rows = s.view_nodes();
        let ids: std::collections::HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(ids.len(), rows.len());
        assert!(rows.iter().any(|r| r.id == "demo/a.txt" && r.label == "a.txt (1 B)"));
    }

    #[test]
    fn test_assembler_renders_effective_selection() {
        let mut s = session();
        s.select("src/main.rs");
        s.select("README.md");
        s.set_extension_enabled("md", false);
        let doc: Vec<String> = s.assembler().unwrap().map(|b| b.text).collect();
        assert_eq!(doc.len(), 2);
        assert!(doc[1].starts_with("### `src/main.rs`"));
    }
}
