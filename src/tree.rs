//! Path tree materialisation and rendering.
//!
//! A flat set of relative paths becomes a [`TreeNode`] hierarchy. Both the
//! interactive view and the ASCII listing walk siblings in the same order:
//! directories first, then names compared at primary collation strength
//! (root locale: case, accents and punctuation weights per UCA), with the raw
//! name as a final tie-breaker so the order never depends on input order.

use crate::error::{Error, Result};
use crate::utils::format_bytes;
use deunicode::deunicode;
use icu_collator::{Collator, CollatorOptions, Strength};
use log::{trace, warn};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Placeholder child line used when nothing is selected.
pub const EMPTY_SELECTION_LINE: &str = "└── (no files selected)";

/// Id of the root view row. Never a valid relative path.
pub const ROOT_ID: &str = "";

thread_local! {
    static BASE_COLLATOR: Option<Collator> = base_collator();
}

fn base_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Primary);
    Collator::try_new(&Default::default(), options)
        .map_err(|e| warn!("Collator unavailable, sorting by folded names: {e}"))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Directory {
        name: String,
        children: BTreeMap<String, TreeNode>,
    },
    File {
        name: String,
        /// Full path of the originating entry.
        path: String,
    },
}

impl TreeNode {
    fn directory(name: &str) -> Self {
        TreeNode::Directory {
            name: name.to_string(),
            children: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Directory { name, .. } | TreeNode::File { name, .. } => name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, TreeNode::Directory { .. })
    }

    pub fn children(&self) -> Option<&BTreeMap<String, TreeNode>> {
        match self {
            TreeNode::Directory { children, .. } => Some(children),
            TreeNode::File { .. } => None,
        }
    }

    /// Entry path for file nodes.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            TreeNode::File { path, .. } => Some(path),
            TreeNode::Directory { .. } => None,
        }
    }

    pub fn has_children(&self) -> bool {
        self.children().is_some_and(|c| !c.is_empty())
    }

    /// Children in display order.
    pub fn sorted_children(&self) -> Vec<&TreeNode> {
        let mut children: Vec<&TreeNode> = self
            .children()
            .map(|c| c.values().collect())
            .unwrap_or_default();
        children.sort_by(|a, b| compare_siblings(a, b));
        children
    }

    /// Every file path below this node, in display order.
    pub fn file_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_file_paths(&mut out);
        out
    }

    fn collect_file_paths(&self, out: &mut Vec<String>) {
        if let Some(path) = self.file_path() {
            out.push(path.to_string());
            return;
        }
        for child in self.sorted_children() {
            child.collect_file_paths(out);
        }
    }
}

/// Base-strength name comparison: `_` < `-` < `.`, `a` == `A` == `á`.
fn compare_names(a: &str, b: &str) -> Ordering {
    BASE_COLLATOR.with(|collator| match collator {
        Some(collator) => collator.compare(a, b),
        None => deunicode(a).to_lowercase().cmp(&deunicode(b).to_lowercase()),
    })
}

/// Sibling order: directories before files, then base-strength name order.
pub fn compare_siblings(a: &TreeNode, b: &TreeNode) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| compare_names(a.name(), b.name()))
        .then_with(|| a.name().cmp(b.name()))
}

/// Builds the tree for a set of relative paths.
///
/// Returns [`Error::StructuralConflict`] when one path needs to be both a
/// file and a directory. A repeated file path replaces the earlier node.
pub fn build_tree<I, S>(paths: I) -> Result<TreeNode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut children = BTreeMap::new();
    for path in paths {
        insert_path(&mut children, path.as_ref())?;
    }
    Ok(TreeNode::Directory {
        name: String::new(),
        children,
    })
}

fn insert_path(root: &mut BTreeMap<String, TreeNode>, path: &str) -> Result<()> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((file_name, dirs)) = segments.split_last() else {
        return Ok(());
    };

    let mut level = root;
    let mut walked = String::new();
    for dir in dirs {
        if !walked.is_empty() {
            walked.push('/');
        }
        walked.push_str(dir);

        let node = level
            .entry((*dir).to_string())
            .or_insert_with(|| TreeNode::directory(dir));
        level = match node {
            TreeNode::Directory { children, .. } => children,
            TreeNode::File { .. } => return Err(Error::StructuralConflict { path: walked }),
        };
    }

    let full_path = segments.join("/");
    if let Some(TreeNode::Directory { .. }) = level.get(*file_name) {
        return Err(Error::StructuralConflict { path: full_path });
    }
    trace!("Tree insert: {full_path}");
    level.insert(
        (*file_name).to_string(),
        TreeNode::File {
            name: (*file_name).to_string(),
            path: full_path,
        },
    );
    Ok(())
}

/// Renders the ASCII listing for `paths` under a `<project_name>/` root line.
pub fn render_ascii<I, S>(project_name: &str, paths: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tree = build_tree(paths)?;
    let mut out = format!("{project_name}/\n");
    if tree.has_children() {
        write_ascii(&tree, "", &mut out);
    } else {
        out.push_str(EMPTY_SELECTION_LINE);
        out.push('\n');
    }
    Ok(out)
}

fn write_ascii(node: &TreeNode, prefix: &str, out: &mut String) {
    let children = node.sorted_children();
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(child.name());
        if child.has_children() {
            out.push('/');
        }
        out.push('\n');

        if child.has_children() {
            let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
            write_ascii(child, &child_prefix, out);
        }
    }
}

/// One row of the checkbox tree handed to an external UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    /// Relative path, unique per row; the root row uses [`ROOT_ID`].
    pub id: String,
    pub parent_id: Option<String>,
    pub label: String,
    pub is_directory: bool,
    pub extension: Option<String>,
    pub visible: bool,
}

/// Flattens `tree` into view rows in display order.
///
/// `size_of` supplies the byte size shown in file labels and `is_visible`
/// decides whether a file passes the active filter. A directory is visible
/// when any file below it is.
pub fn view_nodes<F, V>(
    project_name: &str,
    tree: &TreeNode,
    size_of: F,
    is_visible: V,
) -> Vec<ViewNode>
where
    F: Fn(&str) -> u64,
    V: Fn(&str) -> bool,
{
    let mut rows = vec![ViewNode {
        id: ROOT_ID.to_string(),
        parent_id: None,
        label: format!("{project_name}/"),
        is_directory: true,
        extension: None,
        visible: true,
    }];
    let any_visible = push_view_rows(tree, ROOT_ID, None, &size_of, &is_visible, &mut rows);
    rows[0].visible = any_visible;
    rows
}

fn push_view_rows<F, V>(
    node: &TreeNode,
    parent_id: &str,
    parent_path: Option<&str>,
    size_of: &F,
    is_visible: &V,
    rows: &mut Vec<ViewNode>,
) -> bool
where
    F: Fn(&str) -> u64,
    V: Fn(&str) -> bool,
{
    let mut any_visible = false;
    for child in node.sorted_children() {
        let id = match parent_path {
            Some(parent) => format!("{parent}/{}", child.name()),
            None => child.name().to_string(),
        };
        match child {
            TreeNode::File { name, path } => {
                let visible = is_visible(path);
                any_visible |= visible;
                rows.push(ViewNode {
                    id,
                    parent_id: Some(parent_id.to_string()),
                    label: format!("{name} ({})", format_bytes(size_of(path))),
                    is_directory: false,
                    extension: Some(crate::entry::extension_of(path)),
                    visible,
                });
            }
            TreeNode::Directory { name, .. } => {
                let slot = rows.len();
                rows.push(ViewNode {
                    id: id.clone(),
                    parent_id: Some(parent_id.to_string()),
                    label: name.clone(),
                    is_directory: true,
                    extension: None,
                    visible: false,
                });
                let visible = push_view_rows(child, &id, Some(id.as_str()), size_of, is_visible, rows);
                rows[slot].visible = visible;
                any_visible |= visible;
            }
        }
    }
    any_visible
}
