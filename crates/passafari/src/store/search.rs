//! Entry enumeration and query matching.
//!
//! The walk visits directory children in file-name order, so the same
//! store contents always yield the same sequence. Directories whose name
//! contains `.git` are pruned; the per-entry VCS check still runs for
//! entries whose metadata directory was reached some other way.

use std::path::Path;

use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::entry::{EntryPath, VCS_MARKER};

/// Every entry under `root`, in walk order.
pub(crate) fn entries(root: &Path) -> impl Iterator<Item = EntryPath> + '_ {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|node| !is_vcs_dir(node))
        .filter_map(|node| match node {
            Ok(node) => Some(node),
            Err(e) => {
                warn!("skipping unreadable path in password store: {e}");
                None
            }
        })
        .filter(|node| !node.file_type().is_dir())
        .filter_map(move |node| {
            let relative = node.path().strip_prefix(root).ok()?;
            let entry = EntryPath::from_relative(relative);
            if entry.is_none() && relative.to_str().is_none() {
                debug!("skipping non UTF-8 path {}", relative.display());
            }
            entry
        })
        .filter(|entry| !entry.is_vcs_metadata())
}

/// Entries whose store-relative path contains `query`, ignoring case.
pub(crate) fn find_entries(root: &Path, query: &str) -> Vec<EntryPath> {
    let needle = query.to_lowercase();
    entries(root)
        .filter(|entry| matches_query(entry, &needle))
        .collect()
}

/// `needle` must already be lower-cased.
fn matches_query(entry: &EntryPath, needle: &str) -> bool {
    entry.as_str().to_lowercase().contains(needle)
}

fn is_vcs_dir(node: &DirEntry) -> bool {
    node.file_type().is_dir()
        && node
            .file_name()
            .to_str()
            .is_some_and(|name| name.contains(VCS_MARKER))
}
