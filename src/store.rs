//! Moving data between a [`Store`] and data trees.
//!
//! The store is addressed by `/`-joined paths whose segments are data-tree
//! node names; a leaf's value lives at its full path. These two functions are
//! the only place the library touches a store, and both go through the
//! narrow [`Store`] trait.

use canopy_translate::{EditOps, Query};
use canopy_types::{DataTree, Store, StoreError};

/// Materializes the data a query skeleton describes.
///
/// Wildcard skeleton nodes enumerate the store below their path; named
/// leaves fetch exactly one value. Branches that turn out empty are dropped,
/// so the result mirrors what is actually populated.
pub fn fetch(store: &dyn Store, query: &Query) -> DataTree {
    let mut root = DataTree::new(query.tree.name());
    let path = format!("/{}", query.tree.name());
    fetch_node(store, &query.tree, &path, &mut root);
    root
}

fn fetch_node(store: &dyn Store, skeleton: &DataTree, path: &str, out: &mut DataTree) {
    for child in skeleton.children() {
        if child.name() == "*" {
            if child.is_empty() {
                // The whole subtree below this path. A leaf keeps its value
                // at the path itself, not below it.
                let below = store.search(&format!("{}/", path));
                if below.is_empty() && out.is_empty() {
                    if let Some(value) = store.get(path) {
                        out.set_value(value);
                    }
                    continue;
                }
                for key in below {
                    if let Some(value) = store.get(&key) {
                        insert_path(out, &key[path.len() + 1..], &value);
                    }
                }
            } else {
                // One skeleton shape per populated list entry.
                for entry_name in entries_under(store, path) {
                    let entry_path = format!("{}/{}", path, entry_name);
                    let mut entry = DataTree::new(entry_name);
                    fetch_node(store, child, &entry_path, &mut entry);
                    if !entry.is_empty() {
                        out.push(entry);
                    }
                }
            }
            continue;
        }
        let child_path = format!("{}/{}", path, child.name());
        if child.is_empty() {
            if let Some(value) = store.get(&child_path) {
                out.push(DataTree::leaf(child.name(), value));
            }
        } else {
            let mut node = DataTree::new(child.name());
            fetch_node(store, child, &child_path, &mut node);
            if !node.is_empty() {
                out.push(node);
            }
        }
    }
}

/// Distinct first path segments below `path`, in store order.
fn entries_under(store: &dyn Store, path: &str) -> Vec<String> {
    let prefix = format!("{}/", path);
    let mut entries: Vec<String> = Vec::new();
    for key in store.search(&prefix) {
        let rest = &key[prefix.len()..];
        let segment = rest.split('/').next().unwrap_or(rest);
        if entries.last().map(String::as_str) != Some(segment) {
            entries.push(segment.to_string());
        }
    }
    entries
}

fn insert_path(out: &mut DataTree, relative: &str, value: &str) {
    let mut node = out;
    let mut segments = relative.split('/').peekable();
    while let Some(segment) = segments.next() {
        node = node.child_or_insert(segment);
        if segments.peek().is_none() {
            node.set_value(value);
        }
    }
}

/// Writes a parsed edit back to the store.
///
/// Subtrees named by delete, remove, and replace operations are cleared
/// first; then every leaf in the tree is written. An empty leaf value clears
/// its path.
pub fn apply(store: &mut dyn Store, tree: &DataTree, ops: &EditOps) -> Result<(), StoreError> {
    for path in ops
        .deletes
        .iter()
        .chain(ops.removes.iter())
        .chain(ops.replaces.iter())
    {
        let keys = store.search(&format!("{}/", path));
        for key in keys {
            store.set(&key, None)?;
        }
        store.set(path, None)?;
    }
    for (path, value) in tree.leaves() {
        if value.is_empty() {
            store.set(&path, None)?;
        } else {
            store.set(&path, Some(&value))?;
        }
    }
    Ok(())
}
