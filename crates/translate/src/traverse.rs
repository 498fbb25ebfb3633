//! Defaulting, trimming, nulling, and depth traversals over data trees.
//!
//! One recursive pass realizes the overlapping policies selected by flags:
//! `ADD_MISSING_NULL`, `SET_NULL`, `ADD_DEFAULTS`, `TRIM_DEFAULTS`, and
//! `FILTER_RDEPTH`. After recursion every empty non-leaf branch is pruned
//! unless its schema node is a presence container.

use std::cmp::Ordering;

use canopy_schema::{SchemaError, SchemaNode};
use canopy_types::{DataTree, Flags};

use crate::Translator;
use crate::error::TranslateError;

impl<'a> Translator<'a> {
    /// Applies the flag-selected default/null policies to `data`, which must
    /// be rooted at a top-level schema node.
    pub fn traverse(
        &self,
        data: &mut DataTree,
        flags: Flags,
        rdepth: usize,
    ) -> Result<(), TranslateError> {
        let name = data.name().trim_start_matches('/').to_string();
        data.set_name(name);
        let Some(schema) = self.tree.root().child_by_name(data.name(), None) else {
            return Err(SchemaError::NoSchemaNode(format!("/{}", data.name())).into());
        };
        self.traverse_nodes(schema, data, flags, 1, rdepth)
    }

    fn traverse_nodes(
        &self,
        schema: SchemaNode<'a>,
        data: &mut DataTree,
        flags: Flags,
        depth: usize,
        rdepth: usize,
    ) -> Result<(), TranslateError> {
        if schema.is_leaf_list() {
            // Leaf-list entries carry their own values; no defaults apply.
            return Ok(());
        }
        if schema.is_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a list always has its wildcard child");
            for entry in data.children_mut() {
                self.traverse_nodes(entry_schema, entry, flags, depth + 1, rdepth)?;
            }
            return Ok(());
        }

        let active = !flags.contains(Flags::FILTER_RDEPTH) || depth + 1 >= rdepth;
        for child_schema in schema.schema_children() {
            if child_schema.is_leaf() {
                if active {
                    self.apply_leaf_policies(child_schema, data, flags)?;
                }
                continue;
            }
            let position = data
                .children()
                .iter()
                .position(|c| c.name() == child_schema.name());
            match position {
                Some(index) => {
                    let child_data = &mut data.children_mut()[index];
                    self.traverse_nodes(child_schema, child_data, flags, depth + 1, rdepth)?;
                }
                None => {
                    // Additive policies may need a branch to put leaves in;
                    // empty results are pruned below.
                    if flags.intersects(Flags::ADD_DEFAULTS | Flags::ADD_MISSING_NULL)
                        && !child_schema.is_hidden()
                        && !child_schema.is_list()
                        && !child_schema.is_presence_container()
                    {
                        let child_data = data.push(DataTree::new(child_schema.name()));
                        self.traverse_nodes(child_schema, child_data, flags, depth + 1, rdepth)?;
                    }
                }
            }
        }

        // Prune empty non-leaf branches, presence containers excepted.
        data.retain_children(|child| {
            if !child.is_empty() {
                return true;
            }
            match schema.child_by_name(child.name(), None) {
                Some(s) => s.is_presence_container(),
                None => true,
            }
        });
        Ok(())
    }

    fn apply_leaf_policies(
        &self,
        leaf: SchemaNode<'a>,
        parent: &mut DataTree,
        flags: Flags,
    ) -> Result<(), TranslateError> {
        let config_only = flags.contains(Flags::CONFIG);
        let existing = parent
            .children()
            .iter()
            .position(|c| c.name() == leaf.name());

        match existing {
            Some(index) => {
                if flags.contains(Flags::SET_NULL) {
                    if leaf.is_hidden() || (config_only && !leaf.is_writable()) {
                        parent.remove_child(index);
                        return Ok(());
                    }
                    if !leaf.is_writable() {
                        return Err(SchemaError::NotWritable(leaf.path()).into());
                    }
                    parent.children_mut()[index].set_value("");
                    return Ok(());
                }
                let child = &mut parent.children_mut()[index];
                if flags.contains(Flags::ADD_DEFAULTS) {
                    if let Some(default) = leaf.default_value() {
                        if child.value().is_none_or(|v| v.is_empty()) {
                            child.set_value(default);
                        }
                    }
                }
                if flags.contains(Flags::TRIM_DEFAULTS) {
                    if let Some(default) = leaf.default_value() {
                        if child.value() == Some(default) {
                            parent.remove_child(index);
                        }
                    }
                }
            }
            None => {
                if leaf.is_hidden() || (config_only && !leaf.is_writable()) {
                    return Ok(());
                }
                if flags.contains(Flags::ADD_MISSING_NULL) {
                    parent.push(DataTree::leaf(leaf.name(), ""));
                } else if flags.contains(Flags::ADD_DEFAULTS) {
                    if let Some(default) = leaf.default_value() {
                        parent.push(DataTree::leaf(leaf.name(), default));
                    }
                }
            }
        }
        Ok(())
    }

    /// Removes every subtree below `depth` levels, keeping leaf values at the
    /// boundary. Children are sorted to schema order first, and deletions go
    /// through an index list so the walk never removes what it is iterating.
    pub fn trim_by_depth(&self, data: &mut DataTree, depth: usize) {
        let Some(schema) = self.tree.root().child_by_name(data.name(), None) else {
            return;
        };
        trim_nodes(self, schema, data, 1, depth);
    }

    /// Reorders `data`'s children into canonical order for its schema node:
    /// schema declaration order for containers, key order for lists (numeric
    /// when the key leaf carries a range, lexical otherwise).
    pub(crate) fn sort_children(&self, schema: SchemaNode<'a>, data: &mut DataTree) {
        if schema.is_leaf_list() {
            let numeric = schema
                .wildcard_child()
                .is_some_and(|entry| entry.range().is_some());
            data.sort_children_by(|a, b| value_order(a.name(), b.name(), numeric));
        } else if schema.is_list() {
            let numeric = schema.list_key().is_some_and(|key| key.range().is_some());
            data.sort_children_by(|a, b| value_order(a.name(), b.name(), numeric));
        } else {
            data.sort_children_by(|a, b| {
                let ka = schema
                    .child_by_name(a.name(), None)
                    .and_then(|c| c.child_index())
                    .unwrap_or(usize::MAX);
                let kb = schema
                    .child_by_name(b.name(), None)
                    .and_then(|c| c.child_index())
                    .unwrap_or(usize::MAX);
                ka.cmp(&kb)
            });
        }
    }
}

fn trim_nodes(
    translator: &Translator,
    schema: SchemaNode,
    data: &mut DataTree,
    level: usize,
    depth: usize,
) {
    translator.sort_children(schema, data);
    if level >= depth {
        if !data.has_value() {
            let doomed: Vec<usize> = (0..data.children().len()).collect();
            for index in doomed.into_iter().rev() {
                data.remove_child(index);
            }
        }
        return;
    }
    let next_schema = |name: &str| {
        if schema.is_list() && !schema.is_leaf_list() {
            schema.wildcard_child()
        } else {
            schema.child_by_name(name, None)
        }
    };
    for child in data.children_mut() {
        if let Some(child_schema) = next_schema(child.name()) {
            trim_nodes(translator, child_schema, child, level + 1, depth);
        }
    }
}

/// Ordering for list keys and leaf-list values.
pub(crate) fn value_order(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        if let (Ok(na), Ok(nb)) = (a.parse::<i128>(), b.parse::<i128>()) {
            return na.cmp(&nb);
        }
    }
    a.cmp(b)
}
