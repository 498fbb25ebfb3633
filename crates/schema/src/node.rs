//! The schema tree model: an arena of nodes owned by [`SchemaTree`], accessed
//! through the copyable [`SchemaNode`] handle.
//!
//! The tree is immutable once the loader returns it and is shared freely
//! across threads; every pattern regex is compiled at load time, so reads
//! never mutate.

use std::collections::HashMap;

use regex::Regex;

use crate::ns::{Namespace, NamespaceMap, NamespaceTable, NsId};
use crate::range::RangeSpec;

pub type NodeId = usize;

/// Per-module record from the loaded models list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub ns_href: String,
    pub ns_prefix: Option<String>,
    pub model: String,
    pub organization: Option<String>,
    pub version: Option<String>,
    pub features: Option<String>,
    pub deviations: Option<String>,
}

/// The kind of a schema node, derived from its children and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaNodeKind {
    Container,
    PresenceContainer,
    List,
    LeafList,
    Leaf,
    ValueEnum,
}

/// Arena payload of one schema node.
#[derive(Debug, Clone, Default)]
pub(crate) struct SchemaNodeData {
    pub name: String,
    pub ns: NsId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Value-enum marker: the node came from a `V…` element.
    pub is_value: bool,
    /// Enum entry value (value-enums only).
    pub value: Option<String>,
    pub mode: Option<String>,
    pub default: Option<String>,
    pub pattern: Option<String>,
    pub range_raw: Option<String>,
    pub range: Option<RangeSpec>,
    pub help: Option<String>,
    pub idref_module: Option<String>,
    pub when_cond: Option<String>,
    pub must_cond: Option<String>,
    pub if_feature: Option<String>,
    pub model: Option<String>,
    pub organization: Option<String>,
    pub version: Option<String>,
    pub features: Option<String>,
    pub deviations: Option<String>,
}

/// A loaded, merged schema instance.
pub struct SchemaTree {
    pub(crate) nodes: Vec<SchemaNodeData>,
    pub(crate) namespaces: NamespaceTable,
    pub(crate) models: Vec<ModelInfo>,
    pub(crate) map: NamespaceMap,
    /// Compiled `pattern` attributes, keyed by node index.
    pub(crate) patterns: HashMap<NodeId, Regex>,
    /// Compile failures, kept so validation can report them.
    pub(crate) bad_patterns: HashMap<NodeId, String>,
}

impl SchemaTree {
    pub(crate) fn empty() -> Self {
        SchemaTree {
            nodes: vec![SchemaNodeData {
                name: "MODULE".to_string(),
                ..Default::default()
            }],
            namespaces: NamespaceTable::new(),
            models: Vec::new(),
            map: NamespaceMap::new(),
            patterns: HashMap::new(),
            bad_patterns: HashMap::new(),
        }
    }

    /// The synthetic root.
    pub fn root(&self) -> SchemaNode<'_> {
        SchemaNode { tree: self, id: 0 }
    }

    pub fn node(&self, id: NodeId) -> SchemaNode<'_> {
        SchemaNode { tree: self, id }
    }

    /// The authoritative inventory of loaded modules.
    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn namespace_map(&self) -> &NamespaceMap {
        &self.map
    }

    pub fn namespace(&self, id: NsId) -> &Namespace {
        self.namespaces.get(id)
    }

}

/// Case-sensitive name equality with `-` ≡ `_`.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .all(|(x, y)| x == y || (x == b'-' && y == b'_') || (x == b'_' && y == b'-'))
}

/// A schema node handle: tree reference plus arena index.
#[derive(Clone, Copy)]
pub struct SchemaNode<'a> {
    pub(crate) tree: &'a SchemaTree,
    pub(crate) id: NodeId,
}

impl<'a> SchemaNode<'a> {
    fn data(&self) -> &'a SchemaNodeData {
        &self.tree.nodes[self.id]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn namespace(&self) -> &'a Namespace {
        self.tree.namespaces.get(self.data().ns)
    }

    pub(crate) fn ns_id(&self) -> NsId {
        self.data().ns
    }

    pub fn is_root(&self) -> bool {
        self.id == 0
    }

    pub fn parent(&self) -> Option<SchemaNode<'a>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    /// All children, value-enums included, in declaration order.
    pub fn children(&self) -> impl Iterator<Item = SchemaNode<'a>> + 'a {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| tree.node(id))
    }

    /// Children that are schema nodes (value-enums filtered out).
    pub fn schema_children(&self) -> impl Iterator<Item = SchemaNode<'a>> + 'a {
        self.children().filter(|c| !c.is_value_enum())
    }

    /// Value-enum entries declared under this leaf.
    pub fn enums(&self) -> impl Iterator<Item = SchemaNode<'a>> + 'a {
        self.children().filter(|c| c.is_value_enum())
    }

    pub fn first_child(&self) -> Option<SchemaNode<'a>> {
        self.data()
            .children
            .first()
            .map(|&id| self.tree.node(id))
    }

    pub fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        let parent = self.data().parent?;
        let siblings = &self.tree.nodes[parent].children;
        let pos = siblings.iter().position(|&id| id == self.id)?;
        siblings.get(pos + 1).map(|&id| self.tree.node(id))
    }

    /// Preorder successor, bounded by `root`: descends first, then walks
    /// siblings, then climbs, stopping when the climb reaches `root`.
    pub fn preorder_next(&self, root: SchemaNode<'a>) -> Option<SchemaNode<'a>> {
        if let Some(child) = self.first_child() {
            return Some(child);
        }
        let mut current = *self;
        loop {
            if current.id == root.id {
                return None;
            }
            if let Some(sibling) = current.next_sibling() {
                return Some(sibling);
            }
            current = current.parent()?;
        }
    }

    /// Index of this node among its parent's children.
    pub fn child_index(&self) -> Option<usize> {
        let parent = self.data().parent?;
        self.tree.nodes[parent]
            .children
            .iter()
            .position(|&id| id == self.id)
    }

    pub fn is_value_enum(&self) -> bool {
        self.data().is_value
    }

    /// Kind derivation per the schema dialect rules.
    pub fn kind(&self) -> SchemaNodeKind {
        let d = self.data();
        if d.is_value {
            return SchemaNodeKind::ValueEnum;
        }
        if d.children.len() == 1 {
            let only = self.tree.node(d.children[0]);
            if only.name() == "*" && !only.is_value_enum() {
                return if only.schema_children().next().is_none() {
                    SchemaNodeKind::LeafList
                } else {
                    SchemaNodeKind::List
                };
            }
        }
        let has_schema_children = self.schema_children().next().is_some();
        if !has_schema_children && d.mode.is_some() {
            SchemaNodeKind::Leaf
        } else if d.children.is_empty() && d.mode.is_none() {
            SchemaNodeKind::PresenceContainer
        } else {
            SchemaNodeKind::Container
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() == SchemaNodeKind::Leaf
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind(), SchemaNodeKind::List | SchemaNodeKind::LeafList)
    }

    pub fn is_leaf_list(&self) -> bool {
        self.kind() == SchemaNodeKind::LeafList
    }

    pub fn is_presence_container(&self) -> bool {
        self.kind() == SchemaNodeKind::PresenceContainer
    }

    /// The wildcard entry node of a list.
    pub fn list_entry(&self) -> Option<SchemaNode<'a>> {
        if self.is_list() {
            self.first_child()
        } else {
            None
        }
    }

    /// The key leaf of a list: the first schema child of its wildcard entry.
    pub fn list_key(&self) -> Option<SchemaNode<'a>> {
        self.list_entry()?.schema_children().next()
    }

    fn mode_has(&self, flag: char) -> bool {
        self.data()
            .mode
            .as_deref()
            .is_some_and(|m| m.contains(flag))
    }

    /// Nodes without a mode (containers) are readable.
    pub fn is_readable(&self) -> bool {
        self.data().mode.is_none() || self.mode_has('r')
    }

    pub fn is_writable(&self) -> bool {
        self.mode_has('w')
    }

    pub fn is_executable(&self) -> bool {
        self.mode_has('x')
    }

    pub fn is_config(&self) -> bool {
        self.mode_has('c')
    }

    pub fn is_hidden(&self) -> bool {
        self.mode_has('h')
    }

    pub fn is_proxy(&self) -> bool {
        self.mode_has('p')
    }

    pub fn mode(&self) -> Option<&'a str> {
        self.data().mode.as_deref()
    }

    pub fn default_value(&self) -> Option<&'a str> {
        self.data().default.as_deref()
    }

    pub fn pattern(&self) -> Option<&'a str> {
        self.data().pattern.as_deref()
    }

    pub fn range(&self) -> Option<&'a RangeSpec> {
        self.data().range.as_ref()
    }

    pub fn range_raw(&self) -> Option<&'a str> {
        self.data().range_raw.as_deref()
    }

    pub fn help(&self) -> Option<&'a str> {
        self.data().help.as_deref()
    }

    pub fn idref_module(&self) -> Option<&'a str> {
        self.data().idref_module.as_deref()
    }

    pub fn when_condition(&self) -> Option<&'a str> {
        self.data().when_cond.as_deref()
    }

    pub fn must_condition(&self) -> Option<&'a str> {
        self.data().must_cond.as_deref()
    }

    pub fn if_feature(&self) -> Option<&'a str> {
        self.data().if_feature.as_deref()
    }

    pub fn model(&self) -> Option<&'a str> {
        self.data().model.as_deref()
    }

    pub fn organization(&self) -> Option<&'a str> {
        self.data().organization.as_deref()
    }

    pub fn version(&self) -> Option<&'a str> {
        self.data().version.as_deref()
    }

    pub fn features(&self) -> Option<&'a str> {
        self.data().features.as_deref()
    }

    pub fn deviations(&self) -> Option<&'a str> {
        self.data().deviations.as_deref()
    }

    /// Enum entry value (value-enums only).
    pub fn enum_value(&self) -> Option<&'a str> {
        self.data().value.as_deref()
    }

    /// `/`-joined path from the root to this node, for diagnostics.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(*self);
        while let Some(node) = current {
            if node.is_root() {
                break;
            }
            segments.push(node.name().to_string());
            current = node.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// First child whose name matches `name` (`-` ≡ `_`) in a namespace that
    /// matches `ns`. A child named `*` matches any segment, so list-entry key
    /// values resolve to the list's wildcard node.
    pub(crate) fn match_child(&self, name: &str, ns: Option<NsId>) -> Option<SchemaNode<'a>> {
        self.schema_children()
            .find(|c| names_match(c.name(), name) && self.tree.namespaces.matches(ns, c.ns_id()))
            .or_else(|| {
                self.schema_children()
                    .find(|c| c.name() == "*" && self.tree.namespaces.matches(ns, c.ns_id()))
            })
    }
}

impl std::fmt::Debug for SchemaNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaNode")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_treats_dash_as_underscore() {
        assert!(names_match("if-feature", "if_feature"));
        assert!(names_match("abc", "abc"));
        assert!(!names_match("abc", "Abc"));
        assert!(!names_match("ab", "abc"));
    }
}
