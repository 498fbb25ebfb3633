//! Path resolution against the schema tree.
//!
//! Lookup tokenizes on `/` and walks the tree one segment at a time,
//! resolving `prefix:` qualifiers, stripping list-key decorations, following
//! wildcards, and restarting from the root when a proxy node is traversed.

use canopy_types::Flags;

use crate::error::SchemaError;
use crate::node::{SchemaNode, SchemaTree, names_match};
use crate::ns::{Namespace, NsId};

/// In the XPath dialect a double slash abbreviates `/*/`.
pub fn expand_double_slash(path: &str) -> String {
    let mut out = path.to_string();
    while out.contains("//") {
        out = out.replace("//", "/*/");
    }
    out
}

/// Strips the list-key decoration from a path segment: `name=value` in the
/// plain dialect, `name[key='value']` in the XPath dialect.
pub fn strip_list_key(segment: &str, flags: Flags) -> &str {
    if flags.contains(Flags::XPATH) {
        segment.split('[').next().unwrap_or(segment)
    } else {
        segment.split('=').next().unwrap_or(segment)
    }
}

/// Splits a path segment into its name part and an optional list-key value:
/// `name=value` in the plain dialect, `name[key='value']` in XPath.
pub fn split_key(segment: &str, flags: Flags) -> (&str, Option<String>) {
    if flags.contains(Flags::XPATH) {
        let Some((name, rest)) = segment.split_once('[') else {
            return (segment, None);
        };
        let predicate = rest.trim_end_matches(']');
        let value = predicate
            .split_once('=')
            .map(|(_, v)| v.trim().trim_matches('\'').trim_matches('"').to_string());
        (name, value)
    } else {
        match segment.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (segment, None),
        }
    }
}

/// A fully resolved path: one schema node per produced data-tree segment.
/// Key-value segments resolve to the list's wildcard entry node; bounded
/// descendant searches contribute the intermediate ancestors they skipped
/// over.
pub struct ResolvedPath<'a> {
    pub nodes: Vec<SchemaNode<'a>>,
    pub segments: Vec<String>,
}

impl<'a> ResolvedPath<'a> {
    /// The schema node the path leads to; the root for an empty path.
    pub fn target(&self, tree: &'a SchemaTree) -> SchemaNode<'a> {
        self.nodes.last().copied().unwrap_or_else(|| tree.root())
    }
}

impl SchemaTree {
    /// Resolves an absolute path to a schema node.
    pub fn lookup(&self, path: &str, flags: Flags) -> Result<SchemaNode<'_>, SchemaError> {
        self.lookup_with_ns(None, path, flags)
    }

    /// Resolves an absolute path starting from the given namespace URI.
    pub fn lookup_with_ns(
        &self,
        ns_href: Option<&str>,
        path: &str,
        flags: Flags,
    ) -> Result<SchemaNode<'_>, SchemaError> {
        let resolved = self.resolve_path(ns_href, path, flags)?;
        Ok(resolved.target(self))
    }

    /// Resolves a path segment by segment, producing the data-tree segment
    /// names alongside the schema node each one lands on.
    pub fn resolve_path(
        &self,
        ns_href: Option<&str>,
        path: &str,
        flags: Flags,
    ) -> Result<ResolvedPath<'_>, SchemaError> {
        let start_ns = match ns_href {
            Some(href) => match self.namespaces.find_by_href(href) {
                Some(id) => Some(id),
                None => return Err(SchemaError::NoSchemaNode(path.to_string())),
            },
            None => None,
        };
        if flags.contains(Flags::DEBUG) {
            log::debug!("resolve '{}' (ns {:?})", path, ns_href);
        }

        let normalized = if flags.contains(Flags::XPATH) {
            expand_double_slash(path)
        } else {
            path.to_string()
        };

        let mut resolved = ResolvedPath {
            nodes: Vec::new(),
            segments: Vec::new(),
        };
        let mut current = self.root();
        let mut cur_ns = start_ns;
        let mut pending_wildcard = false;

        for raw_segment in normalized.split('/').filter(|s| !s.is_empty()) {
            let (segment, key) = split_key(raw_segment, flags);
            if segment == "*" {
                match current.wildcard_child() {
                    Some(entry) => {
                        current = entry;
                        cur_ns = Some(current.ns_id());
                        resolved.nodes.push(entry);
                        resolved.segments.push("*".to_string());
                    }
                    // Not a list: remember the wildcard and let the next
                    // segment search the descendants.
                    None => pending_wildcard = true,
                }
                continue;
            }

            let (name, segment_ns) = self.resolve_segment(current, cur_ns, segment, flags);
            match current.match_child(&name, segment_ns) {
                Some(child) if child.is_proxy() => {
                    // A proxy restarts the remaining resolution at the root.
                    pending_wildcard = false;
                    resolved.nodes.push(child);
                    resolved.segments.push(child.name().to_string());
                    current = self.root();
                    cur_ns = None;
                }
                Some(child) => {
                    pending_wildcard = false;
                    if child.name() == "*" && name != "*" {
                        // The segment is a list-entry key value.
                        resolved.segments.push(name.clone());
                    } else {
                        resolved.segments.push(child.name().to_string());
                    }
                    resolved.nodes.push(child);
                    current = child;
                    cur_ns = Some(child.ns_id());
                    // A key decoration addresses one list entry, so the
                    // remaining segments resolve under the wildcard node.
                    if let Some(key) = key {
                        if let Some(entry) = child.wildcard_child() {
                            resolved.nodes.push(entry);
                            resolved.segments.push(key);
                            current = entry;
                        }
                    }
                }
                None => {
                    if flags.contains(Flags::XPATH) && pending_wildcard {
                        if let Some(chain) = descendant_chain(current, &name, segment_ns) {
                            pending_wildcard = false;
                            for node in &chain {
                                resolved.nodes.push(*node);
                                resolved.segments.push(node.name().to_string());
                            }
                            current = *chain.last().expect("chain is never empty");
                            cur_ns = Some(current.ns_id());
                            if let Some(key) = key {
                                if let Some(entry) = current.wildcard_child() {
                                    resolved.nodes.push(entry);
                                    resolved.segments.push(key);
                                    current = entry;
                                }
                            }
                            continue;
                        }
                    }
                    return Err(SchemaError::NoSchemaNode(path.to_string()));
                }
            }
        }
        Ok(resolved)
    }

    /// Resolves a `prefix:name` segment to a bare name plus namespace,
    /// preferring the local schema scope over the root scope. An unresolvable
    /// prefix leaves the `:` as a literal character.
    fn resolve_segment(
        &self,
        scope: SchemaNode<'_>,
        cur_ns: Option<NsId>,
        segment: &str,
        flags: Flags,
    ) -> (String, Option<NsId>) {
        let Some((prefix, local)) = segment.split_once(':') else {
            return (segment.to_string(), cur_ns);
        };
        if flags.contains(Flags::NS_MODEL_NAME) {
            if let Some(model) = self
                .models
                .iter()
                .find(|m| names_match(&m.model, prefix))
            {
                if let Some(id) = self.namespaces.find_by_href(&model.ns_href) {
                    return (local.to_string(), Some(id));
                }
            }
        }
        // Local scope: a namespace already used by a child of the current
        // node wins over the merged root's table.
        for child in scope.schema_children() {
            if child.namespace().prefix.as_deref() == Some(prefix) {
                return (local.to_string(), Some(child.ns_id()));
            }
        }
        if let Some(id) = self.namespaces.find_by_prefix(prefix) {
            return (local.to_string(), Some(id));
        }
        (segment.to_string(), cur_ns)
    }

    pub fn namespace_by_href(&self, href: &str) -> Option<&Namespace> {
        self.namespaces.find_by_href(href).map(|id| self.namespaces.get(id))
    }

    pub fn namespace_by_prefix(&self, prefix: &str) -> Option<&Namespace> {
        self.namespaces
            .find_by_prefix(prefix)
            .map(|id| self.namespaces.get(id))
    }
}

impl<'a> SchemaNode<'a> {
    /// The literal `*` child of a list, in any namespace.
    pub fn wildcard_child(&self) -> Option<SchemaNode<'a>> {
        self.schema_children().find(|c| c.name() == "*")
    }

    /// First child matching `name`, resolving an optional namespace URI.
    pub fn child_by_name(&self, name: &str, ns_href: Option<&str>) -> Option<SchemaNode<'a>> {
        let ns = match ns_href {
            Some(href) => Some(self.tree.namespaces.find_by_href(href)?),
            None => None,
        };
        self.match_child(name, ns)
    }

    /// Bounded descendant search: the chain of nodes from a direct child of
    /// `self` down to the first descendant matching `name`, direct children
    /// searched before deeper levels.
    pub fn find_descendant_chain(&self, name: &str) -> Option<Vec<SchemaNode<'a>>> {
        descendant_chain(*self, name, None)
    }
}

fn descendant_chain<'a>(
    from: SchemaNode<'a>,
    name: &str,
    ns: Option<NsId>,
) -> Option<Vec<SchemaNode<'a>>> {
    for child in from.schema_children() {
        if names_match(child.name(), name)
            && (ns.is_none() || from.tree.namespaces.matches(ns, child.ns_id()))
        {
            return Some(vec![child]);
        }
    }
    for child in from.schema_children() {
        if let Some(mut chain) = descendant_chain(child, name, ns) {
            chain.insert(0, child);
            return Some(chain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_double_slash() {
        assert_eq!(expand_double_slash("//name"), "/*/name");
        assert_eq!(expand_double_slash("/a//b"), "/a/*/b");
        assert_eq!(expand_double_slash("/a/b"), "/a/b");
    }

    #[test]
    fn test_split_key() {
        assert_eq!(
            split_key("animal=cat", Flags::empty()),
            ("animal", Some("cat".to_string()))
        );
        assert_eq!(
            split_key("animal[name='cat']", Flags::XPATH),
            ("animal", Some("cat".to_string()))
        );
        assert_eq!(split_key("animal", Flags::XPATH), ("animal", None));
    }

    #[test]
    fn test_strip_list_key() {
        assert_eq!(strip_list_key("animal=cat", Flags::empty()), "animal");
        assert_eq!(
            strip_list_key("animal[name='cat']", Flags::XPATH),
            "animal"
        );
        assert_eq!(strip_list_key("animal", Flags::XPATH), "animal");
    }
}
