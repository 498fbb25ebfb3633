//! Namespace handling: the instance namespace table, the match rules, and
//! `.map` file loading.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// The namespace every merged schema tree is rooted in. Schema files with no
/// default namespace declaration belong to it.
pub const NATIVE_NAMESPACE: &str = "https://canopy.dev/schema";

pub type NsId = usize;

/// One namespace as seen on the merged root: its URI, the display prefix, and
/// whether it counts as native. A namespace is native iff it is the root
/// namespace or it appears in the loaded namespace map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub href: String,
    pub prefix: Option<String>,
    pub native: bool,
}

/// The interned namespaces of one schema instance. Index 0 is the native
/// (root) namespace. The first-encountered prefix for a URI wins, except that
/// a `.map` entry for the URI overrides any declared prefix.
#[derive(Debug)]
pub(crate) struct NamespaceTable {
    entries: Vec<Namespace>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        NamespaceTable {
            entries: vec![Namespace {
                href: NATIVE_NAMESPACE.to_string(),
                prefix: None,
                native: true,
            }],
        }
    }

    pub fn native(&self) -> NsId {
        0
    }

    pub fn get(&self, id: NsId) -> &Namespace {
        &self.entries[id]
    }

    pub fn find_by_href(&self, href: &str) -> Option<NsId> {
        self.entries.iter().position(|n| n.href == href)
    }

    pub fn find_by_prefix(&self, prefix: &str) -> Option<NsId> {
        self.entries
            .iter()
            .position(|n| n.prefix.as_deref() == Some(prefix))
    }

    /// Interns a URI, keeping the first-encountered prefix. The map decides
    /// nativeness and may override the display prefix.
    pub fn intern(&mut self, href: &str, prefix: Option<&str>, map: &NamespaceMap) -> NsId {
        if href == NATIVE_NAMESPACE {
            return 0;
        }
        if let Some(id) = self.find_by_href(href) {
            if self.entries[id].prefix.is_none() {
                self.entries[id].prefix = prefix.map(str::to_string);
            }
            return id;
        }
        let mapped = map.prefix_for(href);
        self.entries.push(Namespace {
            href: href.to_string(),
            prefix: mapped
                .map(str::to_string)
                .or_else(|| prefix.map(str::to_string)),
            native: mapped.is_some(),
        });
        self.entries.len() - 1
    }

    /// The §3.2 match rule: both native, or equal URIs, or an absent query
    /// namespace against the root namespace.
    pub fn matches(&self, queried: Option<NsId>, node: NsId) -> bool {
        match queried {
            None => self.entries[node].native || node == 0,
            Some(q) => {
                if q == node {
                    return true;
                }
                let qn = &self.entries[q];
                let nn = &self.entries[node];
                (qn.native && nn.native) || qn.href == nn.href
            }
        }
    }
}

/// The namespace map: URI to display prefix, loaded from `.map` files.
#[derive(Debug, Default, Clone)]
pub struct NamespaceMap {
    by_href: HashMap<String, String>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix_for(&self, href: &str) -> Option<&str> {
        self.by_href.get(href).map(String::as_str)
    }

    pub fn href_for(&self, prefix: &str) -> Option<&str> {
        self.by_href
            .iter()
            .find(|(_, p)| p.as_str() == prefix)
            .map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_href.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_href.is_empty()
    }

    /// Merges one `.map` file into this map. Lines are `URI SP prefix`;
    /// `#` starts a comment; later entries override earlier ones.
    pub fn load_file(&mut self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::open(path)?;
        for line in std::io::BufReader::new(file).lines() {
            self.load_line(&line?);
        }
        Ok(())
    }

    pub(crate) fn load_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let mut parts = line.split_whitespace();
        if let (Some(href), Some(prefix)) = (parts.next(), parts.next()) {
            self.by_href.insert(href.to_string(), prefix.to_string());
        } else {
            log::warn!("ignoring malformed namespace map line '{}'", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_lines() {
        let mut map = NamespaceMap::new();
        map.load_line("# comment");
        map.load_line("");
        map.load_line("http://example.com/ns/yang/example example");
        map.load_line("http://example.com/ns/yang/other other");
        assert_eq!(
            map.prefix_for("http://example.com/ns/yang/example"),
            Some("example")
        );
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_map_later_entries_override() {
        let mut map = NamespaceMap::new();
        map.load_line("http://example.com/ns one");
        map.load_line("http://example.com/ns two");
        assert_eq!(map.prefix_for("http://example.com/ns"), Some("two"));
    }

    #[test]
    fn test_interning_keeps_first_prefix() {
        let map = NamespaceMap::new();
        let mut table = NamespaceTable::new();
        let a = table.intern("http://example.com/a", Some("first"), &map);
        let b = table.intern("http://example.com/a", Some("second"), &map);
        assert_eq!(a, b);
        assert_eq!(table.get(a).prefix.as_deref(), Some("first"));
    }

    #[test]
    fn test_mapped_namespace_is_native() {
        let mut map = NamespaceMap::new();
        map.load_line("http://example.com/a exa");
        let mut table = NamespaceTable::new();
        let a = table.intern("http://example.com/a", Some("ignored"), &map);
        assert!(table.get(a).native);
        assert_eq!(table.get(a).prefix.as_deref(), Some("exa"));
        assert!(table.matches(None, a));
    }

    #[test]
    fn test_match_rules() {
        let map = NamespaceMap::new();
        let mut table = NamespaceTable::new();
        let foreign = table.intern("http://example.com/foreign", Some("f"), &map);
        // Unmapped, non-root namespaces are non-native.
        assert!(!table.get(foreign).native);
        assert!(!table.matches(None, foreign));
        assert!(table.matches(Some(foreign), foreign));
        // An absent query namespace matches the root.
        assert!(table.matches(None, table.native()));
    }
}
