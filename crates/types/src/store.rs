//! The narrow interface to the external key/value store.
//!
//! The library never touches files or sockets on the store's behalf; an
//! embedding environment provides an implementation of [`Store`] and the
//! bridge in the `canopy` facade crate moves data between it and data trees.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A hierarchical key/value store addressed by `/`-separated paths.
pub trait Store {
    /// The value at an exact path, if populated.
    fn get(&self, path: &str) -> Option<String>;

    /// Sets the value at a path, or clears it when `value` is `None`.
    fn set(&mut self, path: &str, value: Option<&str>) -> Result<(), StoreError>;

    /// All populated paths at or below `prefix`, in lexical order.
    fn search(&self, prefix: &str) -> Vec<String>;
}

/// An in-memory [`Store`] for tests and embedders without a real backend.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entries: BTreeMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Store for InMemoryStore {
    fn get(&self, path: &str) -> Option<String> {
        self.entries.get(path).cloned()
    }

    fn set(&mut self, path: &str, value: Option<&str>) -> Result<(), StoreError> {
        match value {
            Some(v) => {
                self.entries.insert(path.to_string(), v.to_string());
            }
            None => {
                self.entries.remove(path);
            }
        }
        Ok(())
    }

    fn search(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let mut store = InMemoryStore::new();
        store.set("/test/settings/priority", Some("1")).unwrap();
        assert_eq!(store.get("/test/settings/priority").as_deref(), Some("1"));
        store.set("/test/settings/priority", None).unwrap();
        assert_eq!(store.get("/test/settings/priority"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_search_is_prefix_bounded() {
        let mut store = InMemoryStore::new();
        store.set("/test/a/x", Some("1")).unwrap();
        store.set("/test/a/y", Some("2")).unwrap();
        store.set("/test/b/z", Some("3")).unwrap();
        let hits = store.search("/test/a/");
        assert_eq!(hits, vec!["/test/a/x".to_string(), "/test/a/y".to_string()]);
    }
}
