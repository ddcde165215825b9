//! Storage collaborator interface and an in-memory implementation.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::triple::StorageTriple;

/// A key/value attribute store holding triples per item.
///
/// Implementations own atomicity: `apply_replace` either removes and adds
/// everything or changes nothing.
pub trait TripleStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All triples attached to `item`, in insertion order.
    fn list_triples(&self, item: &str) -> Result<Vec<StorageTriple>, Self::Error>;

    /// Removes `remove` from `item` and adds `add`, atomically.
    fn apply_replace(
        &mut self,
        item: &str,
        remove: &[StorageTriple],
        add: &[StorageTriple],
    ) -> Result<(), Self::Error>;
}

/// Errors of [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryStoreError {
    /// A triple scheduled for removal is not attached to the item.
    #[error("triple '{triple}' not found on item '{item}'")]
    MissingTriple { item: String, triple: String },
}

/// In-memory [`TripleStore`], keyed by item path.
///
/// # Examples
///
/// ```
/// use mdschema_core::{MemoryStore, StorageTriple, TripleStore};
///
/// let mut store = MemoryStore::new();
/// let t = StorageTriple::new("mgs.book.title", "Dune", None);
/// store.apply_replace("/zone/book.pdf", &[], &[t.clone()]).unwrap();
/// assert_eq!(store.list_triples("/zone/book.pdf").unwrap(), vec![t]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: BTreeMap<String, Vec<StorageTriple>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Item paths holding at least one triple.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|(_, triples)| !triples.is_empty())
            .map(|(item, _)| item.as_str())
    }
}

impl TripleStore for MemoryStore {
    type Error = MemoryStoreError;

    fn list_triples(&self, item: &str) -> Result<Vec<StorageTriple>, Self::Error> {
        Ok(self.items.get(item).cloned().unwrap_or_default())
    }

    fn apply_replace(
        &mut self,
        item: &str,
        remove: &[StorageTriple],
        add: &[StorageTriple],
    ) -> Result<(), Self::Error> {
        let mut triples = self.items.get(item).cloned().unwrap_or_default();
        for triple in remove {
            let pos = triples
                .iter()
                .position(|t| t == triple)
                .ok_or_else(|| MemoryStoreError::MissingTriple {
                    item: item.to_string(),
                    triple: triple.to_string(),
                })?;
            triples.remove(pos);
        }
        triples.extend_from_slice(add);
        self.items.insert(item.to_string(), triples);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(name: &str, value: &str) -> StorageTriple {
        StorageTriple::new(name, value, None)
    }

    #[test]
    fn test_replace_keeps_other_triples() {
        let mut store = MemoryStore::new();
        store
            .apply_replace("a", &[], &[triple("x", "1"), triple("y", "2")])
            .unwrap();
        store
            .apply_replace("a", &[triple("x", "1")], &[triple("x", "3")])
            .unwrap();
        assert_eq!(store.list_triples("a").unwrap(), vec![triple("y", "2"), triple("x", "3")]);
        assert!(store.list_triples("b").unwrap().is_empty());
    }

    #[test]
    fn test_missing_removal_changes_nothing() {
        let mut store = MemoryStore::new();
        store.apply_replace("a", &[], &[triple("x", "1")]).unwrap();
        let err = store
            .apply_replace("a", &[triple("x", "1"), triple("z", "9")], &[triple("w", "0")])
            .unwrap_err();
        assert!(matches!(err, MemoryStoreError::MissingTriple { .. }));
        assert_eq!(store.list_triples("a").unwrap(), vec![triple("x", "1")]);
    }

    #[test]
    fn test_items_lists_non_empty() {
        let mut store = MemoryStore::new();
        store.apply_replace("a", &[], &[triple("x", "1")]).unwrap();
        store.apply_replace("b", &[], &[triple("x", "1")]).unwrap();
        store.apply_replace("b", &[triple("x", "1")], &[]).unwrap();
        assert_eq!(store.items().collect::<Vec<_>>(), ["a"]);
    }
}
