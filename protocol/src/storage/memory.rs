//! In-memory [`Store`]. Nothing survives the process.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{Store, StoreResult};

#[derive(Debug, Default)]
struct Collection {
    keyed: BTreeMap<String, Vec<u8>>,
    log: Vec<Vec<u8>>,
}

/// Store over `BTreeMap`s behind a `parking_lot::RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|c| c.keyed.get(key).cloned()))
    }

    fn set(&self, collection: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .keyed
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn append(&self, collection: &str, value: &[u8]) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let log = &mut collections.entry(collection.to_string()).or_default().log;
        log.push(value.to_vec());
        Ok((log.len() - 1) as u64)
    }

    fn list(&self, collection: &str) -> StoreResult<Vec<Vec<u8>>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|c| c.log.clone())
            .unwrap_or_default())
    }

    fn set_if_absent(
        &self,
        collection: &str,
        key: &str,
        value: &[u8],
    ) -> StoreResult<Option<Vec<u8>>> {
        let mut collections = self.collections.write();
        let keyed = &mut collections.entry(collection.to_string()).or_default().keyed;
        if let Some(existing) = keyed.get(key) {
            return Ok(Some(existing.clone()));
        }
        keyed.insert(key.to_string(), value.to_vec());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collections_read_as_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get("x", "k").unwrap(), None);
        assert!(store.list("x").unwrap().is_empty());
    }

    #[test]
    fn append_returns_positions() {
        let store = MemoryStore::new();
        assert_eq!(store.append("log", b"a").unwrap(), 0);
        assert_eq!(store.append("log", b"b").unwrap(), 1);
        assert_eq!(store.list("log").unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn first_write_wins() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("r", "k", b"1").unwrap().is_none());
        assert_eq!(store.set_if_absent("r", "k", b"2").unwrap(), Some(b"1".to_vec()));
    }
}
