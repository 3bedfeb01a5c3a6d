//! # SledStore
//!
//! On-disk [`Store`] built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! Each collection is its own sled tree, opened lazily on first use:
//!
//! | Usage        | Key                        | Value         |
//! |--------------|----------------------------|---------------|
//! | keyed map    | key (UTF-8)                | raw bytes     |
//! | append log   | sled-generated id (8B BE)  | raw bytes     |
//!
//! Log ids come from `Db::generate_id`, which is monotonic, and are stored
//! big-endian so sled's lexicographic order is insertion order.

use sled::{CompareAndSwapError, Db};
use std::path::Path;

use super::{Store, StoreError, StoreResult};

/// Persistent store backed by a sled database.
///
/// sled trees are thread-safe, so a `SledStore` can be shared through
/// `Arc<SledStore>` without extra locking.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// A database removed when dropped. Useful in tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Store for SledStore {
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let tree = self.db.open_tree(collection)?;
        Ok(tree.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn set(&self, collection: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let tree = self.db.open_tree(collection)?;
        tree.insert(key.as_bytes(), value)?;
        tree.flush()?;
        Ok(())
    }

    fn append(&self, collection: &str, value: &[u8]) -> StoreResult<u64> {
        let tree = self.db.open_tree(collection)?;
        let id = self.db.generate_id()?;
        tree.insert(id.to_be_bytes(), value)?;
        tree.flush()?;
        Ok(id)
    }

    fn list(&self, collection: &str) -> StoreResult<Vec<Vec<u8>>> {
        let tree = self.db.open_tree(collection)?;
        tree.iter()
            .values()
            .map(|v| v.map(|v| v.to_vec()).map_err(StoreError::from))
            .collect()
    }

    fn set_if_absent(
        &self,
        collection: &str,
        key: &str,
        value: &[u8],
    ) -> StoreResult<Option<Vec<u8>>> {
        let tree = self.db.open_tree(collection)?;
        match tree.compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(value))? {
            Ok(()) => {
                tree.flush()?;
                Ok(None)
            }
            Err(CompareAndSwapError { current, .. }) => Ok(current.map(|v| v.to_vec())),
        }
    }
}
