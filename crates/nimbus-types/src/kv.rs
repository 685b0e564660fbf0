//! # The `KeyValueStore` Port
//!
//! Every stateful component (node tree, permission index, policy store,
//! quotaholder, commission coordinator) is built against this single
//! abstraction rather than against a concrete database. Two adapters ship
//! here: `InMemoryKVStore` for tests and light deployments, and — behind the
//! `rocksdb` feature — a production `RocksDbStore`.
//!
//! This mirrors the shape the block store's own `KeyValueStore` port takes
//! (the teaching example this codebase grew from used the identical
//! get/put/delete/atomic-batch/prefix-scan signature); keeping one copy here
//! means every subsystem gets the same transaction-batching semantics for
//! free instead of redefining the port five times.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum KVStoreError {
    #[error("key-value store I/O error: {0}")]
    Io(String),
    #[error("key-value store corruption: {0}")]
    Corruption(String),
}

impl From<KVStoreError> for crate::CoreError {
    fn from(err: KVStoreError) -> Self {
        crate::CoreError::InternalError(err.to_string())
    }
}

/// One step of an atomic batch write.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Abstract interface for key-value persistence.
///
/// `atomic_batch_write` is this codebase's stand-in for a "DB transaction"
/// (§5): every façade operation that mutates more than one logical row
/// collects its writes into a single batch and applies them atomically,
/// rather than assuming a SQL `BEGIN`/`COMMIT` is available underneath.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;
    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError>;
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.get(key)?.is_some())
    }
    /// Keys in the store starting with `prefix`, in ascending byte order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;
}

/// A `BTreeMap`-backed in-memory store. Default for tests and single-node
/// trial deployments; gives deterministic (lexicographically sorted)
/// `prefix_scan` results, which the node tree's listing operation relies on.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: parking_lot::RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut data = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Ok(self
            .data
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(feature = "rocksdb")]
mod rocksdb_adapter {
    use super::{BatchOperation, KVStoreError, KeyValueStore};
    use rocksdb::{IteratorMode, Options, WriteBatch, DB};

    /// Production key-value store backed by RocksDB.
    pub struct RocksDbStore {
        db: DB,
    }

    impl RocksDbStore {
        pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, KVStoreError> {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            let db = DB::open(&opts, path).map_err(|e| KVStoreError::Io(e.to_string()))?;
            Ok(Self { db })
        }
    }

    impl KeyValueStore for RocksDbStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
            self.db
                .get(key)
                .map_err(|e| KVStoreError::Io(e.to_string()))
        }

        fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
            self.db
                .put(key, value)
                .map_err(|e| KVStoreError::Io(e.to_string()))
        }

        fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
            self.db
                .delete(key)
                .map_err(|e| KVStoreError::Io(e.to_string()))
        }

        fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
            let mut batch = WriteBatch::default();
            for op in operations {
                match op {
                    BatchOperation::Put { key, value } => batch.put(key, value),
                    BatchOperation::Delete { key } => batch.delete(key),
                }
            }
            self.db
                .write(batch)
                .map_err(|e| KVStoreError::Io(e.to_string()))
        }

        fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
            let mut out = Vec::new();
            let iter = self.db.iterator(IteratorMode::From(
                prefix,
                rocksdb::Direction::Forward,
            ));
            for item in iter {
                let (k, v) = item.map_err(|e| KVStoreError::Io(e.to_string()))?;
                if !k.starts_with(prefix) {
                    break;
                }
                out.push((k.to_vec(), v.to_vec()));
            }
            Ok(out)
        }
    }
}

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::RocksDbStore;

/// Shared handle type every subsystem service stores: a trait object behind
/// an `Arc`, so the same backing store can be handed to multiple crates
/// without them needing to agree on a concrete type.
pub type SharedStore = Arc<dyn KeyValueStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete_roundtrip() {
        let store = InMemoryKVStore::new();
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn prefix_scan_is_sorted() {
        let store = InMemoryKVStore::new();
        store.put(b"node:3", b"c").unwrap();
        store.put(b"node:1", b"a").unwrap();
        store.put(b"node:2", b"b").unwrap();
        store.put(b"other:1", b"x").unwrap();

        let results = store.prefix_scan(b"node:").unwrap();
        let keys: Vec<_> = results.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"node:1".to_vec(), b"node:2".to_vec(), b"node:3".to_vec()]);
    }

    #[test]
    fn atomic_batch_write_applies_all() {
        let store = InMemoryKVStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
                BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
                BatchOperation::delete(b"a".to_vec()),
            ])
            .unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }
}
