use nimbus_types::{hex_encode, CoreError, CoreResult, Hash, SharedStore};
use tracing::debug;

use crate::config::BlockStoreConfig;
use crate::hashmap::Hashmap;
use crate::ports::BlockStoreApi;

fn sha256(data: &[u8]) -> Hash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn block_key(hash: &Hash) -> Vec<u8> {
    format!("block:{}", hex_encode(hash)).into_bytes()
}

fn map_key(hash: &Hash) -> Vec<u8> {
    format!("map:{}", hex_encode(hash)).into_bytes()
}

/// `KeyValueStore`-backed implementation of the block store and hashmap
/// ports. A single keyspace serves both, partitioned by key prefix.
pub struct BlockStoreService {
    store: SharedStore,
    config: BlockStoreConfig,
}

impl BlockStoreService {
    pub fn new(store: SharedStore, config: BlockStoreConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BlockStoreConfig {
        &self.config
    }
}

impl BlockStoreApi for BlockStoreService {
    fn put_block(&self, data: &[u8]) -> CoreResult<Hash> {
        if data.len() > self.config.block_size {
            return Err(CoreError::BadRequest(format!(
                "block of {} bytes exceeds configured block size {}",
                data.len(),
                self.config.block_size
            )));
        }
        let hash = sha256(data);
        let key = block_key(&hash);
        if self.store.exists(&key).map_err(CoreError::from)? {
            debug!(hash = %hex_encode(&hash), "block already present, skipping write");
            return Ok(hash);
        }
        self.store.put(&key, data).map_err(CoreError::from)?;
        Ok(hash)
    }

    fn get_block(&self, hash: &Hash) -> CoreResult<Vec<u8>> {
        self.store
            .get(&block_key(hash))
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound(format!("block {}", hex_encode(hash))))
    }

    fn update_block(&self, hash: &Hash, offset: usize, data: &[u8]) -> CoreResult<Hash> {
        let existing = self.get_block(hash)?;
        let new_len = existing.len().max(offset + data.len());
        if new_len > self.config.block_size {
            return Err(CoreError::BadRequest(format!(
                "update at offset {} would grow block to {} bytes, exceeding block size {}",
                offset, new_len, self.config.block_size
            )));
        }
        let mut buf = existing;
        buf.resize(new_len, 0);
        buf[offset..offset + data.len()].copy_from_slice(data);
        self.put_block(&buf)
    }

    fn block_search(&self, hashmap: &Hashmap) -> CoreResult<Vec<Hash>> {
        let mut missing = Vec::new();
        for hash in hashmap.blocks() {
            if !self.store.exists(&block_key(hash)).map_err(CoreError::from)? {
                missing.push(*hash);
            }
        }
        Ok(missing)
    }

    fn map_put(&self, root_hash: &Hash, hashmap: &Hashmap) -> CoreResult<()> {
        let computed = hashmap.root_hash();
        if computed != *root_hash {
            return Err(CoreError::Conflict(format!(
                "hashmap root {} does not match computed root {}",
                hex_encode(root_hash),
                hex_encode(&computed)
            )));
        }
        let bytes = serde_json::to_vec(hashmap)
            .map_err(|e| CoreError::InternalError(format!("hashmap serialization: {e}")))?;
        self.store
            .put(&map_key(root_hash), &bytes)
            .map_err(CoreError::from)
    }

    fn map_get(&self, root_hash: &Hash) -> CoreResult<Hashmap> {
        let bytes = self
            .store
            .get(&map_key(root_hash))
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound(format!("hashmap {}", hex_encode(root_hash))))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::InternalError(format!("hashmap deserialization: {e}")))
    }
}
