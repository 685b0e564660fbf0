//! Primary API the rest of the workspace drives the block store through.

use nimbus_types::{CoreResult, Hash};

use crate::hashmap::Hashmap;

pub trait BlockStoreApi {
    /// Store `data`, deduplicating by content hash. Idempotent: storing the
    /// same bytes twice is a no-op the second time.
    fn put_block(&self, data: &[u8]) -> CoreResult<Hash>;

    /// Fetch a previously stored block. `NotFound` if absent.
    fn get_block(&self, hash: &Hash) -> CoreResult<Vec<u8>>;

    /// Produce a new block equal to the one at `hash` with `data` written at
    /// `offset`, and store it under its own content hash. Used for
    /// partial-block tail writes so a short append does not require
    /// re-uploading the whole block.
    fn update_block(&self, hash: &Hash, offset: usize, data: &[u8]) -> CoreResult<Hash>;

    /// Which of `hashmap`'s referenced blocks are not yet present locally.
    fn block_search(&self, hashmap: &Hashmap) -> CoreResult<Vec<Hash>>;

    /// Persist `hashmap` under `root_hash`. `root_hash` must equal
    /// `hashmap.root_hash()` — callers compute it once and pass it through
    /// rather than have every store recompute the fold.
    fn map_put(&self, root_hash: &Hash, hashmap: &Hashmap) -> CoreResult<()>;

    /// Retrieve a previously persisted hashmap. `NotFound` if absent.
    fn map_get(&self, root_hash: &Hash) -> CoreResult<Hashmap>;
}
