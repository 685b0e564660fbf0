//! Test-only support code shared by the scenario suites under `tests/`.
//! Not part of any public API; exists purely so the integration tests don't
//! each repeat the same wiring boilerplate.

use std::sync::Arc;

use nimbus_block_store::BlockStoreApi;
use node_runtime::config::NodeConfig;
use node_runtime::container::AppState;
use node_runtime::wiring;

/// A `NodeConfig` tuned for fast, hermetic tests: in-memory store, no
/// RocksDB, a small block size so multi-block hashmaps are easy to
/// construct without uploading megabytes of fixture data.
pub fn test_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.block_size = 64;
    config.use_rocksdb = false;
    config
}

pub fn build_state() -> AppState {
    wiring::build_app_state(test_config()).expect("in-memory app state always wires cleanly")
}

pub fn build_state_with(customize: impl FnOnce(&mut NodeConfig)) -> AppState {
    let mut config = test_config();
    customize(&mut config);
    wiring::build_app_state(config).expect("in-memory app state always wires cleanly")
}

pub fn router(state: AppState) -> axum::Router {
    node_runtime::handlers::build_router(state)
}

/// Builds an object's full upload cycle against the façade: stores each
/// chunk as its own block, then returns the hashmap covering `data`.
pub fn store_as_blocks(
    blocks: &Arc<dyn nimbus_block_store::BlockStoreApi + Send + Sync>,
    data: &[u8],
    block_size: usize,
) -> nimbus_block_store::Hashmap {
    let mut hashmap = nimbus_block_store::Hashmap::new();
    if data.is_empty() {
        let hash = blocks.put_block(&[]).unwrap();
        hashmap.push(hash);
        return hashmap;
    }
    for chunk in data.chunks(block_size.max(1)) {
        let hash = blocks.put_block(chunk).unwrap();
        hashmap.push(hash);
    }
    hashmap
}
