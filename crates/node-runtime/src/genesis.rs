//! One-time bootstrap performed before a node starts serving requests.
//!
//! The core has no notion of a genesis block — accounts and containers
//! materialize lazily on first reference (§3 "Lifecycles") — so there is
//! deliberately little to do here. What remains is ops bookkeeping: make
//! sure the on-disk layout exists before the store tries to open it, and
//! log the resolved configuration once so an operator can tell what a
//! running node actually believes its knobs are.

use tracing::info;

use crate::config::NodeConfig;

pub fn prepare(config: &NodeConfig) -> std::io::Result<()> {
    if config.use_rocksdb {
        std::fs::create_dir_all(&config.data_dir)?;
    }
    info!(
        bind_addr = %config.bind_addr,
        use_rocksdb = config.use_rocksdb,
        block_size = config.block_size,
        default_account_quota = config.default_account_quota,
        default_container_quota = config.default_container_quota,
        default_container_versioning = %config.default_container_versioning,
        free_versioning = config.free_versioning,
        listing_limit = config.listing_limit,
        reconciler_interval_secs = config.reconciler_interval_secs,
        "node configuration resolved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_succeeds_without_rocksdb() {
        let config = NodeConfig::default();
        prepare(&config).unwrap();
    }
}
