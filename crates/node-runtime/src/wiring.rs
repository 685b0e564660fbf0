//! Assembles the façade's collaborators behind a single backing
//! `KeyValueStore` (§9 "Shared mutable state"): one node tree, block store,
//! permission index, policy store, quotaholder, and commission coordinator,
//! all sharing the store handle this process checked out at startup.

use std::sync::Arc;

use nimbus_block_store::BlockStoreService;
use nimbus_bus::InMemoryEventBus;
use nimbus_commission::CommissionCoordinator;
use nimbus_node_tree::NodeTreeService;
use nimbus_permissions::PermissionIndexService;
use nimbus_policy::PolicyStoreService;
use nimbus_quotaholder::QuotaholderService;
use nimbus_storage::{StorageFacade, TreeNodeKindResolver};
use nimbus_types::SharedStore;

use crate::config::{ConfigError, NodeConfig};
use crate::container::AppState;

fn open_store(config: &NodeConfig) -> Result<SharedStore, ConfigError> {
    if config.use_rocksdb {
        #[cfg(feature = "rocksdb")]
        {
            std::fs::create_dir_all(&config.data_dir).map_err(|source| ConfigError::Read {
                path: config.data_dir.clone(),
                source,
            })?;
            let store = nimbus_types::RocksDbStore::open(&config.data_dir)
                .map_err(|e| ConfigError::Invalid(format!("opening rocksdb store: {e}")))?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "rocksdb"))]
        {
            return Err(ConfigError::Invalid(
                "use_rocksdb is set but this binary was not built with the \"rocksdb\" feature"
                    .to_string(),
            ));
        }
    }
    Ok(Arc::new(nimbus_types::InMemoryKVStore::new()))
}

/// Build the whole collaborator graph from `config`. This is the only place
/// in the binary that knows every subsystem's concrete constructor; every
/// other module drives the result through the trait objects in `AppState`.
pub fn build_app_state(config: NodeConfig) -> Result<AppState, ConfigError> {
    config.validate()?;
    let store = open_store(&config)?;

    let tree: Arc<dyn nimbus_node_tree::NodeTreeApi + Send + Sync> = Arc::new(
        NodeTreeService::new(store.clone(), config.node_tree_config()),
    );
    let blocks: Arc<dyn nimbus_block_store::BlockStoreApi + Send + Sync> =
        Arc::new(BlockStoreService::new(store.clone(), config.block_store_config()));
    let resolver = Arc::new(TreeNodeKindResolver::new(tree.clone()));
    let permissions: Arc<dyn nimbus_permissions::PermissionIndexApi + Send + Sync> =
        Arc::new(PermissionIndexService::new(store.clone(), resolver));
    let policy: Arc<dyn nimbus_policy::PolicyStoreApi + Send + Sync> =
        Arc::new(PolicyStoreService::new(store.clone(), config.policy_defaults()));
    let quotaholder: Arc<dyn nimbus_quotaholder::QuotaholderApi + Send + Sync> =
        Arc::new(QuotaholderService::new(store.clone()));
    let commissions: Arc<dyn nimbus_commission::CommissionCoordinatorApi + Send + Sync> =
        Arc::new(CommissionCoordinator::new(store.clone(), quotaholder.clone()));
    let events = Arc::new(InMemoryEventBus::new());

    let facade = Arc::new(StorageFacade::new(
        tree,
        blocks.clone(),
        permissions,
        policy,
        quotaholder.clone(),
        commissions.clone(),
        events.clone(),
        config.facade_config(),
    ));

    Ok(AppState {
        facade,
        blocks,
        commissions,
        quotaholder,
        events,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_app_state_with_in_memory_store() {
        let state = build_app_state(NodeConfig::default()).unwrap();
        assert_eq!(state.config.bind_addr.port(), 8080);
    }
}
