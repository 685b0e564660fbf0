//! The dependency-injection container every handler and background task is
//! driven through: one façade instance plus the lower-level handles the
//! reconciler needs directly (§9 "Shared mutable state" — one pool, checked
//! out once at startup and shared for the life of the process).

use std::sync::Arc;

use nimbus_block_store::BlockStoreApi;
use nimbus_bus::InMemoryEventBus;
use nimbus_commission::CommissionCoordinatorApi;
use nimbus_quotaholder::QuotaholderApi;
use nimbus_storage::StorageFacade;

use crate::config::NodeConfig;

#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<StorageFacade>,
    /// The same block store handle the façade holds internally, exposed
    /// here too because the HTTP layer needs to read/write raw block bytes
    /// directly (§6 "PUT ... body may be a hashmap ... or raw data").
    pub blocks: Arc<dyn BlockStoreApi + Send + Sync>,
    pub commissions: Arc<dyn CommissionCoordinatorApi + Send + Sync>,
    pub quotaholder: Arc<dyn QuotaholderApi + Send + Sync>,
    pub events: Arc<InMemoryEventBus>,
    pub config: NodeConfig,
}
