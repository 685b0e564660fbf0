//! Abstract change events the storage façade emits on commit.

use nimbus_types::{Hash, NodeId, Principal, Serial, Timestamp};
use serde::{Deserialize, Serialize};

/// All events the façade can place in a transaction's outbox.
///
/// These are deliberately abstract (no HTTP/wire framing): downstream
/// collaborators this core treats as external (message-queue shipping,
/// image-registry veneers, dashboards) subscribe to this enum and translate
/// it into whatever their own transport needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageEvent {
    ContainerCreated {
        account: Principal,
        container: String,
        at: Timestamp,
    },
    ContainerDeleted {
        account: Principal,
        container: String,
        at: Timestamp,
    },
    ObjectCreated {
        account: Principal,
        path: String,
        node: NodeId,
        version: Serial,
        size: u64,
        root_hash: Hash,
        at: Timestamp,
    },
    ObjectModified {
        account: Principal,
        path: String,
        node: NodeId,
        version: Serial,
        size: u64,
        root_hash: Hash,
        at: Timestamp,
    },
    ObjectDeleted {
        account: Principal,
        path: String,
        node: NodeId,
        at: Timestamp,
    },
    SharingChanged {
        account: Principal,
        path: String,
        at: Timestamp,
    },
    AccountUpdated {
        account: Principal,
        at: Timestamp,
    },
}

impl StorageEvent {
    /// The account this event concerns, for routing/filtering by subscribers.
    pub fn account(&self) -> &Principal {
        match self {
            StorageEvent::ContainerCreated { account, .. }
            | StorageEvent::ContainerDeleted { account, .. }
            | StorageEvent::ObjectCreated { account, .. }
            | StorageEvent::ObjectModified { account, .. }
            | StorageEvent::ObjectDeleted { account, .. }
            | StorageEvent::SharingChanged { account, .. }
            | StorageEvent::AccountUpdated { account, .. } => account,
        }
    }
}
