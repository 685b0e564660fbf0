use nimbus_types::{CoreResult, Hash, NodeId, Principal, Serial, Timestamp};

use crate::entities::{Attributes, Cluster, Node, Statistics, Version};
use crate::listing::{ListingParams, ListingResult};

pub trait NodeTreeApi {
    fn node_lookup(&self, path: &str) -> CoreResult<Option<Node>>;

    /// Same lookup, but holds the path's stripe lock until the returned
    /// guard is dropped — the caller's "rest of the transaction".
    fn node_lookup_for_update(&self, path: &str) -> CoreResult<(Option<Node>, crate::NodeLockGuard<'_>)>;

    fn node_create(&self, parent: Option<NodeId>, path: &str) -> CoreResult<Node>;

    /// Fails if `node` still has descendants or live (non-DELETED) versions.
    fn node_remove(&self, node: NodeId) -> CoreResult<()>;

    /// `net_superseded`: when the previous `NORMAL` version is reclustered
    /// to `HISTORY` (or to `DELETED`) by this call, whether its bytes are
    /// immediately netted out of the propagated statistics delta. `true`
    /// refunds them now (`versioning=none`, or a deployment-wide
    /// `free_versioning`); `false` leaves them counted — the superseded
    /// version's bytes stay billed until a later purge removes it (§4.7,
    /// §6 "free_versioning", §9 "two modes"). Has no effect when there is
    /// no previous `NORMAL` version to supersede.
    #[allow(clippy::too_many_arguments)]
    fn version_create(
        &self,
        node: NodeId,
        hash: Option<Hash>,
        size: u64,
        content_type: &str,
        source_version: Option<Serial>,
        modified_by: &Principal,
        uuid: Option<String>,
        checksum: &str,
        cluster: Cluster,
        at: Timestamp,
        available: bool,
        net_superseded: bool,
    ) -> CoreResult<(Serial, Timestamp)>;

    /// Flip a version's `available` flag, e.g. once out-of-band block data
    /// for a `register_object_map` version is confirmed present (§4.7
    /// "Availability"). Does not recluster or touch statistics.
    fn version_set_available(&self, node: NodeId, serial: Serial, available: bool, checked_at: Timestamp) -> CoreResult<()>;

    fn version_lookup(
        &self,
        node: NodeId,
        before_time: Timestamp,
        cluster: Cluster,
    ) -> CoreResult<Option<Version>>;

    fn version_get_properties(&self, serial: Serial, node: Option<NodeId>) -> CoreResult<Version>;

    /// Physically removes one version; returns the size freed. When
    /// `refund_stats` is true, also subtracts that size from the node's
    /// ancestors' aggregate statistics — for a version whose bytes were
    /// left counted by `version_create`'s `net_superseded=false` and are
    /// only now being purged (§4.7, §6 "free_versioning"). Pass `false`
    /// when the version being removed was already netted out at creation
    /// time (nothing left to subtract).
    fn version_remove(&self, serial: Serial, refund_stats: bool) -> CoreResult<u64>;

    fn latest_version_list(&self, parent: NodeId, params: &ListingParams) -> CoreResult<ListingResult>;

    fn statistics_get(&self, node: NodeId) -> CoreResult<Statistics>;

    fn statistics_latest(
        &self,
        node: NodeId,
        until: Option<Timestamp>,
        except_cluster: Option<Cluster>,
    ) -> CoreResult<Statistics>;

    fn attribute_get(&self, node: NodeId, serial: Serial, domain: &str, key: &str) -> CoreResult<Option<String>>;
    fn attribute_set(&self, node: NodeId, serial: Serial, domain: &str, key: &str, value: &str) -> CoreResult<()>;
    fn attribute_del(&self, node: NodeId, serial: Serial, domain: &str, key: &str) -> CoreResult<bool>;
    fn attribute_copy(&self, node: NodeId, src_version: Serial, dst_version: Serial) -> CoreResult<()>;
    fn attributes_for(&self, node: NodeId, serial: Serial) -> CoreResult<Attributes>;
}
