use std::collections::BTreeMap;

use nimbus_types::{CoreResult, ResourceKey, Serial, Timestamp};

use crate::entities::{Commission, CommissionDescription, Holding, Provision, ResolveOutcome};

pub trait QuotaholderApi {
    /// Holdings matching the given filters (all `None` returns everything).
    fn get_quota(
        &self,
        holders: Option<&[String]>,
        sources: Option<&[String]>,
        resources: Option<&[String]>,
    ) -> CoreResult<BTreeMap<ResourceKey, Holding>>;

    /// Replace the `limit` of each listed key atomically, preserving its
    /// `usage_min`/`usage_max`. Creates the holding (usage 0/0) if absent.
    fn set_quota(&self, updates: Vec<(ResourceKey, Option<u64>)>) -> CoreResult<()>;

    /// Issue a commission: merge same-key provisions, check and prepare
    /// every holding, and either commit all of them or none (§4.6).
    fn issue_commission(
        &self,
        client: &str,
        provisions: Vec<Provision>,
        name: &str,
        force: bool,
        at: Timestamp,
    ) -> CoreResult<Serial>;

    /// Resolve a batch of pending commissions. Serials in both sets are
    /// `conflicting` and left untouched. Unknown/foreign/already-resolved
    /// serials land in `not_found` without failing the batch.
    fn resolve_pending_commissions(
        &self,
        client: &str,
        accept: &[Serial],
        reject: &[Serial],
        reason: &str,
        at: Timestamp,
    ) -> CoreResult<ResolveOutcome>;

    fn get_pending_commissions(&self, client: &str) -> CoreResult<Vec<Serial>>;

    fn get_commission(&self, client: &str, serial: Serial) -> CoreResult<CommissionDescription>;
}

/// Internal accessor the reconciler and test harnesses use to inspect a
/// commission's raw state (including its `client`, not exposed by
/// `get_commission`'s cross-client-safe view).
pub trait QuotaholderInternals {
    fn load_commission(&self, serial: Serial) -> CoreResult<Option<Commission>>;
}
