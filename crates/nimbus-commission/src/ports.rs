use nimbus_types::{CoreResult, Serial, Timestamp};
use nimbus_quotaholder::Provision;

use crate::entities::{CommissionSerialRecord, ReconcileReport};

pub trait CommissionCoordinatorApi {
    /// Issue a commission for `resource` and durably record its serial
    /// before returning, so the caller's own commit (whatever form that
    /// takes) happens with the serial already safe (§4.8 steps 1-3).
    ///
    /// If `resource` still references a stale pending commission (a prior
    /// attempt that never reached accept/reject), that commission is
    /// force-rejected first so repeated attempts on the same resource never
    /// double-count (§4.8 step 1).
    #[allow(clippy::too_many_arguments)]
    fn issue(
        &self,
        resource: &str,
        client: &str,
        provisions: Vec<Provision>,
        name: &str,
        force: bool,
        at: Timestamp,
    ) -> CoreResult<Serial>;

    /// Accept a previously issued commission (§4.8 step 4). Leaves the local
    /// record pending on remote failure — the reconciler retries later.
    fn accept(&self, serial: Serial, at: Timestamp) -> CoreResult<()>;

    /// Reject a previously issued commission (§4.8 step 5).
    fn reject(&self, serial: Serial, reason: &str, at: Timestamp) -> CoreResult<()>;

    fn record_for_resource(&self, resource: &str) -> CoreResult<Option<CommissionSerialRecord>>;

    /// Compare local bookkeeping against the Quotaholder's view of pending
    /// serials for `client` and resolve any divergence (§4.8
    /// "Reconciliation").
    fn reconcile(&self, client: &str, at: Timestamp) -> CoreResult<ReconcileReport>;
}
