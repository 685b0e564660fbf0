//! The periodic sweeper invoked as a long-lived task rather than the
//! separate process §5 describes ("the reconciler and block sweeper run as
//! separate processes invoking the same operations") — this workspace
//! models that as a `tokio` task driving the same `CommissionCoordinatorApi`
//! a request handler would (§4.8 "Reconciliation").

use std::time::Duration;

use tracing::{info, warn};

use crate::container::AppState;

const CLIENT_ID: &str = "nimbus-storage";

/// Runs until the process exits; never returns earlier. Call with
/// `tokio::spawn`.
pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(
        state.config.reconciler_interval_secs.max(1),
    ));
    loop {
        interval.tick().await;
        let at = unix_now();
        match state.commissions.reconcile(CLIENT_ID, at) {
            Ok(report) => {
                if !report.accepted.is_empty() || !report.rejected.is_empty() || !report.errors.is_empty() {
                    info!(
                        accepted = report.accepted.len(),
                        rejected = report.rejected.len(),
                        errors = report.errors.len(),
                        "commission reconciliation swept divergent serials"
                    );
                }
                for (serial, error) in &report.errors {
                    warn!(serial, %error, "reconciliation failed to settle a serial; will retry next sweep");
                }
            }
            Err(err) => warn!(error = %err, "commission reconciliation sweep failed"),
        }
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
