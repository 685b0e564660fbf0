use nimbus_types::Serial;
use serde::{Deserialize, Serialize};

/// Local bookkeeping row tracking one in-flight or recently-resolved
/// commission against a specific resource (§4.8 "CommissionSerial table").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSerialRecord {
    pub serial: Serial,
    pub client: String,
    /// The local identifier of the resource this commission concerns (an
    /// object or container path, typically).
    pub resource: String,
    /// Whether the remote resolve call for this serial still needs to run.
    pub pending: bool,
    /// The intended resolution: `true` to accept, `false` to reject.
    pub accept: bool,
    /// Whether the remote resolve call has been confirmed to succeed.
    pub resolved: bool,
}

/// Summary of one reconciliation sweep (§4.8 "Reconciliation").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub accepted: Vec<Serial>,
    pub rejected: Vec<Serial>,
    pub errors: Vec<(Serial, String)>,
}
