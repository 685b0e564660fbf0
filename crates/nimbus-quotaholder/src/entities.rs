//! Holdings, commissions, provisions, and the immutable provision log
//! (§3 "Holding"/"Commission"/"ProvisionLog", §4.6).

use nimbus_types::{ResourceKey, Serial, Timestamp};
use serde::{Deserialize, Serialize};

/// `(limit, usage_min, usage_max)` for one `(holder, source, resource)`
/// key. `limit = None` means unlimited.
///
/// Invariant (§8): `0 <= usage_min <= usage_max` and, unless an issued
/// commission used `force = true`, `limit.is_none() || usage_max <= limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub limit: Option<u64>,
    pub usage_min: u64,
    pub usage_max: u64,
}

impl Holding {
    pub fn unbounded() -> Self {
        Self { limit: None, usage_min: 0, usage_max: 0 }
    }
}

/// One `(holder, source, resource, delta)` line item inside a commission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provision {
    pub key: ResourceKey,
    pub delta: i64,
}

/// Outcome of resolving one commission: accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Accepted,
    Rejected,
}

/// A proposed atomic change to one or more holdings, pending until
/// resolved exactly once (§3 "Commission").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub serial: Serial,
    pub client: String,
    pub name: String,
    pub issue_time: Timestamp,
    pub provisions: Vec<Provision>,
    pub force: bool,
    pub resolution: Option<Resolution>,
}

impl Commission {
    pub fn is_pending(&self) -> bool {
        self.resolution.is_none()
    }
}

/// Human-facing view returned by `get_commission`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionDescription {
    pub serial: Serial,
    pub name: String,
    pub issue_time: Timestamp,
    pub provisions: Vec<Provision>,
    pub resolution: Option<Resolution>,
}

impl From<Commission> for CommissionDescription {
    fn from(c: Commission) -> Self {
        Self {
            serial: c.serial,
            name: c.name,
            issue_time: c.issue_time,
            provisions: c.provisions,
            resolution: c.resolution,
        }
    }
}

/// Immutable record of one resolved provision, with before/after snapshots
/// for audit (§3 "ProvisionLog").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionLogEntry {
    pub commission_serial: Serial,
    pub key: ResourceKey,
    pub delta: i64,
    pub resolution: Resolution,
    pub before: Holding,
    pub after: Holding,
    pub reason: String,
    pub at: Timestamp,
}

/// Result of `resolve_pending_commissions` (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub accepted: Vec<Serial>,
    pub rejected: Vec<Serial>,
    pub not_found: Vec<Serial>,
    pub conflicting: Vec<Serial>,
}
