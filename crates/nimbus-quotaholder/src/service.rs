use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use nimbus_types::{CoreError, CoreResult, ResourceKey, SharedStore, Serial, Timestamp};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::entities::{Commission, CommissionDescription, Holding, Provision, ProvisionLogEntry, Resolution, ResolveOutcome};
use crate::ports::{QuotaholderApi, QuotaholderInternals};

fn holding_key(key: &ResourceKey) -> Vec<u8> {
    format!("holding:{}:{}:{}", key.holder, key.source, key.resource).into_bytes()
}

fn holding_prefix() -> Vec<u8> {
    b"holding:".to_vec()
}

fn commission_key(serial: Serial) -> Vec<u8> {
    format!("commission:{serial:020}").into_bytes()
}

fn pending_key(client: &str, serial: Serial) -> Vec<u8> {
    format!("pending:{client}:{serial:020}").into_bytes()
}

fn pending_prefix(client: &str) -> Vec<u8> {
    format!("pending:{client}:").into_bytes()
}

fn provisionlog_key(serial: Serial, index: usize) -> Vec<u8> {
    format!("provisionlog:{serial:020}:{index:06}").into_bytes()
}

/// Merge provisions carrying the same `(holder, source, resource)` key by
/// summing their deltas (§4.6).
fn merge_provisions(provisions: Vec<Provision>) -> Vec<Provision> {
    let mut merged: BTreeMap<ResourceKey, i64> = BTreeMap::new();
    for p in provisions {
        *merged.entry(p.key).or_insert(0) += p.delta;
    }
    merged.into_iter().map(|(key, delta)| Provision { key, delta }).collect()
}

/// Apply a resolution's effect on a holding's usage bounds (§4.6). The
/// asymmetry between accept/reject and import/release is intentional
/// (§9 "Optimistic release ordering") — do not collapse these branches.
fn apply_resolution(holding: &mut Holding, delta: i64, resolution: Resolution) {
    match (delta >= 0, resolution) {
        (true, Resolution::Accepted) => holding.usage_min = (holding.usage_min as i64 + delta) as u64,
        (true, Resolution::Rejected) => holding.usage_max = (holding.usage_max as i64 - delta) as u64,
        (false, Resolution::Accepted) => holding.usage_max = (holding.usage_max as i64 + delta) as u64,
        (false, Resolution::Rejected) => holding.usage_min = (holding.usage_min as i64 - delta) as u64,
    }
}

pub struct QuotaholderService {
    store: SharedStore,
    next_serial: AtomicU64,
    /// Guards the multi-key check-then-write sequence in `issue_commission`
    /// and `resolve_pending_commissions`: the closest thing a KV store gets
    /// to the original's DB transaction (§5).
    txn_lock: Mutex<()>,
}

impl QuotaholderService {
    pub fn new(store: SharedStore) -> Self {
        let next_serial = Self::scan_max_serial(&store) + 1;
        Self {
            store,
            next_serial: AtomicU64::new(next_serial),
            txn_lock: Mutex::new(()),
        }
    }

    fn scan_max_serial(store: &SharedStore) -> u64 {
        store
            .prefix_scan(b"commission:")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, _)| {
                std::str::from_utf8(&k)
                    .ok()?
                    .strip_prefix("commission:")?
                    .parse::<u64>()
                    .ok()
            })
            .max()
            .unwrap_or(0)
    }

    fn load_holding(&self, key: &ResourceKey) -> CoreResult<Option<Holding>> {
        match self.store.get(&holding_key(key)).map_err(CoreError::from)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::InternalError(format!("holding deserialization: {e}")))
                .map(Some),
        }
    }

    fn save_holding(&self, key: &ResourceKey, holding: &Holding) -> CoreResult<()> {
        let bytes = serde_json::to_vec(holding)
            .map_err(|e| CoreError::InternalError(format!("holding serialization: {e}")))?;
        self.store.put(&holding_key(key), &bytes).map_err(CoreError::from)
    }

    fn load_commission_raw(&self, serial: Serial) -> CoreResult<Option<Commission>> {
        match self.store.get(&commission_key(serial)).map_err(CoreError::from)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::InternalError(format!("commission deserialization: {e}")))
                .map(Some),
        }
    }

    fn save_commission(&self, commission: &Commission) -> CoreResult<()> {
        let bytes = serde_json::to_vec(commission)
            .map_err(|e| CoreError::InternalError(format!("commission serialization: {e}")))?;
        self.store.put(&commission_key(commission.serial), &bytes).map_err(CoreError::from)
    }

    fn append_provision_log(&self, entry: &ProvisionLogEntry, index: usize) -> CoreResult<()> {
        let bytes = serde_json::to_vec(entry)
            .map_err(|e| CoreError::InternalError(format!("provision log serialization: {e}")))?;
        self.store
            .put(&provisionlog_key(entry.commission_serial, index), &bytes)
            .map_err(CoreError::from)
    }
}

impl QuotaholderApi for QuotaholderService {
    fn get_quota(
        &self,
        holders: Option<&[String]>,
        sources: Option<&[String]>,
        resources: Option<&[String]>,
    ) -> CoreResult<BTreeMap<ResourceKey, Holding>> {
        let mut out = BTreeMap::new();
        for (key_bytes, value) in self.store.prefix_scan(&holding_prefix()).map_err(CoreError::from)? {
            let key_str = std::str::from_utf8(&key_bytes)
                .map_err(|e| CoreError::InternalError(format!("holding key not utf8: {e}")))?
                .strip_prefix("holding:")
                .unwrap_or_default();
            let mut parts = key_str.splitn(3, ':');
            let (Some(holder), Some(source), Some(resource)) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            if holders.is_some_and(|h| !h.iter().any(|x| x == holder)) {
                continue;
            }
            if sources.is_some_and(|s| !s.iter().any(|x| x == source)) {
                continue;
            }
            if resources.is_some_and(|r| !r.iter().any(|x| x == resource)) {
                continue;
            }
            let holding: Holding = serde_json::from_slice(&value)
                .map_err(|e| CoreError::InternalError(format!("holding deserialization: {e}")))?;
            out.insert(ResourceKey::new(holder, source, resource), holding);
        }
        Ok(out)
    }

    fn set_quota(&self, updates: Vec<(ResourceKey, Option<u64>)>) -> CoreResult<()> {
        let _guard = self.txn_lock.lock();
        for (key, limit) in updates {
            let mut holding = self.load_holding(&key)?.unwrap_or_else(Holding::unbounded);
            holding.limit = limit;
            self.save_holding(&key, &holding)?;
        }
        Ok(())
    }

    fn issue_commission(
        &self,
        client: &str,
        provisions: Vec<Provision>,
        name: &str,
        force: bool,
        at: Timestamp,
    ) -> CoreResult<Serial> {
        let _guard = self.txn_lock.lock();
        let merged = merge_provisions(provisions);

        // Check-and-prepare pass: compute every new holding without writing
        // anything, so a failure partway through leaves no trace (§4.6
        // "atomically undo all prior prepares").
        let mut prepared: Vec<(ResourceKey, Holding)> = Vec::with_capacity(merged.len());
        for provision in &merged {
            let mut holding = self
                .load_holding(&provision.key)?
                .ok_or_else(|| CoreError::NotFound(format!("holding {}", provision.key)))?;

            if provision.delta >= 0 {
                let projected = holding.usage_max + provision.delta as u64;
                if !force {
                    if let Some(limit) = holding.limit {
                        if projected > limit {
                            return Err(CoreError::quota_exceeded(
                                provision.key.holder.clone(),
                                provision.key.resource.clone(),
                                limit,
                                holding.usage_max,
                                provision.delta,
                            ));
                        }
                    }
                }
                holding.usage_max = projected;
            } else {
                let released = (-provision.delta) as u64;
                if released > holding.usage_min {
                    return Err(CoreError::quota_exceeded(
                        provision.key.holder.clone(),
                        provision.key.resource.clone(),
                        holding.limit.unwrap_or(u64::MAX),
                        holding.usage_min,
                        provision.delta,
                    ));
                }
                holding.usage_min -= released;
            }
            prepared.push((provision.key.clone(), holding));
        }

        for (key, holding) in &prepared {
            self.save_holding(key, holding)?;
        }

        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let commission = Commission {
            serial,
            client: client.to_string(),
            name: name.to_string(),
            issue_time: at,
            provisions: merged,
            force,
            resolution: None,
        };
        self.save_commission(&commission)?;
        self.store
            .put(&pending_key(client, serial), b"1")
            .map_err(CoreError::from)?;
        debug!(serial, client, name, "commission issued");
        Ok(serial)
    }

    fn resolve_pending_commissions(
        &self,
        client: &str,
        accept: &[Serial],
        reject: &[Serial],
        reason: &str,
        at: Timestamp,
    ) -> CoreResult<ResolveOutcome> {
        let _guard = self.txn_lock.lock();
        let mut outcome = ResolveOutcome::default();

        let accept_set: std::collections::HashSet<Serial> = accept.iter().copied().collect();
        let reject_set: std::collections::HashSet<Serial> = reject.iter().copied().collect();

        for serial in accept_set.intersection(&reject_set) {
            outcome.conflicting.push(*serial);
        }

        for &serial in accept {
            if outcome.conflicting.contains(&serial) {
                continue;
            }
            self.resolve_one(client, serial, Resolution::Accepted, reason, at, &mut outcome)?;
        }
        for &serial in reject {
            if outcome.conflicting.contains(&serial) {
                continue;
            }
            self.resolve_one(client, serial, Resolution::Rejected, reason, at, &mut outcome)?;
        }

        Ok(outcome)
    }

    fn get_pending_commissions(&self, client: &str) -> CoreResult<Vec<Serial>> {
        let mut out = Vec::new();
        for (key, _) in self.store.prefix_scan(&pending_prefix(client)).map_err(CoreError::from)? {
            let s = std::str::from_utf8(&key)
                .map_err(|e| CoreError::InternalError(format!("pending key not utf8: {e}")))?
                .rsplit(':')
                .next()
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(serial) = s {
                out.push(serial);
            }
        }
        out.sort_unstable();
        Ok(out)
    }

    fn get_commission(&self, client: &str, serial: Serial) -> CoreResult<CommissionDescription> {
        let commission = self
            .load_commission_raw(serial)?
            .ok_or_else(|| CoreError::NotFound(format!("commission {serial}")))?;
        if commission.client != client {
            return Err(CoreError::NotFound(format!("commission {serial}")));
        }
        Ok(commission.into())
    }
}

impl QuotaholderService {
    fn resolve_one(
        &self,
        client: &str,
        serial: Serial,
        resolution: Resolution,
        reason: &str,
        at: Timestamp,
        outcome: &mut ResolveOutcome,
    ) -> CoreResult<()> {
        let commission = match self.load_commission_raw(serial)? {
            Some(c) if c.client == client && c.is_pending() => c,
            Some(_) | None => {
                outcome.not_found.push(serial);
                return Ok(());
            }
        };

        for (index, provision) in commission.provisions.iter().enumerate() {
            let mut holding = self
                .load_holding(&provision.key)?
                .ok_or_else(|| CoreError::NotFound(format!("holding {}", provision.key)))?;
            let before = holding;
            apply_resolution(&mut holding, provision.delta, resolution);
            self.save_holding(&provision.key, &holding)?;
            self.append_provision_log(
                &ProvisionLogEntry {
                    commission_serial: serial,
                    key: provision.key.clone(),
                    delta: provision.delta,
                    resolution,
                    before,
                    after: holding,
                    reason: reason.chars().take(128).collect(),
                    at,
                },
                index,
            )?;
        }

        let mut resolved = commission;
        resolved.resolution = Some(resolution);
        self.save_commission(&resolved)?;
        self.store.delete(&pending_key(client, serial)).map_err(CoreError::from)?;

        match resolution {
            Resolution::Accepted => outcome.accepted.push(serial),
            Resolution::Rejected => outcome.rejected.push(serial),
        }
        debug!(serial, ?resolution, "commission resolved");
        Ok(())
    }
}

impl QuotaholderInternals for QuotaholderService {
    fn load_commission(&self, serial: Serial) -> CoreResult<Option<Commission>> {
        self.load_commission_raw(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::InMemoryKVStore;
    use std::sync::Arc;

    fn service() -> QuotaholderService {
        QuotaholderService::new(Arc::new(InMemoryKVStore::new()))
    }

    fn key(holder: &str) -> ResourceKey {
        ResourceKey::new(holder, "proj-a", "diskspace")
    }

    #[test]
    fn issue_then_accept_finalizes_usage_min() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1000))]).unwrap();
        let serial = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 600 }], "upload", false, 1)
            .unwrap();
        let quota = svc.get_quota(None, None, None).unwrap();
        let holding = quota[&key("alice")];
        assert_eq!(holding.usage_max, 600);
        assert_eq!(holding.usage_min, 0);

        let outcome = svc.resolve_pending_commissions("storage", &[serial], &[], "ok", 2).unwrap();
        assert_eq!(outcome.accepted, vec![serial]);
        let holding = svc.get_quota(None, None, None).unwrap()[&key("alice")];
        assert_eq!(holding.usage_min, 600);
        assert_eq!(holding.usage_max, 600);
    }

    #[test]
    fn reject_undoes_the_reservation() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1000))]).unwrap();
        let serial = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 600 }], "upload", false, 1)
            .unwrap();
        svc.resolve_pending_commissions("storage", &[], &[serial], "bad", 2).unwrap();
        let holding = svc.get_quota(None, None, None).unwrap()[&key("alice")];
        assert_eq!(holding.usage_max, 0);
        assert_eq!(holding.usage_min, 0);
    }

    #[test]
    fn issue_over_limit_fails_without_partial_effect() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1024))]).unwrap();
        let err = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 2048 }], "upload", false, 1)
            .unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { .. }));
        let holding = svc.get_quota(None, None, None).unwrap()[&key("alice")];
        assert_eq!(holding.usage_max, 0);
    }

    #[test]
    fn force_overrides_limit_check() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(100))]).unwrap();
        let serial = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 500 }], "admin-force", true, 1)
            .unwrap();
        assert!(svc.get_pending_commissions("storage").unwrap().contains(&serial));
    }

    #[test]
    fn release_lowers_usage_min_immediately_on_issue() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1000))]).unwrap();
        let s1 = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 600 }], "upload", false, 1)
            .unwrap();
        svc.resolve_pending_commissions("storage", &[s1], &[], "ok", 2).unwrap();

        let s2 = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: -100 }], "overwrite", false, 3)
            .unwrap();
        let holding = svc.get_quota(None, None, None).unwrap()[&key("alice")];
        assert_eq!(holding.usage_min, 500);
        assert_eq!(holding.usage_max, 600);

        svc.resolve_pending_commissions("storage", &[s2], &[], "ok", 4).unwrap();
        let holding = svc.get_quota(None, None, None).unwrap()[&key("alice")];
        assert_eq!(holding.usage_max, 500);
    }

    #[test]
    fn conflicting_serial_in_both_sets_is_untouched() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1000))]).unwrap();
        let serial = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 100 }], "upload", false, 1)
            .unwrap();
        let outcome = svc.resolve_pending_commissions("storage", &[serial], &[serial], "x", 2).unwrap();
        assert_eq!(outcome.conflicting, vec![serial]);
        assert!(outcome.accepted.is_empty());
        assert!(outcome.rejected.is_empty());
        assert!(svc.get_pending_commissions("storage").unwrap().contains(&serial));
    }

    #[test]
    fn resolving_unknown_serial_reports_not_found_without_failing_batch() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1000))]).unwrap();
        let serial = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 100 }], "upload", false, 1)
            .unwrap();
        let outcome = svc.resolve_pending_commissions("storage", &[serial, 9999], &[], "ok", 2).unwrap();
        assert_eq!(outcome.accepted, vec![serial]);
        assert_eq!(outcome.not_found, vec![9999]);
    }

    #[test]
    fn resolution_is_exactly_once() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1000))]).unwrap();
        let serial = svc
            .issue_commission("storage", vec![Provision { key: key("alice"), delta: 100 }], "upload", false, 1)
            .unwrap();
        svc.resolve_pending_commissions("storage", &[serial], &[], "ok", 2).unwrap();
        let second = svc.resolve_pending_commissions("storage", &[serial], &[], "ok", 3).unwrap();
        assert_eq!(second.not_found, vec![serial]);
    }

    #[test]
    fn empty_provisions_commission_is_a_no_op() {
        let svc = service();
        let s1 = svc.issue_commission("storage", vec![], "noop", false, 1).unwrap();
        let s2 = svc.issue_commission("storage", vec![], "noop", false, 2).unwrap();
        assert_ne!(s1, s2);
    }

    #[test]
    fn merges_multiple_provisions_with_same_key() {
        let svc = service();
        svc.set_quota(vec![(key("alice"), Some(1000))]).unwrap();
        svc.issue_commission(
            "storage",
            vec![
                Provision { key: key("alice"), delta: 300 },
                Provision { key: key("alice"), delta: 200 },
            ],
            "upload",
            false,
            1,
        )
        .unwrap();
        let holding = svc.get_quota(None, None, None).unwrap()[&key("alice")];
        assert_eq!(holding.usage_max, 500);
    }
}
