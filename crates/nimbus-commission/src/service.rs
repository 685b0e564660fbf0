use std::sync::Arc;

use nimbus_types::{CoreError, CoreResult, SharedStore, Serial, Timestamp};
use nimbus_quotaholder::{Provision, QuotaholderApi};
use tracing::{debug, warn};

use crate::entities::{CommissionSerialRecord, ReconcileReport};
use crate::ports::CommissionCoordinatorApi;

fn record_key(serial: Serial) -> Vec<u8> {
    format!("commission_serial:serial:{serial:020}").into_bytes()
}

fn record_prefix() -> Vec<u8> {
    b"commission_serial:serial:".to_vec()
}

fn resource_index_key(resource: &str) -> Vec<u8> {
    format!("commission_serial:resource:{resource}").into_bytes()
}

pub struct CommissionCoordinator {
    store: SharedStore,
    quotaholder: Arc<dyn QuotaholderApi + Send + Sync>,
}

impl CommissionCoordinator {
    pub fn new(store: SharedStore, quotaholder: Arc<dyn QuotaholderApi + Send + Sync>) -> Self {
        Self { store, quotaholder }
    }

    fn load_record(&self, serial: Serial) -> CoreResult<Option<CommissionSerialRecord>> {
        match self.store.get(&record_key(serial)).map_err(CoreError::from)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::InternalError(format!("commission record deserialization: {e}")))
                .map(Some),
        }
    }

    fn save_record(&self, record: &CommissionSerialRecord) -> CoreResult<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| CoreError::InternalError(format!("commission record serialization: {e}")))?;
        self.store.put(&record_key(record.serial), &bytes).map_err(CoreError::from)?;
        self.store
            .put(&resource_index_key(&record.resource), &record.serial.to_le_bytes())
            .map_err(CoreError::from)
    }

    fn all_records(&self) -> CoreResult<Vec<CommissionSerialRecord>> {
        self.store
            .prefix_scan(&record_prefix())
            .map_err(CoreError::from)?
            .into_iter()
            .map(|(_, v)| {
                serde_json::from_slice(&v)
                    .map_err(|e| CoreError::InternalError(format!("commission record deserialization: {e}")))
            })
            .collect()
    }

    /// Attempt the remote resolve call a local record calls for, updating
    /// the record on success and leaving it untouched on failure.
    fn try_settle(&self, record: &mut CommissionSerialRecord, at: Timestamp) -> CoreResult<bool> {
        let reason = "coordinator reconcile";
        let outcome = if record.accept {
            self.quotaholder
                .resolve_pending_commissions(&record.client, &[record.serial], &[], reason, at)?
        } else {
            self.quotaholder
                .resolve_pending_commissions(&record.client, &[], &[record.serial], reason, at)?
        };
        let settled = outcome.accepted.contains(&record.serial)
            || outcome.rejected.contains(&record.serial)
            || outcome.not_found.contains(&record.serial);
        if settled {
            record.pending = false;
            record.resolved = true;
            self.save_record(record)?;
        }
        Ok(settled)
    }
}

impl CommissionCoordinatorApi for CommissionCoordinator {
    fn issue(
        &self,
        resource: &str,
        client: &str,
        provisions: Vec<Provision>,
        name: &str,
        force: bool,
        at: Timestamp,
    ) -> CoreResult<Serial> {
        if let Some(stale_bytes) = self.store.get(&resource_index_key(resource)).map_err(CoreError::from)? {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&stale_bytes);
            let stale_serial = u64::from_le_bytes(arr);
            if let Some(mut stale) = self.load_record(stale_serial)? {
                if stale.pending {
                    warn!(resource, stale_serial, "force-rejecting stale pending commission before reissue");
                    stale.accept = false;
                    let _ = self.try_settle(&mut stale, at);
                }
            }
        }

        let serial = self
            .quotaholder
            .issue_commission(client, provisions, name, force, at)?;

        self.save_record(&CommissionSerialRecord {
            serial,
            client: client.to_string(),
            resource: resource.to_string(),
            pending: true,
            accept: true,
            resolved: false,
        })?;
        debug!(serial, resource, "commission serial durably recorded");
        Ok(serial)
    }

    fn accept(&self, serial: Serial, at: Timestamp) -> CoreResult<()> {
        let mut record = self
            .load_record(serial)?
            .ok_or_else(|| CoreError::NotFound(format!("commission record {serial}")))?;
        record.accept = true;
        self.try_settle(&mut record, at)?;
        Ok(())
    }

    fn reject(&self, serial: Serial, reason: &str, at: Timestamp) -> CoreResult<()> {
        let mut record = self
            .load_record(serial)?
            .ok_or_else(|| CoreError::NotFound(format!("commission record {serial}")))?;
        record.accept = false;
        let outcome = self
            .quotaholder
            .resolve_pending_commissions(&record.client, &[], &[serial], reason, at)?;
        if outcome.rejected.contains(&serial) || outcome.not_found.contains(&serial) {
            record.pending = false;
            record.resolved = true;
            self.save_record(&record)?;
        }
        Ok(())
    }

    fn record_for_resource(&self, resource: &str) -> CoreResult<Option<CommissionSerialRecord>> {
        match self.store.get(&resource_index_key(resource)).map_err(CoreError::from)? {
            None => Ok(None),
            Some(bytes) => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                self.load_record(u64::from_le_bytes(arr))
            }
        }
    }

    fn reconcile(&self, client: &str, at: Timestamp) -> CoreResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let local = self.all_records()?;
        let local_serials: std::collections::HashSet<Serial> = local.iter().map(|r| r.serial).collect();

        for mut record in local.into_iter().filter(|r| r.client == client && r.pending) {
            match self.try_settle(&mut record, at) {
                Ok(true) => {
                    if record.accept {
                        report.accepted.push(record.serial);
                    } else {
                        report.rejected.push(record.serial);
                    }
                }
                Ok(false) => {}
                Err(err) => report.errors.push((record.serial, err.to_string())),
            }
        }

        // Remote serials with no local bookkeeping at all: this process
        // never heard of them, so the safe default is to reject (§4.8
        // "serials absent locally are rejected remotely").
        let remote_pending = self.quotaholder.get_pending_commissions(client)?;
        for serial in remote_pending {
            if local_serials.contains(&serial) {
                continue;
            }
            match self
                .quotaholder
                .resolve_pending_commissions(client, &[], &[serial], "reconcile: unknown locally", at)
            {
                Ok(outcome) if outcome.rejected.contains(&serial) => report.rejected.push(serial),
                Ok(_) => {}
                Err(err) => report.errors.push((serial, err.to_string())),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::{InMemoryKVStore, ResourceKey};
    use nimbus_quotaholder::QuotaholderService;

    fn setup() -> (CommissionCoordinator, Arc<QuotaholderService>) {
        let qh = Arc::new(QuotaholderService::new(Arc::new(InMemoryKVStore::new())));
        qh.set_quota(vec![(ResourceKey::new("alice", "alice", "diskspace"), Some(10_000))]).unwrap();
        let coordinator = CommissionCoordinator::new(Arc::new(InMemoryKVStore::new()), qh.clone());
        (coordinator, qh)
    }

    fn provision(delta: i64) -> Provision {
        Provision { key: ResourceKey::new("alice", "alice", "diskspace"), delta }
    }

    #[test]
    fn issue_then_accept_clears_pending() {
        let (coord, _qh) = setup();
        let serial = coord.issue("alice/docs/a.txt", "storage", vec![provision(600)], "upload", false, 1).unwrap();
        assert!(coord.record_for_resource("alice/docs/a.txt").unwrap().unwrap().pending);
        coord.accept(serial, 2).unwrap();
        assert!(!coord.record_for_resource("alice/docs/a.txt").unwrap().unwrap().pending);
    }

    #[test]
    fn reject_marks_record_resolved_not_accepted() {
        let (coord, _qh) = setup();
        let serial = coord.issue("alice/docs/a.txt", "storage", vec![provision(600)], "upload", false, 1).unwrap();
        coord.reject(serial, "local failure", 2).unwrap();
        let record = coord.record_for_resource("alice/docs/a.txt").unwrap().unwrap();
        assert!(!record.pending);
        assert!(!record.accept);
    }

    #[test]
    fn reissue_on_same_resource_force_rejects_stale_commission() {
        let (coord, qh) = setup();
        let first = coord.issue("alice/docs/a.txt", "storage", vec![provision(600)], "upload", false, 1).unwrap();
        // Simulate a crash: never accepted or rejected `first`.
        let second = coord.issue("alice/docs/a.txt", "storage", vec![provision(100)], "upload", false, 2).unwrap();
        assert_ne!(first, second);
        assert!(qh.get_pending_commissions("storage").unwrap().contains(&second));
        assert!(!qh.get_pending_commissions("storage").unwrap().contains(&first));
    }

    #[test]
    fn reconcile_accepts_locally_pending_records() {
        let (coord, qh) = setup();
        let serial = coord.issue("alice/docs/a.txt", "storage", vec![provision(600)], "upload", false, 1).unwrap();
        let report = coord.reconcile("storage", 2).unwrap();
        assert_eq!(report.accepted, vec![serial]);
        assert!(qh.get_pending_commissions("storage").unwrap().is_empty());
    }
}
