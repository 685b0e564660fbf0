use nimbus_types::{CoreError, CoreResult, NodeId, SharedStore};
use tracing::debug;

use crate::entities::{Policy, PolicyDefaults, PolicyPatch, VersioningMode};
use crate::ports::PolicyStoreApi;

fn policy_key(node: NodeId) -> Vec<u8> {
    format!("policy:{node:020}").into_bytes()
}

/// Parse a quota string as the wire layer receives it (§4.5). `0` means
/// unbounded.
pub fn parse_quota(raw: &str) -> CoreResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| CoreError::BadRequest(format!("invalid quota value: {raw}")))
}

pub fn parse_versioning(raw: &str) -> CoreResult<VersioningMode> {
    VersioningMode::parse(raw).ok_or_else(|| CoreError::BadRequest(format!("invalid versioning value: {raw}")))
}

pub struct PolicyStoreService {
    store: SharedStore,
    defaults: PolicyDefaults,
}

impl PolicyStoreService {
    pub fn new(store: SharedStore, defaults: PolicyDefaults) -> Self {
        Self { store, defaults }
    }

    fn default_policy(&self, project: String) -> Policy {
        Policy {
            quota: self.defaults.default_quota,
            versioning: self.defaults.default_versioning,
            project,
        }
    }

    fn load_raw(&self, node: NodeId) -> CoreResult<Option<Policy>> {
        match self.store.get(&policy_key(node)).map_err(CoreError::from)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::InternalError(format!("policy deserialization: {e}")))
                .map(Some),
        }
    }
}

impl PolicyStoreApi for PolicyStoreService {
    fn policy_get(&self, node: NodeId) -> CoreResult<Policy> {
        match self.load_raw(node)? {
            Some(p) => Ok(p),
            None => Ok(self.default_policy(String::new())),
        }
    }

    fn policy_set(&self, node: NodeId, patch: PolicyPatch, replace: bool) -> CoreResult<Policy> {
        let existing = self.load_raw(node)?;
        let base_project = existing
            .as_ref()
            .map(|p| p.project.clone())
            .unwrap_or_default();
        let base = existing.unwrap_or_else(|| self.default_policy(base_project.clone()));

        let resolved = if replace {
            Policy {
                quota: patch.quota.unwrap_or(self.defaults.default_quota),
                versioning: patch.versioning.unwrap_or(self.defaults.default_versioning),
                project: patch.project.unwrap_or(base_project),
            }
        } else {
            Policy {
                quota: patch.quota.unwrap_or(base.quota),
                versioning: patch.versioning.unwrap_or(base.versioning),
                project: patch.project.unwrap_or(base.project),
            }
        };

        if resolved.project.is_empty() {
            return Err(CoreError::BadRequest("policy project must not be empty".into()));
        }

        let bytes = serde_json::to_vec(&resolved)
            .map_err(|e| CoreError::InternalError(format!("policy serialization: {e}")))?;
        self.store.put(&policy_key(node), &bytes).map_err(CoreError::from)?;
        debug!(node, project = %resolved.project, "policy updated");
        Ok(resolved)
    }

    fn project_of(&self, node: NodeId, account: &str) -> CoreResult<String> {
        match self.load_raw(node)? {
            Some(p) if !p.project.is_empty() => Ok(p.project),
            _ => Ok(account.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::InMemoryKVStore;
    use std::sync::Arc;

    fn service() -> PolicyStoreService {
        PolicyStoreService::new(Arc::new(InMemoryKVStore::new()), PolicyDefaults::default())
    }

    #[test]
    fn absent_policy_falls_back_to_defaults() {
        let svc = service();
        let policy = svc.policy_get(1).unwrap();
        assert_eq!(policy.quota, 0);
        assert_eq!(policy.versioning, VersioningMode::Auto);
    }

    #[test]
    fn set_then_get_roundtrips() {
        let svc = service();
        let patch = PolicyPatch {
            quota: Some(1000),
            versioning: Some(VersioningMode::None),
            project: Some("proj-a".into()),
        };
        let resolved = svc.policy_set(1, patch, false).unwrap();
        assert_eq!(resolved.quota, 1000);
        assert_eq!(svc.policy_get(1).unwrap(), resolved);
    }

    #[test]
    fn partial_update_keeps_unspecified_fields() {
        let svc = service();
        svc.policy_set(
            1,
            PolicyPatch { quota: Some(500), versioning: None, project: Some("p".into()) },
            false,
        )
        .unwrap();
        let updated = svc
            .policy_set(1, PolicyPatch { quota: Some(999), versioning: None, project: None }, false)
            .unwrap();
        assert_eq!(updated.quota, 999);
        assert_eq!(updated.project, "p");
    }

    #[test]
    fn replace_resets_unspecified_fields_to_defaults() {
        let svc = service();
        svc.policy_set(
            1,
            PolicyPatch { quota: Some(500), versioning: Some(VersioningMode::None), project: Some("p".into()) },
            false,
        )
        .unwrap();
        let replaced = svc
            .policy_set(1, PolicyPatch { quota: None, versioning: None, project: Some("p".into()) }, true)
            .unwrap();
        assert_eq!(replaced.quota, 0);
        assert_eq!(replaced.versioning, VersioningMode::Auto);
    }

    #[test]
    fn project_of_falls_back_to_account() {
        let svc = service();
        assert_eq!(svc.project_of(1, "alice").unwrap(), "alice");
    }

    #[test]
    fn quota_parsing_rejects_non_numeric() {
        assert!(parse_quota("abc").is_err());
        assert_eq!(parse_quota("0").unwrap(), 0);
    }

    #[test]
    fn versioning_parsing_rejects_unknown_values() {
        assert!(parse_versioning("sometimes").is_err());
        assert_eq!(parse_versioning("none").unwrap(), VersioningMode::None);
    }
}
