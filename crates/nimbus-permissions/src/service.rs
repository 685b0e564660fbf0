use std::collections::{BTreeMap, HashSet};

use nimbus_types::{CoreError, CoreResult, Principal, SharedStore};
use rand::Rng;
use tracing::debug;

use crate::entities::{Action, AccessList};
use crate::ports::{NodeKindResolver, PermissionIndexApi};

fn access_key(path: &str) -> Vec<u8> {
    format!("perm:access:{path}").into_bytes()
}

fn public_token_key(token: &str) -> Vec<u8> {
    format!("perm:token:{token}").into_bytes()
}

fn public_path_key(path: &str) -> Vec<u8> {
    format!("perm:pubpath:{path}").into_bytes()
}

fn retired_key(token: &str) -> Vec<u8> {
    format!("perm:retired:{token}").into_bytes()
}

fn group_key(account: &Principal, group: &str) -> Vec<u8> {
    format!("perm:group:{account}:{group}").into_bytes()
}

fn group_prefix(account: &Principal) -> Vec<u8> {
    format!("perm:group:{account}:").into_bytes()
}

/// Number of characters a token needs for `security_bytes` of entropy drawn
/// from an alphabet of `alphabet_len` symbols (§8, scenario 6).
fn token_length(security_bytes: usize, alphabet_len: usize) -> usize {
    let bits_needed = (security_bytes * 8) as f64;
    let bits_per_char = (alphabet_len as f64).log2();
    (bits_needed / bits_per_char).ceil() as usize
}

pub struct PermissionIndexService {
    store: SharedStore,
    resolver: std::sync::Arc<dyn NodeKindResolver>,
}

impl PermissionIndexService {
    pub fn new(store: SharedStore, resolver: std::sync::Arc<dyn NodeKindResolver>) -> Self {
        Self { store, resolver }
    }

    fn entry_matches(&self, entry: &Principal, candidate: &Principal) -> CoreResult<bool> {
        if entry == candidate {
            return Ok(true);
        }
        if entry.is_public() {
            return Ok(true);
        }
        if let Some((owner, group)) = entry.as_group_ref() {
            let groups = self.get_account_groups(&Principal::new(owner))?;
            if let Some(members) = groups.get(group) {
                return Ok(members.contains(candidate));
            }
        }
        Ok(false)
    }

    fn list_matches(&self, list: &AccessList, action: Action, candidate: &Principal) -> CoreResult<bool> {
        for entry in list.list_for(action) {
            if self.entry_matches(entry, candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl PermissionIndexApi for PermissionIndexService {
    fn access_set(&self, path: &str, list: AccessList) -> CoreResult<()> {
        if list.is_empty() {
            self.store.delete(&access_key(path)).map_err(CoreError::from)?;
            return Ok(());
        }
        let bytes = serde_json::to_vec(&list)
            .map_err(|e| CoreError::InternalError(format!("access list serialization: {e}")))?;
        self.store.put(&access_key(path), &bytes).map_err(CoreError::from)?;
        debug!(path, "access list updated");
        Ok(())
    }

    fn access_get(&self, path: &str) -> CoreResult<AccessList> {
        match self.store.get(&access_key(path)).map_err(CoreError::from)? {
            None => Ok(AccessList::default()),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::InternalError(format!("access list deserialization: {e}"))),
        }
    }

    fn access_check(&self, path: &str, action: Action, principal: &Principal) -> CoreResult<bool> {
        let own = self.access_get(path)?;
        if self.list_matches(&own, action, principal)? {
            return Ok(true);
        }
        for ancestor in self.access_inherit(path)? {
            let directory_like = self
                .resolver
                .kind_of(&ancestor)?
                .map(|k| k.is_directory_like())
                .unwrap_or(false);
            if !directory_like {
                continue;
            }
            let list = self.access_get(&ancestor)?;
            if self.list_matches(&list, action, principal)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn access_list_paths(&self, principal: &Principal, action: Action, prefix: Option<&str>) -> CoreResult<HashSet<String>> {
        let mut out = HashSet::new();
        for (key, _) in self.store.prefix_scan(b"perm:access:").map_err(CoreError::from)? {
            let path = std::str::from_utf8(&key)
                .map_err(|e| CoreError::InternalError(format!("access key not utf8: {e}")))?
                .strip_prefix("perm:access:")
                .unwrap_or_default();
            if let Some(p) = prefix {
                if !path.starts_with(p) {
                    continue;
                }
            }
            if self.access_check(path, action, principal)? {
                out.insert(path.to_string());
            }
        }
        Ok(out)
    }

    fn access_inherit(&self, path: &str) -> CoreResult<Vec<String>> {
        let mut out = Vec::new();
        let segments: Vec<&str> = path.split('/').collect();
        for i in (1..segments.len()).rev() {
            out.push(segments[..i].join("/"));
        }
        Ok(out)
    }

    fn public_set(&self, path: &str, security_bytes: usize, alphabet: &str) -> CoreResult<String> {
        if alphabet.is_empty() {
            return Err(CoreError::BadRequest("public url alphabet must not be empty".into()));
        }
        let chars: Vec<char> = alphabet.chars().collect();
        let length = token_length(security_bytes, chars.len()).max(1);

        // Retire any prior token bound to this path first.
        self.public_unset(path)?;

        let mut rng = rand::thread_rng();
        let token = loop {
            let candidate: String = (0..length).map(|_| chars[rng.gen_range(0..chars.len())]).collect();
            let already_used = self.store.exists(&public_token_key(&candidate)).map_err(CoreError::from)?
                || self.store.exists(&retired_key(&candidate)).map_err(CoreError::from)?;
            if !already_used {
                break candidate;
            }
        };

        self.store
            .put(&public_token_key(&token), path.as_bytes())
            .map_err(CoreError::from)?;
        self.store
            .put(&public_path_key(path), token.as_bytes())
            .map_err(CoreError::from)?;
        Ok(token)
    }

    fn public_unset(&self, path: &str) -> CoreResult<()> {
        if let Some(bytes) = self.store.get(&public_path_key(path)).map_err(CoreError::from)? {
            let token = String::from_utf8(bytes)
                .map_err(|e| CoreError::InternalError(format!("token not utf8: {e}")))?;
            self.store.put(&retired_key(&token), b"1").map_err(CoreError::from)?;
            self.store.delete(&public_token_key(&token)).map_err(CoreError::from)?;
            self.store.delete(&public_path_key(path)).map_err(CoreError::from)?;
        }
        Ok(())
    }

    fn public_get(&self, path: &str) -> CoreResult<Option<String>> {
        self.store
            .get(&public_path_key(path))
            .map_err(CoreError::from)?
            .map(|b| String::from_utf8(b).map_err(|e| CoreError::InternalError(format!("token not utf8: {e}"))))
            .transpose()
    }

    fn public_path(&self, token: &str) -> CoreResult<Option<String>> {
        self.store
            .get(&public_token_key(token))
            .map_err(CoreError::from)?
            .map(|b| String::from_utf8(b).map_err(|e| CoreError::InternalError(format!("path not utf8: {e}"))))
            .transpose()
    }

    fn update_account_groups(&self, account: &Principal, group: &str, members: Vec<Principal>) -> CoreResult<()> {
        if members.is_empty() {
            self.store.delete(&group_key(account, group)).map_err(CoreError::from)?;
            return Ok(());
        }
        let bytes = serde_json::to_vec(&members)
            .map_err(|e| CoreError::InternalError(format!("group serialization: {e}")))?;
        self.store.put(&group_key(account, group), &bytes).map_err(CoreError::from)
    }

    fn get_account_groups(&self, account: &Principal) -> CoreResult<BTreeMap<String, Vec<Principal>>> {
        let mut out = BTreeMap::new();
        let prefix = group_prefix(account);
        for (key, value) in self.store.prefix_scan(&prefix).map_err(CoreError::from)? {
            let group = std::str::from_utf8(&key)
                .map_err(|e| CoreError::InternalError(format!("group key not utf8: {e}")))?
                .rsplit(':')
                .next()
                .unwrap_or_default()
                .to_string();
            let members: Vec<Principal> = serde_json::from_slice(&value)
                .map_err(|e| CoreError::InternalError(format!("group deserialization: {e}")))?;
            out.insert(group, members);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::{InMemoryKVStore, NodeKind};
    use std::sync::Arc;

    struct AllDirectories;
    impl NodeKindResolver for AllDirectories {
        fn kind_of(&self, _path: &str) -> CoreResult<Option<NodeKind>> {
            Ok(Some(NodeKind::Container))
        }
    }

    struct LeafObjectsOnly;
    impl NodeKindResolver for LeafObjectsOnly {
        fn kind_of(&self, path: &str) -> CoreResult<Option<NodeKind>> {
            if path.matches('/').count() < 2 {
                Ok(Some(NodeKind::Container))
            } else {
                Ok(Some(NodeKind::Object))
            }
        }
    }

    fn service_with(resolver: Arc<dyn NodeKindResolver>) -> PermissionIndexService {
        PermissionIndexService::new(Arc::new(InMemoryKVStore::new()), resolver)
    }

    #[test]
    fn direct_grant_is_visible() {
        let svc = service_with(Arc::new(AllDirectories));
        let alice = Principal::new("alice");
        svc.access_set("a/c/o", AccessList { read: vec![alice.clone()], write: vec![] }).unwrap();
        assert!(svc.access_check("a/c/o", Action::Read, &alice).unwrap());
        assert!(!svc.access_check("a/c/o", Action::Write, &alice).unwrap());
    }

    #[test]
    fn inherits_from_directory_like_ancestor() {
        let svc = service_with(Arc::new(AllDirectories));
        let bob = Principal::new("bob");
        svc.access_set("a/c", AccessList { read: vec![bob.clone()], write: vec![] }).unwrap();
        assert!(svc.access_check("a/c/o", Action::Read, &bob).unwrap());
    }

    #[test]
    fn does_not_inherit_through_leaf_ancestor() {
        // a/c/o is itself an object per LeafObjectsOnly, so a grant placed
        // directly ON an object never reaches anything below it.
        let svc = service_with(Arc::new(LeafObjectsOnly));
        let bob = Principal::new("bob");
        svc.access_set("a/c/o", AccessList { read: vec![bob.clone()], write: vec![] }).unwrap();
        assert!(!svc.access_check("a/c/o/sub", Action::Read, &bob).unwrap());
    }

    #[test]
    fn public_wildcard_grants_everyone_read() {
        let svc = service_with(Arc::new(AllDirectories));
        svc.access_set("a/c/o", AccessList { read: vec![Principal::public()], write: vec![] }).unwrap();
        assert!(svc.access_check("a/c/o", Action::Read, &Principal::new("anyone")).unwrap());
    }

    #[test]
    fn group_reference_expands() {
        let svc = service_with(Arc::new(AllDirectories));
        let alice = Principal::new("alice");
        let carol = Principal::new("carol");
        svc.update_account_groups(&alice, "devs", vec![carol.clone()]).unwrap();
        svc.access_set("a/c/o", AccessList { read: vec![Principal::new("alice:devs")], write: vec![] }).unwrap();
        assert!(svc.access_check("a/c/o", Action::Read, &carol).unwrap());
        assert!(!svc.access_check("a/c/o", Action::Read, &Principal::new("dave")).unwrap());
    }

    #[test]
    fn public_token_roundtrips_and_never_reissues() {
        let svc = service_with(Arc::new(AllDirectories));
        let token = svc.public_set("a/c/o", 16, "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz").unwrap();
        assert_eq!(svc.public_path(&token).unwrap(), Some("a/c/o".to_string()));
        assert!(token.len() >= 21 && token.len() <= 23);

        svc.public_unset("a/c/o").unwrap();
        assert_eq!(svc.public_path(&token).unwrap(), None);
        assert_eq!(svc.public_get("a/c/o").unwrap(), None);

        let retired = retired_key(&token);
        assert!(svc.store.exists(&retired).unwrap());
    }

    #[test]
    fn access_list_paths_restricted_to_prefix() {
        let svc = service_with(Arc::new(AllDirectories));
        let alice = Principal::new("alice");
        svc.access_set("a/c1/o", AccessList { read: vec![alice.clone()], write: vec![] }).unwrap();
        svc.access_set("a/c2/o", AccessList { read: vec![alice.clone()], write: vec![] }).unwrap();
        let all = svc.access_list_paths(&alice, Action::Read, None).unwrap();
        assert_eq!(all.len(), 2);
        let scoped = svc.access_list_paths(&alice, Action::Read, Some("a/c1")).unwrap();
        assert_eq!(scoped.len(), 1);
        assert!(scoped.contains("a/c1/o"));
    }
}
