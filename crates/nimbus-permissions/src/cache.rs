//! Per-request permission cache (§4.4): avoids re-walking ancestor chains
//! for repeated checks of the same `(principal, action)` pair within one
//! façade operation. Owned by the caller (one instance per transaction),
//! not shared across requests — a mutation of any permission record
//! invalidates it by simply being dropped at the end of the request rather
//! than tracked for partial invalidation.

use nimbus_types::Principal;
use std::collections::{HashMap, HashSet};

use crate::entities::Action;

#[derive(Default)]
pub struct PermissionCache {
    checked: HashMap<(Principal, Action), HashSet<String>>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, principal: &Principal, action: Action, path: &str) {
        self.checked
            .entry((principal.clone(), action))
            .or_default()
            .insert(path.to_string());
    }

    pub fn contains(&self, principal: &Principal, action: Action, path: &str) -> bool {
        self.checked
            .get(&(principal.clone(), action))
            .is_some_and(|set| set.contains(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_and_reports_hits() {
        let mut cache = PermissionCache::new();
        let alice = Principal::new("alice");
        assert!(!cache.contains(&alice, Action::Read, "a/b"));
        cache.remember(&alice, Action::Read, "a/b");
        assert!(cache.contains(&alice, Action::Read, "a/b"));
        assert!(!cache.contains(&alice, Action::Write, "a/b"));
    }
}
