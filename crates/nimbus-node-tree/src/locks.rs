//! Striped locking so concurrent operations on unrelated paths don't
//! serialize behind a single global mutex, while operations on the *same*
//! path (or a colliding stripe) do — the closest this in-process port comes
//! to the original's row-level `for_update` lock.

use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as StdHash, Hasher};

pub struct StripedLocks {
    stripes: Vec<Mutex<()>>,
}

impl StripedLocks {
    pub fn new(stripe_count: usize) -> Self {
        let stripe_count = stripe_count.max(1);
        let stripes = (0..stripe_count).map(|_| Mutex::new(())).collect();
        Self { stripes }
    }

    fn stripe_for(&self, key: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.stripes.len();
        &self.stripes[idx]
    }

    /// Acquire the stripe guarding `key`. The guard must be held for the
    /// duration of whatever "transaction" the lock was requested for.
    pub fn lock_for(&self, key: &str) -> parking_lot::MutexGuard<'_, ()> {
        self.stripe_for(key).lock()
    }
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_maps_to_same_stripe() {
        let locks = StripedLocks::new(16);
        let _g1 = locks.lock_for("a/b/c");
        drop(_g1);
        let _g2 = locks.lock_for("a/b/c");
    }
}
