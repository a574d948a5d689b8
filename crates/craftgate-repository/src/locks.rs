//! Per-entity write locks.
//!
//! Writers to the same entity queue on one async mutex; writers to
//! different entities never contend. Readers take no lock at all: every
//! write lands through an atomic rename, so a reader sees either the old
//! file or the new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map size above which idle locks are pruned on the next acquire.
const PRUNE_THRESHOLD: usize = 1024;

/// The unit of write serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum EntityKey {
    User(String),
    Skin(String),
    LaunchConfiguration,
    ConfigurationVersion,
}

#[derive(Default)]
pub(crate) struct EntityLocks {
    locks: Mutex<HashMap<EntityKey, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    /// Waits for exclusive write access to `key`.
    pub(crate) async fn lock(&self, key: EntityKey) -> OwnedMutexGuard<()> {
        let lock = {
            // The map is only touched in short non-async sections; a panic
            // there cannot leave it inconsistent, so poisoning is ignored.
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
