//! Per-document exclusivity.
//!
//! Pulls of the same document are serialized; unrelated documents proceed in
//! parallel. Map entries hold weak references and are swept once no caller
//! holds or waits on them.

use crate::models::DocumentId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held for the duration of a pull
pub type DocumentLockGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<DocumentId, Weak<AsyncMutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `document_id`
    pub async fn acquire(&self, document_id: &DocumentId) -> DocumentLockGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, weak| weak.strong_count() > 0);

            match locks.get(document_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(*document_id, Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    /// Number of documents currently locked or awaited
    pub fn active(&self) -> usize {
        let locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
