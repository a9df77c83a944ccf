use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::domain::ApplicationId;

/// Exclusive per-application locks for read-modify-write cycles.
///
/// Work on different applications never contends; entries are dropped once no caller holds
/// or waits on them.
#[derive(Debug, Default)]
pub struct RecordLocks {
    entries: Mutex<HashMap<ApplicationId, Arc<Mutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` while holding the lock for `id`.
    pub fn with_lock<T>(&self, id: &ApplicationId, work: impl FnOnce() -> T) -> T {
        let entry = {
            let mut entries = self.table();
            entries
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = {
            // A panic in a previous holder leaves no partial state behind: records are only
            // written back after the engine returns.
            let _guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };

        drop(entry);
        self.prune(id);
        result
    }

    /// Number of applications with a live lock entry.
    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.table().len()
    }

    fn prune(&self, id: &ApplicationId) {
        let mut entries = self.table();
        if entries
            .get(id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            entries.remove(id);
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<ApplicationId, Arc<Mutex<()>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
