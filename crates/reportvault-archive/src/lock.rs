//! Per-report serialization of archive and revert runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = Arc<SyncMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// One async mutex per sanitized report key.
///
/// Runs for different reports proceed in parallel; runs for the same report
/// queue up in arrival order. An entry lives only while someone holds or
/// waits for it.
#[derive(Clone, Default)]
pub struct ReportLocks {
    locks: LockTable,
}

/// Exclusive access to one report; released on drop.
pub struct ReportGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: LockTable,
}

impl ReportLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `report_key`.
    pub async fn acquire(&self, report_key: &str) -> ReportGuard {
        // The table lock is never held across an await.
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(report_key.to_string()).or_default())
        };
        ReportGuard {
            guard: Some(lock.lock_owned().await),
            key: report_key.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for ReportGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table still references the mutex: nobody holds or waits.
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
