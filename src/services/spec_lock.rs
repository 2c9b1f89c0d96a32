//! Per-spec lock manager.
//!
//! Serializes the read-modify-write of one `(build_id, spec_file)` aggregate
//! within this process. Waiters suspend on a tokio mutex (FIFO) instead of
//! spinning, the wait is bounded, and the lock is released when the guard is
//! dropped, whether the critical section succeeded, failed, or was cancelled.
//!
//! This does not reach other replicas. Across processes the row lock taken in
//! [`crate::db::spec_results::find_spec_result_for_update`] and the
//! (build_id, spec_file) upsert carry the serialization.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

use crate::error::{AppError, AppResult};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Lock key of one spec aggregate.
pub fn spec_lock_key(build_id: i32, spec_file: &str) -> String {
    format!("{}:{}", build_id, spec_file)
}

/// Process-local mutual exclusion keyed by string.
#[derive(Clone)]
pub struct SpecLocks {
    table: LockTable,
    wait_timeout: Duration,
}

/// Holds a key until dropped.
pub struct SpecLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    table: LockTable,
}

impl SpecLocks {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            wait_timeout,
        }
    }

    /// Wait for `key`, failing with [`AppError::LockTimeout`] after the configured bound.
    pub async fn acquire(&self, key: &str) -> AppResult<SpecLockGuard> {
        let mutex = {
            let mut table = lock_table(&self.table);
            table
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let acquired = tokio::time::timeout(self.wait_timeout, mutex.lock_owned()).await;

        match acquired {
            Ok(guard) => Ok(SpecLockGuard {
                guard: Some(guard),
                key: key.to_string(),
                table: self.table.clone(),
            }),
            Err(_) => {
                prune(&self.table, key);
                warn!(
                    key = %key,
                    wait_ms = %self.wait_timeout.as_millis(),
                    "Timed out waiting for spec lock"
                );
                Err(AppError::LockTimeout(key.to_string()))
            }
        }
    }

    /// Run `f` while holding `key`.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, f: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let _guard = self.acquire(key).await?;
        f().await
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        lock_table(&self.table).len()
    }
}

impl Drop for SpecLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        prune(&self.table, &self.key);
    }
}

fn lock_table(table: &LockTable) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop the entry once nobody holds or waits on it. Clones are only handed
/// out under the table lock, so a count of one means the table is the sole owner.
fn prune(table: &LockTable, key: &str) {
    let mut table = lock_table(table);
    if table
        .get(key)
        .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
    {
        table.remove(key);
    }
}
