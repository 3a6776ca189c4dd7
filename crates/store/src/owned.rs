//! Row ownership tracking.
//!
//! The detail and status tables belong to the running monitor: whatever it
//! wrote must be gone once it stops. [`OwnedTable`] remembers every key
//! written through it so the shutdown routine can delete exactly those rows
//! and nothing else.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::{Row, StoreError, Table};

/// Outcome of [`OwnedTable::release`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub deleted: usize,
    pub failed: usize,
}

/// A table wrapper that records the keys this instance created.
pub struct OwnedTable {
    inner: Arc<dyn Table>,
    owned: Mutex<BTreeSet<String>>,
}

impl OwnedTable {
    pub fn new(inner: Arc<dyn Table>) -> Self {
        Self {
            inner,
            owned: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Write through to the backing table.
    ///
    /// The key is recorded before the write so a row left behind by a
    /// partially failed write is still cleaned up.
    pub async fn set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        self.owned_keys().insert(key.to_string());
        self.inner.set(key, fields).await
    }

    /// Replace the row wholesale; the key is recorded as for [`Self::set`].
    pub async fn replace(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), StoreError> {
        self.owned_keys().insert(key.to_string());
        self.inner.replace(key, fields).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<Row>, StoreError> {
        self.inner.get(key).await
    }

    /// Keys written through this wrapper so far, sorted.
    pub fn owned(&self) -> Vec<String> {
        self.owned_keys().iter().cloned().collect()
    }

    /// Delete every owned row, best-effort.
    ///
    /// Failures are logged and counted; the remaining keys are still
    /// attempted. Released keys are forgotten either way.
    pub async fn release(&self) -> ReleaseSummary {
        let keys = std::mem::take(&mut *self.owned_keys());
        let mut summary = ReleaseSummary::default();

        for key in keys {
            match self.inner.delete(&key).await {
                Ok(()) => summary.deleted += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        table = self.inner.name(),
                        key = %key,
                        error = %e,
                        "Failed to delete owned row",
                    );
                }
            }
        }

        summary
    }

    fn owned_keys(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.owned.lock().unwrap_or_else(|e| e.into_inner())
    }
}
