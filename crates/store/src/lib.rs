//! Keyed-table state store.
//!
//! The monitor publishes into three tables (device details, aggregate
//! status, detach hints). Each table is a set of rows keyed by string, each
//! row a flat map of field -> value. Backends implement [`Table`]; the
//! daemon only ever sees `Arc<dyn Table>`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pcied_core::tables::{TABLE_DETACH_INFO, TABLE_DEVICE_DETAIL, TABLE_DEVICE_STATUS};

pub mod error;
pub mod file;
pub mod memory;
pub mod owned;

pub use error::StoreError;
pub use file::FileTable;
pub use memory::MemoryTable;
pub use owned::{OwnedTable, ReleaseSummary};

/// One row: field -> value.
pub type Row = BTreeMap<String, String>;

/// A keyed table with hash-set semantics.
///
/// There are no transactions; every call stands alone.
#[async_trait]
pub trait Table: Send + Sync {
    /// Table name as seen by other processes.
    fn name(&self) -> &str;

    /// Merge `fields` into the row at `key`, creating it if needed.
    async fn set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError>;

    /// Replace the row at `key` with exactly `fields`.
    async fn replace(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Row>, StoreError>;

    /// Remove the row. Deleting a missing row is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Handles to the three tables the monitor works with.
#[derive(Clone)]
pub struct StateStore {
    pub detail: Arc<dyn Table>,
    pub status: Arc<dyn Table>,
    pub detach: Arc<dyn Table>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}

impl StateStore {
    /// Open the file-backed store rooted at `dir`, creating the directory if
    /// it does not exist yet.
    pub async fn open_dir(dir: &Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StoreError::Connect {
                path: dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            detail: Arc::new(FileTable::new(dir, TABLE_DEVICE_DETAIL)),
            status: Arc::new(FileTable::new(dir, TABLE_DEVICE_STATUS)),
            detach: Arc::new(FileTable::new(dir, TABLE_DETACH_INFO)),
        })
    }

    /// Fresh in-process tables.
    pub fn in_memory() -> Self {
        Self {
            detail: Arc::new(MemoryTable::new(TABLE_DEVICE_DETAIL)),
            status: Arc::new(MemoryTable::new(TABLE_DEVICE_STATUS)),
            detach: Arc::new(MemoryTable::new(TABLE_DETACH_INFO)),
        }
    }
}
