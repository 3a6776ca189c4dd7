//! In-process table backend.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Row, StoreError, Table};

/// A table held entirely in memory.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    rows: Mutex<BTreeMap<String, Row>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Row>> {
        // A poisoned lock only means another holder panicked mid-update;
        // the map itself is still a valid map.
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        let mut rows = self.rows();
        let row = rows.entry(key.to_string()).or_default();
        for (field, value) in fields {
            row.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn replace(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        self.rows()
            .insert(key.to_string(), fields.iter().cloned().collect());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Row>, StoreError> {
        Ok(self.rows().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.rows().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.rows().keys().cloned().collect())
    }
}
