//! File-backed table backend.
//!
//! Each table is one JSON document, `<dir>/<TABLE>.json`, holding an object
//! of key -> { field -> value }. Readers in other processes can load the
//! document at any time: every mutation writes a sibling temp file and
//! renames it over the original, so a reader never sees a half-written
//! table.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{Row, StoreError, Table};

type Document = BTreeMap<String, Row>;

/// A table persisted as a JSON document on disk.
#[derive(Debug)]
pub struct FileTable {
    name: String,
    path: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileTable {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: dir.join(format!("{name}.json")),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Document, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        if bytes.is_empty() {
            return Ok(Document::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    async fn store(&self, doc: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Encode {
            table: self.name.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            table: self.name.clone(),
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl Table for FileTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        let row = doc.entry(key.to_string()).or_default();
        for (field, value) in fields {
            row.insert(field.clone(), value.clone());
        }
        self.store(&doc).await
    }

    async fn replace(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        doc.insert(key.to_string(), fields.iter().cloned().collect());
        self.store(&doc).await
    }

    async fn get(&self, key: &str) -> Result<Option<Row>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        Ok(doc.remove(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        if doc.remove(key).is_none() {
            return Ok(());
        }
        self.store(&doc).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_keys().collect())
    }
}
