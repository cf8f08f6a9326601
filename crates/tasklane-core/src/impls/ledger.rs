//! Ledger implementations.
//!
//! - [`InMemoryLedger`]: tests and dry runs
//! - [`DirLedger`]: one JSON file per key under a directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::ports::{Ledger, LedgerError};

#[derive(Default)]
pub struct InMemoryLedger {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, doc_id: &str) -> Option<serde_json::Value> {
        self.entries.lock().await.get(doc_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn contains(&self, doc_id: &str) -> Result<bool, LedgerError> {
        Ok(self.entries.lock().await.contains_key(doc_id))
    }

    async fn record(&self, doc_id: &str, marker: &serde_json::Value) -> Result<(), LedgerError> {
        self.entries
            .lock()
            .await
            .insert(doc_id.to_string(), marker.clone());
        Ok(())
    }
}

/// Directory-backed ledger: `<root>/<docId>.json`.
///
/// Markers are written to a temporary file and renamed into place, so a
/// crash never leaves a half-written marker that `contains` would count.
#[derive(Debug, Clone)]
pub struct DirLedger {
    root: PathBuf,
}

impl DirLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, doc_id: &str) -> Result<PathBuf, LedgerError> {
        validate_key(doc_id)?;
        Ok(self.root.join(format!("{doc_id}.json")))
    }

    pub async fn get(&self, doc_id: &str) -> Result<Option<serde_json::Value>, LedgerError> {
        let path = self.path_for(doc_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| storage(doc_id, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage(doc_id, e)),
        }
    }
}

/// Keys become file names: ASCII alphanumerics, `-` and `_` only.
fn validate_key(doc_id: &str) -> Result<(), LedgerError> {
    let valid = !doc_id.is_empty()
        && doc_id.len() <= 128
        && doc_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(LedgerError::InvalidKey(doc_id.to_string()))
    }
}

fn storage(doc_id: &str, err: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage {
        key: doc_id.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl Ledger for DirLedger {
    async fn contains(&self, doc_id: &str) -> Result<bool, LedgerError> {
        let path = self.path_for(doc_id)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| storage(doc_id, e))
    }

    async fn record(&self, doc_id: &str, marker: &serde_json::Value) -> Result<(), LedgerError> {
        let path = self.path_for(doc_id)?;
        let tmp = self.root.join(format!("{doc_id}.json.tmp"));
        let bytes = serde_json::to_vec_pretty(marker).map_err(|e| storage(doc_id, e))?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| storage(doc_id, e))?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| storage(doc_id, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage(doc_id, e))?;

        debug!(doc_id, path = %path.display(), "ledger marker written");
        Ok(())
    }
}
