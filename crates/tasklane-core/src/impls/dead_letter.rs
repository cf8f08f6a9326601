//! Dead-letter sinks.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::ports::{DeadLetter, DeadLetterError, DeadLetterSink};

#[derive(Default)]
pub struct InMemoryDeadLetterSink {
    letters: Mutex<Vec<DeadLetter>>,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().await.clone()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn send(&self, letter: DeadLetter) -> Result<(), DeadLetterError> {
        self.letters.lock().await.push(letter);
        Ok(())
    }
}

/// Appends one JSON line per dead letter.
pub struct JsonlDeadLetterSink {
    path: PathBuf,
    // 同一プロセス内の書き込みを直列化
    write_lock: Mutex<()>,
}

impl JsonlDeadLetterSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl DeadLetterSink for JsonlDeadLetterSink {
    async fn send(&self, letter: DeadLetter) -> Result<(), DeadLetterError> {
        let mut line =
            serde_json::to_string(&letter).map_err(|e| DeadLetterError(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DeadLetterError(format!("{}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DeadLetterError(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| DeadLetterError(e.to_string()))?;

        warn!(
            position = %letter.record.position(),
            path = %self.path.display(),
            "record dead-lettered"
        );
        Ok(())
    }
}
