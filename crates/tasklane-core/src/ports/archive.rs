//! ArchiveApi port - 文書アーカイブ（読み取り専用）

use async_trait::async_trait;

use crate::domain::{ArchivedDocument, ClientError};

/// The archive lags behind; a missing document is `Ok(None)`, not an error.
#[async_trait]
pub trait ArchiveApi: Send + Sync {
    async fn get_document(&self, doc_id: &str) -> Result<Option<ArchivedDocument>, ClientError>;
}
