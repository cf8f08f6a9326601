//! HttpArchiveClient - 文書アーカイブの GraphQL クライアント（読み取り専用）

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::http::{self, CORRELATION_HEADER};
use super::retry::RetryPolicy;
use crate::domain::{ArchivedDocument, ClientError};
use crate::ports::{ArchiveApi, TokenProvider};
use crate::redact::mask_pii;

const DOCUMENT_QUERY: &str = "query document($docId: String!) { \
    document(docId: $docId) { docId archiveStatus category routingUnit createdAt } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<DocumentData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct DocumentData {
    #[serde(default, alias = "journalpost")]
    document: Option<ArchivedDocument>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

pub struct HttpArchiveClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
    retry: RetryPolicy,
}

impl HttpArchiveClient {
    pub fn new(
        endpoint: &str,
        tokens: Arc<dyn TokenProvider>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: http::build_client(timeout)?,
            endpoint: http::base_url(endpoint)?,
            tokens,
            retry,
        })
    }
}

#[async_trait]
impl ArchiveApi for HttpArchiveClient {
    async fn get_document(&self, doc_id: &str) -> Result<Option<ArchivedDocument>, ClientError> {
        const OP: &str = "get_document";
        let token = self.tokens.token().await?;
        let correlation_id = http::correlation_id();
        let body = json!({
            "query": DOCUMENT_QUERY,
            "variables": { "docId": doc_id },
        });
        debug!(doc_id, correlation_id = %correlation_id, "querying archive");

        let response = http::send(&self.retry, OP, || {
            self.http
                .post(&self.endpoint)
                .json(&body)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(CORRELATION_HEADER, &correlation_id)
        })
        .await?;
        if http::is_not_found(&response) {
            return Ok(None);
        }
        let response = http::check_status(OP, response).await?;
        let parsed: GraphQlResponse = http::decode(OP, response).await?;

        if !parsed.errors.is_empty() {
            let message = parsed
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            let message = mask_pii(&message).into_owned();
            warn!(doc_id, %message, "archive reported errors");
            return Err(ClientError::Remote {
                operation: OP,
                message,
            });
        }

        Ok(parsed.data.and_then(|data| data.document))
    }
}
