//! TokenProvider port - bearer token の取得
//!
//! Acquiring and caching OAuth2 tokens is somebody else's job; the clients
//! only ask for the current token right before each logical call.

use async_trait::async_trait;

use crate::domain::ClientError;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, ClientError>;
}

/// A token fixed at construction time.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, ClientError> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call, so a sidecar
/// can rotate it without restarting the process.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn token(&self) -> Result<String, ClientError> {
        std::env::var(&self.var)
            .map_err(|e| ClientError::Token(format!("{}: {e}", self.var)))
    }
}
