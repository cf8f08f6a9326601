//! Retry policy for outbound HTTP calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::ClientError;
use crate::redact::{Masked, mask_pii};

/// Retry policy for transport failures.
///
/// Only failures where no HTTP response came back are retried. A response
/// with an error status is the remote's answer and is surfaced as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Pause before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `call` until it succeeds or `max_attempts` is reached.
    ///
    /// Error text is masked before it is logged or returned.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let message = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err.to_string(),
            };
            if attempts >= self.max_attempts {
                return Err(ClientError::Transport {
                    operation,
                    attempts,
                    message: mask_pii(&message).into_owned(),
                });
            }
            warn!(
                operation,
                attempts,
                delay_ms = self.delay.as_millis() as u64,
                error = %Masked(&message),
                "transport failure, retrying"
            );
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(500))
    }
}
