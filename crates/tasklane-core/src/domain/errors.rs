//! Errors - エラー型と分類
//!
//! Every failure that can reach the consumer lane or the reconciliation sweep
//! is classified with an [`ErrorKind`]. The lane only looks at the kind to
//! decide whether the failure is worth a dead-letter attempt; the message text
//! is for operators.

use std::fmt;

use thiserror::Error;

/// ErrorKind は実行エラーの分類
///
/// - Input: 入力不正（デコード失敗、必須項目なし、説明ルール不一致）
/// - Transient: 一時的な通信エラー（リトライ後も失敗）
/// - Api: 外部 API が非成功ステータスを返した
/// - Infrastructure: ledger / dead-letter などローカル資源の障害
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Input,
    Transient,
    Api,
    Infrastructure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Input => "input",
            ErrorKind::Transient => "transient",
            ErrorKind::Api => "api",
            ErrorKind::Infrastructure => "infrastructure",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the task and archive HTTP clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response, even after retrying.
    #[error("{operation} failed after {attempts} attempt(s): {message}")]
    Transport {
        operation: &'static str,
        attempts: u32,
        message: String,
    },

    /// The remote answered with a non-success status. Never retried.
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} returned an unreadable body: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    /// The remote answered 200 but reported an error inside the payload (GraphQL).
    #[error("{operation} reported errors: {message}")]
    Remote {
        operation: &'static str,
        message: String,
    },

    #[error("token provider failed: {0}")]
    Token(String),

    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport { .. } | ClientError::Token(_) => ErrorKind::Transient,
            ClientError::Status { .. } | ClientError::Decode { .. } | ClientError::Remote { .. } => {
                ErrorKind::Api
            }
            ClientError::Configuration(_) => ErrorKind::Infrastructure,
        }
    }

    /// HTTP status for [`ClientError::Status`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// ProcessError はメッセージ処理の失敗
///
/// Returned by the event processor instead of panicking or bubbling
/// untyped errors; the lane inspects it to decide ack-and-continue vs. halt.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct ProcessError {
    kind: ErrorKind,
    message: String,
}

impl ProcessError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Infrastructure, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ClientError> for ProcessError {
    fn from(err: ClientError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<serde_json::Error> for ProcessError {
    fn from(err: serde_json::Error) -> Self {
        Self::input(format!("json decode: {err}"))
    }
}

impl From<crate::description::DescribeError> for ProcessError {
    fn from(err: crate::description::DescribeError) -> Self {
        Self::input(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_kinds() {
        let transport = ClientError::Transport {
            operation: "create_task",
            attempts: 3,
            message: "connection refused".into(),
        };
        assert_eq!(transport.kind(), ErrorKind::Transient);

        let status = ClientError::Status {
            operation: "create_task",
            status: 400,
            body: "{\"feilmelding\":\"bad\"}".into(),
        };
        assert_eq!(status.kind(), ErrorKind::Api);
        assert_eq!(status.status(), Some(400));
        assert!(status.to_string().contains("feilmelding"));
    }

    #[test]
    fn json_errors_are_input_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProcessError::from(err);
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.message().starts_with("json decode"));
    }
}
