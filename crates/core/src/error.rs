//! Error taxonomy for read operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure reported by a remote call.
///
/// `status` is only populated when the backend exposes a typed status; the
/// message always carries the text the orchestrator returned, which for HTTP
/// failures embeds the status code (`Unexpected response code: 404 (...)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self { Self { status: None, message: message.into() } }

    /// Error for an HTTP status, formatted the way the orchestrator's client library formats it.
    pub fn from_status(status: u16, body: &str) -> Self {
        Self { status: Some(status), message: format!("Unexpected response code: {} ({})", status, body.trim()) }
    }
}

/// Operation name plus optional resource key, appended to surfaced errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpContext {
    pub operation: &'static str,
    pub key: Option<String>,
}

impl OpContext {
    pub fn new(operation: &'static str, key: Option<&str>) -> Self {
        Self { operation, key: key.map(|k| k.to_string()) }
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(k) => write!(f, "{} {:?}", self.operation, k),
            None => f.write_str(self.operation),
        }
    }
}

/// An output-state sink refused an assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("unknown field `{field}` for {kind}")]
    UnknownField { kind: &'static str, field: String },
    #[error("field `{field}`: expected {expected}, got {found}")]
    ShapeMismatch { field: String, expected: &'static str, found: &'static str },
    #[error("field `{field}`: {reason}")]
    Rejected { field: String, reason: String },
}

/// Errors surfaced by a read operation. Absence is never one of them.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("validation: `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("error reading {context}: {source}")]
    Transport { context: OpContext, #[source] source: RemoteError },
    #[error("error rendering {context}: {source}")]
    Serialization { context: OpContext, #[source] source: serde_json::Error },
    #[error("error setting state for {context}: {source}")]
    Commit { context: OpContext, #[source] source: SinkError },
}

impl ReadError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "invalid",
            Self::Transport { .. } => "failure",
            Self::Serialization { .. } => "serialization",
            Self::Commit { .. } => "commit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_embeds_code_in_message() {
        let e = RemoteError::from_status(404, "ACL policy not found\n");
        assert_eq!(e.status, Some(404));
        assert_eq!(e.to_string(), "Unexpected response code: 404 (ACL policy not found)");
    }

    #[test]
    fn transport_error_keeps_original_text_and_adds_context() {
        let e = ReadError::Transport {
            context: OpContext::new("acl_policy", Some("ops")),
            source: RemoteError::new("connection refused"),
        };
        assert_eq!(e.to_string(), "error reading acl_policy \"ops\": connection refused");
        let keyless = ReadError::Transport { context: OpContext::new("regions", None), source: RemoteError::new("boom") };
        assert_eq!(keyless.to_string(), "error reading regions: boom");
    }
}
