//! Classification of remote call outcomes into success, absence or failure.
//!
//! The orchestrator reports a missing resource through its generic error channel, so
//! "not found" has to be recognized from the error itself. All call sites go through
//! [`ResultClassifier`]; the matching rule is swappable via [`NotFoundRule`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::RemoteError;

/// Classified outcome of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    /// The remote reported the resource as missing. Not an error.
    Absent,
    Failure(RemoteError),
}

impl<T> Outcome<T> {
    pub fn is_absent(&self) -> bool { matches!(self, Outcome::Absent) }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Absent => "absent",
            Outcome::Failure(_) => "failure",
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(v) => Outcome::Success(f(v)),
            Outcome::Absent => Outcome::Absent,
            Outcome::Failure(e) => Outcome::Failure(e),
        }
    }
}

/// Decides whether a remote error means "resource not found".
pub trait NotFoundRule: fmt::Debug + Send + Sync {
    fn is_not_found(&self, err: &RemoteError) -> bool;
}

/// Matches the status text embedded in the error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRule;

impl NotFoundRule for MessageRule {
    fn is_not_found(&self, err: &RemoteError) -> bool { err.message.contains("404") }
}

/// Prefers a typed status when the backend supplied one; falls back to [`MessageRule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOrMessageRule;

impl NotFoundRule for StatusOrMessageRule {
    fn is_not_found(&self, err: &RemoteError) -> bool {
        match err.status {
            Some(code) => code == 404,
            None => MessageRule.is_not_found(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultClassifier {
    rule: Arc<dyn NotFoundRule>,
}

impl Default for ResultClassifier {
    fn default() -> Self { Self::new(StatusOrMessageRule) }
}

impl ResultClassifier {
    pub fn new(rule: impl NotFoundRule + 'static) -> Self { Self { rule: Arc::new(rule) } }

    pub fn classify<T>(&self, result: Result<T, RemoteError>) -> Outcome<T> {
        match result {
            Ok(v) => Outcome::Success(v),
            Err(e) if self.rule.is_not_found(&e) => {
                debug!(error = %e, "classified as absent");
                Outcome::Absent
            }
            Err(e) => Outcome::Failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_passes_value_through() {
        let c = ResultClassifier::default();
        assert_eq!(c.classify::<u32>(Ok(7)), Outcome::Success(7));
    }

    #[test]
    fn embedded_404_is_absent() {
        let c = ResultClassifier::default();
        let e = RemoteError::new("Unexpected response code: 404 (ACL role not found)");
        assert!(c.classify::<()>(Err(e)).is_absent());
    }

    #[test]
    fn other_errors_keep_original_text() {
        let c = ResultClassifier::default();
        let e = RemoteError::from_status(500, "rpc error: leader unknown");
        match c.classify::<()>(Err(e.clone())) {
            Outcome::Failure(got) => assert_eq!(got, e),
            other => panic!("expected failure, got {:?}", other.label()),
        }
    }

    #[test]
    fn typed_status_wins_over_message_text() {
        let c = ResultClassifier::default();
        // 403 whose body happens to mention 404
        let e = RemoteError { status: Some(403), message: "Unexpected response code: 403 (token 404abc denied)".into() };
        assert!(!c.classify::<()>(Err(e.clone())).is_absent());
        // the pure message rule cannot tell the difference
        assert!(ResultClassifier::new(MessageRule).classify::<()>(Err(e)).is_absent());
        let typed = RemoteError { status: Some(404), message: "gone".into() };
        assert!(c.classify::<()>(Err(typed)).is_absent());
    }
}
