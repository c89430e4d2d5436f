//! Identity used by callers as the "does this resource exist" signal.

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::classify::Outcome;

/// Identity of a read result. `Cleared` means the resource does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Cleared,
    /// Natural key taken from the resource (name, accessor id, policy id).
    Natural(String),
    /// Derived from the query endpoint; stable across reads with the same target.
    Endpoint(String),
    /// Fresh opaque token; not stable across reads.
    Ephemeral(String),
}

impl Identity {
    /// Rendered form; empty when cleared.
    pub fn as_str(&self) -> &str {
        match self {
            Identity::Cleared => "",
            Identity::Natural(s) | Identity::Endpoint(s) | Identity::Ephemeral(s) => s,
        }
    }

    pub fn is_cleared(&self) -> bool { matches!(self, Identity::Cleared) }
    pub fn exists(&self) -> bool { !self.is_cleared() }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> { serializer.serialize_str(self.as_str()) }
}

/// How a resource kind derives its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRule {
    NaturalKey,
    /// Resource path under the endpoint address, e.g. `v1/namespaces`.
    Endpoint(&'static str),
    Ephemeral,
}

/// Computes identities against one endpoint address.
#[derive(Debug, Clone)]
pub struct IdentityAssigner {
    address: String,
}

impl IdentityAssigner {
    pub fn new(address: impl Into<String>) -> Self { Self { address: address.into() } }

    pub fn address(&self) -> &str { &self.address }

    /// Identity for a present resource. A natural-key rule without a usable key yields `Cleared`.
    pub fn assign(&self, rule: IdentityRule, natural_key: Option<&str>) -> Identity {
        match rule {
            IdentityRule::NaturalKey => match natural_key {
                Some(k) if !k.is_empty() => Identity::Natural(k.to_string()),
                _ => Identity::Cleared,
            },
            IdentityRule::Endpoint(path) => Identity::Endpoint(format!(
                "{}/{}",
                self.address.trim_end_matches('/'),
                path.trim_start_matches('/')
            )),
            IdentityRule::Ephemeral => Identity::Ephemeral(Uuid::new_v4().to_string()),
        }
    }

    /// Identity for a classified outcome: absent always clears, whatever the rule.
    pub fn for_outcome<T>(&self, rule: IdentityRule, natural_key: Option<&str>, outcome: &Outcome<T>) -> Identity {
        match outcome {
            Outcome::Success(_) => self.assign(rule, natural_key),
            Outcome::Absent | Outcome::Failure(_) => Identity::Cleared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;

    #[test]
    fn endpoint_identity_is_stable_and_content_independent() {
        let a = IdentityAssigner::new("http://127.0.0.1:4646/");
        let first = a.assign(IdentityRule::Endpoint("v1/namespaces"), None);
        let second = a.assign(IdentityRule::Endpoint("/v1/namespaces"), Some("ignored"));
        assert_eq!(first.as_str(), "http://127.0.0.1:4646/v1/namespaces");
        assert_eq!(first, second);
    }

    #[test]
    fn ephemeral_identity_changes_per_call() {
        let a = IdentityAssigner::new("http://nomad:4646");
        let x = a.assign(IdentityRule::Ephemeral, None);
        let y = a.assign(IdentityRule::Ephemeral, None);
        assert!(x.exists() && y.exists());
        assert_ne!(x, y);
    }

    #[test]
    fn absent_clears_regardless_of_rule() {
        let a = IdentityAssigner::new("http://nomad:4646");
        let absent: Outcome<()> = Outcome::Absent;
        for rule in [IdentityRule::NaturalKey, IdentityRule::Endpoint("v1/regions"), IdentityRule::Ephemeral] {
            let id = a.for_outcome(rule, Some("key"), &absent);
            assert!(id.is_cleared());
            assert_eq!(id.as_str(), "");
        }
        let failed: Outcome<()> = Outcome::Failure(RemoteError::new("boom"));
        assert!(a.for_outcome(IdentityRule::NaturalKey, Some("key"), &failed).is_cleared());
    }

    #[test]
    fn natural_key_is_used_verbatim() {
        let a = IdentityAssigner::new("http://nomad:4646");
        assert_eq!(a.assign(IdentityRule::NaturalKey, Some("ops-readonly")), Identity::Natural("ops-readonly".into()));
        assert!(a.assign(IdentityRule::NaturalKey, Some("")).is_cleared());
    }
}
