//! Writing flattened records into caller-owned output state.
//!
//! Commits are best-effort: every field is attempted even after one fails, and the
//! first failure is the one reported.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::warn;

use crate::error::SinkError;
use crate::identity::Identity;
use crate::record::{FieldValue, ResourceRecord};
use crate::schema::ResourceKind;

const REDACTED: &str = "<sensitive>";

/// Caller-owned output state for one read.
pub trait StateSink {
    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), SinkError>;
    fn set_identity(&mut self, identity: Identity);
}

/// Commits fields to a sink, continuing past failures.
pub struct FieldCommitter<'a, S: StateSink + ?Sized> {
    sink: &'a mut S,
    attempted: Vec<String>,
    first_error: Option<SinkError>,
}

impl<'a, S: StateSink + ?Sized> FieldCommitter<'a, S> {
    pub fn new(sink: &'a mut S) -> Self { Self { sink, attempted: Vec::new(), first_error: None } }

    pub fn commit(&mut self, name: &str, value: FieldValue) {
        self.attempted.push(name.to_string());
        if let Err(e) = self.sink.set(name, value) {
            warn!(field = %name, error = %e, "commit: field rejected");
            if self.first_error.is_none() {
                self.first_error = Some(e);
            }
        }
    }

    pub fn commit_record(&mut self, record: ResourceRecord) {
        for (name, value) in record {
            self.commit(name, value);
        }
    }

    /// Field names attempted so far, in order.
    pub fn attempted(&self) -> &[String] { &self.attempted }

    pub fn finalize(self) -> Result<(), SinkError> {
        match self.first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Schema-checked in-memory output state.
#[derive(Debug, Clone)]
pub struct ResourceState {
    kind: ResourceKind,
    identity: Identity,
    fields: ResourceRecord,
}

impl ResourceState {
    pub fn new(kind: ResourceKind) -> Self { Self { kind, identity: Identity::Cleared, fields: ResourceRecord::new() } }

    pub fn kind(&self) -> ResourceKind { self.kind }
    pub fn identity(&self) -> &Identity { &self.identity }
    pub fn exists(&self) -> bool { self.identity.exists() }
    pub fn get(&self, field: &str) -> Option<&FieldValue> { self.fields.get(field) }
    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn fields(&self) -> &ResourceRecord { &self.fields }

    /// Fields in commit order, sensitive values replaced.
    pub fn redacted(&self) -> Vec<(&'static str, FieldValue)> {
        self.fields
            .iter()
            .map(|(name, v)| {
                let sensitive = self.kind.field(name).map_or(false, |spec| spec.sensitive);
                (name, if sensitive { FieldValue::str(REDACTED) } else { v.clone() })
            })
            .collect()
    }

    /// Number of records in the collection field, if this kind has one.
    pub fn collection_len(&self) -> Option<usize> {
        let field = self.kind.collection_field()?;
        self.fields.get(field).and_then(|v| v.items()).map(|items| items.len())
    }
}

impl StateSink for ResourceState {
    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), SinkError> {
        let spec = self
            .kind
            .field(field)
            .ok_or_else(|| SinkError::UnknownField { kind: self.kind.name(), field: field.to_string() })?;
        if !spec.shape.accepts(&value) {
            return Err(SinkError::ShapeMismatch {
                field: field.to_string(),
                expected: spec.shape.name(),
                found: value.kind_name(),
            });
        }
        self.fields.push(spec.name, value);
        Ok(())
    }

    fn set_identity(&mut self, identity: Identity) { self.identity = identity; }
}

impl Serialize for ResourceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("id", &self.identity)?;
        for (name, v) in self.fields.iter() {
            map.serialize_entry(name, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that rejects one named field and records everything it sees.
    #[derive(Default)]
    struct PickySink {
        reject: Vec<&'static str>,
        seen: Vec<String>,
        identity: Identity,
    }

    impl StateSink for PickySink {
        fn set(&mut self, field: &str, _value: FieldValue) -> Result<(), SinkError> {
            self.seen.push(field.to_string());
            if self.reject.iter().any(|r| *r == field) {
                return Err(SinkError::Rejected { field: field.to_string(), reason: "read-only".into() });
            }
            Ok(())
        }
        fn set_identity(&mut self, identity: Identity) { self.identity = identity; }
    }

    fn five_fields() -> ResourceRecord {
        ResourceRecord::new().with("a", "1").with("b", "2").with("c", "3").with("d", "4").with("e", "5")
    }

    #[test]
    fn all_fields_attempted_when_one_fails() {
        let mut sink = PickySink { reject: vec!["c"], ..Default::default() };
        let mut c = FieldCommitter::new(&mut sink);
        c.commit_record(five_fields());
        assert_eq!(c.attempted().len(), 5);
        let err = c.finalize().unwrap_err();
        assert_eq!(err, SinkError::Rejected { field: "c".into(), reason: "read-only".into() });
        assert_eq!(sink.seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn first_error_wins() {
        let mut sink = PickySink { reject: vec!["b", "d"], ..Default::default() };
        let mut c = FieldCommitter::new(&mut sink);
        c.commit_record(five_fields());
        match c.finalize() {
            Err(SinkError::Rejected { field, .. }) => assert_eq!(field, "b"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clean_commit_finalizes_ok() {
        let mut sink = PickySink::default();
        let mut c = FieldCommitter::new(&mut sink);
        c.commit("only", FieldValue::Bool(true));
        assert!(c.finalize().is_ok());
    }

    #[test]
    fn resource_state_checks_schema() {
        let mut st = ResourceState::new(ResourceKind::AclPolicy);
        assert!(st.set("rules", FieldValue::str("namespace \"*\" {}")).is_ok());
        assert!(matches!(st.set("bogus", FieldValue::str("x")), Err(SinkError::UnknownField { .. })));
        match st.set("description", FieldValue::Bool(true)) {
            Err(SinkError::ShapeMismatch { expected, found, .. }) => {
                assert_eq!(expected, "string");
                assert_eq!(found, "bool");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(st.len(), 1);
        assert!(!st.exists());
    }

    #[test]
    fn redaction_hides_sensitive_fields_only() {
        let mut st = ResourceState::new(ResourceKind::AclToken);
        st.set("name", FieldValue::str("ci")).expect("name");
        st.set("secret_id", FieldValue::str("s3cr3t")).expect("secret");
        let shown = st.redacted();
        assert_eq!(shown[0], ("name", FieldValue::str("ci")));
        assert_eq!(shown[1], ("secret_id", FieldValue::str(REDACTED)));
        assert_eq!(st.get("secret_id").and_then(|v| v.as_str()), Some("s3cr3t"));
    }

    #[test]
    fn serialized_state_leads_with_identity() {
        let mut st = ResourceState::new(ResourceKind::Regions);
        st.set_identity(Identity::Endpoint("http://n:4646/v1/regions".into()));
        st.set("regions", FieldValue::List(vec!["global".into()])).expect("regions");
        let json = serde_json::to_string(&st).expect("json");
        assert_eq!(json, r#"{"id":"http://n:4646/v1/regions","regions":["global"]}"#);
        assert_eq!(st.collection_len(), Some(1));
    }
}
