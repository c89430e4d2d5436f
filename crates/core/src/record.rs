//! Flat declarative records produced by the flattener.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use smallvec::SmallVec;

/// A value assignable to an output-state field.
///
/// Records nest at most one level: a `Map` holds scalars only, and `List`/`Set`
/// elements are scalars or records whose own fields are scalars, maps or lists.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Map(BTreeMap<String, FieldValue>),
    /// Ordered sequence; equality is positional.
    List(Vec<FieldValue>),
    /// Unordered collection; equality ignores element order.
    Set(Vec<FieldValue>),
    Record(Box<ResourceRecord>),
}

impl FieldValue {
    pub fn str(s: impl Into<String>) -> Self { Self::Str(s.into()) }

    /// Build a set, dropping duplicate elements while keeping first-seen order.
    pub fn set(items: impl IntoIterator<Item = FieldValue>) -> Self {
        let mut out: Vec<FieldValue> = Vec::new();
        for it in items {
            if !out.contains(&it) { out.push(it); }
        }
        Self::Set(out)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Record(_) => "record",
        }
    }

    pub fn as_str(&self) -> Option<&str> { if let Self::Str(s) = self { Some(s) } else { None } }
    pub fn as_bool(&self) -> Option<bool> { if let Self::Bool(b) = self { Some(*b) } else { None } }
    pub fn as_int(&self) -> Option<i64> { if let Self::Int(i) = self { Some(*i) } else { None } }
    pub fn as_record(&self) -> Option<&ResourceRecord> { if let Self::Record(r) = self { Some(r.as_ref()) } else { None } }

    /// Elements of a list or set.
    pub fn items(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(v) | Self::Set(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Set(a), Set(b)) => a.len() == b.len() && a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x)),
            (Record(a), Record(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for FieldValue { fn from(v: bool) -> Self { Self::Bool(v) } }
impl From<i64> for FieldValue { fn from(v: i64) -> Self { Self::Int(v) } }
impl From<String> for FieldValue { fn from(v: String) -> Self { Self::Str(v) } }
impl From<&str> for FieldValue { fn from(v: &str) -> Self { Self::Str(v.to_string()) } }
impl From<ResourceRecord> for FieldValue { fn from(v: ResourceRecord) -> Self { Self::Record(Box::new(v)) } }

/// Ordered mapping from fixed field names to values.
///
/// Field order is the flattener's insertion order, which is fixed per resource kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceRecord {
    fields: SmallVec<[(&'static str, FieldValue); 8]>,
}

impl ResourceRecord {
    pub fn new() -> Self { Self::default() }

    /// Append a field (builder style).
    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field, replacing an earlier value with the same name in place.
    pub fn push(&mut self, name: &'static str, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> Vec<&'static str> { self.fields.iter().map(|(n, _)| *n).collect() }
    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> { self.fields.iter().map(|(n, v)| (*n, v)) }
}

impl IntoIterator for ResourceRecord {
    type Item = (&'static str, FieldValue);
    type IntoIter = smallvec::IntoIter<[(&'static str, FieldValue); 8]>;
    fn into_iter(self) -> Self::IntoIter { self.fields.into_iter() }
}

impl Serialize for ResourceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in self.fields.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_equality_ignores_order_but_list_does_not() {
        let a = FieldValue::set(vec![FieldValue::from("x"), FieldValue::from("y")]);
        let b = FieldValue::set(vec![FieldValue::from("y"), FieldValue::from("x")]);
        assert_eq!(a, b);
        let la = FieldValue::List(vec!["x".into(), "y".into()]);
        let lb = FieldValue::List(vec!["y".into(), "x".into()]);
        assert_ne!(la, lb);
    }

    #[test]
    fn set_drops_duplicates() {
        let s = FieldValue::set(vec![FieldValue::from("a"), FieldValue::from("a"), FieldValue::from("b")]);
        assert_eq!(s.items().map(|v| v.len()), Some(2));
    }

    #[test]
    fn record_serializes_in_insertion_order() {
        let r = ResourceRecord::new().with("zeta", "1").with("alpha", true).with("mid", 3i64);
        let json = serde_json::to_string(&r).expect("serialize");
        assert_eq!(json, r#"{"zeta":"1","alpha":true,"mid":3}"#);
        assert_eq!(r.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn records_nest_inside_lists_and_sets() {
        let link = |n: &str| FieldValue::from(ResourceRecord::new().with("name", n));
        let role = ResourceRecord::new()
            .with("id", "r-1")
            .with("policies", FieldValue::set(vec![link("ops"), link("dev"), link("ops")]));
        let list = FieldValue::List(vec![FieldValue::from(role)]);
        let first = list.items().and_then(|i| i.first()).and_then(|v| v.as_record()).expect("record");
        assert_eq!(first.get("policies").and_then(|p| p.items()).map(|p| p.len()), Some(2));
        assert_eq!(
            serde_json::to_string(&list).expect("serialize"),
            r#"[{"id":"r-1","policies":[{"name":"ops"},{"name":"dev"}]}]"#
        );
    }

    #[test]
    fn push_replaces_existing_field_in_place() {
        let mut r = ResourceRecord::new().with("a", "1").with("b", "2");
        r.push("a", "3");
        assert_eq!(r.names(), vec!["a", "b"]);
        assert_eq!(r.get("a").and_then(|v| v.as_str()), Some("3"));
    }
}
