//! QueryBuilder: declared optional inputs to one validated filter value.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ReadError;
use crate::schema::{Filter, ResourceKind};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Volume types accepted by the volume listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
    #[default]
    Csi,
}

impl VolumeType {
    pub const ALLOWED: &'static [&'static str] = &["csi"];

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeType::Csi => "csi",
        }
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for VolumeType {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csi" => Ok(VolumeType::Csi),
            other => Err(ReadError::validation(
                "type",
                format!("expected one of {:?}, got {:?}", VolumeType::ALLOWED, other),
            )),
        }
    }
}

/// Immutable, validated filter set for one read. Filters compose conjunctively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    kind: ResourceKind,
    key: Option<String>,
    prefix: Option<String>,
    namespace: Option<String>,
    node_id: Option<String>,
    plugin_id: Option<String>,
    volume_type: Option<VolumeType>,
}

impl Query {
    /// Unconstrained query for kinds that need no inputs.
    pub fn unfiltered(kind: ResourceKind) -> Result<Self, ReadError> { QueryBuilder::new(kind).build() }

    pub fn kind(&self) -> ResourceKind { self.kind }
    pub fn key(&self) -> Option<&str> { self.key.as_deref() }
    pub fn prefix(&self) -> Option<&str> { self.prefix.as_deref() }
    pub fn namespace(&self) -> Option<&str> { self.namespace.as_deref() }
    pub fn node_id(&self) -> Option<&str> { self.node_id.as_deref() }
    pub fn plugin_id(&self) -> Option<&str> { self.plugin_id.as_deref() }
    pub fn volume_type(&self) -> Option<VolumeType> { self.volume_type }

    /// Whether `candidate` passes the prefix filter (always true when unset).
    pub fn matches_prefix(&self, candidate: &str) -> bool {
        self.prefix.as_deref().map_or(true, |p| candidate.starts_with(p))
    }

    /// Query-string pairs for the remote call, in a stable order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(t) = self.volume_type { out.push(("type", t.as_str().to_string())); }
        if let Some(p) = &self.prefix { out.push(("prefix", p.clone())); }
        if let Some(n) = &self.node_id { out.push(("node_id", n.clone())); }
        if let Some(p) = &self.plugin_id { out.push(("plugin_id", p.clone())); }
        if let Some(ns) = &self.namespace { out.push(("namespace", ns.clone())); }
        out
    }
}

/// Collects optional inputs; `build` applies defaults and validates.
///
/// Empty strings count as unset.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    kind: ResourceKind,
    key: Option<String>,
    prefix: Option<String>,
    namespace: Option<String>,
    node_id: Option<String>,
    plugin_id: Option<String>,
    volume_type: Option<String>,
}

/// A builder input that may be absent; empty strings count as absent.
pub trait FilterValue {
    fn into_filter(self) -> Option<String>;
}

impl FilterValue for &str {
    fn into_filter(self) -> Option<String> { (!self.is_empty()).then(|| self.to_string()) }
}

impl FilterValue for String {
    fn into_filter(self) -> Option<String> { (!self.is_empty()).then_some(self) }
}

impl FilterValue for Option<String> {
    fn into_filter(self) -> Option<String> { self.and_then(FilterValue::into_filter) }
}

impl FilterValue for Option<&str> {
    fn into_filter(self) -> Option<String> { self.and_then(FilterValue::into_filter) }
}

impl QueryBuilder {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind, key: None, prefix: None, namespace: None, node_id: None, plugin_id: None, volume_type: None }
    }

    pub fn key(mut self, v: impl FilterValue) -> Self { self.key = v.into_filter(); self }
    pub fn prefix(mut self, v: impl FilterValue) -> Self { self.prefix = v.into_filter(); self }
    pub fn namespace(mut self, v: impl FilterValue) -> Self { self.namespace = v.into_filter(); self }
    pub fn node_id(mut self, v: impl FilterValue) -> Self { self.node_id = v.into_filter(); self }
    pub fn plugin_id(mut self, v: impl FilterValue) -> Self { self.plugin_id = v.into_filter(); self }
    pub fn volume_type(mut self, v: impl FilterValue) -> Self { self.volume_type = v.into_filter(); self }

    pub fn build(self) -> Result<Query, ReadError> {
        let kind = self.kind;
        let given = [
            (Filter::Prefix, self.prefix.is_some()),
            (Filter::Namespace, self.namespace.is_some()),
            (Filter::NodeId, self.node_id.is_some()),
            (Filter::PluginId, self.plugin_id.is_some()),
            (Filter::VolumeType, self.volume_type.is_some()),
        ];
        for (filter, set) in given {
            if set && !kind.supports(filter) {
                return Err(ReadError::validation(filter.attribute(), format!("not supported by {}", kind)));
            }
        }

        match (kind.key_field(), &self.key) {
            (Some(field), None) => return Err(ReadError::validation(field, format!("required by {}", kind))),
            (None, Some(_)) => return Err(ReadError::validation("key", format!("{} is not keyed", kind))),
            _ => {}
        }

        let namespace = match self.namespace {
            None if kind.supports(Filter::Namespace) => Some(DEFAULT_NAMESPACE.to_string()),
            other => other,
        };
        let volume_type = match self.volume_type {
            Some(t) => Some(t.parse::<VolumeType>()?),
            None if kind.supports(Filter::VolumeType) => Some(VolumeType::default()),
            None => None,
        };

        Ok(Query {
            kind,
            key: self.key,
            prefix: self.prefix,
            namespace,
            node_id: self.node_id,
            plugin_id: self.plugin_id,
            volume_type,
        })
    }
}
