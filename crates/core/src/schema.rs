//! Resource-kind descriptors: filters, output-state fields, identity rule.
//!
//! This module provides:
//! - The fixed set of resource kinds this layer normalizes
//! - Per-kind output-state field specs (names, shapes, sensitivity)
//! - Per-kind filter support, identity rule and timestamp style

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ReadError;
use crate::flatten::TimestampStyle;
use crate::identity::IdentityRule;
use crate::record::FieldValue;

/// Shape of an output-state field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Bool,
    Int,
    Str,
    /// Flat string-keyed map with scalar values of the inner shape.
    Map(&'static Shape),
    List(&'static Shape),
    Set(&'static Shape),
    Record(&'static [FieldSpec]),
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Bool => "bool",
            Shape::Int => "int",
            Shape::Str => "string",
            Shape::Map(_) => "map",
            Shape::List(_) => "list",
            Shape::Set(_) => "set",
            Shape::Record(_) => "record",
        }
    }

    /// Whether `value` conforms to this shape, recursively.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Shape::Bool, FieldValue::Bool(_)) | (Shape::Int, FieldValue::Int(_)) | (Shape::Str, FieldValue::Str(_)) => true,
            (Shape::Map(inner), FieldValue::Map(m)) => m.values().all(|v| inner.accepts(v)),
            (Shape::List(inner), FieldValue::List(items)) | (Shape::Set(inner), FieldValue::Set(items)) => {
                items.iter().all(|v| inner.accepts(v))
            }
            (Shape::Record(specs), FieldValue::Record(rec)) => {
                rec.len() == specs.len()
                    && specs.iter().zip(rec.iter()).all(|(spec, (name, v))| spec.name == name && spec.shape.accepts(v))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: Shape,
    /// Caller-provided rather than computed by the read.
    pub input: bool,
    pub sensitive: bool,
}

impl FieldSpec {
    const fn computed(name: &'static str, shape: Shape) -> Self { Self { name, shape, input: false, sensitive: false } }
    const fn input(name: &'static str, shape: Shape) -> Self { Self { name, shape, input: true, sensitive: false } }
    const fn sensitive(name: &'static str, shape: Shape) -> Self { Self { name, shape, input: false, sensitive: true } }
}

/// Optional query filters a kind may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Prefix,
    Namespace,
    NodeId,
    PluginId,
    VolumeType,
}

impl Filter {
    pub fn attribute(&self) -> &'static str {
        match self {
            Filter::Prefix => "prefix",
            Filter::Namespace => "namespace",
            Filter::NodeId => "node_id",
            Filter::PluginId => "plugin_id",
            Filter::VolumeType => "type",
        }
    }
}

// ---------------- Record field sets (stable order) ----------------

const POLICY_LINK: &[FieldSpec] = &[FieldSpec::computed("name", Shape::Str)];

const POLICY_STUB: &[FieldSpec] = &[
    FieldSpec::computed("name", Shape::Str),
    FieldSpec::computed("description", Shape::Str),
];

const ROLE_STUB: &[FieldSpec] = &[
    FieldSpec::computed("id", Shape::Str),
    FieldSpec::computed("name", Shape::Str),
    FieldSpec::computed("description", Shape::Str),
    FieldSpec::computed("policies", Shape::Set(&Shape::Record(POLICY_LINK))),
];

const TOKEN_STUB: &[FieldSpec] = &[
    FieldSpec::computed("accessor_id", Shape::Str),
    FieldSpec::computed("name", Shape::Str),
    FieldSpec::computed("type", Shape::Str),
    FieldSpec::computed("policies", Shape::List(&Shape::Str)),
    FieldSpec::computed("global", Shape::Bool),
    FieldSpec::computed("create_time", Shape::Str),
];

const DEPLOYMENT: &[FieldSpec] = &[
    FieldSpec::computed("ID", Shape::Str),
    FieldSpec::computed("JobID", Shape::Str),
    FieldSpec::computed("JobVersion", Shape::Str),
    FieldSpec::computed("Status", Shape::Str),
    FieldSpec::computed("StatusDescription", Shape::Str),
];

const VOLUME: &[FieldSpec] = &[
    FieldSpec::computed("ID", Shape::Str),
    FieldSpec::computed("ExternalID", Shape::Str),
    FieldSpec::computed("Namespace", Shape::Str),
    FieldSpec::computed("Name", Shape::Str),
    FieldSpec::computed("AccessMode", Shape::Str),
    FieldSpec::computed("AttachmentMode", Shape::Str),
];

// ---------------- Output-state schemas per kind ----------------

const ACL_POLICIES: &[FieldSpec] = &[
    FieldSpec::input("prefix", Shape::Str),
    FieldSpec::computed("policies", Shape::List(&Shape::Record(POLICY_STUB))),
];

const ACL_POLICY: &[FieldSpec] = &[
    FieldSpec::input("name", Shape::Str),
    FieldSpec::computed("description", Shape::Str),
    FieldSpec::computed("rules", Shape::Str),
];

const ACL_ROLE: &[FieldSpec] = &[
    FieldSpec::input("id", Shape::Str),
    FieldSpec::computed("name", Shape::Str),
    FieldSpec::computed("description", Shape::Str),
    FieldSpec::computed("policies", Shape::Set(&Shape::Record(POLICY_LINK))),
];

const ACL_ROLES: &[FieldSpec] = &[
    FieldSpec::input("prefix", Shape::Str),
    FieldSpec::computed("acl_roles", Shape::List(&Shape::Record(ROLE_STUB))),
];

const ACL_TOKEN: &[FieldSpec] = &[
    FieldSpec::input("accessor_id", Shape::Str),
    FieldSpec::computed("name", Shape::Str),
    FieldSpec::computed("type", Shape::Str),
    FieldSpec::computed("policies", Shape::List(&Shape::Str)),
    FieldSpec::sensitive("secret_id", Shape::Str),
    FieldSpec::computed("global", Shape::Bool),
    FieldSpec::computed("create_time", Shape::Str),
];

const ACL_TOKENS: &[FieldSpec] = &[
    FieldSpec::input("prefix", Shape::Str),
    FieldSpec::computed("acl_tokens", Shape::List(&Shape::Record(TOKEN_STUB))),
];

const DEPLOYMENTS: &[FieldSpec] = &[FieldSpec::computed("deployments", Shape::List(&Shape::Record(DEPLOYMENT)))];

const JOB_PARSER: &[FieldSpec] = &[
    FieldSpec::input("hcl", Shape::Str),
    FieldSpec::input("canonicalize", Shape::Bool),
    FieldSpec::computed("json", Shape::Str),
];

const NAMESPACES: &[FieldSpec] = &[FieldSpec::computed("namespaces", Shape::List(&Shape::Str))];

const REGIONS: &[FieldSpec] = &[FieldSpec::computed("regions", Shape::List(&Shape::Str))];

const SCALING_POLICY: &[FieldSpec] = &[
    FieldSpec::input("id", Shape::Str),
    FieldSpec::computed("enabled", Shape::Bool),
    FieldSpec::computed("type", Shape::Str),
    FieldSpec::computed("min", Shape::Int),
    FieldSpec::computed("max", Shape::Int),
    FieldSpec::computed("policy", Shape::Str),
    FieldSpec::computed("target", Shape::Map(&Shape::Str)),
];

const SCHEDULER_CONFIG: &[FieldSpec] = &[
    FieldSpec::computed("memory_oversubscription_enabled", Shape::Bool),
    FieldSpec::computed("scheduler_algorithm", Shape::Str),
    FieldSpec::computed("preemption_config", Shape::Map(&Shape::Bool)),
];

const VOLUMES: &[FieldSpec] = &[
    FieldSpec::input("type", Shape::Str),
    FieldSpec::input("node_id", Shape::Str),
    FieldSpec::input("plugin_id", Shape::Str),
    FieldSpec::input("namespace", Shape::Str),
    FieldSpec::computed("volumes", Shape::List(&Shape::Record(VOLUME))),
];

/// Resource kinds normalized by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    AclPolicies,
    AclPolicy,
    AclRole,
    AclRoles,
    AclToken,
    AclTokens,
    Deployments,
    JobParser,
    Namespaces,
    Regions,
    ScalingPolicy,
    SchedulerConfig,
    Volumes,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 13] = [
        ResourceKind::AclPolicies,
        ResourceKind::AclPolicy,
        ResourceKind::AclRole,
        ResourceKind::AclRoles,
        ResourceKind::AclToken,
        ResourceKind::AclTokens,
        ResourceKind::Deployments,
        ResourceKind::JobParser,
        ResourceKind::Namespaces,
        ResourceKind::Regions,
        ResourceKind::ScalingPolicy,
        ResourceKind::SchedulerConfig,
        ResourceKind::Volumes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::AclPolicies => "acl_policies",
            ResourceKind::AclPolicy => "acl_policy",
            ResourceKind::AclRole => "acl_role",
            ResourceKind::AclRoles => "acl_roles",
            ResourceKind::AclToken => "acl_token",
            ResourceKind::AclTokens => "acl_tokens",
            ResourceKind::Deployments => "deployments",
            ResourceKind::JobParser => "job_parser",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::Regions => "regions",
            ResourceKind::ScalingPolicy => "scaling_policy",
            ResourceKind::SchedulerConfig => "scheduler_config",
            ResourceKind::Volumes => "volumes",
        }
    }

    /// Output-state schema, inputs first.
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            ResourceKind::AclPolicies => ACL_POLICIES,
            ResourceKind::AclPolicy => ACL_POLICY,
            ResourceKind::AclRole => ACL_ROLE,
            ResourceKind::AclRoles => ACL_ROLES,
            ResourceKind::AclToken => ACL_TOKEN,
            ResourceKind::AclTokens => ACL_TOKENS,
            ResourceKind::Deployments => DEPLOYMENTS,
            ResourceKind::JobParser => JOB_PARSER,
            ResourceKind::Namespaces => NAMESPACES,
            ResourceKind::Regions => REGIONS,
            ResourceKind::ScalingPolicy => SCALING_POLICY,
            ResourceKind::SchedulerConfig => SCHEDULER_CONFIG,
            ResourceKind::Volumes => VOLUMES,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> { self.fields().iter().find(|f| f.name == name) }

    pub fn filters(&self) -> &'static [Filter] {
        match self {
            ResourceKind::AclPolicies | ResourceKind::AclRoles | ResourceKind::AclTokens => &[Filter::Prefix],
            ResourceKind::Volumes => &[Filter::VolumeType, Filter::NodeId, Filter::PluginId, Filter::Namespace],
            _ => &[],
        }
    }

    pub fn supports(&self, filter: Filter) -> bool { self.filters().contains(&filter) }

    /// Input attribute carrying the natural key for singleton lookups.
    pub fn key_field(&self) -> Option<&'static str> {
        match self {
            ResourceKind::AclPolicy => Some("name"),
            ResourceKind::AclRole | ResourceKind::ScalingPolicy => Some("id"),
            ResourceKind::AclToken => Some("accessor_id"),
            _ => None,
        }
    }

    /// Field holding the records of a collection read.
    pub fn collection_field(&self) -> Option<&'static str> {
        match self {
            ResourceKind::AclPolicies => Some("policies"),
            ResourceKind::AclRoles => Some("acl_roles"),
            ResourceKind::AclTokens => Some("acl_tokens"),
            ResourceKind::Deployments => Some("deployments"),
            ResourceKind::Namespaces => Some("namespaces"),
            ResourceKind::Regions => Some("regions"),
            ResourceKind::Volumes => Some("volumes"),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool { self.collection_field().is_some() }

    pub fn identity_rule(&self) -> IdentityRule {
        match self {
            ResourceKind::AclPolicies => IdentityRule::Endpoint("v1/acl/policies"),
            ResourceKind::AclRoles => IdentityRule::Endpoint("v1/acl/roles"),
            ResourceKind::AclTokens => IdentityRule::Endpoint("v1/acl/tokens"),
            ResourceKind::Deployments => IdentityRule::Endpoint("v1/deployments"),
            ResourceKind::Namespaces => IdentityRule::Endpoint("v1/namespaces"),
            ResourceKind::Regions => IdentityRule::Endpoint("v1/regions"),
            ResourceKind::Volumes => IdentityRule::Endpoint("v1/volumes"),
            ResourceKind::SchedulerConfig => IdentityRule::Ephemeral,
            ResourceKind::AclPolicy
            | ResourceKind::AclRole
            | ResourceKind::AclToken
            | ResourceKind::ScalingPolicy
            | ResourceKind::JobParser => IdentityRule::NaturalKey,
        }
    }

    /// Singleton token lookups normalize to UTC; the token listing keeps the received offset.
    pub fn timestamp_style(&self) -> TimestampStyle {
        match self {
            ResourceKind::AclToken => TimestampStyle::Utc,
            _ => TimestampStyle::AsReceived,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for ResourceKind {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ReadError::validation("kind", format!("unknown resource kind {:?}", s)))
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> { serializer.serialize_str(self.name()) }
}
