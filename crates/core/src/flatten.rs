//! Flattener: remote objects to flat declarative records.
//!
//! Each wire type knows its own fixed field set. List-valued fields keep the
//! ordering semantics of their resource kind: a token's policies stay an ordered
//! list, a role's linked policies become a set of `{name}` records.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};

use crate::model::{
    AclPolicy, AclPolicyListStub, AclRole, AclRoleListStub, AclRolePolicyLink, AclToken, AclTokenListStub,
    CsiVolumeListStub, Deployment, Namespace, ScalingPolicy, SchedulerConfiguration,
};
use crate::record::{FieldValue, ResourceRecord};

/// How timestamp fields are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampStyle {
    /// Keep the offset the remote sent.
    #[default]
    AsReceived,
    /// Normalize to UTC first.
    Utc,
}

impl TimestampStyle {
    /// Render as `2006-01-02 15:04:05.999999999 -0700 ZONE`: the fraction drops trailing
    /// zeros (and vanishes when zero); the zone is `UTC` at offset zero, otherwise the
    /// numeric offset again.
    pub fn render(self, ts: &DateTime<FixedOffset>) -> String {
        let frac = fraction(ts.timestamp_subsec_nanos());
        match self {
            TimestampStyle::Utc => format!("{}{} +0000 UTC", ts.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S"), frac),
            TimestampStyle::AsReceived => {
                if ts.offset().local_minus_utc() == 0 {
                    format!("{}{} +0000 UTC", ts.format("%Y-%m-%d %H:%M:%S"), frac)
                } else {
                    format!("{}{} {} {}", ts.format("%Y-%m-%d %H:%M:%S"), frac, ts.format("%z"), ts.format("%z"))
                }
            }
        }
    }
}

fn fraction(nanos: u32) -> String {
    // leap seconds report nanos past one second
    let nanos = nanos % 1_000_000_000;
    if nanos == 0 {
        return String::new();
    }
    format!(".{:09}", nanos).trim_end_matches('0').to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenOptions {
    pub timestamps: TimestampStyle,
}

impl FlattenOptions {
    pub fn with_timestamps(timestamps: TimestampStyle) -> Self { Self { timestamps } }
}

/// A remote object that flattens into one record with a fixed field set.
pub trait Flatten {
    fn flatten(&self, opts: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error>;
}

/// Flatten every element, preserving response order.
pub fn flatten_all<T: Flatten>(items: &[T], opts: &FlattenOptions) -> Result<Vec<ResourceRecord>, serde_json::Error> {
    items.iter().map(|it| it.flatten(opts)).collect()
}

/// Wrap records as an ordered list field.
pub fn record_list(records: Vec<ResourceRecord>) -> FieldValue {
    FieldValue::List(records.into_iter().map(FieldValue::from).collect())
}

/// Linked policies as a set of single-field `{name}` records.
pub fn policy_links(links: &[AclRolePolicyLink]) -> FieldValue {
    FieldValue::set(links.iter().map(|l| FieldValue::from(ResourceRecord::new().with("name", l.name.as_str()))))
}

pub fn string_list(items: &[String]) -> FieldValue {
    FieldValue::List(items.iter().map(|s| FieldValue::Str(s.clone())).collect())
}

/// Integer counters the declarative schema models as text.
pub fn decimal(n: u64) -> FieldValue { FieldValue::Str(n.to_string()) }

/// One-level map; values must already be scalars.
pub fn flat_map<V: Into<FieldValue>>(entries: impl IntoIterator<Item = (String, V)>) -> FieldValue {
    FieldValue::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect::<BTreeMap<_, _>>())
}

pub fn namespace_names(items: &[Namespace]) -> FieldValue {
    FieldValue::List(items.iter().map(|n| FieldValue::Str(n.name.clone())).collect())
}

/// Parsed job rendered as JSON text.
pub fn job_json(job: &serde_json::Value) -> Result<String, serde_json::Error> { serde_json::to_string(job) }

impl Flatten for AclPolicyListStub {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new().with("name", self.name.as_str()).with("description", self.description.as_str()))
    }
}

impl Flatten for AclPolicy {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new().with("description", self.description.as_str()).with("rules", self.rules.as_str()))
    }
}

impl Flatten for AclRole {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new()
            .with("name", self.name.as_str())
            .with("description", self.description.as_str())
            .with("policies", policy_links(&self.policies)))
    }
}

impl Flatten for AclRoleListStub {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new()
            .with("id", self.id.as_str())
            .with("name", self.name.as_str())
            .with("description", self.description.as_str())
            .with("policies", policy_links(&self.policies)))
    }
}

impl Flatten for AclToken {
    fn flatten(&self, opts: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new()
            .with("name", self.name.as_str())
            .with("type", self.r#type.as_str())
            .with("policies", string_list(&self.policies))
            .with("secret_id", self.secret_id.as_str())
            .with("global", self.global)
            .with("create_time", opts.timestamps.render(&self.create_time)))
    }
}

impl Flatten for AclTokenListStub {
    fn flatten(&self, opts: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new()
            .with("accessor_id", self.accessor_id.as_str())
            .with("name", self.name.as_str())
            .with("type", self.r#type.as_str())
            .with("policies", string_list(&self.policies))
            .with("global", self.global)
            .with("create_time", opts.timestamps.render(&self.create_time)))
    }
}

impl Flatten for Deployment {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new()
            .with("ID", self.id.as_str())
            .with("JobID", self.job_id.as_str())
            .with("JobVersion", decimal(self.job_version))
            .with("Status", self.status.as_str())
            .with("StatusDescription", self.status_description.as_str()))
    }
}

impl Flatten for ScalingPolicy {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        // The policy document nests arbitrarily deep; it travels as JSON text.
        let policy = serde_json::to_string(&self.policy)?;
        Ok(ResourceRecord::new()
            .with("enabled", self.enabled.unwrap_or(false))
            .with("type", self.r#type.as_str())
            .with("min", self.min.unwrap_or(0))
            .with("max", self.max.unwrap_or(0))
            .with("policy", policy)
            .with("target", flat_map(self.target.iter().map(|(k, v)| (k.clone(), v.as_str())))))
    }
}

impl Flatten for SchedulerConfiguration {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        let p = &self.preemption_config;
        let preemption = flat_map([
            ("batch_scheduler_enabled".to_string(), p.batch_scheduler_enabled),
            ("service_scheduler_enabled".to_string(), p.service_scheduler_enabled),
            ("system_scheduler_enabled".to_string(), p.system_scheduler_enabled),
        ]);
        Ok(ResourceRecord::new()
            .with("memory_oversubscription_enabled", self.memory_oversubscription_enabled)
            .with("scheduler_algorithm", self.scheduler_algorithm.as_str())
            .with("preemption_config", preemption))
    }
}

impl Flatten for CsiVolumeListStub {
    fn flatten(&self, _: &FlattenOptions) -> Result<ResourceRecord, serde_json::Error> {
        Ok(ResourceRecord::new()
            .with("ID", self.id.as_str())
            .with("ExternalID", self.external_id.as_str())
            .with("Namespace", self.namespace.as_str())
            .with("Name", self.name.as_str())
            .with("AccessMode", self.access_mode.to_string())
            .with("AttachmentMode", self.attachment_mode.to_string()))
    }
}
