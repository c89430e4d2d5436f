//! Wire model for the orchestrator's HTTP API (PascalCase JSON).
//!
//! Only the fields the flattener reads, plus the bookkeeping indexes, are modeled;
//! unknown fields are ignored on decode.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Decode `null` as the type's default (the API emits `null` for empty slices).
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AclPolicyListStub {
    pub name: String,
    pub description: String,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AclPolicy {
    pub name: String,
    pub description: String,
    pub rules: String,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AclRolePolicyLink {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AclRole {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "null_default")]
    pub policies: Vec<AclRolePolicyLink>,
    pub create_index: u64,
    pub modify_index: u64,
}

/// Listing entry for roles; same shape as the full role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AclRoleListStub {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "null_default")]
    pub policies: Vec<AclRolePolicyLink>,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AclTokenRoleLink {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AclToken {
    #[serde(rename = "AccessorID")]
    pub accessor_id: String,
    #[serde(rename = "SecretID", default)]
    pub secret_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub policies: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub roles: Vec<AclTokenRoleLink>,
    #[serde(default)]
    pub global: bool,
    pub create_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub expiration_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AclTokenListStub {
    #[serde(rename = "AccessorID")]
    pub accessor_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub policies: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub roles: Vec<AclTokenRoleLink>,
    #[serde(default)]
    pub global: bool,
    pub create_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub expiration_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Deployment {
    #[serde(rename = "ID")]
    pub id: String,
    pub namespace: String,
    #[serde(rename = "JobID")]
    pub job_id: String,
    pub job_version: u64,
    pub status: String,
    pub status_description: String,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Namespace {
    pub name: String,
    pub description: String,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScalingPolicy {
    #[serde(rename = "ID")]
    pub id: String,
    pub namespace: String,
    pub r#type: String,
    #[serde(deserialize_with = "null_default")]
    pub target: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_default")]
    pub policy: serde_json::Map<String, serde_json::Value>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub enabled: Option<bool>,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PreemptionConfig {
    pub system_scheduler_enabled: bool,
    pub sys_batch_scheduler_enabled: bool,
    pub batch_scheduler_enabled: bool,
    pub service_scheduler_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SchedulerConfiguration {
    pub scheduler_algorithm: String,
    pub preemption_config: PreemptionConfig,
    pub memory_oversubscription_enabled: bool,
    pub reject_job_registration: bool,
    pub pause_eval_broker: bool,
    pub create_index: u64,
    pub modify_index: u64,
}

/// Envelope returned by the scheduler configuration endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SchedulerConfigurationResponse {
    pub scheduler_config: Option<SchedulerConfiguration>,
    pub index: u64,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            /// Empty on the wire.
            #[default]
            Unset,
            $($variant,)+
            /// A value this client does not know about; kept verbatim.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    Self::Unset => "",
                    $(Self::$variant => $text,)+
                    Self::Other(s) => s,
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    "" => Self::Unset,
                    $($text => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self { v.as_str().to_string() }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

string_enum!(
    /// CSI volume access mode.
    AccessMode {
        SingleNodeReaderOnly => "single-node-reader-only",
        SingleNodeWriter => "single-node-writer",
        MultiNodeReaderOnly => "multi-node-reader-only",
        MultiNodeSingleWriter => "multi-node-single-writer",
        MultiNodeMultiWriter => "multi-node-multi-writer",
    }
);

string_enum!(
    /// CSI volume attachment mode.
    AttachmentMode {
        FileSystem => "file-system",
        BlockDevice => "block-device",
    }
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CsiVolumeListStub {
    #[serde(rename = "ID")]
    pub id: String,
    pub namespace: String,
    pub name: String,
    #[serde(rename = "ExternalID")]
    pub external_id: String,
    pub access_mode: AccessMode,
    pub attachment_mode: AttachmentMode,
    pub schedulable: bool,
    #[serde(rename = "PluginID")]
    pub plugin_id: String,
    pub provider: String,
    pub current_readers: u32,
    pub current_writers: u32,
    pub create_index: u64,
    pub modify_index: u64,
}

/// Body of the job parse endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParseRequest {
    #[serde(rename = "JobHCL")]
    pub job_hcl: String,
    #[serde(rename = "Canonicalize")]
    pub canonicalize: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_decodes_null_policies_as_empty() {
        let raw = serde_json::json!({
            "AccessorID": "a-1",
            "SecretID": "s-1",
            "Name": "mgmt",
            "Type": "management",
            "Policies": null,
            "Roles": null,
            "Global": true,
            "CreateTime": "2023-05-01T10:00:00+02:00",
            "CreateIndex": 7,
            "ModifyIndex": 7
        });
        let t: AclToken = serde_json::from_value(raw).expect("decode");
        assert!(t.policies.is_empty());
        assert_eq!(t.r#type, "management");
        assert_eq!(t.create_time.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn access_mode_round_trips_known_and_unknown_values() {
        let m: AccessMode = serde_json::from_str("\"multi-node-multi-writer\"").expect("decode");
        assert_eq!(m, AccessMode::MultiNodeMultiWriter);
        assert_eq!(m.to_string(), "multi-node-multi-writer");
        let other: AccessMode = serde_json::from_str("\"future-mode\"").expect("decode");
        assert_eq!(other.as_str(), "future-mode");
        let unset: AttachmentMode = serde_json::from_str("\"\"").expect("decode");
        assert_eq!(unset, AttachmentMode::Unset);
    }

    #[test]
    fn scheduler_envelope_decodes() {
        let raw = serde_json::json!({
            "SchedulerConfig": {
                "SchedulerAlgorithm": "spread",
                "MemoryOversubscriptionEnabled": true,
                "PreemptionConfig": {
                    "SystemSchedulerEnabled": true,
                    "SysBatchSchedulerEnabled": false,
                    "BatchSchedulerEnabled": false,
                    "ServiceSchedulerEnabled": true
                }
            },
            "Index": 12
        });
        let resp: SchedulerConfigurationResponse = serde_json::from_value(raw).expect("decode");
        let cfg = resp.scheduler_config.expect("config");
        assert_eq!(cfg.scheduler_algorithm, "spread");
        assert!(cfg.preemption_config.service_scheduler_enabled);
    }
}
