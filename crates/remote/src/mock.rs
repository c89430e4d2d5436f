//! In-memory [`RemoteClient`] serving fixtures; used by tests and demos.

use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;
use serde_json::{json, Map, Value};

use lodestar_core::model::{
    AclPolicy, AclPolicyListStub, AclRole, AclRoleListStub, AclToken, AclTokenListStub, CsiVolumeListStub, Deployment,
    JobParseRequest, Namespace, ScalingPolicy, SchedulerConfiguration, SchedulerConfigurationResponse,
};
use lodestar_core::{Query, RemoteError};

use crate::config::DEFAULT_ADDRESS;
use crate::{RemoteClient, RemoteResult};

/// Volume fixture plus the nodes it is attached to, which the listing stub omits.
#[derive(Debug, Clone, Default)]
pub struct MockVolume {
    pub stub: CsiVolumeListStub,
    pub nodes: Vec<String>,
}

/// Simple in-memory mock implementation for tests.
#[derive(Debug)]
pub struct MockClient {
    pub address: String,
    pub policies: Vec<AclPolicy>,
    pub roles: Vec<AclRole>,
    pub tokens: Vec<AclToken>,
    pub deployments: Vec<Deployment>,
    pub namespaces: Vec<Namespace>,
    pub regions: Vec<String>,
    pub scaling_policies: Vec<ScalingPolicy>,
    pub scheduler: Option<SchedulerConfiguration>,
    pub volumes: Vec<MockVolume>,
    /// When set, every call fails with this error.
    pub fail_with: Option<RemoteError>,
    calls: AtomicUsize,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            policies: Vec::new(),
            roles: Vec::new(),
            tokens: Vec::new(),
            deployments: Vec::new(),
            namespaces: Vec::new(),
            regions: Vec::new(),
            scaling_policies: Vec::new(),
            scheduler: None,
            volumes: Vec::new(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }
}

fn not_found(what: &str) -> RemoteError { RemoteError::from_status(404, &format!("{} not found", what)) }

fn bad_request(msg: impl AsRef<str>) -> RemoteError { RemoteError::from_status(400, msg.as_ref()) }

impl MockClient {
    pub fn new() -> Self { Self::default() }

    /// Remote calls served so far, failed ones included.
    pub fn calls(&self) -> usize { self.calls.load(Ordering::Relaxed) }

    fn enter(&self) -> RemoteResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn policy_stub(p: &AclPolicy) -> AclPolicyListStub {
    AclPolicyListStub {
        name: p.name.clone(),
        description: p.description.clone(),
        create_index: p.create_index,
        modify_index: p.modify_index,
    }
}

fn role_stub(r: &AclRole) -> AclRoleListStub {
    AclRoleListStub {
        id: r.id.clone(),
        name: r.name.clone(),
        description: r.description.clone(),
        policies: r.policies.clone(),
        create_index: r.create_index,
        modify_index: r.modify_index,
    }
}

fn token_stub(t: &AclToken) -> AclTokenListStub {
    AclTokenListStub {
        accessor_id: t.accessor_id.clone(),
        name: t.name.clone(),
        r#type: t.r#type.clone(),
        policies: t.policies.clone(),
        roles: t.roles.clone(),
        global: t.global,
        create_time: t.create_time,
        expiration_time: t.expiration_time,
        create_index: t.create_index,
        modify_index: t.modify_index,
    }
}

fn volume_matches(v: &MockVolume, query: &Query) -> bool {
    let ns_ok = match query.namespace() {
        None | Some("*") => true,
        Some(ns) => v.stub.namespace == ns,
    };
    let node_ok = query.node_id().map_or(true, |n| v.nodes.iter().any(|x| x == n));
    let plugin_ok = query.plugin_id().map_or(true, |p| v.stub.plugin_id == p);
    ns_ok && node_ok && plugin_ok
}

#[async_trait::async_trait]
impl RemoteClient for MockClient {
    fn address(&self) -> &str { &self.address }

    async fn acl_policies(&self, query: &Query) -> RemoteResult<Vec<AclPolicyListStub>> {
        self.enter()?;
        Ok(self.policies.iter().filter(|p| query.matches_prefix(&p.name)).map(policy_stub).collect())
    }

    async fn acl_policy(&self, name: &str) -> RemoteResult<AclPolicy> {
        self.enter()?;
        self.policies.iter().find(|p| p.name == name).cloned().ok_or_else(|| not_found("ACL policy"))
    }

    async fn acl_roles(&self, query: &Query) -> RemoteResult<Vec<AclRoleListStub>> {
        self.enter()?;
        Ok(self.roles.iter().filter(|r| query.matches_prefix(&r.id)).map(role_stub).collect())
    }

    async fn acl_role(&self, id: &str) -> RemoteResult<AclRole> {
        self.enter()?;
        self.roles.iter().find(|r| r.id == id).cloned().ok_or_else(|| not_found("ACL role"))
    }

    async fn acl_tokens(&self, query: &Query) -> RemoteResult<Vec<AclTokenListStub>> {
        self.enter()?;
        Ok(self.tokens.iter().filter(|t| query.matches_prefix(&t.accessor_id)).map(token_stub).collect())
    }

    async fn acl_token(&self, accessor_id: &str) -> RemoteResult<AclToken> {
        self.enter()?;
        self.tokens.iter().find(|t| t.accessor_id == accessor_id).cloned().ok_or_else(|| not_found("ACL token"))
    }

    async fn deployments(&self) -> RemoteResult<Vec<Deployment>> {
        self.enter()?;
        Ok(self.deployments.clone())
    }

    async fn parse_job(&self, request: &JobParseRequest) -> RemoteResult<Value> {
        self.enter()?;
        parse_minimal_job(&request.job_hcl, request.canonicalize)
    }

    async fn namespaces(&self) -> RemoteResult<Vec<Namespace>> {
        self.enter()?;
        Ok(self.namespaces.clone())
    }

    async fn regions(&self) -> RemoteResult<Vec<String>> {
        self.enter()?;
        Ok(self.regions.clone())
    }

    async fn scaling_policy(&self, id: &str) -> RemoteResult<ScalingPolicy> {
        self.enter()?;
        self.scaling_policies.iter().find(|p| p.id == id).cloned().ok_or_else(|| not_found("scaling policy"))
    }

    async fn scheduler_config(&self) -> RemoteResult<SchedulerConfigurationResponse> {
        self.enter()?;
        Ok(SchedulerConfigurationResponse { scheduler_config: self.scheduler.clone(), index: 1 })
    }

    async fn volumes(&self, query: &Query) -> RemoteResult<Vec<CsiVolumeListStub>> {
        self.enter()?;
        Ok(self.volumes.iter().filter(|v| volume_matches(v, query)).map(|v| v.stub.clone()).collect())
    }
}

// ----------------- Minimal job parser -----------------

/// Parse `job "<id>" { ... }` with optional top-level string attributes
/// `type`, `region`, `namespace` and a `datacenters` string list.
///
/// Unset fields come back as `null`; `canonicalize` fills the server defaults.
fn parse_minimal_job(hcl: &str, canonicalize: bool) -> RemoteResult<Value> {
    let re = |p: &str| Regex::new(p).map_err(|e| RemoteError::new(e.to_string()));
    let job_re = re(r#"^\s*job\s+"([^"]+)"\s*\{"#)?;
    let attr_re = re(r#"^\s*(type|region|namespace)\s*=\s*"([^"]*)""#)?;
    let dc_re = re(r#"^\s*datacenters\s*=\s*\[(.*)\]"#)?;
    let quoted_re = re(r#""([^"]*)""#)?;

    let mut id: Option<String> = None;
    let mut attrs: Map<String, Value> = Map::new();
    let mut datacenters: Option<Vec<String>> = None;
    let mut depth: i32 = 0;
    for line in hcl.lines() {
        if depth == 0 {
            if let Some(c) = job_re.captures(line) {
                if id.is_some() {
                    return Err(bad_request("error parsing job: more than one job block"));
                }
                id = Some(c[1].to_string());
            }
        } else if depth == 1 {
            if let Some(c) = attr_re.captures(line) {
                let key = match &c[1] {
                    "type" => "Type",
                    "region" => "Region",
                    _ => "Namespace",
                };
                attrs.insert(key.to_string(), Value::String(c[2].to_string()));
            } else if let Some(c) = dc_re.captures(line) {
                datacenters = Some(quoted_re.captures_iter(&c[1]).map(|q| q[1].to_string()).collect());
            }
        }
        depth += line.matches('{').count() as i32 - line.matches('}').count() as i32;
        if depth < 0 {
            return Err(bad_request("error parsing job: unbalanced braces"));
        }
    }
    if depth != 0 {
        return Err(bad_request("error parsing job: unbalanced braces"));
    }
    let id = id.ok_or_else(|| bad_request("error parsing job: no job block found"))?;

    let field = |k: &str| attrs.get(k).cloned().unwrap_or(Value::Null);
    let mut job = json!({
        "ID": id,
        "Name": Value::Null,
        "Namespace": field("Namespace"),
        "Region": field("Region"),
        "Type": field("Type"),
        "Priority": Value::Null,
        "AllAtOnce": Value::Null,
        "Datacenters": datacenters.map_or(Value::Null, |d| json!(d)),
    });
    if canonicalize {
        if let Value::Object(m) = &mut job {
            let defaults = [
                ("Name", json!(id)),
                ("Namespace", json!("default")),
                ("Region", json!("global")),
                ("Type", json!("service")),
                ("Priority", json!(50)),
                ("AllAtOnce", json!(false)),
                ("Datacenters", json!(["*"])),
            ];
            for (k, v) in defaults {
                let slot = m.entry(k).or_insert(Value::Null);
                if slot.is_null() {
                    *slot = v;
                }
            }
        }
    }
    Ok(job)
}
