//! Lodestar read façade.
//!
//! This crate defines the read operations frontends (CLI, tests) depend on: one per
//! resource kind, each running the classify -> flatten -> identity -> commit pipeline
//! against a [`RemoteClient`] handed in at construction.

#![forbid(unsafe_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{info, warn};

use lodestar_core::flatten::{flatten_all, job_json, namespace_names, record_list, string_list};
use lodestar_core::model::{
    AclPolicy, AclPolicyListStub, AclRole, AclRoleListStub, AclToken, AclTokenListStub, CsiVolumeListStub, Deployment,
    JobParseRequest, Namespace, ScalingPolicy, SchedulerConfiguration,
};
use lodestar_core::{
    FieldCommitter, Filter, Flatten, FlattenOptions, Identity, IdentityAssigner, OpContext, Outcome, Query, ReadError,
    RemoteError, ResourceKind, ResourceRecord, ResultClassifier, StateSink,
};
use lodestar_remote::{ClientConfig, HttpClient, RemoteClient, RemoteResult};

pub use lodestar_core::{ResourceState, QueryBuilder};

/// Result of a read that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    Present(Identity),
    /// The remote reported the resource missing; identity was cleared and nothing committed.
    Absent,
}

impl ReadStatus {
    pub fn is_absent(&self) -> bool { matches!(self, ReadStatus::Absent) }

    pub fn identity(&self) -> Identity {
        match self {
            ReadStatus::Present(id) => id.clone(),
            ReadStatus::Absent => Identity::Cleared,
        }
    }
}

pub type ReadResult = Result<ReadStatus, ReadError>;

/// Any read, for callers that pick the kind at runtime.
#[derive(Debug, Clone)]
pub enum ReadRequest {
    Query(Query),
    ParseJob(JobParseRequest),
}

impl ReadRequest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ReadRequest::Query(q) => q.kind(),
            ReadRequest::ParseJob(_) => ResourceKind::JobParser,
        }
    }
}

/// Natural key override plus the computed fields of one read.
type Rendered = (Option<String>, ResourceRecord);

fn computed(record: ResourceRecord) -> Rendered { (None, record) }

fn collection(kind: ResourceKind, items: lodestar_core::FieldValue) -> Rendered {
    (None, ResourceRecord::new().with(kind.collection_field().unwrap_or_default(), items))
}

/// Echo of the caller's inputs, in schema order.
fn query_inputs(query: &Query) -> ResourceRecord {
    let kind = query.kind();
    let mut rec = ResourceRecord::new();
    if let (Some(field), Some(key)) = (kind.key_field(), query.key()) {
        rec.push(field, key);
    }
    for filter in kind.filters() {
        let value = match filter {
            Filter::Prefix => query.prefix().map(str::to_string),
            Filter::Namespace => query.namespace().map(str::to_string),
            Filter::NodeId => query.node_id().map(str::to_string),
            Filter::PluginId => query.plugin_id().map(str::to_string),
            Filter::VolumeType => query.volume_type().map(|t| t.to_string()),
        };
        if let Some(v) = value {
            rec.push(filter.attribute(), v);
        }
    }
    rec
}

fn observe(kind: ResourceKind, t0: Instant, result: &ReadResult) {
    let outcome = match result {
        Ok(ReadStatus::Present(_)) => "success",
        Ok(ReadStatus::Absent) => "absent",
        Err(e) => e.label(),
    };
    counter!("lodestar_reads_total", 1u64, "kind" => kind.name(), "outcome" => outcome);
    histogram!("lodestar_read_ms", t0.elapsed().as_secs_f64() * 1000.0, "kind" => kind.name());
    info!(kind = %kind, outcome, took_ms = %t0.elapsed().as_millis(), "api: read done");
}

/// Read operations over one remote client.
#[derive(Clone)]
pub struct Reader {
    client: Arc<dyn RemoteClient>,
    classifier: ResultClassifier,
    assigner: IdentityAssigner,
}

impl Reader {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        let assigner = IdentityAssigner::new(client.address());
        Self { client, classifier: ResultClassifier::default(), assigner }
    }

    /// Reader over an HTTP client built from `cfg`.
    pub fn connect(cfg: &ClientConfig) -> anyhow::Result<Self> {
        let client = HttpClient::new(cfg)?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn with_classifier(mut self, classifier: ResultClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> { &self.client }

    /// Validate, call, classify, flatten, assign identity, commit.
    async fn execute<T, C, Fut, R>(
        &self,
        expected: ResourceKind,
        query: &Query,
        inputs: ResourceRecord,
        sink: &mut dyn StateSink,
        call: C,
        render: R,
    ) -> ReadResult
    where
        C: FnOnce() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
        R: FnOnce(T, &FlattenOptions) -> Result<Rendered, serde_json::Error>,
    {
        let t0 = Instant::now();
        info!(kind = %expected, key = %query.key().unwrap_or("-"), "api: read start");
        let result = self.run(expected, query, inputs, sink, call, render).await;
        observe(expected, t0, &result);
        result
    }

    async fn run<T, C, Fut, R>(
        &self,
        expected: ResourceKind,
        query: &Query,
        inputs: ResourceRecord,
        sink: &mut dyn StateSink,
        call: C,
        render: R,
    ) -> ReadResult
    where
        C: FnOnce() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
        R: FnOnce(T, &FlattenOptions) -> Result<Rendered, serde_json::Error>,
    {
        if query.kind() != expected {
            return Err(ReadError::validation("kind", format!("query built for {}, not {}", query.kind(), expected)));
        }
        let key = query.key();
        let context = OpContext::new(expected.name(), key);
        let opts = FlattenOptions::with_timestamps(expected.timestamp_style());
        let outcome = match self.classifier.classify(call().await).map(|v| render(v, &opts)) {
            Outcome::Success(Err(source)) => return Err(ReadError::Serialization { context, source }),
            Outcome::Success(Ok(rendered)) => Outcome::Success(rendered),
            Outcome::Absent => Outcome::Absent,
            Outcome::Failure(e) => Outcome::Failure(e),
        };
        let natural = match &outcome {
            Outcome::Success((natural, _)) => natural.as_deref().or(key),
            _ => key,
        };
        let identity = self.assigner.for_outcome(expected.identity_rule(), natural, &outcome);
        match outcome {
            Outcome::Absent => {
                sink.set_identity(identity);
                Ok(ReadStatus::Absent)
            }
            Outcome::Failure(source) => {
                warn!(kind = %expected, error = %source, "api: remote call failed");
                Err(ReadError::Transport { context, source })
            }
            Outcome::Success((_, fields)) => {
                sink.set_identity(identity.clone());
                let mut committer = FieldCommitter::new(sink);
                committer.commit_record(inputs);
                committer.commit_record(fields);
                match committer.finalize() {
                    Ok(()) => Ok(ReadStatus::Present(identity)),
                    Err(source) => Err(ReadError::Commit { context, source }),
                }
            }
        }
    }

    pub async fn acl_policies(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::AclPolicies;
        self.execute(
            kind,
            query,
            query_inputs(query),
            sink,
            || self.client.acl_policies(query),
            |v: Vec<AclPolicyListStub>, o: &FlattenOptions| Ok(collection(kind, record_list(flatten_all(&v, o)?))),
        )
        .await
    }

    pub async fn acl_policy(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let name = query.key().unwrap_or_default();
        self.execute(
            ResourceKind::AclPolicy,
            query,
            query_inputs(query),
            sink,
            || self.client.acl_policy(name),
            |p: AclPolicy, o: &FlattenOptions| Ok(computed(p.flatten(o)?)),
        )
        .await
    }

    pub async fn acl_role(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let id = query.key().unwrap_or_default();
        self.execute(
            ResourceKind::AclRole,
            query,
            query_inputs(query),
            sink,
            || self.client.acl_role(id),
            |r: AclRole, o: &FlattenOptions| Ok(computed(r.flatten(o)?)),
        )
        .await
    }

    pub async fn acl_roles(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::AclRoles;
        self.execute(
            kind,
            query,
            query_inputs(query),
            sink,
            || self.client.acl_roles(query),
            |v: Vec<AclRoleListStub>, o: &FlattenOptions| Ok(collection(kind, record_list(flatten_all(&v, o)?))),
        )
        .await
    }

    pub async fn acl_token(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let accessor = query.key().unwrap_or_default();
        self.execute(
            ResourceKind::AclToken,
            query,
            query_inputs(query),
            sink,
            || self.client.acl_token(accessor),
            |t: AclToken, o: &FlattenOptions| Ok(computed(t.flatten(o)?)),
        )
        .await
    }

    pub async fn acl_tokens(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::AclTokens;
        self.execute(
            kind,
            query,
            query_inputs(query),
            sink,
            || self.client.acl_tokens(query),
            |v: Vec<AclTokenListStub>, o: &FlattenOptions| Ok(collection(kind, record_list(flatten_all(&v, o)?))),
        )
        .await
    }

    pub async fn deployments(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::Deployments;
        self.execute(
            kind,
            query,
            query_inputs(query),
            sink,
            || self.client.deployments(),
            |v: Vec<Deployment>, o: &FlattenOptions| Ok(collection(kind, record_list(flatten_all(&v, o)?))),
        )
        .await
    }

    /// Parse a job definition; identity is the parsed job's ID.
    pub async fn job_parser(&self, request: &JobParseRequest, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::JobParser;
        if request.job_hcl.trim().is_empty() {
            let result = Err(ReadError::validation("hcl", "a job definition is required"));
            observe(kind, Instant::now(), &result);
            return result;
        }
        let query = Query::unfiltered(kind)?;
        let inputs = ResourceRecord::new().with("hcl", request.job_hcl.as_str()).with("canonicalize", request.canonicalize);
        self.execute(
            kind,
            &query,
            inputs,
            sink,
            || self.client.parse_job(request),
            |job: Value, _: &FlattenOptions| {
                let id = job.get("ID").and_then(Value::as_str).map(str::to_string);
                Ok((id, ResourceRecord::new().with("json", job_json(&job)?)))
            },
        )
        .await
    }

    pub async fn namespaces(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::Namespaces;
        self.execute(
            kind,
            query,
            query_inputs(query),
            sink,
            || self.client.namespaces(),
            |v: Vec<Namespace>, _: &FlattenOptions| Ok(collection(kind, namespace_names(&v))),
        )
        .await
    }

    pub async fn regions(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::Regions;
        self.execute(
            kind,
            query,
            query_inputs(query),
            sink,
            || self.client.regions(),
            |v: Vec<String>, _: &FlattenOptions| Ok(collection(kind, string_list(&v))),
        )
        .await
    }

    pub async fn scaling_policy(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let id = query.key().unwrap_or_default();
        self.execute(
            ResourceKind::ScalingPolicy,
            query,
            query_inputs(query),
            sink,
            || self.client.scaling_policy(id),
            |p: ScalingPolicy, o: &FlattenOptions| Ok(computed(p.flatten(o)?)),
        )
        .await
    }

    pub async fn scheduler_config(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let call = || async {
            self.client.scheduler_config().await.and_then(|resp| {
                resp.scheduler_config.ok_or_else(|| RemoteError::new("response carried no scheduler configuration"))
            })
        };
        self.execute(
            ResourceKind::SchedulerConfig,
            query,
            query_inputs(query),
            sink,
            call,
            |c: SchedulerConfiguration, o: &FlattenOptions| Ok(computed(c.flatten(o)?)),
        )
        .await
    }

    pub async fn volumes(&self, query: &Query, sink: &mut dyn StateSink) -> ReadResult {
        let kind = ResourceKind::Volumes;
        self.execute(
            kind,
            query,
            query_inputs(query),
            sink,
            || self.client.volumes(query),
            |v: Vec<CsiVolumeListStub>, o: &FlattenOptions| Ok(collection(kind, record_list(flatten_all(&v, o)?))),
        )
        .await
    }

    /// Dispatch on the request's resource kind.
    pub async fn read(&self, request: &ReadRequest, sink: &mut dyn StateSink) -> ReadResult {
        let query = match request {
            ReadRequest::ParseJob(r) => return self.job_parser(r, sink).await,
            ReadRequest::Query(q) => q,
        };
        match query.kind() {
            ResourceKind::AclPolicies => self.acl_policies(query, sink).await,
            ResourceKind::AclPolicy => self.acl_policy(query, sink).await,
            ResourceKind::AclRole => self.acl_role(query, sink).await,
            ResourceKind::AclRoles => self.acl_roles(query, sink).await,
            ResourceKind::AclToken => self.acl_token(query, sink).await,
            ResourceKind::AclTokens => self.acl_tokens(query, sink).await,
            ResourceKind::Deployments => self.deployments(query, sink).await,
            ResourceKind::Namespaces => self.namespaces(query, sink).await,
            ResourceKind::Regions => self.regions(query, sink).await,
            ResourceKind::ScalingPolicy => self.scaling_policy(query, sink).await,
            ResourceKind::SchedulerConfig => self.scheduler_config(query, sink).await,
            ResourceKind::Volumes => self.volumes(query, sink).await,
            ResourceKind::JobParser => {
                let result = Err(ReadError::validation("hcl", "job_parser reads take a job definition, not a query"));
                observe(ResourceKind::JobParser, Instant::now(), &result);
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::VolumeType;
    use lodestar_remote::MockClient;

    #[test]
    fn inputs_echo_key_and_filters_in_schema_order() {
        let q = QueryBuilder::new(ResourceKind::Volumes).plugin_id("ebs").build().expect("query");
        let rec = query_inputs(&q);
        assert_eq!(rec.names(), vec!["type", "plugin_id", "namespace"]);
        assert_eq!(rec.get("type").and_then(|v| v.as_str()), Some(VolumeType::Csi.as_str()));

        let q = QueryBuilder::new(ResourceKind::AclToken).key("a-1").build().expect("query");
        assert_eq!(query_inputs(&q).names(), vec!["accessor_id"]);

        let q = QueryBuilder::new(ResourceKind::AclPolicies).build().expect("query");
        assert!(query_inputs(&q).is_empty());
    }

    #[tokio::test]
    async fn render_error_surfaces_as_serialization_and_leaves_state_alone() {
        let reader = Reader::new(Arc::new(MockClient::new()));
        let q = QueryBuilder::new(ResourceKind::Regions).build().expect("query");
        let mut state = ResourceState::new(ResourceKind::Regions);
        let err = reader
            .execute(
                ResourceKind::Regions,
                &q,
                query_inputs(&q),
                &mut state,
                || reader.client.regions(),
                |_: Vec<String>, _: &FlattenOptions| -> Result<Rendered, serde_json::Error> {
                    Err(serde_json::from_str::<Value>("{").unwrap_err())
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::Serialization { .. }), "{err}");
        assert_eq!(err.label(), "serialization");
        assert!(state.identity().is_cleared());
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn absent_clears_identity_left_by_an_earlier_read() {
        let reader = Reader::new(Arc::new(MockClient::new()));
        let q = QueryBuilder::new(ResourceKind::ScalingPolicy).key("gone").build().expect("query");
        let mut state = ResourceState::new(ResourceKind::ScalingPolicy);
        state.set_identity(Identity::Natural("gone".into()));
        let status = reader.scaling_policy(&q, &mut state).await.expect("read");
        assert!(status.is_absent());
        assert!(state.identity().is_cleared());
    }

    #[test]
    fn absent_status_has_cleared_identity() {
        assert!(ReadStatus::Absent.identity().is_cleared());
        let id = Identity::Natural("x".into());
        assert_eq!(ReadStatus::Present(id.clone()).identity(), id);
    }
}
