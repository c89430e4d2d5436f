//! Lodestar remote: the network boundary of every read.
//!
//! [`RemoteClient`] is the only seam that touches the orchestrator. [`HttpClient`]
//! talks to a live cluster; [`MockClient`] serves fixtures in memory for tests.

#![forbid(unsafe_code)]

use lodestar_core::model::{
    AclPolicy, AclPolicyListStub, AclRole, AclRoleListStub, AclToken, AclTokenListStub, CsiVolumeListStub, Deployment,
    JobParseRequest, Namespace, ScalingPolicy, SchedulerConfigurationResponse,
};
use lodestar_core::{Query, RemoteError};

mod config;
mod http;
mod mock;

pub use config::{ClientConfig, DEFAULT_ADDRESS};
pub use http::HttpClient;
pub use mock::{MockClient, MockVolume};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Read-only operations against the orchestrator API.
///
/// Listing calls receive the validated [`Query`] and apply its filters server-side.
/// A missing singleton is reported as an error whose message embeds `404`.
#[async_trait::async_trait]
pub trait RemoteClient: Send + Sync {
    /// Endpoint address; the base of endpoint-derived identities.
    fn address(&self) -> &str;

    async fn acl_policies(&self, query: &Query) -> RemoteResult<Vec<AclPolicyListStub>>;
    async fn acl_policy(&self, name: &str) -> RemoteResult<AclPolicy>;
    async fn acl_roles(&self, query: &Query) -> RemoteResult<Vec<AclRoleListStub>>;
    async fn acl_role(&self, id: &str) -> RemoteResult<AclRole>;
    async fn acl_tokens(&self, query: &Query) -> RemoteResult<Vec<AclTokenListStub>>;
    async fn acl_token(&self, accessor_id: &str) -> RemoteResult<AclToken>;
    async fn deployments(&self) -> RemoteResult<Vec<Deployment>>;

    /// Parse a job definition server-side; returns the job as JSON.
    async fn parse_job(&self, request: &JobParseRequest) -> RemoteResult<serde_json::Value>;

    async fn namespaces(&self) -> RemoteResult<Vec<Namespace>>;
    async fn regions(&self) -> RemoteResult<Vec<String>>;
    async fn scaling_policy(&self, id: &str) -> RemoteResult<ScalingPolicy>;
    async fn scheduler_config(&self) -> RemoteResult<SchedulerConfigurationResponse>;
    async fn volumes(&self, query: &Query) -> RemoteResult<Vec<CsiVolumeListStub>>;
}
