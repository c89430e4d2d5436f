//! HTTP implementation of [`RemoteClient`] against the orchestrator's `/v1` API.

use std::time::Instant;

use anyhow::{Context, Result};
use reqwest::{Certificate, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use lodestar_core::model::{
    AclPolicy, AclPolicyListStub, AclRole, AclRoleListStub, AclToken, AclTokenListStub, CsiVolumeListStub, Deployment,
    JobParseRequest, Namespace, ScalingPolicy, SchedulerConfigurationResponse,
};
use lodestar_core::{Query, RemoteError};

use crate::config::ClientConfig;
use crate::{RemoteClient, RemoteResult};

const TOKEN_HEADER: &str = "X-Nomad-Token";

pub struct HttpClient {
    http: Client,
    base: Url,
    address: String,
    token: Option<String>,
    region: Option<String>,
}

fn transport_err(e: reqwest::Error) -> RemoteError {
    RemoteError { status: e.status().map(|s| s.as_u16()), message: e.to_string() }
}

impl HttpClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let base = Url::parse(&cfg.address).with_context(|| format!("parsing address {:?}", cfg.address))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("address {:?} cannot carry a path", cfg.address);
        }
        let mut builder = Client::builder();
        if let Some(path) = &cfg.ca_cert {
            let pem = std::fs::read(path).with_context(|| format!("reading CA certificate {}", path.display()))?;
            let cert = Certificate::from_pem(&pem).with_context(|| format!("parsing CA certificate {}", path.display()))?;
            builder = builder.add_root_certificate(cert);
        }
        if cfg.tls_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(t) = cfg.timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().context("building http client")?;
        Ok(Self {
            http,
            base,
            address: cfg.address.clone(),
            token: cfg.token.clone(),
            region: cfg.region.clone(),
        })
    }

    /// `base` + `/v1/<segments...>`, each segment percent-encoded, plus query pairs.
    fn url(&self, segments: &[&str], params: &[(&'static str, String)]) -> RemoteResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::new(format!("address {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        if !params.is_empty() || self.region.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            if let Some(r) = &self.region {
                pairs.append_pair("region", r);
            }
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, url: &Url) -> RemoteResult<T> {
        let t0 = Instant::now();
        let req = match &self.token {
            Some(tok) => req.header(TOKEN_HEADER, tok),
            None => req,
        };
        let resp = req.send().await.map_err(transport_err)?;
        let status = resp.status();
        debug!(url = %url, status = status.as_u16(), took_ms = %t0.elapsed().as_millis(), "remote: response");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status.as_u16(), &body));
        }
        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::new(format!("decoding response from {}: {}", url.path(), e)))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], params: &[(&'static str, String)]) -> RemoteResult<T> {
        let url = self.url(segments, params)?;
        debug!(url = %url, "remote: GET");
        self.send(self.http.get(url.clone()), &url).await
    }
}

#[async_trait::async_trait]
impl RemoteClient for HttpClient {
    fn address(&self) -> &str { &self.address }

    async fn acl_policies(&self, query: &Query) -> RemoteResult<Vec<AclPolicyListStub>> {
        self.get(&["acl", "policies"], &query.params()).await
    }

    async fn acl_policy(&self, name: &str) -> RemoteResult<AclPolicy> { self.get(&["acl", "policy", name], &[]).await }

    async fn acl_roles(&self, query: &Query) -> RemoteResult<Vec<AclRoleListStub>> {
        self.get(&["acl", "roles"], &query.params()).await
    }

    async fn acl_role(&self, id: &str) -> RemoteResult<AclRole> { self.get(&["acl", "role", id], &[]).await }

    async fn acl_tokens(&self, query: &Query) -> RemoteResult<Vec<AclTokenListStub>> {
        self.get(&["acl", "tokens"], &query.params()).await
    }

    async fn acl_token(&self, accessor_id: &str) -> RemoteResult<AclToken> {
        self.get(&["acl", "token", accessor_id], &[]).await
    }

    async fn deployments(&self) -> RemoteResult<Vec<Deployment>> { self.get(&["deployments"], &[]).await }

    async fn parse_job(&self, request: &JobParseRequest) -> RemoteResult<serde_json::Value> {
        let url = self.url(&["jobs", "parse"], &[])?;
        debug!(url = %url, canonicalize = request.canonicalize, "remote: POST");
        self.send(self.http.post(url.clone()).json(request), &url).await
    }

    async fn namespaces(&self) -> RemoteResult<Vec<Namespace>> { self.get(&["namespaces"], &[]).await }

    async fn regions(&self) -> RemoteResult<Vec<String>> { self.get(&["regions"], &[]).await }

    async fn scaling_policy(&self, id: &str) -> RemoteResult<ScalingPolicy> {
        self.get(&["scaling", "policy", id], &[]).await
    }

    async fn scheduler_config(&self) -> RemoteResult<SchedulerConfigurationResponse> {
        self.get(&["operator", "scheduler", "configuration"], &[]).await
    }

    async fn volumes(&self, query: &Query) -> RemoteResult<Vec<CsiVolumeListStub>> {
        self.get(&["volumes"], &query.params()).await
    }
}
