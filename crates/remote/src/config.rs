//! Client configuration, read from the orchestrator's usual environment variables.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:4646";

#[derive(Clone)]
pub struct ClientConfig {
    pub address: String,
    /// Sent as `X-Nomad-Token`.
    pub token: Option<String>,
    /// Sent as the `region` query parameter.
    pub region: Option<String>,
    /// PEM bundle added as a trusted root.
    pub ca_cert: Option<PathBuf>,
    pub tls_skip_verify: bool,
    /// Per-request timeout; none unless the caller sets one.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { address: DEFAULT_ADDRESS.to_string(), token: None, region: None, ca_cert: None, tls_skip_verify: false, timeout: None }
    }
}

fn env_nonempty(key: &str) -> Option<String> { std::env::var(key).ok().filter(|s| !s.trim().is_empty()) }

fn truthy(s: &str) -> bool { matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on") }

impl ClientConfig {
    /// `NOMAD_ADDR`, `NOMAD_TOKEN`, `NOMAD_REGION`, `NOMAD_CACERT`, `NOMAD_SKIP_VERIFY`.
    pub fn from_env() -> Self {
        Self {
            address: env_nonempty("NOMAD_ADDR").unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            token: env_nonempty("NOMAD_TOKEN"),
            region: env_nonempty("NOMAD_REGION"),
            ca_cert: env_nonempty("NOMAD_CACERT").map(PathBuf::from),
            tls_skip_verify: env_nonempty("NOMAD_SKIP_VERIFY").map(|s| truthy(&s)).unwrap_or(false),
            timeout: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self { self.address = address.into(); self }
    pub fn with_token(mut self, token: impl Into<String>) -> Self { self.token = Some(token.into()); self }
    pub fn with_timeout(mut self, timeout: Duration) -> Self { self.timeout = Some(timeout); self }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .field("ca_cert", &self.ca_cert)
            .field("tls_skip_verify", &self.tls_skip_verify)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_token() {
        let cfg = ClientConfig::default().with_token("s3cr3t-token");
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("s3cr3t-token"), "{dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn skip_verify_accepts_common_spellings() {
        assert!(truthy("1") && truthy("TRUE") && truthy(" yes "));
        assert!(!truthy("0") && !truthy("false") && !truthy(""));
    }

    #[test]
    fn defaults_point_at_local_agent() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.address, DEFAULT_ADDRESS);
        assert!(cfg.timeout.is_none());
    }
}
