use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;

use lodestar_api::{QueryBuilder, ReadRequest, Reader, ResourceState};
use lodestar_core::model::JobParseRequest;
use lodestar_core::{FieldValue, ResourceKind};
use lodestar_remote::ClientConfig;

#[derive(Parser, Debug)]
#[command(name = "lodestarctl", version, about = "Read-only cluster snapshots")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Orchestrator API address
    #[arg(long = "address", global = true, env = "NOMAD_ADDR")]
    address: Option<String>,

    /// ACL token
    #[arg(long = "token", global = true, env = "NOMAD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long = "region", global = true, env = "NOMAD_REGION")]
    region: Option<String>,

    /// PEM file with an extra trusted CA
    #[arg(long = "ca-cert", global = true, env = "NOMAD_CACERT")]
    ca_cert: Option<PathBuf>,

    #[arg(long = "tls-skip-verify", global = true, action = ArgAction::SetTrue)]
    tls_skip_verify: bool,

    /// Per-request timeout in seconds (none by default)
    #[arg(long = "timeout-secs", global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json, Yaml }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List ACL policies
    AclPolicies {
        #[arg(long = "prefix")]
        prefix: Option<String>,
    },
    /// Show one ACL policy
    AclPolicy { name: String },
    /// Show one ACL role
    AclRole { id: String },
    /// List ACL roles
    AclRoles {
        /// Role ID prefix
        #[arg(long = "prefix")]
        prefix: Option<String>,
    },
    /// Show one ACL token
    AclToken { accessor_id: String },
    /// List ACL tokens
    AclTokens {
        /// Accessor ID prefix
        #[arg(long = "prefix")]
        prefix: Option<String>,
    },
    /// List deployments
    Deployments,
    /// Parse a job definition into its JSON form
    JobParse {
        /// Path to the job file, or `-` for stdin
        file: String,
        #[arg(long = "canonicalize", action = ArgAction::SetTrue)]
        canonicalize: bool,
    },
    /// List namespace names
    Namespaces,
    /// List regions
    Regions,
    /// Show one scaling policy
    ScalingPolicy { id: String },
    /// Show the scheduler configuration
    SchedulerConfig,
    /// List CSI volumes
    Volumes {
        #[arg(long = "type")]
        volume_type: Option<String>,
        #[arg(long = "node-id")]
        node_id: Option<String>,
        #[arg(long = "plugin-id")]
        plugin_id: Option<String>,
        #[arg(long = "namespace")]
        namespace: Option<String>,
    },
}

fn init_tracing() {
    let env = std::env::var("LODESTAR_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("LODESTAR_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid LODESTAR_METRICS_ADDR; expected host:port");
        }
    }
}

fn client_config(cli: &Cli) -> ClientConfig {
    let mut cfg = ClientConfig::from_env();
    if let Some(a) = &cli.address { cfg.address = a.clone(); }
    if let Some(t) = &cli.token { cfg.token = Some(t.clone()); }
    if let Some(r) = &cli.region { cfg.region = Some(r.clone()); }
    if let Some(c) = &cli.ca_cert { cfg.ca_cert = Some(c.clone()); }
    if cli.tls_skip_verify { cfg.tls_skip_verify = true; }
    cfg.timeout = cli.timeout_secs.map(Duration::from_secs);
    cfg
}

fn read_job_source(file: &str) -> Result<String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading job from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading job file {}", file))
    }
}

fn request_for(command: Commands) -> Result<ReadRequest> {
    let query = |b: QueryBuilder| -> Result<ReadRequest> { Ok(ReadRequest::Query(b.build()?)) };
    match command {
        Commands::AclPolicies { prefix } => query(QueryBuilder::new(ResourceKind::AclPolicies).prefix(prefix)),
        Commands::AclPolicy { name } => query(QueryBuilder::new(ResourceKind::AclPolicy).key(name)),
        Commands::AclRole { id } => query(QueryBuilder::new(ResourceKind::AclRole).key(id)),
        Commands::AclRoles { prefix } => query(QueryBuilder::new(ResourceKind::AclRoles).prefix(prefix)),
        Commands::AclToken { accessor_id } => query(QueryBuilder::new(ResourceKind::AclToken).key(accessor_id)),
        Commands::AclTokens { prefix } => query(QueryBuilder::new(ResourceKind::AclTokens).prefix(prefix)),
        Commands::Deployments => query(QueryBuilder::new(ResourceKind::Deployments)),
        Commands::JobParse { file, canonicalize } => {
            let job_hcl = read_job_source(&file)?;
            Ok(ReadRequest::ParseJob(JobParseRequest { job_hcl, canonicalize }))
        }
        Commands::Namespaces => query(QueryBuilder::new(ResourceKind::Namespaces)),
        Commands::Regions => query(QueryBuilder::new(ResourceKind::Regions)),
        Commands::ScalingPolicy { id } => query(QueryBuilder::new(ResourceKind::ScalingPolicy).key(id)),
        Commands::SchedulerConfig => query(QueryBuilder::new(ResourceKind::SchedulerConfig)),
        Commands::Volumes { volume_type, node_id, plugin_id, namespace } => query(
            QueryBuilder::new(ResourceKind::Volumes)
                .volume_type(volume_type)
                .node_id(node_id)
                .plugin_id(plugin_id)
                .namespace(namespace),
        ),
    }
}

/// Single-line rendering; records become `k=v` pairs.
fn render_inline(v: &FieldValue) -> String {
    match v {
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Str(s) => s.clone(),
        FieldValue::Map(m) => m.iter().map(|(k, v)| format!("{}={}", k, render_inline(v))).collect::<Vec<_>>().join(", "),
        FieldValue::List(items) | FieldValue::Set(items) => {
            items.iter().map(render_inline).collect::<Vec<_>>().join(", ")
        }
        FieldValue::Record(r) => r.iter().map(|(k, v)| format!("{}={}", k, render_inline(v))).collect::<Vec<_>>().join(" "),
    }
}

fn print_human(state: &ResourceState) {
    println!("{:<34} {}", "id", state.identity().as_str());
    for (name, value) in state.redacted() {
        match value.items() {
            Some(items) if items.iter().any(|i| i.as_record().is_some()) => {
                println!("{} ({})", name, items.len());
                for item in items {
                    println!("  - {}", render_inline(item));
                }
            }
            _ => println!("{:<34} {}", name, render_inline(&value)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let t0 = Instant::now();
    let cfg = client_config(&cli);
    info!(address = %cfg.address, "connecting");
    let reader = Reader::connect(&cfg).context("building client")?;
    let request = request_for(cli.command)?;
    let kind = request.kind();
    let mut state = ResourceState::new(kind);
    let status = reader.read(&request, &mut state).await.with_context(|| format!("{} read failed", kind))?;
    info!(kind = %kind, absent = status.is_absent(), took_ms = %t0.elapsed().as_millis(), "read finished");

    match cli.output {
        Output::Human if status.is_absent() => println!("not found"),
        Output::Human => print_human(&state),
        Output::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        Output::Yaml => print!("{}", serde_yaml::to_string(&state)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::ResourceRecord;

    #[test]
    fn volumes_command_builds_defaulted_query() {
        let req = request_for(Commands::Volumes { volume_type: None, node_id: Some("n1".into()), plugin_id: None, namespace: None })
            .expect("request");
        match req {
            ReadRequest::Query(q) => {
                assert_eq!(q.kind(), ResourceKind::Volumes);
                assert_eq!(q.namespace(), Some("default"));
                assert_eq!(q.node_id(), Some("n1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn optional_prefix_flag_reaches_the_query() {
        let req = request_for(Commands::AclRoles { prefix: Some("r-".into()) }).expect("request");
        assert!(matches!(req, ReadRequest::Query(ref q) if q.prefix() == Some("r-")));
        let req = request_for(Commands::AclTokens { prefix: None }).expect("request");
        assert!(matches!(req, ReadRequest::Query(ref q) if q.prefix().is_none()));
    }

    #[test]
    fn bad_volume_type_is_rejected_up_front() {
        let err = request_for(Commands::Volumes { volume_type: Some("host".into()), node_id: None, plugin_id: None, namespace: None })
            .unwrap_err();
        assert!(err.to_string().contains("type"), "{err}");
    }

    #[test]
    fn inline_rendering_flattens_records_and_maps() {
        let rec = ResourceRecord::new().with("name", "ops").with("global", true);
        assert_eq!(render_inline(&FieldValue::from(rec)), "name=ops global=true");
        let list = FieldValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(render_inline(&list), "a, b");
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lodestarctl", "acl-policy", "ops", "-o", "json", "--timeout-secs", "5"]).expect("parse");
        assert_eq!(cli.output, Output::Json);
        assert_eq!(client_config(&cli).timeout, Some(Duration::from_secs(5)));
        assert!(matches!(cli.command, Commands::AclPolicy { ref name } if name == "ops"));
    }
}
