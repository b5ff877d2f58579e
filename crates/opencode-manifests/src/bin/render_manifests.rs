//! Render the full manifest set for an agent as multi-document YAML.
//!
//! Developer/GitOps utility: reads an agent config from a JSON file,
//! generates the embedded `opencode.json` (falling back to the static
//! model catalog when the Model Router is unreachable), and prints the
//! six manifests to stdout ready for `kubectl apply -f -`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use opencode_config::{generate_opencode_config, validate_opencode_config, OpenCodeConfigParams};
use opencode_manifests::topology::WORKSPACE_MOUNT;
use opencode_manifests::{build_manifest_set, OpenCodeAgentConfig};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "render-manifests",
    about = "Render the Kubernetes manifest set for a Plugged.in OpenCode agent"
)]
struct Args {
    /// Path to the agent config JSON file.
    #[arg(long)]
    config: PathBuf,

    /// Model Router base URL used for the catalog fetch.
    #[arg(long, default_value = "https://models.plugged.in")]
    model_router_url: String,

    /// MCP proxy SSE endpoint embedded in opencode.json.
    #[arg(long)]
    mcp_proxy_url: Option<String>,

    /// Skip the catalog fetch and use the static fallback list.
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading agent config {}", args.config.display()))?;
    let agent: OpenCodeAgentConfig =
        serde_json::from_str(&raw).context("parsing agent config JSON")?;

    let params = OpenCodeConfigParams {
        agent_name: agent.name.clone(),
        agent_uuid: agent.agent_uuid.clone(),
        default_model: agent.default_model.clone(),
        model_router_url: args.model_router_url.clone(),
        model_router_token: if args.offline {
            None
        } else {
            Some(agent.model_router_token.clone())
        },
        mcp_proxy_url: args.mcp_proxy_url.clone(),
        pluggedin_api_key: Some(agent.pluggedin_api_key.clone()),
        workspace: WORKSPACE_MOUNT.to_string(),
    };

    let opencode_json = generate_opencode_config(&params).await;
    let validation_errors = validate_opencode_config(&opencode_json);
    for error in &validation_errors {
        warn!(error = %error, "Generated runtime config failed validation");
    }
    anyhow::ensure!(
        validation_errors.is_empty(),
        "refusing to render manifests with an invalid runtime config"
    );

    let rendered = serde_json::to_string_pretty(&opencode_json)?;
    let set = build_manifest_set(&agent, &rendered)?;

    let documents: Vec<serde_yaml::Value> = vec![
        serde_yaml::to_value(&set.pvc)?,
        serde_yaml::to_value(&set.secret)?,
        serde_yaml::to_value(&set.config_map)?,
        serde_yaml::to_value(&set.deployment)?,
        serde_yaml::to_value(&set.service)?,
        serde_yaml::to_value(&set.ingress)?,
    ];

    let mut out = String::new();
    for doc in &documents {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(doc)?);
    }
    print!("{out}");

    Ok(())
}
