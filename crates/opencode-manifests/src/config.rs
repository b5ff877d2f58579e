//! Agent configuration and process-level limits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{DEFAULT_MAX_CPU_CORES, DEFAULT_MAX_MEMORY_GI};

/// Pod template an agent deploys as.
///
/// Immutable for the lifetime of the agent; switching templates means a
/// new deployment. Each variant selects one container topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateType {
    /// code-server IDE workspace.
    #[serde(rename = "opencode-ide")]
    Ide,
    /// OpenChamber chat workspace with backend API and web terminal.
    #[serde(rename = "opencode-chamber")]
    Chamber,
}

impl TemplateType {
    /// String form used in labels and the `pap.plugged.in/template`
    /// annotation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ide => "opencode-ide",
            Self::Chamber => "opencode-chamber",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opencode-ide" => Ok(Self::Ide),
            "opencode-chamber" => Ok(Self::Chamber),
            other => Err(format!("unknown template type: {other}")),
        }
    }
}

/// Input for a manifest build, assembled by the caller from user input
/// and resolved secrets.
///
/// The builders do not validate these fields; the caller contract is that
/// every required field is a pre-validated non-empty string (`name` a DNS
/// label) before any builder runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenCodeAgentConfig {
    /// DNS-label agent name, reused as the Deployment/Service/Ingress name
    /// and PVC suffix.
    pub name: String,
    /// Namespace shared by all six manifests.
    pub namespace: String,
    /// Fully-qualified public hostname for the Ingress rule and TLS entry.
    pub dns_name: String,
    /// Pod template selection.
    pub template_type: TemplateType,
    /// Web UI password. Secret material: lands base64-encoded in the
    /// Secret manifest only, referenced elsewhere via `secretKeyRef`.
    pub ui_password: String,
    /// Model Router bearer token.
    pub model_router_token: String,
    /// Lifecycle agent API key.
    pub pap_api_key: String,
    /// Plugged.in platform API key.
    pub pluggedin_api_key: String,
    /// Model id the agent starts with.
    pub default_model: String,
    /// Platform UUID of the agent.
    pub agent_uuid: String,
    /// Workspace PVC size override; `10Gi` when absent.
    #[serde(default)]
    pub workspace_storage_size: Option<String>,
}

/// Resource ceilings, constructed once at process start and passed by
/// reference into the components that enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Ceiling on summed pod memory, in Gi.
    pub max_memory_gi: u32,
    /// Ceiling on summed pod CPU, in whole cores.
    pub max_cpu_cores: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_memory_gi: DEFAULT_MAX_MEMORY_GI,
            max_cpu_cores: DEFAULT_MAX_CPU_CORES,
        }
    }
}

impl LimitsConfig {
    /// Read ceilings from `MAX_MEMORY_GI` / `MAX_CPU_CORES`, keeping the
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut limits = Self::default();
        limits.max_memory_gi = parse_env_u32("MAX_MEMORY_GI", limits.max_memory_gi);
        limits.max_cpu_cores = parse_env_u32("MAX_CPU_CORES", limits.max_cpu_cores);
        limits
    }

    /// Clamp a memory amount (Mi) to the configured ceiling.
    #[must_use]
    pub fn clamp_memory_mi(&self, memory_mi: u64) -> u64 {
        memory_mi.min(u64::from(self.max_memory_gi) * 1024)
    }

    /// Clamp a CPU amount (millicores) to the configured ceiling.
    #[must_use]
    pub fn clamp_cpu_millis(&self, cpu_millis: u64) -> u64 {
        cpu_millis.min(u64::from(self.max_cpu_cores) * 1000)
    }
}

fn parse_env_u32(var: &str, default: u32) -> u32 {
    match std::env::var(var) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var, raw, "Ignoring unparseable limit override");
                default
            }
        },
        Err(_) => default,
    }
}
