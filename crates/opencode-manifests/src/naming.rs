//! Resource name derivation.
//!
//! Every cross-manifest name is derived here, once. The Secret and
//! ConfigMap names in particular are referenced from every container's
//! env and volume mounts, so all six builders consume this struct instead
//! of re-deriving strings.

use std::collections::BTreeMap;

use crate::config::OpenCodeAgentConfig;

/// Volume name for the workspace PVC mount.
pub const WORKSPACE_VOLUME: &str = "workspace";

/// Volume name for the generated-config ConfigMap mount (init container
/// input).
pub const CONFIG_SOURCE_VOLUME: &str = "agent-config";

/// Volume name for the shared `emptyDir` the init container writes
/// `opencode.json` into.
pub const RUNTIME_CONFIG_VOLUME: &str = "opencode-runtime";

/// Derived names shared across the manifest set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    /// `agent-{name}-secrets`
    pub secret_name: String,
    /// `agent-{name}-config`
    pub config_map_name: String,
    /// `workspace-{name}`
    pub pvc_name: String,
    /// `{name}-tls`
    pub tls_secret_name: String,
}

impl ResourceNames {
    /// Derive the conventional names for an agent.
    #[must_use]
    pub fn derive(config: &OpenCodeAgentConfig) -> Self {
        let name = &config.name;
        Self {
            secret_name: format!("agent-{name}-secrets"),
            config_map_name: format!("agent-{name}-config"),
            pvc_name: format!("workspace-{name}"),
            tls_secret_name: format!("{name}-tls"),
        }
    }
}

/// Selector labels shared by the Deployment selector, pod template, and
/// Service selector. Kept to the single `app` key so the selector never
/// drifts between objects.
#[must_use]
pub fn app_labels(config: &OpenCodeAgentConfig) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), config.name.clone());
    labels
}

/// Non-selector metadata labels stamped on every object in the set.
#[must_use]
pub fn common_labels(config: &OpenCodeAgentConfig) -> BTreeMap<String, String> {
    let mut labels = app_labels(config);
    labels.insert(
        "pluggedin.ai/template".to_string(),
        config.template_type.to_string(),
    );
    labels.insert(
        "pluggedin.ai/agent-uuid".to_string(),
        config.agent_uuid.clone(),
    );
    labels
}
