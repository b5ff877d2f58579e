//! `opencode.json` generation.
//!
//! Assembles the runtime configuration the `opencode-init` container writes
//! into the shared volume. The only network dependency is the Model Router
//! catalog, and any failure there degrades to the static fallback list;
//! generation itself never fails.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value};
use tracing::{debug, warn};

use crate::models::{fallback_models, ModelRouterModel};
use crate::router::ModelRouterClient;

/// Schema reference embedded in every generated config.
const OPENCODE_SCHEMA_URL: &str = "https://opencode.ai/config.json";

/// Provider key the Model Router is registered under.
const PROVIDER_NAME: &str = "pluggedin";

/// Placeholder resolved by the OpenCode runtime from the container
/// environment. The literal token never appears in the config file.
const API_KEY_PLACEHOLDER: &str = "{env:MODEL_ROUTER_API_KEY}";

/// Inputs for [`generate_opencode_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenCodeConfigParams {
    /// Agent name, for log correlation only.
    pub agent_name: String,
    /// Agent UUID, sent to the MCP proxy as `X-Agent-ID`.
    pub agent_uuid: String,
    /// Model id the agent starts with, prefixed with the provider key.
    pub default_model: String,
    /// Region-specific Model Router base URL.
    pub model_router_url: String,
    /// Bearer token for the catalog fetch. When absent the fallback
    /// catalog is used without any network call.
    #[serde(default)]
    pub model_router_token: Option<String>,
    /// MCP proxy SSE endpoint.
    #[serde(default)]
    pub mcp_proxy_url: Option<String>,
    /// Plugged.in API key, used as the MCP bearer credential.
    #[serde(default)]
    pub pluggedin_api_key: Option<String>,
    /// Workspace path inside the container.
    pub workspace: String,
}

/// Build the `opencode.json` content for an agent.
///
/// Fetches the model catalog when a router token is supplied; otherwise
/// (or on fetch failure) uses the static fallback list.
pub async fn generate_opencode_config(params: &OpenCodeConfigParams) -> Value {
    let models = match &params.model_router_token {
        Some(token) => {
            match ModelRouterClient::new(&params.model_router_url, token) {
                Ok(client) => client.fetch_models().await,
                Err(e) => {
                    warn!(error = %e, "Model Router client unavailable, using fallback list");
                    fallback_models()
                }
            }
        }
        None => fallback_models(),
    };

    debug!(
        agent = %params.agent_name,
        model_count = models.len(),
        "Assembling opencode.json"
    );

    let mut config = json!({
        "$schema": OPENCODE_SCHEMA_URL,
        "model": format!("{PROVIDER_NAME}/{}", params.default_model),
        "provider": {
            PROVIDER_NAME: {
                "npm": "@ai-sdk/openai-compatible",
                "name": "Plugged.in Model Router",
                "options": {
                    "baseURL": format!("{}/v1", params.model_router_url.trim_end_matches('/')),
                    "apiKey": API_KEY_PLACEHOLDER,
                },
                "models": build_model_map(&models),
            }
        },
        "workspace": params.workspace,
        "autoupdate": false,
    });

    if let Some(mcp) = build_mcp_entry(params) {
        config["mcp"] = json!({ PROVIDER_NAME: mcp });
    }

    config
}

/// Transform catalog entries into the provider model map, keyed by the
/// model's own id.
fn build_model_map(models: &[ModelRouterModel]) -> Value {
    let mut map = JsonMap::new();
    for model in models {
        let mut entry = JsonMap::new();
        if let Some(name) = &model.name {
            entry.insert("name".to_string(), Value::String(name.clone()));
        }
        let mut limit = JsonMap::new();
        if let Some(context) = model.context_length {
            limit.insert("context".to_string(), json!(context));
        }
        if let Some(output) = model.max_output_tokens {
            limit.insert("output".to_string(), json!(output));
        }
        if !limit.is_empty() {
            entry.insert("limit".to_string(), Value::Object(limit));
        }
        map.insert(model.id.clone(), Value::Object(entry));
    }
    Value::Object(map)
}

/// MCP proxy entry, included only when a proxy URL or API key is
/// configured.
fn build_mcp_entry(params: &OpenCodeConfigParams) -> Option<Value> {
    if params.mcp_proxy_url.is_none() && params.pluggedin_api_key.is_none() {
        return None;
    }

    let url = params
        .mcp_proxy_url
        .clone()
        .unwrap_or_else(|| "https://mcp.plugged.in/mcp".to_string());

    let mut headers = JsonMap::new();
    if let Some(key) = &params.pluggedin_api_key {
        headers.insert(
            "Authorization".to_string(),
            Value::String(format!("Bearer {key}")),
        );
    }
    headers.insert(
        "X-Agent-ID".to_string(),
        Value::String(params.agent_uuid.clone()),
    );

    Some(json!({
        "type": "remote",
        "url": url,
        "enabled": true,
        "headers": headers,
    }))
}

/// Structural sanity check on a generated (or hand-edited) config.
///
/// Returns one message per missing or malformed required field rather than
/// failing on the first, so the caller can decide whether to proceed. This
/// is not a schema validator.
pub fn validate_opencode_config(config: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    match config.get("model") {
        Some(Value::String(s)) if !s.is_empty() => {}
        _ => errors.push("missing required field: model".to_string()),
    }

    match config.get("provider") {
        Some(Value::Object(_)) => {}
        Some(_) => errors.push("field 'provider' must be an object".to_string()),
        None => errors.push("missing required field: provider".to_string()),
    }

    match config.get("workspace") {
        Some(Value::String(s)) if !s.is_empty() => {}
        _ => errors.push("missing required field: workspace".to_string()),
    }

    errors
}
