//! Model Router API response models.

use serde::{Deserialize, Serialize};

/// Response from `GET {modelRouterUrl}/v1/models`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    /// Available models. Missing or null is treated as empty.
    #[serde(default)]
    pub data: Vec<ModelRouterModel>,
}

/// A single model entry as reported by the Model Router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRouterModel {
    /// Model identifier, used verbatim as the provider model key.
    pub id: String,
    /// Human-readable display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Context window size in tokens.
    #[serde(default)]
    pub context_length: Option<u64>,
    /// Maximum output tokens per completion.
    #[serde(default)]
    pub max_output_tokens: Option<u64>,
}

/// Static catalog used whenever the Model Router cannot be reached.
///
/// Agent bring-up must never block on catalog completeness, so any fetch
/// failure substitutes this list instead of propagating an error.
pub fn fallback_models() -> Vec<ModelRouterModel> {
    vec![
        ModelRouterModel {
            id: "claude-sonnet-4-20250514".to_string(),
            name: Some("Claude Sonnet 4".to_string()),
            context_length: Some(200_000),
            max_output_tokens: Some(64_000),
        },
        ModelRouterModel {
            id: "gpt-4.1".to_string(),
            name: Some("GPT-4.1".to_string()),
            context_length: Some(1_047_576),
            max_output_tokens: Some(32_768),
        },
        ModelRouterModel {
            id: "gemini-2.5-pro".to_string(),
            name: Some("Gemini 2.5 Pro".to_string()),
            context_length: Some(1_048_576),
            max_output_tokens: Some(65_536),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_response_defaults_to_empty_data() {
        let parsed: ModelsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn test_model_entry_tolerates_missing_optionals() {
        let parsed: ModelRouterModel =
            serde_json::from_str(r#"{"id":"claude-sonnet-4-20250514"}"#).unwrap();
        assert_eq!(parsed.id, "claude-sonnet-4-20250514");
        assert!(parsed.name.is_none());
        assert!(parsed.context_length.is_none());
    }

    #[test]
    fn test_fallback_catalog_has_three_entries() {
        let models = fallback_models();
        assert_eq!(models.len(), 3);
        assert!(models.iter().all(|m| !m.id.is_empty()));
    }
}
