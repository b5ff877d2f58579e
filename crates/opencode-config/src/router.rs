//! Model Router catalog client.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{fallback_models, ModelRouterModel, ModelsResponse};

/// Upper bound on the catalog fetch. Provisioning must not hang on an
/// unreachable router; a timeout is treated like any other fetch failure.
const MODELS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from the Model Router API.
///
/// These never escape [`ModelRouterClient::fetch_models`]; they exist so
/// the failure path can be logged with the real cause before falling back.
#[derive(Error, Debug)]
pub enum ModelRouterError {
    /// HTTP request failed (network, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Router returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client construction failed.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Client for the Plugged.in Model Router.
#[derive(Debug, Clone)]
pub struct ModelRouterClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ModelRouterClient {
    /// Create a client for the given router base URL and bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ModelRouterError> {
        let client = Client::builder()
            .timeout(MODELS_FETCH_TIMEOUT)
            .build()
            .map_err(|e| ModelRouterError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Fetch the model catalog, falling back to the static list on any
    /// failure.
    ///
    /// Single attempt, no retries: for a non-critical enhancement (a richer
    /// model list) falling back quickly beats retrying.
    pub async fn fetch_models(&self) -> Vec<ModelRouterModel> {
        match self.try_fetch_models().await {
            Ok(models) => {
                debug!(count = models.len(), "Fetched model catalog from router");
                models
            }
            Err(e) => {
                warn!(error = %e, "Model catalog fetch failed, using fallback list");
                fallback_models()
            }
        }
    }

    async fn try_fetch_models(&self) -> Result<Vec<ModelRouterModel>, ModelRouterError> {
        let url = format!("{}/v1/models", self.base_url);
        debug!(url = %url, "Requesting model catalog");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelRouterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ModelsResponse = response.json().await?;
        Ok(body.data)
    }
}
