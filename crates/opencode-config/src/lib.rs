//! OpenCode runtime configuration for Plugged.in agents.
//!
//! This crate produces the `opencode.json` file that the `opencode-init`
//! container writes into the shared runtime volume, and the Model Router
//! catalog client used to enrich it. Manifest construction lives in the
//! `opencode-manifests` crate; this crate performs the only outbound
//! network call in the deployment pipeline.

pub mod generate;
pub mod models;
pub mod router;

pub use generate::{
    generate_opencode_config, validate_opencode_config, OpenCodeConfigParams,
};
pub use models::{fallback_models, ModelRouterModel, ModelsResponse};
pub use router::{ModelRouterClient, ModelRouterError};
