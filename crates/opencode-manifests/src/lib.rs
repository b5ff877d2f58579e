//! Kubernetes manifest generation for Plugged.in OpenCode agents.
//!
//! A small declarative agent configuration ([`OpenCodeAgentConfig`]) is
//! compiled into a consistent six-object cluster specification: PVC,
//! Secret, ConfigMap, Deployment, Service, and Ingress, for one of two
//! pod templates (IDE and Chamber). The Deployment carries the lifecycle
//! annotation contract consumed by the external `pap-client` agent, which
//! drains idle non-essential containers while the essential control-plane
//! sidecars keep the agent addressable.
//!
//! All builders are pure: one build call, one complete manifest set, no
//! shared state between invocations.

pub mod builder;
pub mod config;
pub mod constants;
pub mod lifecycle;
pub mod naming;
pub mod topology;

pub use builder::{
    build_config_map_manifest, build_deployment_manifest, build_ingress_manifest,
    build_manifest_set, build_pvc_manifest, build_secret_manifest, build_service_manifest,
    ManifestError, ManifestSet,
};
pub use config::{LimitsConfig, OpenCodeAgentConfig, TemplateType};
pub use lifecycle::{
    container_policies, lifecycle_annotations, parse_lifecycle_annotations, resource_estimates,
    ContainerPolicy, ResourceEstimate, ResourceEstimates,
};
pub use naming::ResourceNames;
pub use topology::{ContainerSpec, IngressPath, InitContainerSpec, ProbeHandler, ProbeSpec};
