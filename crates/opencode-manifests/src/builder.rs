//! Kubernetes manifest builders.
//!
//! Six pure functions, one per object, plus an all-or-nothing aggregate.
//! No I/O happens here: the runtime config JSON is generated upstream
//! (`opencode-config`) and passed in as a string, so a build either yields
//! the complete manifest set or nothing.
//!
//! Field validation is the caller's contract: every required
//! [`OpenCodeAgentConfig`] field must be a pre-validated non-empty string
//! before any builder runs. The only failure mode left is a programmer
//! error surfacing as a serialization mismatch.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::OpenCodeAgentConfig;
use crate::constants::{CLUSTER_ISSUER, DEFAULT_WORKSPACE_SIZE, METRICS_PORT, STORAGE_CLASS};
use crate::lifecycle::lifecycle_annotations;
use crate::naming::{
    app_labels, common_labels, ResourceNames, CONFIG_SOURCE_VOLUME, RUNTIME_CONFIG_VOLUME,
    WORKSPACE_VOLUME,
};
use crate::topology::{ContainerSpec, InitContainerSpec, ProbeHandler, ProbeSpec};

/// Errors from manifest construction.
///
/// Builders perform no I/O; the only variant covers a shape mismatch
/// between the assembled JSON and the k8s-openapi type, which is a
/// programmer error rather than a runtime condition.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to assemble {kind} manifest: {source}")]
    Assembly {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The complete six-object manifest set for one agent.
#[derive(Debug, Clone)]
pub struct ManifestSet {
    pub pvc: PersistentVolumeClaim,
    pub secret: Secret,
    pub config_map: ConfigMap,
    pub deployment: Deployment,
    pub service: Service,
    pub ingress: Ingress,
}

fn from_manifest_value<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    value: Value,
) -> Result<T, ManifestError> {
    serde_json::from_value(value).map_err(|source| ManifestError::Assembly { kind, source })
}

/// Build the workspace PVC. `ReadWriteOnce`, size from the config or the
/// `10Gi` default.
pub fn build_pvc_manifest(
    config: &OpenCodeAgentConfig,
) -> Result<PersistentVolumeClaim, ManifestError> {
    let names = ResourceNames::derive(config);
    let storage = config
        .workspace_storage_size
        .as_deref()
        .unwrap_or(DEFAULT_WORKSPACE_SIZE);

    from_manifest_value(
        "PersistentVolumeClaim",
        json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": {
                "name": names.pvc_name,
                "namespace": config.namespace,
                "labels": common_labels(config),
            },
            "spec": {
                "accessModes": ["ReadWriteOnce"],
                "storageClassName": STORAGE_CLASS,
                "resources": {
                    "requests": {
                        "storage": storage,
                    }
                }
            }
        }),
    )
}

/// Build the agent Secret. Exactly four base64-encoded keys; adding a key
/// here means updating every container's env references, so nothing else
/// may be appended casually.
pub fn build_secret_manifest(config: &OpenCodeAgentConfig) -> Result<Secret, ManifestError> {
    let names = ResourceNames::derive(config);

    from_manifest_value(
        "Secret",
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": names.secret_name,
                "namespace": config.namespace,
                "labels": common_labels(config),
            },
            "type": "Opaque",
            "data": {
                "ui-password": BASE64.encode(&config.ui_password),
                "model-router-token": BASE64.encode(&config.model_router_token),
                "pap-api-key": BASE64.encode(&config.pap_api_key),
                "pluggedin-api-key": BASE64.encode(&config.pluggedin_api_key),
            }
        }),
    )
}

/// Build the ConfigMap embedding the serialized runtime config under the
/// `opencode.json` key.
pub fn build_config_map_manifest(
    config: &OpenCodeAgentConfig,
    opencode_json: &str,
) -> Result<ConfigMap, ManifestError> {
    let names = ResourceNames::derive(config);

    let mut data = std::collections::BTreeMap::new();
    data.insert("opencode.json".to_string(), opencode_json.to_string());

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(names.config_map_name),
            namespace: Some(config.namespace.clone()),
            labels: Some(common_labels(config)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    })
}

/// Security baseline applied to every container and init container.
/// Non-negotiable default: non-root, no capabilities, no privilege
/// escalation.
fn security_context() -> Value {
    json!({
        "runAsNonRoot": true,
        "allowPrivilegeEscalation": false,
        "capabilities": {
            "drop": ["ALL"],
        }
    })
}

fn probe_to_json(probe: &ProbeSpec) -> Value {
    let mut value = match &probe.handler {
        ProbeHandler::HttpGet { path, port } => json!({
            "httpGet": { "path": path, "port": port }
        }),
        ProbeHandler::Exec { command } => json!({
            "exec": { "command": command }
        }),
    };
    value["initialDelaySeconds"] = json!(probe.initial_delay_seconds);
    value["periodSeconds"] = json!(probe.period_seconds);
    value
}

fn container_env(config: &OpenCodeAgentConfig, spec: &ContainerSpec, names: &ResourceNames) -> Value {
    let mut env = vec![
        json!({ "name": "AGENT_NAME", "value": config.name }),
        json!({ "name": "AGENT_UUID", "value": config.agent_uuid }),
        json!({ "name": "DEFAULT_MODEL", "value": config.default_model }),
        json!({ "name": "TEMPLATE_TYPE", "value": config.template_type.as_str() }),
    ];

    for (name, value) in &spec.static_env {
        env.push(json!({ "name": name, "value": value }));
    }

    for (name, key) in &spec.secret_env {
        env.push(json!({
            "name": name,
            "valueFrom": {
                "secretKeyRef": {
                    "name": names.secret_name,
                    "key": key,
                }
            }
        }));
    }

    json!(env)
}

fn container_to_json(
    config: &OpenCodeAgentConfig,
    spec: &ContainerSpec,
    names: &ResourceNames,
) -> Value {
    let mut container = json!({
        "name": spec.name,
        "image": spec.image,
        "imagePullPolicy": "IfNotPresent",
        "ports": [
            { "name": spec.port_name, "containerPort": spec.port, "protocol": "TCP" }
        ],
        "env": container_env(config, spec, names),
        "resources": {
            "requests": {
                "cpu": spec.resources.cpu_request,
                "memory": spec.resources.memory_request,
            },
            "limits": {
                "cpu": spec.resources.cpu_limit,
                "memory": spec.resources.memory_limit,
            }
        },
        "securityContext": security_context(),
    });

    if !spec.volume_mounts.is_empty() {
        container["volumeMounts"] = json!(spec
            .volume_mounts
            .iter()
            .map(|m| json!({
                "name": m.name,
                "mountPath": m.mount_path,
                "readOnly": m.read_only,
            }))
            .collect::<Vec<_>>());
    }
    if let Some(probe) = &spec.liveness {
        container["livenessProbe"] = probe_to_json(probe);
    }
    if let Some(probe) = &spec.readiness {
        container["readinessProbe"] = probe_to_json(probe);
    }
    if let Some(command) = &spec.command {
        container["command"] = json!(command);
    }
    if let Some(args) = &spec.args {
        container["args"] = json!(args);
    }
    if let Some(dir) = &spec.working_dir {
        container["workingDir"] = json!(dir);
    }

    container
}

fn init_container_to_json(init: &InitContainerSpec) -> Value {
    json!({
        "name": init.name,
        "image": init.image,
        "command": init.command,
        "securityContext": security_context(),
        "volumeMounts": init
            .volume_mounts
            .iter()
            .map(|m| json!({
                "name": m.name,
                "mountPath": m.mount_path,
                "readOnly": m.read_only,
            }))
            .collect::<Vec<_>>(),
    })
}

/// Build the Deployment: one replica, `opencode-init` then the full
/// template topology, lifecycle policy published through pod annotations.
pub fn build_deployment_manifest(
    config: &OpenCodeAgentConfig,
) -> Result<Deployment, ManifestError> {
    let names = ResourceNames::derive(config);
    let template = config.template_type;
    let containers: Vec<Value> = template
        .containers()
        .iter()
        .map(|spec| container_to_json(config, spec, &names))
        .collect();

    debug!(
        agent = %config.name,
        template = %template,
        containers = containers.len(),
        "Building Deployment manifest"
    );

    from_manifest_value(
        "Deployment",
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": config.name,
                "namespace": config.namespace,
                "labels": common_labels(config),
            },
            "spec": {
                "replicas": 1,
                // RWO workspace volume: never run two pods side by side.
                "strategy": { "type": "Recreate" },
                "selector": {
                    "matchLabels": app_labels(config),
                },
                "template": {
                    "metadata": {
                        "labels": app_labels(config),
                        "annotations": lifecycle_annotations(template),
                    },
                    "spec": {
                        "initContainers": [init_container_to_json(&template.init_container())],
                        "containers": containers,
                        "volumes": [
                            {
                                "name": WORKSPACE_VOLUME,
                                "persistentVolumeClaim": { "claimName": names.pvc_name },
                            },
                            {
                                "name": CONFIG_SOURCE_VOLUME,
                                "configMap": { "name": names.config_map_name },
                            },
                            {
                                "name": RUNTIME_CONFIG_VOLUME,
                                "emptyDir": {},
                            },
                        ],
                    }
                }
            }
        }),
    )
}

/// Build the ClusterIP Service exposing every container port by name plus
/// the fixed `metrics` port served by `agent-api`.
pub fn build_service_manifest(config: &OpenCodeAgentConfig) -> Result<Service, ManifestError> {
    let mut ports: Vec<Value> = config
        .template_type
        .containers()
        .iter()
        .map(|spec| {
            json!({
                "name": spec.port_name,
                "port": spec.port,
                "targetPort": spec.port,
                "protocol": "TCP",
            })
        })
        .collect();
    ports.push(json!({
        "name": "metrics",
        "port": METRICS_PORT,
        "targetPort": METRICS_PORT,
        "protocol": "TCP",
    }));

    from_manifest_value(
        "Service",
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {
                "name": config.name,
                "namespace": config.namespace,
                "labels": common_labels(config),
            },
            "spec": {
                "type": "ClusterIP",
                "selector": app_labels(config),
                "ports": ports,
            }
        }),
    )
}

/// Build the Ingress. Path order comes from the topology and keeps the
/// catch-all `/` last; TLS is terminated via the cert-manager
/// ClusterIssuer.
pub fn build_ingress_manifest(config: &OpenCodeAgentConfig) -> Result<Ingress, ManifestError> {
    let names = ResourceNames::derive(config);
    let paths: Vec<Value> = config
        .template_type
        .ingress_paths()
        .iter()
        .map(|entry| {
            json!({
                "path": entry.path,
                "pathType": "Prefix",
                "backend": {
                    "service": {
                        "name": config.name,
                        "port": { "name": entry.port_name },
                    }
                }
            })
        })
        .collect();

    from_manifest_value(
        "Ingress",
        json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": {
                "name": config.name,
                "namespace": config.namespace,
                "labels": common_labels(config),
                "annotations": {
                    "cert-manager.io/cluster-issuer": CLUSTER_ISSUER,
                },
            },
            "spec": {
                "ingressClassName": "nginx",
                "tls": [
                    {
                        "hosts": [config.dns_name],
                        "secretName": names.tls_secret_name,
                    }
                ],
                "rules": [
                    {
                        "host": config.dns_name,
                        "http": { "paths": paths },
                    }
                ],
            }
        }),
    )
}

/// Build all six manifests for one agent. All-or-nothing: any assembly
/// error drops the whole set so the caller retries from scratch.
pub fn build_manifest_set(
    config: &OpenCodeAgentConfig,
    opencode_json: &str,
) -> Result<ManifestSet, ManifestError> {
    Ok(ManifestSet {
        pvc: build_pvc_manifest(config)?,
        secret: build_secret_manifest(config)?,
        config_map: build_config_map_manifest(config, opencode_json)?,
        deployment: build_deployment_manifest(config)?,
        service: build_service_manifest(config)?,
        ingress: build_ingress_manifest(config)?,
    })
}
