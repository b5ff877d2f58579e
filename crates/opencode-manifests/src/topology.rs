//! Container topology definitions.
//!
//! One ordered container list per pod template. These lists are the single
//! source of truth for everything downstream: the Deployment builder, the
//! Service port list, the Ingress routing table, and the lifecycle policy
//! deriver all read from here rather than keeping parallel tables.
//!
//! Two invariants hold for every template:
//! - `pap-client` and `agent-api` are present, essential, and carry no
//!   idle timeout. They are the always-on control plane; losing them loses
//!   the agent's addressability.
//! - every non-essential container declares `idle_timeout_minutes`.
//!   Non-essential containers are interactive surfaces that can scale to
//!   zero without losing agent state (state lives on the PVC).

use crate::config::TemplateType;
use crate::constants::{TERMINAL_IDLE_TIMEOUT_MINUTES, UI_IDLE_TIMEOUT_MINUTES};
use crate::naming::{CONFIG_SOURCE_VOLUME, RUNTIME_CONFIG_VOLUME, WORKSPACE_VOLUME};

const CODE_SERVER_IMAGE: &str = "codercom/code-server:4.96.4";
const OPENCHAMBER_IMAGE: &str = "pluggedin/openchamber:0.9.1";
const OPENCODE_SERVE_IMAGE: &str = "pluggedin/opencode-serve:0.6.3";
const TTYD_IMAGE: &str = "tsl0922/ttyd:1.7.7";
const PAP_CLIENT_IMAGE: &str = "pluggedin/pap-client:1.4.2";
const AGENT_API_IMAGE: &str = "pluggedin/agent-api:1.4.2";
const INIT_IMAGE: &str = "busybox:1.36";

/// Mount point of the shared runtime-config volume in long-running
/// containers.
pub const RUNTIME_CONFIG_MOUNT: &str = "/etc/opencode";

/// Workspace mount point.
pub const WORKSPACE_MOUNT: &str = "/workspace";

/// CPU and memory request/limit quadruple, in Kubernetes quantity
/// notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuad {
    pub cpu_request: &'static str,
    pub cpu_limit: &'static str,
    pub memory_request: &'static str,
    pub memory_limit: &'static str,
}

/// A volume mount inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMountSpec {
    pub name: &'static str,
    pub mount_path: &'static str,
    pub read_only: bool,
}

/// Probe action. HTTP GET where the container serves HTTP, exec
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeHandler {
    HttpGet { path: &'static str, port: i32 },
    Exec { command: Vec<&'static str> },
}

/// Liveness/readiness probe definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    pub handler: ProbeHandler,
    pub initial_delay_seconds: i32,
    pub period_seconds: i32,
}

impl ProbeSpec {
    fn http(path: &'static str, port: i32, initial_delay_seconds: i32) -> Self {
        Self {
            handler: ProbeHandler::HttpGet { path, port },
            initial_delay_seconds,
            period_seconds: 15,
        }
    }
}

/// Static definition of one long-running container in a template pod.
///
/// Not user-configurable: agent configs select a template, never
/// individual containers. Config-derived environment (agent identity,
/// default model) is injected uniformly by the Deployment builder;
/// `secret_env` entries resolve against the agent Secret via
/// `secretKeyRef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: &'static str,
    pub image: &'static str,
    pub port: i32,
    pub port_name: &'static str,
    /// Essential containers are never drained by `pap-client`.
    pub essential: bool,
    /// Required for non-essential containers; ignored by the policy
    /// deriver on essential ones.
    pub idle_timeout_minutes: Option<u32>,
    pub resources: ResourceQuad,
    pub volume_mounts: Vec<VolumeMountSpec>,
    pub liveness: Option<ProbeSpec>,
    pub readiness: Option<ProbeSpec>,
    pub command: Option<Vec<&'static str>>,
    pub args: Option<Vec<&'static str>>,
    pub working_dir: Option<&'static str>,
    /// Fixed environment values.
    pub static_env: Vec<(&'static str, &'static str)>,
    /// (env var, agent-secret key) pairs.
    pub secret_env: Vec<(&'static str, &'static str)>,
}

impl ContainerSpec {
    fn base(name: &'static str, image: &'static str, port: i32, port_name: &'static str) -> Self {
        Self {
            name,
            image,
            port,
            port_name,
            essential: false,
            idle_timeout_minutes: None,
            resources: ResourceQuad {
                cpu_request: "50m",
                cpu_limit: "250m",
                memory_request: "64Mi",
                memory_limit: "256Mi",
            },
            volume_mounts: Vec::new(),
            liveness: None,
            readiness: None,
            command: None,
            args: None,
            working_dir: None,
            static_env: Vec::new(),
            secret_env: Vec::new(),
        }
    }
}

/// The init container that writes `opencode.json` from the mounted
/// ConfigMap into the shared `emptyDir` before the main containers start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitContainerSpec {
    pub name: &'static str,
    pub image: &'static str,
    pub command: Vec<&'static str>,
    pub volume_mounts: Vec<VolumeMountSpec>,
}

/// One Ingress routing rule: a path prefix routed to a named Service
/// port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressPath {
    pub path: &'static str,
    pub port_name: &'static str,
}

fn workspace_mount() -> VolumeMountSpec {
    VolumeMountSpec {
        name: WORKSPACE_VOLUME,
        mount_path: WORKSPACE_MOUNT,
        read_only: false,
    }
}

fn runtime_config_mount() -> VolumeMountSpec {
    VolumeMountSpec {
        name: RUNTIME_CONFIG_VOLUME,
        mount_path: RUNTIME_CONFIG_MOUNT,
        read_only: true,
    }
}

fn pap_client() -> ContainerSpec {
    ContainerSpec {
        essential: true,
        resources: ResourceQuad {
            cpu_request: "10m",
            cpu_limit: "100m",
            memory_request: "32Mi",
            memory_limit: "128Mi",
        },
        secret_env: vec![("PAP_API_KEY", "pap-api-key")],
        ..ContainerSpec::base("pap-client", PAP_CLIENT_IMAGE, 8088, "pap")
    }
}

fn agent_api() -> ContainerSpec {
    ContainerSpec {
        essential: true,
        liveness: Some(ProbeSpec::http("/health", 8090, 10)),
        readiness: Some(ProbeSpec::http("/health", 8090, 5)),
        volume_mounts: vec![workspace_mount()],
        secret_env: vec![("PLUGGEDIN_API_KEY", "pluggedin-api-key")],
        ..ContainerSpec::base("agent-api", AGENT_API_IMAGE, 8090, "http-api")
    }
}

fn ide_containers() -> Vec<ContainerSpec> {
    vec![
        ContainerSpec {
            idle_timeout_minutes: Some(UI_IDLE_TIMEOUT_MINUTES),
            resources: ResourceQuad {
                cpu_request: "250m",
                cpu_limit: "2",
                memory_request: "512Mi",
                memory_limit: "4Gi",
            },
            volume_mounts: vec![workspace_mount(), runtime_config_mount()],
            liveness: Some(ProbeSpec::http("/healthz", 8443, 30)),
            readiness: Some(ProbeSpec::http("/healthz", 8443, 10)),
            args: Some(vec!["--bind-addr", "0.0.0.0:8443", "--auth", "password"]),
            working_dir: Some(WORKSPACE_MOUNT),
            secret_env: vec![("PASSWORD", "ui-password")],
            ..ContainerSpec::base("code-server", CODE_SERVER_IMAGE, 8443, "http-ui")
        },
        pap_client(),
        agent_api(),
    ]
}

fn chamber_containers() -> Vec<ContainerSpec> {
    vec![
        ContainerSpec {
            idle_timeout_minutes: Some(UI_IDLE_TIMEOUT_MINUTES),
            resources: ResourceQuad {
                cpu_request: "100m",
                cpu_limit: "500m",
                memory_request: "256Mi",
                memory_limit: "1Gi",
            },
            liveness: Some(ProbeSpec::http("/", 3000, 15)),
            readiness: Some(ProbeSpec::http("/", 3000, 5)),
            static_env: vec![("OPENCODE_SERVER_URL", "http://localhost:4096")],
            secret_env: vec![("UI_PASSWORD", "ui-password")],
            ..ContainerSpec::base("openchamber", OPENCHAMBER_IMAGE, 3000, "http")
        },
        ContainerSpec {
            idle_timeout_minutes: Some(UI_IDLE_TIMEOUT_MINUTES),
            resources: ResourceQuad {
                cpu_request: "250m",
                cpu_limit: "2",
                memory_request: "512Mi",
                memory_limit: "4Gi",
            },
            volume_mounts: vec![workspace_mount(), runtime_config_mount()],
            liveness: Some(ProbeSpec::http("/health", 4096, 20)),
            command: Some(vec!["opencode"]),
            args: Some(vec!["serve", "--hostname", "0.0.0.0", "--port", "4096"]),
            working_dir: Some(WORKSPACE_MOUNT),
            static_env: vec![("OPENCODE_CONFIG", "/etc/opencode/opencode.json")],
            secret_env: vec![("MODEL_ROUTER_API_KEY", "model-router-token")],
            ..ContainerSpec::base("opencode-serve", OPENCODE_SERVE_IMAGE, 4096, "opencode")
        },
        ContainerSpec {
            idle_timeout_minutes: Some(TERMINAL_IDLE_TIMEOUT_MINUTES),
            resources: ResourceQuad {
                cpu_request: "50m",
                cpu_limit: "200m",
                memory_request: "64Mi",
                memory_limit: "256Mi",
            },
            volume_mounts: vec![workspace_mount()],
            command: Some(vec!["ttyd"]),
            args: Some(vec!["-W", "-p", "7681", "bash"]),
            working_dir: Some(WORKSPACE_MOUNT),
            ..ContainerSpec::base("ttyd", TTYD_IMAGE, 7681, "terminal")
        },
        pap_client(),
        agent_api(),
    ]
}

impl TemplateType {
    /// Ordered container list for this template.
    #[must_use]
    pub fn containers(&self) -> Vec<ContainerSpec> {
        match self {
            Self::Ide => ide_containers(),
            Self::Chamber => chamber_containers(),
        }
    }

    /// The single user-facing main UI container of this template.
    #[must_use]
    pub fn main_ui_container(&self) -> &'static str {
        match self {
            Self::Ide => "code-server",
            Self::Chamber => "openchamber",
        }
    }

    /// The `opencode-init` container shared by both templates.
    #[must_use]
    pub fn init_container(&self) -> InitContainerSpec {
        InitContainerSpec {
            name: "opencode-init",
            image: INIT_IMAGE,
            command: vec![
                "sh",
                "-c",
                "cp /config/opencode.json /etc/opencode/opencode.json",
            ],
            volume_mounts: vec![
                VolumeMountSpec {
                    name: CONFIG_SOURCE_VOLUME,
                    mount_path: "/config",
                    read_only: true,
                },
                VolumeMountSpec {
                    name: RUNTIME_CONFIG_VOLUME,
                    mount_path: RUNTIME_CONFIG_MOUNT,
                    read_only: false,
                },
            ],
        }
    }

    /// Ordered Ingress path list for this template.
    ///
    /// Specific prefixes come first; the catch-all `/` must stay the last
    /// entry per host or the ingress controller may never match the
    /// sub-paths.
    #[must_use]
    pub fn ingress_paths(&self) -> Vec<IngressPath> {
        match self {
            Self::Ide => vec![
                IngressPath {
                    path: "/api",
                    port_name: "http-api",
                },
                IngressPath {
                    path: "/health",
                    port_name: "http-api",
                },
                IngressPath {
                    path: "/metrics",
                    port_name: "metrics",
                },
                IngressPath {
                    path: "/",
                    port_name: "http-ui",
                },
            ],
            Self::Chamber => vec![
                IngressPath {
                    path: "/api",
                    port_name: "http-api",
                },
                IngressPath {
                    path: "/health",
                    port_name: "http-api",
                },
                IngressPath {
                    path: "/metrics",
                    port_name: "metrics",
                },
                IngressPath {
                    path: "/terminal",
                    port_name: "terminal",
                },
                IngressPath {
                    path: "/opencode",
                    port_name: "opencode",
                },
                IngressPath {
                    path: "/",
                    port_name: "http",
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATES: [TemplateType; 2] = [TemplateType::Ide, TemplateType::Chamber];

    #[test]
    fn test_infrastructure_containers_present_in_every_template() {
        for template in TEMPLATES {
            let containers = template.containers();
            for name in ["pap-client", "agent-api"] {
                let spec = containers
                    .iter()
                    .find(|c| c.name == name)
                    .unwrap_or_else(|| panic!("{name} missing from {template}"));
                assert!(spec.essential, "{name} must be essential");
                assert!(
                    spec.idle_timeout_minutes.is_none(),
                    "{name} must not carry an idle timeout"
                );
            }
        }
    }

    #[test]
    fn test_every_non_essential_container_declares_idle_timeout() {
        for template in TEMPLATES {
            for spec in template.containers() {
                if !spec.essential {
                    assert!(
                        spec.idle_timeout_minutes.is_some(),
                        "{} in {template} lacks an idle timeout",
                        spec.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_exactly_one_main_ui_container_per_template() {
        for template in TEMPLATES {
            let containers = template.containers();
            let main = template.main_ui_container();
            assert_eq!(
                containers.iter().filter(|c| c.name == main).count(),
                1,
                "main UI container {main} must appear exactly once"
            );
            assert!(!containers
                .iter()
                .find(|c| c.name == main)
                .unwrap()
                .essential);
        }
    }

    #[test]
    fn test_chamber_terminal_has_shorter_timeout_than_ui() {
        let containers = TemplateType::Chamber.containers();
        let ttyd = containers.iter().find(|c| c.name == "ttyd").unwrap();
        let ui = containers.iter().find(|c| c.name == "openchamber").unwrap();
        assert!(ttyd.idle_timeout_minutes.unwrap() < ui.idle_timeout_minutes.unwrap());
    }

    #[test]
    fn test_container_names_and_ports_are_unique() {
        for template in TEMPLATES {
            let containers = template.containers();
            let mut names: Vec<_> = containers.iter().map(|c| c.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), containers.len());

            let mut ports: Vec<_> = containers.iter().map(|c| c.port).collect();
            ports.sort_unstable();
            ports.dedup();
            assert_eq!(ports.len(), containers.len());
        }
    }

    #[test]
    fn test_ingress_catch_all_is_last() {
        for template in TEMPLATES {
            let paths = template.ingress_paths();
            assert_eq!(paths.last().unwrap().path, "/");
            assert!(paths[..paths.len() - 1].iter().all(|p| p.path != "/"));
        }
    }

    #[test]
    fn test_ingress_paths_target_known_port_names() {
        for template in TEMPLATES {
            let containers = template.containers();
            for entry in template.ingress_paths() {
                let known = entry.port_name == "metrics"
                    || containers.iter().any(|c| c.port_name == entry.port_name);
                assert!(known, "{} routes to unknown port {}", entry.path, entry.port_name);
            }
        }
    }

    #[test]
    fn test_init_container_bridges_config_to_runtime_volume() {
        let init = TemplateType::Ide.init_container();
        assert_eq!(init.name, "opencode-init");
        let mounts: Vec<_> = init.volume_mounts.iter().map(|m| m.name).collect();
        assert!(mounts.contains(&CONFIG_SOURCE_VOLUME));
        assert!(mounts.contains(&RUNTIME_CONFIG_VOLUME));
    }

    #[test]
    fn test_runtime_config_mounted_read_only_in_main_containers() {
        for template in TEMPLATES {
            for spec in template.containers() {
                for mount in &spec.volume_mounts {
                    if mount.name == RUNTIME_CONFIG_VOLUME {
                        assert!(mount.read_only, "{} mounts runtime config rw", spec.name);
                    }
                }
            }
        }
    }
}
