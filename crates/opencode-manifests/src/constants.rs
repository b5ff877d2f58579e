//! Deployment and lifecycle constants.
//!
//! Pure data shared by the manifest builders and, through the pod
//! annotation contract, the external `pap-client` lifecycle agent. The
//! heartbeat and zombie-detection values are the authoritative copy of the
//! numbers `pap-client` enforces cluster-side.

/// Annotation prefix for the lifecycle contract consumed by `pap-client`.
pub const ANNOTATION_PREFIX: &str = "pap.plugged.in";

/// Default workspace PVC size when the agent config does not override it.
pub const DEFAULT_WORKSPACE_SIZE: &str = "10Gi";

/// Single-node-friendly provisioner backing every workspace PVC.
pub const STORAGE_CLASS: &str = "local-path";

/// Fixed metrics port exposed on the Service, served by `agent-api`.
pub const METRICS_PORT: i32 = 9090;

/// cert-manager ClusterIssuer terminating Ingress TLS.
pub const CLUSTER_ISSUER: &str = "letsencrypt-prod";

/// Idle timeout for interactive UI containers.
pub const UI_IDLE_TIMEOUT_MINUTES: u32 = 30;

/// Idle timeout for web terminals. Shorter than the UI tier because a
/// terminal session is cheap to respawn.
pub const TERMINAL_IDLE_TIMEOUT_MINUTES: u32 = 15;

// Heartbeat interval tiers emitted by `agent-api` and watched by
// `pap-client`.

/// Heartbeat period while any non-essential container is serving traffic.
pub const HEARTBEAT_ACTIVE_INTERVAL_SECS: u64 = 30;

/// Heartbeat period after the idle timeout has begun counting down.
pub const HEARTBEAT_IDLE_INTERVAL_SECS: u64 = 120;

/// Heartbeat period once non-essential containers are drained.
pub const HEARTBEAT_SLEEP_INTERVAL_SECS: u64 = 300;

/// Consecutive missed heartbeats before an agent is declared a zombie,
/// expressed as a multiple of the current interval tier.
pub const ZOMBIE_DETECTION_MULTIPLIER: u32 = 3;

/// Floor on missed heartbeats regardless of tier, so a single dropped
/// packet never triggers a drain.
pub const ZOMBIE_MIN_MISSED_HEARTBEATS: u32 = 2;

/// Clock-skew window within which a replayed heartbeat timestamp is still
/// accepted.
pub const HEARTBEAT_REPLAY_TOLERANCE_SECS: u64 = 90;

/// Default ceiling on total pod memory, overridable via `MAX_MEMORY_GI`.
pub const DEFAULT_MAX_MEMORY_GI: u32 = 16;

/// Default ceiling on total pod CPU, overridable via `MAX_CPU_CORES`.
pub const DEFAULT_MAX_CPU_CORES: u32 = 8;
