//! Lifecycle policy derivation.
//!
//! `pap-client` drains idle non-essential containers based on the pod
//! annotation map the Deployment builder publishes. Everything here is
//! derived from the topology definitions so the policy can never drift
//! from the authoritative container specs, and the annotation
//! encode/parse pair keeps the external contract testable in-repo.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{LimitsConfig, TemplateType};
use crate::constants::ANNOTATION_PREFIX;
use crate::topology::ContainerSpec;

/// Per-container lifecycle policy consumed by `pap-client`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPolicy {
    /// Essential containers are never drained.
    pub essential: bool,
    /// Idle minutes before a non-essential container is drained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_minutes: Option<u32>,
}

/// Static lookup table `{container name -> policy}` for a template,
/// so the lifecycle agent never has to re-parse the full Deployment.
///
/// Idle timeouts on essential containers are ignored here by contract.
#[must_use]
pub fn container_policies(template: TemplateType) -> BTreeMap<String, ContainerPolicy> {
    template
        .containers()
        .iter()
        .map(|spec| {
            (
                spec.name.to_string(),
                ContainerPolicy {
                    essential: spec.essential,
                    idle_timeout_minutes: if spec.essential {
                        None
                    } else {
                        spec.idle_timeout_minutes
                    },
                },
            )
        })
        .collect()
}

/// Pod annotations encoding the lifecycle policy:
/// `pap.plugged.in/{container}.essential`, `.idleTimeout` (`"{N}m"`),
/// and `pap.plugged.in/template`. This map is the only channel between
/// the manifests and the lifecycle agent.
#[must_use]
pub fn lifecycle_annotations(template: TemplateType) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        format!("{ANNOTATION_PREFIX}/template"),
        template.to_string(),
    );
    for (name, policy) in container_policies(template) {
        annotations.insert(
            format!("{ANNOTATION_PREFIX}/{name}.essential"),
            policy.essential.to_string(),
        );
        if let Some(minutes) = policy.idle_timeout_minutes {
            annotations.insert(
                format!("{ANNOTATION_PREFIX}/{name}.idleTimeout"),
                format!("{minutes}m"),
            );
        }
    }
    annotations
}

/// Decode a pod annotation map back into per-container policies.
///
/// Mirrors what `pap-client` does cluster-side; kept here so the
/// annotation contract is round-trip tested against the encoder.
#[must_use]
pub fn parse_lifecycle_annotations(
    annotations: &BTreeMap<String, String>,
) -> BTreeMap<String, ContainerPolicy> {
    let mut policies: BTreeMap<String, ContainerPolicy> = BTreeMap::new();
    let prefix = format!("{ANNOTATION_PREFIX}/");

    for (key, value) in annotations {
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        if let Some(name) = rest.strip_suffix(".essential") {
            policies
                .entry(name.to_string())
                .or_insert(ContainerPolicy {
                    essential: false,
                    idle_timeout_minutes: None,
                })
                .essential = value == "true";
        } else if let Some(name) = rest.strip_suffix(".idleTimeout") {
            let minutes = value.strip_suffix('m').and_then(|v| v.parse().ok());
            policies
                .entry(name.to_string())
                .or_insert(ContainerPolicy {
                    essential: false,
                    idle_timeout_minutes: None,
                })
                .idle_timeout_minutes = minutes;
        }
    }

    policies
}

/// A coarse resource amount in scheduler-friendly units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub cpu_millis: u64,
    pub memory_mi: u64,
}

/// Active/idle/sleep resource tiers for cost-estimation display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEstimates {
    /// All containers running, worst case (limits).
    pub active: ResourceEstimate,
    /// Non-essential containers drained, essential at limit.
    pub idle: ResourceEstimate,
    /// Non-essential containers drained, essential at steady-state
    /// request level.
    pub sleep: ResourceEstimate,
}

/// Compute the three resource tiers for a template by summing the actual
/// container specs, clamped to the process-level ceilings.
///
/// Computed rather than hand-tuned so the estimates cannot diverge from
/// the topology definitions.
#[must_use]
pub fn resource_estimates(template: TemplateType, limits: &LimitsConfig) -> ResourceEstimates {
    let containers = template.containers();
    let essential: Vec<&ContainerSpec> = containers.iter().filter(|c| c.essential).collect();

    let sum = |specs: &[&ContainerSpec], at_limit: bool| -> ResourceEstimate {
        let (mut cpu, mut memory) = (0u64, 0u64);
        for spec in specs {
            if at_limit {
                cpu += parse_cpu_millis(spec.resources.cpu_limit);
                memory += parse_memory_mi(spec.resources.memory_limit);
            } else {
                cpu += parse_cpu_millis(spec.resources.cpu_request);
                memory += parse_memory_mi(spec.resources.memory_request);
            }
        }
        ResourceEstimate {
            cpu_millis: limits.clamp_cpu_millis(cpu),
            memory_mi: limits.clamp_memory_mi(memory),
        }
    };

    let all: Vec<&ContainerSpec> = containers.iter().collect();
    ResourceEstimates {
        active: sum(&all, true),
        idle: sum(&essential, true),
        sleep: sum(&essential, false),
    }
}

/// Parse a Kubernetes CPU quantity (`"250m"` or whole cores) into
/// millicores.
fn parse_cpu_millis(quantity: &str) -> u64 {
    if let Some(millis) = quantity.strip_suffix('m') {
        millis.parse().unwrap_or(0)
    } else {
        quantity.parse::<u64>().unwrap_or(0) * 1000
    }
}

/// Parse a Kubernetes memory quantity (`"512Mi"` / `"4Gi"`) into Mi.
fn parse_memory_mi(quantity: &str) -> u64 {
    if let Some(mi) = quantity.strip_suffix("Mi") {
        mi.parse().unwrap_or(0)
    } else if let Some(gi) = quantity.strip_suffix("Gi") {
        gi.parse::<u64>().unwrap_or(0) * 1024
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATES: [TemplateType; 2] = [TemplateType::Ide, TemplateType::Chamber];

    #[test]
    fn test_policies_match_topology_names_and_flags() {
        for template in TEMPLATES {
            let policies = container_policies(template);
            let containers = template.containers();
            assert_eq!(policies.len(), containers.len());
            for spec in containers {
                let policy = &policies[spec.name];
                assert_eq!(policy.essential, spec.essential);
                if !spec.essential {
                    assert_eq!(policy.idle_timeout_minutes, spec.idle_timeout_minutes);
                }
            }
        }
    }

    #[test]
    fn test_essential_containers_never_carry_timeouts() {
        for template in TEMPLATES {
            for policy in container_policies(template).values() {
                if policy.essential {
                    assert!(policy.idle_timeout_minutes.is_none());
                }
            }
        }
    }

    #[test]
    fn test_annotation_round_trip() {
        for template in TEMPLATES {
            let annotations = lifecycle_annotations(template);
            assert_eq!(
                annotations[&format!("{ANNOTATION_PREFIX}/template")],
                template.as_str()
            );
            let parsed = parse_lifecycle_annotations(&annotations);
            assert_eq!(parsed, container_policies(template));
        }
    }

    #[test]
    fn test_parse_ignores_foreign_annotations() {
        let mut annotations = lifecycle_annotations(TemplateType::Ide);
        annotations.insert("prometheus.io/scrape".to_string(), "true".to_string());
        annotations.insert("pap.plugged.in/template".to_string(), "x".to_string());
        let parsed = parse_lifecycle_annotations(&annotations);
        assert_eq!(parsed, container_policies(TemplateType::Ide));
    }

    #[test]
    fn test_estimates_are_monotonic_per_tier() {
        let limits = LimitsConfig::default();
        for template in TEMPLATES {
            let estimates = resource_estimates(template, &limits);
            assert!(estimates.active.cpu_millis >= estimates.idle.cpu_millis);
            assert!(estimates.idle.cpu_millis >= estimates.sleep.cpu_millis);
            assert!(estimates.active.memory_mi >= estimates.idle.memory_mi);
            assert!(estimates.idle.memory_mi >= estimates.sleep.memory_mi);
            assert!(estimates.sleep.cpu_millis > 0);
            assert!(estimates.sleep.memory_mi > 0);
        }
    }

    #[test]
    fn test_estimates_respect_limit_ceilings() {
        let limits = LimitsConfig {
            max_memory_gi: 1,
            max_cpu_cores: 1,
        };
        let estimates = resource_estimates(TemplateType::Chamber, &limits);
        assert_eq!(estimates.active.cpu_millis, 1000);
        assert_eq!(estimates.active.memory_mi, 1024);
    }

    #[test]
    fn test_idle_tier_sums_essential_limits() {
        let limits = LimitsConfig::default();
        let containers = TemplateType::Ide.containers();
        let expected_cpu: u64 = containers
            .iter()
            .filter(|c| c.essential)
            .map(|c| parse_cpu_millis(c.resources.cpu_limit))
            .sum();
        let estimates = resource_estimates(TemplateType::Ide, &limits);
        assert_eq!(estimates.idle.cpu_millis, expected_cpu);
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(parse_cpu_millis("250m"), 250);
        assert_eq!(parse_cpu_millis("2"), 2000);
        assert_eq!(parse_memory_mi("512Mi"), 512);
        assert_eq!(parse_memory_mi("4Gi"), 4096);
    }
}
