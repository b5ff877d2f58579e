//! Cross-manifest consistency tests.
//!
//! The six objects are independent literals tied together only by naming
//! conventions; these tests pin the cross-references that the cluster
//! runtime depends on.

use opencode_manifests::{
    build_manifest_set, container_policies, parse_lifecycle_annotations, OpenCodeAgentConfig,
    ResourceNames, TemplateType,
};

fn agent_config(template: TemplateType) -> OpenCodeAgentConfig {
    OpenCodeAgentConfig {
        name: "bot1".to_string(),
        namespace: "agents".to_string(),
        dns_name: "bot1.is.plugged.in".to_string(),
        template_type: template,
        ui_password: "pw".to_string(),
        model_router_token: "tok".to_string(),
        pap_api_key: "pap".to_string(),
        pluggedin_api_key: "pk".to_string(),
        default_model: "claude-sonnet-4-20250514".to_string(),
        agent_uuid: "u-1".to_string(),
        workspace_storage_size: None,
    }
}

const TEMPLATES: [TemplateType; 2] = [TemplateType::Ide, TemplateType::Chamber];

#[test]
fn deployment_references_the_built_pvc_and_config_map() {
    for template in TEMPLATES {
        let config = agent_config(template);
        let names = ResourceNames::derive(&config);
        let set = build_manifest_set(&config, "{}").unwrap();

        assert_eq!(set.pvc.metadata.name.as_deref(), Some(names.pvc_name.as_str()));
        assert_eq!(
            set.config_map.metadata.name.as_deref(),
            Some(names.config_map_name.as_str())
        );

        let volumes = set
            .deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .volumes
            .clone()
            .unwrap();

        let claim = volumes
            .iter()
            .find_map(|v| v.persistent_volume_claim.as_ref())
            .expect("workspace volume missing");
        assert_eq!(claim.claim_name, names.pvc_name);

        let cm = volumes
            .iter()
            .find_map(|v| v.config_map.as_ref())
            .expect("config volume missing");
        assert_eq!(cm.name, names.config_map_name);

        assert!(volumes.iter().any(|v| v.empty_dir.is_some()));
    }
}

#[test]
fn every_secret_ref_in_the_pod_resolves_to_a_secret_key() {
    for template in TEMPLATES {
        let config = agent_config(template);
        let names = ResourceNames::derive(&config);
        let set = build_manifest_set(&config, "{}").unwrap();
        let secret_keys: Vec<String> = set.secret.data.unwrap().keys().cloned().collect();

        let pod_spec = set.deployment.spec.unwrap().template.spec.unwrap();
        for container in &pod_spec.containers {
            for env in container.env.iter().flatten() {
                if let Some(secret_ref) = env
                    .value_from
                    .as_ref()
                    .and_then(|v| v.secret_key_ref.as_ref())
                {
                    assert_eq!(
                        secret_ref.name, names.secret_name,
                        "{} references a foreign secret",
                        container.name
                    );
                    assert!(
                        secret_keys.contains(&secret_ref.key),
                        "{} references unknown secret key {}",
                        container.name,
                        secret_ref.key
                    );
                }
            }
        }
    }
}

#[test]
fn service_selector_matches_pod_template_labels() {
    for template in TEMPLATES {
        let set = build_manifest_set(&agent_config(template), "{}").unwrap();
        let selector = set.service.spec.unwrap().selector.unwrap();
        let deployment_spec = set.deployment.spec.unwrap();
        let pod_labels = deployment_spec.template.metadata.unwrap().labels.unwrap();
        let match_labels = deployment_spec.selector.match_labels.unwrap();

        for (k, v) in &selector {
            assert_eq!(pod_labels.get(k), Some(v));
            assert_eq!(match_labels.get(k), Some(v));
        }
    }
}

#[test]
fn every_ingress_backend_port_exists_on_the_service() {
    for template in TEMPLATES {
        let set = build_manifest_set(&agent_config(template), "{}").unwrap();
        let service_ports: Vec<String> = set
            .service
            .spec
            .unwrap()
            .ports
            .unwrap()
            .iter()
            .filter_map(|p| p.name.clone())
            .collect();

        let rules = set.ingress.spec.unwrap().rules.unwrap();
        for rule in rules {
            for path in &rule.http.unwrap().paths {
                let backend = path.backend.service.as_ref().unwrap();
                assert_eq!(backend.name, "bot1");
                let port_name = backend.port.as_ref().unwrap().name.clone().unwrap();
                assert!(
                    service_ports.contains(&port_name),
                    "ingress path {:?} targets unknown service port {port_name}",
                    path.path
                );
            }
        }
    }
}

#[test]
fn published_annotations_decode_to_the_derived_policies() {
    for template in TEMPLATES {
        let set = build_manifest_set(&agent_config(template), "{}").unwrap();
        let annotations = set
            .deployment
            .spec
            .unwrap()
            .template
            .metadata
            .unwrap()
            .annotations
            .unwrap();

        assert_eq!(
            parse_lifecycle_annotations(&annotations),
            container_policies(template)
        );
    }
}

#[test]
fn repeat_builds_are_deep_equal() {
    for template in TEMPLATES {
        let config = agent_config(template);
        let first = build_manifest_set(&config, r#"{"model":"pluggedin/x"}"#).unwrap();
        let second = build_manifest_set(&config, r#"{"model":"pluggedin/x"}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&first.pvc).unwrap(),
            serde_json::to_value(&second.pvc).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&first.config_map).unwrap(),
            serde_json::to_value(&second.config_map).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&first.deployment).unwrap(),
            serde_json::to_value(&second.deployment).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&first.service).unwrap(),
            serde_json::to_value(&second.service).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&first.ingress).unwrap(),
            serde_json::to_value(&second.ingress).unwrap()
        );
    }
}

#[test]
fn all_objects_share_the_agent_namespace() {
    let set = build_manifest_set(&agent_config(TemplateType::Chamber), "{}").unwrap();
    for namespace in [
        set.pvc.metadata.namespace,
        set.secret.metadata.namespace,
        set.config_map.metadata.namespace,
        set.deployment.metadata.namespace,
        set.service.metadata.namespace,
        set.ingress.metadata.namespace,
    ] {
        assert_eq!(namespace.as_deref(), Some("agents"));
    }
}
