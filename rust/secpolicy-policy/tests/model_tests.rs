// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Document-model construction tests: build-time validation and mount
//! lowering.

mod common;

use common::{alpine_container, re2_rule, string_rule};
use secpolicy_policy::{Container, EnvRuleConfig, MountConfig, PolicyError, SecurityPolicy};

fn minimal_container(env_rules: Vec<EnvRuleConfig>) -> Result<Container, PolicyError> {
    Container::new(
        vec!["/pause".to_string()],
        env_rules,
        vec!["layer0".to_string()],
        Vec::new(),
        Vec::new(),
        Vec::new(),
        false,
        "/".to_string(),
        true,
    )
}

#[test]
fn allow_all_excludes_containers() {
    let err = SecurityPolicy::new(
        true,
        vec![alpine_container()],
        Vec::new(),
        Vec::new(),
        true,
        true,
        true,
        true,
        true,
    )
    .unwrap_err();

    assert!(matches!(err, PolicyError::InvalidOpenDoorPolicy));
}

#[test]
fn allow_all_with_no_containers_is_fine() {
    let policy = SecurityPolicy::new(
        true,
        Vec::new(),
        Vec::new(),
        Vec::new(),
        true,
        true,
        true,
        true,
        true,
    )
    .unwrap();
    assert!(policy.allow_all());
}

#[test]
fn open_door_grants_everything() {
    let policy = SecurityPolicy::open_door();
    assert!(policy.allow_all());
    assert!(policy.containers().is_empty());
    assert!(policy.allow_properties_access());
    assert!(policy.allow_dump_stacks());
    assert!(policy.allow_runtime_logging());
    assert!(policy.allow_environment_variable_dropping());
    assert!(policy.allow_unencrypted_scratch());
}

#[test]
fn invalid_re2_rule_fails_at_construction() {
    match minimal_container(vec![re2_rule("PATH=[")]).unwrap_err() {
        PolicyError::InvalidPattern { rule, .. } => assert_eq!(rule, "PATH=["),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn string_rules_are_not_pattern_checked() {
    // A literal rule may contain regex metacharacters freely.
    minimal_container(vec![string_rule("WEIRD=[unclosed", true)]).expect("literal rule accepted");
}

#[test]
fn invalid_re2_rule_on_external_process_fails() {
    let process = secpolicy_policy::ExternalProcessConfig {
        command: vec!["bash".to_string()],
        working_dir: "/".to_string(),
        env_rules: vec![re2_rule("(")],
        allow_stdio_access: true,
    };

    let err = SecurityPolicy::new(
        false,
        Vec::new(),
        vec![process],
        Vec::new(),
        true,
        true,
        true,
        true,
        true,
    )
    .unwrap_err();
    assert!(matches!(err, PolicyError::InvalidPattern { .. }));
}

#[test]
fn duplicate_containers_are_legal() {
    // Multiple pod containers may share identical rules.
    let policy = SecurityPolicy::new(
        false,
        vec![alpine_container(), alpine_container()],
        Vec::new(),
        Vec::new(),
        true,
        true,
        true,
        true,
        true,
    )
    .unwrap();
    assert_eq!(policy.containers().len(), 2);
    assert_eq!(policy.containers()[0], policy.containers()[1]);
}

#[test]
fn layer_order_is_preserved() {
    let layers: Vec<String> = (0..5).map(|i| format!("layer{i}")).collect();
    let container = Container::new(
        vec!["/pause".to_string()],
        Vec::new(),
        layers.clone(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        false,
        "/".to_string(),
        true,
    )
    .unwrap();

    assert_eq!(container.layers(), layers.as_slice());
}

#[test]
fn readonly_flag_selects_mount_options() {
    let ro = Container::new(
        vec!["/pause".to_string()],
        Vec::new(),
        Vec::new(),
        vec![MountConfig {
            host_path: "/host".to_string(),
            container_path: "/ctr".to_string(),
            readonly: true,
        }],
        Vec::new(),
        Vec::new(),
        false,
        "/".to_string(),
        true,
    )
    .unwrap();

    // Lowered mounts only surface through rendering; check the Rego form.
    let policy = SecurityPolicy::new(
        false, vec![ro], Vec::new(), Vec::new(), true, true, true, true, true,
    )
    .unwrap();
    let rendered = policy.marshal(secpolicy_policy::PolicyFormat::Rego).unwrap();
    assert!(rendered.contains(r#"{"destination": "/ctr", "options": ["rbind","rshared","ro"], "source": "/host", "type": "bind"}"#));
}
