// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared builders for `secpolicy-policy` integration tests.

#![allow(dead_code)]

use secpolicy_policy::{
    Container, EnvRuleConfig, EnvRuleStrategy, ExecProcessConfig, ExternalProcessConfig,
    MountConfig, SecurityPolicy,
};

pub fn string_rule(rule: &str, required: bool) -> EnvRuleConfig {
    EnvRuleConfig {
        rule: rule.to_string(),
        strategy: EnvRuleStrategy::String,
        required,
    }
}

pub fn re2_rule(rule: &str) -> EnvRuleConfig {
    EnvRuleConfig {
        rule: rule.to_string(),
        strategy: EnvRuleStrategy::Re2,
        required: false,
    }
}

/// A small but fully populated container.
pub fn alpine_container() -> Container {
    Container::new(
        vec!["ash".to_string(), "-c".to_string(), "echo 'Hello'".to_string()],
        vec![string_rule("TERM=xterm", false), re2_rule("PATH=.*")],
        vec![
            "1b80f120dbd88e4355d6241b519c3e25290215c469516b49dece9cf07175a766".to_string(),
            "e769d7487cc314d3ee748a4440805317c19262c7acd2fdbdb0d47d2e4613a15c".to_string(),
        ],
        vec![MountConfig {
            host_path: "/var/lib/shared".to_string(),
            container_path: "/mnt/shared".to_string(),
            readonly: true,
        }],
        vec![ExecProcessConfig {
            command: vec!["sh".to_string()],
            signals: vec![9, 15],
        }],
        vec![15],
        false,
        "/".to_string(),
        true,
    )
    .unwrap()
}

pub fn dev_mapper_process() -> ExternalProcessConfig {
    ExternalProcessConfig {
        command: vec!["ls".to_string(), "-l".to_string(), "/dev/mapper".to_string()],
        working_dir: "/".to_string(),
        env_rules: vec![string_rule("IS_TERMINAL=true", false)],
        allow_stdio_access: true,
    }
}

/// A closed policy with one container and one external process.
pub fn basic_policy() -> SecurityPolicy {
    SecurityPolicy::new(
        false,
        vec![alpine_container()],
        vec![dev_mapper_process()],
        Vec::new(),
        true,
        true,
        true,
        false,
        true,
    )
    .unwrap()
}
