// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The in-memory policy document model.
//!
//! Structural invariants are enforced at construction time, never at
//! render time: `allow_all` excludes containers, and every `re2` env rule
//! must compile. Duplicate containers are legal; several pod containers
//! may share identical rules. Layer order is image order (bottom to top)
//! and is never reordered by any serializer. Fragment order determines the
//! order of their contributions in the rendered document, which in turn is
//! rule-matching precedence in the decision engine.

use regex::Regex;

use crate::PolicyError;

/// How an environment variable rule matches candidate `KEY=VALUE` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvRuleStrategy {
    /// Exact string match.
    String,
    /// RE2-style regular expression match.
    Re2,
}

impl EnvRuleStrategy {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            EnvRuleStrategy::String => "string",
            EnvRuleStrategy::Re2 => "re2",
        }
    }
}

/// One environment variable rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvRuleConfig {
    /// A literal `KEY=VALUE` or a pattern, per `strategy`.
    pub rule: String,
    pub strategy: EnvRuleStrategy,
    pub required: bool,
}

/// An authored mount constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// Host-side path, literal or regex.
    pub host_path: String,
    pub container_path: String,
    pub readonly: bool,
}

/// The bind-mount form mounts are lowered to for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mount {
    pub destination: String,
    pub options: Vec<String>,
    pub source: String,
    pub mount_type: String,
}

impl Mount {
    fn from_config(config: &MountConfig) -> Self {
        let mut options = vec!["rbind".to_string(), "rshared".to_string()];
        options.push(if config.readonly { "ro" } else { "rw" }.to_string());

        Mount {
            destination: config.container_path.clone(),
            options,
            source: config.host_path.clone(),
            mount_type: "bind".to_string(),
        }
    }
}

/// A process the policy allows to be exec'd into a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecProcessConfig {
    pub command: Vec<String>,
    /// Signal numbers the process may be sent.
    pub signals: Vec<i32>,
}

/// A process started in the sandbox but outside any container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProcessConfig {
    pub command: Vec<String>,
    pub working_dir: String,
    pub env_rules: Vec<EnvRuleConfig>,
    pub allow_stdio_access: bool,
}

/// A trusted-fragment reference authored into a consumer policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentConfig {
    pub issuer: String,
    pub feed: String,
    pub minimum_svn: String,
    /// Which sub-objects the fragment may contribute, e.g. `containers`.
    pub includes: Vec<String>,
}

/// One container's policy unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    command: Vec<String>,
    env_rules: Vec<EnvRuleConfig>,
    layers: Vec<String>,
    mounts: Vec<Mount>,
    exec_processes: Vec<ExecProcessConfig>,
    signals: Vec<i32>,
    allow_elevated: bool,
    working_dir: String,
    allow_stdio_access: bool,
}

impl Container {
    /// Build a container policy unit, validating env rules and lowering
    /// mounts to their rendered bind-mount form.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command: Vec<String>,
        env_rules: Vec<EnvRuleConfig>,
        layers: Vec<String>,
        mounts: Vec<MountConfig>,
        exec_processes: Vec<ExecProcessConfig>,
        signals: Vec<i32>,
        allow_elevated: bool,
        working_dir: String,
        allow_stdio_access: bool,
    ) -> Result<Self, PolicyError> {
        validate_env_rules(&env_rules)?;

        Ok(Container {
            command,
            env_rules,
            layers,
            mounts: mounts.iter().map(Mount::from_config).collect(),
            exec_processes,
            signals,
            allow_elevated,
            working_dir,
            allow_stdio_access,
        })
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn env_rules(&self) -> &[EnvRuleConfig] {
        &self.env_rules
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn exec_processes(&self) -> &[ExecProcessConfig] {
        &self.exec_processes
    }

    pub fn signals(&self) -> &[i32] {
        &self.signals
    }

    pub fn allow_elevated(&self) -> bool {
        self.allow_elevated
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub fn allow_stdio_access(&self) -> bool {
        self.allow_stdio_access
    }

    pub(crate) fn mounts(&self) -> &[Mount] {
        &self.mounts
    }
}

pub(crate) fn validate_env_rules(env_rules: &[EnvRuleConfig]) -> Result<(), PolicyError> {
    for rule in env_rules {
        if rule.strategy == EnvRuleStrategy::Re2 {
            if let Err(e) = Regex::new(&rule.rule) {
                return Err(PolicyError::InvalidPattern {
                    rule: rule.rule.clone(),
                    detail: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// The root policy document.
///
/// Owns its containers, external processes and fragment references by
/// value; built once, rendered once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    allow_all: bool,
    containers: Vec<Container>,
    external_processes: Vec<ExternalProcessConfig>,
    fragments: Vec<FragmentConfig>,
    allow_properties_access: bool,
    allow_dump_stacks: bool,
    allow_runtime_logging: bool,
    allow_environment_variable_dropping: bool,
    allow_unencrypted_scratch: bool,
}

impl SecurityPolicy {
    /// Build a policy document.
    ///
    /// `allow_all` is mutually exclusive with a non-empty container list;
    /// the conflict is a construction error, never silently resolved.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        allow_all: bool,
        containers: Vec<Container>,
        external_processes: Vec<ExternalProcessConfig>,
        fragments: Vec<FragmentConfig>,
        allow_properties_access: bool,
        allow_dump_stacks: bool,
        allow_runtime_logging: bool,
        allow_environment_variable_dropping: bool,
        allow_unencrypted_scratch: bool,
    ) -> Result<Self, PolicyError> {
        if allow_all && !containers.is_empty() {
            return Err(PolicyError::InvalidOpenDoorPolicy);
        }

        for process in &external_processes {
            validate_env_rules(&process.env_rules)?;
        }

        Ok(SecurityPolicy {
            allow_all,
            containers,
            external_processes,
            fragments,
            allow_properties_access,
            allow_dump_stacks,
            allow_runtime_logging,
            allow_environment_variable_dropping,
            allow_unencrypted_scratch,
        })
    }

    /// The all-permissive policy: no containers, everything granted.
    pub fn open_door() -> Self {
        SecurityPolicy {
            allow_all: true,
            containers: Vec::new(),
            external_processes: Vec::new(),
            fragments: Vec::new(),
            allow_properties_access: true,
            allow_dump_stacks: true,
            allow_runtime_logging: true,
            allow_environment_variable_dropping: true,
            allow_unencrypted_scratch: true,
        }
    }

    pub fn allow_all(&self) -> bool {
        self.allow_all
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn external_processes(&self) -> &[ExternalProcessConfig] {
        &self.external_processes
    }

    pub fn fragments(&self) -> &[FragmentConfig] {
        &self.fragments
    }

    pub fn allow_properties_access(&self) -> bool {
        self.allow_properties_access
    }

    pub fn allow_dump_stacks(&self) -> bool {
        self.allow_dump_stacks
    }

    pub fn allow_runtime_logging(&self) -> bool {
        self.allow_runtime_logging
    }

    pub fn allow_environment_variable_dropping(&self) -> bool {
        self.allow_environment_variable_dropping
    }

    pub fn allow_unencrypted_scratch(&self) -> bool {
        self.allow_unencrypted_scratch
    }
}
