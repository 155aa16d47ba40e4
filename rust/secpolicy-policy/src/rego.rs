// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rego text generation.
//!
//! The output of this module is parsed as code by the policy evaluation
//! engine, so string interpolation is a security boundary: every value in
//! quoted position goes through [`escape_rego_string`], and identifiers
//! (package namespaces) are validated rather than escaped. An unescaped
//! quote here would be a policy-injection vector, not a formatting bug.

use std::fmt::Write as _;

use crate::model::{Container, EnvRuleConfig, ExecProcessConfig, ExternalProcessConfig, Mount};
use crate::{FragmentConfig, PolicyError};

pub(crate) const POLICY_REGO_TEMPLATE: &str = include_str!("policy.rego");
pub(crate) const OPEN_DOOR_REGO_TEMPLATE: &str = include_str!("open_door.rego");
pub(crate) const OBJECTS_PLACEHOLDER: &str = "##OBJECTS##";

const INDENT: &str = "    ";

/// Escape a string for a double-quoted Rego string literal.
///
/// Backslash and double quote are escaped, control characters are emitted
/// as `\n`/`\r`/`\t` or `\u00xx`. Everything else passes through. Rego
/// shares JSON's string-literal escape grammar, so a correct escape also
/// parses back as JSON; the tests lean on that property.
pub fn escape_rego_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Render a string in quoted position.
fn quoted(value: &str) -> String {
    format!("\"{}\"", escape_rego_string(value))
}

/// Validate a Rego package namespace.
///
/// Namespaces land in identifier position where escaping cannot help, so
/// anything outside `[A-Za-z_][A-Za-z0-9_.]*` is rejected outright.
pub(crate) fn validate_namespace(namespace: &str) -> Result<(), PolicyError> {
    let mut chars = namespace.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(PolicyError::InvalidNamespace(namespace.to_string()))
    }
}

fn string_array(values: &[String]) -> String {
    let rendered: Vec<String> = values.iter().map(|v| quoted(v)).collect();
    format!("[{}]", rendered.join(","))
}

fn signal_array(signals: &[i32]) -> String {
    let rendered: Vec<String> = signals.iter().map(i32::to_string).collect();
    format!("[{}]", rendered.join(","))
}

fn env_rule_object(rule: &EnvRuleConfig) -> String {
    format!(
        r#"{{"pattern": {}, "strategy": "{}", "required": {}}}"#,
        quoted(&rule.rule),
        rule.strategy.as_str(),
        rule.required
    )
}

fn env_rule_array(rules: &[EnvRuleConfig]) -> String {
    let rendered: Vec<String> = rules.iter().map(env_rule_object).collect();
    format!("[{}]", rendered.join(","))
}

fn mount_object(mount: &Mount) -> String {
    format!(
        r#"{{"destination": {}, "options": {}, "source": {}, "type": {}}}"#,
        quoted(&mount.destination),
        string_array(&mount.options),
        quoted(&mount.source),
        quoted(&mount.mount_type)
    )
}

fn exec_process_object(process: &ExecProcessConfig) -> String {
    format!(
        r#"{{"command": {}, "signals": {}}}"#,
        string_array(&process.command),
        signal_array(&process.signals)
    )
}

fn external_process_object(process: &ExternalProcessConfig) -> String {
    format!(
        r#"{{"command": {}, "env_rules": {}, "working_dir": {}, "allow_stdio_access": {}}}"#,
        string_array(&process.command),
        env_rule_array(&process.env_rules),
        quoted(&process.working_dir),
        process.allow_stdio_access
    )
}

fn fragment_object(fragment: &FragmentConfig) -> String {
    format!(
        r#"{{"issuer": {}, "feed": {}, "minimum_svn": {}, "includes": {}}}"#,
        quoted(&fragment.issuer),
        quoted(&fragment.feed),
        quoted(&fragment.minimum_svn),
        string_array(&fragment.includes)
    )
}

fn write_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn write_container(out: &mut String, container: &Container, indent: &str) {
    let inner = format!("{indent}{INDENT}");
    write_line(out, &format!("{indent}{{"));
    write_line(
        out,
        &format!("{inner}\"command\": {},", string_array(container.command())),
    );
    write_line(
        out,
        &format!(
            "{inner}\"env_rules\": {},",
            env_rule_array(container.env_rules())
        ),
    );
    write_line(
        out,
        &format!("{inner}\"layers\": {},", string_array(container.layers())),
    );
    let mounts: Vec<String> = container.mounts().iter().map(mount_object).collect();
    write_line(out, &format!("{inner}\"mounts\": [{}],", mounts.join(",")));
    let execs: Vec<String> = container
        .exec_processes()
        .iter()
        .map(exec_process_object)
        .collect();
    write_line(
        out,
        &format!("{inner}\"exec_processes\": [{}],", execs.join(",")),
    );
    write_line(
        out,
        &format!("{inner}\"signals\": {},", signal_array(container.signals())),
    );
    write_line(
        out,
        &format!("{inner}\"allow_elevated\": {},", container.allow_elevated()),
    );
    write_line(
        out,
        &format!("{inner}\"working_dir\": {},", quoted(container.working_dir())),
    );
    write_line(
        out,
        &format!(
            "{inner}\"allow_stdio_access\": {}",
            container.allow_stdio_access()
        ),
    );
    write_line(out, &format!("{indent}}},"));
}

fn add_containers(out: &mut String, containers: &[Container]) {
    if containers.is_empty() {
        return;
    }

    write_line(out, "containers := [");
    for container in containers {
        write_container(out, container, INDENT);
    }
    write_line(out, "]");
}

fn add_external_processes(out: &mut String, processes: &[ExternalProcessConfig]) {
    if processes.is_empty() {
        return;
    }

    write_line(out, "external_processes := [");
    for process in processes {
        write_line(out, &format!("{INDENT}{},", external_process_object(process)));
    }
    write_line(out, "]");
}

fn add_fragments(out: &mut String, fragments: &[FragmentConfig]) {
    if fragments.is_empty() {
        return;
    }

    write_line(out, "fragments := [");
    for fragment in fragments {
        write_line(out, &format!("{INDENT}{},", fragment_object(fragment)));
    }
    write_line(out, "]");
}

/// Render the object definitions shared by policies and fragments.
///
/// Fragment inclusion order, container order and external-process order
/// are all preserved: they are matching precedence downstream.
pub(crate) fn policy_objects(
    containers: &[Container],
    external_processes: &[ExternalProcessConfig],
    fragments: &[FragmentConfig],
) -> String {
    let mut out = String::new();
    add_fragments(&mut out, fragments);
    add_containers(&mut out, containers);
    add_external_processes(&mut out, external_processes);
    out
}

/// Render a complete Rego policy document.
#[allow(clippy::too_many_arguments)]
pub(crate) fn marshal_rego_policy(
    containers: &[Container],
    external_processes: &[ExternalProcessConfig],
    fragments: &[FragmentConfig],
    allow_properties_access: bool,
    allow_dump_stacks: bool,
    allow_runtime_logging: bool,
    allow_environment_variable_dropping: bool,
    allow_unencrypted_scratch: bool,
) -> String {
    let mut objects = policy_objects(containers, external_processes, fragments);
    write_line(
        &mut objects,
        &format!("allow_properties_access := {allow_properties_access}"),
    );
    write_line(&mut objects, &format!("allow_dump_stacks := {allow_dump_stacks}"));
    write_line(
        &mut objects,
        &format!("allow_runtime_logging := {allow_runtime_logging}"),
    );
    write_line(
        &mut objects,
        &format!("allow_environment_variable_dropping := {allow_environment_variable_dropping}"),
    );
    write_line(
        &mut objects,
        &format!("allow_unencrypted_scratch := {allow_unencrypted_scratch}"),
    );

    POLICY_REGO_TEMPLATE.replacen(OBJECTS_PLACEHOLDER, &objects, 1)
}

/// Render a distributable Rego fragment document.
pub(crate) fn marshal_rego_fragment(
    namespace: &str,
    svn: &str,
    containers: &[Container],
    external_processes: &[ExternalProcessConfig],
    fragments: &[FragmentConfig],
) -> Result<String, PolicyError> {
    validate_namespace(namespace)?;

    let objects = policy_objects(containers, external_processes, fragments);
    Ok(format!(
        "package {namespace}\n\nsvn := {}\n\n{objects}",
        quoted(svn)
    ))
}
