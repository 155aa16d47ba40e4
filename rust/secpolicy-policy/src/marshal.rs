// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Policy serialization.
//!
//! Two encodings, selected by an explicit [`PolicyFormat`] rather than a
//! runtime registry: the structured JSON document consumed by the standard
//! decision engine, and the Rego document consumed by the policy
//! evaluation engine. Both are deterministic pure functions of the model.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::model::{Container, EnvRuleConfig, ExternalProcessConfig, FragmentConfig, Mount};
use crate::rego;
use crate::{PolicyError, SecurityPolicy};

/// The output encoding for a rendered policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyFormat {
    /// Structured JSON for the standard decision engine.
    #[default]
    Json,
    /// Rego for the policy evaluation engine.
    Rego,
}

impl PolicyFormat {
    /// Resolve an encoding name from the configuration surface.
    ///
    /// The empty string selects the default (`json`); unknown names are a
    /// typed error, never a silent fallback.
    pub fn from_name(name: &str) -> Result<Self, PolicyError> {
        match name {
            "" | "json" => Ok(PolicyFormat::Json),
            "rego" => Ok(PolicyFormat::Rego),
            other => Err(PolicyError::UnknownEncoding(other.to_string())),
        }
    }
}

impl SecurityPolicy {
    /// Render this policy in the chosen encoding.
    pub fn marshal(&self, format: PolicyFormat) -> Result<String, PolicyError> {
        // allow_all with a non-empty container list must fail for every
        // encoding.
        if self.allow_all() && !self.containers().is_empty() {
            return Err(PolicyError::InvalidOpenDoorPolicy);
        }

        match format {
            PolicyFormat::Json => Ok(serde_json::to_string(&JsonPolicy(self))?),
            PolicyFormat::Rego => {
                if self.allow_all() {
                    Ok(rego::OPEN_DOOR_REGO_TEMPLATE.to_string())
                } else {
                    Ok(rego::marshal_rego_policy(
                        self.containers(),
                        self.external_processes(),
                        self.fragments(),
                        self.allow_properties_access(),
                        self.allow_dump_stacks(),
                        self.allow_runtime_logging(),
                        self.allow_environment_variable_dropping(),
                        self.allow_unencrypted_scratch(),
                    ))
                }
            }
        }
    }

    /// Render and base64-encode this policy for annotation transport.
    pub fn encode_to_string(&self, format: PolicyFormat) -> Result<String, PolicyError> {
        Ok(STANDARD.encode(self.marshal(format)?))
    }
}

/// Render a distributable fragment document (always Rego).
///
/// `namespace` becomes the fragment's Rego package; `svn` is the version
/// the fragment declares for itself, gated by consumers at load time.
pub fn marshal_fragment(
    namespace: &str,
    svn: &str,
    containers: &[Container],
    external_processes: &[ExternalProcessConfig],
    fragments: &[FragmentConfig],
) -> Result<String, PolicyError> {
    rego::marshal_rego_fragment(namespace, svn, containers, external_processes, fragments)
}

// JSON rendering.
//
// Every ordered collection is wrapped in a map carrying an explicit
// `length` alongside index-keyed `elements`, so any downstream integrity
// check over the encoded bytes sees a self-consistent count.

struct JsonPolicy<'a>(&'a SecurityPolicy);

impl Serialize for JsonPolicy<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("allow_all", &self.0.allow_all())?;
        map.serialize_entry("containers", &LengthAnnotated(self.0.containers()))?;
        map.end()
    }
}

/// A list rendered as `{"length": N, "elements": {"0": ..., ...}}`.
struct LengthAnnotated<'a, T>(&'a [T]);

impl<T> Serialize for LengthAnnotated<'_, T>
where
    for<'x> JsonElement<'x, T>: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("length", &self.0.len())?;
        map.serialize_entry("elements", &IndexKeyed(self.0))?;
        map.end()
    }
}

struct IndexKeyed<'a, T>(&'a [T]);

impl<T> Serialize for IndexKeyed<'_, T>
where
    for<'x> JsonElement<'x, T>: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (index, element) in self.0.iter().enumerate() {
            map.serialize_entry(&index.to_string(), &JsonElement(element))?;
        }
        map.end()
    }
}

/// Newtype selecting the JSON shape of each element type.
struct JsonElement<'a, T>(&'a T);

impl Serialize for JsonElement<'_, String> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl Serialize for JsonElement<'_, Container> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let c = self.0;
        let mut map = serializer.serialize_map(Some(7))?;
        map.serialize_entry("command", &LengthAnnotated(c.command()))?;
        map.serialize_entry("env_rules", &LengthAnnotated(c.env_rules()))?;
        map.serialize_entry("layers", &LengthAnnotated(c.layers()))?;
        map.serialize_entry("mounts", &LengthAnnotated(c.mounts()))?;
        map.serialize_entry("working_dir", c.working_dir())?;
        map.serialize_entry("allow_elevated", &c.allow_elevated())?;
        map.serialize_entry("allow_stdio_access", &c.allow_stdio_access())?;
        map.end()
    }
}

impl Serialize for JsonElement<'_, EnvRuleConfig> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rule = self.0;
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("strategy", rule.strategy.as_str())?;
        map.serialize_entry("rule", &rule.rule)?;
        map.serialize_entry("required", &rule.required)?;
        map.end()
    }
}

impl Serialize for JsonElement<'_, Mount> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mount = self.0;
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("destination", &mount.destination)?;
        map.serialize_entry("options", &LengthAnnotated(&mount.options))?;
        map.serialize_entry("source", &mount.source)?;
        map.serialize_entry("type", &mount.mount_type)?;
        map.end()
    }
}
