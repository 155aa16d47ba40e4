// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Security-policy document model and serializers.
//!
//! A policy is authored once, validated at construction time, and rendered
//! exactly once into one of two encodings: a structured JSON document for
//! the standard decision engine, or a Rego document for the policy
//! evaluation engine. The rendered text *is* code to the downstream
//! engine, so every interpolated value goes through dedicated escaping.

mod error;
mod marshal;
mod model;
mod rego;

pub use error::PolicyError;
pub use marshal::{marshal_fragment, PolicyFormat};
pub use rego::escape_rego_string;
pub use model::{
    Container, EnvRuleConfig, EnvRuleStrategy, ExecProcessConfig, ExternalProcessConfig,
    FragmentConfig, MountConfig, SecurityPolicy,
};
