// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Typed input/output interfaces

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{Literal, LiteralType};

/// A declared input parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub param_type: LiteralType,

    /// Whether a caller must supply the value
    #[serde(default = "default_true")]
    pub required: bool,

    /// Value used when the caller supplies none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
}

fn default_true() -> bool {
    true
}

impl Parameter {
    /// A required parameter with no default
    pub fn required(param_type: LiteralType) -> Self {
        Self {
            param_type,
            required: true,
            default: None,
        }
    }

    /// An optional parameter carrying a default value
    pub fn with_default(param_type: LiteralType, default: Literal) -> Self {
        Self {
            param_type,
            required: false,
            default: Some(default),
        }
    }

    /// A parameter must be bound when it is required and has no default
    pub fn must_be_bound(&self) -> bool {
        self.required && self.default.is_none()
    }
}

/// Input and output contract of a task, workflow or launch plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedInterface {
    #[serde(default)]
    pub inputs: BTreeMap<String, Parameter>,

    #[serde(default)]
    pub outputs: BTreeMap<String, LiteralType>,
}

impl TypedInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: &str, parameter: Parameter) -> Self {
        self.inputs.insert(name.to_string(), parameter);
        self
    }

    pub fn with_output(mut self, name: &str, output_type: LiteralType) -> Self {
        self.outputs.insert(name.to_string(), output_type);
        self
    }

    /// Names of inputs that must be bound by a caller
    pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter(|(_, p)| p.must_be_bound())
            .map(|(name, _)| name.as_str())
    }
}
