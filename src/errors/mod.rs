// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Error types with actionable diagnostics
//!
//! Every defect found while compiling a bundle is a [`FlowpackError`]
//! carrying enough context (entity, node, parameter) to locate it. Defects
//! are collected per stage and surfaced together as a single
//! [`FlowpackError::Compilation`].

mod recovery;

pub use recovery::RecoverySuggestion;

use std::cmp::Ordering;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::model::EntityId;

/// Result type for flowpack operations
pub type FlowpackResult<T> = Result<T, FlowpackError>;

/// Main error type for flowpack
#[derive(Error, Debug, Diagnostic)]
pub enum FlowpackError {
    // ─────────────────────────────────────────────────────────────────────────
    // Container Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Bundle archive is unreadable: {reason}")]
    #[diagnostic(
        code(flowpack::archive),
        help("The bundle must be a gzip-compressed tar archive of serialized entities")
    )]
    Archive { reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Entity Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Entry '{entry}' could not be decoded: {reason}")]
    #[diagnostic(code(flowpack::decode))]
    Decode { entry: String, reason: String },

    #[error("Entity {entity} is declared twice (in '{first}' and '{second}')")]
    #[diagnostic(
        code(flowpack::duplicate_entity),
        help("Each identifier must be declared exactly once per bundle; bump the version of one of them")
    )]
    DuplicateEntity {
        entity: EntityId,
        first: String,
        second: String,
    },

    #[error("{referrer} references {missing}, which is not in the bundle")]
    #[diagnostic(
        code(flowpack::unresolved_reference),
        help("Package '{missing}' into the bundle or fix the reference")
    )]
    UnresolvedReference {
        referrer: EntityId,
        missing: EntityId,
    },

    #[error("{entity}: input '{parameter}' {reason}")]
    #[diagnostic(code(flowpack::interface))]
    Interface {
        entity: EntityId,
        parameter: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Graph Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{workflow}: node id '{node}' is used more than once")]
    #[diagnostic(code(flowpack::duplicate_node_id))]
    DuplicateNodeId { workflow: EntityId, node: String },

    #[error("{workflow}: node '{node}' depends on unknown node '{reference}'")]
    #[diagnostic(
        code(flowpack::unknown_node),
        help("Check that '{reference}' is a top-level node of this workflow")
    )]
    UnknownNode {
        workflow: EntityId,
        node: String,
        reference: String,
    },

    #[error("{workflow}: node '{node}' depends on itself")]
    #[diagnostic(code(flowpack::self_reference))]
    SelfReference { workflow: EntityId, node: String },

    #[error("{workflow}: node graph contains a cycle: {}", .nodes.join(" → "))]
    #[diagnostic(
        code(flowpack::graph_cycle),
        help("Workflow nodes must form a directed acyclic graph")
    )]
    GraphCycle {
        workflow: EntityId,
        nodes: Vec<String>,
    },

    #[error("{workflow}: node '{node}' has no input named '{parameter}'")]
    #[diagnostic(code(flowpack::unknown_input))]
    UnknownInput {
        workflow: EntityId,
        node: String,
        parameter: String,
    },

    #[error("{workflow}: node '{node}' binds '{parameter}', which {launch_plan} already fixes")]
    #[diagnostic(
        code(flowpack::fixed_input_rebound),
        help("Fixed launch plan inputs cannot be overridden; remove the binding or launch the workflow directly")
    )]
    FixedInputRebound {
        workflow: EntityId,
        node: String,
        launch_plan: EntityId,
        parameter: String,
    },

    #[error("{workflow}: node '{node}' binds '{parameter}' more than once")]
    #[diagnostic(code(flowpack::duplicate_binding))]
    DuplicateBinding {
        workflow: EntityId,
        node: String,
        parameter: String,
    },

    #[error("{workflow}: node '{node}' does not bind required input '{parameter}'")]
    #[diagnostic(code(flowpack::missing_input))]
    MissingInput {
        workflow: EntityId,
        node: String,
        parameter: String,
    },

    #[error("{workflow}: node '{node}' reads '{output}' from '{source_node}', which produces no such value")]
    #[diagnostic(code(flowpack::unknown_output))]
    UnknownOutput {
        workflow: EntityId,
        node: String,
        source_node: String,
        output: String,
    },

    #[error("{workflow}: node '{node}' input '{parameter}' expects {expected} but is bound to {actual}")]
    #[diagnostic(code(flowpack::type_mismatch))]
    TypeMismatch {
        workflow: EntityId,
        node: String,
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("{workflow}: branch '{node}' arms expose different outputs: {reason}")]
    #[diagnostic(
        code(flowpack::branch_output_mismatch),
        help("Both arms of a branch must produce the same named outputs with compatible types")
    )]
    BranchOutputMismatch {
        workflow: EntityId,
        node: String,
        reason: String,
    },

    #[error("{workflow}: branch '{node}' has an invalid condition: {reason}")]
    #[diagnostic(code(flowpack::invalid_branch_condition))]
    InvalidBranchCondition {
        workflow: EntityId,
        node: String,
        reason: String,
    },

    #[error("{workflow}: node '{node}' {reason}")]
    #[diagnostic(code(flowpack::invalid_start_end))]
    InvalidStartEnd {
        workflow: EntityId,
        node: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Closure Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Circular dependency between entities: {}", join_ids(.cycle))]
    #[diagnostic(
        code(flowpack::circular_dependency),
        help("A workflow cannot embed itself, directly or through launch plans")
    )]
    CircularDependency { cycle: Vec<EntityId> },

    #[error("Compilation failed with {count} error(s)")]
    #[diagnostic(code(flowpack::compilation))]
    Compilation {
        count: usize,
        #[related]
        errors: Vec<FlowpackError>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration/IO Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(flowpack::invalid_config))]
    InvalidConfig { reason: String },

    #[error("Invalid argument: {message}")]
    #[diagnostic(code(flowpack::invalid_argument))]
    InvalidArgument { message: String },

    #[error("File not found: {path}")]
    #[diagnostic(code(flowpack::file_not_found))]
    FileNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(flowpack::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(flowpack::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(flowpack::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(flowpack::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(flowpack::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(flowpack::toml_error))]
    Toml { message: String },
}

fn join_ids(ids: &[EntityId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}

impl From<std::io::Error> for FlowpackError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for FlowpackError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for FlowpackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for FlowpackError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for FlowpackError {
    fn from(e: glob::PatternError) -> Self {
        Self::InvalidConfig {
            reason: format!("invalid ignore pattern: {}", e),
        }
    }
}

impl FlowpackError {
    /// Create an archive error
    pub fn archive(reason: impl Into<String>) -> Self {
        Self::Archive {
            reason: reason.into(),
        }
    }

    /// Create a decode error for an archive entry
    pub fn decode(entry: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an interface error for a parameter of an entity
    pub fn interface(entity: &EntityId, parameter: &str, reason: impl Into<String>) -> Self {
        Self::Interface {
            entity: entity.clone(),
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// Aggregate collected errors into one, in deterministic order.
    ///
    /// Nested aggregates are flattened.
    pub fn compilation(errors: Vec<FlowpackError>) -> Self {
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                Self::Compilation { errors, .. } => flat.extend(errors),
                other => flat.push(other),
            }
        }
        sort_errors(&mut flat);

        Self::Compilation {
            count: flat.len(),
            errors: flat,
        }
    }

    /// The entity an error is scoped to, if any
    pub fn entity(&self) -> Option<&EntityId> {
        match self {
            Self::DuplicateEntity { entity, .. } | Self::Interface { entity, .. } => Some(entity),
            Self::UnresolvedReference { referrer, .. } => Some(referrer),
            Self::DuplicateNodeId { workflow, .. }
            | Self::UnknownNode { workflow, .. }
            | Self::SelfReference { workflow, .. }
            | Self::GraphCycle { workflow, .. }
            | Self::UnknownInput { workflow, .. }
            | Self::FixedInputRebound { workflow, .. }
            | Self::DuplicateBinding { workflow, .. }
            | Self::MissingInput { workflow, .. }
            | Self::UnknownOutput { workflow, .. }
            | Self::TypeMismatch { workflow, .. }
            | Self::BranchOutputMismatch { workflow, .. }
            | Self::InvalidBranchCondition { workflow, .. }
            | Self::InvalidStartEnd { workflow, .. } => Some(workflow),
            Self::CircularDependency { cycle } => cycle.first(),
            _ => None,
        }
    }

    /// The archive entry an error is scoped to, if any
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::Decode { entry, .. } => Some(entry),
            Self::DuplicateEntity { second, .. } => Some(second),
            _ => None,
        }
    }

    /// The individual defects carried by this error
    pub fn errors(&self) -> &[FlowpackError] {
        match self {
            Self::Compilation { errors, .. } => errors,
            other => std::slice::from_ref(other),
        }
    }
}

/// Order errors: entry-scoped decode errors first (by entry name), then
/// entity-scoped errors by identifier. The sort is stable, so errors of one
/// entity keep their discovery order.
pub fn sort_errors(errors: &mut [FlowpackError]) {
    errors.sort_by(|a, b| match (a.entity(), b.entity()) {
        (None, None) => a.entry().cmp(&b.entry()),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y),
    });
}
