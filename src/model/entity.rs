// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Entity definitions
//!
//! Defines the records carried in a bundle: tasks, workflows (with their
//! node graphs) and launch plans.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::identifier::{EntityId, ResourceType};
use super::interface::TypedInterface;
use super::types::Literal;

/// One decoded bundle record, discriminated by its embedded `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Task(TaskSpec),
    Workflow(WorkflowSpec),
    LaunchPlan(LaunchPlanSpec),
}

impl Entity {
    /// Identifier of the entity
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Task(t) => &t.id,
            Self::Workflow(w) => &w.id,
            Self::LaunchPlan(lp) => &lp.id,
        }
    }

    /// Resource type implied by the record kind
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Task(_) => ResourceType::Task,
            Self::Workflow(_) => ResourceType::Workflow,
            Self::LaunchPlan(_) => ResourceType::LaunchPlan,
        }
    }

    /// Every entity this record refers to, in identifier order
    pub fn references(&self) -> BTreeSet<&EntityId> {
        match self {
            Self::Task(_) => BTreeSet::new(),
            Self::Workflow(w) => w.references(),
            Self::LaunchPlan(lp) => std::iter::once(&lp.workflow).collect(),
        }
    }
}

/// A task: a typed unit of execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: EntityId,

    /// Task plugin type (python-task, container, ...)
    #[serde(default)]
    pub task_type: String,

    pub interface: TypedInterface,

    /// Execution metadata, opaque to compilation
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

/// A workflow: a typed graph of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub id: EntityId,

    pub interface: TypedInterface,

    #[serde(default)]
    pub nodes: Vec<Node>,

    /// Workflow outputs, bound to node outputs or pass-through inputs
    #[serde(default)]
    pub outputs: Vec<Binding>,
}

impl WorkflowSpec {
    /// Every entity referenced by any node, including nested branch arms
    pub fn references(&self) -> BTreeSet<&EntityId> {
        let mut refs = BTreeSet::new();
        for node in &self.nodes {
            node.collect_references(&mut refs);
        }
        refs
    }

    /// All nodes, with branch arms flattened after their parent
    pub fn all_nodes(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_nodes(&mut out);
        }
        out
    }
}

/// A single step inside a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within the workflow
    pub id: String,

    pub kind: NodeKind,

    /// Input bindings
    #[serde(default)]
    pub inputs: Vec<Binding>,

    /// Ordering-only dependencies on other nodes
    #[serde(default)]
    pub upstream: Vec<String>,
}

impl Node {
    fn collect_references<'a>(&'a self, refs: &mut BTreeSet<&'a EntityId>) {
        match &self.kind {
            NodeKind::Task { reference }
            | NodeKind::Workflow { reference }
            | NodeKind::LaunchPlan { reference } => {
                refs.insert(reference);
            }
            NodeKind::Branch {
                if_true, if_false, ..
            } => {
                if_true.collect_references(refs);
                if_false.collect_references(refs);
            }
            NodeKind::Start | NodeKind::End => {}
        }
    }

    fn collect_nodes<'a>(&'a self, out: &mut Vec<&'a Node>) {
        out.push(self);
        if let NodeKind::Branch {
            if_true, if_false, ..
        } = &self.kind
        {
            if_true.collect_nodes(out);
            if_false.collect_nodes(out);
        }
    }

    /// Short label for the node's kind
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Task { .. } => "task",
            NodeKind::Workflow { .. } => "workflow",
            NodeKind::LaunchPlan { .. } => "launch_plan",
            NodeKind::Branch { .. } => "branch",
            NodeKind::Start => "start",
            NodeKind::End => "end",
        }
    }
}

/// What a node executes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Task {
        reference: EntityId,
    },
    Workflow {
        reference: EntityId,
    },
    LaunchPlan {
        reference: EntityId,
    },
    Branch {
        condition: Condition,
        if_true: Box<Node>,
        if_false: Box<Node>,
    },
    Start,
    End,
}

/// Binds one input parameter to a value source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Name of the parameter being bound
    pub var: String,
    pub source: BindingSource,
}

impl Binding {
    pub fn from_input(var: &str, name: &str) -> Self {
        Self {
            var: var.to_string(),
            source: BindingSource::WorkflowInput {
                name: name.to_string(),
            },
        }
    }

    pub fn from_node(var: &str, node_id: &str, output: &str) -> Self {
        Self {
            var: var.to_string(),
            source: BindingSource::NodeOutput {
                node_id: node_id.to_string(),
                var: output.to_string(),
            },
        }
    }

    pub fn from_literal(var: &str, value: Literal) -> Self {
        Self {
            var: var.to_string(),
            source: BindingSource::Literal(value),
        }
    }
}

/// Where a bound value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    WorkflowInput { name: String },
    NodeOutput { node_id: String, var: String },
    Literal(Literal),
}

/// Branch condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Comparison {
        left: Operand,
        op: ComparisonOp,
        right: Operand,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Operand of a comparison: one of the branch node's inputs or a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Var(String),
    Literal(Literal),
}

/// A launch plan: a reusable invocation of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchPlanSpec {
    pub id: EntityId,

    /// Workflow being launched
    pub workflow: EntityId,

    /// Inputs pinned by the plan; callers cannot override them
    #[serde(default)]
    pub fixed_inputs: BTreeMap<String, Literal>,

    /// Inputs given a new default; callers may still override them
    #[serde(default)]
    pub default_inputs: BTreeMap<String, Literal>,
}
