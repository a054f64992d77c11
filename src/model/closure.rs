// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Compiled closure
//!
//! The output of a successful compilation: every entity of the bundle with
//! its resolved interface, workflows annotated with their validated graph,
//! and a registration order in which dependencies precede dependents.

use std::collections::BTreeMap;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use super::entity::{LaunchPlanSpec, TaskSpec, WorkflowSpec};
use super::identifier::EntityId;
use super::interface::TypedInterface;

/// Id of the implicit start node: its outputs are the workflow inputs
pub const START_NODE_ID: &str = "start-node";

/// Id of the implicit end node: its inputs are the workflow outputs
pub const END_NODE_ID: &str = "end-node";

/// A data or ordering edge of a compiled workflow graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// Output of `from` feeding input `to_var` of `to`; absent for
    /// ordering-only edges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_var: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_var: Option<String>,
}

/// A workflow after graph validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledWorkflow {
    pub spec: WorkflowSpec,
    /// Top-level node ids in a valid execution order
    pub node_order: Vec<String>,
    /// Edges between top-level nodes, start and end
    pub edges: Vec<GraphEdge>,
}

/// One resolved entity of the closure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompiledEntity {
    Task {
        spec: TaskSpec,
    },
    Workflow(CompiledWorkflow),
    LaunchPlan {
        spec: LaunchPlanSpec,
        /// Interface exposed to callers after fixed inputs are removed
        interface: TypedInterface,
    },
}

impl CompiledEntity {
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Task { spec } => &spec.id,
            Self::Workflow(wf) => &wf.spec.id,
            Self::LaunchPlan { spec, .. } => &spec.id,
        }
    }

    pub fn interface(&self) -> &TypedInterface {
        match self {
            Self::Task { spec } => &spec.interface,
            Self::Workflow(wf) => &wf.spec.interface,
            Self::LaunchPlan { interface, .. } => interface,
        }
    }
}

/// Fully resolved set of compiled entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledClosure {
    #[serde(with = "entity_list")]
    pub entities: BTreeMap<EntityId, CompiledEntity>,
    /// Registration order, dependencies first
    pub order: Vec<EntityId>,
}

impl CompiledClosure {
    pub fn get(&self, id: &EntityId) -> Option<&CompiledEntity> {
        self.entities.get(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Compiled workflows in identifier order
    pub fn workflows(&self) -> impl Iterator<Item = &CompiledWorkflow> {
        self.entities.values().filter_map(|e| match e {
            CompiledEntity::Workflow(wf) => Some(wf),
            _ => None,
        })
    }

    /// Count of (tasks, workflows, launch plans)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.entities
            .values()
            .fold((0, 0, 0), |(t, w, l), e| match e {
                CompiledEntity::Task { .. } => (t + 1, w, l),
                CompiledEntity::Workflow(_) => (t, w + 1, l),
                CompiledEntity::LaunchPlan { .. } => (t, w, l + 1),
            })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, crate::FlowpackError> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// BLAKE3 digest over the canonical JSON encoding
    pub fn digest(&self) -> Result<String, crate::FlowpackError> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Hasher::new();
        hasher.update(&bytes);
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Entities are keyed by a structured id, so they travel as a list
mod entity_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::CompiledEntity;
    use crate::model::EntityId;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<EntityId, CompiledEntity>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&CompiledEntity> = map.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<EntityId, CompiledEntity>, D::Error> {
        let list = Vec::<CompiledEntity>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|e| (e.id().clone(), e)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;

    fn task(name: &str) -> CompiledEntity {
        CompiledEntity::Task {
            spec: TaskSpec {
                id: EntityId::new(ResourceType::Task, "p", "d", name, "1"),
                task_type: "python-task".into(),
                interface: TypedInterface::new(),
                metadata: serde_json::Value::Null,
            },
        }
    }

    #[test]
    fn test_json_round_trip_keeps_keys() {
        let mut closure = CompiledClosure::default();
        for name in ["b", "a"] {
            let entity = task(name);
            closure.order.push(entity.id().clone());
            closure.entities.insert(entity.id().clone(), entity);
        }

        let json = closure.to_json().unwrap();
        let parsed: CompiledClosure = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, closure);
        assert_eq!(parsed.counts(), (2, 0, 0));
    }

    #[test]
    fn test_digest_is_stable() {
        let mut closure = CompiledClosure::default();
        let entity = task("a");
        closure.order.push(entity.id().clone());
        closure.entities.insert(entity.id().clone(), entity);

        assert_eq!(closure.digest().unwrap(), closure.clone().digest().unwrap());
        assert_ne!(closure.digest().unwrap(), CompiledClosure::default().digest().unwrap());
    }
}
