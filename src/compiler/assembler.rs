// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Closure assembly
//!
//! Orders entities so that every dependency is registered before its
//! dependents, and packs the compiled entities into a [`CompiledClosure`].

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::graph::find_cycles;
use super::index::ReferenceIndex;
use super::interface::InterfaceTable;
use crate::errors::FlowpackError;
use crate::model::{CompiledClosure, CompiledEntity, CompiledWorkflow, Entity, EntityId};

/// Assembles the compiled closure
pub struct ClosureAssembler;

impl ClosureAssembler {
    /// Registration order of every indexed entity, dependencies first.
    ///
    /// Each cross-entity cycle is reported with its full path.
    pub fn registration_order(index: &ReferenceIndex) -> Result<Vec<EntityId>, Vec<FlowpackError>> {
        let mut graph: DiGraph<EntityId, ()> = DiGraph::new();
        let mut nodes: HashMap<&EntityId, NodeIndex> = HashMap::new();

        for (id, _) in index.iter() {
            nodes.insert(id, graph.add_node(id.clone()));
        }

        for (id, entity) in index.iter() {
            for reference in entity.references() {
                // Dangling references are reported by the index
                if let Some(dep) = nodes.get(reference) {
                    graph.update_edge(*dep, nodes[id], ());
                }
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(|n| graph[n].clone()).collect())
            .map_err(|_| {
                find_cycles(&graph)
                    .into_iter()
                    .map(|cycle| FlowpackError::CircularDependency { cycle })
                    .collect()
            })
    }

    /// Build the closure from a fully validated bundle. Entities that did
    /// not compile are left out.
    pub fn assemble(
        index: &ReferenceIndex,
        interfaces: &InterfaceTable,
        mut workflows: BTreeMap<EntityId, CompiledWorkflow>,
        order: Vec<EntityId>,
    ) -> CompiledClosure {
        let mut entities = BTreeMap::new();

        for (id, entity) in index.iter() {
            let compiled = match entity {
                Entity::Task(spec) => CompiledEntity::Task { spec: spec.clone() },
                Entity::Workflow(_) => match workflows.remove(id) {
                    Some(workflow) => CompiledEntity::Workflow(workflow),
                    None => continue,
                },
                Entity::LaunchPlan(spec) => match interfaces.get(id) {
                    Some(interface) => CompiledEntity::LaunchPlan {
                        spec: spec.clone(),
                        interface: interface.clone(),
                    },
                    None => continue,
                },
            };
            entities.insert(id.clone(), compiled);
        }

        let order = order
            .into_iter()
            .filter(|id| entities.contains_key(id))
            .collect();

        CompiledClosure { entities, order }
    }
}
