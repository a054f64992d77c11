// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Reference index
//!
//! The arena owning every decoded entity, keyed by identifier. Entities
//! refer to each other only through identifier lookups into this index.

use std::collections::BTreeMap;

use tracing::debug;

use super::decode::DecodedEntity;
use crate::errors::FlowpackError;
use crate::model::{Entity, EntityId, LaunchPlanSpec, TaskSpec, WorkflowSpec};

/// Identifier-keyed arena of decoded entities
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    entities: BTreeMap<EntityId, Entity>,
    sources: BTreeMap<EntityId, String>,
}

impl ReferenceIndex {
    /// Index decoded entities, reporting duplicate declarations and
    /// references to identifiers that are not in the bundle.
    ///
    /// Duplicates are resolved by entry name so the outcome does not depend
    /// on archive order; the first declaration is kept.
    pub fn build(mut decoded: Vec<DecodedEntity>) -> (Self, Vec<FlowpackError>) {
        decoded.sort_by(|a, b| a.entry.cmp(&b.entry));

        let mut index = Self::default();
        let mut errors = Vec::new();

        for DecodedEntity { entry, entity } in decoded {
            let id = entity.id().clone();
            if let Some(first) = index.sources.get(&id) {
                errors.push(FlowpackError::DuplicateEntity {
                    entity: id,
                    first: first.clone(),
                    second: entry,
                });
                continue;
            }
            index.sources.insert(id.clone(), entry);
            index.entities.insert(id, entity);
        }

        for (id, entity) in &index.entities {
            for reference in entity.references() {
                if !index.entities.contains_key(reference) {
                    errors.push(FlowpackError::UnresolvedReference {
                        referrer: id.clone(),
                        missing: reference.clone(),
                    });
                }
            }
        }

        debug!(entities = index.entities.len(), "Built reference index");
        (index, errors)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.entities.values().filter_map(|e| match e {
            Entity::Task(t) => Some(t),
            _ => None,
        })
    }

    pub fn workflows(&self) -> impl Iterator<Item = &WorkflowSpec> {
        self.entities.values().filter_map(|e| match e {
            Entity::Workflow(w) => Some(w),
            _ => None,
        })
    }

    pub fn launch_plans(&self) -> impl Iterator<Item = &LaunchPlanSpec> {
        self.entities.values().filter_map(|e| match e {
            Entity::LaunchPlan(lp) => Some(lp),
            _ => None,
        })
    }

    /// Look up a launch plan by identifier
    pub fn launch_plan(&self, id: &EntityId) -> Option<&LaunchPlanSpec> {
        match self.entities.get(id) {
            Some(Entity::LaunchPlan(lp)) => Some(lp),
            _ => None,
        }
    }
}
