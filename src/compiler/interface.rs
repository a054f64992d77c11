// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Interface resolution
//!
//! Computes the interface every entity exposes to its callers. Tasks and
//! workflows expose what they declare; a launch plan exposes its workflow's
//! interface minus the fixed inputs, with overridden defaults.

use std::collections::BTreeMap;

use tracing::debug;

use super::index::ReferenceIndex;
use crate::errors::FlowpackError;
use crate::model::{EntityId, LaunchPlanSpec, LiteralType, Parameter, TypedInterface};

/// Resolved interfaces of every entity that resolved cleanly
#[derive(Debug, Default)]
pub struct InterfaceTable {
    interfaces: BTreeMap<EntityId, TypedInterface>,
}

impl InterfaceTable {
    pub fn get(&self, id: &EntityId) -> Option<&TypedInterface> {
        self.interfaces.get(id)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

/// Resolver for entity interfaces
pub struct InterfaceResolver;

impl InterfaceResolver {
    /// Resolve every interface in the index. An entity whose interface is
    /// invalid is left out of the table and its defects are returned.
    pub fn resolve(index: &ReferenceIndex) -> (InterfaceTable, Vec<FlowpackError>) {
        let mut table = InterfaceTable::default();
        let mut errors = Vec::new();

        for task in index.tasks() {
            let mut defects = Self::check_declared(&task.id, &task.interface);
            defects.extend(Self::check_no_generics(&task.id, &task.interface));
            Self::record(&mut table, &mut errors, &task.id, &task.interface, defects);
        }

        for wf in index.workflows() {
            let defects = Self::check_declared(&wf.id, &wf.interface);
            Self::record(&mut table, &mut errors, &wf.id, &wf.interface, defects);
        }

        // Launch plans last: they read the resolved workflow interfaces
        for lp in index.launch_plans() {
            let Some(workflow) = table.get(&lp.workflow) else {
                // Missing or invalid workflow, already reported
                continue;
            };
            match Self::narrow(lp, workflow) {
                Ok(exposed) => {
                    table.interfaces.insert(lp.id.clone(), exposed);
                }
                Err(defects) => errors.extend(defects),
            }
        }

        debug!(resolved = table.len(), defects = errors.len(), "Resolved interfaces");
        (table, errors)
    }

    fn record(
        table: &mut InterfaceTable,
        errors: &mut Vec<FlowpackError>,
        id: &EntityId,
        interface: &TypedInterface,
        defects: Vec<FlowpackError>,
    ) {
        if defects.is_empty() {
            table.interfaces.insert(id.clone(), interface.clone());
        } else {
            errors.extend(defects);
        }
    }

    /// Declared defaults must conform to their parameter type
    fn check_declared(id: &EntityId, interface: &TypedInterface) -> Vec<FlowpackError> {
        interface
            .inputs
            .iter()
            .filter_map(|(name, param)| {
                let default = param.default.as_ref()?;
                (!default.conforms_to(&param.param_type)).then(|| {
                    FlowpackError::interface(
                        id,
                        name,
                        format!(
                            "has a {} default, which does not conform to {}",
                            default.shape(),
                            param.param_type
                        ),
                    )
                })
            })
            .collect()
    }

    /// Generic placeholders are only meaningful at a workflow boundary
    fn check_no_generics(id: &EntityId, interface: &TypedInterface) -> Vec<FlowpackError> {
        let inputs = interface.inputs.iter().map(|(n, p)| (n, &p.param_type));
        let outputs = interface.outputs.iter();

        inputs
            .chain(outputs)
            .filter(|(_, ty)| ty.contains_generic())
            .map(|(name, ty)| {
                FlowpackError::interface(
                    id,
                    name,
                    format!("declares {}, but tasks cannot use generic placeholders", ty),
                )
            })
            .collect()
    }

    /// Compute the interface a launch plan exposes over its workflow.
    ///
    /// The result never requires an input the workflow does not require.
    pub fn narrow(
        lp: &LaunchPlanSpec,
        workflow: &TypedInterface,
    ) -> Result<TypedInterface, Vec<FlowpackError>> {
        let mut errors = Vec::new();
        let mut exposed = workflow.clone();

        for (name, value) in &lp.fixed_inputs {
            match workflow.inputs.get(name) {
                None => errors.push(FlowpackError::interface(
                    &lp.id,
                    name,
                    format!("is fixed, but {} declares no such input", lp.workflow),
                )),
                Some(param) if !value.conforms_to(&param.param_type) => {
                    errors.push(Self::literal_mismatch(lp, name, "fixed", value.shape(), &param.param_type))
                }
                Some(_) => {
                    exposed.inputs.remove(name);
                }
            }
        }

        for (name, value) in &lp.default_inputs {
            if lp.fixed_inputs.contains_key(name) {
                errors.push(FlowpackError::interface(
                    &lp.id,
                    name,
                    "is both fixed and defaulted",
                ));
                continue;
            }
            match workflow.inputs.get(name) {
                None => errors.push(FlowpackError::interface(
                    &lp.id,
                    name,
                    format!("is defaulted, but {} declares no such input", lp.workflow),
                )),
                Some(param) if !value.conforms_to(&param.param_type) => errors.push(
                    Self::literal_mismatch(lp, name, "default", value.shape(), &param.param_type),
                ),
                Some(param) => {
                    exposed.inputs.insert(
                        name.clone(),
                        Parameter::with_default(param.param_type.clone(), value.clone()),
                    );
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        debug_assert!(exposed.required_inputs().count() <= workflow.required_inputs().count());
        Ok(exposed)
    }

    fn literal_mismatch(
        lp: &LaunchPlanSpec,
        name: &str,
        role: &str,
        shape: &str,
        expected: &LiteralType,
    ) -> FlowpackError {
        FlowpackError::interface(
            &lp.id,
            name,
            format!("has a {} {} value, but the workflow declares {}", role, shape, expected),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::decode::DecodedEntity;
    use crate::model::{Entity, Literal, ResourceType, SimpleKind, TaskSpec, WorkflowSpec};

    fn wf_id() -> EntityId {
        EntityId::new(ResourceType::Workflow, "p", "d", "wf", "1")
    }

    fn workflow_interface() -> TypedInterface {
        TypedInterface::new()
            .with_input("a", Parameter::required(LiteralType::simple(SimpleKind::Integer)))
            .with_input("b", Parameter::required(LiteralType::simple(SimpleKind::String)))
            .with_output("o", LiteralType::simple(SimpleKind::String))
    }

    fn lp(fixed: &[(&str, Literal)], defaults: &[(&str, Literal)]) -> LaunchPlanSpec {
        LaunchPlanSpec {
            id: EntityId::new(ResourceType::LaunchPlan, "p", "d", "lp", "1"),
            workflow: wf_id(),
            fixed_inputs: fixed.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            default_inputs: defaults.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    #[test]
    fn test_fixed_input_is_removed() {
        let exposed =
            InterfaceResolver::narrow(&lp(&[("a", Literal::Integer(1))], &[]), &workflow_interface())
                .unwrap();
        assert!(!exposed.inputs.contains_key("a"));
        assert_eq!(exposed.required_inputs().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(exposed.outputs, workflow_interface().outputs);
    }

    #[test]
    fn test_default_input_becomes_optional() {
        let exposed = InterfaceResolver::narrow(
            &lp(&[], &[("b", Literal::String("x".into()))]),
            &workflow_interface(),
        )
        .unwrap();
        assert!(!exposed.inputs["b"].must_be_bound());
        assert_eq!(exposed.required_inputs().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_binary_input_can_be_fixed() {
        let iface = TypedInterface::new()
            .with_input("key", Parameter::required(LiteralType::simple(SimpleKind::Binary)));
        let exposed =
            InterfaceResolver::narrow(&lp(&[("key", Literal::Binary("AAEC".into()))], &[]), &iface)
                .unwrap();
        assert!(exposed.inputs.is_empty());
    }

    #[test]
    fn test_unknown_and_mistyped_fixed_inputs() {
        let errors = InterfaceResolver::narrow(
            &lp(
                &[("nope", Literal::Integer(1)), ("b", Literal::Integer(2))],
                &[],
            ),
            &workflow_interface(),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert!(messages.iter().any(|m| m.contains("'nope' is fixed, but")));
        assert!(messages
            .iter()
            .any(|m| m.contains("'b' has a fixed integer value, but the workflow declares string")));
    }

    #[test]
    fn test_resolve_skips_bad_task_defaults() {
        let task = TaskSpec {
            id: EntityId::new(ResourceType::Task, "p", "d", "t", "1"),
            task_type: String::new(),
            interface: TypedInterface::new().with_input(
                "n",
                Parameter::with_default(
                    LiteralType::simple(SimpleKind::Integer),
                    Literal::String("three".into()),
                ),
            ),
            metadata: serde_json::Value::Null,
        };
        let generic_task = TaskSpec {
            id: EntityId::new(ResourceType::Task, "p", "d", "g", "1"),
            task_type: String::new(),
            interface: TypedInterface::new().with_output("o", LiteralType::Generic("T".into())),
            metadata: serde_json::Value::Null,
        };
        let wf = WorkflowSpec {
            id: wf_id(),
            interface: workflow_interface(),
            nodes: vec![],
            outputs: vec![],
        };

        let decoded = vec![
            DecodedEntity {
                entry: "t.json".into(),
                entity: Entity::Task(task),
            },
            DecodedEntity {
                entry: "g.json".into(),
                entity: Entity::Task(generic_task),
            },
            DecodedEntity {
                entry: "wf.json".into(),
                entity: Entity::Workflow(wf),
            },
            DecodedEntity {
                entry: "lp.json".into(),
                entity: Entity::LaunchPlan(lp(&[("a", Literal::Integer(1))], &[])),
            },
        ];
        let (index, _) = ReferenceIndex::build(decoded);
        let (table, errors) = InterfaceResolver::resolve(&index);

        assert_eq!(table.len(), 2);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, FlowpackError::Interface { .. })));
    }
}
