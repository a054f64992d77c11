// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Workflow compilation
//!
//! Validates one workflow against the shared, read-only reference index and
//! interface table: node structure, graph shape, every input binding and
//! every workflow output. All defects of the workflow are collected.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::graph::WorkflowGraph;
use super::index::ReferenceIndex;
use super::interface::InterfaceTable;
use super::types::{is_comparable, is_compatible, literal_type};
use crate::config::UnionVariance;
use crate::errors::FlowpackError;
use crate::model::{
    Binding, BindingSource, CompiledWorkflow, Condition, EntityId, Literal, LiteralType, Node,
    NodeKind, Operand, Parameter, WorkflowSpec, END_NODE_ID, START_NODE_ID,
};

type Outputs = BTreeMap<String, LiteralType>;

/// Compiles workflows against resolved interfaces
pub struct WorkflowCompiler<'a> {
    index: &'a ReferenceIndex,
    interfaces: &'a InterfaceTable,
    variance: UnionVariance,
}

impl<'a> WorkflowCompiler<'a> {
    pub fn new(
        index: &'a ReferenceIndex,
        interfaces: &'a InterfaceTable,
        variance: UnionVariance,
    ) -> Self {
        Self {
            index,
            interfaces,
            variance,
        }
    }

    /// Compile a single workflow, returning every defect found in it
    pub fn compile(&self, spec: &WorkflowSpec) -> Result<CompiledWorkflow, Vec<FlowpackError>> {
        let mut errors = check_structure(spec);

        let (graph, graph_errors) = WorkflowGraph::build(spec);
        errors.extend(graph_errors);

        let node_order = match graph.topological_order(&spec.id) {
            Ok(order) => order,
            Err(cycles) => {
                errors.extend(cycles);
                Vec::new()
            }
        };

        let mut checker = BindingChecker::new(self, spec);
        for node in &spec.nodes {
            checker.check_node(node, false);
        }
        checker.check_outputs();
        errors.extend(checker.errors);

        if !errors.is_empty() {
            debug!(workflow = %spec.id, defects = errors.len(), "Workflow failed to compile");
            return Err(errors);
        }

        debug!(workflow = %spec.id, nodes = node_order.len(), "Compiled workflow");
        Ok(CompiledWorkflow {
            spec: spec.clone(),
            node_order,
            edges: graph.edges(),
        })
    }
}

/// Node ids must be unique (branch arms included), reserved ids belong to
/// the start and end nodes, and each of those is declared at most once
fn check_structure(spec: &WorkflowSpec) -> Vec<FlowpackError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();

    for node in spec.all_nodes() {
        if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
            errors.push(FlowpackError::DuplicateNodeId {
                workflow: spec.id.clone(),
                node: node.id.clone(),
            });
        }

        let reserved = (node.id == START_NODE_ID && !matches!(node.kind, NodeKind::Start))
            || (node.id == END_NODE_ID && !matches!(node.kind, NodeKind::End));
        if reserved {
            errors.push(invalid_start_end(spec, &node.id, "uses an id reserved for the start and end nodes"));
        }
    }

    for (pred, what) in [
        (NodeKind::Start, "is a second start node"),
        (NodeKind::End, "is a second end node"),
    ] {
        let extra = spec
            .nodes
            .iter()
            .filter(|n| std::mem::discriminant(&n.kind) == std::mem::discriminant(&pred))
            .skip(1);
        for node in extra {
            errors.push(invalid_start_end(spec, &node.id, what));
        }
    }

    errors
}

fn invalid_start_end(spec: &WorkflowSpec, node: &str, reason: &str) -> FlowpackError {
    FlowpackError::InvalidStartEnd {
        workflow: spec.id.clone(),
        node: node.to_string(),
        reason: reason.to_string(),
    }
}

/// Per-workflow binding and type checks
struct BindingChecker<'c, 's> {
    compiler: &'c WorkflowCompiler<'c>,
    spec: &'s WorkflowSpec,
    start_alias: Option<&'s str>,
    end_alias: Option<&'s str>,
    /// Outputs of top-level nodes; `None` when unknown or invalid
    outputs: HashMap<&'s str, Option<Outputs>>,
    errors: Vec<FlowpackError>,
}

impl<'c, 's> BindingChecker<'c, 's> {
    fn new(compiler: &'c WorkflowCompiler<'c>, spec: &'s WorkflowSpec) -> Self {
        let find = |start: bool| {
            spec.nodes
                .iter()
                .find(|n| match n.kind {
                    NodeKind::Start => start,
                    NodeKind::End => !start,
                    _ => false,
                })
                .map(|n| n.id.as_str())
        };

        let mut checker = Self {
            compiler,
            spec,
            start_alias: find(true),
            end_alias: find(false),
            outputs: HashMap::new(),
            errors: Vec::new(),
        };

        for node in &spec.nodes {
            if !checker.outputs.contains_key(node.id.as_str()) {
                let outputs = checker.outputs_of(node);
                checker.outputs.insert(node.id.as_str(), outputs);
            }
        }

        checker
    }

    /// Outputs a node exposes to its consumers. Branch arms are compared
    /// here, once per branch.
    fn outputs_of(&mut self, node: &Node) -> Option<Outputs> {
        match &node.kind {
            NodeKind::Task { reference }
            | NodeKind::Workflow { reference }
            | NodeKind::LaunchPlan { reference } => self
                .compiler
                .interfaces
                .get(reference)
                .map(|iface| iface.outputs.clone()),
            NodeKind::Branch {
                if_true, if_false, ..
            } => {
                let t = self.outputs_of(if_true);
                let f = self.outputs_of(if_false);
                let (t, f) = (t?, f?);
                match self.arm_mismatch(if_true, &t, if_false, &f) {
                    Some(reason) => {
                        self.errors.push(FlowpackError::BranchOutputMismatch {
                            workflow: self.spec.id.clone(),
                            node: node.id.clone(),
                            reason,
                        });
                        None
                    }
                    None => Some(t),
                }
            }
            NodeKind::Start => Some(
                self.spec
                    .interface
                    .inputs
                    .iter()
                    .map(|(name, p)| (name.clone(), p.param_type.clone()))
                    .collect(),
            ),
            NodeKind::End => None,
        }
    }

    fn arm_mismatch(&self, t_node: &Node, t: &Outputs, f_node: &Node, f: &Outputs) -> Option<String> {
        if t.keys().ne(f.keys()) {
            let names = |o: &Outputs| o.keys().cloned().collect::<Vec<_>>().join(", ");
            return Some(format!(
                "'{}' produces [{}] but '{}' produces [{}]",
                t_node.id,
                names(t),
                f_node.id,
                names(f)
            ));
        }

        let variance = self.compiler.variance;
        t.iter().zip(f.values()).find_map(|((name, tt), ft)| {
            let compatible = is_compatible(tt, ft, variance) && is_compatible(ft, tt, variance);
            (!compatible).then(|| {
                format!(
                    "output '{}' is {} in '{}' but {} in '{}'",
                    name, tt, t_node.id, ft, f_node.id
                )
            })
        })
    }

    fn check_node(&mut self, node: &Node, in_arm: bool) {
        let compiler = self.compiler;
        match &node.kind {
            NodeKind::Start | NodeKind::End if in_arm => {
                self.errors.push(invalid_start_end(
                    self.spec,
                    &node.id,
                    "cannot appear inside a branch arm",
                ));
            }
            NodeKind::Start => {
                if !node.inputs.is_empty() || !node.upstream.is_empty() {
                    self.errors.push(invalid_start_end(
                        self.spec,
                        &node.id,
                        "is a start node and cannot have inputs or upstream nodes",
                    ));
                }
            }
            // End inputs are workflow outputs, checked with them
            NodeKind::End => {}
            NodeKind::Task { reference } | NodeKind::Workflow { reference } => {
                if let Some(iface) = compiler.interfaces.get(reference) {
                    self.check_bindings(node, &iface.inputs, None);
                }
            }
            NodeKind::LaunchPlan { reference } => {
                let Some(iface) = compiler.interfaces.get(reference) else {
                    return;
                };
                let fixed = compiler
                    .index
                    .launch_plan(reference)
                    .map(|lp| &lp.fixed_inputs);
                self.check_bindings(node, &iface.inputs, fixed.map(|f| (reference, f)));
            }
            NodeKind::Branch {
                condition,
                if_true,
                if_false,
            } => {
                self.check_branch(node, condition);
                self.check_node(if_true, true);
                self.check_node(if_false, true);
            }
        }
    }

    fn check_bindings(
        &mut self,
        node: &Node,
        params: &BTreeMap<String, Parameter>,
        launch_plan: Option<(&EntityId, &BTreeMap<String, Literal>)>,
    ) {
        let mut bound = HashSet::new();

        for binding in &node.inputs {
            if !bound.insert(binding.var.as_str()) {
                self.errors.push(FlowpackError::DuplicateBinding {
                    workflow: self.spec.id.clone(),
                    node: node.id.clone(),
                    parameter: binding.var.clone(),
                });
                continue;
            }

            if let Some((lp, fixed)) = launch_plan {
                if fixed.contains_key(&binding.var) {
                    self.errors.push(FlowpackError::FixedInputRebound {
                        workflow: self.spec.id.clone(),
                        node: node.id.clone(),
                        launch_plan: lp.clone(),
                        parameter: binding.var.clone(),
                    });
                    continue;
                }
            }

            let Some(param) = params.get(&binding.var) else {
                self.errors.push(FlowpackError::UnknownInput {
                    workflow: self.spec.id.clone(),
                    node: node.id.clone(),
                    parameter: binding.var.clone(),
                });
                continue;
            };

            self.check_source(&node.id, binding, &param.param_type);
        }

        for (name, param) in params {
            if param.must_be_bound() && !bound.contains(name.as_str()) {
                self.errors.push(FlowpackError::MissingInput {
                    workflow: self.spec.id.clone(),
                    node: node.id.clone(),
                    parameter: name.clone(),
                });
            }
        }
    }

    /// Check that a binding's source can feed a parameter of type `expected`
    fn check_source(&mut self, node: &str, binding: &Binding, expected: &LiteralType) {
        let actual = match &binding.source {
            BindingSource::Literal(value) => {
                if value.conforms_to(expected) {
                    return;
                }
                value.shape().to_string()
            }
            source => match self.source_type(node, source) {
                Some(ty) if !is_compatible(&ty, expected, self.compiler.variance) => ty.to_string(),
                _ => return,
            },
        };

        self.errors.push(FlowpackError::TypeMismatch {
            workflow: self.spec.id.clone(),
            node: node.to_string(),
            parameter: binding.var.clone(),
            expected: expected.to_string(),
            actual,
        });
    }

    /// Type produced by a binding source, reporting outputs that do not
    /// exist. Unknown producer nodes are reported by the graph builder.
    fn source_type(&mut self, node: &str, source: &BindingSource) -> Option<LiteralType> {
        match source {
            BindingSource::WorkflowInput { name } => self.workflow_input(node, name),
            BindingSource::NodeOutput { node_id, var } => {
                if node_id == START_NODE_ID || self.start_alias == Some(node_id.as_str()) {
                    return self.workflow_input(node, var);
                }
                if node_id == END_NODE_ID || self.end_alias == Some(node_id.as_str()) {
                    return None;
                }

                let outputs = self.outputs.get(node_id.as_str())?.as_ref()?;
                match outputs.get(var) {
                    Some(ty) => Some(ty.clone()),
                    None => {
                        self.errors.push(FlowpackError::UnknownOutput {
                            workflow: self.spec.id.clone(),
                            node: node.to_string(),
                            source_node: node_id.clone(),
                            output: var.clone(),
                        });
                        None
                    }
                }
            }
            BindingSource::Literal(value) => literal_type(value),
        }
    }

    fn workflow_input(&mut self, node: &str, name: &str) -> Option<LiteralType> {
        match self.spec.interface.inputs.get(name) {
            Some(param) => Some(param.param_type.clone()),
            None => {
                self.errors.push(FlowpackError::UnknownOutput {
                    workflow: self.spec.id.clone(),
                    node: node.to_string(),
                    source_node: START_NODE_ID.to_string(),
                    output: name.to_string(),
                });
                None
            }
        }
    }

    /// A branch binds free variables for its condition; they carry no
    /// declared interface, only the types of their sources
    fn check_branch(&mut self, node: &Node, condition: &Condition) {
        let mut vars: HashMap<&str, Option<LiteralType>> = HashMap::new();

        for binding in &node.inputs {
            if vars.contains_key(binding.var.as_str()) {
                self.errors.push(FlowpackError::DuplicateBinding {
                    workflow: self.spec.id.clone(),
                    node: node.id.clone(),
                    parameter: binding.var.clone(),
                });
                continue;
            }
            let ty = self.source_type(&node.id, &binding.source);
            vars.insert(binding.var.as_str(), ty);
        }

        let mut reasons = Vec::new();
        self.check_condition(condition, &vars, &mut reasons);
        for reason in reasons {
            self.errors.push(FlowpackError::InvalidBranchCondition {
                workflow: self.spec.id.clone(),
                node: node.id.clone(),
                reason,
            });
        }
    }

    fn check_condition(
        &self,
        condition: &Condition,
        vars: &HashMap<&str, Option<LiteralType>>,
        reasons: &mut Vec<String>,
    ) {
        match condition {
            Condition::And(a, b) | Condition::Or(a, b) => {
                self.check_condition(a, vars, reasons);
                self.check_condition(b, vars, reasons);
            }
            Condition::Comparison { left, op, right } => {
                let left = operand_type(left, vars);
                let right = operand_type(right, vars);

                let (left, right) = match (left, right) {
                    (Ok(l), Ok(r)) => (l, r),
                    (l, r) => {
                        reasons.extend(l.err());
                        reasons.extend(r.err());
                        return;
                    }
                };

                let (Some(left), Some(right)) = (left, right) else {
                    return;
                };

                for ty in [&left, &right] {
                    if !ty.is_primitive() {
                        reasons.push(format!("operand of type {} is not a primitive", ty));
                    }
                }
                if left.is_primitive()
                    && right.is_primitive()
                    && !is_comparable(&left, &right, self.compiler.variance)
                {
                    reasons.push(format!("cannot apply {:?} to {} and {}", op, left, right));
                }
            }
        }
    }

    /// Workflow outputs and end node inputs feed the workflow's declared
    /// outputs; every declared output must be bound exactly once
    fn check_outputs(&mut self) {
        let spec = self.spec;
        let end_label = self.end_alias.unwrap_or(END_NODE_ID);
        let end_inputs = spec
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::End))
            .take(1)
            .flat_map(|n| n.inputs.iter());

        let mut bound = HashSet::new();
        for binding in spec.outputs.iter().chain(end_inputs) {
            if !bound.insert(binding.var.as_str()) {
                self.errors.push(FlowpackError::DuplicateBinding {
                    workflow: spec.id.clone(),
                    node: end_label.to_string(),
                    parameter: binding.var.clone(),
                });
                continue;
            }

            let Some(expected) = spec.interface.outputs.get(&binding.var) else {
                self.errors.push(FlowpackError::UnknownInput {
                    workflow: spec.id.clone(),
                    node: end_label.to_string(),
                    parameter: binding.var.clone(),
                });
                continue;
            };

            self.check_source(end_label, binding, expected);
        }

        for name in spec.interface.outputs.keys() {
            if !bound.contains(name.as_str()) {
                self.errors.push(FlowpackError::MissingInput {
                    workflow: spec.id.clone(),
                    node: end_label.to_string(),
                    parameter: name.clone(),
                });
            }
        }
    }
}

fn operand_type(
    operand: &Operand,
    vars: &HashMap<&str, Option<LiteralType>>,
) -> Result<Option<LiteralType>, String> {
    match operand {
        Operand::Var(name) => vars
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| format!("unknown variable '{}'", name)),
        Operand::Literal(value) if value.is_primitive() => Ok(literal_type(value)),
        Operand::Literal(value) => Err(format!("a {} literal cannot be compared", value.shape())),
    }
}
