// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Workflow node graph
//!
//! Builds the directed graph implied by a workflow's bindings, anchored
//! between the implicit start and end nodes, and validates that it is
//! acyclic. All traversals are iterative so graph size cannot exhaust the
//! stack.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::errors::FlowpackError;
use crate::model::{
    BindingSource, EntityId, GraphEdge, Node, NodeKind, WorkflowSpec, END_NODE_ID,
    START_NODE_ID,
};

/// Validated dependency graph of one workflow
pub struct WorkflowGraph {
    graph: DiGraph<String, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    edges: BTreeSet<GraphEdge>,
    start: NodeIndex,
    end: NodeIndex,
}

enum Target {
    Start,
    End,
    Node(NodeIndex),
    Unknown,
}

impl WorkflowGraph {
    /// Build the graph of a workflow's top-level nodes.
    ///
    /// Structural defects (unknown producers, self references, dependencies
    /// on the end node) are returned alongside the graph, which then omits
    /// the offending edges.
    pub fn build(spec: &WorkflowSpec) -> (Self, Vec<FlowpackError>) {
        let mut graph = DiGraph::new();
        let start = graph.add_node(START_NODE_ID.to_string());
        let mut name_to_index = HashMap::new();

        for node in &spec.nodes {
            if matches!(node.kind, NodeKind::Start | NodeKind::End) {
                continue;
            }
            if !name_to_index.contains_key(&node.id) {
                let idx = graph.add_node(node.id.clone());
                name_to_index.insert(node.id.clone(), idx);
            }
        }
        let end = graph.add_node(END_NODE_ID.to_string());

        let mut builder = Self {
            graph,
            name_to_index,
            edges: BTreeSet::new(),
            start,
            end,
        };

        let start_alias = declared_id(spec, |k| matches!(k, NodeKind::Start));
        let end_alias = declared_id(spec, |k| matches!(k, NodeKind::End));
        let resolve = |builder: &Self, id: &str| -> Target {
            if id == START_NODE_ID || start_alias == Some(id) {
                Target::Start
            } else if id == END_NODE_ID || end_alias == Some(id) {
                Target::End
            } else {
                builder
                    .name_to_index
                    .get(id)
                    .map_or(Target::Unknown, |idx| Target::Node(*idx))
            }
        };

        let mut errors = Vec::new();
        let mut reported = HashSet::new();

        let mut sinks: Vec<(String, NodeIndex, Vec<Dependency>)> = spec
            .nodes
            .iter()
            .filter_map(|node| {
                let target = match node.kind {
                    NodeKind::Start => return None,
                    NodeKind::End => end,
                    _ => builder.name_to_index[&node.id],
                };
                Some((node.id.clone(), target, node_dependencies(node, None)))
            })
            .collect();

        // Workflow outputs feed the end node
        let outputs = spec
            .outputs
            .iter()
            .filter_map(|b| Dependency::from_binding(END_NODE_ID, b.var.clone(), &b.source))
            .collect();
        sinks.push((END_NODE_ID.to_string(), end, outputs));

        for (node_id, target, deps) in sinks {
            for dep in deps {
                let source_id = dep.source.as_deref().unwrap_or(START_NODE_ID);
                // An arm reading its own outputs, or those of its branch
                let own = source_id == dep.owner || source_id == node_id;
                if own && target != end {
                    if reported.insert((dep.owner.clone(), source_id.to_string())) {
                        errors.push(FlowpackError::SelfReference {
                            workflow: spec.id.clone(),
                            node: dep.owner.clone(),
                        });
                    }
                    continue;
                }

                let from = match resolve(&builder, source_id) {
                    Target::Start => start,
                    Target::Node(idx) => idx,
                    Target::End => {
                        if reported.insert((node_id.clone(), source_id.to_string())) {
                            errors.push(FlowpackError::InvalidStartEnd {
                                workflow: spec.id.clone(),
                                node: node_id.clone(),
                                reason: "cannot depend on the end node".into(),
                            });
                        }
                        continue;
                    }
                    Target::Unknown => {
                        if reported.insert((node_id.clone(), source_id.to_string())) {
                            errors.push(FlowpackError::UnknownNode {
                                workflow: spec.id.clone(),
                                node: node_id.clone(),
                                reference: source_id.to_string(),
                            });
                        }
                        continue;
                    }
                };

                builder.connect(from, target, dep.from_var, dep.to_var);
            }
        }

        builder.anchor();
        (builder, errors)
    }

    fn connect(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        from_var: Option<String>,
        to_var: Option<String>,
    ) {
        self.graph.update_edge(from, to, ());
        self.edges.insert(GraphEdge {
            from: self.graph[from].clone(),
            to: self.graph[to].clone(),
            from_var,
            to_var,
        });
    }

    /// Hang every source off the start node and every sink off the end node
    fn anchor(&mut self) {
        let nodes: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| *n != self.start && *n != self.end)
            .collect();

        for node in nodes {
            let has_inbound = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .next()
                .is_some();
            if !has_inbound {
                self.connect(self.start, node, None, None);
            }

            let has_outbound = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .next()
                .is_some();
            if !has_outbound {
                self.connect(node, self.end, None, None);
            }
        }

        if self
            .graph
            .neighbors_directed(self.end, Direction::Incoming)
            .next()
            .is_none()
        {
            self.connect(self.start, self.end, None, None);
        }
    }

    /// Node ids in execution order, excluding start and end
    pub fn topological_order(&self, workflow: &EntityId) -> Result<Vec<String>, Vec<FlowpackError>> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .filter(|n| *n != self.start && *n != self.end)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .map_err(|_| {
                find_cycles(&self.graph)
                    .into_iter()
                    .map(|nodes| FlowpackError::GraphCycle {
                        workflow: workflow.clone(),
                        nodes,
                    })
                    .collect()
            })
    }

    /// Labeled edges, sorted
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.edges.iter().cloned().collect()
    }
}

/// One inbound dependency of a node
struct Dependency {
    /// Node declaring the dependency: the node itself or one of its arms
    owner: String,
    /// Producer node id; `None` means a workflow input
    source: Option<String>,
    from_var: Option<String>,
    to_var: Option<String>,
}

impl Dependency {
    fn from_binding(owner: &str, to_var: String, source: &BindingSource) -> Option<Self> {
        match source {
            BindingSource::WorkflowInput { name } => Some(Self {
                owner: owner.to_string(),
                source: None,
                from_var: Some(name.clone()),
                to_var: Some(to_var),
            }),
            BindingSource::NodeOutput { node_id, var } => Some(Self {
                owner: owner.to_string(),
                source: Some(node_id.clone()),
                from_var: Some(var.clone()),
                to_var: Some(to_var),
            }),
            BindingSource::Literal(_) => None,
        }
    }
}

/// Data and ordering dependencies of a node, including those of its branch
/// arms. Arm inputs are labeled `<arm>.<input>`.
fn node_dependencies(node: &Node, arm: Option<&str>) -> Vec<Dependency> {
    let label = |var: &str| match arm {
        Some(arm) => format!("{}.{}", arm, var),
        None => var.to_string(),
    };

    let mut deps: Vec<Dependency> = node
        .inputs
        .iter()
        .filter_map(|b| Dependency::from_binding(&node.id, label(&b.var), &b.source))
        .collect();

    deps.extend(node.upstream.iter().map(|up| Dependency {
        owner: node.id.clone(),
        source: Some(up.clone()),
        from_var: None,
        to_var: None,
    }));

    if let NodeKind::Branch {
        if_true, if_false, ..
    } = &node.kind
    {
        deps.extend(node_dependencies(if_true, Some(&if_true.id)));
        deps.extend(node_dependencies(if_false, Some(&if_false.id)));
    }

    deps
}

fn declared_id(spec: &WorkflowSpec, pred: impl Fn(&NodeKind) -> bool) -> Option<&str> {
    spec.nodes
        .iter()
        .find(|n| pred(&n.kind))
        .map(|n| n.id.as_str())
}

/// Find one concrete cycle per strongly connected component, each closed
/// (first member repeated at the end) and starting at its smallest member.
/// Cycles are returned in order of that member.
pub(crate) fn find_cycles<N: Clone + Ord>(graph: &DiGraph<N, ()>) -> Vec<Vec<N>> {
    let mut cycles: Vec<Vec<N>> = kosaraju_scc(graph)
        .into_iter()
        .filter_map(|component| {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|n| graph.contains_edge(*n, *n));
            if !is_cycle {
                return None;
            }

            let members: HashSet<NodeIndex> = component.iter().copied().collect();
            let start = *component.iter().min_by(|a, b| graph[**a].cmp(&graph[**b]))?;
            cycle_through(graph, start, &members)
        })
        .collect();

    cycles.sort();
    cycles
}

/// Shortest path from `start` back to itself inside one component (BFS)
fn cycle_through<N: Clone>(
    graph: &DiGraph<N, ()>,
    start: NodeIndex,
    members: &HashSet<NodeIndex>,
) -> Option<Vec<N>> {
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        let mut successors: Vec<NodeIndex> = graph
            .neighbors_directed(current, Direction::Outgoing)
            .filter(|n| members.contains(n))
            .collect();
        successors.sort();

        for next in successors {
            if next == start {
                let mut path = vec![graph[start].clone()];
                let mut cursor = current;
                let mut tail = Vec::new();
                while cursor != start {
                    tail.push(graph[cursor].clone());
                    cursor = parent[&cursor];
                }
                path.extend(tail.into_iter().rev());
                path.push(graph[start].clone());
                return Some(path);
            }
            if !parent.contains_key(&next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Binding, ComparisonOp, Condition, Literal, Operand, ResourceType, TypedInterface,
    };

    fn task_node(id: &str, inputs: Vec<Binding>) -> Node {
        Node {
            id: id.into(),
            kind: NodeKind::Task {
                reference: EntityId::new(ResourceType::Task, "p", "d", "t", "1"),
            },
            inputs,
            upstream: vec![],
        }
    }

    fn workflow(nodes: Vec<Node>, outputs: Vec<Binding>) -> WorkflowSpec {
        WorkflowSpec {
            id: EntityId::new(ResourceType::Workflow, "p", "d", "wf", "1"),
            interface: TypedInterface::new(),
            nodes,
            outputs,
        }
    }

    #[test]
    fn test_linear_graph() {
        let spec = workflow(
            vec![
                task_node("a", vec![Binding::from_input("x", "x")]),
                task_node("b", vec![Binding::from_node("x", "a", "o")]),
                task_node("c", vec![Binding::from_node("x", "b", "o")]),
            ],
            vec![Binding::from_node("out", "c", "o")],
        );

        let (graph, errors) = WorkflowGraph::build(&spec);
        assert!(errors.is_empty());
        assert_eq!(graph.topological_order(&spec.id).unwrap(), vec!["a", "b", "c"]);
        let edges = graph.edges();
        assert!(edges.iter().any(|e| e.from == START_NODE_ID && e.to == "a"));
        assert!(edges.iter().any(|e| e.from == "c" && e.to == END_NODE_ID));
    }

    #[test]
    fn test_unknown_and_self_references() {
        let spec = workflow(
            vec![
                task_node("a", vec![Binding::from_node("x", "a", "o")]),
                task_node(
                    "b",
                    vec![
                        Binding::from_node("x", "ghost", "o"),
                        Binding::from_node("y", "ghost", "p"),
                    ],
                ),
            ],
            vec![],
        );

        let (_, errors) = WorkflowGraph::build(&spec);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], FlowpackError::SelfReference { .. }));
        assert!(matches!(
            &errors[1],
            FlowpackError::UnknownNode { reference, .. } if reference == "ghost"
        ));
    }

    #[test]
    fn test_arm_reading_its_own_output_is_a_self_reference() {
        let branch = Node {
            id: "b".into(),
            kind: NodeKind::Branch {
                condition: Condition::Comparison {
                    left: Operand::Literal(Literal::Boolean(true)),
                    op: ComparisonOp::Eq,
                    right: Operand::Literal(Literal::Boolean(true)),
                },
                if_true: Box::new(task_node("b-t", vec![Binding::from_node("x", "b-t", "o")])),
                if_false: Box::new(task_node("b-f", vec![Binding::from_input("x", "x")])),
            },
            inputs: vec![],
            upstream: vec![],
        };
        let spec = workflow(vec![branch], vec![]);

        let (_, errors) = WorkflowGraph::build(&spec);
        match &errors[..] {
            [FlowpackError::SelfReference { node, .. }] => assert_eq!(node, "b-t"),
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[test]
    fn test_cycle_reports_path() {
        let spec = workflow(
            vec![
                task_node("a", vec![Binding::from_node("x", "c", "o")]),
                task_node("b", vec![Binding::from_node("x", "a", "o")]),
                task_node("c", vec![Binding::from_node("x", "b", "o")]),
            ],
            vec![],
        );

        let (graph, errors) = WorkflowGraph::build(&spec);
        assert!(errors.is_empty());
        let errors = graph.topological_order(&spec.id).unwrap_err();
        match &errors[..] {
            [FlowpackError::GraphCycle { nodes, .. }] => {
                assert_eq!(nodes, &vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[test]
    fn test_ordering_edges_and_anchors() {
        let mut b = task_node("b", vec![]);
        b.upstream = vec!["a".into()];
        let spec = workflow(vec![task_node("a", vec![]), b], vec![]);

        let (graph, errors) = WorkflowGraph::build(&spec);
        assert!(errors.is_empty());
        let edges = graph.edges();
        assert!(edges.contains(&GraphEdge {
            from: "a".into(),
            to: "b".into(),
            from_var: None,
            to_var: None,
        }));
        assert!(edges.iter().any(|e| e.from == START_NODE_ID && e.to == "a"));
        assert!(edges.iter().any(|e| e.from == "b" && e.to == END_NODE_ID));
    }

    #[test]
    fn test_find_cycles_ignores_acyclic_components() {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let a = graph.add_node("a".into());
        let b = graph.add_node("b".into());
        let c = graph.add_node("c".into());
        graph.add_edge(a, b, ());
        graph.add_edge(b, c, ());
        graph.add_edge(c, c, ());

        assert_eq!(find_cycles(&graph), vec![vec!["c".to_string(), "c".to_string()]]);
    }
}
