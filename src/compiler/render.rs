// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Text, DOT and Mermaid renderings of a compiled workflow graph

use std::collections::BTreeMap;

use crate::model::{CompiledWorkflow, GraphEdge, Node, NodeKind, END_NODE_ID, START_NODE_ID};

/// Execution order with each node's producers
pub fn to_text(workflow: &CompiledWorkflow) -> String {
    let nodes = node_labels(workflow);
    let mut producers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &workflow.edges {
        let deps = producers.entry(edge.to.as_str()).or_default();
        if !deps.contains(&edge.from.as_str()) {
            deps.push(edge.from.as_str());
        }
    }

    let mut out = format!("{}\n", workflow.spec.id);
    let ordered = workflow
        .node_order
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(END_NODE_ID));

    for (i, id) in ordered.enumerate() {
        let label = nodes.get(id).map(String::as_str).unwrap_or("end");
        out.push_str(&format!("{}. {} ({})", i + 1, id, label));

        if let Some(deps) = producers.get(id) {
            out.push_str(&format!(" [depends: {}]", deps.join(", ")));
        }
        out.push('\n');
    }

    out
}

/// Graphviz DOT
pub fn to_dot(workflow: &CompiledWorkflow) -> String {
    let mut out = String::from("digraph workflow {\n");
    out.push_str("    rankdir=TB;\n");
    out.push_str("    node [shape=box, style=rounded];\n\n");

    for (id, label) in node_labels(workflow) {
        out.push_str(&format!("    \"{}\" [label=\"{}\\n{}\"];\n", id, id, label));
    }
    out.push_str(&format!("    \"{}\" [shape=circle];\n", START_NODE_ID));
    out.push_str(&format!("    \"{}\" [shape=doublecircle];\n\n", END_NODE_ID));

    for edge in &workflow.edges {
        match edge_label(edge) {
            Some(label) => out.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                edge.from, edge.to, label
            )),
            None => out.push_str(&format!(
                "    \"{}\" -> \"{}\" [style=dashed];\n",
                edge.from, edge.to
            )),
        }
    }

    out.push_str("}\n");
    out
}

/// Mermaid flowchart
pub fn to_mermaid(workflow: &CompiledWorkflow) -> String {
    let mut out = String::from("graph TD\n");

    // Mermaid ids cannot contain '-'
    let key = |id: &str| id.replace('-', "_");

    for (id, label) in node_labels(workflow) {
        out.push_str(&format!("    {}[\"{}: {}\"]\n", key(&id), id, label));
    }
    out.push_str(&format!("    {}((start))\n", key(START_NODE_ID)));
    out.push_str(&format!("    {}((end))\n", key(END_NODE_ID)));

    for edge in &workflow.edges {
        match edge_label(edge) {
            Some(label) => out.push_str(&format!(
                "    {} -->|{}| {}\n",
                key(&edge.from),
                label,
                key(&edge.to)
            )),
            None => out.push_str(&format!("    {} -.-> {}\n", key(&edge.from), key(&edge.to))),
        }
    }

    out
}

fn edge_label(edge: &GraphEdge) -> Option<String> {
    match (&edge.from_var, &edge.to_var) {
        (Some(from), Some(to)) if from == to => Some(from.clone()),
        (Some(from), Some(to)) => Some(format!("{} → {}", from, to)),
        _ => None,
    }
}

/// Labels of the top-level nodes, keyed by id
fn node_labels(workflow: &CompiledWorkflow) -> BTreeMap<String, String> {
    workflow
        .spec
        .nodes
        .iter()
        .filter(|n| !matches!(n.kind, NodeKind::Start | NodeKind::End))
        .map(|n| (n.id.clone(), describe(n)))
        .collect()
}

fn describe(node: &Node) -> String {
    match &node.kind {
        NodeKind::Task { reference }
        | NodeKind::Workflow { reference }
        | NodeKind::LaunchPlan { reference } => format!(
            "{} {}/{}/{}@{}",
            node.kind_name(),
            reference.project,
            reference.domain,
            reference.name,
            reference.version
        ),
        NodeKind::Branch {
            if_true, if_false, ..
        } => format!("branch {} | {}", if_true.id, if_false.id),
        NodeKind::Start => "start".into(),
        NodeKind::End => "end".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, ResourceType, TypedInterface, WorkflowSpec};

    fn sample() -> CompiledWorkflow {
        let task = |name: &str| NodeKind::Task {
            reference: EntityId::new(ResourceType::Task, "p", "d", name, "1"),
        };
        let node = |id: &str, name: &str| Node {
            id: id.into(),
            kind: task(name),
            inputs: vec![],
            upstream: vec![],
        };
        let edge = |from: &str, to: &str, vars: Option<(&str, &str)>| GraphEdge {
            from: from.into(),
            to: to.into(),
            from_var: vars.map(|v| v.0.to_string()),
            to_var: vars.map(|v| v.1.to_string()),
        };

        CompiledWorkflow {
            spec: WorkflowSpec {
                id: EntityId::new(ResourceType::Workflow, "p", "d", "wf", "1"),
                interface: TypedInterface::new(),
                nodes: vec![node("n0", "produce"), node("n1", "greet")],
                outputs: vec![],
            },
            node_order: vec!["n0".into(), "n1".into()],
            edges: vec![
                edge("n0", "n1", Some(("o", "name"))),
                edge("n1", END_NODE_ID, Some(("o", "o"))),
                edge(START_NODE_ID, "n0", None),
            ],
        }
    }

    #[test]
    fn test_text_rendering() {
        insta::assert_snapshot!(to_text(&sample()).trim_end(), @r"
        workflow:p/d/wf@1
        1. n0 (task p/d/produce@1) [depends: start-node]
        2. n1 (task p/d/greet@1) [depends: n0]
        3. end-node (end) [depends: n1]
        ");
    }

    #[test]
    fn test_dot_rendering() {
        let dot = to_dot(&sample());
        assert!(dot.starts_with("digraph workflow {"));
        assert!(dot.contains("\"n0\" -> \"n1\" [label=\"o → name\"];"));
        assert!(dot.contains("\"start-node\" -> \"n0\" [style=dashed];"));
    }

    #[test]
    fn test_mermaid_rendering() {
        let mermaid = to_mermaid(&sample());
        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("n0 -->|o → name| n1"));
        assert!(mermaid.contains("n1 -->|o| end_node"));
        assert!(mermaid.contains("start_node -.-> n0"));
    }
}
