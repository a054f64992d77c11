// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Bundle fixtures shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};

/// An in-memory bundle, packed on demand
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    files: Vec<(String, Vec<u8>)>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, name: &str, record: Value) -> Self {
        self.files
            .push((name.to_string(), serde_json::to_vec_pretty(&record).unwrap()));
        self
    }

    pub fn raw(mut self, name: &str, data: &[u8]) -> Self {
        self.files.push((name.to_string(), data.to_vec()));
        self
    }

    /// The same entries in reverse archive order
    pub fn reversed(&self) -> Self {
        let mut files = self.files.clone();
        files.reverse();
        Self { files }
    }

    pub fn to_tgz(&self) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, data) in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_slice()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_tgz()).unwrap();
        path
    }
}

pub fn id(resource_type: &str, name: &str) -> Value {
    json!({
        "resource_type": resource_type,
        "project": "flytesnacks",
        "domain": "development",
        "name": name,
        "version": "v1",
    })
}

fn inputs(params: &[(&str, &str)]) -> Value {
    params
        .iter()
        .map(|(name, kind)| (name.to_string(), json!({"type": {"simple": kind}})))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn outputs(params: &[(&str, &str)]) -> Value {
    params
        .iter()
        .map(|(name, kind)| (name.to_string(), json!({"simple": kind})))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

pub fn task(name: &str, ins: &[(&str, &str)], outs: &[(&str, &str)]) -> Value {
    json!({
        "kind": "task",
        "id": id("task", name),
        "task_type": "python-task",
        "interface": {"inputs": inputs(ins), "outputs": outputs(outs)},
    })
}

pub fn workflow(
    name: &str,
    ins: &[(&str, &str)],
    outs: &[(&str, &str)],
    nodes: Vec<Value>,
    output_bindings: Vec<Value>,
) -> Value {
    json!({
        "kind": "workflow",
        "id": id("workflow", name),
        "interface": {"inputs": inputs(ins), "outputs": outputs(outs)},
        "nodes": nodes,
        "outputs": output_bindings,
    })
}

pub fn launch_plan(name: &str, workflow: &str, fixed: Value) -> Value {
    json!({
        "kind": "launch_plan",
        "id": id("launch_plan", name),
        "workflow": id("workflow", workflow),
        "fixed_inputs": fixed,
    })
}

/// A node invoking an entity; `kind` is task, workflow or launch_plan
pub fn node(node_id: &str, kind: &str, reference: &str, bindings: Vec<Value>) -> Value {
    json!({
        "id": node_id,
        "kind": {"type": kind, "reference": id(kind, reference)},
        "inputs": bindings,
    })
}

pub fn from_input(var: &str, name: &str) -> Value {
    json!({"var": var, "source": {"workflow_input": {"name": name}}})
}

pub fn from_node(var: &str, node_id: &str, output: &str) -> Value {
    json!({"var": var, "source": {"node_output": {"node_id": node_id, "var": output}}})
}

/// Workflow `name`: x -> double -> double -> y
pub fn doubling_workflow(name: &str) -> Value {
    workflow(
        name,
        &[("x", "integer")],
        &[("y", "integer")],
        vec![
            node("n0", "task", "double", vec![from_input("x", "x")]),
            node("n1", "task", "double", vec![from_node("x", "n0", "o")]),
        ],
        vec![from_node("y", "n1", "o")],
    )
}

/// Tasks used by most fixtures
pub fn base_bundle() -> Bundle {
    Bundle::new()
        .record(
            "tasks/double.json",
            task("double", &[("x", "integer")], &[("o", "integer")]),
        )
        .record(
            "tasks/greet.json",
            task("greet", &[("name", "string")], &[("o", "string")]),
        )
}
