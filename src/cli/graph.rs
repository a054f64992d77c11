// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Graph command
//!
//! Renders one compiled workflow as text, DOT or Mermaid.

use miette::Result;
use std::path::PathBuf;

use super::compile::compile_bundle;
use super::GraphFormat;
use crate::compiler::render;
use crate::errors::FlowpackError;
use crate::model::{CompiledClosure, CompiledWorkflow};

pub async fn run(
    file: PathBuf,
    workflow: String,
    format: GraphFormat,
    config: Option<PathBuf>,
    _verbose: bool,
) -> Result<()> {
    if workflow.trim().is_empty() {
        return Err(FlowpackError::InvalidArgument {
            message: "--workflow must name a workflow".into(),
        }
        .into());
    }

    let closure = compile_bundle(&file, config.as_deref(), false).await?;
    let compiled = find_workflow(&closure, &workflow)?;

    let rendered = match format {
        GraphFormat::Text => render::to_text(compiled),
        GraphFormat::Dot => render::to_dot(compiled),
        GraphFormat::Mermaid => render::to_mermaid(compiled),
    };
    print!("{}", rendered);

    Ok(())
}

/// Match on the full identifier first, then on the name. A bare name
/// shared by several versions resolves to the greatest identifier.
fn find_workflow<'a>(closure: &'a CompiledClosure, query: &str) -> Result<&'a CompiledWorkflow> {
    if let Some(wf) = closure
        .workflows()
        .find(|wf| wf.spec.id.to_string() == query)
    {
        return Ok(wf);
    }

    closure
        .workflows()
        .filter(|wf| wf.spec.id.name == query)
        .last()
        .ok_or_else(|| {
            let available: Vec<String> = closure
                .workflows()
                .map(|wf| wf.spec.id.name.clone())
                .collect();
            miette::miette!(
                "Workflow '{}' not found. Available workflows: {}",
                query,
                if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                }
            )
        })
}
