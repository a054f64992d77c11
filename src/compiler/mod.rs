// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Bundle compilation
//!
//! Drives the stages in order: archive loading, entity decoding, reference
//! indexing, interface resolution, per-workflow graph compilation and
//! closure assembly. Only an unreadable archive aborts early; every other
//! defect is collected and reported together.

pub mod assembler;
pub mod decode;
pub mod graph;
pub mod index;
pub mod interface;
pub mod render;
pub mod types;
pub mod workflow;

pub use assembler::ClosureAssembler;
pub use index::ReferenceIndex;
pub use interface::{InterfaceResolver, InterfaceTable};
pub use workflow::WorkflowCompiler;

use std::collections::BTreeMap;

use tracing::{debug, info, info_span, warn};

use crate::archive::{ArchiveEntry, ArchiveLoader, BundleSource};
use crate::config::CompilerConfig;
use crate::errors::{FlowpackError, FlowpackResult};
use crate::model::{CompiledClosure, CompiledWorkflow, EntityId, WorkflowSpec};

type WorkflowOutcome = (EntityId, Result<CompiledWorkflow, Vec<FlowpackError>>);

/// Bundle compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a bundle from any source. The CPU-bound work runs on the
    /// blocking pool.
    pub async fn compile_source(&self, source: &dyn BundleSource) -> FlowpackResult<CompiledClosure> {
        info!(source = %source.describe(), "Reading bundle");
        let bytes = source.read().await?;

        let compiler = self.clone();
        tokio::task::spawn_blocking(move || compiler.compile_bytes(&bytes))
            .await
            .map_err(|e| FlowpackError::Io {
                message: format!("compilation task failed: {}", e),
            })?
    }

    /// Compile a gzip-compressed tar bundle
    pub fn compile_bytes(&self, bytes: &[u8]) -> FlowpackResult<CompiledClosure> {
        let loader = ArchiveLoader::new(self.config.limits.clone(), self.config.ignore_patterns()?);
        let entries = loader.load(bytes)?;
        info!(entries = entries.len(), "Unpacked bundle");
        self.compile_entries(entries)
    }

    /// Compile already unpacked entries
    pub fn compile_entries(&self, entries: Vec<ArchiveEntry>) -> FlowpackResult<CompiledClosure> {
        let _span = info_span!("compile").entered();

        let (decoded, mut errors) = decode::decode_entries(entries);
        info!(decoded = decoded.len(), failed = errors.len(), "Decoded entities");

        let (index, index_errors) = ReferenceIndex::build(decoded);
        errors.extend(index_errors);
        if index.is_empty() {
            warn!("Bundle contains no entities");
        }

        let (interfaces, interface_errors) = InterfaceResolver::resolve(&index);
        errors.extend(interface_errors);

        let mut workflows = BTreeMap::new();
        for (id, outcome) in self.compile_workflows(&index, &interfaces) {
            match outcome {
                Ok(compiled) => {
                    workflows.insert(id, compiled);
                }
                Err(defects) => errors.extend(defects),
            }
        }
        info!(
            workflows = index.workflows().count(),
            compiled = workflows.len(),
            "Compiled workflows"
        );

        let order = match ClosureAssembler::registration_order(&index) {
            Ok(order) => order,
            Err(cycles) => {
                errors.extend(cycles);
                Vec::new()
            }
        };

        if !errors.is_empty() {
            for error in &errors {
                debug!("{}", error);
            }
            warn!(errors = errors.len(), "Compilation failed");
            return Err(FlowpackError::compilation(errors));
        }

        let closure = ClosureAssembler::assemble(&index, &interfaces, workflows, order);
        info!(entities = closure.len(), "Assembled closure");
        Ok(closure)
    }

    /// Workflows are independent once interfaces are resolved; compile them
    /// on the worker pool when enabled. Results come back in identifier
    /// order either way.
    fn compile_workflows(
        &self,
        index: &ReferenceIndex,
        interfaces: &InterfaceTable,
    ) -> Vec<WorkflowOutcome> {
        let compiler = WorkflowCompiler::new(index, interfaces, self.config.types.union);
        let specs: Vec<&WorkflowSpec> = index.workflows().collect();
        let compile = |spec: &&WorkflowSpec| (spec.id.clone(), compiler.compile(spec));

        #[cfg(feature = "parallel")]
        if self.config.parallel {
            use rayon::prelude::*;
            return specs.par_iter().map(compile).collect();
        }

        specs.iter().map(compile).collect()
    }
}
