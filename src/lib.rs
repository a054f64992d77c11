// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! # flowpack - Workflow Bundle Compiler
//!
//! `flowpack` turns a packaged bundle of tasks, workflows and launch plans
//! into a validated, fully resolved closure ready for registration.
//!
//! ## Features
//!
//! - **Whole-bundle validation** - Every defect is reported, not just the first
//! - **Typed bindings** - Producer and consumer types are checked on every edge
//! - **Launch plan narrowing** - Fixed inputs disappear from the callable interface
//! - **Deterministic output** - The same bundle always yields the same closure
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate a bundle
//! flowpack compile --file bundle.tgz
//!
//! # Write the closure for registration
//! flowpack compile --file bundle.tgz --output closure.json
//!
//! # Inspect a workflow
//! flowpack graph --file bundle.tgz --workflow main --format mermaid
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use flowpack::Compiler;
//!
//! # fn main() -> flowpack::FlowpackResult<()> {
//! let bytes = std::fs::read("bundle.tgz").map_err(|e| flowpack::FlowpackError::Io {
//!     message: e.to_string(),
//! })?;
//! let closure = Compiler::default().compile_bytes(&bytes)?;
//! println!("{} entities", closure.len());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod model;
pub mod utils;

// Re-export commonly used types
pub use compiler::Compiler;
pub use config::CompilerConfig;
pub use errors::{FlowpackError, FlowpackResult};
pub use model::CompiledClosure;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
