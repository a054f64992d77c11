// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for flowpack.

pub mod compile;
pub mod graph;

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::config::CompilerConfig;

/// Workflow bundle compiler
///
/// Compile packaged tasks, workflows and launch plans into a validated closure.
#[derive(Parser, Debug)]
#[clap(
    name = "flowpack",
    version,
    about = "Compile workflow bundles into a validated, fully resolved closure",
    long_about = None,
    after_help = "Examples:\n\
        flowpack compile --file bundle.tgz                  Validate a bundle\n\
        flowpack compile --file bundle.tgz -o closure.json  Also write the closure\n\
        flowpack graph --file bundle.tgz --workflow main    Show a workflow graph\n\n\
        See 'flowpack <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Compiler configuration file (default: .flowpack.yaml or flowpack.toml)
    #[clap(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a bundle and report every defect found
    Compile {
        /// Bundle archive (.tgz)
        #[clap(short, long, value_parser = parse_bundle_path)]
        file: PathBuf,

        /// Output format
        #[clap(long, default_value = "text")]
        format: OutputFormat,

        /// Write the compiled closure as JSON to this path
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a bundle and show one workflow as a graph
    Graph {
        /// Bundle archive (.tgz)
        #[clap(short, long, value_parser = parse_bundle_path)]
        file: PathBuf,

        /// Workflow name, or full identifier
        #[clap(short, long)]
        workflow: String,

        /// Output format
        #[clap(long, default_value = "text")]
        format: GraphFormat,
    },
}

/// Reject an empty bundle path before anything runs
fn parse_bundle_path(s: &str) -> std::result::Result<PathBuf, String> {
    if s.trim().is_empty() {
        return Err("bundle path must not be empty".into());
    }
    Ok(PathBuf::from(s))
}

/// Resolve compiler configuration against the current directory
pub fn load_config(explicit: Option<&Path>) -> Result<CompilerConfig> {
    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    Ok(CompilerConfig::resolve(explicit, &cwd)?)
}

/// Output format for the compile command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}
