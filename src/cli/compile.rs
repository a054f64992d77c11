// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Compile command
//!
//! Compiles a bundle and reports either a summary of the closure or every
//! defect found.

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use super::{load_config, OutputFormat};
use crate::archive::FileSource;
use crate::compiler::Compiler;
use crate::errors::FlowpackError;
use crate::model::CompiledClosure;
use crate::utils::{
    create_spinner, hidden_spinner, print_defects, print_header, print_info, print_numbered,
    print_section, print_success,
};

pub async fn run(
    file: PathBuf,
    format: OutputFormat,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let closure = compile_bundle(&file, config.as_deref(), format == OutputFormat::Text).await?;

    if let Some(path) = &output {
        write_closure(&closure, path)?;
    }

    match format {
        OutputFormat::Json => println!("{}", closure.to_json()?),
        OutputFormat::Text => print_summary(&file, &closure, output.as_deref(), verbose)?,
    }

    Ok(())
}

/// Compile a bundle file, printing every defect on failure
pub(crate) async fn compile_bundle(
    file: &Path,
    config: Option<&Path>,
    show_progress: bool,
) -> Result<CompiledClosure> {
    let config = load_config(config)?;
    let source = FileSource::new(file);

    let spinner = if show_progress {
        create_spinner(&format!("Compiling {}...", file.display()))
    } else {
        hidden_spinner()
    };
    let result = Compiler::new(config).compile_source(&source).await;
    spinner.finish_and_clear();

    match result {
        Ok(closure) => Ok(closure),
        Err(err @ FlowpackError::Compilation { .. }) => {
            print_defects(&err);
            Err(miette::miette!(
                "Compilation of {} failed with {} defect(s)",
                file.display(),
                err.errors().len()
            ))
        }
        Err(err) => Err(err.into()),
    }
}

fn write_closure(closure: &CompiledClosure, path: &Path) -> Result<()> {
    let json = closure.to_json()?;
    std::fs::write(path, json).map_err(|e| FlowpackError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(())
}

fn print_summary(
    file: &Path,
    closure: &CompiledClosure,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let (tasks, workflows, launch_plans) = closure.counts();

    print_header(&format!("Compiled {}", file.display()));
    print_success(&format!("{} task(s)", tasks));
    print_success(&format!("{} workflow(s)", workflows));
    print_success(&format!("{} launch plan(s)", launch_plans));
    print_info(&format!("Digest: {}", closure.digest()?.dimmed()));

    if let Some(path) = output {
        print_info(&format!("Closure written to {}", path.display()));
    }

    if verbose {
        print_section("Registration order");
        for (i, id) in closure.order.iter().enumerate() {
            print_numbered(i + 1, &id.to_string());
        }
    }

    Ok(())
}
