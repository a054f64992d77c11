// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Terminal color utilities
//!
//! Provides consistent color schemes across the CLI.

use colored::Colorize;

use crate::errors::{FlowpackError, RecoverySuggestion};

/// Check if colors should be disabled
pub fn should_use_colors() -> bool {
    // Respect NO_COLOR environment variable
    std::env::var_os("NO_COLOR").is_none()
}

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.chars().count().max(40)));
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a numbered item
pub fn print_numbered(num: usize, content: &str) {
    println!("  {}. {}", num, content);
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an info item
pub fn print_info(msg: &str) {
    println!("  {} {}", "→".blue(), msg);
}

/// Print every defect in an error to stderr, each with its fix when one is known
pub fn print_defects(error: &FlowpackError) {
    let defects = error.errors();
    eprintln!(
        "{} {} defect(s) found",
        "✗".red(),
        defects.len().to_string().bold()
    );

    for defect in defects {
        eprintln!();
        eprintln!("  {} {}", "✗".red(), defect);
        if let Some(suggestion) = RecoverySuggestion::for_error(defect) {
            for line in suggestion.to_string().lines() {
                eprintln!("    {}", line.dimmed());
            }
        }
    }
}
