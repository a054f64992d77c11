// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Utility modules
//!
//! Terminal output helpers for the flowpack CLI.

pub mod colors;
pub mod spinner;

pub use colors::*;
pub use spinner::*;
