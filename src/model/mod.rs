// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Bundle entity model
//!
//! This module defines the data structures carried by a bundle (tasks,
//! workflows, launch plans), their typed interfaces, and the compiled
//! closure produced from them.

mod closure;
mod entity;
mod identifier;
mod interface;
mod types;

pub use closure::{
    CompiledClosure, CompiledEntity, CompiledWorkflow, GraphEdge, END_NODE_ID, START_NODE_ID,
};
pub use entity::*;
pub use identifier::{EntityId, ResourceType};
pub use interface::{Parameter, TypedInterface};
pub use types::{BlobDimensionality, Literal, LiteralType, SchemaColumn, SimpleKind};
