// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Entity identifiers
//!
//! Every task, workflow and launch plan in a bundle is keyed by an
//! [`EntityId`]. Identifiers are totally ordered so that every collection
//! keyed by them iterates in the same order regardless of archive layout.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The kind of entity an identifier points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Task,
    Workflow,
    LaunchPlan,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Workflow => write!(f, "workflow"),
            Self::LaunchPlan => write!(f, "launch_plan"),
        }
    }
}

/// Globally unique key of an entity within a bundle
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub resource_type: ResourceType,
    pub project: String,
    pub domain: String,
    pub name: String,
    pub version: String,
}

fn component_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.:\-]+$").expect("static pattern is valid"))
}

impl EntityId {
    /// Create a new identifier
    pub fn new(
        resource_type: ResourceType,
        project: impl Into<String>,
        domain: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            project: project.into(),
            domain: domain.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Same project/domain/name/version, different resource type
    pub fn with_resource_type(&self, resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            ..self.clone()
        }
    }

    /// Check that every component is present and well formed.
    ///
    /// Returns a description of the first offending component.
    pub fn validate(&self) -> Result<(), String> {
        let components = [
            ("project", &self.project),
            ("domain", &self.domain),
            ("name", &self.name),
            ("version", &self.version),
        ];

        for (label, value) in components {
            if value.is_empty() {
                return Err(format!("identifier {} is empty", label));
            }
            if !component_pattern().is_match(value) {
                return Err(format!(
                    "identifier {} '{}' contains characters outside [A-Za-z0-9_.:-]",
                    label, value
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}/{}@{}",
            self.resource_type, self.project, self.domain, self.name, self.version
        )
    }
}
