// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for fixing compilation defects.

use super::FlowpackError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest a fix for an individual defect, when one is known
    pub fn for_error(error: &FlowpackError) -> Option<Self> {
        match error {
            FlowpackError::Archive { .. } => Some(Self::repackage_bundle()),
            FlowpackError::Decode { entry, .. } => Some(Self {
                action: format!("Re-serialize '{}'", entry),
                steps: vec![
                    "Each entry must be a JSON or YAML record with a 'kind' of task, workflow or launch_plan".into(),
                    "Regenerate the bundle with the packaging tool rather than editing entries by hand".into(),
                ],
            }),
            FlowpackError::UnresolvedReference { missing, .. } => Some(Self {
                action: format!("Add {} to the bundle", missing),
                steps: vec![
                    "Check the project, domain, name and version of the reference".into(),
                    "Include the referenced entity when packaging".into(),
                ],
            }),
            FlowpackError::TypeMismatch {
                expected, actual, ..
            } => Some(Self {
                action: "Fix the binding type".into(),
                steps: vec![
                    format!("The consumer declares {}", expected),
                    format!("The producer supplies {}", actual),
                    "Bind a producer of the expected type, or convert with an intermediate task".into(),
                ],
            }),
            FlowpackError::FixedInputRebound { parameter, .. } => Some(Self {
                action: format!("Remove the binding for '{}'", parameter),
                steps: vec![
                    "The launch plan pins this input; its callers cannot change it".into(),
                    "Use a default input in the launch plan if callers should be able to override it".into(),
                ],
            }),
            FlowpackError::GraphCycle { nodes, .. } => Some(Self::fix_cycle(nodes)),
            FlowpackError::CircularDependency { cycle } => {
                let names: Vec<String> = cycle.iter().map(ToString::to_string).collect();
                Some(Self::fix_cycle(&names))
            }
            _ => None,
        }
    }

    /// Suggest rebuilding a broken bundle
    pub fn repackage_bundle() -> Self {
        Self {
            action: "Rebuild the bundle".into(),
            steps: vec![
                "The file is not a readable gzip-compressed tar archive".into(),
                "Re-run the packaging step and check the file was not truncated in transit".into(),
            ],
        }
    }

    /// Suggest fixing a dependency cycle
    pub fn fix_cycle(members: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", members.join(" → ")),
                "Break the cycle by removing one of the bindings or references".into(),
            ],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_suggestion_lists_members() {
        let s = RecoverySuggestion::fix_cycle(&["a".into(), "b".into(), "a".into()]);
        assert!(s.to_string().contains("a → b → a"));
    }

    #[test]
    fn test_no_suggestion_for_io() {
        let err = FlowpackError::Io {
            message: "boom".into(),
        };
        assert!(RecoverySuggestion::for_error(&err).is_none());
    }
}
