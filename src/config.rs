// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Compiler configuration
//!
//! Loaded from `.flowpack.yaml` or `flowpack.toml`; every field has a
//! default so an absent file is the same as an empty one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::FlowpackError;

/// File names probed, in order, when no explicit config is given
pub const CONFIG_FILE_NAMES: &[&str] = &[".flowpack.yaml", ".flowpack.yml", "flowpack.toml"];

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Archive resource limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Glob patterns of archive entries to skip before decoding
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Compile workflows on a worker pool
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Type compatibility policy
    #[serde(default)]
    pub types: TypePolicy,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig::default(),
            ignore: Vec::new(),
            parallel: true,
            types: TypePolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Archive limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,

    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_entry_bytes: default_max_entry_bytes(),
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

fn default_max_entries() -> usize {
    10_000
}

fn default_max_entry_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_max_total_bytes() -> u64 {
    256 * 1024 * 1024
}

/// Type compatibility policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePolicy {
    #[serde(default)]
    pub union: UnionVariance,
}

/// How a union-typed producer is matched against a consumer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionVariance {
    /// Compatible if at least one member matches
    #[default]
    AnyMember,
    /// Compatible only if every member matches
    AllMembers,
}

impl CompilerConfig {
    /// Load from a file; `.toml` files are parsed as TOML, anything else as YAML
    pub fn load(path: &Path) -> Result<Self, FlowpackError> {
        let content = std::fs::read_to_string(path).map_err(|e| FlowpackError::InvalidConfig {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let config: Self = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            toml::from_str(&content).map_err(|e| FlowpackError::InvalidConfig {
                reason: format!("{}: {}", path.display(), e),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| FlowpackError::InvalidConfig {
                reason: format!("{}: {}", path.display(), e),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Find a config file in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Resolve the effective config: explicit path, then a discovered file,
    /// then defaults
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self, FlowpackError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(FlowpackError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            return Self::load(path);
        }

        match Self::discover(dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using discovered config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Compiled ignore patterns
    pub fn ignore_patterns(&self) -> Result<Vec<glob::Pattern>, FlowpackError> {
        self.ignore
            .iter()
            .map(|p| glob::Pattern::new(p).map_err(Into::into))
            .collect()
    }

    /// Check limits and patterns
    pub fn validate(&self) -> Result<(), FlowpackError> {
        if self.limits.max_entries == 0 {
            return Err(FlowpackError::InvalidConfig {
                reason: "limits.max_entries must be greater than zero".into(),
            });
        }
        if self.limits.max_entry_bytes > self.limits.max_total_bytes {
            return Err(FlowpackError::InvalidConfig {
                reason: "limits.max_entry_bytes cannot exceed limits.max_total_bytes".into(),
            });
        }
        self.ignore_patterns()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_without_file() {
        let temp = tempfile::tempdir().unwrap();
        let config = CompilerConfig::resolve(None, temp.path()).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert!(config.parallel);
        assert_eq!(config.types.union, UnionVariance::AnyMember);
    }

    #[test]
    fn test_load_yaml() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join(".flowpack.yaml"),
            "ignore:\n  - \"README*\"\nparallel: false\ntypes:\n  union: all_members\nlimits:\n  max_entries: 5\n",
        )
        .unwrap();

        let config = CompilerConfig::resolve(None, temp.path()).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.types.union, UnionVariance::AllMembers);
        assert_eq!(config.limits.max_entries, 5);
        assert_eq!(config.limits.max_entry_bytes, default_max_entry_bytes());
        assert!(config.ignore_patterns().unwrap()[0].matches("README.md"));
    }

    #[test]
    fn test_load_toml() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("flowpack.toml");
        std::fs::write(
            &path,
            "parallel = false\n[limits]\nmax_entry_bytes = 4096\nmax_total_bytes = 1048576\n",
        )
        .unwrap();

        let config = CompilerConfig::load(&path).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.limits.max_total_bytes, 1_048_576);
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.yaml");
        std::fs::write(&path, "ignore:\n  - \"[\"\n").unwrap();

        let err = CompilerConfig::load(&path).unwrap_err();
        assert!(matches!(err, FlowpackError::InvalidConfig { .. }));
    }

    #[test]
    fn test_missing_explicit_config() {
        let temp = tempfile::tempdir().unwrap();
        let err = CompilerConfig::resolve(Some(&temp.path().join("nope.yaml")), temp.path())
            .unwrap_err();
        assert!(matches!(err, FlowpackError::FileNotFound { .. }));
    }
}
