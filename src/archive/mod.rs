// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Bundle archive loading
//!
//! Unpacks a gzip-compressed tar bundle into named in-memory blobs. Nothing
//! is written to disk; entry paths are only validated, never extracted.

mod source;

pub use source::{BundleSource, FileSource, MemorySource};

use std::collections::HashSet;
use std::io::Read;
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::config::LimitsConfig;
use crate::errors::FlowpackError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One regular file of the bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized relative path inside the archive
    pub name: String,
    pub data: Vec<u8>,
}

/// Loader for bundle archives
pub struct ArchiveLoader {
    limits: LimitsConfig,
    ignore: Vec<glob::Pattern>,
}

impl ArchiveLoader {
    /// Create a loader with the given limits and ignore patterns
    pub fn new(limits: LimitsConfig, ignore: Vec<glob::Pattern>) -> Self {
        Self { limits, ignore }
    }

    /// Unpack a bundle into its regular-file entries, in archive order
    pub fn load(&self, bytes: &[u8]) -> Result<Vec<ArchiveEntry>, FlowpackError> {
        if bytes.len() < GZIP_MAGIC.len() || bytes[..2] != GZIP_MAGIC {
            return Err(FlowpackError::archive("invalid gzip header"));
        }

        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        let entries = archive
            .entries()
            .map_err(|e| FlowpackError::archive(format!("cannot read tar stream: {}", e)))?;

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut total_bytes: u64 = 0;

        for entry in entries {
            let mut entry = entry
                .map_err(|e| FlowpackError::archive(format!("corrupt archive entry: {}", e)))?;

            let raw_path = entry
                .path()
                .map_err(|e| FlowpackError::archive(format!("unreadable entry path: {}", e)))?
                .into_owned();
            let name = normalize_entry_path(&raw_path)?;

            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                continue;
            }
            if !entry_type.is_file() {
                debug!(entry = %name, "Skipping non-regular archive entry");
                continue;
            }

            if self.is_ignored(&name) {
                debug!(entry = %name, "Skipping ignored archive entry");
                continue;
            }

            // Entry names identify records, so each may appear once
            if !seen.insert(name.clone()) {
                return Err(FlowpackError::archive(format!(
                    "entry '{}' appears more than once",
                    name
                )));
            }

            if out.len() >= self.limits.max_entries {
                return Err(FlowpackError::archive(format!(
                    "bundle has more than {} entries",
                    self.limits.max_entries
                )));
            }

            let declared = entry.header().size().unwrap_or(0);
            if declared > self.limits.max_entry_bytes {
                return Err(FlowpackError::archive(format!(
                    "entry '{}' is {} bytes, above the {} byte limit",
                    name, declared, self.limits.max_entry_bytes
                )));
            }

            let mut data = Vec::with_capacity(declared as usize);
            (&mut entry)
                .take(self.limits.max_entry_bytes + 1)
                .read_to_end(&mut data)
                .map_err(|e| {
                    FlowpackError::archive(format!("truncated entry '{}': {}", name, e))
                })?;

            if data.len() as u64 != declared {
                return Err(FlowpackError::archive(format!(
                    "truncated entry '{}': expected {} bytes, read {}",
                    name,
                    declared,
                    data.len()
                )));
            }

            total_bytes += data.len() as u64;
            if total_bytes > self.limits.max_total_bytes {
                return Err(FlowpackError::archive(format!(
                    "bundle expands beyond the {} byte limit",
                    self.limits.max_total_bytes
                )));
            }

            debug!(entry = %name, bytes = data.len(), "Loaded archive entry");
            out.push(ArchiveEntry { name, data });
        }

        Ok(out)
    }

    fn is_ignored(&self, name: &str) -> bool {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(name);

        self.ignore
            .iter()
            .any(|p| p.matches(name) || p.matches(file_name))
    }
}

impl Default for ArchiveLoader {
    fn default() -> Self {
        Self::new(LimitsConfig::default(), Vec::new())
    }
}

/// Reject absolute paths and parent traversal; drop `.` components
fn normalize_entry_path(path: &Path) -> Result<String, FlowpackError> {
    let mut parts = Vec::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FlowpackError::archive(format!(
                    "entry path '{}' escapes the bundle root",
                    path.display()
                )));
            }
        }
    }

    if parts.is_empty() {
        return Err(FlowpackError::archive("archive entry has an empty path"));
    }

    Ok(parts.join("/"))
}
