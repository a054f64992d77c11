// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Bundle sources
//!
//! Where bundle bytes come from. The compiler itself only ever sees bytes.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::FlowpackError;

/// Trait for bundle byte sources
#[async_trait]
pub trait BundleSource: Send + Sync {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    /// Read the complete bundle
    async fn read(&self) -> Result<Vec<u8>, FlowpackError>;
}

/// A bundle stored on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BundleSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> Result<Vec<u8>, FlowpackError> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FlowpackError::FileNotFound {
                    path: self.path.clone(),
                }
            } else {
                FlowpackError::FileReadError {
                    path: self.path.clone(),
                    error: e.to_string(),
                }
            }
        })
    }
}

/// A bundle already held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[async_trait]
impl BundleSource for MemorySource {
    fn describe(&self) -> String {
        format!("<memory:{}>", self.name)
    }

    async fn read(&self) -> Result<Vec<u8>, FlowpackError> {
        Ok(self.bytes.clone())
    }
}
