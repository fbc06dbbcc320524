//! Project configuration loading from YAML files
//!
//! A project file names the compiled descriptor set and the `.proto` sources
//! to scan, so repeated runs do not need long command lines.

use crate::{Result, SvcdefError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Highest project file format version this build understands
const SUPPORTED_VERSION: u32 = 1;

/// How the CLI reports the resolved tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

/// Root structure for `svcdef.yaml` project files
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Project file format version
    pub version: u32,
    /// Binary `FileDescriptorSet` produced by `protoc -o`
    #[serde(default)]
    pub descriptor: Option<PathBuf>,
    /// `.proto` files whose service blocks should be scanned
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Parse source files on separate threads
    #[serde(default)]
    pub parallel: bool,
    /// Check descriptor cross-references before building the catalog
    #[serde(default)]
    pub validate: bool,
    #[serde(default)]
    pub output: OutputFormat,
}

impl ProjectConfig {
    /// Load a project file; relative paths are resolved against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SvcdefError::Config(format!("Failed to read project file {:?}: {}", path, e))
        })?;

        let mut config = Self::from_yaml(&content).map_err(|e| match e {
            SvcdefError::Config(msg) => SvcdefError::Config(format!("{:?}: {}", path, msg)),
            other => other,
        })?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Parse a project file from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| SvcdefError::Config(format!("Failed to parse project YAML: {}", e)))?;

        if config.version == 0 || config.version > SUPPORTED_VERSION {
            return Err(SvcdefError::Config(format!(
                "Unsupported project file version {} (expected {})",
                config.version, SUPPORTED_VERSION
            )));
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        if let Some(descriptor) = self.descriptor.take() {
            self.descriptor = Some(join_relative(base, descriptor));
        }
        self.sources = self
            .sources
            .drain(..)
            .map(|source| join_relative(base, source))
            .collect();
    }
}

fn join_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
