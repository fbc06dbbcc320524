//! Protobuf FileDescriptorSet loader

use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::fs;
use std::path::Path;
use svcdef_common::{Result, SvcdefError};

/// Compiled descriptors for every file of one compile
///
/// Holds the raw `FileDescriptorSet` so the catalog builder can walk
/// declarations in source order and read their source-info comments.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSource {
    set: FileDescriptorSet,
}

impl DescriptorSource {
    /// Load FileDescriptorSet from binary file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).map_err(|e| {
            SvcdefError::Descriptor(format!(
                "Failed to read FileDescriptorSet file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_bytes(&bytes)
    }

    /// Decode FileDescriptorSet from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let set = FileDescriptorSet::decode(bytes).map_err(|e| {
            SvcdefError::Descriptor(format!("Failed to decode FileDescriptorSet: {}", e))
        })?;

        tracing::debug!(files = set.file.len(), "decoded descriptor set");
        Ok(Self { set })
    }

    pub fn from_set(set: FileDescriptorSet) -> Self {
        Self { set }
    }

    /// Check that every cross-file type reference in the set resolves.
    ///
    /// The set must be self-contained (compiled with `--include_imports`).
    pub fn validate(&self) -> Result<DescriptorPool> {
        DescriptorPool::from_file_descriptor_set(self.set.clone()).map_err(|e| {
            SvcdefError::Descriptor(format!("Invalid FileDescriptorSet: {}", e))
        })
    }

    pub fn files(&self) -> &[FileDescriptorProto] {
        &self.set.file
    }

    /// Descriptor of the file compiled from `name` (as passed to protoc)
    pub fn file(&self, name: &str) -> Option<&FileDescriptorProto> {
        self.set.file.iter().find(|f| f.name() == name)
    }

    pub fn set(&self) -> &FileDescriptorSet {
        &self.set
    }
}
