//! Parsing for protobuf service definitions
//!
//! This crate recovers what the protobuf compiler's structured output
//! discards: doc comments and `google.api.http` rules on service methods.
//!
//! ## Inputs
//!
//! - **Raw `.proto` text**: service blocks are scanned, tokenized and parsed
//!   by hand (see [`service`]); messages and enums are skipped.
//! - **FileDescriptorSet**: compiled descriptors for every file, loaded by
//!   [`DescriptorSource`] and turned into a type catalog downstream.
//!
//! Each source file is parsed independently, so [`parse_sources`] can fan
//! files out across threads.

pub mod protobuf;
pub mod service;

pub use protobuf::DescriptorSource;
pub use service::{Bindings, Lexer, Scanner, ServiceParser};

use std::fs;
use std::panic;
use std::path::Path;
use std::thread;
use svcdef_common::{Result, Service, SvcdefError};

/// A `.proto` file read fully into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Name used in error messages, usually the path given on the command line
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SvcdefError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;
        Ok(Self::new(path.display().to_string(), text))
    }
}

/// Parse result for one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub name: String,
    /// `None` when the file declares no service
    pub service: Option<Service>,
}

/// Scan, tokenize and parse the service declared in one source file
pub fn parse_source(file: &SourceFile) -> Result<ParsedFile> {
    let service = ServiceParser::from_source(&file.text)
        .and_then(|mut parser| parser.parse_file())
        .map_err(|e| e.in_file(&file.name))?;

    match &service {
        Some(s) => tracing::debug!(file = %file.name, service = %s.name, "parsed source"),
        None => tracing::debug!(file = %file.name, "no service declared"),
    }

    Ok(ParsedFile {
        name: file.name.clone(),
        service,
    })
}

/// Parse many source files, optionally one thread per file.
///
/// Results keep the input order. The first fatal error (in input order) is
/// returned.
pub fn parse_sources(files: &[SourceFile], parallel: bool) -> Result<Vec<ParsedFile>> {
    if !parallel || files.len() < 2 {
        return files.iter().map(parse_source).collect();
    }

    let results: Vec<Result<ParsedFile>> = thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|file| scope.spawn(move || parse_source(file)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    });

    results.into_iter().collect()
}
