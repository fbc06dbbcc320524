//! Common types and utilities for svcdef
//!
//! This crate contains the shared data model (the parsed service tree and the
//! resolved type catalog entries), error types, and project configuration
//! used across the parser, resolver, and CLI components.

mod config;
mod model;
mod types;

pub use config::{OutputFormat, ProjectConfig};
pub use model::{
    Annotation, CustomHttpPattern, HttpBinding, HttpParameter, Location, Method, OptionField,
    Service, HTTP_VERBS,
};
pub use types::{
    Enum, EnumId, EnumValue, Field, FieldId, FieldType, MapType, Message, MessageId, TypeRef,
};

use thiserror::Error;

/// Errors that can occur while recovering service metadata
#[derive(Error, Debug)]
pub enum SvcdefError {
    #[error("Parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ParseError,
    },

    #[error("Descriptor error: {0}")]
    Descriptor(String),

    #[error("Resolve error: {0}")]
    Resolve(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for svcdef operations
pub type Result<T> = std::result::Result<T, SvcdefError>;

/// A fatal syntax error in a service definition.
///
/// `found` is the literal text of the offending token. `context` lists the
/// grammar productions the error unwound through, innermost first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: expected {expected}, found `{found}`{}", render_context(.context))]
pub struct ParseError {
    pub line: usize,
    pub expected: String,
    pub found: String,
    pub context: Vec<&'static str>,
}

impl ParseError {
    pub fn new(line: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            line,
            expected: expected.into(),
            found: found.into(),
            context: Vec::new(),
        }
    }

    /// Record that the error unwound through `production`
    pub fn within(mut self, production: &'static str) -> Self {
        self.context.push(production);
        self
    }

    /// Attach the input file name, producing a crate-level error
    pub fn in_file(self, file: impl Into<String>) -> SvcdefError {
        SvcdefError::Parse {
            file: file.into(),
            source: self,
        }
    }
}

fn render_context(context: &[&'static str]) -> String {
    if context.is_empty() {
        return String::new();
    }
    let outer_first: Vec<&str> = context.iter().rev().copied().collect();
    format!(" (in {})", outer_first.join(" > "))
}
