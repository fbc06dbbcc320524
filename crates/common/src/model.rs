//! Service definition tree recovered from `.proto` source text
//!
//! The parser fills in names, descriptions and raw option fields. Verb, path
//! and params of each [`HttpBinding`] stay empty until the resolver
//! contextualizes the tree against the type catalog.

use crate::types::FieldId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Option kinds that name an HTTP verb in an HTTP rule
pub const HTTP_VERBS: [&str; 5] = ["get", "put", "post", "delete", "patch"];

/// A protobuf `service` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub methods: Vec<Method>,
}

impl Service {
    /// Look up a method by its declared name
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Whether a method carried an HTTP annotation in its body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    #[default]
    Declared,
    /// The method body closed without any HTTP option. Valid input: the method
    /// keeps its types but has no bindings.
    Missing,
}

/// An `rpc` declaration inside a service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    /// Leading comment, comment syntax stripped
    pub description: String,
    pub request_type: String,
    pub response_type: String,
    #[serde(default)]
    pub request_streaming: bool,
    #[serde(default)]
    pub response_streaming: bool,
    pub bindings: Vec<HttpBinding>,
    #[serde(default)]
    pub annotation: Annotation,
}

impl Method {
    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// One HTTP rule: the primary `option (google.api.http)` block or one of its
/// `additional_bindings`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBinding {
    pub description: String,
    /// Filled by the resolver
    pub verb: String,
    /// Path template, filled by the resolver
    pub path: String,
    /// Raw `kind: "value"` pairs in declaration order, `custom` excluded
    pub fields: Vec<OptionField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomHttpPattern>,
    /// One entry per request message field, filled by the resolver
    #[serde(default)]
    pub params: Vec<HttpParameter>,
}

impl HttpBinding {
    /// First option field of the given kind
    pub fn field(&self, kind: &str) -> Option<&OptionField> {
        self.fields.iter().find(|f| f.kind == kind)
    }

    /// Value of the explicit `body` option, if any
    pub fn body(&self) -> Option<&str> {
        self.field("body").map(|f| f.value.as_str())
    }

    /// The verb and path this binding declares, before contextualization.
    ///
    /// A `custom` pattern wins over verb fields; otherwise the first field
    /// whose kind is a recognized verb is used.
    pub fn declared_route(&self) -> Option<(&str, &str)> {
        if let Some(custom) = &self.custom {
            return Some((custom.kind.as_str(), custom.path.as_str()));
        }
        self.fields
            .iter()
            .find(|f| HTTP_VERBS.contains(&f.kind.as_str()))
            .map(|f| (f.kind.as_str(), f.value.as_str()))
    }

    pub fn param(&self, name: &str) -> Option<&HttpParameter> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A raw `kind: "value"` pair from an HTTP rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionField {
    pub kind: String,
    pub value: String,
    pub description: String,
}

impl OptionField {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            description: String::new(),
        }
    }
}

/// Verb declared through a `custom { kind: ... path: ... }` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHttpPattern {
    pub kind: String,
    pub path: String,
}

/// Where a request field travels in an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Path,
    Query,
    Body,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path => write!(f, "path"),
            Location::Query => write!(f, "query"),
            Location::Body => write!(f, "body"),
        }
    }
}

/// A request message field placed at a transport location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpParameter {
    /// Declared field name, duplicated from the catalog for consumers that
    /// do not hold it
    pub name: String,
    pub field: FieldId,
    pub location: Location,
}
