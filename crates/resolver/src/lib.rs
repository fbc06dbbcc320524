//! Type resolution and HTTP contextualization for svcdef
//!
//! Turns a compiled `FileDescriptorSet` into a [`Catalog`] of messages and
//! enums, then walks each parsed [`Service`](svcdef_common::Service) and
//! places every request field of every HTTP binding in the path, query or
//! body. [`Workspace`] runs the whole pipeline for one compile.

pub mod catalog;
pub mod http;
pub mod workspace;

pub use catalog::{Catalog, CatalogBuilder, MethodSignature, ServiceSignature};
pub use http::{contextualize, locate, path_params};
pub use workspace::{ServiceFile, Workspace};
