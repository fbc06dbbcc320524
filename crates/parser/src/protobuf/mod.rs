//! Protobuf descriptor set loading
//!
//! Reads the `FileDescriptorSet` the protobuf compiler writes with
//! `protoc --include_imports --include_source_info -o out.pb`.
//!
//! ## Example
//! ```rust,ignore
//! use svcdef_parser::DescriptorSource;
//!
//! let source = DescriptorSource::from_file("api.pb")?;
//! source.validate()?;
//! for file in source.files() {
//!     println!("{}", file.name());
//! }
//! ```

mod parser;

pub use parser::DescriptorSource;
