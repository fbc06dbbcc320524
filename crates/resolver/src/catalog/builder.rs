//! Phase one: stub entries from descriptors

use super::{Catalog, MethodSignature, ServiceSignature};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto,
};
use std::collections::HashMap;
use svcdef_common::{Enum, EnumValue, Field, FieldType, MapType, Message};
use svcdef_parser::service::clean_description;
use svcdef_parser::DescriptorSource;

// Field numbers of the descriptor messages, as used in SourceCodeInfo paths
const FILE_MESSAGE: i32 = 4;
const FILE_ENUM: i32 = 5;
const FILE_SERVICE: i32 = 6;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED: i32 = 3;
const MESSAGE_ENUM: i32 = 4;
const ENUM_VALUE: i32 = 2;
const SERVICE_METHOD: i32 = 2;

/// Collects unresolved messages, enums and service signatures
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    pub(super) messages: Vec<Message>,
    pub(super) enums: Vec<Enum>,
    pub(super) services: Vec<ServiceSignature>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, source: &DescriptorSource) {
        for file in source.files() {
            self.add_file(file);
        }
    }

    /// Record every declaration of one file, nested ones included
    pub fn add_file(&mut self, file: &FileDescriptorProto) {
        let comments = Comments::from_file(file);
        let package = file.package();

        let mut entries = HashMap::new();
        for message in &file.message_type {
            collect_map_entries(package, message, &mut entries);
        }
        let scope = FileScope {
            comments: &comments,
            entries: &entries,
        };

        for (i, message) in file.message_type.iter().enumerate() {
            self.add_message(&scope, package, message, vec![FILE_MESSAGE, i as i32]);
        }
        for (i, enumeration) in file.enum_type.iter().enumerate() {
            self.add_enum(&scope, package, enumeration, vec![FILE_ENUM, i as i32]);
        }
        for (i, service) in file.service.iter().enumerate() {
            self.add_service(&scope, package, service, vec![FILE_SERVICE, i as i32]);
        }

        tracing::debug!(
            file = file.name(),
            messages = self.messages.len(),
            enums = self.enums.len(),
            "collected declarations"
        );
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    /// Link every type name to its entry and freeze the catalog
    pub fn resolve(self) -> Catalog {
        super::resolve::resolve_types(self)
    }

    fn add_message(
        &mut self,
        scope: &FileScope<'_>,
        parent: &str,
        message: &DescriptorProto,
        path: Vec<i32>,
    ) {
        if is_map_entry(message) {
            return;
        }
        let full_name = qualify(parent, message.name());

        let fields = message
            .field
            .iter()
            .enumerate()
            .map(|(i, field)| Field {
                name: field.name().to_string(),
                wire_name: field
                    .json_name
                    .clone()
                    .unwrap_or_else(|| lower_camel(field.name())),
                number: field.number(),
                description: scope.comments.at(&child(&path, MESSAGE_FIELD, i)),
                field_type: scope.field_type(field),
            })
            .collect();

        self.messages.push(Message {
            name: message.name().to_string(),
            full_name: full_name.clone(),
            description: scope.comments.at(&path),
            fields,
        });

        for (i, nested) in message.nested_type.iter().enumerate() {
            self.add_message(scope, &full_name, nested, child(&path, MESSAGE_NESTED, i));
        }
        for (i, enumeration) in message.enum_type.iter().enumerate() {
            self.add_enum(scope, &full_name, enumeration, child(&path, MESSAGE_ENUM, i));
        }
    }

    fn add_enum(
        &mut self,
        scope: &FileScope<'_>,
        parent: &str,
        enumeration: &EnumDescriptorProto,
        path: Vec<i32>,
    ) {
        let values = enumeration
            .value
            .iter()
            .enumerate()
            .map(|(i, value)| EnumValue {
                name: value.name().to_string(),
                number: value.number(),
                description: scope.comments.at(&child(&path, ENUM_VALUE, i)),
            })
            .collect();

        self.enums.push(Enum {
            name: enumeration.name().to_string(),
            full_name: qualify(parent, enumeration.name()),
            description: scope.comments.at(&path),
            values,
        });
    }

    fn add_service(
        &mut self,
        scope: &FileScope<'_>,
        package: &str,
        service: &ServiceDescriptorProto,
        path: Vec<i32>,
    ) {
        let methods = service
            .method
            .iter()
            .enumerate()
            .map(|(i, method)| MethodSignature {
                name: method.name().to_string(),
                description: scope.comments.at(&child(&path, SERVICE_METHOD, i)),
                request: FieldType::named(strip_dot(method.input_type())),
                response: FieldType::named(strip_dot(method.output_type())),
                request_streaming: method.client_streaming(),
                response_streaming: method.server_streaming(),
            })
            .collect();

        self.services.push(ServiceSignature {
            name: service.name().to_string(),
            full_name: qualify(package, service.name()),
            methods,
        });
    }
}

/// Per-file lookup tables shared by the recursive walk
struct FileScope<'a> {
    comments: &'a Comments,
    entries: &'a HashMap<String, MapType>,
}

impl FileScope<'_> {
    fn field_type(&self, field: &FieldDescriptorProto) -> FieldType {
        let mut field_type = stub_type(field);
        if field_type.repeated {
            if let Some(entry) = self.entries.get(&field_type.name) {
                field_type = FieldType {
                    name: format!("map<{}, {}>", entry.key.name, entry.value.name),
                    map: Some(Box::new(entry.clone())),
                    ..Default::default()
                };
            }
        }
        field_type
    }
}

/// Leading comments of one file, keyed by SourceCodeInfo path
#[derive(Debug, Default)]
struct Comments {
    leading: HashMap<Vec<i32>, String>,
}

impl Comments {
    fn from_file(file: &FileDescriptorProto) -> Self {
        let leading = file
            .source_code_info
            .iter()
            .flat_map(|info| &info.location)
            .filter_map(|location| {
                let text = location.leading_comments.as_deref()?;
                Some((location.path.clone(), clean_description(text)))
            })
            .collect();
        Self { leading }
    }

    fn at(&self, path: &[i32]) -> String {
        self.leading.get(path).cloned().unwrap_or_default()
    }
}

fn stub_type(field: &FieldDescriptorProto) -> FieldType {
    let kind = field.r#type.and_then(|t| Type::try_from(t).ok());
    let name = match field.type_name.as_deref() {
        Some(type_name) if !type_name.is_empty() => strip_dot(type_name).to_string(),
        _ => kind.map(scalar_name).unwrap_or_default().to_string(),
    };
    let repeated = field.label() == Label::Repeated;
    let is_message = matches!(kind, Some(Type::Message) | Some(Type::Group));

    FieldType {
        name,
        pointer: (is_message && !repeated) || field.proto3_optional(),
        repeated,
        ..Default::default()
    }
}

// Synthetic `FooEntry` messages keyed by full name, with their key/value types
fn collect_map_entries(
    parent: &str,
    message: &DescriptorProto,
    entries: &mut HashMap<String, MapType>,
) {
    let full_name = qualify(parent, message.name());
    if is_map_entry(message) {
        let key = message.field.iter().find(|f| f.number() == 1);
        let value = message.field.iter().find(|f| f.number() == 2);
        if let (Some(key), Some(value)) = (key, value) {
            entries.insert(
                full_name.clone(),
                MapType {
                    key: stub_type(key),
                    value: stub_type(value),
                },
            );
        }
    }
    for nested in &message.nested_type {
        collect_map_entries(&full_name, nested, entries);
    }
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .is_some_and(|options| options.map_entry())
}

fn scalar_name(kind: Type) -> &'static str {
    match kind {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Group => "group",
        Type::Message => "message",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Enum => "enum",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
    }
}

pub(super) fn is_scalar(name: &str) -> bool {
    matches!(
        name,
        "double"
            | "float"
            | "int64"
            | "uint64"
            | "int32"
            | "fixed64"
            | "fixed32"
            | "bool"
            | "string"
            | "bytes"
            | "uint32"
            | "sfixed32"
            | "sfixed64"
            | "sint32"
            | "sint64"
    )
}

fn qualify(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn strip_dot(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

fn child(path: &[i32], kind: i32, index: usize) -> Vec<i32> {
    let mut path = path.to_vec();
    path.push(kind);
    path.push(index as i32);
    path
}

/// protoc's default JSON name: drop underscores, capitalize what follows
fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
