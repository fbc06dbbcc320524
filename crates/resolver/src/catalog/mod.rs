//! Type catalog built from compiled descriptors
//!
//! Construction runs in two phases. [`CatalogBuilder`] walks every file of a
//! `FileDescriptorSet` and records stub entries whose field types carry only
//! names. [`CatalogBuilder::resolve`] then links every type name to its
//! canonical entry and hands back an immutable [`Catalog`].

mod builder;
mod resolve;

pub use builder::CatalogBuilder;

use serde::Serialize;
use std::collections::HashMap;
use svcdef_common::{Enum, EnumId, Field, FieldId, FieldType, Message, MessageId, TypeRef};
use svcdef_parser::DescriptorSource;

/// Signature of a service as compiled, used to find canonical request types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceSignature {
    pub name: String,
    pub full_name: String,
    pub methods: Vec<MethodSignature>,
}

impl ServiceSignature {
    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub description: String,
    pub request: FieldType,
    pub response: FieldType,
    pub request_streaming: bool,
    pub response_streaming: bool,
}

/// Resolved messages, enums and service signatures of one compile
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    messages: Vec<Message>,
    enums: Vec<Enum>,
    services: Vec<ServiceSignature>,
    #[serde(skip)]
    index: HashMap<String, TypeRef>,
}

impl Catalog {
    /// Build and resolve the catalog for every file in `source`
    pub fn build(source: &DescriptorSource) -> Self {
        let mut builder = CatalogBuilder::new();
        builder.add_source(source);
        builder.resolve()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn services(&self) -> &[ServiceSignature] {
        &self.services
    }

    /// Entry behind a handle handed out by this catalog.
    ///
    /// Panics on a handle from another catalog.
    pub fn message(&self, id: MessageId) -> &Message {
        &self.messages[id.0]
    }

    pub fn enumeration(&self, id: EnumId) -> &Enum {
        &self.enums[id.0]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.message(id.message).fields[id.index]
    }

    /// Find a type by name.
    ///
    /// Accepts a fully-qualified name with or without the leading dot. A name
    /// that is not fully qualified falls back to the first entry whose full
    /// name ends with it, so a bare declared identifier also works.
    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        let name = name.trim_start_matches('.');
        if let Some(found) = self.index.get(name) {
            return Some(*found);
        }

        let suffix = format!(".{}", name);
        let message = self
            .messages
            .iter()
            .position(|m| m.full_name.ends_with(&suffix))
            .map(|i| TypeRef::Message(MessageId(i)));
        message.or_else(|| {
            self.enums
                .iter()
                .position(|e| e.full_name.ends_with(&suffix))
                .map(|i| TypeRef::Enum(EnumId(i)))
        })
    }

    pub fn message_id(&self, name: &str) -> Option<MessageId> {
        match self.lookup(name)? {
            TypeRef::Message(id) => Some(id),
            TypeRef::Enum(_) => None,
        }
    }

    pub fn find_message(&self, name: &str) -> Option<&Message> {
        self.message_id(name).map(|id| self.message(id))
    }

    pub fn find_enum(&self, name: &str) -> Option<&Enum> {
        match self.lookup(name)? {
            TypeRef::Enum(id) => Some(self.enumeration(id)),
            TypeRef::Message(_) => None,
        }
    }

    /// Compiled signature of a service, by declared or fully-qualified name
    pub fn service(&self, name: &str) -> Option<&ServiceSignature> {
        let name = name.trim_start_matches('.');
        self.services
            .iter()
            .find(|s| s.full_name == name)
            .or_else(|| self.services.iter().find(|s| s.name == name))
    }

    /// Fields that name a message or enum missing from the catalog, usually
    /// because the descriptor set was compiled without its imports
    pub fn dangling_fields(&self) -> Vec<FieldId> {
        self.messages
            .iter()
            .enumerate()
            .flat_map(|(m, message)| {
                message
                    .fields
                    .iter()
                    .enumerate()
                    .filter(|(_, field)| is_dangling(&field.field_type))
                    .map(move |(index, _)| FieldId {
                        message: MessageId(m),
                        index,
                    })
            })
            .collect()
    }
}

fn is_dangling(field_type: &FieldType) -> bool {
    match field_type.map.as_deref() {
        Some(map) => is_dangling(&map.value),
        None => field_type.resolved.is_none() && !builder::is_scalar(&field_type.name),
    }
}
