//! Type catalog entries: messages, enums and their fields
//!
//! Entries live in the catalog's arenas and refer to each other through
//! copyable handles. A handle denotes exactly one canonical entry, so two
//! fields that resolve to the same message hold equal `MessageId`s and the
//! catalog hands out the same `&Message` for both.

use serde::{Deserialize, Serialize};

/// Handle to a message entry in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub usize);

/// Handle to an enum entry in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnumId(pub usize);

/// Handle to one field of a message entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId {
    pub message: MessageId,
    pub index: usize,
}

/// What a field type name resolved to.
///
/// A single optional `TypeRef` means a type can never point at a message and
/// an enum at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Message(MessageId),
    Enum(EnumId),
}

/// Type of a message field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    /// Scalar name (`int64`, `string`, ...) or fully-qualified type name
    /// without the leading dot
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Box<MapType>>,
    #[serde(default)]
    pub pointer: bool,
    #[serde(default)]
    pub repeated: bool,
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn message(&self) -> Option<MessageId> {
        match self.resolved {
            Some(TypeRef::Message(id)) => Some(id),
            _ => None,
        }
    }

    pub fn enumeration(&self) -> Option<EnumId> {
        match self.resolved {
            Some(TypeRef::Enum(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        self.map.is_some()
    }
}

/// Key and value types of a `map<K, V>` field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapType {
    pub key: FieldType,
    pub value: FieldType,
}

/// A message declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Declared identifier
    pub name: String,
    /// Package and enclosing messages joined with `.`
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<Field>,
}

impl Message {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A message field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Name as declared in the `.proto` file
    pub name: String,
    /// JSON name used on the wire
    pub wire_name: String,
    pub number: i32,
    #[serde(default)]
    pub description: String,
    pub field_type: FieldType,
}

/// An enum declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    pub values: Vec<EnumValue>,
}

impl Enum {
    pub fn value(&self, name: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_accessors_are_exclusive() {
        let mut ft = FieldType::named("pkg.Thing");
        assert_eq!(ft.message(), None);
        assert_eq!(ft.enumeration(), None);

        ft.resolved = Some(TypeRef::Message(MessageId(2)));
        assert_eq!(ft.message(), Some(MessageId(2)));
        assert_eq!(ft.enumeration(), None);

        ft.resolved = Some(TypeRef::Enum(EnumId(0)));
        assert_eq!(ft.message(), None);
        assert_eq!(ft.enumeration(), Some(EnumId(0)));
    }

    #[test]
    fn test_message_field_lookup() {
        let message = Message {
            name: "SumRequest".to_string(),
            full_name: "sum.SumRequest".to_string(),
            description: String::new(),
            fields: vec![Field {
                name: "a".to_string(),
                wire_name: "a".to_string(),
                number: 1,
                description: String::new(),
                field_type: FieldType::named("int64"),
            }],
        };
        assert_eq!(message.field("a").map(|f| f.number), Some(1));
        assert!(message.field("b").is_none());
    }
}
