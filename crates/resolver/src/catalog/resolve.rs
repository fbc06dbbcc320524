//! Phase two: link type names to catalog entries

use super::{Catalog, CatalogBuilder};
use std::collections::HashMap;
use svcdef_common::{EnumId, FieldType, MessageId, TypeRef};

/// Resolve every field and method type of a builder's entries.
///
/// Each type is visited once. A map field resolves its key and value; the
/// map itself stays unresolved. Names with no entry (scalars, or types from
/// files missing from the set) are left as they are.
pub(super) fn resolve_types(builder: CatalogBuilder) -> Catalog {
    let CatalogBuilder {
        mut messages,
        enums,
        mut services,
    } = builder;

    let mut index = HashMap::with_capacity(messages.len() + enums.len());
    for (i, message) in messages.iter().enumerate() {
        index
            .entry(message.full_name.clone())
            .or_insert(TypeRef::Message(MessageId(i)));
    }
    for (i, enumeration) in enums.iter().enumerate() {
        index
            .entry(enumeration.full_name.clone())
            .or_insert(TypeRef::Enum(EnumId(i)));
    }

    let mut linked = 0usize;
    for message in &mut messages {
        for field in &mut message.fields {
            linked += link(&mut field.field_type, &index);
        }
    }
    for service in &mut services {
        for method in &mut service.methods {
            linked += link(&mut method.request, &index);
            linked += link(&mut method.response, &index);
        }
    }

    tracing::debug!(
        messages = messages.len(),
        enums = enums.len(),
        linked,
        "resolved catalog"
    );

    Catalog {
        messages,
        enums,
        services,
        index,
    }
}

fn link(field_type: &mut FieldType, index: &HashMap<String, TypeRef>) -> usize {
    match field_type.map.as_deref_mut() {
        Some(map) => link_name(&mut map.key, index) + link_name(&mut map.value, index),
        None => link_name(field_type, index),
    }
}

fn link_name(field_type: &mut FieldType, index: &HashMap<String, TypeRef>) -> usize {
    // one pointer level only; `**T` names no type in the catalog
    let name = field_type.name.strip_prefix('*').unwrap_or(&field_type.name);
    let name = name.strip_prefix('.').unwrap_or(name);
    field_type.resolved = index.get(name).copied();
    usize::from(field_type.resolved.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcdef_common::{Enum, Field, MapType, Message};

    fn message(full_name: &str, fields: Vec<Field>) -> Message {
        Message {
            name: full_name.rsplit('.').next().unwrap_or(full_name).to_string(),
            full_name: full_name.to_string(),
            fields,
            ..Default::default()
        }
    }

    fn field(name: &str, field_type: FieldType) -> Field {
        Field {
            name: name.to_string(),
            field_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolves_forward_references_and_scalars() {
        let builder = CatalogBuilder {
            messages: vec![
                message(
                    "p.A",
                    vec![
                        field("b", FieldType::named("p.B")),
                        field("color", FieldType::named("p.Color")),
                        field("n", FieldType::named("int64")),
                    ],
                ),
                message("p.B", vec![]),
            ],
            enums: vec![Enum {
                name: "Color".to_string(),
                full_name: "p.Color".to_string(),
                ..Default::default()
            }],
            services: vec![],
        };

        let catalog = resolve_types(builder);
        let a = &catalog.messages()[0];
        assert_eq!(a.fields[0].field_type.message(), Some(MessageId(1)));
        assert_eq!(a.fields[1].field_type.enumeration(), Some(EnumId(0)));
        assert_eq!(a.fields[2].field_type.resolved, None);
    }

    #[test]
    fn test_map_resolves_through_to_value() {
        let map = FieldType {
            name: "map<string, p.V>".to_string(),
            map: Some(Box::new(MapType {
                key: FieldType::named("string"),
                value: FieldType {
                    name: "*p.V".to_string(),
                    pointer: true,
                    ..Default::default()
                },
            })),
            ..Default::default()
        };
        let builder = CatalogBuilder {
            messages: vec![message("p.V", vec![]), message("p.H", vec![field("m", map)])],
            enums: vec![],
            services: vec![],
        };

        let catalog = resolve_types(builder);
        let field_type = &catalog.messages()[1].fields[0].field_type;
        assert_eq!(field_type.resolved, None);
        let map = field_type.map.as_deref().unwrap();
        assert_eq!(map.key.resolved, None);
        assert_eq!(map.value.message(), Some(MessageId(0)));
    }

    #[test]
    fn test_unwraps_a_single_pointer_level() {
        let pointer = |name: &str| FieldType {
            name: name.to_string(),
            pointer: true,
            ..Default::default()
        };
        let builder = CatalogBuilder {
            messages: vec![
                message("p.V", vec![]),
                message(
                    "p.H",
                    vec![
                        field("one", pointer("*p.V")),
                        field("two", pointer("**p.V")),
                        field("dotted", pointer("*.p.V")),
                    ],
                ),
            ],
            enums: vec![],
            services: vec![],
        };

        let catalog = resolve_types(builder);
        let fields = &catalog.messages()[1].fields;
        assert_eq!(fields[0].field_type.message(), Some(MessageId(0)));
        assert_eq!(fields[1].field_type.resolved, None);
        assert_eq!(fields[2].field_type.message(), Some(MessageId(0)));
    }
}
