//! Integration tests for catalog resolution and HTTP contextualization

use prost::Message as _;
use prost_types::{
    field_descriptor_proto, source_code_info, DescriptorProto, EnumDescriptorProto,
    EnumValueDescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MessageOptions, MethodDescriptorProto, ServiceDescriptorProto, SourceCodeInfo,
};
use std::fs;
use svcdef_common::{Annotation, Location, SvcdefError};
use svcdef_parser::{parse_source, DescriptorSource, SourceFile};
use svcdef_resolver::{Catalog, Workspace};

const SUM_PROTO: &str = r#"syntax = "proto3";
package sum;

import "google/api/annotations.proto";

// Adds numbers.
service SumSvc {
  // Sum returns a + b.
  rpc Sum(SumRequest) returns (SumReply) {
    option (google.api.http) = { get: "/sum/{a}" };
  }

  rpc Pair(PairRequest) returns (SumReply) {
    option (google.api.http) = {
      get: "/{a}/{b}"
      additional_bindings {
        post: "/pair"
        body: "*"
      }
    };
  }

  rpc Mixed(SumRequest) returns (SumReply) {
    option (google.api.http) = { get: "/x/{a}" body: "*" };
  }

  rpc Named(PairRequest) returns (SumReply) {
    option (google.api.http) = {
      custom: { kind: "HEAD" path: "/named/{c}" }
      body: "b"
    };
  }

  rpc Plain(SumRequest) returns (SumReply) {}
}

message SumRequest {
  int64 a = 1;
  int64 b = 2;
}
"#;

fn scalar(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(field_descriptor_proto::Label::Optional as i32),
        r#type: Some(field_descriptor_proto::Type::Int64 as i32),
        ..Default::default()
    }
}

fn typed(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(field_descriptor_proto::Label::Optional as i32),
        r#type: Some(field_descriptor_proto::Type::Message as i32),
        type_name: Some(type_name.to_string()),
        ..Default::default()
    }
}

fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn method(name: &str, input: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(format!(".sum.{}", input)),
        output_type: Some(".sum.SumReply".to_string()),
        ..Default::default()
    }
}

fn sum_descriptor_set() -> FileDescriptorSet {
    let mut labels = typed("labels", 1, ".sum.Holder.LabelsEntry");
    labels.label = Some(field_descriptor_proto::Label::Repeated as i32);

    let holder = DescriptorProto {
        name: Some("Holder".to_string()),
        field: vec![labels, typed("child", 2, ".sum.SomeMessage")],
        nested_type: vec![DescriptorProto {
            name: Some("LabelsEntry".to_string()),
            field: vec![
                FieldDescriptorProto {
                    name: Some("key".to_string()),
                    number: Some(1),
                    label: Some(field_descriptor_proto::Label::Optional as i32),
                    r#type: Some(field_descriptor_proto::Type::String as i32),
                    ..Default::default()
                },
                typed("value", 2, ".sum.SomeMessage"),
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ..Default::default()
    };

    let color = EnumDescriptorProto {
        name: Some("Color".to_string()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("COLOR_UNSPECIFIED".to_string()),
                number: Some(0),
                ..Default::default()
            },
            EnumValueDescriptorProto {
                name: Some("RED".to_string()),
                number: Some(1),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("sum.proto".to_string()),
            package: Some("sum".to_string()),
            message_type: vec![
                message("SumRequest", vec![scalar("a", 1), scalar("b", 2)]),
                message("SumReply", vec![scalar("v", 1)]),
                message(
                    "PairRequest",
                    vec![scalar("a", 1), scalar("b", 2), scalar("c", 3)],
                ),
                holder,
                message("SomeMessage", vec![]),
            ],
            enum_type: vec![color],
            service: vec![ServiceDescriptorProto {
                name: Some("SumSvc".to_string()),
                method: vec![
                    method("Sum", "SumRequest"),
                    method("Pair", "PairRequest"),
                    method("Mixed", "SumRequest"),
                    method("Named", "PairRequest"),
                    method("Plain", "SumRequest"),
                ],
                ..Default::default()
            }],
            source_code_info: Some(SourceCodeInfo {
                location: vec![source_code_info::Location {
                    path: vec![5, 0, 2, 1],
                    leading_comments: Some(" Warm and bright.\n".to_string()),
                    ..Default::default()
                }],
            }),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }],
    }
}

fn sum_workspace() -> Workspace {
    let descriptors = DescriptorSource::from_set(sum_descriptor_set());
    let sources = vec![SourceFile::new("sum.proto", SUM_PROTO)];
    Workspace::load(&descriptors, &sources, false).unwrap()
}

fn locations(workspace: &Workspace, method: &str, binding: usize) -> Vec<(String, Location)> {
    let service = workspace.service("SumSvc").unwrap();
    service.method(method).unwrap().bindings[binding]
        .params
        .iter()
        .map(|p| (p.name.clone(), p.location))
        .collect()
}

fn pairs(expected: &[(&str, Location)]) -> Vec<(String, Location)> {
    expected
        .iter()
        .map(|(name, location)| (name.to_string(), *location))
        .collect()
}

#[test]
fn test_sum_service_places_fields() {
    let workspace = sum_workspace();
    assert_eq!(
        locations(&workspace, "Sum", 0),
        pairs(&[("a", Location::Path), ("b", Location::Query)])
    );

    let sum = workspace.service("SumSvc").unwrap().method("Sum").unwrap();
    assert_eq!(sum.description, "Sum returns a + b.");
    assert_eq!(sum.bindings[0].verb, "get");
    assert_eq!(sum.bindings[0].path, "/sum/{a}");
}

#[test]
fn test_two_placeholders_and_query() {
    let workspace = sum_workspace();
    assert_eq!(
        locations(&workspace, "Pair", 0),
        pairs(&[
            ("a", Location::Path),
            ("b", Location::Path),
            ("c", Location::Query),
        ])
    );
}

#[test]
fn test_additional_binding_is_contextualized() {
    let workspace = sum_workspace();
    let pair = workspace.service("SumSvc").unwrap().method("Pair").unwrap();
    assert_eq!(pair.bindings.len(), 2);
    assert_eq!(pair.bindings[1].verb, "post");
    assert_eq!(pair.bindings[1].path, "/pair");
    assert_eq!(
        locations(&workspace, "Pair", 1),
        pairs(&[
            ("a", Location::Body),
            ("b", Location::Body),
            ("c", Location::Body),
        ])
    );
}

#[test]
fn test_path_wins_over_body_wildcard() {
    let workspace = sum_workspace();
    assert_eq!(
        locations(&workspace, "Mixed", 0),
        pairs(&[("a", Location::Path), ("b", Location::Body)])
    );
}

#[test]
fn test_shorthand_body_option_places_fields() {
    let descriptors = DescriptorSource::from_set(sum_descriptor_set());
    let source = SourceFile::new(
        "sum.proto",
        r#"syntax = "proto3";
package sum;

service SumSvc {
  rpc Sum(SumRequest) returns (SumReply) {
    option (google.api.http).post = "/sum/{a}";
    option (google.api.http).body = "*";
  }
}
"#,
    );
    let workspace = Workspace::load(&descriptors, &[source], false).unwrap();

    let sum = workspace.service("SumSvc").unwrap().method("Sum").unwrap();
    assert_eq!(sum.bindings.len(), 1);
    assert_eq!(sum.bindings[0].verb, "post");
    assert_eq!(
        locations(&workspace, "Sum", 0),
        pairs(&[("a", Location::Path), ("b", Location::Body)])
    );
}

#[test]
fn test_custom_pattern_and_named_body() {
    let workspace = sum_workspace();
    let named = workspace.service("SumSvc").unwrap().method("Named").unwrap();
    assert_eq!(named.bindings[0].verb, "HEAD");
    assert_eq!(named.bindings[0].path, "/named/{c}");
    assert_eq!(
        locations(&workspace, "Named", 0),
        pairs(&[
            ("a", Location::Query),
            ("b", Location::Body),
            ("c", Location::Path),
        ])
    );
}

#[test]
fn test_params_point_at_request_fields() {
    let workspace = sum_workspace();
    let catalog = workspace.catalog();
    let sum = workspace.service("SumSvc").unwrap().method("Sum").unwrap();
    let request = catalog.find_message("sum.SumRequest").unwrap();

    for param in &sum.bindings[0].params {
        assert!(std::ptr::eq(catalog.message(param.field.message), request));
        assert_eq!(catalog.field(param.field).name, param.name);
    }
}

#[test]
fn test_unannotated_method_keeps_types() {
    let workspace = sum_workspace();
    let plain = workspace.service("SumSvc").unwrap().method("Plain").unwrap();
    assert_eq!(plain.annotation, Annotation::Missing);
    assert!(plain.bindings.is_empty());
    assert_eq!(plain.request_type, "SumRequest");
}

#[test]
fn test_map_value_is_canonical_entry() {
    let catalog = Catalog::build(&DescriptorSource::from_set(sum_descriptor_set()));
    let holder = catalog.find_message("sum.Holder").unwrap();
    let canonical = catalog.find_message("SomeMessage").unwrap();

    let labels = holder.field("labels").unwrap();
    let map = labels.field_type.map.as_deref().unwrap();
    assert!(map.value.pointer);
    let value = map.value.message().unwrap();
    assert!(std::ptr::eq(catalog.message(value), canonical));

    let child = holder.field("child").unwrap();
    let child = child.field_type.message().unwrap();
    assert!(std::ptr::eq(catalog.message(child), canonical));

    assert!(catalog.find_message("sum.Holder.LabelsEntry").is_none());
    assert!(catalog.dangling_fields().is_empty());
}

#[test]
fn test_enum_value_description() {
    let catalog = Catalog::build(&DescriptorSource::from_set(sum_descriptor_set()));
    let color = catalog.find_enum("sum.Color").unwrap();
    assert_eq!(color.value("RED").unwrap().description, "Warm and bright.");
    assert_eq!(color.value("COLOR_UNSPECIFIED").unwrap().description, "");
}

#[test]
fn test_method_index_is_sorted() {
    let workspace = sum_workspace();
    let keys: Vec<String> = workspace.method_index().keys().cloned().collect();
    assert_eq!(
        keys,
        vec![
            "SumSvc.Mixed",
            "SumSvc.Named",
            "SumSvc.Pair",
            "SumSvc.Plain",
            "SumSvc.Sum",
        ]
    );
}

#[test]
fn test_missing_request_type_is_fatal() {
    let descriptors = DescriptorSource::from_set(sum_descriptor_set());
    let source = SourceFile::new(
        "other.proto",
        r#"service Other { rpc Go(Nowhere) returns (SumReply) { option (google.api.http).get = "/go"; } }"#,
    );
    let parsed = vec![parse_source(&source).unwrap()];

    let err = Workspace::build(&descriptors, parsed).unwrap_err();
    assert!(matches!(err, SvcdefError::Resolve(_)));
    assert!(err.to_string().contains("Nowhere"));
}

#[test]
fn test_duplicate_service_is_rejected() {
    let descriptors = DescriptorSource::from_set(sum_descriptor_set());
    let sources = vec![
        SourceFile::new("a.proto", SUM_PROTO),
        SourceFile::new("b.proto", SUM_PROTO),
    ];
    let err = Workspace::load(&descriptors, &sources, true).unwrap_err();
    assert!(err.to_string().contains("a.proto"));
    assert!(err.to_string().contains("b.proto"));
}

#[test]
fn test_files_without_service_are_skipped() {
    let descriptors = DescriptorSource::from_set(sum_descriptor_set());
    let sources = vec![
        SourceFile::new("types.proto", "message Only {}"),
        SourceFile::new("sum.proto", SUM_PROTO),
    ];
    let workspace = Workspace::load(&descriptors, &sources, true).unwrap();
    assert_eq!(workspace.files().len(), 1);
    assert_eq!(workspace.files()[0].file, "sum.proto");
}

#[test]
fn test_load_from_disk_and_serialize() {
    let dir = tempfile::tempdir().unwrap();
    let set_path = dir.path().join("sum.pb");
    let proto_path = dir.path().join("sum.proto");
    fs::write(&set_path, sum_descriptor_set().encode_to_vec()).unwrap();
    fs::write(&proto_path, SUM_PROTO).unwrap();

    let descriptors = DescriptorSource::from_file(&set_path).unwrap();
    assert!(descriptors.file("sum.proto").is_some());
    let sources = vec![SourceFile::read(&proto_path).unwrap()];
    let workspace = Workspace::load(&descriptors, &sources, false).unwrap();

    let json: serde_json::Value = serde_json::from_str(&workspace.to_json().unwrap()).unwrap();
    let params = &json["services"][0]["service"]["methods"][0]["bindings"][0]["params"];
    assert_eq!(params[0]["name"], "a");
    assert_eq!(params[0]["location"], "path");
    assert_eq!(params[1]["location"], "query");
    assert!(json["catalog"]["messages"].as_array().unwrap().len() >= 5);
}
