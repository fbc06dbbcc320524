//! Placement of request fields onto HTTP bindings
//!
//! Once the catalog is resolved, every binding gets its verb and path and one
//! [`HttpParameter`] per field of the method's request message. A field goes
//! to the path when a placeholder names it, to the body when the `body`
//! option selects it, and to the query string otherwise.

use crate::catalog::Catalog;
use svcdef_common::{
    FieldId, HttpBinding, HttpParameter, Location, Method, MessageId, Result, Service,
    SvcdefError,
};

/// Fill verb, path and params of every binding in `service`.
///
/// Methods without bindings are left alone. A bound method whose request
/// type has no catalog entry is an error.
pub fn contextualize(service: &mut Service, catalog: &Catalog) -> Result<()> {
    let signature = catalog.service(&service.name);

    for method in &mut service.methods {
        let compiled = signature.and_then(|s| s.method(&method.name));
        if method.description.is_empty() {
            if let Some(compiled) = compiled {
                method.description = compiled.description.clone();
            }
        }
        if !method.has_bindings() {
            continue;
        }

        let request = compiled
            .and_then(|c| c.request.message())
            .or_else(|| catalog.message_id(&method.request_type))
            .ok_or_else(|| {
                SvcdefError::Resolve(format!(
                    "request type `{}` of {}.{} is not in the descriptor set",
                    method.request_type, service.name, method.name
                ))
            })?;

        contextualize_method(method, request, catalog);
        tracing::debug!(
            service = %service.name,
            method = %method.name,
            bindings = method.bindings.len(),
            "contextualized"
        );
    }
    Ok(())
}

fn contextualize_method(method: &mut Method, request: MessageId, catalog: &Catalog) {
    for binding in &mut method.bindings {
        contextualize_binding(binding, request, catalog);
    }
}

/// Set one binding's verb and path, and place every field of `request`
pub fn contextualize_binding(binding: &mut HttpBinding, request: MessageId, catalog: &Catalog) {
    if let Some((verb, path)) = binding
        .declared_route()
        .map(|(verb, path)| (verb.to_string(), path.to_string()))
    {
        binding.verb = verb;
        binding.path = path;
    } else {
        tracing::warn!(fields = binding.fields.len(), "binding declares no verb");
    }

    let placeholders = path_params(&binding.path);
    let body = binding.body().map(str::to_string);

    binding.params = catalog
        .message(request)
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| HttpParameter {
            name: field.name.clone(),
            field: FieldId {
                message: request,
                index,
            },
            location: locate(&field.name, &placeholders, body.as_deref()),
        })
        .collect();
}

/// Where a field named `field` travels, given the path's placeholder names and
/// the binding's `body` option
pub fn locate(field: &str, placeholders: &[String], body: Option<&str>) -> Location {
    if placeholders.iter().any(|p| p == field) {
        Location::Path
    } else if body.is_some_and(|body| body == "*" || body == field) {
        Location::Body
    } else {
        Location::Query
    }
}

/// Field names bound by the placeholders of a path template.
///
/// `{name}`, `{name.sub}` and `{name=pattern/*}` all bind `name`.
pub fn path_params(path: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let inner = &rest[open + 1..];
        let Some(close) = inner.find('}') else {
            break;
        };
        let placeholder = &inner[..close];
        let variable = placeholder.split('=').next().unwrap_or(placeholder);
        let leading = variable.split('.').next().unwrap_or(variable).trim();
        if !leading.is_empty() {
            params.push(leading.to_string());
        }
        rest = &inner[close + 1..];
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(path: &str) -> Vec<String> {
        path_params(path)
    }

    #[test]
    fn test_path_params() {
        assert_eq!(names("/sum/{a}"), vec!["a"]);
        assert_eq!(names("/{a}/{b}"), vec!["a", "b"]);
        assert_eq!(names("/v1/{book.name}"), vec!["book"]);
        assert_eq!(names("/v1/{name=shelves/*/books/*}"), vec!["name"]);
        assert!(names("/plain").is_empty());
        assert!(names("/broken/{a").is_empty());
    }

    #[test]
    fn test_locate_order() {
        let placeholders = vec!["a".to_string()];
        assert_eq!(locate("a", &placeholders, Some("*")), Location::Path);
        assert_eq!(locate("b", &placeholders, Some("*")), Location::Body);
        assert_eq!(locate("b", &placeholders, Some("b")), Location::Body);
        assert_eq!(locate("c", &placeholders, Some("b")), Location::Query);
        assert_eq!(locate("c", &placeholders, None), Location::Query);
    }

    #[test]
    fn test_sub_field_placeholder_does_not_bind_sub_name() {
        let placeholders = path_params("/v1/{book.name}");
        assert_eq!(locate("book", &placeholders, None), Location::Path);
        assert_eq!(locate("name", &placeholders, None), Location::Query);
    }
}
