//! One compile's worth of resolved services

use crate::catalog::Catalog;
use crate::http::contextualize;
use serde::Serialize;
use std::collections::BTreeMap;
use svcdef_common::{Method, Result, Service, SvcdefError};
use svcdef_parser::{parse_sources, DescriptorSource, ParsedFile, SourceFile};

/// A service together with the file it was parsed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFile {
    pub file: String,
    pub service: Service,
}

/// Catalog and contextualized services of one compile
#[derive(Debug, Clone, Serialize)]
pub struct Workspace {
    services: Vec<ServiceFile>,
    catalog: Catalog,
}

impl Workspace {
    /// Resolve the descriptors once and contextualize every parsed service.
    ///
    /// Files without a service are dropped. Two files declaring the same
    /// service name are an error.
    pub fn build(descriptors: &DescriptorSource, files: Vec<ParsedFile>) -> Result<Self> {
        let catalog = Catalog::build(descriptors);

        let mut services: Vec<ServiceFile> = Vec::new();
        for parsed in files {
            let Some(mut service) = parsed.service else {
                continue;
            };
            if let Some(existing) = services.iter().find(|s| s.service.name == service.name) {
                return Err(SvcdefError::Resolve(format!(
                    "service `{}` is declared in both {} and {}",
                    service.name, existing.file, parsed.name
                )));
            }
            contextualize(&mut service, &catalog)?;
            services.push(ServiceFile {
                file: parsed.name,
                service,
            });
        }

        tracing::info!(
            services = services.len(),
            messages = catalog.messages().len(),
            enums = catalog.enums().len(),
            "workspace ready"
        );
        Ok(Self { services, catalog })
    }

    /// Parse `sources` and build the workspace in one go
    pub fn load(
        descriptors: &DescriptorSource,
        sources: &[SourceFile],
        parallel: bool,
    ) -> Result<Self> {
        let parsed = parse_sources(sources, parallel)?;
        Self::build(descriptors, parsed)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn files(&self) -> &[ServiceFile] {
        &self.services
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter().map(|s| &s.service)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services().find(|s| s.name == name)
    }

    /// Every method keyed by `Service.Method`, in name order
    pub fn method_index(&self) -> BTreeMap<String, &Method> {
        self.services()
            .flat_map(|service| {
                service
                    .methods
                    .iter()
                    .map(move |method| (format!("{}.{}", service.name, method.name), method))
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
