// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Assembles a configuration snapshot for one adopted ingress.
//!
//! Reference collection and fetching are separate steps: the engine records
//! the collected references as registry edges before [`build`] reads the
//! cache, so a dependency event racing the pass fans out instead of finding
//! no parent. Every referenced service and secret is fetched from the local
//! cache; the snapshot maps hold exactly the referenced identities. A
//! reference missing from the cache fails the build: transiently if it was
//! not recorded before this pass, as an internal-consistency error if it was.

use crate::cache::ObjectCache;
use crate::constants::annotations;
use crate::error::{Result, SignpostError};
use crate::model::ingress_config::IngressConfig;
use crate::model::key::ResourceKey;
use k8s_openapi::api::networking::v1::{Ingress, IngressBackend, ServiceBackendPort};
use kube::ResourceExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// References declared by one ingress: backend services (with the declared
/// port, kept for validation) and TLS secrets from spec entries and
/// `tls_*_secret` annotations.
pub struct IngressRefs {
    backends: Vec<(ResourceKey, Option<ServiceBackendPort>)>,
    secrets: Vec<ResourceKey>,
}

impl IngressRefs {
    pub fn service_keys(&self) -> HashSet<ResourceKey> {
        self.backends.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn secret_keys(&self) -> HashSet<ResourceKey> {
        self.secrets.iter().cloned().collect()
    }
}

/// Dependency edges recorded before the current pass began.
#[derive(Default)]
pub struct PriorDeps {
    pub services: HashSet<ResourceKey>,
    pub secrets: HashSet<ResourceKey>,
}

pub fn collect(ingress: &Ingress, annotation_prefix: &str) -> IngressRefs {
    let namespace = ingress.namespace().unwrap_or_default();
    IngressRefs {
        backends: collect_backends(ingress, &namespace),
        secrets: collect_secret_keys(ingress, annotation_prefix, &namespace),
    }
}

pub fn build<C: ObjectCache>(
    annotation_prefix: &str,
    ingress: Arc<Ingress>,
    refs: &IngressRefs,
    prior: &PriorDeps,
    cache: &C,
) -> Result<IngressConfig> {
    let mut services = HashMap::new();
    for (key, _) in &refs.backends {
        if services.contains_key(key) {
            continue;
        }
        let svc = cache
            .service(key)
            .ok_or_else(|| missing_dependency(&prior.services, "service", key))?;
        services.insert(key.clone(), svc);
    }

    let mut secrets = HashMap::new();
    for key in &refs.secrets {
        if secrets.contains_key(key) {
            continue;
        }
        let secret = cache
            .secret(key)
            .ok_or_else(|| missing_dependency(&prior.secrets, "secret", key))?;
        secrets.insert(key.clone(), secret);
    }

    let config = IngressConfig {
        annotation_prefix: annotation_prefix.to_string(),
        ingress,
        services,
        secrets,
    };

    for (key, port) in &refs.backends {
        if let Some(port) = port {
            validate_backend_port(&config, key, port)?;
        }
    }
    // Enforces the TLS secret type on spec TLS entries; annotation-referenced
    // secrets carry arbitrary types and are not checked here.
    config.parse_tls_certs()?;

    Ok(config)
}

/// Service references across all rule paths and the default backend, with the
/// declared backend port for validation.
fn collect_backends(
    ingress: &Ingress,
    namespace: &str,
) -> Vec<(ResourceKey, Option<ServiceBackendPort>)> {
    let spec = ingress.spec.as_ref();
    let rule_backends = spec
        .and_then(|s| s.rules.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.http.as_ref())
        .flat_map(|http| http.paths.iter())
        .map(|path| &path.backend);
    let default_backend = spec.and_then(|s| s.default_backend.as_ref());

    rule_backends
        .chain(default_backend)
        .filter_map(|backend| backend_ref(backend, namespace))
        .collect()
}

fn backend_ref(
    backend: &IngressBackend,
    namespace: &str,
) -> Option<(ResourceKey, Option<ServiceBackendPort>)> {
    let svc = backend.service.as_ref()?;
    Some((
        ResourceKey::new(namespace, &svc.name),
        svc.port.clone(),
    ))
}

/// Secrets named by spec TLS entries plus the `tls_*_secret` annotations.
fn collect_secret_keys(
    ingress: &Ingress,
    annotation_prefix: &str,
    namespace: &str,
) -> Vec<ResourceKey> {
    let spec_secrets = ingress
        .spec
        .as_ref()
        .and_then(|s| s.tls.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|tls| tls.secret_name.as_deref());

    let ingress_annotations = ingress.metadata.annotations.as_ref();
    let annotation_secrets = annotations::TLS_SECRET_REFS.iter().filter_map(|suffix| {
        ingress_annotations?
            .get(&format!("{annotation_prefix}/{suffix}"))
            .map(String::as_str)
    });

    spec_secrets
        .chain(annotation_secrets)
        .map(|name| ResourceKey::new(namespace, name))
        .collect()
}

fn missing_dependency(
    prior: &HashSet<ResourceKey>,
    kind_name: &'static str,
    key: &ResourceKey,
) -> SignpostError {
    if prior.contains(key) {
        SignpostError::Inconsistent(format!(
            "{kind_name} {key} is recorded as a dependency but missing from the cache"
        ))
    } else {
        SignpostError::DependencyNotReady {
            kind: kind_name,
            key: key.clone(),
        }
    }
}

fn validate_backend_port(
    config: &IngressConfig,
    service: &ResourceKey,
    port: &ServiceBackendPort,
) -> Result<()> {
    if let Some(name) = port.name.as_deref() {
        config.service_port_by_name(service, name)?;
        return Ok(());
    }

    let Some(number) = port.number else {
        return Ok(());
    };
    let declared = config
        .services
        .get(service)
        .ok_or_else(|| {
            SignpostError::Inconsistent(format!("service {service} was not pre-fetched"))
        })?
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .into_iter()
        .flatten()
        .any(|p| p.port == number);

    if declared {
        Ok(())
    } else {
        Err(SignpostError::PortNotFound {
            service: service.clone(),
            port: number.to_string(),
        })
    }
}
