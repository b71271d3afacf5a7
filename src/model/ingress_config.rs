// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The configuration snapshot handed to the proxy reconciler: one ingress
//! plus the exact set of services and secrets it references. Built fresh on
//! every reconciliation pass and never mutated afterwards.

use crate::constants::annotations;
use crate::error::{Result, SignpostError};
use crate::model::key::ResourceKey;
use bytes::Bytes;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::Arc;

/// Secret type required for TLS entries.
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";
/// Private key entry in a TLS secret.
pub const TLS_KEY_DATA_KEY: &str = "tls.key";
/// Certificate entry in a TLS secret.
pub const TLS_CERT_DATA_KEY: &str = "tls.crt";

#[derive(Debug, Clone, PartialEq)]
pub struct IngressConfig {
    pub annotation_prefix: String,
    pub ingress: Arc<Ingress>,
    pub services: HashMap<ResourceKey, Arc<Service>>,
    pub secrets: HashMap<ResourceKey, Arc<Secret>>,
}

/// Key and certificate bytes extracted from one TLS secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsCert {
    pub key: Bytes,
    pub cert: Bytes,
}

impl IngressConfig {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::from_object(&*self.ingress)
    }

    /// Whether upstream traffic should use HTTPS, per the
    /// `{prefix}/secure_upstream` annotation (case-insensitive "true").
    pub fn is_secure_upstream(&self) -> bool {
        let annotation = format!("{}/{}", self.annotation_prefix, annotations::SECURE_UPSTREAM);
        self.ingress
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(&annotation))
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Resolve a named port on a pre-fetched service.
    pub fn service_port_by_name(&self, service: &ResourceKey, port: &str) -> Result<i32> {
        let svc = self.services.get(service).ok_or_else(|| {
            SignpostError::Inconsistent(format!("service {service} was not pre-fetched"))
        })?;

        svc.spec
            .as_ref()
            .and_then(|spec| spec.ports.as_ref())
            .into_iter()
            .flatten()
            .find(|p| p.name.as_deref() == Some(port))
            .map(|p| p.port)
            .ok_or_else(|| SignpostError::PortNotFound {
                service: service.clone(),
                port: port.to_string(),
            })
    }

    /// Extract key/certificate pairs for every TLS entry, in declared order.
    pub fn parse_tls_certs(&self) -> Result<Vec<TlsCert>> {
        let namespace = self.ingress.namespace().unwrap_or_default();
        let entries = self
            .ingress
            .spec
            .as_ref()
            .and_then(|spec| spec.tls.as_ref())
            .into_iter()
            .flatten();

        let mut certs = Vec::new();
        for entry in entries {
            let Some(secret_name) = entry.secret_name.as_deref() else {
                continue;
            };
            let key = ResourceKey::new(namespace.clone(), secret_name);
            let secret = self.secrets.get(&key).ok_or_else(|| {
                SignpostError::Inconsistent(format!("secret {key} was not pre-fetched"))
            })?;
            certs.push(extract_tls_cert(&key, secret)?);
        }

        Ok(certs)
    }
}

fn extract_tls_cert(key: &ResourceKey, secret: &Secret) -> Result<TlsCert> {
    let found = secret.type_.clone().unwrap_or_default();
    if found != TLS_SECRET_TYPE {
        return Err(SignpostError::InvalidSecretType {
            secret: key.clone(),
            found,
        });
    }

    let data_entry = |name: &str| {
        secret
            .data
            .as_ref()
            .and_then(|d| d.get(name))
            .map(|b| Bytes::copy_from_slice(&b.0))
            .unwrap_or_default()
    };

    Ok(TlsCert {
        key: data_entry(TLS_KEY_DATA_KEY),
        cert: data_entry(TLS_CERT_DATA_KEY),
    })
}
