// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::model::key::ResourceKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignpostError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("{kind} {key} is not yet in the local cache")]
    DependencyNotReady { kind: &'static str, key: ResourceKey },

    #[error("secret {secret} has type {found:?}, expected kubernetes.io/tls")]
    InvalidSecretType { secret: ResourceKey, found: String },

    #[error("service {service} has no port named {port}")]
    PortNotFound { service: ResourceKey, port: String },

    #[error("{0}, this is a bug")]
    Inconsistent(String),

    #[error("multiple default routing classes claim controller {authority}: {classes:?}")]
    AmbiguousDefaultClass {
        authority: String,
        classes: Vec<String>,
    },

    #[error("proxy reconciler call failed: {0}")]
    Proxy(anyhow::Error),
}

impl SignpostError {
    /// Whether an operator can act on this error; such failures are recorded
    /// as advisory events on the ingress in addition to being retried.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            SignpostError::InvalidSecretType { .. }
                | SignpostError::PortNotFound { .. }
                | SignpostError::AmbiguousDefaultClass { .. }
        )
    }

    /// Event reason for user-visible failures.
    pub fn reason(&self) -> &'static str {
        match self {
            SignpostError::InvalidSecretType { .. } | SignpostError::PortNotFound { .. } => {
                "InvalidIngressConfig"
            }
            SignpostError::AmbiguousDefaultClass { .. } => "AmbiguousIngressClass",
            _ => "ReconcileError",
        }
    }
}

pub type Result<T> = std::result::Result<T, SignpostError>;
