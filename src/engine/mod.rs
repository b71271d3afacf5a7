// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The reconciliation engine: consumes change notifications for the four
//! watched kinds, fans them out to affected ingresses, and drives the proxy
//! reconciler through per-key serialized build-and-call passes.

pub mod manager;
pub mod reconcile;
pub mod watch;

pub use manager::{channel, EngineHandle, ReconcileEngine};

use crate::model::ingress_config::IngressConfig;
use crate::model::key::ResourceKey;
use std::future::Future;

/// The external control plane the engine converges. Upsert must be safe to
/// repeat with an evolving snapshot; delete of an unknown identity is a no-op.
pub trait ProxyReconciler: Send + Sync + 'static {
    fn upsert(&self, config: &IngressConfig) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn delete(&self, key: &ResourceKey) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// The four watched object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedKind {
    Ingress,
    RoutingClass,
    Service,
    Secret,
}

/// A change notification: something of this kind, at this identity, was
/// created, updated or deleted. Delivery is at-least-once and may be
/// reordered across keys; every pass rebuilds from current cache state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: WatchedKind,
    pub key: ResourceKey,
}
