// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-only view of the watched cluster objects.
//!
//! Reconciliation passes never round-trip to the API server; they read from
//! reflector stores kept current by the watch streams. The trait boundary
//! lets tests substitute an in-memory cache.

use crate::model::key::ResourceKey;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::Resource;
use std::sync::Arc;

pub trait ObjectCache: Send + Sync + 'static {
    fn ingress(&self, key: &ResourceKey) -> Option<Arc<Ingress>>;
    fn service(&self, key: &ResourceKey) -> Option<Arc<Service>>;
    fn secret(&self, key: &ResourceKey) -> Option<Arc<Secret>>;

    /// Every ingress currently known, for routing-class fan-out.
    fn ingresses(&self) -> Vec<Arc<Ingress>>;
    /// Every routing class currently known.
    fn routing_classes(&self) -> Vec<Arc<IngressClass>>;
}

/// Production cache backed by one reflector store per watched kind.
#[derive(Clone)]
pub struct StoreCache {
    pub ingresses: Store<Ingress>,
    pub services: Store<Service>,
    pub secrets: Store<Secret>,
    pub classes: Store<IngressClass>,
}

impl ObjectCache for StoreCache {
    fn ingress(&self, key: &ResourceKey) -> Option<Arc<Ingress>> {
        self.ingresses.get(&object_ref(key))
    }

    fn service(&self, key: &ResourceKey) -> Option<Arc<Service>> {
        self.services.get(&object_ref(key))
    }

    fn secret(&self, key: &ResourceKey) -> Option<Arc<Secret>> {
        self.secrets.get(&object_ref(key))
    }

    fn ingresses(&self) -> Vec<Arc<Ingress>> {
        self.ingresses.state()
    }

    fn routing_classes(&self) -> Vec<Arc<IngressClass>> {
        self.classes.state()
    }
}

fn object_ref<K>(key: &ResourceKey) -> ObjectRef<K>
where
    K: Resource<DynamicType = ()>,
{
    let obj_ref = ObjectRef::new(&key.name);
    if key.namespace.is_empty() {
        obj_ref
    } else {
        obj_ref.within(&key.namespace)
    }
}
