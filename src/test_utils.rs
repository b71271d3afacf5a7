// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the test suites: an in-memory object cache, a
//! recording proxy reconciler, and builders for the watched kinds. The
//! default ingress fixture references service "service" (named port "http")
//! and TLS secret "secret" in namespace "default".

use crate::cache::ObjectCache;
use crate::constants::{defaults, DEFAULT_CLASS_ANNOTATION};
use crate::engine::manager::EngineContext;
use crate::engine::{channel, Change, EngineHandle, ProxyReconciler};
use crate::events::NullEventSink;
use crate::model::ingress_config::{IngressConfig, TLS_SECRET_TYPE};
use crate::model::key::ResourceKey;
use crate::model::registry::DependencyRegistry;
use anyhow::anyhow;
use k8s_openapi::api::core::v1::{Secret, Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressClass,
    IngressClassSpec, IngressRule, IngressServiceBackend, IngressSpec, IngressTLS,
    ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const TEST_NAMESPACE: &str = "default";

#[derive(Default)]
struct CacheState {
    ingresses: HashMap<ResourceKey, Arc<Ingress>>,
    services: HashMap<ResourceKey, Arc<Service>>,
    secrets: HashMap<ResourceKey, Arc<Secret>>,
    classes: HashMap<ResourceKey, Arc<IngressClass>>,
}

/// In-memory stand-in for the reflector stores. Clones share state, so a
/// test can mutate the cache while an engine context holds its own handle.
#[derive(Clone, Default)]
pub struct MemoryCache {
    state: Arc<Mutex<CacheState>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_ingress(&self, ingress: Ingress) {
        let key = ResourceKey::from_object(&ingress);
        lock(&self.state).ingresses.insert(key, Arc::new(ingress));
    }

    pub fn put_service(&self, service: Service) {
        let key = ResourceKey::from_object(&service);
        lock(&self.state).services.insert(key, Arc::new(service));
    }

    pub fn put_secret(&self, secret: Secret) {
        let key = ResourceKey::from_object(&secret);
        lock(&self.state).secrets.insert(key, Arc::new(secret));
    }

    pub fn put_class(&self, class: IngressClass) {
        let key = ResourceKey::from_object(&class);
        lock(&self.state).classes.insert(key, Arc::new(class));
    }

    pub fn remove_ingress(&self, key: &ResourceKey) {
        lock(&self.state).ingresses.remove(key);
    }

    pub fn remove_class(&self, key: &ResourceKey) {
        lock(&self.state).classes.remove(key);
    }
}

impl ObjectCache for MemoryCache {
    fn ingress(&self, key: &ResourceKey) -> Option<Arc<Ingress>> {
        lock(&self.state).ingresses.get(key).cloned()
    }

    fn service(&self, key: &ResourceKey) -> Option<Arc<Service>> {
        lock(&self.state).services.get(key).cloned()
    }

    fn secret(&self, key: &ResourceKey) -> Option<Arc<Secret>> {
        lock(&self.state).secrets.get(key).cloned()
    }

    fn ingresses(&self) -> Vec<Arc<Ingress>> {
        lock(&self.state).ingresses.values().cloned().collect()
    }

    fn routing_classes(&self) -> Vec<Arc<IngressClass>> {
        lock(&self.state).classes.values().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Upsert(IngressConfig),
    Delete(ResourceKey),
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<SinkCall>,
    last_upsert: Option<IngressConfig>,
    upserts: usize,
    deletes: usize,
    fail_next_upsert: bool,
}

/// Proxy reconciler that records every call. Counts are cumulative and
/// survive [`RecordingReconciler::take_calls`].
#[derive(Clone, Default)]
pub struct RecordingReconciler {
    state: Arc<Mutex<RecorderState>>,
}

impl RecordingReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_count(&self) -> usize {
        lock(&self.state).upserts
    }

    pub fn delete_count(&self) -> usize {
        lock(&self.state).deletes
    }

    pub fn last_upsert(&self) -> Option<IngressConfig> {
        lock(&self.state).last_upsert.clone()
    }

    pub fn take_calls(&self) -> Vec<SinkCall> {
        std::mem::take(&mut lock(&self.state).calls)
    }

    /// Make the next upsert fail once, then recover.
    pub fn fail_next_upsert(&self) {
        lock(&self.state).fail_next_upsert = true;
    }
}

impl ProxyReconciler for RecordingReconciler {
    async fn upsert(&self, config: &IngressConfig) -> anyhow::Result<()> {
        let mut state = lock(&self.state);
        if state.fail_next_upsert {
            state.fail_next_upsert = false;
            return Err(anyhow!("injected upsert failure"));
        }
        state.upserts += 1;
        state.last_upsert = Some(config.clone());
        state.calls.push(SinkCall::Upsert(config.clone()));
        Ok(())
    }

    async fn delete(&self, key: &ResourceKey) -> anyhow::Result<()> {
        let mut state = lock(&self.state);
        state.deletes += 1;
        state.calls.push(SinkCall::Delete(key.clone()));
        Ok(())
    }
}

/// Engine context wired to the given cache and reconciler, with the requeue
/// side of the channel handed back so tests can observe scheduled retries.
pub fn test_context(
    cache: MemoryCache,
    reconciler: RecordingReconciler,
) -> (
    Arc<EngineContext<MemoryCache, RecordingReconciler, NullEventSink>>,
    mpsc::Receiver<Change>,
) {
    let (requeue, rx): (EngineHandle, mpsc::Receiver<Change>) = channel();
    let ctx = EngineContext::new(
        cache,
        reconciler,
        NullEventSink,
        Arc::new(DependencyRegistry::new()),
        defaults::CONTROLLER_AUTHORITY.to_string(),
        defaults::ANNOTATION_PREFIX.to_string(),
        defaults::WORKERS,
        requeue,
    );
    (Arc::new(ctx), rx)
}

/// Poll a condition until it holds, panicking after five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not reached within 5s");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn make_ingress(name: &str, class: Option<&str>) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: class.map(str::to_string),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec!["ingress.example.com".to_string()]),
                secret_name: Some("secret".to_string()),
            }]),
            rules: Some(vec![IngressRule {
                host: Some("ingress.example.com".to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: backend("service", Some("http"), None),
                    }],
                }),
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

/// Ingress whose only reference is a default backend with a numeric port.
pub fn make_ingress_with_backend(name: &str, service: &str, port: i32) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            default_backend: Some(backend(service, None, Some(port))),
            ..Default::default()
        }),
        status: None,
    }
}

fn backend(service: &str, port_name: Option<&str>, port_number: Option<i32>) -> IngressBackend {
    IngressBackend {
        service: Some(IngressServiceBackend {
            name: service.to_string(),
            port: Some(ServiceBackendPort {
                name: port_name.map(str::to_string),
                number: port_number,
            }),
        }),
        resource: None,
    }
}

pub fn make_service(name: &str, port_name: &str, port: i32) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some(port_name.to_string()),
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn make_tls_secret(name: &str, key: &[u8], cert: &[u8]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        type_: Some(TLS_SECRET_TYPE.to_string()),
        data: Some(BTreeMap::from([
            ("tls.key".to_string(), ByteString(key.to_vec())),
            ("tls.crt".to_string(), ByteString(cert.to_vec())),
        ])),
        ..Default::default()
    }
}

pub fn make_opaque_secret(name: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

pub fn make_class(name: &str, controller: &str, is_default: bool) -> IngressClass {
    let annotations = is_default.then(|| {
        BTreeMap::from([(DEFAULT_CLASS_ANNOTATION.to_string(), "true".to_string())])
    });
    IngressClass {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            annotations,
            ..Default::default()
        },
        spec: Some(IngressClassSpec {
            controller: Some(controller.to_string()),
            parameters: None,
        }),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
