// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch streams for the four watched kinds.
//!
//! Each stream keeps a reflector store current (the engine's local object
//! cache) and forwards every touched object to the dispatcher as a tagged
//! change notification. Initial list events replay the whole cluster state,
//! so a restarted controller converges without a separate initial sync.

use crate::cache::StoreCache;
use crate::engine::{Change, EngineHandle, WatchedKind};
use crate::model::key::ResourceKey;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube::{Api, Client, Resource};
use kube_runtime::reflector::{reflector, store, Store};
use kube_runtime::{watcher, WatchStreamExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::warn;

/// Start one watch stream per kind and hand back the read side of the cache.
pub fn spawn_watchers(client: &Client, handle: &EngineHandle) -> StoreCache {
    let ingresses: Api<Ingress> = Api::all(client.clone());
    let services: Api<Service> = Api::all(client.clone());
    let secrets: Api<Secret> = Api::all(client.clone());
    let classes: Api<IngressClass> = Api::all(client.clone());

    StoreCache {
        ingresses: spawn_watch(ingresses, WatchedKind::Ingress, handle.clone()),
        services: spawn_watch(services, WatchedKind::Service, handle.clone()),
        secrets: spawn_watch(secrets, WatchedKind::Secret, handle.clone()),
        classes: spawn_watch(classes, WatchedKind::RoutingClass, handle.clone()),
    }
}

fn spawn_watch<K>(api: Api<K>, kind: WatchedKind, handle: EngineHandle) -> Store<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    let (reader, writer) = store();

    tokio::spawn(async move {
        let events = reflector(writer, watcher(api, watcher::Config::default()));
        let mut touched = events.default_backoff().touched_objects().boxed();

        while let Some(item) = touched.next().await {
            match item {
                Ok(obj) => {
                    handle
                        .notify(Change {
                            kind,
                            key: ResourceKey::from_object(&obj),
                        })
                        .await;
                }
                Err(e) => warn!("Watch stream error for {:?}: {}", kind, e),
            }
        }
    });

    reader
}
