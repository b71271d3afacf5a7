// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Advisory event recording on ingress objects.
//!
//! Not correctness-bearing: events only give operators visibility into
//! validation failures, so recording errors are logged and swallowed.

use crate::constants::CONTROLLER_NAME;
use crate::model::key::ResourceKey;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use std::future::Future;
use tracing::warn;

pub trait EventSink: Send + Sync + 'static {
    fn warn(
        &self,
        ingress: &ResourceKey,
        reason: &'static str,
        note: String,
    ) -> impl Future<Output = ()> + Send;
}

/// Records Kubernetes warning events against the ingress.
pub struct KubeEventSink {
    recorder: Recorder,
}

impl KubeEventSink {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

impl EventSink for KubeEventSink {
    async fn warn(&self, ingress: &ResourceKey, reason: &'static str, note: String) {
        let reference = ObjectReference {
            api_version: Some("networking.k8s.io/v1".to_string()),
            kind: Some("Ingress".to_string()),
            name: Some(ingress.name.clone()),
            namespace: (!ingress.namespace.is_empty()).then(|| ingress.namespace.clone()),
            ..Default::default()
        };
        let event = Event {
            type_: EventType::Warning,
            reason: reason.to_string(),
            note: Some(note),
            action: "Reconcile".to_string(),
            secondary: None,
        };

        if let Err(e) = self.recorder.publish(&event, &reference).await {
            warn!("Failed to record event on {}: {}", ingress, e);
        }
    }
}

/// Discards all events.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    async fn warn(&self, _ingress: &ResourceKey, _reason: &'static str, _note: String) {}
}
