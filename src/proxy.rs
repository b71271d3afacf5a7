// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the downstream proxy control plane.
//!
//! Routes are addressed by ingress identity: an upsert PUTs the full snapshot
//! to `routes/{namespace}/{name}` and fully supersedes any earlier snapshot
//! for that identity; a delete of an unknown route answers 404 and is treated
//! as success.

use crate::engine::ProxyReconciler;
use crate::model::ingress_config::IngressConfig;
use crate::model::key::ResourceKey;
use anyhow::{anyhow, Context};
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

pub struct ProxyClient {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Serialize)]
struct RoutePayload<'a> {
    annotation_prefix: &'a str,
    ingress: &'a Ingress,
    services: BTreeMap<String, &'a Service>,
    secrets: BTreeMap<String, &'a Secret>,
}

impl ProxyClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    // Appends path segments rather than joining a relative reference, which
    // would drop the last segment of a slash-less endpoint path.
    fn route_url(&self, key: &ResourceKey) -> anyhow::Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("proxy endpoint {} cannot carry a path", self.endpoint))?
            .pop_if_empty()
            .push("routes")
            .push(&key.namespace)
            .push(&key.name);
        Ok(url)
    }
}

impl ProxyReconciler for ProxyClient {
    async fn upsert(&self, config: &IngressConfig) -> anyhow::Result<()> {
        let key = config.key();
        let payload = RoutePayload {
            annotation_prefix: &config.annotation_prefix,
            ingress: &config.ingress,
            services: config
                .services
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_ref()))
                .collect(),
            secrets: config
                .secrets
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_ref()))
                .collect(),
        };

        let url = self.route_url(&key)?;
        debug!("Upserting route {} at {}", key, url);
        self.http
            .put(url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("upsert of {key} failed"))?
            .error_for_status()
            .with_context(|| format!("upsert of {key} rejected"))?;
        Ok(())
    }

    async fn delete(&self, key: &ResourceKey) -> anyhow::Result<()> {
        let url = self.route_url(key)?;
        debug!("Deleting route {} at {}", key, url);
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .with_context(|| format!("delete of {key} failed"))?;

        // Nothing upserted under this identity: contractually a no-op.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response
            .error_for_status()
            .with_context(|| format!("delete of {key} rejected"))?;
        Ok(())
    }
}
