// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::info;

use signpost::config::Config;
use signpost::engine::watch::spawn_watchers;
use signpost::engine::{channel, ReconcileEngine};
use signpost::events::KubeEventSink;
use signpost::model::DependencyRegistry;
use signpost::proxy::ProxyClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Signpost ingress controller");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: controller_name={} proxy_endpoint={}",
        config.controller_name, config.proxy_endpoint
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let (handle, rx) = channel();
    let cache = spawn_watchers(&client, &handle);

    let engine = ReconcileEngine::new(
        rx,
        handle,
        cache,
        ProxyClient::new(config.proxy_endpoint),
        KubeEventSink::new(client),
        Arc::new(DependencyRegistry::new()),
        config.controller_name,
        config.annotation_prefix,
        config.workers,
    );

    engine
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
}
