// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use anyhow::{Context, Result};
use std::env;
use url::Url;

/// Controller configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Authority string matched against IngressClass spec.controller
    pub controller_name: String,
    /// Prefix under which signpost annotations are read from Ingress objects
    pub annotation_prefix: String,
    /// Upper bound on concurrently running reconciliations
    pub workers: usize,
    /// Base URL of the downstream proxy control plane
    pub proxy_endpoint: Url,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let controller_name = env::var("SIGNPOST_CONTROLLER_NAME")
            .unwrap_or_else(|_| defaults::CONTROLLER_AUTHORITY.to_string());
        let annotation_prefix = env::var("SIGNPOST_ANNOTATION_PREFIX")
            .unwrap_or_else(|_| defaults::ANNOTATION_PREFIX.to_string());
        let workers = env::var("SIGNPOST_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults::WORKERS);

        let endpoint = env::var("SIGNPOST_PROXY_ENDPOINT")
            .context("SIGNPOST_PROXY_ENDPOINT environment variable not set")?;
        let proxy_endpoint = Url::parse(&endpoint)
            .with_context(|| format!("invalid SIGNPOST_PROXY_ENDPOINT: {endpoint}"))?;

        Ok(Config {
            controller_name,
            annotation_prefix,
            workers,
            proxy_endpoint,
        })
    }
}
