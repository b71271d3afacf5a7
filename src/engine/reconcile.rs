// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One reconciliation pass for one ingress key.
//!
//! Each pass rebuilds its decision from the current cache state: resolve
//! adoption, record the collected references as registry edges, build a
//! fresh snapshot, and drive the proxy reconciler. Edges are written before
//! the cache is read so service and secret changes always fan out to this
//! ingress, and registry membership doubles as the adoption record: a
//! tracked ingress that stops being ours (or disappears) gets exactly one
//! delete.

use crate::adoption::{self, Adoption};
use crate::builder;
use crate::cache::ObjectCache;
use crate::engine::manager::EngineContext;
use crate::engine::ProxyReconciler;
use crate::error::{Result, SignpostError};
use crate::events::EventSink;
use crate::model::key::ResourceKey;
use crate::model::registry::DependencyKind;
use std::collections::HashSet;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Upserted,
    Deleted,
    /// Not adopted and never was: nothing to do.
    Skipped,
}

#[instrument(skip(ctx), fields(ingress = %key))]
pub(crate) async fn reconcile_key<C, R, E>(
    ctx: &EngineContext<C, R, E>,
    key: &ResourceKey,
) -> Result<Outcome>
where
    C: ObjectCache,
    R: ProxyReconciler,
    E: EventSink,
{
    let Some(ingress) = ctx.cache.ingress(key) else {
        debug!("Ingress is gone from the cache");
        return retire(ctx, key).await;
    };

    match adoption::resolve(&ingress, &ctx.cache.routing_classes(), &ctx.authority)? {
        Adoption::Unadopted => retire(ctx, key).await,
        Adoption::Adopted { class } => {
            let refs = builder::collect(&ingress, &ctx.annotation_prefix);
            let prior = builder::PriorDeps {
                services: ctx.registry.deps_of(key, DependencyKind::Service),
                secrets: ctx.registry.deps_of(key, DependencyKind::Secret),
            };

            // Edges go in before the cache is read: a dependency event
            // arriving mid-pass must find its parent recorded.
            ctx.registry
                .set_edges(key, DependencyKind::Service, refs.service_keys());
            ctx.registry
                .set_edges(key, DependencyKind::Secret, refs.secret_keys());
            ctx.registry
                .set_edges(key, DependencyKind::RoutingClass, HashSet::from([class]));

            let config = builder::build(&ctx.annotation_prefix, ingress, &refs, &prior, &ctx.cache)?;

            ctx.reconciler
                .upsert(&config)
                .await
                .map_err(SignpostError::Proxy)?;
            Ok(Outcome::Upserted)
        }
    }
}

/// The ingress is gone or no longer ours. Issue a delete only if it was
/// previously adopted; edges are dropped once the delete goes through, so a
/// failed delete keeps the key tracked and retriable.
async fn retire<C, R, E>(ctx: &EngineContext<C, R, E>, key: &ResourceKey) -> Result<Outcome>
where
    C: ObjectCache,
    R: ProxyReconciler,
    E: EventSink,
{
    if !ctx.registry.is_tracked(key) {
        return Ok(Outcome::Skipped);
    }

    ctx.reconciler
        .delete(key)
        .await
        .map_err(SignpostError::Proxy)?;
    ctx.registry.clear_all(key);
    Ok(Outcome::Deleted)
}
