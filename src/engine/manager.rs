// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Change dispatch and per-key scheduling.
//!
//! A single receiver drains change notifications from the watchers, resolves
//! each to the set of affected ingress keys, and hands every key to a bounded
//! worker pool. An in-flight map guarantees at most one running pass per key:
//! notifications arriving while a key is being reconciled coalesce into a
//! single follow-up pass. Failed passes are re-enqueued with exponential
//! backoff; a key is never abandoned.

use crate::cache::ObjectCache;
use crate::constants::backoff;
use crate::engine::{reconcile, Change, ProxyReconciler, WatchedKind};
use crate::events::EventSink;
use crate::model::key::ResourceKey;
use crate::model::registry::{DependencyKind, DependencyRegistry};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

const CHANNEL_CAPACITY: usize = 256;

/// Create the change channel shared by the watchers and the engine.
pub fn channel() -> (EngineHandle, mpsc::Receiver<Change>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (EngineHandle { tx }, rx)
}

/// Handle for delivering change notifications to the engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Change>,
}

impl EngineHandle {
    pub async fn notify(&self, change: Change) {
        if let Err(e) = self.tx.send(change).await {
            error!("Failed to deliver change to engine: {}", e);
        }
    }
}

struct KeyState {
    /// A notification arrived while a pass for this key was running.
    pending: bool,
}

pub(crate) struct EngineContext<C, R, E> {
    pub(crate) cache: C,
    pub(crate) reconciler: R,
    pub(crate) events: E,
    pub(crate) registry: Arc<DependencyRegistry>,
    pub(crate) authority: String,
    pub(crate) annotation_prefix: String,
    workers: Semaphore,
    worker_count: usize,
    inflight: Mutex<HashMap<ResourceKey, KeyState>>,
    attempts: Mutex<HashMap<ResourceKey, u32>>,
    requeue: EngineHandle,
}

impl<C, R, E> EngineContext<C, R, E> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        cache: C,
        reconciler: R,
        events: E,
        registry: Arc<DependencyRegistry>,
        authority: String,
        annotation_prefix: String,
        worker_count: usize,
        requeue: EngineHandle,
    ) -> Self {
        Self {
            cache,
            reconciler,
            events,
            registry,
            authority,
            annotation_prefix,
            workers: Semaphore::new(worker_count),
            worker_count,
            inflight: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            requeue,
        }
    }

    fn next_retry_delay(&self, key: &ResourceKey) -> Duration {
        let mut attempts = lock(&self.attempts);
        let n = attempts.entry(key.clone()).or_insert(0);
        *n += 1;
        // 500ms, 1s, 2s, ... capped at 60s
        let exp = n.saturating_sub(1).min(7);
        let millis = backoff::BASE_MS << exp;
        Duration::from_millis(millis.min(backoff::MAX_SECS * 1000))
    }

    fn clear_retries(&self, key: &ResourceKey) {
        lock(&self.attempts).remove(key);
    }
}

pub struct ReconcileEngine<C, R, E> {
    ctx: Arc<EngineContext<C, R, E>>,
    rx: mpsc::Receiver<Change>,
}

impl<C, R, E> ReconcileEngine<C, R, E>
where
    C: ObjectCache,
    R: ProxyReconciler,
    E: EventSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rx: mpsc::Receiver<Change>,
        requeue: EngineHandle,
        cache: C,
        reconciler: R,
        events: E,
        registry: Arc<DependencyRegistry>,
        authority: String,
        annotation_prefix: String,
        workers: usize,
    ) -> Self {
        Self {
            ctx: Arc::new(EngineContext::new(
                cache,
                reconciler,
                events,
                registry,
                authority,
                annotation_prefix,
                workers,
                requeue,
            )),
            rx,
        }
    }

    /// Drain change notifications until the channel closes or the shutdown
    /// signal fires, then let already-running passes finish.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        info!("Reconciliation engine started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping admission");
                    break;
                }
                change = self.rx.recv() => match change {
                    Some(change) => dispatch(&self.ctx, change),
                    None => break,
                }
            }
        }

        // All permits held means no reconciliation is still running; holding
        // them until return keeps any late acquire from starting a pass.
        let _permits = self
            .ctx
            .workers
            .acquire_many(self.ctx.worker_count as u32)
            .await;
        self.ctx.workers.close();

        let skipped: Vec<ResourceKey> = lock(&self.ctx.inflight).drain().map(|(key, _)| key).collect();
        for key in skipped {
            warn!("Shutdown before reconciling {}", key);
        }

        info!("Reconciliation engine stopped");
        Ok(())
    }
}

pub(crate) fn dispatch<C, R, E>(ctx: &Arc<EngineContext<C, R, E>>, change: Change)
where
    C: ObjectCache,
    R: ProxyReconciler,
    E: EventSink,
{
    let keys = affected_keys(ctx, &change);
    if keys.is_empty() {
        debug!("Change to {:?} {} affects no ingress", change.kind, change.key);
        return;
    }

    debug!(
        "Change to {:?} {} affects {} ingress(es)",
        change.kind,
        change.key,
        keys.len()
    );
    for key in keys {
        schedule(ctx, key);
    }
}

/// Resolve a change to the set of ingress keys that must re-reconcile.
fn affected_keys<C, R, E>(ctx: &EngineContext<C, R, E>, change: &Change) -> HashSet<ResourceKey>
where
    C: ObjectCache,
{
    match change.kind {
        WatchedKind::Ingress => HashSet::from([change.key.clone()]),
        WatchedKind::Service => ctx
            .registry
            .parents_of(DependencyKind::Service, &change.key),
        WatchedKind::Secret => ctx.registry.parents_of(DependencyKind::Secret, &change.key),
        WatchedKind::RoutingClass => {
            // Every ingress naming this class explicitly, plus every
            // class-less ingress: default-class adoption depends on the set
            // of default-flagged classes, not on any single one.
            let mut keys = ctx
                .registry
                .parents_of(DependencyKind::RoutingClass, &change.key);
            for ingress in ctx.cache.ingresses() {
                let declared = ingress
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.ingress_class_name.as_deref());
                if declared.is_none() || declared == Some(change.key.name.as_str()) {
                    keys.insert(ResourceKey::from_object(&*ingress));
                }
            }
            keys
        }
    }
}

fn schedule<C, R, E>(ctx: &Arc<EngineContext<C, R, E>>, key: ResourceKey)
where
    C: ObjectCache,
    R: ProxyReconciler,
    E: EventSink,
{
    {
        let mut inflight = lock(&ctx.inflight);
        if let Some(state) = inflight.get_mut(&key) {
            state.pending = true;
            return;
        }
        inflight.insert(key.clone(), KeyState { pending: false });
    }

    let ctx = Arc::clone(ctx);
    tokio::spawn(run_key(ctx, key));
}

async fn run_key<C, R, E>(ctx: Arc<EngineContext<C, R, E>>, key: ResourceKey)
where
    C: ObjectCache,
    R: ProxyReconciler,
    E: EventSink,
{
    let Ok(_permit) = ctx.workers.acquire().await else {
        return;
    };

    loop {
        match reconcile::reconcile_key(&ctx, &key).await {
            Ok(outcome) => {
                ctx.clear_retries(&key);
                debug!("Reconciled {}: {:?}", key, outcome);
            }
            Err(err) => {
                let delay = ctx.next_retry_delay(&key);
                if err.is_user_visible() {
                    warn!("Reconciliation of {} failed: {} (retry in {:?})", key, err, delay);
                    ctx.events.warn(&key, err.reason(), err.to_string()).await;
                } else {
                    debug!("Reconciliation of {} failed: {} (retry in {:?})", key, err, delay);
                }

                let requeue = ctx.requeue.clone();
                let retry_key = key.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    requeue
                        .notify(Change {
                            kind: WatchedKind::Ingress,
                            key: retry_key,
                        })
                        .await;
                });
            }
        }

        let mut inflight = lock(&ctx.inflight);
        match inflight.get_mut(&key) {
            // Coalesced notifications: run one more pass against fresh state.
            Some(state) if state.pending => state.pending = false,
            _ => {
                inflight.remove(&key);
                break;
            }
        }
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
