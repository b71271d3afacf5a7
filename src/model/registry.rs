// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bidirectional index between an ingress and the objects it references.
//!
//! The registry is instantiated once per engine and shared by reference; it
//! answers two questions: "which objects does this ingress depend on?" and,
//! for fan-out, "which ingresses depend on this object?". Registry membership
//! doubles as the adoption record: an ingress with edges has been adopted.
//! Edges are recorded at the start of every pass, before the cache is read,
//! so a dependency event racing a pass still finds its parent.

use crate::model::key::ResourceKey;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// The kinds of objects an ingress can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Service,
    Secret,
    RoutingClass,
}

#[derive(Debug, Default)]
struct Edges {
    /// parent -> kind -> dependencies
    forward: HashMap<ResourceKey, HashMap<DependencyKind, HashSet<ResourceKey>>>,
    /// (kind, dependency) -> parents
    reverse: HashMap<(DependencyKind, ResourceKey), HashSet<ResourceKey>>,
}

#[derive(Debug, Default)]
pub struct DependencyRegistry {
    inner: RwLock<Edges>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the full set of edges of one kind for a parent.
    /// Edges of other kinds for the same parent are untouched.
    pub fn set_edges(
        &self,
        parent: &ResourceKey,
        kind: DependencyKind,
        deps: HashSet<ResourceKey>,
    ) {
        let mut edges = write(&self.inner);

        let slot = edges.forward.entry(parent.clone()).or_default();
        let old = slot.insert(kind, deps.clone()).unwrap_or_default();

        for dropped in old.difference(&deps) {
            unlink(&mut edges.reverse, kind, dropped, parent);
        }
        for dep in deps {
            edges
                .reverse
                .entry((kind, dep))
                .or_default()
                .insert(parent.clone());
        }
    }

    /// Remove every edge for a parent. Used when the parent is deleted or
    /// transitions to unadopted.
    pub fn clear_all(&self, parent: &ResourceKey) {
        let mut edges = write(&self.inner);

        let Some(by_kind) = edges.forward.remove(parent) else {
            return;
        };
        for (kind, deps) in by_kind {
            for dep in deps {
                unlink(&mut edges.reverse, kind, &dep, parent);
            }
        }
    }

    /// All parents currently depending on the given object.
    pub fn parents_of(&self, kind: DependencyKind, dep: &ResourceKey) -> HashSet<ResourceKey> {
        read(&self.inner)
            .reverse
            .get(&(kind, dep.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the parent has any recorded edges, i.e. is adopted.
    pub fn is_tracked(&self, parent: &ResourceKey) -> bool {
        read(&self.inner).forward.contains_key(parent)
    }

    /// The dependencies of one kind currently recorded for a parent. The
    /// builder uses the pre-pass snapshot of these to tell an
    /// internal-consistency cache miss apart from a transient one.
    pub fn deps_of(&self, parent: &ResourceKey, kind: DependencyKind) -> HashSet<ResourceKey> {
        read(&self.inner)
            .forward
            .get(parent)
            .and_then(|by_kind| by_kind.get(&kind))
            .cloned()
            .unwrap_or_default()
    }
}

fn unlink(
    reverse: &mut HashMap<(DependencyKind, ResourceKey), HashSet<ResourceKey>>,
    kind: DependencyKind,
    dep: &ResourceKey,
    parent: &ResourceKey,
) {
    if let Some(parents) = reverse.get_mut(&(kind, dep.clone())) {
        parents.remove(parent);
        if parents.is_empty() {
            reverse.remove(&(kind, dep.clone()));
        }
    }
}

// Lock poisoning only means another worker panicked mid-reconciliation; the
// maps themselves stay valid, so recover rather than unwind the engine.
fn read(lock: &RwLock<Edges>) -> std::sync::RwLockReadGuard<'_, Edges> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write(lock: &RwLock<Edges>) -> std::sync::RwLockWriteGuard<'_, Edges> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
