// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Data model shared between the engine and the proxy reconciler.

pub mod ingress_config;
pub mod key;
pub mod registry;

pub use ingress_config::{IngressConfig, TlsCert};
pub use key::ResourceKey;
pub use registry::{DependencyKind, DependencyRegistry};
