// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod adoption;
pub mod builder;
pub mod cache;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod proxy;

#[cfg(test)]
pub mod test_utils;
