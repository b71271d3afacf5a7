// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decides whether this controller instance owns an ingress.
//!
//! An ingress naming a routing class explicitly is ours iff that class exists
//! and declares our authority. A class-less ingress is ours iff exactly one
//! class is flagged as the cluster default and declares our authority; more
//! than one such class is an ambiguous configuration and is surfaced as an
//! error rather than resolved by guessing.

use crate::constants::DEFAULT_CLASS_ANNOTATION;
use crate::error::{Result, SignpostError};
use crate::model::key::ResourceKey;
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube::ResourceExt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adoption {
    /// Owned by this controller, via the given routing class.
    Adopted { class: ResourceKey },
    Unadopted,
}

pub fn resolve(
    ingress: &Ingress,
    classes: &[Arc<IngressClass>],
    authority: &str,
) -> Result<Adoption> {
    let declared = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref());

    match declared {
        Some(name) => {
            let matches = classes
                .iter()
                .any(|c| c.name_any() == name && controller_of(c) == Some(authority));
            if matches {
                Ok(Adoption::Adopted {
                    class: ResourceKey::cluster(name),
                })
            } else {
                Ok(Adoption::Unadopted)
            }
        }
        None => {
            let mut defaults: Vec<String> = classes
                .iter()
                .filter(|c| is_default(c) && controller_of(c) == Some(authority))
                .map(|c| c.name_any())
                .collect();

            match defaults.len() {
                0 => Ok(Adoption::Unadopted),
                1 => Ok(Adoption::Adopted {
                    class: ResourceKey::cluster(defaults.remove(0)),
                }),
                _ => {
                    defaults.sort();
                    Err(SignpostError::AmbiguousDefaultClass {
                        authority: authority.to_string(),
                        classes: defaults,
                    })
                }
            }
        }
    }
}

fn controller_of(class: &IngressClass) -> Option<&str> {
    class.spec.as_ref().and_then(|spec| spec.controller.as_deref())
}

fn is_default(class: &IngressClass) -> bool {
    class
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(DEFAULT_CLASS_ANNOTATION))
        .is_some_and(|v| v == "true")
}
