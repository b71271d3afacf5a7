// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Annotation suffixes understood on Ingress objects, keyed under the
/// configured annotation prefix.
pub mod annotations {
    /// When "true", upstream traffic to backend services uses HTTPS
    pub const SECURE_UPSTREAM: &str = "secure_upstream";
    /// Names a secret holding a custom CA bundle for verifying upstreams
    pub const TLS_CUSTOM_CA_SECRET: &str = "tls_custom_ca_secret";
    /// Names a secret holding the client certificate presented to upstreams
    pub const TLS_CLIENT_SECRET: &str = "tls_client_secret";
    /// Names a secret holding the CA for verifying downstream client certificates
    pub const TLS_DOWNSTREAM_CLIENT_CA_SECRET: &str = "tls_downstream_client_ca_secret";

    /// Annotations whose value names a secret to include in the snapshot.
    /// These secrets are fetched like spec TLS secrets but carry arbitrary
    /// types (a CA bundle is typically Opaque).
    pub const TLS_SECRET_REFS: [&str; 3] = [
        TLS_CUSTOM_CA_SECRET,
        TLS_CLIENT_SECRET,
        TLS_DOWNSTREAM_CLIENT_CA_SECRET,
    ];
}

/// Standard annotation marking an IngressClass as the cluster default
pub const DEFAULT_CLASS_ANNOTATION: &str = "ingressclass.kubernetes.io/is-default-class";

/// Controller name used for event reporting
pub const CONTROLLER_NAME: &str = "signpost";

/// Retry backoff for failed reconciliation passes
pub mod backoff {
    /// Delay after the first failure, in milliseconds
    pub const BASE_MS: u64 = 500;
    /// Cap on the exponential backoff, in seconds
    pub const MAX_SECS: u64 = 60;
}

/// Defaults for optional configuration
pub mod defaults {
    /// Authority string matched against IngressClass spec.controller
    pub const CONTROLLER_AUTHORITY: &str = "signpost.io/ingress-controller";
    /// Prefix for signpost annotations on Ingress objects
    pub const ANNOTATION_PREFIX: &str = "ingress.signpost.io";
    /// Worker pool size
    pub const WORKERS: usize = 4;
}
