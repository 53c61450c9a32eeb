// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Annotation and label keys read from (and written to) cluster resources.
//!
//! The `external-dns.alpha.kubernetes.io/*` annotation family is the de-facto
//! contract between workloads and DNS controllers, so dnsbridge reads the same keys.

// ============================================================================
// Controller Ownership
// ============================================================================

/// Annotation naming the controller responsible for a resource.
///
/// Resources carrying this annotation with a value other than
/// [`CONTROLLER_ANNOTATION_VALUE`] belong to another tool and are skipped.
pub const CONTROLLER_ANNOTATION: &str = "external-dns.alpha.kubernetes.io/controller";

/// Identity of this controller in [`CONTROLLER_ANNOTATION`].
pub const CONTROLLER_ANNOTATION_VALUE: &str = "dns-controller";

// ============================================================================
// Record Synthesis Annotations
// ============================================================================

/// Comma-separated list of hostnames a resource wants published.
pub const HOSTNAME_ANNOTATION: &str = "external-dns.alpha.kubernetes.io/hostname";

/// Comma-separated list of targets overriding the resource's own addresses.
pub const TARGET_ANNOTATION: &str = "external-dns.alpha.kubernetes.io/target";

/// Record TTL in seconds.
pub const TTL_ANNOTATION: &str = "external-dns.alpha.kubernetes.io/ttl";

// ============================================================================
// Legacy Compatibility Annotations
// ============================================================================

/// Hostname annotation used by the `mate` dialect.
pub const MATE_DNSNAME_ANNOTATION: &str = "zalando.org/dnsname";

/// Comma-separated hostnames annotation used by the `molecule` dialect.
pub const MOLECULE_DOMAIN_ANNOTATION: &str = "domainName";

/// Service label that opts a service into the `molecule` dialect.
pub const MOLECULE_DNS_LABEL: &str = "dns";

/// Required value of [`MOLECULE_DNS_LABEL`].
pub const MOLECULE_DNS_LABEL_VALUE: &str = "route53";

// ============================================================================
// Endpoint Labels
// ============================================================================

/// Endpoint label identifying the resource that produced a record,
/// formatted `<kind>/<namespace>/<name>`.
pub const RESOURCE_LABEL: &str = "resource";
