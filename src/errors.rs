// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for dnsbridge.
//!
//! This module provides specialized error types for:
//! - Startup configuration (annotation filters, templates, source wiring)
//! - Kubernetes API listing failures, with permission-denied kept distinguishable
//! - Endpoint synthesis from cluster resources
//! - DNS provider HTTP API operations
//!
//! Configuration errors are fatal before the first pass. Everything else aborts the
//! current pass and is retried on the next interval.

use thiserror::Error;

/// Errors detected while validating configuration at startup.
///
/// None of these are retried: the operator has to fix the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The annotation filter is not a valid label selector expression.
    #[error("Invalid annotation filter '{filter}': {reason}")]
    InvalidAnnotationFilter {
        /// The filter expression as configured
        filter: String,
        /// What is wrong with it
        reason: String,
    },

    /// The FQDN template failed to compile.
    #[error("Invalid FQDN template '{template}': {reason}")]
    InvalidTemplate {
        /// The template text as configured
        template: String,
        /// What is wrong with it
        reason: String,
    },

    /// The ingress gateway service reference is not `<namespace>/<name>`.
    #[error("Invalid ingress gateway service '{value}': expected <namespace>/<name>")]
    InvalidGatewayService {
        /// The reference as configured
        value: String,
    },

    /// An unknown legacy compatibility dialect was requested.
    #[error("Unknown compatibility mode '{mode}' (expected one of: mate, molecule)")]
    UnknownCompatibility {
        /// The requested mode
        mode: String,
    },

    /// The provider host is not a usable URL.
    #[error("Invalid provider host '{host}': {reason}")]
    InvalidProviderHost {
        /// The host as configured
        host: String,
        /// What is wrong with it
        reason: String,
    },

    /// No source was configured.
    #[error("At least one source must be configured")]
    NoSources,

    /// The synchronization interval is shorter than one second.
    #[error("Invalid interval {interval}s: must be at least one second")]
    InvalidInterval {
        /// The interval as configured, in seconds
        interval: u64,
    },
}

/// Errors returned by the cluster client when listing resources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The controller is not allowed to list the resource (HTTP 403).
    ///
    /// Kept separate so that a missing permission to list nodes can degrade to
    /// "no node targets" instead of failing the pass.
    #[error("Forbidden to list {resource}: {message}")]
    Forbidden {
        /// Resource kind that was being listed
        resource: String,
        /// Message returned by the API server
        message: String,
    },

    /// Any other failure talking to the API server.
    #[error("Failed to list {resource}: {reason}")]
    Transport {
        /// Resource kind that was being listed
        resource: String,
        /// Underlying failure
        reason: String,
    },

    /// A single named resource that must exist was not found.
    #[error("{resource} '{namespace}/{name}' not found")]
    NotFound {
        /// Resource kind
        resource: String,
        /// Namespace of the resource
        namespace: String,
        /// Name of the resource
        name: String,
    },
}

impl ClusterError {
    /// Whether this error is a permission-denied response.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

/// Errors that abort an adapter run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Listing cluster resources failed.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Problems with individual annotation values.
///
/// These never abort synthesis; callers log them and fall back to defaults.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// The TTL annotation is not an integer in the accepted range.
    #[error("\"{value}\" is not a valid TTL value: {reason}")]
    InvalidTtl {
        /// The annotation value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors from the DNS provider API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-success status code.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Response body, if any
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("Failed to send request to {url}: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// The response body was not the expected JSON document.
    #[error("Failed to decode response from {url}: {reason}")]
    Decode {
        /// Requested URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// The request URL could not be built.
    #[error("Invalid provider URL: {reason}")]
    InvalidUrl {
        /// Underlying failure
        reason: String,
    },

    /// A write for one domain failed while applying changes.
    #[error("Failed to {operation} records of {domain}: {source}")]
    Apply {
        /// `create`, `delete` or `update`
        operation: String,
        /// Domain being written
        domain: String,
        /// The failed request
        #[source]
        source: Box<ProviderError>,
    },
}

/// Errors from the in-memory versioned configuration store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An entry with the same key is already stored.
    #[error("{kind} '{namespace}/{name}' already exists")]
    AlreadyExists {
        /// Kind of the entry
        kind: String,
        /// Namespace of the entry
        namespace: String,
        /// Name of the entry
        name: String,
    },

    /// No entry is stored under the key.
    #[error("{kind} '{namespace}/{name}' does not exist")]
    NotFound {
        /// Kind of the entry
        kind: String,
        /// Namespace of the entry
        namespace: String,
        /// Name of the entry
        name: String,
    },

    /// The stored revision is not a number.
    #[error("Invalid revision '{revision}' for {kind} '{namespace}/{name}'")]
    InvalidRevision {
        /// Kind of the entry
        kind: String,
        /// Namespace of the entry
        namespace: String,
        /// Name of the entry
        name: String,
        /// The revision that failed to parse
        revision: String,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
