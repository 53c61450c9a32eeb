// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Legacy annotation dialects for services.
//!
//! Services written for older DNS controllers name their hostnames with other
//! annotations. When a dialect is configured and a service produced no endpoints
//! from the standard annotations, the dialect is consulted:
//!
//! - `mate`: the hostname is the `zalando.org/dnsname` annotation.
//! - `molecule`: only services labelled `dns=route53`; hostnames are the
//!   comma-separated `domainName` annotation.
//!
//! In both dialects the targets are the service's load-balancer addresses.

use crate::endpoint::Endpoint;
use crate::errors::ConfigError;
use crate::labels::{
    MATE_DNSNAME_ANNOTATION, MOLECULE_DNS_LABEL, MOLECULE_DNS_LABEL_VALUE,
    MOLECULE_DOMAIN_ANNOTATION,
};
use crate::source::{endpoints_for_hostname, load_balancer_targets};
use k8s_openapi::api::core::v1::Service;
use std::fmt;
use std::str::FromStr;

/// A legacy annotation dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compatibility {
    /// Zalando mate
    Mate,
    /// Molecule Software route53-kubernetes
    Molecule,
}

impl Compatibility {
    /// Flag value naming the dialect.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mate => "mate",
            Self::Molecule => "molecule",
        }
    }

    /// Parse an optional dialect; the empty string disables compatibility.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCompatibility`] for any other unknown value.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, ConfigError> {
        if value.trim().is_empty() {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compatibility {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mate" => Ok(Self::Mate),
            "molecule" => Ok(Self::Molecule),
            other => Err(ConfigError::UnknownCompatibility {
                mode: other.to_string(),
            }),
        }
    }
}

/// Endpoints for a service written in a legacy dialect.
#[must_use]
pub fn legacy_endpoints(svc: &Service, mode: Compatibility, ttl: Option<u32>) -> Vec<Endpoint> {
    let hostnames = match mode {
        Compatibility::Mate => mate_hostnames(svc),
        Compatibility::Molecule => molecule_hostnames(svc),
    };
    if hostnames.is_empty() {
        return Vec::new();
    }

    let targets = load_balancer_targets(
        svc.status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .into_iter()
            .flatten()
            .map(|i| (i.ip.as_ref(), i.hostname.as_ref())),
    );

    hostnames
        .iter()
        .flat_map(|hostname| endpoints_for_hostname(hostname, &targets, ttl))
        .collect()
}

fn mate_hostnames(svc: &Service) -> Vec<String> {
    svc.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(MATE_DNSNAME_ANNOTATION))
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .map(|h| vec![h.to_string()])
        .unwrap_or_default()
}

fn molecule_hostnames(svc: &Service) -> Vec<String> {
    let labelled = svc
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(MOLECULE_DNS_LABEL))
        .is_some_and(|v| v == MOLECULE_DNS_LABEL_VALUE);
    if !labelled {
        return Vec::new();
    }

    svc.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(MOLECULE_DOMAIN_ANNOTATION))
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "compat_tests.rs"]
mod compat_tests;
