// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Canonical DNS record intents.
//!
//! An [`Endpoint`] is one desired `(name, type, targets, ttl)` tuple produced by a
//! source. Endpoints only live for a single synthesis pass: they are handed to the
//! plan and provider, then dropped.
//!
//! # Example
//!
//! ```rust
//! use dnsbridge::endpoint::{Endpoint, RecordType};
//!
//! let ep = Endpoint::new("www.example.com.", RecordType::A, ["192.0.2.1"]).with_ttl(Some(300));
//! assert_eq!(ep.dns_name, "www.example.com");
//! assert_eq!(ep.to_string(), "www.example.com 300 IN A 192.0.2.1");
//! ```

use crate::labels::RESOURCE_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// Free-form endpoint metadata. Always carries [`RESOURCE_LABEL`] once a source is done.
pub type Labels = BTreeMap<String, String>;

/// DNS record types dnsbridge produces or reads back from a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4/IPv6 address record (any IP literal target)
    A,
    /// IPv6 address record (read back from providers only)
    Aaaa,
    /// Canonical name record (any non-IP target)
    Cname,
    /// Mail exchange record (read back from providers only)
    Mx,
    /// Name server record (read back from providers only)
    Ns,
    /// Service locator record (`"priority weight port host"` targets)
    Srv,
    /// Text record
    Txt,
}

impl RecordType {
    /// Wire name of the record type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Ns => "NS",
            Self::Srv => "SRV",
            Self::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "NS" => Ok(Self::Ns),
            "SRV" => Ok(Self::Srv),
            "TXT" => Ok(Self::Txt),
            other => Err(format!("unsupported record type '{other}'")),
        }
    }
}

/// Record type a target string contributes to.
///
/// IP literals (v4 or v6) go to the A record, anything else to the CNAME record.
#[must_use]
pub fn suitable_type(target: &str) -> RecordType {
    if target.parse::<IpAddr>().is_ok() {
        RecordType::A
    } else {
        RecordType::Cname
    }
}

/// Ordered list of record targets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Targets(pub Vec<String>);

impl Targets {
    /// Sort targets lexically so identical input always renders identically.
    pub fn sort(&mut self) {
        self.0.sort();
    }

    /// Sorted copy of the targets.
    #[must_use]
    pub fn sorted(&self) -> Self {
        let mut copy = self.clone();
        copy.sort();
        copy
    }

    /// Whether both lists hold the same targets regardless of order.
    #[must_use]
    pub fn same(&self, other: &Targets) -> bool {
        self.len() == other.len() && self.sorted() == other.sorted()
    }
}

impl Deref for Targets {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Targets {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Targets {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Targets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(";"))
    }
}

/// A single desired DNS record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Fully-qualified name without the trailing dot
    pub dns_name: String,
    /// Record type
    pub record_type: RecordType,
    /// Record targets
    pub targets: Targets,
    /// TTL in seconds; `None` lets the provider decide
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_ttl: Option<u32>,
    /// Metadata for the ownership registry
    #[serde(default)]
    pub labels: Labels,
}

impl Endpoint {
    /// Build an endpoint, stripping a trailing dot from `dns_name`.
    pub fn new<I, S>(dns_name: &str, record_type: RecordType, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dns_name: dns_name.trim_end_matches('.').to_string(),
            record_type,
            targets: targets.into_iter().collect(),
            record_ttl: None,
            labels: Labels::new(),
        }
    }

    /// Set the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<u32>) -> Self {
        self.record_ttl = ttl;
        self
    }

    /// Add one label.
    #[must_use]
    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    /// The `<kind>/<namespace>/<name>` of the producing resource, if stamped.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.labels.get(RESOURCE_LABEL).map(String::as_str)
    }

    /// Name used for comparisons (DNS names are case-insensitive).
    #[must_use]
    pub fn comparable_name(&self) -> String {
        self.dns_name.to_ascii_lowercase()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_ttl {
            Some(ttl) => write!(
                f,
                "{} {} IN {} {}",
                self.dns_name, ttl, self.record_type, self.targets
            ),
            None => write!(
                f,
                "{} IN {} {}",
                self.dns_name, self.record_type, self.targets
            ),
        }
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod endpoint_tests;
