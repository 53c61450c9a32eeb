// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Source aggregator.
//!
//! [`MultiSource`] runs its sources in order, concatenates their endpoints, sorts
//! the targets of every endpoint, and drops endpoints that are structurally
//! identical to one seen earlier. Any failing source fails the whole call: acting on
//! a partial list would delete records that are still wanted.

use crate::endpoint::{Endpoint, RecordType, Targets};
use crate::errors::SourceError;
use crate::source::Source;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

/// Identity used for deduplication; labels do not take part.
#[derive(Hash, PartialEq, Eq)]
struct EndpointKey {
    name: String,
    record_type: RecordType,
    targets: Targets,
    ttl: Option<u32>,
}

impl EndpointKey {
    fn of(ep: &Endpoint) -> Self {
        Self {
            name: ep.comparable_name(),
            record_type: ep.record_type,
            targets: ep.targets.sorted(),
            ttl: ep.record_ttl,
        }
    }
}

/// Sort targets and drop repeated endpoints, keeping the first occurrence.
#[must_use]
pub fn dedup_endpoints(endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(endpoints.len());

    for mut ep in endpoints {
        ep.targets.sort();
        if seen.insert(EndpointKey::of(&ep)) {
            result.push(ep);
        } else {
            debug!(endpoint = %ep, "Dropping duplicate endpoint");
        }
    }

    result
}

/// Composite of several sources.
#[derive(Default)]
pub struct MultiSource {
    sources: Vec<Box<dyn Source>>,
}

impl MultiSource {
    /// Aggregate `sources`, queried in the given order.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        Self { sources }
    }

    /// Number of aggregated sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is aggregated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl Source for MultiSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>, SourceError> {
        let mut all = Vec::new();
        for source in &self.sources {
            all.extend(source.endpoints().await?);
        }

        let total = all.len();
        let result = dedup_endpoints(all);
        debug!(
            sources = self.sources.len(),
            total = total,
            unique = result.len(),
            "Aggregated endpoints"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "multi_tests.rs"]
mod multi_tests;
