// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider side of a reconciliation pass.
//!
//! - [`merge_changes`] groups endpoints of one change class by name into provider
//!   [`Resource`]s, concatenating their targets.
//! - [`ProviderClient`] is the write/list capability of a DNS backend;
//!   [`shaman::ShamanClient`] implements it over HTTP.
//! - [`ShamanProvider`] drives an apply: creates, then deletes, then the new side of
//!   updates, then the old side, stopping at the first failed write. In dry-run mode
//!   nothing is written. The post-apply hook sees the full change batch on every
//!   exit path.
//!
//! # Example
//!
//! ```rust
//! use dnsbridge::endpoint::{Endpoint, RecordType};
//! use dnsbridge::provider::merge_changes;
//!
//! let merged = merge_changes(&[
//!     Endpoint::new("x.example.com", RecordType::A, ["1.1.1.1"]),
//!     Endpoint::new("x.example.com", RecordType::A, ["2.2.2.2"]),
//! ]);
//! assert_eq!(merged.len(), 1);
//! assert_eq!(merged[0].records.len(), 2);
//! ```

pub mod shaman;

use crate::constants::RECORD_CLASS_IN;
use crate::endpoint::{Endpoint, RecordType};
use crate::errors::ProviderError;
use crate::plan::Changes;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// One record of a provider [`Resource`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// TTL in seconds; omitted to let the provider decide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Record class, always `IN`
    #[serde(default)]
    pub class: String,
    /// Record type (`A`, `CNAME`, `SRV`, ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record target
    pub address: String,
}

/// All records of one domain, as the provider stores them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Fully-qualified domain name
    pub domain: String,
    /// Records of the domain
    #[serde(default)]
    pub records: Vec<ProviderRecord>,
}

impl Resource {
    fn push_endpoint(&mut self, ep: &Endpoint) {
        let records = ep.targets.iter().map(|target| ProviderRecord {
            ttl: ep.record_ttl,
            class: RECORD_CLASS_IN.to_string(),
            record_type: ep.record_type.to_string(),
            address: target.clone(),
        });
        self.records.extend(records);
    }
}

/// Group endpoints by name into one resource per name.
///
/// Records keep the order of their endpoints and duplicate targets are preserved.
/// Resources are returned ordered by lower-cased name; the domain is spelled as in
/// the first endpoint of the group.
#[must_use]
pub fn merge_changes(endpoints: &[Endpoint]) -> Vec<Resource> {
    let mut grouped: BTreeMap<String, Resource> = BTreeMap::new();
    for ep in endpoints {
        grouped
            .entry(ep.comparable_name())
            .or_insert_with(|| Resource {
                domain: ep.dns_name.clone(),
                records: Vec::new(),
            })
            .push_endpoint(ep);
    }
    grouped.into_values().collect()
}

/// Expand provider resources into endpoints, one per `(domain, type)`.
#[must_use]
pub fn resources_to_endpoints(resources: &[Resource]) -> Vec<Endpoint> {
    let mut endpoints: Vec<Endpoint> = Vec::new();
    for resource in resources {
        let first = endpoints.len();
        for record in &resource.records {
            let Ok(record_type) = RecordType::from_str(&record.record_type) else {
                debug!(
                    domain = %resource.domain,
                    record_type = %record.record_type,
                    "Ignoring record of unsupported type"
                );
                continue;
            };

            match endpoints[first..]
                .iter_mut()
                .find(|ep| ep.record_type == record_type)
            {
                Some(ep) => ep.targets.push(record.address.clone()),
                None => endpoints.push(
                    Endpoint::new(&resource.domain, record_type, [record.address.clone()])
                        .with_ttl(record.ttl.filter(|ttl| *ttl > 0)),
                ),
            }
        }
    }
    endpoints
}

/// Write and list capability of a DNS backend.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Create a domain with its records.
    async fn create(&self, resource: &Resource) -> Result<(), ProviderError>;

    /// Replace the records of a domain.
    async fn update(&self, resource: &Resource) -> Result<(), ProviderError>;

    /// Remove a domain and all its records.
    async fn delete(&self, domain: &str) -> Result<(), ProviderError>;

    /// Every domain the backend holds.
    async fn list(&self) -> Result<Vec<Resource>, ProviderError>;
}

/// Callback observing every change batch passed to [`ShamanProvider::apply_changes`].
pub type ApplyHook = Arc<dyn Fn(&Changes) + Send + Sync>;

/// Runs the hook when dropped, so it fires on every exit path of an apply.
struct HookGuard<'a> {
    hook: &'a (dyn Fn(&Changes) + Send + Sync),
    changes: &'a Changes,
}

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        (self.hook)(self.changes);
    }
}

/// Log every change of a batch at `info`.
pub fn log_changes(changes: &Changes) {
    for ep in &changes.create {
        info!("CREATE: {ep}");
    }
    for ep in &changes.update_old {
        info!("UPDATE (old): {ep}");
    }
    for ep in &changes.update_new {
        info!("UPDATE (new): {ep}");
    }
    for ep in &changes.delete {
        info!("DELETE: {ep}");
    }
}

/// Write operation issued for one merged resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Create,
    Delete,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
        })
    }
}

/// Apply driver for the Shaman DNS backend.
pub struct ShamanProvider {
    client: Arc<dyn ProviderClient>,
    dry_run: bool,
    on_apply_changes: ApplyHook,
}

impl ShamanProvider {
    /// Driver writing through `client`, with a no-op hook.
    #[must_use]
    pub fn new(client: Arc<dyn ProviderClient>) -> Self {
        Self {
            client,
            dry_run: false,
            on_apply_changes: Arc::new(|_: &Changes| {}),
        }
    }

    /// Compute changes without writing them.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Install the post-apply hook.
    #[must_use]
    pub fn with_apply_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Changes) + Send + Sync + 'static,
    {
        self.on_apply_changes = Arc::new(hook);
        self
    }

    /// Install [`log_changes`] as the post-apply hook.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.with_apply_hook(log_changes)
    }

    /// Whether writes are skipped.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Current provider state as endpoints.
    ///
    /// # Errors
    ///
    /// Returns the error of the list request.
    pub async fn records(&self) -> Result<Vec<Endpoint>, ProviderError> {
        let resources = self.client.list().await?;
        let endpoints = resources_to_endpoints(&resources);
        debug!(
            domains = resources.len(),
            endpoints = endpoints.len(),
            "Listed provider records"
        );
        Ok(endpoints)
    }

    /// Apply a change batch in the order create, delete, update (new), update (old).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Apply`] for the first failed write; nothing after it
    /// is attempted and earlier writes are kept.
    pub async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError> {
        let _hook = HookGuard {
            hook: self.on_apply_changes.as_ref(),
            changes,
        };

        if self.dry_run {
            debug!("Dry run, skipping provider writes");
            return Ok(());
        }

        let steps = [
            (Operation::Create, &changes.create),
            (Operation::Delete, &changes.delete),
            (Operation::Update, &changes.update_new),
            (Operation::Update, &changes.update_old),
        ];
        for (operation, endpoints) in steps {
            for resource in merge_changes(endpoints) {
                self.write(operation, &resource).await?;
            }
        }

        Ok(())
    }

    async fn write(&self, operation: Operation, resource: &Resource) -> Result<(), ProviderError> {
        let result = match operation {
            Operation::Create => self.client.create(resource).await,
            Operation::Delete => self.client.delete(&resource.domain).await,
            Operation::Update => self.client.update(resource).await,
        };

        result.map_err(|err| ProviderError::Apply {
            operation: operation.to_string(),
            domain: resource.domain.clone(),
            source: Box::new(err),
        })
    }
}
