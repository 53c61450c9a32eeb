// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway configuration stores.
//!
//! The gateway source reads its configuration objects through the
//! [`GatewayConfigStore`] capability instead of a single Kubernetes kind:
//!
//! - [`KubeGatewayStore`] lists Istio `Gateway` resources from the API server.
//! - [`VersionedConfigStore`] keeps objects in memory, keyed by
//!   `(kind, namespace, name)`, and tracks a monotonically increasing revision per
//!   entry in `metadata.resourceVersion` (`"0"` on create, `+1` on every update).
//!
//! # Example
//!
//! ```rust,no_run
//! use dnsbridge::crd::{Gateway, GatewaySpec};
//! use dnsbridge::source::store::VersionedConfigStore;
//!
//! # async fn example() -> Result<(), dnsbridge::errors::StoreError> {
//! let store = VersionedConfigStore::<Gateway>::new();
//! let mut gateway = Gateway::new("public", GatewaySpec::default());
//! gateway.metadata.namespace = Some("default".to_string());
//!
//! assert_eq!(store.create(gateway.clone()).await?, "0");
//! assert_eq!(store.update(gateway).await?, "1");
//! # Ok(())
//! # }
//! ```

use crate::cluster::{list_all_paginated, map_kube_error, scoped_api};
use crate::crd::Gateway;
use crate::errors::{ClusterError, StoreError};
use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client, Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source of gateway configuration objects.
#[async_trait]
pub trait GatewayConfigStore: Send + Sync {
    /// List gateways in `namespace`, or in every namespace when it is empty.
    async fn list_gateways(&self, namespace: &str) -> Result<Vec<Gateway>, ClusterError>;
}

/// [`GatewayConfigStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeGatewayStore {
    client: Client,
}

impl KubeGatewayStore {
    /// Wrap a Kubernetes client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GatewayConfigStore for KubeGatewayStore {
    async fn list_gateways(&self, namespace: &str) -> Result<Vec<Gateway>, ClusterError> {
        let api: Api<Gateway> = scoped_api(&self.client, namespace);
        list_all_paginated(&api, ListParams::default())
            .await
            .map_err(|e| map_kube_error("gateways", e))
    }
}

/// Composite key of a stored entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct EntryKey {
    kind: String,
    namespace: String,
    name: String,
}

/// In-memory store of configuration objects with per-entry revisions.
///
/// Cloning the store yields another handle to the same entries.
#[derive(Clone, Debug)]
pub struct VersionedConfigStore<K> {
    entries: Arc<RwLock<BTreeMap<EntryKey, K>>>,
}

impl<K> Default for VersionedConfigStore<K> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<K> VersionedConfigStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync,
{
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key_of(obj: &K) -> EntryKey {
        EntryKey {
            kind: K::kind(&()).to_string(),
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }

    fn key_for(namespace: &str, name: &str) -> EntryKey {
        EntryKey {
            kind: K::kind(&()).to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    fn not_found(key: EntryKey) -> StoreError {
        StoreError::NotFound {
            kind: key.kind,
            namespace: key.namespace,
            name: key.name,
        }
    }

    /// Store a new entry at revision `"0"` and return the revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the key is taken.
    pub async fn create(&self, mut obj: K) -> Result<String, StoreError> {
        let key = Self::key_of(&obj);
        let mut entries = self.entries.write().await;
        if entries.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: key.kind,
                namespace: key.namespace,
                name: key.name,
            });
        }

        let revision = "0".to_string();
        obj.meta_mut().resource_version = Some(revision.clone());
        entries.insert(key, obj);
        Ok(revision)
    }

    /// Replace an existing entry, bumping its revision by one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under the key, or
    /// [`StoreError::InvalidRevision`] if the stored revision is not a number.
    pub async fn update(&self, mut obj: K) -> Result<String, StoreError> {
        let key = Self::key_of(&obj);
        let mut entries = self.entries.write().await;
        let Some(current) = entries.get(&key) else {
            return Err(Self::not_found(key));
        };

        let stored = current.meta().resource_version.clone().unwrap_or_default();
        let Ok(old) = stored.parse::<u64>() else {
            return Err(StoreError::InvalidRevision {
                kind: key.kind,
                namespace: key.namespace,
                name: key.name,
                revision: stored,
            });
        };

        let revision = (old + 1).to_string();
        obj.meta_mut().resource_version = Some(revision.clone());
        entries.insert(key, obj);
        Ok(revision)
    }

    /// Remove an entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under the key.
    pub async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let key = Self::key_for(namespace, name);
        let mut entries = self.entries.write().await;
        match entries.remove(&key) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(key)),
        }
    }

    /// Fetch one entry.
    pub async fn get(&self, namespace: &str, name: &str) -> Option<K> {
        let key = Self::key_for(namespace, name);
        self.entries.read().await.get(&key).cloned()
    }

    /// All entries in `namespace` (every namespace when empty), ordered by key.
    pub async fn list(&self, namespace: &str) -> Vec<K> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(key, _)| namespace.is_empty() || key.namespace == namespace)
            .map(|(_, obj)| obj.clone())
            .collect()
    }
}

#[async_trait]
impl GatewayConfigStore for VersionedConfigStore<Gateway> {
    async fn list_gateways(&self, namespace: &str) -> Result<Vec<Gateway>, ClusterError> {
        Ok(self.list(namespace).await)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
