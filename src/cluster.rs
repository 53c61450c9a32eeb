// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-only access to the cluster resources sources synthesize records from.
//!
//! Sources depend on the [`ClusterClient`] capability rather than on `kube::Client`
//! directly. [`KubeClusterClient`] is the production implementation; it lists
//! resources page by page. [`InMemoryCluster`] serves a fixed snapshot and is used
//! by tests and local experiments.
//!
//! An empty namespace means "all namespaces" everywhere in this module.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use crate::errors::ClusterError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

/// Listing capability consumed by the sources.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List services in a namespace.
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ClusterError>;

    /// Fetch one service, `None` if it does not exist.
    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, ClusterError>;

    /// List ingresses in a namespace.
    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, ClusterError>;

    /// List all nodes.
    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError>;

    /// List pods in a namespace matching every `selector` label.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, ClusterError>;
}

/// Render a label map as a selector string (`a=b,c=d`).
#[must_use]
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Map a kube error into a [`ClusterError`], keeping 403 distinguishable.
#[must_use]
pub fn map_kube_error(resource: &str, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(ae) if ae.code == 403 => ClusterError::Forbidden {
            resource: resource.to_string(),
            message: ae.message,
        },
        other => ClusterError::Transport {
            resource: resource.to_string(),
            reason: other.to_string(),
        },
    }
}

/// API handle scoped to a namespace, or cluster-wide for the empty namespace.
pub(crate) fn scoped_api<K>(client: &Client, namespace: &str) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
{
    if namespace.is_empty() {
        Api::all(client.clone())
    } else {
        Api::namespaced(client.clone(), namespace)
    }
}

/// List all resources with automatic pagination.
///
/// Fetches resources in pages of [`KUBE_LIST_PAGE_SIZE`] to keep memory usage and
/// API server load bounded on large clusters.
///
/// # Errors
///
/// Returns the first error reported by the API server.
pub async fn list_all_paginated<K>(
    api: &Api<K>,
    mut list_params: ListParams,
) -> Result<Vec<K>, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = api.list(&list_params).await?;

        let item_count = result.items.len();
        all_items.extend(result.items);

        debug!(
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(token) if !token.is_empty() => list_params.continue_token = Some(token),
            _ => break,
        }
    }

    Ok(all_items)
}

/// [`ClusterClient`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Wrap a Kubernetes client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ClusterError> {
        let api: Api<Service> = scoped_api(&self.client, namespace);
        list_all_paginated(&api, ListParams::default())
            .await
            .map_err(|e| map_kube_error("services", e))
    }

    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, ClusterError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| map_kube_error("services", e))
    }

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, ClusterError> {
        let api: Api<Ingress> = scoped_api(&self.client, namespace);
        list_all_paginated(&api, ListParams::default())
            .await
            .map_err(|e| map_kube_error("ingresses", e))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        let api: Api<Node> = Api::all(self.client.clone());
        list_all_paginated(&api, ListParams::default())
            .await
            .map_err(|e| map_kube_error("nodes", e))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, ClusterError> {
        let api: Api<Pod> = scoped_api(&self.client, namespace);
        let params = ListParams::default().labels(&selector_string(selector));
        list_all_paginated(&api, params)
            .await
            .map_err(|e| map_kube_error("pods", e))
    }
}

/// [`ClusterClient`] serving a fixed resource snapshot.
///
/// Listing can be made to fail per resource kind to exercise error paths.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCluster {
    services: Vec<Service>,
    ingresses: Vec<Ingress>,
    nodes: Vec<Node>,
    pods: Vec<Pod>,
    failures: BTreeMap<String, ClusterError>,
}

impl InMemoryCluster {
    /// Empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add services to the snapshot.
    #[must_use]
    pub fn with_services(mut self, services: impl IntoIterator<Item = Service>) -> Self {
        self.services.extend(services);
        self
    }

    /// Add ingresses to the snapshot.
    #[must_use]
    pub fn with_ingresses(mut self, ingresses: impl IntoIterator<Item = Ingress>) -> Self {
        self.ingresses.extend(ingresses);
        self
    }

    /// Add nodes to the snapshot.
    #[must_use]
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Add pods to the snapshot.
    #[must_use]
    pub fn with_pods(mut self, pods: impl IntoIterator<Item = Pod>) -> Self {
        self.pods.extend(pods);
        self
    }

    /// Make listing `resource` (`services`, `ingresses`, `nodes`, `pods`) fail.
    #[must_use]
    pub fn with_failure(mut self, resource: &str, error: ClusterError) -> Self {
        self.failures.insert(resource.to_string(), error);
        self
    }

    fn check(&self, resource: &str) -> Result<(), ClusterError> {
        match self.failures.get(resource) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn in_namespace<K: ResourceExt>(obj: &K, namespace: &str) -> bool {
    namespace.is_empty() || obj.namespace().as_deref() == Some(namespace)
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ClusterError> {
        self.check("services")?;
        Ok(self
            .services
            .iter()
            .filter(|s| in_namespace(*s, namespace))
            .cloned()
            .collect())
    }

    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, ClusterError> {
        self.check("services")?;
        Ok(self
            .services
            .iter()
            .find(|s| in_namespace(*s, namespace) && s.name_any() == name)
            .cloned())
    }

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, ClusterError> {
        self.check("ingresses")?;
        Ok(self
            .ingresses
            .iter()
            .filter(|i| in_namespace(*i, namespace))
            .cloned()
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        self.check("nodes")?;
        Ok(self.nodes.clone())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, ClusterError> {
        self.check("pods")?;
        Ok(self
            .pods
            .iter()
            .filter(|p| in_namespace(*p, namespace))
            .filter(|p| {
                let labels = p.labels();
                selector.iter().all(|(k, v)| labels.get(k) == Some(v))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
