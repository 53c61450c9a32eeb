// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service adapter.
//!
//! Targets depend on how a service is exposed:
//!
//! - `LoadBalancer`: the IPs and hostnames in the load-balancer status.
//! - `ClusterIP`: the cluster IP when internal publishing is enabled. Headless
//!   services (`clusterIP: None`) instead get one `A` record per running backing pod,
//!   named `<pod hostname>.<service hostname>`, pointing at the pod IP (or host IP).
//! - `NodePort`: the node addresses (external preferred over internal), plus one
//!   `SRV` record per node port at `_<port name>._<protocol>.<hostname>` with target
//!   `0 50 <node port> <hostname>`.
//!
//! Being forbidden to list nodes is not an error: node-port services then simply
//! produce no records.

use crate::cluster::ClusterClient;
use crate::constants::{
    CLUSTER_IP_NONE, DEFAULT_PORT_PROTOCOL, KIND_SERVICE, NODE_EXTERNAL_IP, NODE_INTERNAL_IP,
    POD_PHASE_RUNNING, SERVICE_TYPE_CLUSTER_IP, SERVICE_TYPE_LOAD_BALANCER,
    SERVICE_TYPE_NODE_PORT, SRV_PRIORITY, SRV_WEIGHT,
};
use crate::endpoint::{Endpoint, RecordType, Targets};
use crate::errors::{ClusterError, SourceError};
use crate::source::compat::legacy_endpoints;
use crate::source::{
    endpoints_for_hostname, finish_resource, hostnames_from_annotations, is_selected,
    load_balancer_targets, resource_ttl, targets_from_annotation, template_hostnames, Source,
    SourceConfig,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Service};
use std::sync::Arc;
use tracing::debug;

/// Endpoint source for Kubernetes services.
pub struct ServiceSource {
    client: Arc<dyn ClusterClient>,
    config: SourceConfig,
}

impl ServiceSource {
    /// Create a service source reading through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>, config: SourceConfig) -> Self {
        Self { client, config }
    }

    fn type_selected(&self, svc: &Service) -> bool {
        self.config.service_type_filter.is_empty()
            || self
                .config
                .service_type_filter
                .contains(service_type(svc))
    }

    /// Addresses of all nodes, external ones preferred.
    async fn node_targets(&self) -> Result<Targets, ClusterError> {
        match self.client.list_nodes().await {
            Ok(nodes) => Ok(node_addresses(&nodes)),
            Err(err) if err.is_forbidden() => {
                debug!(
                    error = %err,
                    "Unable to list nodes (forbidden), NodePort services will be skipped"
                );
                Ok(Targets::default())
            }
            Err(err) => Err(err),
        }
    }

    async fn service_endpoints(
        &self,
        svc: &Service,
        node_targets: &Targets,
    ) -> Result<Vec<Endpoint>, SourceError> {
        let ttl = resource_ttl(&svc.metadata);
        let annotations = svc.metadata.annotations.clone().unwrap_or_default();

        let mut endpoints: Vec<Endpoint> = Vec::new();
        for hostname in hostnames_from_annotations(&annotations) {
            let generated = self
                .generate_endpoints(svc, &hostname, node_targets, ttl)
                .await?;
            endpoints.extend(generated);
        }

        if endpoints.is_empty() {
            if let Some(mode) = self.config.compatibility {
                endpoints = legacy_endpoints(svc, mode, ttl);
            }
        }

        if let Some(template) = &self.config.fqdn_template {
            if self.config.combine_fqdn_annotation || endpoints.is_empty() {
                let mut templated: Vec<Endpoint> = Vec::new();
                for hostname in template_hostnames(template, KIND_SERVICE, &svc.metadata) {
                    let generated = self
                        .generate_endpoints(svc, &hostname, node_targets, ttl)
                        .await?;
                    templated.extend(generated);
                }
                if self.config.combine_fqdn_annotation {
                    endpoints.extend(templated);
                } else {
                    endpoints = templated;
                }
            }
        }

        Ok(finish_resource(KIND_SERVICE, &svc.metadata, endpoints))
    }

    /// All records one hostname yields for a service.
    async fn generate_endpoints(
        &self,
        svc: &Service,
        hostname: &str,
        node_targets: &Targets,
        ttl: Option<u32>,
    ) -> Result<Vec<Endpoint>, ClusterError> {
        let hostname = hostname.trim_end_matches('.');
        let mut endpoints: Vec<Endpoint> = Vec::new();

        let native = match service_type(svc) {
            SERVICE_TYPE_LOAD_BALANCER => load_balancer_targets(
                svc.status
                    .as_ref()
                    .and_then(|s| s.load_balancer.as_ref())
                    .and_then(|lb| lb.ingress.as_ref())
                    .into_iter()
                    .flatten()
                    .map(|i| (i.ip.as_ref(), i.hostname.as_ref())),
            ),
            SERVICE_TYPE_CLUSTER_IP => {
                if is_headless(svc) {
                    endpoints.extend(self.headless_endpoints(svc, hostname, ttl).await?);
                }
                if self.config.publish_internal {
                    cluster_ip_targets(svc)
                } else {
                    Targets::default()
                }
            }
            SERVICE_TYPE_NODE_PORT => {
                if !node_targets.is_empty() {
                    endpoints.extend(node_port_endpoints(svc, hostname, ttl));
                }
                node_targets.clone()
            }
            _ => Targets::default(),
        };

        let overridden = svc
            .metadata
            .annotations
            .as_ref()
            .map(targets_from_annotation)
            .unwrap_or_default();
        let targets = if overridden.is_empty() {
            native
        } else {
            overridden
        };

        endpoints.extend(endpoints_for_hostname(hostname, &targets, ttl));
        Ok(endpoints)
    }

    /// One `A` record per running pod behind a headless service.
    async fn headless_endpoints(
        &self,
        svc: &Service,
        hostname: &str,
        ttl: Option<u32>,
    ) -> Result<Vec<Endpoint>, ClusterError> {
        let selector = svc
            .spec
            .as_ref()
            .and_then(|s| s.selector.clone())
            .unwrap_or_default();
        if selector.is_empty() {
            debug!(
                name = svc.metadata.name.as_deref().unwrap_or_default(),
                "Headless service has no pod selector"
            );
            return Ok(Vec::new());
        }

        let namespace = svc.metadata.namespace.as_deref().unwrap_or_default();
        let pods = self.client.list_pods(namespace, &selector).await?;

        let mut endpoints = Vec::new();
        for pod in pods {
            let pod_name = pod.metadata.name.as_deref().unwrap_or_default();
            let status = pod.status.as_ref();
            if status.and_then(|s| s.phase.as_deref()) != Some(POD_PHASE_RUNNING) {
                debug!(pod = pod_name, "Pod is not in running phase");
                continue;
            }

            let address = if self.config.publish_host_ip {
                status.and_then(|s| s.host_ip.as_deref())
            } else {
                status.and_then(|s| s.pod_ip.as_deref())
            };
            let Some(address) = address.filter(|a| !a.is_empty()) else {
                debug!(pod = pod_name, "Pod has no address yet");
                continue;
            };

            let domain = match pod.spec.as_ref().and_then(|s| s.hostname.as_deref()) {
                Some(pod_hostname) if !pod_hostname.is_empty() => {
                    format!("{pod_hostname}.{hostname}")
                }
                _ => hostname.to_string(),
            };

            debug!(domain = %domain, address = address, "Generating headless endpoint");
            let endpoint = Endpoint::new(&domain, RecordType::A, [address]);
            endpoints.push(endpoint.with_ttl(ttl));
        }

        Ok(endpoints)
    }
}

#[async_trait]
impl Source for ServiceSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>, SourceError> {
        let services: Vec<Service> = self
            .client
            .list_services(&self.config.namespace)
            .await?
            .into_iter()
            .filter(|svc| self.type_selected(svc))
            .filter(|svc| is_selected(&self.config, KIND_SERVICE, &svc.metadata))
            .collect();

        let node_targets = if services
            .iter()
            .any(|svc| service_type(svc) == SERVICE_TYPE_NODE_PORT)
        {
            self.node_targets().await?
        } else {
            Targets::default()
        };

        let mut endpoints = Vec::new();
        for svc in &services {
            endpoints.extend(self.service_endpoints(svc, &node_targets).await?);
        }
        Ok(endpoints)
    }
}

/// `spec.type`, defaulting to `ClusterIP`.
fn service_type(svc: &Service) -> &str {
    svc.spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        .unwrap_or(SERVICE_TYPE_CLUSTER_IP)
}

fn cluster_ip(svc: &Service) -> Option<&str> {
    svc.spec.as_ref().and_then(|s| s.cluster_ip.as_deref())
}

fn is_headless(svc: &Service) -> bool {
    cluster_ip(svc) == Some(CLUSTER_IP_NONE)
}

fn cluster_ip_targets(svc: &Service) -> Targets {
    match cluster_ip(svc) {
        Some(ip) if !ip.is_empty() && ip != CLUSTER_IP_NONE => [ip].into_iter().collect(),
        _ => Targets::default(),
    }
}

/// External node addresses, or internal ones if no node reports an external address.
fn node_addresses(nodes: &[Node]) -> Targets {
    let mut external = Targets::default();
    let mut internal = Targets::default();

    let addresses = nodes
        .iter()
        .filter_map(|n| n.status.as_ref().and_then(|s| s.addresses.as_ref()))
        .flatten();
    for address in addresses {
        match address.type_.as_str() {
            NODE_EXTERNAL_IP => external.push(address.address.clone()),
            NODE_INTERNAL_IP => internal.push(address.address.clone()),
            _ => {}
        }
    }

    if external.is_empty() {
        internal
    } else {
        external
    }
}

/// `SRV` records for every node port of a service.
fn node_port_endpoints(svc: &Service, hostname: &str, ttl: Option<u32>) -> Vec<Endpoint> {
    let ports = svc.spec.as_ref().and_then(|s| s.ports.as_ref());

    ports
        .into_iter()
        .flatten()
        .filter_map(|port| {
            let node_port = port.node_port.filter(|p| *p > 0)?;
            let port_name = match port.name.as_deref() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => node_port.to_string(),
            };
            let protocol = match port.protocol.as_deref() {
                Some(protocol) if !protocol.is_empty() => protocol.to_ascii_lowercase(),
                _ => DEFAULT_PORT_PROTOCOL.to_string(),
            };

            let name = format!("_{port_name}._{protocol}.{hostname}");
            let target = format!("{SRV_PRIORITY} {SRV_WEIGHT} {node_port} {hostname}");
            let endpoint = Endpoint::new(&name, RecordType::Srv, [target]);
            Some(endpoint.with_ttl(ttl))
        })
        .collect()
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
