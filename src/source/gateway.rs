// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway adapter.
//!
//! Works like the ingress adapter, but hostnames come from the server host lists of
//! gateway configuration objects read through a [`GatewayConfigStore`], and all
//! gateways share the targets of one ingress gateway service
//! (`istio-system/istio-ingressgateway` by default).
//!
//! Server hosts may be written `namespace/host`; only `host` is published. The
//! bare wildcard `*` is never published.

use crate::cluster::ClusterClient;
use crate::constants::{KIND_GATEWAY, KIND_SERVICE};
use crate::crd::Gateway;
use crate::endpoint::{Endpoint, Targets};
use crate::errors::{ClusterError, ConfigError, SourceError};
use crate::source::store::GatewayConfigStore;
use crate::source::{
    endpoints_for_hostname, finish_resource, hostnames_from_annotations, is_selected,
    load_balancer_targets, resource_ttl, targets_from_annotation, template_hostnames, Source,
    SourceConfig,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reference to the service fronting the gateways.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayServiceRef {
    /// Namespace of the service
    pub namespace: String,
    /// Name of the service
    pub name: String,
}

impl GatewayServiceRef {
    /// Parse `<namespace>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGatewayService`] if either part is missing.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ConfigError::InvalidGatewayService {
                value: value.to_string(),
            }),
        }
    }
}

/// Endpoint source for gateway configuration objects.
pub struct GatewaySource {
    client: Arc<dyn ClusterClient>,
    store: Arc<dyn GatewayConfigStore>,
    gateway_service: GatewayServiceRef,
    config: SourceConfig,
}

impl GatewaySource {
    /// Create a gateway source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGatewayService`] if `gateway_service` is not
    /// `<namespace>/<name>`.
    pub fn new(
        client: Arc<dyn ClusterClient>,
        store: Arc<dyn GatewayConfigStore>,
        gateway_service: &str,
        config: SourceConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            store,
            gateway_service: GatewayServiceRef::parse(gateway_service)?,
            config,
        })
    }

    /// Load-balancer addresses of the ingress gateway service.
    async fn gateway_targets(&self) -> Result<Targets, ClusterError> {
        let GatewayServiceRef { namespace, name } = &self.gateway_service;
        let svc = self
            .client
            .get_service(namespace, name)
            .await?
            .ok_or_else(|| ClusterError::NotFound {
                resource: KIND_SERVICE.to_string(),
                namespace: namespace.clone(),
                name: name.clone(),
            })?;

        Ok(load_balancer_targets(
            svc.status
                .as_ref()
                .and_then(|s| s.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .into_iter()
                .flatten()
                .map(|i| (i.ip.as_ref(), i.hostname.as_ref())),
        ))
    }

    fn gateway_endpoints(&self, gateway: &Gateway, service_targets: &Targets) -> Vec<Endpoint> {
        let meta = &gateway.metadata;
        let ttl = resource_ttl(meta);

        let overridden = meta
            .annotations
            .as_ref()
            .map(targets_from_annotation)
            .unwrap_or_default();
        let targets = if overridden.is_empty() {
            service_targets
        } else {
            &overridden
        };

        let annotated = meta
            .annotations
            .as_ref()
            .map(hostnames_from_annotations)
            .unwrap_or_default();
        let hostnames = if annotated.is_empty() {
            server_hosts(gateway)
        } else {
            annotated
        };

        let mut endpoints: Vec<Endpoint> = hostnames
            .iter()
            .flat_map(|hostname| endpoints_for_hostname(hostname, targets, ttl))
            .collect();

        if let Some(template) = &self.config.fqdn_template {
            if self.config.combine_fqdn_annotation || endpoints.is_empty() {
                let templated: Vec<Endpoint> = template_hostnames(template, KIND_GATEWAY, meta)
                    .iter()
                    .flat_map(|hostname| endpoints_for_hostname(hostname, targets, ttl))
                    .collect();
                if self.config.combine_fqdn_annotation {
                    endpoints.extend(templated);
                } else {
                    endpoints = templated;
                }
            }
        }

        finish_resource(KIND_GATEWAY, meta, endpoints)
    }
}

#[async_trait]
impl Source for GatewaySource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>, SourceError> {
        let gateways: Vec<Gateway> = self
            .store
            .list_gateways(&self.config.namespace)
            .await?
            .into_iter()
            .filter(|gw| is_selected(&self.config, KIND_GATEWAY, &gw.metadata))
            .collect();

        if gateways.is_empty() {
            debug!(namespace = %self.config.namespace, "No gateways to process");
            return Ok(Vec::new());
        }

        let targets = self.gateway_targets().await?;
        Ok(gateways
            .iter()
            .flat_map(|gw| self.gateway_endpoints(gw, &targets))
            .collect())
    }
}

/// Publishable hosts of every server, `namespace/` prefixes removed.
fn server_hosts(gateway: &Gateway) -> Vec<String> {
    gateway
        .hosts()
        .map(|host| host.split_once('/').map_or(host, |(_, h)| h).trim())
        .filter(|host| !host.is_empty() && *host != "*")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod gateway_tests;
