// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress adapter.
//!
//! Hostnames come from the hostname annotation or, when it is absent, from the rule
//! hosts followed by the TLS hosts. Every hostname shares the same targets: the
//! target annotation if set, otherwise the ingress load-balancer status.

use crate::cluster::ClusterClient;
use crate::constants::KIND_INGRESS;
use crate::endpoint::{Endpoint, Targets};
use crate::errors::SourceError;
use crate::source::{
    endpoints_for_hostname, finish_resource, hostnames_from_annotations, is_selected,
    load_balancer_targets, resource_ttl, targets_from_annotation, template_hostnames, Source,
    SourceConfig,
};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use std::sync::Arc;

/// Endpoint source for Kubernetes ingresses.
pub struct IngressSource {
    client: Arc<dyn ClusterClient>,
    config: SourceConfig,
}

impl IngressSource {
    /// Create an ingress source reading through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>, config: SourceConfig) -> Self {
        Self { client, config }
    }

    fn ingress_endpoints(&self, ing: &Ingress) -> Vec<Endpoint> {
        let ttl = resource_ttl(&ing.metadata);
        let targets = ingress_targets(ing);

        let annotated = ing
            .metadata
            .annotations
            .as_ref()
            .map(hostnames_from_annotations)
            .unwrap_or_default();
        let hostnames = if annotated.is_empty() {
            native_hosts(ing)
        } else {
            annotated
        };

        let mut endpoints = for_hostnames(&hostnames, &targets, ttl);

        if let Some(template) = &self.config.fqdn_template {
            if self.config.combine_fqdn_annotation || endpoints.is_empty() {
                let templated = for_hostnames(
                    &template_hostnames(template, KIND_INGRESS, &ing.metadata),
                    &targets,
                    ttl,
                );
                if self.config.combine_fqdn_annotation {
                    endpoints.extend(templated);
                } else {
                    endpoints = templated;
                }
            }
        }

        finish_resource(KIND_INGRESS, &ing.metadata, endpoints)
    }
}

#[async_trait]
impl Source for IngressSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>, SourceError> {
        let ingresses = self.client.list_ingresses(&self.config.namespace).await?;

        Ok(ingresses
            .iter()
            .filter(|ing| is_selected(&self.config, KIND_INGRESS, &ing.metadata))
            .flat_map(|ing| self.ingress_endpoints(ing))
            .collect())
    }
}

fn for_hostnames(hostnames: &[String], targets: &Targets, ttl: Option<u32>) -> Vec<Endpoint> {
    hostnames
        .iter()
        .flat_map(|hostname| endpoints_for_hostname(hostname, targets, ttl))
        .collect()
}

/// Target annotation, or the load-balancer status addresses.
fn ingress_targets(ing: &Ingress) -> Targets {
    let overridden = ing
        .metadata
        .annotations
        .as_ref()
        .map(targets_from_annotation)
        .unwrap_or_default();
    if !overridden.is_empty() {
        return overridden;
    }

    load_balancer_targets(
        ing.status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .into_iter()
            .flatten()
            .map(|i| (i.ip.as_ref(), i.hostname.as_ref())),
    )
}

/// Rule hosts then TLS hosts, without empty entries.
fn native_hosts(ing: &Ingress) -> Vec<String> {
    let Some(spec) = ing.spec.as_ref() else {
        return Vec::new();
    };

    let rule_hosts = spec
        .rules
        .iter()
        .flatten()
        .filter_map(|rule| rule.host.clone());
    let tls_hosts = spec
        .tls
        .iter()
        .flatten()
        .filter_map(|tls| tls.hosts.clone())
        .flatten();

    rule_hosts
        .chain(tls_hosts)
        .filter(|host| !host.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
