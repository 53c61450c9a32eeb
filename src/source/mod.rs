// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Endpoint sources.
//!
//! A [`Source`] turns one kind of cluster resource into [`Endpoint`]s. The three
//! resource adapters share the annotation rules implemented in this module:
//!
//! - **Controller check**: a resource whose controller annotation names another
//!   controller is skipped.
//! - **Annotation filter**: resources whose annotations do not match the configured
//!   [`AnnotationFilter`] are skipped before synthesis.
//! - **Hostnames**: the hostname annotation wins, then resource-native hosts, then a
//!   legacy compatibility dialect, then the FQDN template. With
//!   `combine_fqdn_annotation` the template hostnames are appended instead.
//! - **Targets**: the target annotation overrides the resource's native addresses.
//!   IP literals go to an `A` record, everything else to a `CNAME` record.
//! - **TTL**: read from the TTL annotation; invalid values are logged and ignored.
//! - **Ownership**: every endpoint is labelled with `<kind>/<namespace>/<name>`.
//!
//! The adapters live in [`service`], [`ingress`] and [`gateway`]; [`multi`] combines
//! them into one deduplicated list.

pub mod compat;
pub mod gateway;
pub mod ingress;
pub mod multi;
pub mod service;
pub mod store;

use crate::constants::{MAX_TTL_SECS, MIN_TTL_SECS};
use crate::endpoint::{suitable_type, Endpoint, RecordType, Targets};
use crate::errors::{AnnotationError, SourceError};
use crate::labels::{
    CONTROLLER_ANNOTATION, CONTROLLER_ANNOTATION_VALUE, HOSTNAME_ANNOTATION, RESOURCE_LABEL,
    TARGET_ANNOTATION, TTL_ANNOTATION,
};
use crate::selector::AnnotationFilter;
use crate::template::{FqdnTemplate, TemplateData};
use async_trait::async_trait;
use compat::Compatibility;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Capability shared by all adapters: produce endpoints from the current cluster state.
#[async_trait]
pub trait Source: Send + Sync {
    /// Synthesize the endpoints for every matching resource.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource list required by this source cannot be fetched.
    async fn endpoints(&self) -> Result<Vec<Endpoint>, SourceError>;
}

/// Settings shared by the adapters, fixed at startup.
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    /// Namespace to watch; empty for all namespaces
    pub namespace: String,
    /// Resources must match this filter to be considered
    pub annotation_filter: AnnotationFilter,
    /// Template producing hostnames for resources without any
    pub fqdn_template: Option<FqdnTemplate>,
    /// Append template hostnames instead of using them only as a fallback
    pub combine_fqdn_annotation: bool,
    /// Legacy annotation dialect (services only)
    pub compatibility: Option<Compatibility>,
    /// Publish the cluster IP of `ClusterIP` services
    pub publish_internal: bool,
    /// Publish the host IP instead of the pod IP for headless services
    pub publish_host_ip: bool,
    /// Only process services of these types; empty for all
    pub service_type_filter: BTreeSet<String>,
}

fn annotations_of(meta: &ObjectMeta) -> &BTreeMap<String, String> {
    static EMPTY: BTreeMap<String, String> = BTreeMap::new();
    meta.annotations.as_ref().unwrap_or(&EMPTY)
}

/// Whether this controller is responsible for the resource.
pub(crate) fn is_controlled(kind: &str, meta: &ObjectMeta) -> bool {
    match annotations_of(meta).get(CONTROLLER_ANNOTATION) {
        Some(controller) if controller != CONTROLLER_ANNOTATION_VALUE => {
            debug!(
                kind = kind,
                namespace = meta.namespace.as_deref().unwrap_or_default(),
                name = meta.name.as_deref().unwrap_or_default(),
                found = %controller,
                required = CONTROLLER_ANNOTATION_VALUE,
                "Skipping resource because controller value does not match"
            );
            false
        }
        _ => true,
    }
}

/// Whether the resource passes the controller check and the annotation filter.
pub(crate) fn is_selected(config: &SourceConfig, kind: &str, meta: &ObjectMeta) -> bool {
    config.annotation_filter.matches(annotations_of(meta)) && is_controlled(kind, meta)
}

/// Split a comma-separated annotation value into trimmed, non-empty entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Hostnames listed in the hostname annotation.
#[must_use]
pub fn hostnames_from_annotations(annotations: &BTreeMap<String, String>) -> Vec<String> {
    annotations
        .get(HOSTNAME_ANNOTATION)
        .map(|v| split_list(v))
        .unwrap_or_default()
}

/// Targets listed in the target annotation, trailing dots removed.
#[must_use]
pub fn targets_from_annotation(annotations: &BTreeMap<String, String>) -> Targets {
    annotations
        .get(TARGET_ANNOTATION)
        .map(|v| {
            split_list(v)
                .into_iter()
                .map(|t| t.trim_end_matches('.').to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// TTL from the TTL annotation.
///
/// # Errors
///
/// Returns [`AnnotationError::InvalidTtl`] when the value is not an integer in
/// `1..=2147483647`.
pub fn ttl_from_annotations(
    annotations: &BTreeMap<String, String>,
) -> Result<Option<u32>, AnnotationError> {
    let Some(value) = annotations.get(TTL_ANNOTATION) else {
        return Ok(None);
    };

    let ttl: i64 = value.trim().parse().map_err(|e: std::num::ParseIntError| {
        AnnotationError::InvalidTtl {
            value: value.clone(),
            reason: e.to_string(),
        }
    })?;

    if !(MIN_TTL_SECS..=MAX_TTL_SECS).contains(&ttl) {
        return Err(AnnotationError::InvalidTtl {
            value: value.clone(),
            reason: format!("must be between {MIN_TTL_SECS} and {MAX_TTL_SECS}"),
        });
    }

    Ok(u32::try_from(ttl).ok())
}

/// TTL for a resource, logging and dropping invalid values.
pub(crate) fn resource_ttl(meta: &ObjectMeta) -> Option<u32> {
    ttl_from_annotations(annotations_of(meta)).unwrap_or_else(|err| {
        warn!(
            namespace = meta.namespace.as_deref().unwrap_or_default(),
            name = meta.name.as_deref().unwrap_or_default(),
            "{err}"
        );
        None
    })
}

/// Build the `A` and `CNAME` records for one hostname.
///
/// Each record is only kept when at least one target was classified into it, so
/// a hostname with no targets yields nothing.
#[must_use]
pub fn endpoints_for_hostname(
    hostname: &str,
    targets: &Targets,
    ttl: Option<u32>,
) -> Vec<Endpoint> {
    let hostname = hostname.trim_end_matches('.');
    if hostname.is_empty() {
        return Vec::new();
    }

    let mut a = Endpoint::new(hostname, RecordType::A, Vec::<String>::new()).with_ttl(ttl);
    let mut cname = Endpoint::new(hostname, RecordType::Cname, Vec::<String>::new()).with_ttl(ttl);

    for target in targets.iter() {
        match suitable_type(target) {
            RecordType::A => a.targets.push(target.clone()),
            _ => cname.targets.push(target.clone()),
        }
    }

    [a, cname]
        .into_iter()
        .filter(|ep| !ep.targets.is_empty())
        .collect()
}

/// Targets from load-balancer status entries, IP before hostname for each entry.
pub(crate) fn load_balancer_targets<'a, I>(entries: I) -> Targets
where
    I: IntoIterator<Item = (Option<&'a String>, Option<&'a String>)>,
{
    let mut targets = Targets::default();
    for (ip, hostname) in entries {
        if let Some(ip) = ip.filter(|s| !s.is_empty()) {
            targets.push(ip.clone());
        }
        if let Some(hostname) = hostname.filter(|s| !s.is_empty()) {
            targets.push(hostname.clone());
        }
    }
    targets
}

/// Hostnames rendered from the FQDN template for a resource.
pub(crate) fn template_hostnames(
    template: &FqdnTemplate,
    kind: &str,
    meta: &ObjectMeta,
) -> Vec<String> {
    let hostnames = template.hostnames(&TemplateData::from_meta(kind, meta));
    if hostnames.is_empty() {
        warn!(
            kind = kind,
            namespace = meta.namespace.as_deref().unwrap_or_default(),
            name = meta.name.as_deref().unwrap_or_default(),
            template = %template,
            "FQDN template rendered no hostnames"
        );
    }
    hostnames
}

/// Merge records of the same name and type produced for one resource.
///
/// Targets are appended in order, skipping ones already present; the first TTL wins.
pub(crate) fn merge_same_records(endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut merged: Vec<Endpoint> = Vec::with_capacity(endpoints.len());
    for ep in endpoints {
        let existing = merged.iter_mut().find(|m| {
            m.record_type == ep.record_type && m.comparable_name() == ep.comparable_name()
        });
        match existing {
            Some(m) => {
                for target in ep.targets.0 {
                    if !m.targets.contains(&target) {
                        m.targets.push(target);
                    }
                }
            }
            None => merged.push(ep),
        }
    }
    merged
}

/// Stamp the ownership label `<kind>/<namespace>/<name>` onto every endpoint.
pub(crate) fn set_resource_label(endpoints: &mut [Endpoint], kind: &str, meta: &ObjectMeta) {
    let resource = format!(
        "{}/{}/{}",
        kind,
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default()
    );
    for ep in endpoints {
        ep.labels.insert(RESOURCE_LABEL.into(), resource.clone());
    }
}

/// Final per-resource step shared by the adapters.
///
/// Merges duplicate records, sorts targets, and stamps the ownership label.
/// Returns nothing (with a debug log) when the resource produced no records.
pub(crate) fn finish_resource(
    kind: &str,
    meta: &ObjectMeta,
    endpoints: Vec<Endpoint>,
) -> Vec<Endpoint> {
    let namespace = meta.namespace.as_deref().unwrap_or_default();
    let name = meta.name.as_deref().unwrap_or_default();

    let mut endpoints = merge_same_records(endpoints);
    if endpoints.is_empty() {
        debug!(
            kind = kind,
            namespace = namespace,
            name = name,
            "No endpoints could be generated"
        );
        return endpoints;
    }

    for ep in &mut endpoints {
        ep.targets.sort();
    }
    set_resource_label(&mut endpoints, kind, meta);

    debug!(
        kind = kind,
        namespace = namespace,
        name = name,
        count = endpoints.len(),
        "Endpoints generated"
    );
    endpoints
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
