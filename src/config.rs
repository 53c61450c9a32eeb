// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration.
//!
//! Every flag can also be set through a `DNSBRIDGE_*` environment variable. The
//! configuration is read once at startup; [`Config::validate`] reports every
//! malformed value before the first reconciliation pass.
//!
//! # Example
//!
//! ```rust
//! use clap::Parser;
//! use dnsbridge::config::Config;
//!
//! let config = Config::try_parse_from([
//!     "dnsbridge",
//!     "--source", "service,ingress",
//!     "--fqdn-template", "{{.Name}}.example.com",
//!     "--provider-token", "secret",
//! ])
//! .unwrap();
//! config.validate().unwrap();
//! assert!(!config.to_string().contains("secret"));
//! ```

use crate::constants::{
    DEFAULT_GATEWAY_SERVICE, DEFAULT_METRICS_ADDRESS, DEFAULT_PROVIDER_HOST,
    DEFAULT_SYNC_INTERVAL_SECS, MIN_SYNC_INTERVAL_SECS, SECRET_MASK,
};
use crate::errors::ConfigError;
use crate::plan::Policy;
use crate::provider::shaman::ShamanClient;
use crate::selector::AnnotationFilter;
use crate::source::compat::Compatibility;
use crate::source::gateway::GatewayServiceRef;
use crate::source::SourceConfig;
use crate::template::FqdnTemplate;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Resource kinds endpoints can be synthesized from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Kubernetes services
    Service,
    /// Kubernetes ingresses
    Ingress,
    /// Istio gateways
    Gateway,
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// dnsbridge configuration.
#[derive(Clone, Parser)]
#[command(name = "dnsbridge", version)]
#[command(
    about = "Synchronize DNS records with Kubernetes services, ingresses and gateways"
)]
pub struct Config {
    /// Resource kinds to synthesize endpoints from
    #[arg(
        long = "source",
        env = "DNSBRIDGE_SOURCE",
        value_enum,
        value_delimiter = ','
    )]
    pub sources: Vec<SourceKind>,

    /// Namespace to watch; empty for all namespaces
    #[arg(long, env = "DNSBRIDGE_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Only process resources whose annotations match this label selector
    #[arg(long, env = "DNSBRIDGE_ANNOTATION_FILTER", default_value = "")]
    pub annotation_filter: String,

    /// Template producing hostnames for resources without any (e.g. `{{.Name}}.example.com`)
    #[arg(long, env = "DNSBRIDGE_FQDN_TEMPLATE", default_value = "")]
    pub fqdn_template: String,

    /// Append template hostnames to the annotated ones instead of using them as a fallback
    #[arg(long, env = "DNSBRIDGE_COMBINE_FQDN_ANNOTATION")]
    pub combine_fqdn_annotation: bool,

    /// Legacy annotation dialect for services (`mate` or `molecule`)
    #[arg(long, env = "DNSBRIDGE_COMPATIBILITY", default_value = "")]
    pub compatibility: String,

    /// Publish the cluster IP of ClusterIP services
    #[arg(long, env = "DNSBRIDGE_PUBLISH_INTERNAL_SERVICES")]
    pub publish_internal_services: bool,

    /// Publish host IPs instead of pod IPs for headless services
    #[arg(long, env = "DNSBRIDGE_PUBLISH_HOST_IP")]
    pub publish_host_ip: bool,

    /// Only process services of these types; empty for all
    #[arg(long, env = "DNSBRIDGE_SERVICE_TYPE_FILTER", value_delimiter = ',')]
    pub service_type_filter: Vec<String>,

    /// Service fronting the gateways, as `<namespace>/<name>`
    #[arg(
        long,
        env = "DNSBRIDGE_GATEWAY_SERVICE",
        default_value = DEFAULT_GATEWAY_SERVICE
    )]
    pub gateway_service: String,

    /// Base URL of the Shaman API
    #[arg(
        long,
        env = "DNSBRIDGE_PROVIDER_HOST",
        default_value = DEFAULT_PROVIDER_HOST
    )]
    pub provider_host: String,

    /// Shaman API token
    #[arg(
        long,
        env = "DNSBRIDGE_PROVIDER_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub provider_token: String,

    /// What the controller may do with existing records (`sync` or `upsert-only`)
    #[arg(long, env = "DNSBRIDGE_POLICY", default_value = "sync")]
    pub policy: Policy,

    /// Seconds between reconciliation passes
    #[arg(
        long,
        env = "DNSBRIDGE_INTERVAL",
        default_value_t = DEFAULT_SYNC_INTERVAL_SECS
    )]
    pub interval: u64,

    /// Run a single pass and exit
    #[arg(long, env = "DNSBRIDGE_ONCE")]
    pub once: bool,

    /// Compute and log changes without writing them
    #[arg(long, env = "DNSBRIDGE_DRY_RUN")]
    pub dry_run: bool,

    /// Log output format
    #[arg(
        long,
        env = "RUST_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    /// Address serving `/healthz` and `/metrics`
    #[arg(
        long,
        env = "DNSBRIDGE_METRICS_ADDRESS",
        default_value = DEFAULT_METRICS_ADDRESS
    )]
    pub metrics_address: SocketAddr,
}

impl Config {
    /// Check every value that can only be validated after parsing.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.interval < MIN_SYNC_INTERVAL_SECS {
            return Err(ConfigError::InvalidInterval {
                interval: self.interval,
            });
        }
        self.source_config()?;
        if self.sources.contains(&SourceKind::Gateway) {
            GatewayServiceRef::parse(&self.gateway_service)?;
        }
        self.provider_client()?;
        Ok(())
    }

    /// Settings shared by the sources.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed annotation filter, template or
    /// compatibility mode.
    pub fn source_config(&self) -> Result<SourceConfig, ConfigError> {
        let fqdn_template = if self.fqdn_template.trim().is_empty() {
            None
        } else {
            Some(FqdnTemplate::parse(&self.fqdn_template)?)
        };

        Ok(SourceConfig {
            namespace: self.namespace.clone(),
            annotation_filter: AnnotationFilter::parse(&self.annotation_filter)?,
            fqdn_template,
            combine_fqdn_annotation: self.combine_fqdn_annotation,
            compatibility: Compatibility::parse_optional(&self.compatibility)?,
            publish_internal: self.publish_internal_services,
            publish_host_ip: self.publish_host_ip,
            service_type_filter: self
                .service_type_filter
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    /// HTTP client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProviderHost`] if the host is not an HTTP(S) URL.
    pub fn provider_client(&self) -> Result<ShamanClient, ConfigError> {
        ShamanClient::new(&self.provider_host, &self.provider_token)
    }

    /// Time between passes.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    fn masked_token(&self) -> &str {
        if self.provider_token.is_empty() {
            ""
        } else {
            SECRET_MASK
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sources", &self.sources)
            .field("namespace", &self.namespace)
            .field("annotation_filter", &self.annotation_filter)
            .field("fqdn_template", &self.fqdn_template)
            .field("combine_fqdn_annotation", &self.combine_fqdn_annotation)
            .field("compatibility", &self.compatibility)
            .field("publish_internal_services", &self.publish_internal_services)
            .field("publish_host_ip", &self.publish_host_ip)
            .field("service_type_filter", &self.service_type_filter)
            .field("gateway_service", &self.gateway_service)
            .field("provider_host", &self.provider_host)
            .field("provider_token", &self.masked_token())
            .field("policy", &self.policy)
            .field("interval", &self.interval)
            .field("once", &self.once)
            .field("dry_run", &self.dry_run)
            .field("log_format", &self.log_format)
            .field("metrics_address", &self.metrics_address)
            .finish()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<_> = self
            .sources
            .iter()
            .filter_map(|s| s.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        write!(
            f,
            "sources={} namespace={:?} annotation_filter={:?} fqdn_template={:?} \
             combine_fqdn_annotation={} compatibility={:?} publish_internal_services={} \
             publish_host_ip={} service_type_filter={:?} gateway_service={} provider_host={} \
             provider_token={:?} policy={} interval={}s once={} dry_run={} metrics_address={}",
            sources.join(","),
            self.namespace,
            self.annotation_filter,
            self.fqdn_template,
            self.combine_fqdn_annotation,
            self.compatibility,
            self.publish_internal_services,
            self.publish_host_ip,
            self.service_type_filter,
            self.gateway_service,
            self.provider_host,
            self.masked_token(),
            self.policy,
            self.interval,
            self.once,
            self.dry_run,
            self.metrics_address,
        )
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
