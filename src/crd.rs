// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom resources read by dnsbridge.
//!
//! dnsbridge never installs CRDs of its own. It only reads the Istio
//! [`Gateway`] resource (`networking.istio.io/v1alpha3`), whose server host lists
//! name the hostnames exposed through a shared ingress gateway service.
//!
//! # Example
//!
//! ```rust
//! use dnsbridge::crd::{Gateway, GatewaySpec, Server};
//!
//! let gateway = Gateway::new(
//!     "public",
//!     GatewaySpec {
//!         servers: vec![Server {
//!             hosts: vec!["shop.example.com".to_string()],
//!             port: None,
//!         }],
//!         ..Default::default()
//!     },
//! );
//! assert_eq!(gateway.hosts().collect::<Vec<_>>(), vec!["shop.example.com"]);
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Istio Gateway specification.
///
/// Only the fields dnsbridge reads are modelled; unknown fields are ignored on
/// deserialization.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.istio.io",
    version = "v1alpha3",
    kind = "Gateway",
    namespaced,
    doc = "Load balancer at the edge of the mesh receiving connections for a set of hosts."
)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    /// Servers exposed by this gateway.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,

    /// Labels selecting the gateway workload pods.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
}

/// One listener of a gateway.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// Hosts exposed by this server, optionally written `namespace/host`.
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Port the server listens on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
}

/// Port a gateway server listens on.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Port number
    pub number: u32,
    /// Protocol (`HTTP`, `HTTPS`, `GRPC`, `TCP`, ...)
    #[serde(default)]
    pub protocol: String,
    /// Port name
    #[serde(default)]
    pub name: String,
}

impl Gateway {
    /// Every host declared across all servers, unnormalised.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.spec
            .servers
            .iter()
            .flat_map(|server| server.hosts.iter().map(String::as_str))
    }
}
