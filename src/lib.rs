// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # dnsbridge - external DNS synchronization for Kubernetes
//!
//! dnsbridge keeps the records of an external DNS provider in sync with the
//! entrypoints exposed by a Kubernetes cluster.
//!
//! ## Overview
//!
//! Each reconciliation pass:
//!
//! 1. Turns Services, Ingresses and Istio Gateways into [`endpoint::Endpoint`]s, driven by
//!    annotations, an optional FQDN template and the resources' load-balancer status
//! 2. Deduplicates and sorts the endpoints of all sources ([`source::multi::MultiSource`])
//! 3. Diffs them against the provider's records ([`plan::Plan`])
//! 4. Groups the resulting changes per DNS name and applies them in a fixed order
//!    ([`provider::ShamanProvider`])
//!
//! ## Modules
//!
//! - [`endpoint`] - Record model
//! - [`source`] - Resource adapters and the source aggregator
//! - [`plan`] - Desired-vs-current diff
//! - [`provider`] - Change merger and provider apply driver
//! - [`controller`] - Periodic reconciliation loop
//! - [`config`] - Command-line and environment configuration
//!
//! ## Example
//!
//! ```rust
//! use dnsbridge::endpoint::{Endpoint, RecordType};
//! use dnsbridge::plan::{Plan, Policy};
//!
//! let desired = vec![Endpoint::new("web.example.com", RecordType::A, ["1.2.3.4"])];
//! let changes = Plan::new(Policy::Sync).calculate(&desired, &[]);
//! assert_eq!(changes.create, desired);
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod endpoint;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod plan;
pub mod provider;
pub mod selector;
pub mod source;
pub mod template;
