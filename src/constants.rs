// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for dnsbridge.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Resource Kinds
// ============================================================================

/// Kind prefix stamped into the resource label of service-derived endpoints
pub const KIND_SERVICE: &str = "service";

/// Kind prefix stamped into the resource label of ingress-derived endpoints
pub const KIND_INGRESS: &str = "ingress";

/// Kind prefix stamped into the resource label of gateway-derived endpoints
pub const KIND_GATEWAY: &str = "gateway";

// ============================================================================
// Kubernetes Field Values
// ============================================================================

/// `spec.type` of an externally load-balanced service
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

/// `spec.type` of a cluster-internal service
pub const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";

/// `spec.type` of a node-routed service
pub const SERVICE_TYPE_NODE_PORT: &str = "NodePort";

/// `spec.clusterIP` value marking a headless service
pub const CLUSTER_IP_NONE: &str = "None";

/// `status.phase` of a running pod
pub const POD_PHASE_RUNNING: &str = "Running";

/// Node address type for externally reachable addresses
pub const NODE_EXTERNAL_IP: &str = "ExternalIP";

/// Node address type for cluster-internal addresses
pub const NODE_INTERNAL_IP: &str = "InternalIP";

/// Protocol assumed for service ports that do not declare one
pub const DEFAULT_PORT_PROTOCOL: &str = "tcp";

// ============================================================================
// DNS Record Constants
// ============================================================================

/// Priority of synthesized NodePort SRV records
pub const SRV_PRIORITY: u16 = 0;

/// Weight of synthesized NodePort SRV records
pub const SRV_WEIGHT: u16 = 50;

/// Smallest TTL accepted from the TTL annotation (seconds)
pub const MIN_TTL_SECS: i64 = 1;

/// Largest TTL accepted from the TTL annotation (seconds)
pub const MAX_TTL_SECS: i64 = i32::MAX as i64;

/// DNS class written to provider records
pub const RECORD_CLASS_IN: &str = "IN";

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for paginated list calls against the Kubernetes API
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

/// Maximum length of a label value accepted in selectors
pub const MAX_LABEL_VALUE_LEN: usize = 63;

/// Ingress gateway service used by the gateway source when none is configured
pub const DEFAULT_GATEWAY_SERVICE: &str = "istio-system/istio-ingressgateway";

// ============================================================================
// Provider Constants
// ============================================================================

/// Default Shaman API address
pub const DEFAULT_PROVIDER_HOST: &str = "http://localhost:1632";

/// Header carrying the Shaman API token
pub const SHAMAN_AUTH_HEADER: &str = "X-AUTH-TOKEN";

/// Replacement shown instead of secrets when configuration is printed
pub const SECRET_MASK: &str = "******";

// ============================================================================
// Controller Loop Constants
// ============================================================================

/// Default interval between two synchronizations (1 minute)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Shortest accepted interval between two synchronizations
pub const MIN_SYNC_INTERVAL_SECS: u64 = 1;

/// Default listen address for `/healthz` and `/metrics`
pub const DEFAULT_METRICS_ADDRESS: &str = "0.0.0.0:7979";
