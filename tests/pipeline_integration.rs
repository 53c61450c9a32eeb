// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end tests of a reconciliation pass through the public API.
//!
//! Resources are served by an in-memory cluster; the provider is either a recording
//! client or a Shaman server mocked with wiremock.

use async_trait::async_trait;
use dnsbridge::cluster::{ClusterClient, InMemoryCluster};
use dnsbridge::controller::Controller;
use dnsbridge::crd::{Gateway, GatewaySpec, Server};
use dnsbridge::endpoint::{Endpoint, RecordType};
use dnsbridge::errors::ProviderError;
use dnsbridge::labels::HOSTNAME_ANNOTATION;
use dnsbridge::plan::{Changes, Plan, Policy};
use dnsbridge::provider::shaman::ShamanClient;
use dnsbridge::provider::{ProviderClient, Resource, ShamanProvider};
use dnsbridge::source::gateway::GatewaySource;
use dnsbridge::source::ingress::IngressSource;
use dnsbridge::source::multi::MultiSource;
use dnsbridge::source::service::ServiceSource;
use dnsbridge::source::store::VersionedConfigStore;
use dnsbridge::source::{Source, SourceConfig};
use k8s_openapi::api::core::v1::{
    LoadBalancerIngress, LoadBalancerStatus, Service, ServiceSpec, ServiceStatus,
};
use k8s_openapi::api::networking::v1::{
    Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressRule, IngressSpec,
    IngressStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

fn meta(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        annotations: Some(
            annotations
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

fn load_balancer_service(meta: ObjectMeta, ingress: LoadBalancerIngress) -> Service {
    Service {
        metadata: meta,
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            ..Default::default()
        }),
        status: Some(ServiceStatus {
            load_balancer: Some(LoadBalancerStatus {
                ingress: Some(vec![ingress]),
            }),
            ..Default::default()
        }),
    }
}

fn web_service() -> Service {
    load_balancer_service(
        meta("shop", "web", &[(HOSTNAME_ANNOTATION, "web.example.com")]),
        LoadBalancerIngress {
            ip: Some("1.2.3.4".to_string()),
            ..Default::default()
        },
    )
}

fn ingress_gateway_service() -> Service {
    load_balancer_service(
        meta("istio-system", "istio-ingressgateway", &[]),
        LoadBalancerIngress {
            hostname: Some("lb.example.net".to_string()),
            ..Default::default()
        },
    )
}

fn blog_ingress() -> Ingress {
    Ingress {
        metadata: meta("blog", "blog", &[]),
        spec: Some(IngressSpec {
            rules: Some(vec![
                IngressRule {
                    host: Some("blog.example.com".to_string()),
                    ..Default::default()
                },
                // Same hostname as the service; both records must survive.
                IngressRule {
                    host: Some("web.example.com".to_string()),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        status: Some(IngressStatus {
            load_balancer: Some(IngressLoadBalancerStatus {
                ingress: Some(vec![IngressLoadBalancerIngress {
                    ip: Some("5.6.7.8".to_string()),
                    ..Default::default()
                }]),
            }),
        }),
    }
}

async fn gateway_store() -> Arc<VersionedConfigStore<Gateway>> {
    let store = Arc::new(VersionedConfigStore::new());
    let mut gateway = Gateway::new(
        "public",
        GatewaySpec {
            servers: vec![Server {
                hosts: vec!["shop/store.example.com".to_string(), "*".to_string()],
                port: None,
            }],
            ..Default::default()
        },
    );
    gateway.metadata.namespace = Some("shop".to_string());
    store.create(gateway).await.unwrap();
    store
}

async fn all_sources(cluster: Arc<dyn ClusterClient>) -> MultiSource {
    let config = SourceConfig::default();
    let gateway = GatewaySource::new(
        cluster.clone(),
        gateway_store().await,
        "istio-system/istio-ingressgateway",
        config.clone(),
    )
    .unwrap();

    MultiSource::new(vec![
        Box::new(ServiceSource::new(cluster.clone(), config.clone())),
        Box::new(IngressSource::new(cluster.clone(), config.clone())),
        // Listed twice to exercise deduplication across sources.
        Box::new(IngressSource::new(cluster, config)),
        Box::new(gateway),
    ])
}

fn cluster() -> Arc<dyn ClusterClient> {
    Arc::new(
        InMemoryCluster::new()
            .with_services([web_service(), ingress_gateway_service()])
            .with_ingresses([blog_ingress()]),
    )
}

/// Records every write as `"<operation> <domain>"`.
#[derive(Default)]
struct RecordingClient {
    calls: Mutex<Vec<String>>,
    current: Vec<Resource>,
}

impl RecordingClient {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderClient for RecordingClient {
    async fn create(&self, resource: &Resource) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {}", resource.domain));
        Ok(())
    }

    async fn update(&self, resource: &Resource) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("update {}", resource.domain));
        Ok(())
    }

    async fn delete(&self, domain: &str) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(format!("delete {domain}"));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Resource>, ProviderError> {
        Ok(self.current.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_sources_aggregate_into_unique_endpoints() {
    let endpoints = all_sources(cluster()).await.endpoints().await.unwrap();

    let summary: Vec<_> = endpoints
        .iter()
        .map(|ep| {
            (
                ep.dns_name.as_str(),
                ep.record_type,
                ep.targets.0.clone(),
                ep.resource().unwrap_or_default().to_string(),
            )
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            (
                "web.example.com",
                RecordType::A,
                vec!["1.2.3.4".to_string()],
                "service/shop/web".to_string()
            ),
            (
                "blog.example.com",
                RecordType::A,
                vec!["5.6.7.8".to_string()],
                "ingress/blog/blog".to_string()
            ),
            (
                "web.example.com",
                RecordType::A,
                vec!["5.6.7.8".to_string()],
                "ingress/blog/blog".to_string()
            ),
            (
                "store.example.com",
                RecordType::Cname,
                vec!["lb.example.net".to_string()],
                "gateway/shop/public".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_pass_applies_merged_changes_in_order() {
    let current: Resource = serde_json::from_value(json!({
        "domain": "old.example.com",
        "records": [{"class": "IN", "type": "A", "address": "9.9.9.9"}]
    }))
    .unwrap();
    let client = Arc::new(RecordingClient {
        current: vec![current],
        ..Default::default()
    });

    let applied = Arc::new(Mutex::new(Changes::default()));
    let observer = applied.clone();
    let provider = ShamanProvider::new(client.clone()).with_apply_hook(move |changes: &Changes| {
        *observer.lock().unwrap() = changes.clone();
    });

    let controller = Controller::new(
        Box::new(all_sources(cluster()).await),
        Plan::new(Policy::Sync),
        provider,
        Duration::from_secs(60),
    );
    controller.run_once().await.unwrap();

    // The two web.example.com endpoints collide on (name, type); the first wins.
    let changes = applied.lock().unwrap().clone();
    let created: Vec<_> = changes
        .create
        .iter()
        .map(|ep| ep.dns_name.as_str())
        .collect();
    assert_eq!(
        created,
        vec!["web.example.com", "blog.example.com", "store.example.com"]
    );
    assert_eq!(changes.delete.len(), 1);

    // One write per domain, creates before deletes.
    assert_eq!(
        client.calls(),
        vec![
            "create blog.example.com",
            "create store.example.com",
            "create web.example.com",
            "delete old.example.com",
        ]
    );
}

#[tokio::test]
async fn test_pass_against_shaman_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records"))
        .and(query_param("full", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/records"))
        .and(body_json(json!({
            "domain": "web.example.com",
            "records": [{"class": "IN", "type": "A", "address": "1.2.3.4"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let cluster: Arc<dyn ClusterClient> =
        Arc::new(InMemoryCluster::new().with_services([web_service()]));
    let client = ShamanClient::new(&server.uri(), "token").unwrap();
    let controller = Controller::new(
        Box::new(ServiceSource::new(cluster, SourceConfig::default())),
        Plan::new(Policy::Sync),
        ShamanProvider::new(Arc::new(client)).with_logging(),
        Duration::from_secs(60),
    );

    let changes = controller.run_once().await.unwrap();

    assert_eq!(
        changes.create,
        vec![Endpoint::new("web.example.com", RecordType::A, ["1.2.3.4"])
            .with_label("resource", "service/shop/web")]
    );
}
