// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `gateway.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::InMemoryCluster;
    use crate::crd::{Gateway, GatewaySpec, Server};
    use crate::endpoint::RecordType;
    use crate::errors::{ClusterError, ConfigError, SourceError};
    use crate::labels::HOSTNAME_ANNOTATION;
    use crate::selector::AnnotationFilter;
    use crate::source::gateway::{GatewayServiceRef, GatewaySource};
    use crate::source::store::VersionedConfigStore;
    use crate::source::{Source, SourceConfig};
    use crate::template::FqdnTemplate;
    use k8s_openapi::api::core::v1::{
        LoadBalancerIngress, LoadBalancerStatus, Service, ServiceStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::sync::Arc;

    const GATEWAY_SERVICE: &str = "istio-system/istio-ingressgateway";

    fn ingress_gateway(ips: &[&str], hostnames: &[&str]) -> Service {
        let ingress = ips
            .iter()
            .map(|ip| LoadBalancerIngress {
                ip: Some((*ip).to_string()),
                ..Default::default()
            })
            .chain(hostnames.iter().map(|h| LoadBalancerIngress {
                hostname: Some((*h).to_string()),
                ..Default::default()
            }))
            .collect();

        Service {
            metadata: ObjectMeta {
                name: Some("istio-ingressgateway".to_string()),
                namespace: Some("istio-system".to_string()),
                ..Default::default()
            },
            status: Some(ServiceStatus {
                load_balancer: Some(LoadBalancerStatus {
                    ingress: Some(ingress),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn gateway(name: &str, annotations: &[(&str, &str)], servers: &[&[&str]]) -> Gateway {
        let mut gw = Gateway::new(
            name,
            GatewaySpec {
                servers: servers
                    .iter()
                    .map(|hosts| Server {
                        hosts: hosts.iter().map(|h| (*h).to_string()).collect(),
                        port: None,
                    })
                    .collect(),
                ..Default::default()
            },
        );
        gw.metadata.namespace = Some("testing".to_string());
        gw.metadata.annotations = Some(
            annotations
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        gw
    }

    async fn source(
        service: Option<Service>,
        gateways: Vec<Gateway>,
        config: SourceConfig,
    ) -> GatewaySource {
        let store = VersionedConfigStore::<Gateway>::new();
        for gw in gateways {
            store.create(gw).await.unwrap();
        }
        let cluster = InMemoryCluster::new().with_services(service);
        GatewaySource::new(Arc::new(cluster), Arc::new(store), GATEWAY_SERVICE, config).unwrap()
    }

    fn summary(endpoints: &[crate::endpoint::Endpoint]) -> Vec<(String, RecordType, Vec<String>)> {
        endpoints
            .iter()
            .map(|ep| (ep.dns_name.clone(), ep.record_type, ep.targets.0.clone()))
            .collect()
    }

    fn entry(
        name: &str,
        record_type: RecordType,
        targets: &[&str],
    ) -> (String, RecordType, Vec<String>) {
        (
            name.to_string(),
            record_type,
            targets.iter().map(|t| (*t).to_string()).collect(),
        )
    }

    #[test]
    fn test_gateway_service_reference() {
        assert_eq!(
            GatewayServiceRef::parse(GATEWAY_SERVICE).unwrap(),
            GatewayServiceRef {
                namespace: "istio-system".to_string(),
                name: "istio-ingressgateway".to_string(),
            }
        );

        for bad in ["", "istio-ingressgateway", "/name", "ns/", "a/b/c"] {
            assert_eq!(
                GatewayServiceRef::parse(bad).unwrap_err(),
                ConfigError::InvalidGatewayService {
                    value: bad.to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn test_two_simple_gateways() {
        let src = source(
            Some(ingress_gateway(&["8.8.8.8"], &["lb.com"])),
            vec![
                gateway("fake1", &[], &[&["example.org"]]),
                gateway("fake2", &[], &[&["new.org"]]),
            ],
            SourceConfig::default(),
        )
        .await;

        let endpoints = src.endpoints().await.unwrap();
        assert_eq!(
            summary(&endpoints),
            vec![
                entry("example.org", RecordType::A, &["8.8.8.8"]),
                entry("example.org", RecordType::Cname, &["lb.com"]),
                entry("new.org", RecordType::A, &["8.8.8.8"]),
                entry("new.org", RecordType::Cname, &["lb.com"]),
            ]
        );
        assert_eq!(endpoints[0].resource(), Some("gateway/testing/fake1"));
        assert_eq!(endpoints[2].resource(), Some("gateway/testing/fake2"));
    }

    #[tokio::test]
    async fn test_host_normalisation() {
        let src = source(
            Some(ingress_gateway(&["8.8.8.8"], &[])),
            vec![gateway(
                "fake1",
                &[],
                &[&["testing/foo.bar", "*", ""], &["other.bar."]],
            )],
            SourceConfig::default(),
        )
        .await;

        assert_eq!(
            summary(&src.endpoints().await.unwrap()),
            vec![
                entry("foo.bar", RecordType::A, &["8.8.8.8"]),
                entry("other.bar", RecordType::A, &["8.8.8.8"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_targets_or_no_hosts() {
        let src = source(
            Some(ingress_gateway(&[], &[])),
            vec![gateway("fake1", &[], &[&["foo.bar"]])],
            SourceConfig::default(),
        )
        .await;
        assert!(src.endpoints().await.unwrap().is_empty());

        let src = source(
            Some(ingress_gateway(&["8.8.8.8"], &[])),
            vec![gateway("fake1", &[], &[&[""]])],
            SourceConfig::default(),
        )
        .await;
        assert!(src.endpoints().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_gateways_needs_no_service() {
        let src = source(None, Vec::new(), SourceConfig::default()).await;
        assert!(src.endpoints().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_ingress_gateway_service_fails() {
        let src = source(
            None,
            vec![gateway("fake1", &[], &[&["foo.bar"]])],
            SourceConfig::default(),
        )
        .await;

        let err = src.endpoints().await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::Cluster(ClusterError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_annotations_filter_and_template() {
        let src = source(
            Some(ingress_gateway(&["8.8.8.8"], &[])),
            vec![
                gateway(
                    "fake1",
                    &[
                        ("kubernetes.io/gateway.class", "nginx"),
                        (HOSTNAME_ANNOTATION, "dns-through-hostname.com"),
                    ],
                    &[&["example.org"]],
                ),
                gateway("fake2", &[("kubernetes.io/gateway.class", "nginx")], &[]),
                gateway("fake3", &[("kubernetes.io/gateway.class", "tectonic")], &[&["skip.org"]]),
            ],
            SourceConfig {
                annotation_filter: AnnotationFilter::parse("kubernetes.io/gateway.class=nginx")
                    .unwrap(),
                fqdn_template: Some(
                    FqdnTemplate::parse("{{.Name}}.ext-dns.test.com., {{.Name}}.ext-dna.test.com")
                        .unwrap(),
                ),
                ..Default::default()
            },
        )
        .await;

        let names: Vec<_> = src
            .endpoints()
            .await
            .unwrap()
            .into_iter()
            .map(|ep| ep.dns_name)
            .collect();
        assert_eq!(
            names,
            vec![
                "dns-through-hostname.com",
                "fake2.ext-dns.test.com",
                "fake2.ext-dna.test.com",
            ]
        );
    }
}
