// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ingress.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::InMemoryCluster;
    use crate::endpoint::RecordType;
    use crate::errors::{ClusterError, SourceError};
    use crate::labels::{HOSTNAME_ANNOTATION, TARGET_ANNOTATION};
    use crate::source::ingress::IngressSource;
    use crate::source::{Source, SourceConfig};
    use crate::template::FqdnTemplate;
    use k8s_openapi::api::networking::v1::{
        Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressRule, IngressSpec,
        IngressStatus, IngressTLS,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct Fake<'a> {
        name: &'a str,
        namespace: &'a str,
        annotations: &'a [(&'a str, &'a str)],
        rule_hosts: &'a [&'a str],
        tls_hosts: &'a [&'a str],
        ips: &'a [&'a str],
        hostnames: &'a [&'a str],
    }

    impl Default for Fake<'_> {
        fn default() -> Self {
            Self {
                name: "shop",
                namespace: "testing",
                annotations: &[],
                rule_hosts: &[],
                tls_hosts: &[],
                ips: &[],
                hostnames: &[],
            }
        }
    }

    impl Fake<'_> {
        fn ingress(&self) -> Ingress {
            let annotations: BTreeMap<String, String> = self
                .annotations
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();

            let lb = self
                .ips
                .iter()
                .map(|ip| IngressLoadBalancerIngress {
                    ip: Some((*ip).to_string()),
                    ..Default::default()
                })
                .chain(self.hostnames.iter().map(|h| IngressLoadBalancerIngress {
                    hostname: Some((*h).to_string()),
                    ..Default::default()
                }))
                .collect();

            Ingress {
                metadata: ObjectMeta {
                    name: Some(self.name.to_string()),
                    namespace: Some(self.namespace.to_string()),
                    annotations: Some(annotations),
                    ..Default::default()
                },
                spec: Some(IngressSpec {
                    rules: Some(
                        self.rule_hosts
                            .iter()
                            .map(|h| IngressRule {
                                host: Some((*h).to_string()),
                                ..Default::default()
                            })
                            .collect(),
                    ),
                    tls: Some(vec![IngressTLS {
                        hosts: Some(self.tls_hosts.iter().map(|h| (*h).to_string()).collect()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
                status: Some(IngressStatus {
                    load_balancer: Some(IngressLoadBalancerStatus { ingress: Some(lb) }),
                }),
            }
        }
    }

    async fn run(
        config: SourceConfig,
        ingresses: Vec<Ingress>,
    ) -> Vec<(String, RecordType, Vec<String>)> {
        let cluster = InMemoryCluster::new().with_ingresses(ingresses);
        IngressSource::new(Arc::new(cluster), config)
            .endpoints()
            .await
            .unwrap()
            .into_iter()
            .map(|ep| (ep.dns_name, ep.record_type, ep.targets.0))
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

    #[tokio::test]
    async fn test_rule_and_tls_hosts() {
        let ing = Fake {
            rule_hosts: &["foo.bar", ""],
            tls_hosts: &["secure.bar", "foo.bar"],
            ips: &["8.8.8.8"],
            ..Default::default()
        }
        .ingress();

        assert_eq!(
            run(SourceConfig::default(), vec![ing]).await,
            vec![
                entry("foo.bar", RecordType::A, &["8.8.8.8"]),
                entry("secure.bar", RecordType::A, &["8.8.8.8"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_hostname_annotation_wins_over_rule_hosts() {
        let ing = Fake {
            annotations: &[(HOSTNAME_ANNOTATION, "a.example.com")],
            rule_hosts: &["b.example.com"],
            hostnames: &["lb.com"],
            ..Default::default()
        }
        .ingress();

        assert_eq!(
            run(SourceConfig::default(), vec![ing]).await,
            vec![entry("a.example.com", RecordType::Cname, &["lb.com"])]
        );
    }

    #[tokio::test]
    async fn test_ips_and_hostnames_split_by_type() {
        let ing = Fake {
            rule_hosts: &["foo.bar"],
            ips: &["8.8.8.8", "127.0.0.1"],
            hostnames: &["elb.com", "alb.com"],
            ..Default::default()
        }
        .ingress();

        assert_eq!(
            run(SourceConfig::default(), vec![ing]).await,
            vec![
                entry("foo.bar", RecordType::A, &["127.0.0.1", "8.8.8.8"]),
                entry("foo.bar", RecordType::Cname, &["alb.com", "elb.com"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_target_annotation_overrides_status() {
        let ing = Fake {
            annotations: &[(TARGET_ANNOTATION, "ingress-target.com")],
            rule_hosts: &["foo.bar"],
            ips: &["8.8.8.8"],
            ..Default::default()
        }
        .ingress();

        assert_eq!(
            run(SourceConfig::default(), vec![ing]).await,
            vec![entry("foo.bar", RecordType::Cname, &["ingress-target.com"])]
        );
    }

    #[tokio::test]
    async fn test_no_targets_or_hosts() {
        let no_targets = Fake {
            name: "pending",
            rule_hosts: &["foo.bar"],
            ..Default::default()
        }
        .ingress();
        let no_hosts = Fake {
            name: "hostless",
            ips: &["8.8.8.8"],
            ..Default::default()
        }
        .ingress();

        assert!(run(SourceConfig::default(), vec![no_targets, no_hosts])
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_template_combine() {
        let ing = Fake {
            name: "svc",
            rule_hosts: &["svc.example.com"],
            ips: &["1.2.3.4"],
            ..Default::default()
        }
        .ingress();
        let config = SourceConfig {
            fqdn_template: Some(FqdnTemplate::parse("{{.Name}}.tpl.com").unwrap()),
            combine_fqdn_annotation: true,
            ..Default::default()
        };

        assert_eq!(
            run(config, vec![ing]).await,
            vec![
                entry("svc.example.com", RecordType::A, &["1.2.3.4"]),
                entry("svc.tpl.com", RecordType::A, &["1.2.3.4"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_template_only_used_as_fallback() {
        let named = Fake {
            name: "named",
            rule_hosts: &["named.example.com"],
            ips: &["1.2.3.4"],
            ..Default::default()
        }
        .ingress();
        let unnamed = Fake {
            name: "unnamed",
            ips: &["1.2.3.4"],
            ..Default::default()
        }
        .ingress();
        let config = SourceConfig {
            fqdn_template: Some(FqdnTemplate::parse("{{.Name}}.{{.Namespace}}.tpl.com").unwrap()),
            ..Default::default()
        };

        let names: Vec<_> = run(config, vec![named, unnamed])
            .await
            .into_iter()
            .map(|(name, _, _)| name)
            .collect();
        assert_eq!(names, vec!["named.example.com", "unnamed.testing.tpl.com"]);
    }

    #[tokio::test]
    async fn test_namespace_scope_and_resource_label() {
        let cluster = InMemoryCluster::new().with_ingresses([
            Fake {
                rule_hosts: &["in.example.com"],
                ips: &["1.1.1.1"],
                ..Default::default()
            }
            .ingress(),
            Fake {
                namespace: "other",
                rule_hosts: &["out.example.com"],
                ips: &["2.2.2.2"],
                ..Default::default()
            }
            .ingress(),
        ]);
        let config = SourceConfig {
            namespace: "testing".to_string(),
            ..Default::default()
        };

        let endpoints = IngressSource::new(Arc::new(cluster), config)
            .endpoints()
            .await
            .unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].resource(), Some("ingress/testing/shop"));
    }

    #[tokio::test]
    async fn test_listing_failure_aborts() {
        let failure = ClusterError::Transport {
            resource: "ingresses".to_string(),
            reason: "timeout".to_string(),
        };
        let cluster = InMemoryCluster::new().with_failure("ingresses", failure.clone());

        let err = IngressSource::new(Arc::new(cluster), SourceConfig::default())
            .endpoints()
            .await
            .unwrap_err();
        assert_eq!(err, SourceError::Cluster(failure));
    }
}
