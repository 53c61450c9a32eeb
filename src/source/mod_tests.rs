// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the shared source rules in `source/mod.rs`

#[cfg(test)]
mod tests {
    use crate::endpoint::{Endpoint, RecordType, Targets};
    use crate::errors::AnnotationError;
    use crate::labels::{
        CONTROLLER_ANNOTATION, HOSTNAME_ANNOTATION, TARGET_ANNOTATION, TTL_ANNOTATION,
    };
    use crate::selector::AnnotationFilter;
    use crate::source::{
        endpoints_for_hostname, finish_resource, hostnames_from_annotations, is_selected,
        merge_same_records, targets_from_annotation, ttl_from_annotations, SourceConfig,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn meta(pairs: &[(&str, &str)]) -> ObjectMeta {
        ObjectMeta {
            name: Some("web".to_string()),
            namespace: Some("shop".to_string()),
            annotations: Some(annotations(pairs)),
            ..Default::default()
        }
    }

    #[test]
    fn test_hostnames_are_split_and_trimmed() {
        let a = annotations(&[(HOSTNAME_ANNOTATION, " a.example.com , b.example.com,,")]);
        assert_eq!(
            hostnames_from_annotations(&a),
            vec!["a.example.com", "b.example.com"]
        );
        assert!(hostnames_from_annotations(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_targets_annotation_strips_trailing_dot() {
        let a = annotations(&[(TARGET_ANNOTATION, "lb.example.com., 10.0.0.1")]);
        assert_eq!(
            targets_from_annotation(&a).0,
            vec!["lb.example.com", "10.0.0.1"]
        );
    }

    #[test]
    fn test_ttl_annotation() {
        assert_eq!(ttl_from_annotations(&BTreeMap::new()).unwrap(), None);
        assert_eq!(
            ttl_from_annotations(&annotations(&[(TTL_ANNOTATION, "300")])).unwrap(),
            Some(300)
        );
        assert_eq!(
            ttl_from_annotations(&annotations(&[(TTL_ANNOTATION, "2147483647")])).unwrap(),
            Some(2_147_483_647)
        );

        for bad in ["foo", "0", "-10", "2147483648", ""] {
            let result = ttl_from_annotations(&annotations(&[(TTL_ANNOTATION, bad)]));
            assert!(
                matches!(result, Err(AnnotationError::InvalidTtl { .. })),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_mixed_targets_split_into_a_and_cname() {
        let targets: Targets = ["lb.example.com", "1.2.3.4", "2001:db8::1"]
            .into_iter()
            .collect();
        let endpoints = endpoints_for_hostname("mixed.example.com.", &targets, Some(60));

        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].dns_name, "mixed.example.com");
        assert_eq!(endpoints[0].record_type, RecordType::A);
        assert_eq!(endpoints[0].targets.0, vec!["1.2.3.4", "2001:db8::1"]);
        assert_eq!(endpoints[1].record_type, RecordType::Cname);
        assert_eq!(endpoints[1].targets.0, vec!["lb.example.com"]);
    }

    #[test]
    fn test_no_targets_yields_no_records() {
        assert!(endpoints_for_hostname("x.example.com", &Targets::default(), None).is_empty());
        let targets: Targets = ["1.2.3.4"].into_iter().collect();
        assert!(endpoints_for_hostname("", &targets, None).is_empty());
    }

    #[test]
    fn test_controller_and_filter_selection() {
        let config = SourceConfig {
            annotation_filter: AnnotationFilter::parse("team=payments").unwrap(),
            ..Default::default()
        };

        assert!(is_selected(&config, "service", &meta(&[("team", "payments")])));
        assert!(!is_selected(&config, "service", &meta(&[("team", "search")])));
        let foreign = meta(&[
            ("team", "payments"),
            (CONTROLLER_ANNOTATION, "other-controller"),
        ]);
        assert!(!is_selected(&config, "service", &foreign));
        assert!(is_selected(
            &SourceConfig::default(),
            "service",
            &meta(&[(CONTROLLER_ANNOTATION, "dns-controller")])
        ));
    }

    #[test]
    fn test_merge_same_records() {
        let merged = merge_same_records(vec![
            Endpoint::new("a.example.com", RecordType::A, ["1.1.1.1"]),
            Endpoint::new("A.example.com", RecordType::A, ["2.2.2.2", "1.1.1.1"]),
            Endpoint::new("a.example.com", RecordType::Cname, ["lb.example.com"]),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].targets.0, vec!["1.1.1.1", "2.2.2.2"]);
        assert_eq!(merged[1].record_type, RecordType::Cname);
    }

    #[test]
    fn test_finish_resource_sorts_and_labels() {
        let endpoints = finish_resource(
            "service",
            &meta(&[]),
            vec![Endpoint::new("a.example.com", RecordType::A, ["9.9.9.9", "1.1.1.1"])],
        );

        assert_eq!(endpoints[0].targets.0, vec!["1.1.1.1", "9.9.9.9"]);
        assert_eq!(endpoints[0].resource(), Some("service/shop/web"));
        assert!(finish_resource("service", &meta(&[]), Vec::new()).is_empty());
    }
}
