// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `template.rs`

#[cfg(test)]
mod tests {
    use crate::errors::ConfigError;
    use crate::template::{FqdnTemplate, TemplateData};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn meta(name: &str, namespace: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([("app".to_string(), "shop".to_string())])),
            annotations: Some(BTreeMap::from([(
                "team".to_string(),
                "payments".to_string(),
            )])),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_and_namespace() {
        let tmpl = FqdnTemplate::parse("{{.Name}}-{{.Namespace}}.ext-dns.test.com").unwrap();
        let meta = meta("web", "default");
        let data = TemplateData::from_meta("service", &meta);

        assert_eq!(tmpl.render(&data), "web-default.ext-dns.test.com");
    }

    #[test]
    fn test_multiple_hostnames_are_split_and_trimmed() {
        let tmpl =
            FqdnTemplate::parse("{{.Name}}.ext-dns.test.com., {{.Name}}.ext-dna.test.com").unwrap();
        let meta = meta("fake1", "testing");
        let data = TemplateData::from_meta("gateway", &meta);

        assert_eq!(
            tmpl.hostnames(&data),
            vec!["fake1.ext-dns.test.com", "fake1.ext-dna.test.com"]
        );
    }

    #[test]
    fn test_trim_functions() {
        let meta = meta("web-frontend", "default");
        let data = TemplateData::from_meta("service", &meta);

        let tmpl = FqdnTemplate::parse(r#"{{trimPrefix .Name "web-"}}.example.com"#).unwrap();
        assert_eq!(tmpl.render(&data), "frontend.example.com");

        let tmpl =
            FqdnTemplate::parse(r#"{{ trimSuffix .Name "-frontend" }}.example.com"#).unwrap();
        assert_eq!(tmpl.render(&data), "web.example.com");

        let tmpl = FqdnTemplate::parse("{{trimPrefix .Name `nomatch`}}").unwrap();
        assert_eq!(tmpl.render(&data), "web-frontend");
    }

    #[test]
    fn test_maps_and_nested_calls() {
        let meta = meta("Web", "default");
        let data = TemplateData::from_meta("service", &meta);

        let tmpl =
            FqdnTemplate::parse(r#"{{index .Labels "app"}}.{{.Annotations.team}}.com"#).unwrap();
        assert_eq!(tmpl.render(&data), "shop.payments.com");

        let tmpl = FqdnTemplate::parse(r#"{{toLower (trimPrefix .Name "W")}}"#).unwrap();
        assert_eq!(tmpl.render(&data), "eb");

        let tmpl = FqdnTemplate::parse(r#"{{index .Labels "missing"}}{{.Kind}}"#).unwrap();
        assert_eq!(tmpl.render(&data), "service");
    }

    #[test]
    fn test_missing_metadata_renders_empty() {
        let meta = ObjectMeta::default();
        let data = TemplateData::from_meta("ingress", &meta);
        let tmpl = FqdnTemplate::parse("{{.Name}}{{.Labels.app}}").unwrap();

        assert_eq!(tmpl.render(&data), "");
        assert!(tmpl.hostnames(&data).is_empty());
    }

    #[test]
    fn test_invalid_templates_are_rejected() {
        for source in [
            "{{.Name",
            "{{.Spec.Type}}",
            "{{.Name.First}}",
            "{{.Labels}}",
            "{{upper .Name}}",
            "{{trimPrefix .Name}}",
            r#"{{index .Name "x"}}"#,
            r#"{{trimPrefix .Name "x}}"#,
            "{{}}",
            "{{(.Name}}",
            "{{.Name .Namespace}}",
        ] {
            let result = FqdnTemplate::parse(source);
            assert!(
                matches!(result, Err(ConfigError::InvalidTemplate { .. })),
                "expected '{source}' to be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn test_plain_text_template() {
        let tmpl = FqdnTemplate::parse("static.example.com").unwrap();
        let meta = ObjectMeta::default();
        let data = TemplateData::from_meta("service", &meta);

        assert_eq!(tmpl.hostnames(&data), vec!["static.example.com"]);
        assert_eq!(tmpl.to_string(), "static.example.com");
    }
}
