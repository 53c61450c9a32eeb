// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the Shaman DNS API.
//!
//! | Operation | Request |
//! |---|---|
//! | create | `POST /records` with a [`Resource`] body |
//! | update | `PUT /records/{domain}` with a [`Resource`] body |
//! | delete | `DELETE /records/{domain}` |
//! | list | `GET /records?full=true` returning `[Resource]` |
//!
//! Every request carries the API token in the `X-AUTH-TOKEN` header.

use crate::constants::SHAMAN_AUTH_HEADER;
use crate::errors::{ConfigError, ProviderError};
use crate::provider::{ProviderClient, Resource};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

/// [`ProviderClient`] talking to a Shaman server.
#[derive(Clone, Debug)]
pub struct ShamanClient {
    http: HttpClient,
    base: Url,
    token: String,
}

impl ShamanClient {
    /// Client for the server at `host` (e.g. `http://localhost:1632`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProviderHost`] if `host` is not an absolute
    /// HTTP(S) URL.
    pub fn new(host: &str, token: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidProviderHost {
            host: host.to_string(),
            reason,
        };

        let base = Url::parse(host).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }

        Ok(Self {
            http: HttpClient::new(),
            base,
            token: token.to_string(),
        })
    }

    /// Base URL of the server.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `<base>/records[/<domain>]`
    fn records_url(&self, domain: Option<&str>) -> Result<Url, ProviderError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ProviderError::InvalidUrl {
                    reason: format!("'{}' cannot be a base URL", self.base),
                })?;
            segments.pop_if_empty().push("records");
            if let Some(domain) = domain {
                segments.push(domain);
            }
        }
        Ok(url)
    }

    async fn request<T: Serialize + std::fmt::Debug + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&T>,
    ) -> Result<String, ProviderError> {
        debug!(method = %method, url = %url, body = ?body, "HTTP request to shaman");

        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        if !self.token.is_empty() {
            request = request.header(SHAMAN_AUTH_HEADER, &self.token);
        }

        let response = request.send().await.map_err(|e| ProviderError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                method = %method,
                url = %url,
                status = %status,
                error = %message,
                "HTTP request to shaman failed"
            );
            return Err(ProviderError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                message,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!(
            method = %method,
            url = %url,
            status = %status,
            response_len = text.len(),
            "HTTP request to shaman successful"
        );
        Ok(text)
    }
}

#[async_trait]
impl ProviderClient for ShamanClient {
    async fn create(&self, resource: &Resource) -> Result<(), ProviderError> {
        let url = self.records_url(None)?;
        self.request(Method::POST, url, Some(resource)).await?;
        Ok(())
    }

    async fn update(&self, resource: &Resource) -> Result<(), ProviderError> {
        let url = self.records_url(Some(&resource.domain))?;
        self.request(Method::PUT, url, Some(resource)).await?;
        Ok(())
    }

    async fn delete(&self, domain: &str) -> Result<(), ProviderError> {
        let url = self.records_url(Some(domain))?;
        self.request::<Resource>(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Resource>, ProviderError> {
        let mut url = self.records_url(None)?;
        url.query_pairs_mut().append_pair("full", "true");

        let body = self
            .request::<Resource>(Method::GET, url.clone(), None)
            .await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "shaman_tests.rs"]
mod shaman_tests;
