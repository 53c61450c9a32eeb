// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use dnsbridge::{
    cluster::{ClusterClient, KubeClusterClient},
    config::{Config, LogFormat, SourceKind},
    controller::Controller,
    metrics,
    plan::Plan,
    provider::ShamanProvider,
    source::{
        gateway::GatewaySource, ingress::IngressSource, multi::MultiSource,
        service::ServiceSource, store::KubeGatewayStore, Source,
    },
};
use kube::Client;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("dnsbridge")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_tracing(format: LogFormat) {
    // Respects RUST_LOG if set, otherwise defaults to INFO level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    info!("Starting dnsbridge");
    debug!(config = %config, "Loaded configuration");
    config.validate().context("Invalid configuration")?;

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let cluster: Arc<dyn ClusterClient> = Arc::new(KubeClusterClient::new(client.clone()));

    let source_config = config.source_config()?;
    let mut sources: Vec<Box<dyn Source>> = Vec::new();
    for kind in &config.sources {
        let source: Box<dyn Source> = match kind {
            SourceKind::Service => Box::new(ServiceSource::new(
                cluster.clone(),
                source_config.clone(),
            )),
            SourceKind::Ingress => Box::new(IngressSource::new(
                cluster.clone(),
                source_config.clone(),
            )),
            SourceKind::Gateway => Box::new(GatewaySource::new(
                cluster.clone(),
                Arc::new(KubeGatewayStore::new(client.clone())),
                &config.gateway_service,
                source_config.clone(),
            )?),
        };
        sources.push(source);
    }
    info!(sources = sources.len(), "Sources configured");

    let provider = ShamanProvider::new(Arc::new(config.provider_client()?))
        .with_dry_run(config.dry_run)
        .with_logging();
    if config.dry_run {
        warn!("Dry run enabled, no changes will be written to the provider");
    }

    let controller = Controller::new(
        Box::new(MultiSource::new(sources)),
        Plan::new(config.policy),
        provider,
        config.interval(),
    );

    if config.once {
        controller.run_once().await?;
        return Ok(());
    }

    let listener = TcpListener::bind(config.metrics_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.metrics_address))?;
    info!(address = %config.metrics_address, "Serving /healthz and /metrics");

    tokio::select! {
        result = serve_http(listener) => {
            error!("CRITICAL: HTTP server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("HTTP server exited unexpectedly without error")
        }
        result = controller.run(shutdown_signal()) => {
            result?;
            info!("dnsbridge stopped");
            Ok(())
        }
    }
}

async fn serve_http(listener: TcpListener) -> Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler));
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics_handler() -> (StatusCode, String) {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
