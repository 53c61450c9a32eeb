// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation loop.
//!
//! A pass reads the desired endpoints from the sources and the current records
//! from the provider, diffs them into a [`Changes`] batch and applies it. [`Controller::run`]
//! repeats passes on a fixed interval until shutdown is requested. A pass that has
//! started always runs to completion.

use crate::metrics;
use crate::plan::{Changes, Plan};
use crate::provider::ShamanProvider;
use crate::source::Source;
use anyhow::{Context, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Periodic synchronization of sources into a provider.
pub struct Controller {
    source: Box<dyn Source>,
    plan: Plan,
    provider: ShamanProvider,
    interval: Duration,
}

impl Controller {
    /// Create a controller that reads `source` and writes through `provider`
    /// once per `interval`.
    #[must_use]
    pub fn new(
        source: Box<dyn Source>,
        plan: Plan,
        provider: ShamanProvider,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            plan,
            provider,
            interval,
        }
    }

    /// Run a single reconciliation pass and return the batch it applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources, the provider listing or any provider write
    /// fails. Writes made before a failed write are kept.
    pub async fn run_once(&self) -> Result<Changes> {
        let start = Instant::now();

        let desired = match self.source.endpoints().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                metrics::record_sync_error("source", start.elapsed());
                return Err(e).context("Failed to collect endpoints from sources");
            }
        };
        metrics::record_endpoints(desired.len());

        let current = match self.provider.records().await {
            Ok(records) => records,
            Err(e) => {
                metrics::record_sync_error("provider", start.elapsed());
                return Err(e).context("Failed to list provider records");
            }
        };

        let changes = self.plan.calculate(&desired, &current);
        debug!(
            desired = desired.len(),
            current = current.len(),
            create = changes.create.len(),
            update = changes.update_new.len(),
            delete = changes.delete.len(),
            policy = %self.plan.policy(),
            "Calculated changes"
        );

        if let Err(e) = self.provider.apply_changes(&changes).await {
            metrics::record_sync_error("provider", start.elapsed());
            return Err(e).context("Failed to apply changes");
        }

        if !self.provider.is_dry_run() {
            metrics::record_changes("create", changes.create.len());
            metrics::record_changes("update_old", changes.update_old.len());
            metrics::record_changes("update_new", changes.update_new.len());
            metrics::record_changes("delete", changes.delete.len());
        }
        metrics::record_sync_success(start.elapsed());

        let change_count = changes.create.len() + changes.update_new.len() + changes.delete.len();
        info!(
            endpoints = desired.len(),
            changes = change_count,
            dry_run = self.provider.is_dry_run(),
            duration_ms = start.elapsed().as_millis(),
            "Reconciliation pass complete"
        );

        Ok(changes)
    }

    /// Run passes every interval until `shutdown` resolves.
    ///
    /// The first pass starts immediately. A failed pass is logged and retried on the
    /// next tick.
    ///
    /// # Errors
    ///
    /// Currently never fails; the `Result` lets callers select over it alongside
    /// other long-running tasks.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting controller loop"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping controller loop");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("Reconciliation pass failed: {e:#}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
