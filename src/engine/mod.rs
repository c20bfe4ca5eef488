// ABOUTME: Metrics sync engine facade wiring authorization, fetching, observers, and live streams
// ABOUTME: Owns the confined context and exposes the observable metrics state to consumers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Metrics Sync Engine
//!
//! Keeps an observable, continuously refreshed view of today's health metrics
//! sourced from a push-capable [`HealthDataProvider`]:
//!
//! - Cumulative metrics (steps, active energy, distance) are summed over
//!   `[start of local day, now)` on authorization, on explicit refresh, and
//!   whenever the provider signals a change through an observer.
//! - Heart rate is tracked through an anchored stream; the sample with the
//!   greatest timestamp is kept regardless of delivery order.
//!
//! Provider callbacks arrive on arbitrary tasks. Every state change is hopped
//! onto a single confined task before it is applied, and consumers only ever
//! see complete snapshots through [`MetricsStateView`].

/// Daily aggregate fetching
pub mod aggregates;
/// Authorization requests and recorded decisions
pub mod authorization;
/// Background delivery registration
pub mod background;
mod bridge;
mod confined;
/// Live heart-rate stream tracking
pub mod live_stream;
/// Observer subscriptions and collapsed re-fetches
pub mod observers;
/// Published metrics state
pub mod state;

use std::collections::BTreeMap;
use std::sync::Arc;

use pierre_core::errors::SyncError;
use pierre_core::models::{AnchorCursor, AuthorizationState, MetricType};
use pierre_core::time::{Clock, SystemClock};
use pierre_providers::{AuthorizationGrants, HealthDataProvider};
use tracing::{info, warn};

pub use aggregates::{DailyAggregateFetcher, FetchTrigger, TodayRefresh};
pub use authorization::AuthorizationCoordinator;
pub use background::BackgroundDeliveryRegistrar;
use confined::ConfinedContext;
pub use live_stream::LiveStreamTracker;
pub use observers::{ObserverRegistry, ObserverStats};
pub use state::{MetricsSnapshot, MetricsStateView};

use crate::config::SyncConfig;

/// Engine keeping today's metrics in sync with a health data provider
///
/// Must be created inside a tokio runtime; the confined context runs as a
/// task on it.
pub struct MetricsSyncEngine {
    provider: Arc<dyn HealthDataProvider>,
    config: SyncConfig,
    confined: ConfinedContext,
    authorization: AuthorizationCoordinator,
    fetcher: Arc<DailyAggregateFetcher>,
    observers: ObserverRegistry,
    background: BackgroundDeliveryRegistrar,
    live: LiveStreamTracker,
}

impl MetricsSyncEngine {
    /// Create an engine using the system clock and local timezone
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn new(provider: Arc<dyn HealthDataProvider>, config: SyncConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    /// Create an engine with an explicit clock
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; the confined context is
    /// spawned onto the current one.
    #[must_use]
    pub fn with_clock(
        provider: Arc<dyn HealthDataProvider>,
        config: SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let confined = ConfinedContext::spawn();
        let fetcher = Arc::new(DailyAggregateFetcher::new(
            Arc::clone(&provider),
            Arc::clone(&clock),
        ));
        Self {
            authorization: AuthorizationCoordinator::new(Arc::clone(&provider)),
            observers: ObserverRegistry::new(
                Arc::clone(&provider),
                Arc::clone(&fetcher),
                confined.clone(),
            ),
            background: BackgroundDeliveryRegistrar::new(Arc::clone(&provider), confined.clone()),
            live: LiveStreamTracker::new(Arc::clone(&provider), clock, confined.clone()),
            fetcher,
            confined,
            config,
            provider,
        }
    }

    /// Observable state; clone it freely
    #[must_use]
    pub fn state(&self) -> MetricsStateView {
        MetricsStateView::new(self.confined.snapshots())
    }

    /// Configuration the engine was built with
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Request read access for every configured metric and activate granted ones
    ///
    /// Granted cumulative metrics are fetched once, observed, and (when
    /// configured) registered for background delivery. A granted heart rate
    /// opens the live stream. Denied metrics are skipped; the rest keep
    /// working.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unavailable` when the provider has no data store.
    pub async fn request_authorization(&self) -> Result<AuthorizationGrants, SyncError> {
        info!(
            provider = self.provider.name(),
            metrics = ?self.config.metrics,
            "Requesting health data authorization"
        );
        let grants = match self.authorization.request_access(&self.config.metrics).await {
            Ok(grants) => grants,
            Err(error) => {
                let recorded = error.clone();
                let requested = self.config.metrics.clone();
                self.confined
                    .run(move |state| {
                        // Without a data store every requested metric reads as denied
                        for metric in requested {
                            state
                                .metrics
                                .set_authorization(metric, AuthorizationState::Denied);
                        }
                        state.metrics.record_error(recorded);
                    })
                    .await;
                return Err(error);
            }
        };

        let recorded = grants.clone();
        self.confined
            .run(move |state| {
                for (metric, authorization) in recorded {
                    state.metrics.set_authorization(metric, authorization);
                    if !authorization.is_granted() {
                        state.metrics.record_error(SyncError::Unauthorized { metric });
                    }
                }
            })
            .await;

        self.activate(&grants).await;
        Ok(grants)
    }

    async fn activate(&self, grants: &AuthorizationGrants) {
        let cumulative: Vec<MetricType> = grants
            .iter()
            .filter(|(metric, state)| metric.is_cumulative() && state.is_granted())
            .map(|(metric, _)| *metric)
            .collect();

        self.refresh_metrics(&cumulative, FetchTrigger::Activation)
            .await;

        for &metric in &cumulative {
            if let Err(error) = self.observers.start(metric).await {
                warn!(metric = %metric, error = %error, "Observer not started");
                self.confined
                    .run(move |state| state.metrics.record_error(error))
                    .await;
                continue;
            }
            if self.config.background_delivery {
                // Failures are recorded by the registrar and do not stop activation
                let _ = self
                    .background
                    .enable(metric, self.config.background_frequency)
                    .await;
            }
        }

        let heart_rate_granted = grants
            .get(&MetricType::HeartRate)
            .is_some_and(|state| state.is_granted());
        if heart_rate_granted && self.config.live_heart_rate {
            if let Err(error) = self.live.start().await {
                warn!(error = %error, "Live heart rate not started");
            }
        }
    }

    /// Re-fetch today's sum for every granted cumulative metric
    ///
    /// Fetches run concurrently and each result is applied independently; a
    /// failed metric keeps its previous value.
    pub async fn refresh_today(&self) -> TodayRefresh {
        let granted = self
            .confined
            .run(|state| state.metrics.granted_metrics())
            .await
            .unwrap_or_default();
        let cumulative: Vec<MetricType> = granted
            .into_iter()
            .filter(|metric| metric.is_cumulative())
            .collect();
        self.refresh_metrics(&cumulative, FetchTrigger::Refresh)
            .await
    }

    async fn refresh_metrics(&self, metrics: &[MetricType], trigger: FetchTrigger) -> TodayRefresh {
        let issuing = metrics.to_vec();
        let tickets: BTreeMap<MetricType, u64> = self
            .confined
            .run(move |state| {
                issuing
                    .into_iter()
                    .map(|metric| (metric, state.fetches.issue(metric)))
                    .collect()
            })
            .await
            .unwrap_or_default();

        let outcomes = self.fetcher.fetch_all_today(metrics).await;
        let refresh = TodayRefresh {
            outcomes: outcomes
                .iter()
                .map(|(metric, outcome)| {
                    (
                        *metric,
                        outcome
                            .as_ref()
                            .map(|aggregate| aggregate.value)
                            .map_err(Clone::clone),
                    )
                })
                .collect(),
        };
        self.confined
            .run(move |state| {
                for (metric, outcome) in &outcomes {
                    let ticket = tickets.get(metric).copied().unwrap_or_default();
                    aggregates::apply_fetch_result(state, *metric, ticket, outcome, trigger);
                }
            })
            .await;
        refresh
    }

    /// Open the live heart-rate stream
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` if heart-rate access was not granted,
    /// otherwise whatever [`LiveStreamTracker::start`] reports.
    pub async fn start_live_updates(&self) -> Result<(), SyncError> {
        let granted = self
            .confined
            .run(|state| state.metrics.is_authorized_for(MetricType::HeartRate))
            .await
            .unwrap_or(false);
        if !granted {
            return Err(SyncError::Unauthorized {
                metric: MetricType::HeartRate,
            });
        }
        self.live.start().await
    }

    /// Close the live heart-rate stream and clear the current heart rate
    pub async fn stop_live_updates(&self) {
        self.live.stop().await;
    }

    /// Observer counters for `metric`
    pub async fn observer_stats(&self, metric: MetricType) -> ObserverStats {
        self.confined
            .run(move |state| state.observers.stats(metric))
            .await
            .unwrap_or_default()
    }

    /// Whether `metric` has an active observer subscription
    pub async fn is_observing(&self, metric: MetricType) -> bool {
        self.observers.is_observing(metric).await
    }

    /// Whether the live heart-rate stream is accepted
    pub async fn is_live(&self) -> bool {
        self.live.is_live().await
    }

    /// Anchor of the last applied heart-rate batch
    pub async fn live_anchor(&self) -> Option<AnchorCursor> {
        self.live.anchor().await
    }

    /// Authorization recorded for `metric` by the last request
    pub async fn recorded_authorization(&self, metric: MetricType) -> AuthorizationState {
        self.authorization.recorded_state(metric).await
    }

    /// Unregister every observer and close the live stream
    pub async fn shutdown(&self) {
        self.observers.stop_all().await;
        self.live.stop().await;
        info!(provider = self.provider.name(), "Metrics sync engine stopped");
    }
}
