// ABOUTME: Daily aggregate fetcher summing cumulative metrics over the current local day
// ABOUTME: Converts provider quantities to canonical units and fans out concurrent fetches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::join_all;
use pierre_core::errors::SyncError;
use pierre_core::models::{AggregateWindow, DailyAggregate, MetricType, Quantity};
use pierre_core::time::Clock;
use pierre_providers::{AggregateQuery, HealthDataProvider};
use tracing::debug;

use super::bridge::bridge;
use super::confined::ConfinedState;
use crate::logging::SyncLogger;

/// What caused a fetch; carried into logs only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    /// First fetch after authorization was granted
    Activation,
    /// Explicit `refresh_today()` call
    Refresh,
    /// Observer change notification
    Observer,
}

impl FetchTrigger {
    /// Identifier used in log fields
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Refresh => "refresh",
            Self::Observer => "observer",
        }
    }
}

/// Outcome of refreshing every granted cumulative metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodayRefresh {
    /// Canonical value or failure per refreshed metric
    pub outcomes: BTreeMap<MetricType, Result<f64, SyncError>>,
}

impl TodayRefresh {
    /// Fetched value for `metric`, if it was refreshed successfully
    #[must_use]
    pub fn value(&self, metric: MetricType) -> Option<f64> {
        self.outcomes
            .get(&metric)
            .and_then(|outcome| outcome.as_ref().ok().copied())
    }

    /// Whether every refreshed metric succeeded
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.values().all(Result::is_ok)
    }

    /// Failures, in metric order
    #[must_use]
    pub fn errors(&self) -> Vec<&SyncError> {
        self.outcomes
            .values()
            .filter_map(|outcome| outcome.as_ref().err())
            .collect()
    }
}

/// Fetches "sum over today" for cumulative metrics
pub struct DailyAggregateFetcher {
    provider: Arc<dyn HealthDataProvider>,
    clock: Arc<dyn Clock>,
}

impl DailyAggregateFetcher {
    /// Create a fetcher reading from `provider`, with day boundaries from `clock`
    #[must_use]
    pub fn new(provider: Arc<dyn HealthDataProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { provider, clock }
    }

    /// Sum `metric` over `window`, in the metric's canonical unit
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when the provider refuses the read,
    /// `SyncError::Unavailable` when the store is gone, and
    /// `SyncError::QueryFailed` for every other provider failure or a
    /// quantity reported in a unit of the wrong dimension.
    pub async fn fetch_sum(
        &self,
        metric: MetricType,
        window: AggregateWindow,
    ) -> Result<f64, SyncError> {
        let (completion, pending) = bridge::<Quantity>(self.provider.name(), "aggregate_query");
        self.provider
            .run_aggregate_query(AggregateQuery { metric, window }, completion);

        let quantity = pending
            .resolve()
            .await
            .map_err(|error| SyncError::from_provider(metric, &error))?;

        quantity
            .to_canonical(metric)
            .map_err(|mismatch| SyncError::QueryFailed {
                metric,
                reason: mismatch.to_string(),
            })
    }

    /// Sum `metric` over `[start of today, now)`
    ///
    /// The window is recomputed on every call, so a fetch after local
    /// midnight sums the new day only.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_sum`].
    pub async fn fetch_today(&self, metric: MetricType) -> Result<DailyAggregate, SyncError> {
        let window = AggregateWindow::today(self.clock.as_ref());
        let value = self.fetch_sum(metric, window).await?;
        Ok(DailyAggregate::new(metric, value, window))
    }

    /// Fetch today's sum for every metric in `metrics` concurrently
    ///
    /// Every fetch runs to completion; one failure never cancels the others.
    pub async fn fetch_all_today(
        &self,
        metrics: &[MetricType],
    ) -> Vec<(MetricType, Result<DailyAggregate, SyncError>)> {
        join_all(
            metrics
                .iter()
                .map(|&metric| async move { (metric, self.fetch_today(metric).await) }),
        )
        .await
    }
}

/// Per-metric fetch ordering owned by the confined context
///
/// Every fetch takes a ticket when it starts. Outcomes are applied in ticket
/// order per metric: a result whose fetch started before the last applied
/// success is dropped, so a slow fetch never rolls a value back.
#[derive(Debug, Default)]
pub(crate) struct FetchSequencer {
    issued: HashMap<MetricType, u64>,
    applied: HashMap<MetricType, u64>,
}

impl FetchSequencer {
    /// Ticket for a fetch of `metric` that is about to start
    pub(crate) fn issue(&mut self, metric: MetricType) -> u64 {
        let ticket = self.issued.entry(metric).or_default();
        *ticket += 1;
        *ticket
    }

    fn is_stale(&self, metric: MetricType, ticket: u64) -> bool {
        self.applied
            .get(&metric)
            .is_some_and(|&applied| ticket < applied)
    }

    fn mark_applied(&mut self, metric: MetricType, ticket: u64) {
        let applied = self.applied.entry(metric).or_default();
        *applied = (*applied).max(ticket);
    }
}

/// Record one fetch outcome in the snapshot
///
/// A failure leaves the previous value of the metric in place. Outcomes of
/// fetches that started before the last applied success are discarded.
pub(crate) fn apply_fetch_result(
    state: &mut ConfinedState,
    metric: MetricType,
    ticket: u64,
    outcome: &Result<DailyAggregate, SyncError>,
    trigger: FetchTrigger,
) {
    if state.fetches.is_stale(metric, ticket) {
        debug!(
            metric = %metric,
            ticket,
            trigger = trigger.as_str(),
            "Discarding result of a fetch overtaken by a newer one"
        );
        return;
    }
    match outcome {
        Ok(aggregate) => {
            SyncLogger::log_fetch(metric, trigger, Some(aggregate.value), None);
            state.fetches.mark_applied(metric, ticket);
            state.metrics.apply_aggregate(*aggregate);
        }
        Err(error) => {
            SyncLogger::log_fetch(metric, trigger, None, Some(error));
            state.metrics.record_error(error.clone());
        }
    }
}
