// ABOUTME: Observable metrics snapshot published by the sync engine
// ABOUTME: Consumers read snapshots and await changes; only the confined context mutates them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use pierre_core::errors::SyncError;
use pierre_core::models::{AuthorizationState, DailyAggregate, LiveSample, MetricType};
use serde::Serialize;
use tokio::sync::watch;

/// Latest known values of every synchronized metric
///
/// Cumulative values are kept unrounded in canonical units (count, kcal,
/// meters). A metric that was never fetched successfully reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Steps taken today
    pub steps: f64,
    /// Active energy burned today, in kilocalories
    pub active_energy_kcal: f64,
    /// Distance walked or run today, in meters
    pub distance_meters: f64,
    /// Most recent successful aggregate per cumulative metric
    pub aggregates: BTreeMap<MetricType, DailyAggregate>,
    /// Latest live heart rate sample; `None` when no stream is active
    pub heart_rate: Option<LiveSample>,
    /// Authorization recorded per metric
    pub authorization: BTreeMap<MetricType, AuthorizationState>,
    /// Most recent failure, kept until a success for the same metric
    pub last_error: Option<SyncError>,
    /// Incremented every time a changed snapshot is published
    pub revision: u64,
}

impl MetricsSnapshot {
    /// Steps rounded for display
    #[must_use]
    pub fn today_steps(&self) -> i64 {
        self.steps.round() as i64
    }

    /// Active energy in kilocalories
    #[must_use]
    pub const fn today_active_energy(&self) -> f64 {
        self.active_energy_kcal
    }

    /// Distance in meters
    #[must_use]
    pub const fn today_distance(&self) -> f64 {
        self.distance_meters
    }

    /// Current heart rate in beats per minute
    #[must_use]
    pub fn current_heart_rate(&self) -> Option<f64> {
        self.heart_rate.map(|sample| sample.value)
    }

    /// Cached canonical value of a cumulative metric
    #[must_use]
    pub fn value(&self, metric: MetricType) -> Option<f64> {
        match metric {
            MetricType::Steps => Some(self.steps),
            MetricType::ActiveEnergy => Some(self.active_energy_kcal),
            MetricType::Distance => Some(self.distance_meters),
            MetricType::HeartRate => self.current_heart_rate(),
        }
    }

    /// Whether read access was granted for at least one metric
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.authorization.values().any(|state| state.is_granted())
    }

    /// Whether read access was granted for `metric`
    #[must_use]
    pub fn is_authorized_for(&self, metric: MetricType) -> bool {
        self.authorization
            .get(&metric)
            .is_some_and(|state| state.is_granted())
    }

    /// Metrics with granted read access
    #[must_use]
    pub fn granted_metrics(&self) -> Vec<MetricType> {
        self.authorization
            .iter()
            .filter(|(_, state)| state.is_granted())
            .map(|(metric, _)| *metric)
            .collect()
    }

    pub(crate) fn set_authorization(&mut self, metric: MetricType, state: AuthorizationState) {
        self.authorization.insert(metric, state);
    }

    /// Store a freshly fetched daily sum
    pub(crate) fn apply_aggregate(&mut self, aggregate: DailyAggregate) {
        match aggregate.metric {
            MetricType::Steps => self.steps = aggregate.value,
            MetricType::ActiveEnergy => self.active_energy_kcal = aggregate.value,
            MetricType::Distance => self.distance_meters = aggregate.value,
            MetricType::HeartRate => return,
        }
        let cleared_by_fetch = self.last_error.as_ref().is_some_and(|error| {
            matches!(
                error,
                SyncError::QueryFailed { .. } | SyncError::Unauthorized { .. }
            ) && error.metric() == Some(aggregate.metric)
        });
        if cleared_by_fetch {
            self.last_error = None;
        }
        self.aggregates.insert(aggregate.metric, aggregate);
    }

    pub(crate) fn record_error(&mut self, error: SyncError) {
        self.last_error = Some(error);
    }
}

/// Read-only handle on the engine's published state
///
/// Cloning a view is cheap; every clone observes the same snapshots.
#[derive(Debug, Clone)]
pub struct MetricsStateView {
    receiver: watch::Receiver<MetricsSnapshot>,
}

impl MetricsStateView {
    pub(crate) fn new(mut receiver: watch::Receiver<MetricsSnapshot>) -> Self {
        receiver.mark_unchanged();
        Self { receiver }
    }

    /// Most recently published snapshot
    #[must_use]
    pub fn current(&self) -> MetricsSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait until a snapshot newer than the last one seen is published
    ///
    /// Returns `false` once the engine has shut down.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Wait until a published snapshot satisfies `predicate`
    ///
    /// Returns `None` if the engine shuts down first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&MetricsSnapshot) -> bool,
    ) -> Option<MetricsSnapshot> {
        self.receiver
            .wait_for(predicate)
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}
