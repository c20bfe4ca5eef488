// ABOUTME: Observer registry turning provider change notifications into aggregate re-fetches
// ABOUTME: Acknowledges immediately and collapses notifications that arrive while a re-fetch is in flight
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pierre_core::errors::SyncError;
use pierre_core::models::MetricType;
use pierre_providers::{ChangeHandler, HealthDataProvider, ObserverAck, ObserverHandle};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::aggregates::{apply_fetch_result, DailyAggregateFetcher, FetchTrigger};
use super::confined::ConfinedContext;
use crate::logging::SyncLogger;

/// Per-metric observer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObserverStats {
    /// Notifications that started a re-fetch
    pub refetches: u64,
    /// Notifications dropped because a re-fetch was already in flight
    pub collapsed: u64,
}

/// Observer bookkeeping owned by the confined context
#[derive(Debug, Default)]
pub(crate) struct ObserverLedger {
    subscriptions: HashMap<MetricType, u64>,
    in_flight: HashSet<MetricType>,
    stats: HashMap<MetricType, ObserverStats>,
}

impl ObserverLedger {
    /// Decide whether a notification for `subscription` starts a re-fetch
    fn begin_refetch(&mut self, metric: MetricType, subscription: u64) -> bool {
        if self.subscriptions.get(&metric) != Some(&subscription) {
            debug!(metric = %metric, "Ignoring notification for a stopped observer");
            return false;
        }
        let stats = self.stats.entry(metric).or_default();
        if !self.in_flight.insert(metric) {
            stats.collapsed += 1;
            SyncLogger::log_collapsed(metric, stats.collapsed);
            return false;
        }
        stats.refetches += 1;
        true
    }

    fn finish_refetch(&mut self, metric: MetricType) {
        self.in_flight.remove(&metric);
    }

    pub(crate) fn stats(&self, metric: MetricType) -> ObserverStats {
        self.stats.get(&metric).copied().unwrap_or_default()
    }
}

/// Maintains one change subscription per observed metric
pub struct ObserverRegistry {
    provider: Arc<dyn HealthDataProvider>,
    fetcher: Arc<DailyAggregateFetcher>,
    confined: ConfinedContext,
    handles: Mutex<HashMap<MetricType, ObserverHandle>>,
    next_subscription: AtomicU64,
}

impl ObserverRegistry {
    pub(crate) fn new(
        provider: Arc<dyn HealthDataProvider>,
        fetcher: Arc<DailyAggregateFetcher>,
        confined: ConfinedContext,
    ) -> Self {
        Self {
            provider,
            fetcher,
            confined,
            handles: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Subscribe to changes of `metric`; a second call for the same metric is a no-op
    ///
    /// # Errors
    ///
    /// Returns the mapped provider error if the subscription is refused.
    pub async fn start(&self, metric: MetricType) -> Result<(), SyncError> {
        let mut handles = self.handles.lock().await;
        if handles.contains_key(&metric) {
            return Ok(());
        }

        let subscription = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.confined
            .run(move |state| {
                state.observers.subscriptions.insert(metric, subscription);
            })
            .await;

        match self
            .provider
            .register_observer(metric, self.change_handler(metric, subscription))
        {
            Ok(handle) => {
                info!(metric = %metric, provider = self.provider.name(), "Observer registered");
                handles.insert(metric, handle);
                Ok(())
            }
            Err(error) => {
                self.confined
                    .run(move |state| {
                        state.observers.subscriptions.remove(&metric);
                    })
                    .await;
                Err(SyncError::from_provider(metric, &error))
            }
        }
    }

    /// Cancel the subscription for `metric`
    ///
    /// Notifications already queued for this subscription are ignored once
    /// this returns.
    pub async fn stop(&self, metric: MetricType) {
        let mut handles = self.handles.lock().await;
        let Some(handle) = handles.remove(&metric) else {
            return;
        };
        self.confined
            .run(move |state| {
                state.observers.subscriptions.remove(&metric);
            })
            .await;
        self.provider.unregister_observer(&handle);
        info!(metric = %metric, provider = self.provider.name(), "Observer unregistered");
    }

    /// Cancel every subscription
    pub async fn stop_all(&self) {
        let mut handles = self.handles.lock().await;
        let stopped: Vec<(MetricType, ObserverHandle)> = handles.drain().collect();
        if stopped.is_empty() {
            return;
        }

        let metrics: Vec<MetricType> = stopped.iter().map(|(metric, _)| *metric).collect();
        self.confined
            .run(move |state| {
                for metric in &metrics {
                    state.observers.subscriptions.remove(metric);
                }
            })
            .await;
        for (metric, handle) in stopped {
            self.provider.unregister_observer(&handle);
            info!(metric = %metric, provider = self.provider.name(), "Observer unregistered");
        }
    }

    /// Whether `metric` currently has a subscription
    pub async fn is_observing(&self, metric: MetricType) -> bool {
        self.handles.lock().await.contains_key(&metric)
    }

    fn change_handler(&self, metric: MetricType, subscription: u64) -> ChangeHandler {
        let confined = self.confined.clone();
        let fetcher = Arc::clone(&self.fetcher);
        Arc::new(move |ack: ObserverAck| {
            // Release the provider before doing any work
            ack.complete();

            let fetcher = Arc::clone(&fetcher);
            let reply_to = confined.clone();
            confined.submit(move |state| {
                if !state.observers.begin_refetch(metric, subscription) {
                    return;
                }
                let ticket = state.fetches.issue(metric);
                tokio::spawn(async move {
                    let outcome = fetcher.fetch_today(metric).await;
                    reply_to.submit(move |state| {
                        state.observers.finish_refetch(metric);
                        apply_fetch_result(state, metric, ticket, &outcome, FetchTrigger::Observer);
                    });
                });
            });
        })
    }
}
