// ABOUTME: In-memory synthetic health data provider for development and testing
// ABOUTME: Scriptable authorization, injectable samples, latency, failures, observers, and streams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// RwLock poisoning is recovered with `PoisonError::into_inner`: the fixture's
// state stays usable even if a test callback panicked while holding a lock.

//! # Synthetic Health Provider
//!
//! A fixture provider behaving like an on-device health store without any
//! platform dependency:
//!
//! - Authorization decisions are scripted per metric and remembered after the
//!   first prompt, so repeated requests can be checked for re-prompting.
//! - Samples are injected with explicit timestamps and summed at query
//!   completion time, after the configured latency has elapsed.
//! - Observers are fired on demand with [`SyntheticHealthProvider::notify_change`].
//! - Streams receive an initial batch on open and later batches through
//!   [`SyntheticHealthProvider::push_stream_samples`].
//!
//! All callbacks are invoked on tokio tasks spawned by the provider, mirroring
//! a real provider's own execution context. Outside a tokio runtime they run
//! inline on the calling thread.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pierre_providers::synthetic::SyntheticHealthProvider;
//! use pierre_providers::models::MetricType;
//! use chrono::Utc;
//!
//! let provider = SyntheticHealthProvider::new();
//! provider.add_sample(MetricType::Steps, 1_200.0, Utc::now());
//! assert_eq!(provider.sample_count(MetricType::Steps), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::constants::provider_names;
use crate::core::{
    AggregateQuery, AuthorizationGrants, ChangeHandler, Completion, HealthDataProvider,
    ObserverAck, ObserverHandle, StreamBatch, StreamHandle, StreamHandler,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::models::{
    AnchorCursor, AuthorizationState, MetricType, MetricUnit, Quantity, RawSample,
    UpdateFrequency,
};

/// Stored sample in canonical units with its stream position
#[derive(Debug, Clone, Copy)]
struct StoredSample {
    position: u64,
    value: f64,
    timestamp: DateTime<Utc>,
}

/// Open (or retained closed) stream registration
#[derive(Clone)]
struct StreamRegistration {
    id: u64,
    metric: MetricType,
    window_start: DateTime<Utc>,
    handler: StreamHandler,
}

/// Mutable fixture state
#[derive(Default)]
struct SyntheticState {
    decisions: HashMap<MetricType, AuthorizationState>,
    status: HashMap<MetricType, AuthorizationState>,
    samples: HashMap<MetricType, Vec<StoredSample>>,
    units: HashMap<MetricType, MetricUnit>,
    query_latency: Duration,
    query_failures: HashMap<MetricType, String>,
    query_counts: HashMap<MetricType, usize>,
    background_failures: HashMap<MetricType, String>,
    background_enabled: HashMap<MetricType, UpdateFrequency>,
    observers: HashMap<u64, (MetricType, ChangeHandler)>,
    streams: HashMap<u64, StreamRegistration>,
    closed_streams: Vec<StreamRegistration>,
    next_position: u64,
}

struct Inner {
    name: &'static str,
    available: AtomicBool,
    duplicate_callbacks: AtomicBool,
    drop_callbacks: AtomicBool,
    late_delivery: AtomicBool,
    prompts: AtomicUsize,
    pending_acks: Arc<AtomicUsize>,
    next_id: AtomicU64,
    state: RwLock<SyntheticState>,
}

impl Inner {
    fn read(&self) -> RwLockReadGuard<'_, SyntheticState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SyntheticState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self, metric: MetricType) -> AuthorizationState {
        self.read().status.get(&metric).copied().unwrap_or_default()
    }

    fn unit(&self, metric: MetricType) -> MetricUnit {
        self.read()
            .units
            .get(&metric)
            .copied()
            .unwrap_or_else(|| metric.canonical_unit())
    }

    fn to_raw(&self, metric: MetricType, value: f64, timestamp: DateTime<Utc>) -> RawSample {
        let unit = self.unit(metric);
        let quantity = Quantity::from_canonical(metric, value, unit)
            .unwrap_or_else(|_| Quantity::new(value, metric.canonical_unit()));
        RawSample::new(quantity, timestamp)
    }

    /// Evaluate an aggregate query against the samples present right now
    fn evaluate(&self, query: AggregateQuery) -> ProviderResult<Quantity> {
        if !self.status(query.metric).is_granted() {
            return Err(ProviderError::NotAuthorized {
                provider: self.name.to_owned(),
                metric: query.metric,
            });
        }
        if !query.metric.is_cumulative() {
            return Err(ProviderError::UnsupportedMetric {
                provider: self.name.to_owned(),
                metric: query.metric,
            });
        }
        let state = self.read();
        if let Some(reason) = state.query_failures.get(&query.metric) {
            return Err(ProviderError::QueryFailed {
                provider: self.name.to_owned(),
                metric: query.metric,
                reason: reason.clone(),
            });
        }
        let sum: f64 = state
            .samples
            .get(&query.metric)
            .into_iter()
            .flatten()
            .filter(|sample| query.window.contains(sample.timestamp))
            .map(|sample| sample.value)
            .sum();
        let unit = state
            .units
            .get(&query.metric)
            .copied()
            .unwrap_or_else(|| query.metric.canonical_unit());
        drop(state);

        Quantity::from_canonical(query.metric, sum, unit).map_err(|e| {
            ProviderError::QueryFailed {
                provider: self.name.to_owned(),
                metric: query.metric,
                reason: e.to_string(),
            }
        })
    }

    /// Invoke a completion, honoring the duplicate and drop fault modes
    fn complete<T: Clone>(&self, completion: &Completion<T>, result: ProviderResult<T>) {
        if self.drop_callbacks.load(Ordering::SeqCst) {
            debug!(provider = self.name, "Dropping completion without invoking it");
            return;
        }
        completion(result.clone());
        if self.duplicate_callbacks.load(Ordering::SeqCst) {
            debug!(provider = self.name, "Invoking completion a second time");
            completion(Err(ProviderError::RequestFailed {
                provider: self.name.to_owned(),
                reason: "duplicate delivery".to_owned(),
            }));
        }
    }
}

/// Run `task` on a provider-owned tokio task after `delay`, or inline without a runtime
fn dispatch(delay: Duration, task: impl FnOnce() + Send + 'static) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                task();
            });
        }
        Err(_) => task(),
    }
}

/// In-memory health data provider with scriptable behavior
///
/// Cloning yields another handle to the same fixture.
#[derive(Clone)]
pub struct SyntheticHealthProvider {
    inner: Arc<Inner>,
}

impl Default for SyntheticHealthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticHealthProvider {
    /// Create an available provider where every prompt grants access
    #[must_use]
    pub fn new() -> Self {
        Self::with_name(provider_names::SYNTHETIC)
    }

    /// Create a provider reporting a custom name
    #[must_use]
    pub fn with_name(name: &'static str) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                available: AtomicBool::new(true),
                duplicate_callbacks: AtomicBool::new(false),
                drop_callbacks: AtomicBool::new(false),
                late_delivery: AtomicBool::new(false),
                prompts: AtomicUsize::new(0),
                pending_acks: Arc::new(AtomicUsize::new(0)),
                next_id: AtomicU64::new(1),
                state: RwLock::new(SyntheticState::default()),
            }),
        }
    }

    /// Mark the data store as present or missing on this "device"
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Script the answer the user gives when prompted for `metric`
    pub fn set_authorization_decision(&self, metric: MetricType, decision: AuthorizationState) {
        self.inner.write().decisions.insert(metric, decision);
    }

    /// Simulate the user changing access for `metric` outside the app
    pub fn set_authorization_status(&self, metric: MetricType, status: AuthorizationState) {
        self.inner.write().status.insert(metric, status);
    }

    /// Report `metric` quantities in `unit` instead of the canonical unit
    pub fn set_reporting_unit(&self, metric: MetricType, unit: MetricUnit) {
        self.inner.write().units.insert(metric, unit);
    }

    /// Delay every aggregate query completion by `latency`
    pub fn set_query_latency(&self, latency: Duration) {
        self.inner.write().query_latency = latency;
    }

    /// Make queries for `metric` fail with `reason`
    pub fn fail_queries(&self, metric: MetricType, reason: &str) {
        self.inner
            .write()
            .query_failures
            .insert(metric, reason.to_owned());
    }

    /// Let queries for `metric` succeed again
    pub fn clear_query_failure(&self, metric: MetricType) {
        self.inner.write().query_failures.remove(&metric);
    }

    /// Make background delivery registration for `metric` fail with `reason`
    pub fn fail_background_delivery(&self, metric: MetricType, reason: &str) {
        self.inner
            .write()
            .background_failures
            .insert(metric, reason.to_owned());
    }

    /// Invoke every completion twice, the second time with an error
    pub fn set_duplicate_callbacks(&self, enabled: bool) {
        self.inner
            .duplicate_callbacks
            .store(enabled, Ordering::SeqCst);
    }

    /// Release completions without ever invoking them
    pub fn set_drop_callbacks(&self, enabled: bool) {
        self.inner.drop_callbacks.store(enabled, Ordering::SeqCst);
    }

    /// Keep delivering pushed samples to handlers of already closed streams
    pub fn set_late_delivery(&self, enabled: bool) {
        self.inner.late_delivery.store(enabled, Ordering::SeqCst);
    }

    /// Store a sample given in the metric's canonical unit
    pub fn add_sample(&self, metric: MetricType, value: f64, timestamp: DateTime<Utc>) {
        let mut state = self.inner.write();
        state.next_position += 1;
        let position = state.next_position;
        state
            .samples
            .entry(metric)
            .or_default()
            .push(StoredSample {
                position,
                value,
                timestamp,
            });
    }

    /// Store samples and deliver them, in the given order, to open streams of `metric`
    ///
    /// Returns the number of stream handlers the batch was delivered to.
    pub fn push_stream_samples(
        &self,
        metric: MetricType,
        samples: &[(f64, DateTime<Utc>)],
    ) -> usize {
        for (value, timestamp) in samples {
            self.add_sample(metric, *value, *timestamp);
        }

        let raw: Vec<RawSample> = samples
            .iter()
            .map(|(value, timestamp)| self.inner.to_raw(metric, *value, *timestamp))
            .collect();

        let (anchor, targets) = {
            let state = self.inner.read();
            let mut targets: Vec<StreamRegistration> = state
                .streams
                .values()
                .filter(|s| s.metric == metric)
                .cloned()
                .collect();
            if self.inner.late_delivery.load(Ordering::SeqCst) {
                targets.extend(
                    state
                        .closed_streams
                        .iter()
                        .filter(|s| s.metric == metric)
                        .cloned(),
                );
            }
            (AnchorCursor::new(state.next_position), targets)
        };

        for target in &targets {
            let batch = StreamBatch {
                samples: raw
                    .iter()
                    .filter(|sample| sample.timestamp >= target.window_start)
                    .copied()
                    .collect(),
                anchor,
            };
            let handler = Arc::clone(&target.handler);
            dispatch(Duration::ZERO, move || handler(Ok(batch)));
        }
        targets.len()
    }

    /// Terminate every open stream of `metric` with a failure delivery
    pub fn interrupt_streams(&self, metric: MetricType, reason: &str) -> usize {
        let interrupted: Vec<StreamRegistration> = {
            let mut state = self.inner.write();
            let ids: Vec<u64> = state
                .streams
                .values()
                .filter(|s| s.metric == metric)
                .map(|s| s.id)
                .collect();
            ids.iter()
                .filter_map(|id| state.streams.remove(id))
                .collect()
        };

        for stream in &interrupted {
            let handler = Arc::clone(&stream.handler);
            let error = ProviderError::StreamFailed {
                provider: self.inner.name.to_owned(),
                metric,
                reason: reason.to_owned(),
            };
            dispatch(Duration::ZERO, move || handler(Err(error)));
        }
        interrupted.len()
    }

    /// Fire every observer registered for `metric`
    ///
    /// Returns the number of observers notified.
    pub fn notify_change(&self, metric: MetricType) -> usize {
        let handlers: Vec<ChangeHandler> = self
            .inner
            .read()
            .observers
            .values()
            .filter(|(observed, _)| *observed == metric)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &handlers {
            let pending = Arc::clone(&self.inner.pending_acks);
            pending.fetch_add(1, Ordering::SeqCst);
            let ack = ObserverAck::new(move || {
                pending.fetch_sub(1, Ordering::SeqCst);
            });
            let handler = Arc::clone(handler);
            dispatch(Duration::ZERO, move || handler(ack));
        }
        handlers.len()
    }

    /// Number of authorization prompts shown so far
    #[must_use]
    pub fn authorization_prompts(&self) -> usize {
        self.inner.prompts.load(Ordering::SeqCst)
    }

    /// Number of aggregate queries started for `metric`
    #[must_use]
    pub fn query_count(&self, metric: MetricType) -> usize {
        self.inner
            .read()
            .query_counts
            .get(&metric)
            .copied()
            .unwrap_or(0)
    }

    /// Observer notifications not yet acknowledged
    #[must_use]
    pub fn pending_observer_acks(&self) -> usize {
        self.inner.pending_acks.load(Ordering::SeqCst)
    }

    /// Observers currently registered for `metric`
    #[must_use]
    pub fn observer_count(&self, metric: MetricType) -> usize {
        self.inner
            .read()
            .observers
            .values()
            .filter(|(observed, _)| *observed == metric)
            .count()
    }

    /// Streams currently open for `metric`
    #[must_use]
    pub fn open_stream_count(&self, metric: MetricType) -> usize {
        self.inner
            .read()
            .streams
            .values()
            .filter(|s| s.metric == metric)
            .count()
    }

    /// Background delivery frequency registered for `metric`, if any
    #[must_use]
    pub fn background_frequency(&self, metric: MetricType) -> Option<UpdateFrequency> {
        self.inner.read().background_enabled.get(&metric).copied()
    }

    /// Number of stored samples for `metric`
    #[must_use]
    pub fn sample_count(&self, metric: MetricType) -> usize {
        self.inner.read().samples.get(&metric).map_or(0, Vec::len)
    }
}

impl HealthDataProvider for SyntheticHealthProvider {
    fn name(&self) -> &'static str {
        self.inner.name
    }

    fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    fn authorization_status(&self, metric: MetricType) -> AuthorizationState {
        self.inner.status(metric)
    }

    fn request_authorization(
        &self,
        metrics: &[MetricType],
        completion: Completion<AuthorizationGrants>,
    ) {
        let inner = Arc::clone(&self.inner);
        let metrics = metrics.to_vec();
        dispatch(Duration::ZERO, move || {
            if !inner.available.load(Ordering::SeqCst) {
                let error = ProviderError::NotAvailable {
                    provider: inner.name.to_owned(),
                };
                inner.complete(&completion, Err(error));
                return;
            }

            inner.prompts.fetch_add(1, Ordering::SeqCst);
            let grants: AuthorizationGrants = {
                let mut state = inner.write();
                metrics
                    .iter()
                    .map(|metric| {
                        let decision = state
                            .decisions
                            .get(metric)
                            .copied()
                            .unwrap_or(AuthorizationState::Granted);
                        state.status.insert(*metric, decision);
                        (*metric, decision)
                    })
                    .collect()
            };
            debug!(provider = inner.name, ?grants, "Authorization prompt answered");
            inner.complete(&completion, Ok(grants));
        });
    }

    fn run_aggregate_query(&self, query: AggregateQuery, completion: Completion<Quantity>) {
        let latency = {
            let mut state = self.inner.write();
            *state.query_counts.entry(query.metric).or_insert(0) += 1;
            state.query_latency
        };
        let inner = Arc::clone(&self.inner);
        dispatch(latency, move || {
            let result = inner.evaluate(query);
            inner.complete(&completion, result);
        });
    }

    fn register_observer(
        &self,
        metric: MetricType,
        on_change: ChangeHandler,
    ) -> ProviderResult<ObserverHandle> {
        if !self.is_available() {
            return Err(ProviderError::NotAvailable {
                provider: self.inner.name.to_owned(),
            });
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.write().observers.insert(id, (metric, on_change));
        Ok(ObserverHandle::new(id, metric))
    }

    fn unregister_observer(&self, handle: &ObserverHandle) {
        if self.inner.write().observers.remove(&handle.id()).is_none() {
            warn!(
                provider = self.inner.name,
                observer = handle.id(),
                "Unregistering unknown observer"
            );
        }
    }

    fn enable_background_delivery(
        &self,
        metric: MetricType,
        frequency: UpdateFrequency,
        completion: Completion<()>,
    ) {
        let inner = Arc::clone(&self.inner);
        dispatch(Duration::ZERO, move || {
            let failure = inner.read().background_failures.get(&metric).cloned();
            let result = match failure {
                Some(reason) => Err(ProviderError::RequestFailed {
                    provider: inner.name.to_owned(),
                    reason,
                }),
                None => {
                    inner.write().background_enabled.insert(metric, frequency);
                    Ok(())
                }
            };
            inner.complete(&completion, result);
        });
    }

    fn open_anchored_stream(
        &self,
        metric: MetricType,
        window_start: DateTime<Utc>,
        anchor: Option<AnchorCursor>,
        on_update: StreamHandler,
    ) -> ProviderResult<StreamHandle> {
        if !self.is_available() {
            return Err(ProviderError::NotAvailable {
                provider: self.inner.name.to_owned(),
            });
        }
        if !self.inner.status(metric).is_granted() {
            return Err(ProviderError::NotAuthorized {
                provider: self.inner.name.to_owned(),
                metric,
            });
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let after = anchor.map_or(0, AnchorCursor::position);
        let initial = {
            let mut state = self.inner.write();
            state.streams.insert(
                id,
                StreamRegistration {
                    id,
                    metric,
                    window_start,
                    handler: Arc::clone(&on_update),
                },
            );
            let existing: Vec<StoredSample> = state
                .samples
                .get(&metric)
                .into_iter()
                .flatten()
                .filter(|s| s.position > after && s.timestamp >= window_start)
                .copied()
                .collect();
            (existing, AnchorCursor::new(state.next_position))
        };

        let (existing, anchor) = initial;
        let batch = StreamBatch {
            samples: existing
                .iter()
                .map(|s| self.inner.to_raw(metric, s.value, s.timestamp))
                .collect(),
            anchor,
        };
        dispatch(Duration::ZERO, move || on_update(Ok(batch)));
        Ok(StreamHandle::new(id, metric))
    }

    fn close_stream(&self, handle: &StreamHandle) {
        let mut state = self.inner.write();
        if let Some(registration) = state.streams.remove(&handle.id()) {
            if self.inner.late_delivery.load(Ordering::SeqCst) {
                state.closed_streams.push(registration);
            }
        }
    }
}
