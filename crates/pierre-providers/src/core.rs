// ABOUTME: Capability surface consumed from push-capable health data providers
// ABOUTME: Callback-based queries, observer subscriptions, background delivery, and anchored streams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Health Data Provider Interface
//!
//! This module defines the contract the metrics sync engine consumes from an
//! on-device health data store. Unlike the request/response providers used for
//! remote fitness APIs, these providers are callback driven:
//!
//! - **Completions**: queries, authorization prompts and background-delivery
//!   registration report their outcome through a completion callback invoked
//!   on a provider-owned execution context. Completions are shared `Fn`s, so a
//!   misbehaving provider may call them more than once; callers must treat
//!   every invocation after the first as a no-op.
//! - **Observers**: push subscriptions that signal "data changed" without
//!   carrying data. Each notification hands over an [`ObserverAck`] that must
//!   be completed promptly so the provider does not stall.
//! - **Anchored streams**: open-ended subscriptions delivering batches of new
//!   samples together with an [`AnchorCursor`] marking the stream position.
//!
//! Subscriptions are explicit handle objects returned by `register_observer`
//! and `open_anchored_stream` and passed back to `unregister_observer` and
//! `close_stream`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::{ProviderError, ProviderResult};
use crate::models::{
    AggregateWindow, AnchorCursor, AuthorizationState, MetricType, Quantity, RawSample,
    UpdateFrequency,
};

/// Completion callback for a single asynchronous provider operation
pub type Completion<T> = Arc<dyn Fn(ProviderResult<T>) + Send + Sync>;

/// Per-metric outcome of an authorization prompt
pub type AuthorizationGrants = BTreeMap<MetricType, AuthorizationState>;

/// Handler invoked when an observed metric changes
pub type ChangeHandler = Arc<dyn Fn(ObserverAck) + Send + Sync>;

/// Handler invoked with every batch (or failure) of an anchored stream
pub type StreamHandler = Arc<dyn Fn(ProviderResult<StreamBatch>) + Send + Sync>;

/// "Sum over window" statistics query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateQuery {
    /// Metric to sum
    pub metric: MetricType,
    /// Half-open window to sum over
    pub window: AggregateWindow,
}

/// Batch of samples delivered by an anchored stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamBatch {
    /// New samples, in whatever order the provider produced them
    pub samples: Vec<RawSample>,
    /// Stream position after this batch
    pub anchor: AnchorCursor,
}

/// Subscription handle returned by `register_observer`
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ObserverHandle {
    id: u64,
    metric: MetricType,
}

impl ObserverHandle {
    /// Create a handle; called by provider implementations
    #[must_use]
    pub const fn new(id: u64, metric: MetricType) -> Self {
        Self { id, metric }
    }

    /// Provider-assigned subscription id
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Observed metric
    #[must_use]
    pub const fn metric(&self) -> MetricType {
        self.metric
    }
}

/// Stream handle returned by `open_anchored_stream`
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    id: u64,
    metric: MetricType,
}

impl StreamHandle {
    /// Create a handle; called by provider implementations
    #[must_use]
    pub const fn new(id: u64, metric: MetricType) -> Self {
        Self { id, metric }
    }

    /// Provider-assigned stream id
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Streamed metric
    #[must_use]
    pub const fn metric(&self) -> MetricType {
        self.metric
    }
}

/// Acknowledgement token for one observer notification
///
/// The provider withholds further deliveries until the token is completed.
pub struct ObserverAck {
    on_complete: Option<Box<dyn FnOnce() + Send>>,
}

impl ObserverAck {
    /// Token that runs `on_complete` when acknowledged
    #[must_use]
    pub fn new(on_complete: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// Token with nothing to signal
    #[must_use]
    pub fn noop() -> Self {
        Self { on_complete: None }
    }

    /// Tell the provider the notification has been handled
    pub fn complete(mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
    }
}

impl fmt::Debug for ObserverAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverAck")
            .field("pending", &self.on_complete.is_some())
            .finish()
    }
}

/// Push-capable health data provider
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; callbacks may be invoked from any
/// thread or task, concurrently with calls into the provider.
pub trait HealthDataProvider: Send + Sync {
    /// Provider name (e.g. "synthetic")
    fn name(&self) -> &'static str;

    /// Whether the data store exists on this device or runtime
    fn is_available(&self) -> bool;

    /// Decision already recorded for `metric`; never prompts the user
    fn authorization_status(&self, metric: MetricType) -> AuthorizationState;

    /// Prompt for read access to `metrics` and report the per-metric outcome
    fn request_authorization(
        &self,
        metrics: &[MetricType],
        completion: Completion<AuthorizationGrants>,
    );

    /// Sum `query.metric` over `query.window`, reported in the provider's unit
    fn run_aggregate_query(&self, query: AggregateQuery, completion: Completion<Quantity>);

    /// Subscribe to change notifications for `metric`
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the provider cannot observe `metric`.
    fn register_observer(
        &self,
        metric: MetricType,
        on_change: ChangeHandler,
    ) -> ProviderResult<ObserverHandle>;

    /// Cancel an observer subscription
    fn unregister_observer(&self, handle: &ObserverHandle);

    /// Ask the provider to keep invoking observers while the app is in the background
    fn enable_background_delivery(
        &self,
        metric: MetricType,
        frequency: UpdateFrequency,
        completion: Completion<()>,
    );

    /// Open an open-ended stream of `metric` samples starting at `window_start`
    ///
    /// With `anchor == None` the first delivery contains every existing sample
    /// since `window_start`; later deliveries carry only new samples.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the stream cannot be opened.
    fn open_anchored_stream(
        &self,
        metric: MetricType,
        window_start: DateTime<Utc>,
        anchor: Option<AnchorCursor>,
        on_update: StreamHandler,
    ) -> ProviderResult<StreamHandle>;

    /// Close a stream; the provider stops delivering to its handler
    fn close_stream(&self, handle: &StreamHandle);
}

/// Build the error a provider reports for a dropped completion
#[must_use]
pub fn callback_dropped(provider: &str) -> ProviderError {
    ProviderError::CallbackDropped {
        provider: provider.to_owned(),
    }
}
