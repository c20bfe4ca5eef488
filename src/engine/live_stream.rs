// ABOUTME: Live heart-rate tracker over the provider's anchored sample stream
// ABOUTME: Keeps the sample with the greatest timestamp and discards deliveries from stopped streams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pierre_core::errors::SyncError;
use pierre_core::models::{AnchorCursor, LiveSample, MetricType};
use pierre_core::time::Clock;
use pierre_providers::{
    HealthDataProvider, ProviderError, ProviderResult, StreamBatch, StreamHandle, StreamHandler,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::bridge::OnceSender;
use super::confined::{ConfinedContext, ConfinedState};
use crate::logging::SyncLogger;

/// Stream bookkeeping owned by the confined context
///
/// `generation` identifies the currently accepted stream. Deliveries tagged
/// with any other generation arrived after a stop or restart and are dropped.
#[derive(Debug, Default)]
pub(crate) struct LiveStreamCursor {
    generation: Option<u64>,
    anchor: Option<AnchorCursor>,
}

impl LiveStreamCursor {
    fn accepts(&self, generation: u64) -> bool {
        self.generation == Some(generation)
    }

    /// Start accepting `generation`; the anchor restarts from the day window
    fn arm(&mut self, generation: u64) {
        self.generation = Some(generation);
        self.anchor = None;
    }

    fn disarm(&mut self) {
        self.generation = None;
        self.anchor = None;
    }

    fn advance(&mut self, anchor: AnchorCursor) {
        if self.anchor.is_none_or(|current| anchor > current) {
            self.anchor = Some(anchor);
        }
    }
}

/// Apply one stream batch to confined state
fn apply_batch(state: &mut ConfinedState, generation: u64, batch: StreamBatch) {
    if !state.live.accepts(generation) {
        debug!(generation, "Discarding heart-rate batch from a stopped stream");
        return;
    }
    state.live.advance(batch.anchor);

    let mut latest = state.metrics.heart_rate;
    for raw in batch.samples {
        match raw.quantity.to_canonical(MetricType::HeartRate) {
            Ok(value) => {
                let sample = LiveSample {
                    value,
                    timestamp: raw.timestamp,
                };
                if sample.supersedes(latest.as_ref()) {
                    latest = Some(sample);
                }
            }
            Err(mismatch) => warn!(error = %mismatch, "Skipping heart-rate sample"),
        }
    }
    state.metrics.heart_rate = latest;
}

/// Terminate the accepted stream after a provider failure
fn interrupt(state: &mut ConfinedState, generation: u64, reason: String) {
    if !state.live.accepts(generation) {
        debug!(generation, "Ignoring failure of a stopped heart-rate stream");
        return;
    }
    SyncLogger::log_stream_event("interrupted", Some(generation), Some(&reason));
    state.live.disarm();
    state.metrics.heart_rate = None;
    state
        .metrics
        .record_error(SyncError::StreamInterrupted { reason });
}

fn open_error(error: &ProviderError) -> SyncError {
    match error {
        ProviderError::NotAvailable { .. } | ProviderError::NotAuthorized { .. } => {
            SyncError::from_provider(MetricType::HeartRate, error)
        }
        other => SyncError::StreamInterrupted {
            reason: other.reason(),
        },
    }
}

/// Tracks the most recent heart-rate sample through an anchored stream
pub struct LiveStreamTracker {
    provider: Arc<dyn HealthDataProvider>,
    clock: Arc<dyn Clock>,
    confined: ConfinedContext,
    active: Mutex<Option<StreamHandle>>,
    next_generation: AtomicU64,
}

impl LiveStreamTracker {
    pub(crate) fn new(
        provider: Arc<dyn HealthDataProvider>,
        clock: Arc<dyn Clock>,
        confined: ConfinedContext,
    ) -> Self {
        Self {
            provider,
            clock,
            confined,
            active: Mutex::new(None),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Open the heart-rate stream from the start of today
    ///
    /// Returns once the provider's initial batch has been applied. Calling
    /// `start` while a stream is live is a no-op; after an interruption it
    /// reopens the stream.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` or `SyncError::Unavailable` when the
    /// provider refuses to open the stream, and `SyncError::StreamInterrupted`
    /// for any other open failure. The error is also recorded in the snapshot.
    pub async fn start(&self) -> Result<(), SyncError> {
        let mut active = self.active.lock().await;
        if let Some(handle) = active.take() {
            let live = self
                .confined
                .run(|state| state.live.generation.is_some())
                .await
                .unwrap_or(false);
            if live {
                *active = Some(handle);
                return Ok(());
            }
            self.provider.close_stream(&handle);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.confined
            .run(move |state| state.live.arm(generation))
            .await;

        let (first_delivery, delivered) = OnceSender::channel();
        let handler = self.stream_handler(generation, first_delivery);
        let window_start = self.clock.start_of_day(self.clock.now());

        let handle = match self.provider.open_anchored_stream(
            MetricType::HeartRate,
            window_start,
            None,
            handler,
        ) {
            Ok(handle) => handle,
            Err(provider_error) => {
                let error = open_error(&provider_error);
                warn!(error = %error, "Heart-rate stream could not be opened");
                let recorded = error.clone();
                self.confined
                    .run(move |state| {
                        state.live.disarm();
                        state.metrics.record_error(recorded);
                    })
                    .await;
                return Err(error);
            }
        };
        SyncLogger::log_stream_event("opened", Some(generation), None);
        debug!(stream = handle.id(), window_start = %window_start, "Heart-rate stream handle");
        *active = Some(handle);
        drop(active);

        // The batch mutation is queued before the first-delivery signal fires,
        // so a barrier after the signal observes it applied.
        if delivered.await.is_ok() {
            self.confined.run(|_| ()).await;
        }
        Ok(())
    }

    /// Close the stream and clear the live heart rate
    ///
    /// Batches delivered after this returns never reach the snapshot.
    pub async fn stop(&self) {
        let handle = self.active.lock().await.take();
        self.confined
            .run(|state| {
                state.live.disarm();
                state.metrics.heart_rate = None;
            })
            .await;
        if let Some(handle) = handle {
            self.provider.close_stream(&handle);
            SyncLogger::log_stream_event("closed", None, None);
        }
    }

    /// Whether a stream is currently accepted
    pub async fn is_live(&self) -> bool {
        self.confined
            .run(|state| state.live.generation.is_some())
            .await
            .unwrap_or(false)
    }

    /// Position of the last applied batch
    pub async fn anchor(&self) -> Option<AnchorCursor> {
        self.confined.run(|state| state.live.anchor).await.flatten()
    }

    fn stream_handler(&self, generation: u64, first_delivery: OnceSender<()>) -> StreamHandler {
        let confined = self.confined.clone();
        Arc::new(move |delivery: ProviderResult<StreamBatch>| {
            match delivery {
                Ok(batch) => {
                    confined.submit(move |state| apply_batch(state, generation, batch));
                }
                Err(error) => {
                    let reason = error.reason();
                    confined.submit(move |state| interrupt(state, generation, reason));
                }
            }
            first_delivery.fire(());
        })
    }
}
