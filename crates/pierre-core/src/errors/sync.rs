// ABOUTME: Error taxonomy of the metrics synchronization engine
// ABOUTME: Surfaced to consumers through MetricsSnapshot::last_error, never as a blocking failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use super::provider::ProviderError;
use crate::models::MetricType;

/// Errors recorded by the sync engine
///
/// - `Unavailable` is terminal for the session.
/// - `Unauthorized` is terminal until the user re-grants access externally.
/// - `QueryFailed` is transient and scoped to a single fetch; the cached
///   value of the metric is left untouched.
/// - `StreamInterrupted` clears the live heart rate; reconnecting requires
///   an explicit `start_live_updates()`.
/// - `BackgroundDeliveryFailed` is advisory; foreground syncing continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    /// Health data is not available on this device or runtime
    #[error("Health data is not available on this device")]
    Unavailable,

    /// Access to the metric was not granted
    #[error("Not authorized to read {metric}")]
    Unauthorized {
        /// Affected metric
        metric: MetricType,
    },

    /// A single aggregate query failed
    #[error("Query for {metric} failed: {reason}")]
    QueryFailed {
        /// Affected metric
        metric: MetricType,
        /// Failure reason
        reason: String,
    },

    /// The heart-rate stream stopped delivering samples
    #[error("Live stream interrupted: {reason}")]
    StreamInterrupted {
        /// Failure reason
        reason: String,
    },

    /// Background delivery could not be enabled
    #[error("Background delivery for {metric} could not be enabled: {reason}")]
    BackgroundDeliveryFailed {
        /// Affected metric
        metric: MetricType,
        /// Failure reason
        reason: String,
    },
}

impl SyncError {
    /// Map a provider failure observed while working on `metric`
    #[must_use]
    pub fn from_provider(metric: MetricType, error: &ProviderError) -> Self {
        match error {
            ProviderError::NotAvailable { .. } => Self::Unavailable,
            ProviderError::NotAuthorized { .. } => Self::Unauthorized { metric },
            other => Self::QueryFailed {
                metric,
                reason: other.reason(),
            },
        }
    }

    /// Metric this error is scoped to, if any
    #[must_use]
    pub const fn metric(&self) -> Option<MetricType> {
        match self {
            Self::Unauthorized { metric }
            | Self::QueryFailed { metric, .. }
            | Self::BackgroundDeliveryFailed { metric, .. } => Some(*metric),
            Self::StreamInterrupted { .. } => Some(MetricType::HeartRate),
            Self::Unavailable => None,
        }
    }
}
