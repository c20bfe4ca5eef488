// ABOUTME: Structured error types reported by health data providers
// ABOUTME: Delivered through provider completion callbacks and mapped to SyncError by the engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::models::MetricType;

/// Failures a provider reports through its callbacks
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The data store does not exist on this device or runtime
    #[error("Provider '{provider}' is not available on this device")]
    NotAvailable {
        /// Provider name
        provider: String,
    },

    /// Read access to the metric has not been granted
    #[error("Provider '{provider}' has no read access to {metric}")]
    NotAuthorized {
        /// Provider name
        provider: String,
        /// Metric that was read
        metric: MetricType,
    },

    /// The provider failed to execute a query
    #[error("Provider '{provider}' query for {metric} failed: {reason}")]
    QueryFailed {
        /// Provider name
        provider: String,
        /// Metric that was queried
        metric: MetricType,
        /// Provider supplied reason
        reason: String,
    },

    /// The metric cannot be queried or observed by this provider
    #[error("Provider '{provider}' does not support {metric}")]
    UnsupportedMetric {
        /// Provider name
        provider: String,
        /// Unsupported metric
        metric: MetricType,
    },

    /// An open stream stopped delivering samples
    #[error("Provider '{provider}' stream for {metric} failed: {reason}")]
    StreamFailed {
        /// Provider name
        provider: String,
        /// Streamed metric
        metric: MetricType,
        /// Provider supplied reason
        reason: String,
    },

    /// The provider released a completion callback without invoking it
    #[error("Provider '{provider}' dropped its completion callback")]
    CallbackDropped {
        /// Provider name
        provider: String,
    },

    /// Authorization request or background delivery registration failed
    #[error("Provider '{provider}' request failed: {reason}")]
    RequestFailed {
        /// Provider name
        provider: String,
        /// Provider supplied reason
        reason: String,
    },
}

impl ProviderError {
    /// Human-readable reason without the provider prefix, used in `SyncError`
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::NotAvailable { .. } => "provider not available".to_owned(),
            Self::NotAuthorized { .. } => "not authorized".to_owned(),
            Self::QueryFailed { reason, .. }
            | Self::StreamFailed { reason, .. }
            | Self::RequestFailed { reason, .. } => reason.clone(),
            Self::UnsupportedMetric { metric, .. } => format!("{metric} is not supported"),
            Self::CallbackDropped { .. } => "provider dropped callback".to_owned(),
        }
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
