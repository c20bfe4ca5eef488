// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Unit factors, environment keys, and service names for the metrics sync engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Unit conversion and measurement constants
pub mod units;

/// Service identifiers used in structured logging
pub mod service_names {
    /// Service name for the metrics synchronization engine
    pub const PIERRE_METRICS_SYNC: &str = "pierre-metrics-sync";
}

/// Environment variable names read by `SyncConfig::from_env`
pub mod env_config {
    /// Comma separated list of metric names to synchronize
    pub const SYNC_METRICS: &str = "PIERRE_SYNC_METRICS";
    /// Whether to request background delivery for observed metrics
    pub const SYNC_BACKGROUND_DELIVERY: &str = "PIERRE_SYNC_BACKGROUND_DELIVERY";
    /// Background delivery frequency (immediate, hourly, daily, weekly)
    pub const SYNC_BACKGROUND_FREQUENCY: &str = "PIERRE_SYNC_BACKGROUND_FREQUENCY";
    /// Whether heart rate is tracked through the live stream after authorization
    pub const SYNC_LIVE_HEART_RATE: &str = "PIERRE_SYNC_LIVE_HEART_RATE";
}

/// Provider identifiers
pub mod provider_names {
    /// In-memory fixture provider
    pub const SYNTHETIC: &str = "synthetic";
}
