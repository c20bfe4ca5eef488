// ABOUTME: Sync engine configuration loaded from environment variables
// ABOUTME: Selects synchronized metrics, background delivery, and live heart-rate tracking
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::str::FromStr;

use pierre_core::constants::env_config;
use pierre_core::models::{MetricType, UpdateFrequency};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Metrics to request access for and keep in sync
    pub metrics: Vec<MetricType>,
    /// Register observed metrics for background delivery
    pub background_delivery: bool,
    /// Frequency requested for background delivery
    pub background_frequency: UpdateFrequency,
    /// Open the live heart-rate stream once heart rate is granted
    pub live_heart_rate: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            metrics: MetricType::ALL.to_vec(),
            background_delivery: true,
            background_frequency: UpdateFrequency::default(),
            live_heart_rate: true,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables use the defaults; unparseable values are logged and
    /// replaced by the default as well.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            metrics: env::var(env_config::SYNC_METRICS)
                .ok()
                .and_then(|raw| parse_metrics(&raw))
                .unwrap_or(defaults.metrics),
            background_delivery: env_value(
                env_config::SYNC_BACKGROUND_DELIVERY,
                defaults.background_delivery,
                parse_bool,
            ),
            background_frequency: env_value(
                env_config::SYNC_BACKGROUND_FREQUENCY,
                defaults.background_frequency,
                |raw| UpdateFrequency::from_str(raw).ok(),
            ),
            live_heart_rate: env_value(
                env_config::SYNC_LIVE_HEART_RATE,
                defaults.live_heart_rate,
                parse_bool,
            ),
        }
    }

    /// Builder-style override of the synchronized metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: &[MetricType]) -> Self {
        self.metrics = metrics.to_vec();
        self
    }

    /// Builder-style toggle for background delivery
    #[must_use]
    pub const fn with_background_delivery(mut self, enabled: bool) -> Self {
        self.background_delivery = enabled;
        self
    }

    /// Builder-style toggle for the live heart-rate stream
    #[must_use]
    pub const fn with_live_heart_rate(mut self, enabled: bool) -> Self {
        self.live_heart_rate = enabled;
        self
    }
}

fn env_value<T>(key: &str, default: T, parse: impl Fn(&str) -> Option<T>) -> T {
    match env::var(key) {
        Ok(raw) => parse(&raw).unwrap_or_else(|| {
            warn!(key, value = %raw, "Ignoring invalid configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a comma separated metric list, dropping duplicates
///
/// Returns `None` when any entry is unknown or the list is empty.
fn parse_metrics(raw: &str) -> Option<Vec<MetricType>> {
    let mut metrics = Vec::new();
    for entry in raw.split(',').filter(|entry| !entry.trim().is_empty()) {
        match entry.parse::<MetricType>() {
            Ok(metric) if !metrics.contains(&metric) => metrics.push(metric),
            Ok(_) => {}
            Err(error) => {
                warn!(
                    key = env_config::SYNC_METRICS,
                    error = %error,
                    "Ignoring invalid metric list, using default"
                );
                return None;
            }
        }
    }
    if metrics.is_empty() {
        None
    } else {
        Some(metrics)
    }
}
