// ABOUTME: Day window and daily aggregate types for cumulative metrics
// ABOUTME: The window is recomputed on every fetch as [start of local day, now)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MetricType;
use crate::time::Clock;

/// Half-open time range `[start, end)` a cumulative metric is summed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateWindow {
    /// Inclusive start, always the start of the current local day
    pub start: DateTime<Utc>,
    /// Exclusive end, the fetch-time "now"
    pub end: DateTime<Utc>,
}

impl AggregateWindow {
    /// Window covering today so far according to `clock`
    #[must_use]
    pub fn today(clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            start: clock.start_of_day(now),
            end: now,
        }
    }

    /// Whether `timestamp` falls inside the half-open window
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

/// Result of one "sum over today" query, already in the metric's canonical unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Metric that was summed
    pub metric: MetricType,
    /// Sum in the canonical unit; never rounded
    pub value: f64,
    /// Start of the window the sum covers
    pub window_start: DateTime<Utc>,
    /// End of the window the sum covers
    pub window_end: DateTime<Utc>,
}

impl DailyAggregate {
    /// Build an aggregate for `window`
    #[must_use]
    pub const fn new(metric: MetricType, value: f64, window: AggregateWindow) -> Self {
        Self {
            metric,
            value,
            window_start: window.start,
            window_end: window.end,
        }
    }
}

/// How often the provider should wake the app for background delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFrequency {
    /// Deliver as soon as new data is available
    #[default]
    Immediate,
    /// At most once per hour
    Hourly,
    /// At most once per day
    Daily,
    /// At most once per week
    Weekly,
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Immediate => "immediate",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        };
        f.write_str(name)
    }
}

impl FromStr for UpdateFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(format!("Unknown update frequency: {other}")),
        }
    }
}
