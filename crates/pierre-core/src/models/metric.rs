// ABOUTME: Metric type enumeration with canonical units and provider unit conversion
// ABOUTME: Quantities are converted to canonical units exactly once, at the provider boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::units::{
    JOULES_PER_KILOCALORIE, KILOJOULES_PER_KILOCALORIE, METERS_PER_KILOMETER, METERS_PER_MILE,
    SECONDS_PER_MINUTE,
};

/// Metrics synchronized by the engine
///
/// `Steps`, `ActiveEnergy` and `Distance` are cumulative and summed over the
/// current day. `HeartRate` is instantaneous and tracked through a live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Step count
    Steps,
    /// Active energy burned
    ActiveEnergy,
    /// Walking and running distance
    Distance,
    /// Heart rate
    HeartRate,
}

impl MetricType {
    /// Every metric type, in display order
    pub const ALL: [Self; 4] = [Self::Steps, Self::ActiveEnergy, Self::Distance, Self::HeartRate];

    /// Metrics summed over the day window by the aggregate fetcher
    pub const CUMULATIVE: [Self; 3] = [Self::Steps, Self::ActiveEnergy, Self::Distance];

    /// Unit every cached value of this metric is expressed in
    #[must_use]
    pub const fn canonical_unit(self) -> MetricUnit {
        match self {
            Self::Steps => MetricUnit::Count,
            Self::ActiveEnergy => MetricUnit::Kilocalories,
            Self::Distance => MetricUnit::Meters,
            Self::HeartRate => MetricUnit::BeatsPerMinute,
        }
    }

    /// Whether this metric is summed over a window rather than sampled
    #[must_use]
    pub const fn is_cumulative(self) -> bool {
        !matches!(self, Self::HeartRate)
    }

    /// Stable identifier used in configuration and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::ActiveEnergy => "active_energy",
            Self::Distance => "distance",
            Self::HeartRate => "heart_rate",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a metric name cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown metric type: {0}")]
pub struct UnknownMetricType(pub String);

impl FromStr for MetricType {
    type Err = UnknownMetricType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "steps" | "step_count" => Ok(Self::Steps),
            "active_energy" | "activeenergy" | "energy" => Ok(Self::ActiveEnergy),
            "distance" | "distance_walking_running" => Ok(Self::Distance),
            "heart_rate" | "heartrate" | "hr" => Ok(Self::HeartRate),
            other => Err(UnknownMetricType(other.to_owned())),
        }
    }
}

/// Physical dimension of a unit; conversion only happens within one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Count,
    Energy,
    Length,
    Frequency,
}

/// Units a provider may report quantities in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// Dimensionless count
    Count,
    /// Kilocalories
    Kilocalories,
    /// Kilojoules
    Kilojoules,
    /// Joules
    Joules,
    /// Meters
    Meters,
    /// Kilometers
    Kilometers,
    /// Statute miles
    Miles,
    /// Beats per minute
    BeatsPerMinute,
    /// Beats per second (Hz)
    BeatsPerSecond,
}

impl MetricUnit {
    const fn dimension(self) -> Dimension {
        match self {
            Self::Count => Dimension::Count,
            Self::Kilocalories | Self::Kilojoules | Self::Joules => Dimension::Energy,
            Self::Meters | Self::Kilometers | Self::Miles => Dimension::Length,
            Self::BeatsPerMinute | Self::BeatsPerSecond => Dimension::Frequency,
        }
    }

    /// Multiplier from this unit to the canonical unit of its dimension
    const fn to_canonical_factor(self) -> f64 {
        match self {
            Self::Count | Self::Kilocalories | Self::Meters | Self::BeatsPerMinute => 1.0,
            Self::Kilojoules => 1.0 / KILOJOULES_PER_KILOCALORIE,
            Self::Joules => 1.0 / JOULES_PER_KILOCALORIE,
            Self::Kilometers => METERS_PER_KILOMETER,
            Self::Miles => METERS_PER_MILE,
            Self::BeatsPerSecond => SECONDS_PER_MINUTE,
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Count => "count",
            Self::Kilocalories => "kcal",
            Self::Kilojoules => "kJ",
            Self::Joules => "J",
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Miles => "mi",
            Self::BeatsPerMinute => "count/min",
            Self::BeatsPerSecond => "count/s",
        };
        f.write_str(symbol)
    }
}

/// A raw value as reported by a provider, tagged with the provider's unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Numeric value in `unit`
    pub value: f64,
    /// Unit the provider reported the value in
    pub unit: MetricUnit,
}

/// A quantity's unit does not belong to the metric's dimension
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert {unit} to {canonical} for {metric}")]
pub struct UnitMismatch {
    /// Metric the conversion was attempted for
    pub metric: MetricType,
    /// Unit reported by the provider
    pub unit: MetricUnit,
    /// Canonical unit of the metric
    pub canonical: MetricUnit,
}

impl Quantity {
    /// Create a new quantity
    #[must_use]
    pub const fn new(value: f64, unit: MetricUnit) -> Self {
        Self { value, unit }
    }

    /// Convert to the canonical unit of `metric`
    ///
    /// # Errors
    ///
    /// Returns `UnitMismatch` when the unit measures a different dimension
    /// than the metric (e.g. meters reported for active energy).
    pub fn to_canonical(self, metric: MetricType) -> Result<f64, UnitMismatch> {
        let canonical = metric.canonical_unit();
        if self.unit.dimension() != canonical.dimension() {
            return Err(UnitMismatch {
                metric,
                unit: self.unit,
                canonical,
            });
        }
        Ok(self.value * self.unit.to_canonical_factor())
    }

    /// Express a canonical `value` of `metric` in `unit`
    ///
    /// # Errors
    ///
    /// Returns `UnitMismatch` when `unit` measures a different dimension.
    pub fn from_canonical(
        metric: MetricType,
        value: f64,
        unit: MetricUnit,
    ) -> Result<Self, UnitMismatch> {
        let canonical = metric.canonical_unit();
        if unit.dimension() != canonical.dimension() {
            return Err(UnitMismatch {
                metric,
                unit,
                canonical,
            });
        }
        Ok(Self::new(value / unit.to_canonical_factor(), unit))
    }
}
