// ABOUTME: Core data models for the metrics synchronization engine
// ABOUTME: Re-exports metric types, units, windows, samples, and authorization states
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Provider-agnostic representation of the metrics the engine caches:
//!
//! - `MetricType`: steps, active energy, distance, heart rate
//! - `Quantity` / `MetricUnit`: provider-reported values and their conversion
//! - `AggregateWindow` / `DailyAggregate`: "sum over today" results
//! - `RawSample` / `LiveSample` / `AnchorCursor`: live stream data
//! - `AuthorizationState`: per-metric grant state

mod aggregate;
mod authorization;
mod metric;
mod sample;

pub use aggregate::{AggregateWindow, DailyAggregate, UpdateFrequency};
pub use authorization::AuthorizationState;
pub use metric::{MetricType, MetricUnit, Quantity, UnitMismatch, UnknownMetricType};
pub use sample::{AnchorCursor, LiveSample, RawSample};
