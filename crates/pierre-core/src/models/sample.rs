// ABOUTME: Stream sample types for the heart-rate live stream
// ABOUTME: Raw provider samples, the retained latest sample, and the anchor cursor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Quantity;

/// A single sample as delivered by a provider stream or stored by a fixture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Value in the provider's unit
    pub quantity: Quantity,
    /// When the sample was measured
    pub timestamp: DateTime<Utc>,
}

impl RawSample {
    /// Create a new raw sample
    #[must_use]
    pub const fn new(quantity: Quantity, timestamp: DateTime<Utc>) -> Self {
        Self {
            quantity,
            timestamp,
        }
    }
}

/// Most recent converted sample of a live metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    /// Value in the metric's canonical unit
    pub value: f64,
    /// Measurement time
    pub timestamp: DateTime<Utc>,
}

impl LiveSample {
    /// Whether `self` should replace `current` as the representative sample.
    ///
    /// Only a strictly later timestamp wins; earlier and duplicate timestamps
    /// are discarded regardless of delivery order.
    #[must_use]
    pub fn supersedes(&self, current: Option<&Self>) -> bool {
        current.is_none_or(|current| self.timestamp > current.timestamp)
    }
}

/// Opaque provider-issued position in an unbounded sample stream
///
/// Cursors compare by position and only move forward. They exist in memory
/// only; a process restart resyncs the stream from the start of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorCursor(u64);

impl AnchorCursor {
    /// Wrap a provider position
    #[must_use]
    pub const fn new(position: u64) -> Self {
        Self(position)
    }

    /// Provider position this cursor marks
    #[must_use]
    pub const fn position(self) -> u64 {
        self.0
    }
}
