// ABOUTME: Per-metric authorization state tracked by the authorization coordinator
// ABOUTME: Each metric type is granted or denied independently of the others
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

/// Authorization state of a single metric type
///
/// Transitions only happen through an explicit authorization request. A
/// `Denied` metric stays denied until the user grants access outside the app
/// and a new request observes that grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    /// No decision has been made for this metric yet
    #[default]
    NotRequested,
    /// Read access was granted
    Granted,
    /// Read access was denied
    Denied,
}

impl AuthorizationState {
    /// Whether the provider has already recorded a decision, so no prompt is needed
    #[must_use]
    pub const fn is_determined(self) -> bool {
        !matches!(self, Self::NotRequested)
    }

    /// Whether reads of this metric are permitted
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}
