// ABOUTME: Health data provider abstractions for the Pierre metrics sync engine
// ABOUTME: Callback-based provider trait, subscription handles, and the synthetic fixture provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health data provider abstractions.
//!
//! This crate defines the capability surface the sync engine consumes from a
//! push-capable, on-device health data store, plus an in-memory synthetic
//! implementation for development and tests.

// Re-export pierre-core modules so provider code can keep `use crate::errors::*` etc.
pub use pierre_core::constants;
pub use pierre_core::errors;
pub use pierre_core::models;

/// Provider capability surface: trait, callbacks, and subscription handles
pub mod core;

/// In-memory synthetic provider for development and testing
#[cfg(feature = "provider-synthetic")]
pub mod synthetic;

// Re-export key types for convenience

pub use core::{
    callback_dropped, AggregateQuery, AuthorizationGrants, ChangeHandler, Completion,
    HealthDataProvider, ObserverAck, ObserverHandle, StreamBatch, StreamHandle, StreamHandler,
};
pub use pierre_core::errors::provider::{ProviderError, ProviderResult};
#[cfg(feature = "provider-synthetic")]
pub use synthetic::SyntheticHealthProvider;
