// ABOUTME: Error types shared across the workspace
// ABOUTME: ProviderError for provider callbacks, SyncError for the engine's cached state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Provider-reported failures
pub mod provider;

/// Engine error taxonomy
pub mod sync;

pub use provider::{ProviderError, ProviderResult};
pub use sync::SyncError;
