// ABOUTME: Configuration module for the metrics sync engine
// ABOUTME: Environment-only configuration, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Sync engine settings loaded from environment variables
pub mod sync;

pub use sync::SyncConfig;
