// ABOUTME: Core types and constants for the Pierre metrics synchronization engine
// ABOUTME: Foundation crate with metric models, units, clock, and error types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Core
//!
//! Foundation crate providing shared types for the metrics synchronization
//! engine. This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: `SyncError` taxonomy and `ProviderError`
//! - **constants**: Unit factors, environment keys, service names
//! - **models**: Metric types, quantities, windows, samples, authorization states
//! - **time**: `Clock` abstraction for local-day windows

/// Unified error handling for providers and the sync engine
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (`MetricType`, `Quantity`, `DailyAggregate`, ...)
pub mod models;

/// Clock abstraction and local-day boundaries
pub mod time;
