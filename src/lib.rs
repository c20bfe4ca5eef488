// ABOUTME: Main library entry point for the Pierre metrics sync engine
// ABOUTME: Keeps an observable per-day view of health metrics in sync with a push-capable provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Metrics Sync
//!
//! Bridges a callback-based, push-capable health data provider into a
//! consistent, locally cached view of today's steps, active energy, distance,
//! and a continuously updating heart rate.
//!
//! ## Architecture
//!
//! - **Engine**: authorization, daily aggregates, observers, background
//!   delivery, and the live heart-rate stream, all funnelled through one
//!   confined task
//! - **Config**: environment-driven [`config::SyncConfig`]
//! - **Logging**: `tracing` setup and structured sync events
//!
//! Domain types live in `pierre-core`; the provider contract and the
//! synthetic fixture provider live in `pierre-providers`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pierre_metrics_sync::config::SyncConfig;
//! use pierre_metrics_sync::engine::MetricsSyncEngine;
//! use pierre_metrics_sync::providers::SyntheticHealthProvider;
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = Arc::new(SyntheticHealthProvider::new());
//!     let engine = MetricsSyncEngine::new(provider, SyncConfig::from_env());
//!
//!     if engine.request_authorization().await.is_ok() {
//!         let snapshot = engine.state().current();
//!         println!("steps today: {}", snapshot.today_steps());
//!     }
//!     engine.shutdown().await;
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// Metrics sync engine
pub mod engine;

/// Logging setup and structured sync events
pub mod logging;

pub use pierre_core::{constants, errors, models, time};
pub use pierre_providers as providers;
