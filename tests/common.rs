// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides fixture providers, fixed clocks, engine construction, and state waiting helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `pierre_metrics_sync`

use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pierre_metrics_sync::{
    config::SyncConfig,
    engine::{MetricsSnapshot, MetricsStateView, MetricsSyncEngine},
    models::MetricType,
    providers::SyntheticHealthProvider,
    time::FixedClock,
};
use tokio::time::timeout;

static INIT_LOGGER: Once = Once::new();

/// Upper bound for any state transition awaited in tests
pub const STATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// 2025-03-14 at `hour:minute` UTC
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0).unwrap()
}

/// 2025-03-14 at `hour:minute:second` UTC
pub fn at_second(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, second).unwrap()
}

/// UTC clock pinned at 18:00 on the test day
pub fn evening_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(at(18, 0)))
}

/// Engine over `provider` with a custom configuration
pub fn engine_with(
    provider: &SyntheticHealthProvider,
    clock: &Arc<FixedClock>,
    config: SyncConfig,
) -> MetricsSyncEngine {
    init_test_logging();
    MetricsSyncEngine::with_clock(Arc::new(provider.clone()), config, clock.clone())
}

/// Engine over `provider` with the default configuration
pub fn engine(provider: &SyntheticHealthProvider, clock: &Arc<FixedClock>) -> MetricsSyncEngine {
    engine_with(provider, clock, SyncConfig::default())
}

/// Engine that only tracks the cumulative metrics
pub fn cumulative_engine(
    provider: &SyntheticHealthProvider,
    clock: &Arc<FixedClock>,
) -> MetricsSyncEngine {
    engine_with(
        provider,
        clock,
        SyncConfig::default().with_metrics(&MetricType::CUMULATIVE),
    )
}

/// Wait until the published state satisfies `predicate`, failing the test on timeout
pub async fn wait_for(
    view: &mut MetricsStateView,
    predicate: impl FnMut(&MetricsSnapshot) -> bool,
) -> MetricsSnapshot {
    timeout(STATE_TIMEOUT, view.wait_for(predicate))
        .await
        .expect("state did not reach the expected condition in time")
        .expect("engine shut down while waiting")
}

/// Approximate float comparison for canonical values
pub fn approx_eq(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}
