// ABOUTME: Integration tests for the live heart-rate stream
// ABOUTME: Covers out-of-order delivery, initial batches, stop semantics, late deliveries, and interruptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use chrono::TimeDelta;
use common::{at, at_second, engine, engine_with, evening_clock, wait_for};
use pierre_metrics_sync::{
    config::SyncConfig,
    errors::SyncError,
    models::{AnchorCursor, MetricType, MetricUnit},
    providers::SyntheticHealthProvider,
};
use tokio::time::sleep;

#[tokio::test]
async fn test_out_of_order_batch_keeps_latest_timestamp() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();
    assert_eq!(view.current().current_heart_rate(), None);

    let t3 = at_second(17, 0, 0);
    let t1 = at_second(17, 0, 10);
    let t2 = at_second(17, 0, 20);
    provider.push_stream_samples(MetricType::HeartRate, &[(74.0, t3), (72.0, t1), (75.0, t2)]);

    let snapshot = wait_for(&mut view, |s| s.heart_rate.is_some()).await;
    assert_eq!(snapshot.current_heart_rate(), Some(75.0));
    assert_eq!(snapshot.heart_rate.unwrap().timestamp, t2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_older_batch_never_replaces_newer_sample() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();

    provider.push_stream_samples(MetricType::HeartRate, &[(88.0, at(17, 30))]);
    wait_for(&mut view, |s| s.current_heart_rate() == Some(88.0)).await;

    provider.push_stream_samples(MetricType::HeartRate, &[(61.0, at(17, 10)), (63.0, at(17, 20))]);
    provider.push_stream_samples(MetricType::HeartRate, &[(99.0, at(17, 30))]);
    provider.push_stream_samples(MetricType::HeartRate, &[(90.0, at(17, 31))]);
    wait_for(&mut view, |s| s.current_heart_rate() == Some(90.0)).await;

    let anchor = engine.live_anchor().await.unwrap();
    assert!(anchor >= AnchorCursor::new(4));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_initial_batch_applied_before_start_returns() {
    let provider = SyntheticHealthProvider::new();
    provider.set_reporting_unit(MetricType::HeartRate, MetricUnit::BeatsPerSecond);
    provider.add_sample(MetricType::HeartRate, 58.0, at(6, 0));
    provider.add_sample(MetricType::HeartRate, 71.0, at(16, 45));
    provider.add_sample(MetricType::HeartRate, 64.0, at(12, 0));
    let clock = evening_clock();
    let engine = engine_with(
        &provider,
        &clock,
        SyncConfig::default().with_live_heart_rate(false),
    );
    engine.request_authorization().await.unwrap();
    assert!(!engine.is_live().await);

    engine.start_live_updates().await.unwrap();

    let snapshot = engine.state().current();
    let bpm = snapshot.current_heart_rate().unwrap();
    assert!((bpm - 71.0).abs() < 1e-9);
    assert!(engine.is_live().await);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_initial_batch_ignores_samples_before_today() {
    let provider = SyntheticHealthProvider::new();
    let yesterday = at(0, 0) - TimeDelta::minutes(5);
    provider.add_sample(MetricType::HeartRate, 120.0, yesterday);
    let clock = evening_clock();
    let engine = engine(&provider, &clock);

    engine.request_authorization().await.unwrap();

    assert!(engine.is_live().await);
    assert_eq!(engine.state().current().current_heart_rate(), None);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_stop_clears_heart_rate_and_discards_late_samples() {
    let provider = SyntheticHealthProvider::new();
    provider.set_late_delivery(true);
    let clock = evening_clock();
    let engine = engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();

    provider.push_stream_samples(MetricType::HeartRate, &[(70.0, at(17, 0))]);
    wait_for(&mut view, |s| s.heart_rate.is_some()).await;

    engine.stop_live_updates().await;
    assert_eq!(view.current().current_heart_rate(), None);
    assert_eq!(provider.open_stream_count(MetricType::HeartRate), 0);

    // The provider still calls the closed stream's handler
    let delivered = provider.push_stream_samples(MetricType::HeartRate, &[(95.0, at(17, 59))]);
    assert_eq!(delivered, 1);
    sleep(Duration::from_millis(20)).await;
    // Barrier: everything queued before this call has been applied
    assert!(!engine.is_live().await);

    assert_eq!(view.current().current_heart_rate(), None);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_restart_after_stop_resyncs_from_start_of_day() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();

    provider.push_stream_samples(MetricType::HeartRate, &[(77.0, at(17, 0))]);
    wait_for(&mut view, |s| s.heart_rate.is_some()).await;
    engine.stop_live_updates().await;

    engine.start_live_updates().await.unwrap();

    assert_eq!(view.current().current_heart_rate(), Some(77.0));
    assert_eq!(provider.open_stream_count(MetricType::HeartRate), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_interruption_clears_heart_rate_without_reconnecting() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();

    provider.push_stream_samples(MetricType::HeartRate, &[(82.0, at(17, 0))]);
    wait_for(&mut view, |s| s.heart_rate.is_some()).await;

    assert_eq!(
        provider.interrupt_streams(MetricType::HeartRate, "sensor disconnected"),
        1
    );
    let snapshot = wait_for(&mut view, |s| s.last_error.is_some()).await;

    assert_eq!(snapshot.current_heart_rate(), None);
    assert_eq!(
        snapshot.last_error,
        Some(SyncError::StreamInterrupted {
            reason: "sensor disconnected".to_owned()
        })
    );
    assert!(!engine.is_live().await);
    assert_eq!(provider.open_stream_count(MetricType::HeartRate), 0);

    // New samples reach nobody until the stream is explicitly restarted
    assert_eq!(
        provider.push_stream_samples(MetricType::HeartRate, &[(85.0, at(17, 5))]),
        0
    );
    engine.start_live_updates().await.unwrap();
    assert_eq!(view.current().current_heart_rate(), Some(85.0));
    assert!(engine.is_live().await);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_start_while_live_is_noop() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = engine(&provider, &clock);
    engine.request_authorization().await.unwrap();

    engine.start_live_updates().await.unwrap();
    engine.start_live_updates().await.unwrap();

    assert_eq!(provider.open_stream_count(MetricType::HeartRate), 1);
    engine.shutdown().await;
    assert_eq!(provider.open_stream_count(MetricType::HeartRate), 0);
}

#[tokio::test]
async fn test_stream_open_failure_is_recorded() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = engine_with(
        &provider,
        &clock,
        SyncConfig::default().with_live_heart_rate(false),
    );
    engine.request_authorization().await.unwrap();

    provider.set_available(false);
    let error = engine.start_live_updates().await.unwrap_err();

    assert_eq!(error, SyncError::Unavailable);
    assert_eq!(engine.state().current().last_error, Some(SyncError::Unavailable));
    assert!(!engine.is_live().await);
}
