// ABOUTME: Integration tests for observer-driven re-fetching
// ABOUTME: Covers immediate acknowledgement, collapsing of rapid notifications, and teardown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use common::{at, cumulative_engine, evening_clock, wait_for};
use pierre_metrics_sync::{
    engine::ObserverStats,
    models::MetricType,
    providers::SyntheticHealthProvider,
};
use tokio::time::sleep;

#[tokio::test]
async fn test_change_notification_refetches_metric() {
    let provider = SyntheticHealthProvider::new();
    provider.add_sample(MetricType::Distance, 800.0, at(7, 0));
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();
    assert_eq!(provider.query_count(MetricType::Distance), 1);

    provider.add_sample(MetricType::Distance, 1_200.0, at(17, 0));
    assert_eq!(provider.notify_change(MetricType::Distance), 1);

    let snapshot = wait_for(&mut view, |s| s.distance_meters > 1_999.0).await;
    assert!((snapshot.today_distance() - 2_000.0).abs() < 1e-6);
    assert_eq!(provider.query_count(MetricType::Distance), 2);
    assert_eq!(provider.query_count(MetricType::Steps), 1);
    assert_eq!(provider.pending_observer_acks(), 0);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rapid_notifications_collapse_into_one_fetch() {
    let provider = SyntheticHealthProvider::new();
    provider.set_query_latency(Duration::from_millis(200));
    provider.add_sample(MetricType::Steps, 1_000.0, at(8, 0));
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();
    let baseline = provider.query_count(MetricType::Steps);

    for (minute, steps) in [(10, 100.0), (20, 250.0), (30, 400.0)] {
        provider.add_sample(MetricType::Steps, steps, at(17, minute));
        provider.notify_change(MetricType::Steps);
        sleep(Duration::from_millis(20)).await;
    }
    // Acknowledged right away, long before the re-fetch completes
    assert_eq!(provider.pending_observer_acks(), 0);

    let snapshot = wait_for(&mut view, |s| s.steps > 1_000.5).await;

    // The single fetch completes after the last sample landed, so it sees all of them
    assert_eq!(snapshot.today_steps(), 1_750);
    assert_eq!(provider.query_count(MetricType::Steps), baseline + 1);
    assert_eq!(
        engine.observer_stats(MetricType::Steps).await,
        ObserverStats {
            refetches: 1,
            collapsed: 2,
        }
    );
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_notification_after_fetch_completes_refetches_again() {
    let provider = SyntheticHealthProvider::new();
    provider.set_query_latency(Duration::from_millis(200));
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();

    provider.add_sample(MetricType::ActiveEnergy, 40.0, at(12, 0));
    provider.notify_change(MetricType::ActiveEnergy);
    wait_for(&mut view, |s| s.active_energy_kcal > 39.0).await;

    provider.add_sample(MetricType::ActiveEnergy, 60.0, at(13, 0));
    provider.notify_change(MetricType::ActiveEnergy);
    wait_for(&mut view, |s| s.active_energy_kcal > 99.0).await;

    let stats = engine.observer_stats(MetricType::ActiveEnergy).await;
    assert_eq!(stats.refetches, 2);
    assert_eq!(stats.collapsed, 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_notifications_for_one_metric_leave_others_alone() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let mut view = engine.state();

    provider.add_sample(MetricType::Steps, 42.0, at(11, 0));
    provider.notify_change(MetricType::Steps);
    wait_for(&mut view, |s| s.today_steps() == 42).await;

    assert_eq!(provider.query_count(MetricType::ActiveEnergy), 1);
    assert_eq!(provider.query_count(MetricType::Distance), 1);
    assert_eq!(
        engine.observer_stats(MetricType::Distance).await,
        ObserverStats::default()
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_unregisters_observers() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    for metric in MetricType::CUMULATIVE {
        assert_eq!(provider.observer_count(metric), 1);
    }

    engine.shutdown().await;

    for metric in MetricType::CUMULATIVE {
        assert_eq!(provider.observer_count(metric), 0);
        assert!(!engine.is_observing(metric).await);
    }
    assert_eq!(provider.notify_change(MetricType::Steps), 0);
}

#[tokio::test(start_paused = true)]
async fn test_notification_queued_before_shutdown_is_ignored() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    let before = provider.query_count(MetricType::Steps);

    // Fired while registered, but handled only after teardown
    provider.notify_change(MetricType::Steps);
    engine.shutdown().await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(provider.query_count(MetricType::Steps), before);
    assert_eq!(
        engine.observer_stats(MetricType::Steps).await,
        ObserverStats::default()
    );
}
