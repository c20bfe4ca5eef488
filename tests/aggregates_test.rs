// ABOUTME: Integration tests for daily aggregate fetching and refresh
// ABOUTME: Covers window sums, unit conversion, midnight rollover, failures, and callback faults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, TimeDelta, TimeZone, Utc};
use common::{approx_eq, at, at_second, cumulative_engine, evening_clock};
use pierre_metrics_sync::{
    engine::DailyAggregateFetcher,
    errors::SyncError,
    models::{AggregateWindow, AuthorizationState, MetricType, MetricUnit},
    providers::SyntheticHealthProvider,
    time::FixedClock,
};

fn granted_provider() -> SyntheticHealthProvider {
    let provider = SyntheticHealthProvider::new();
    for metric in MetricType::ALL {
        provider.set_authorization_status(metric, AuthorizationState::Granted);
    }
    provider
}

#[tokio::test]
async fn test_steps_sum_over_today() {
    let provider = SyntheticHealthProvider::new();
    provider.add_sample(MetricType::Steps, 120.0, at(0, 30));
    provider.add_sample(MetricType::Steps, 340.0, at(9, 0));
    provider.add_sample(MetricType::Steps, 5_000.0, at(14, 0));
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);

    engine.request_authorization().await.unwrap();

    assert_eq!(engine.state().current().today_steps(), 5_460);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_sum_excludes_samples_outside_half_open_window() {
    let provider = granted_provider();
    let yesterday = Utc.with_ymd_and_hms(2025, 3, 13, 23, 59, 59).unwrap();
    provider.add_sample(MetricType::Distance, 400.0, yesterday);
    provider.add_sample(MetricType::Distance, 250.0, at(0, 0));
    provider.add_sample(MetricType::Distance, 750.0, at_second(17, 59, 59));
    provider.add_sample(MetricType::Distance, 9_999.0, at(18, 0));
    let clock = evening_clock();
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), clock);

    let aggregate = fetcher.fetch_today(MetricType::Distance).await.unwrap();

    assert!(approx_eq(aggregate.value, 1_000.0));
    assert_eq!(aggregate.window_start, at(0, 0));
    assert_eq!(aggregate.window_end, at(18, 0));
}

#[tokio::test]
async fn test_fetch_all_today_matches_injected_sums() {
    let provider = granted_provider();
    let samples = [
        (MetricType::Steps, [300.0, 1_200.5, 42.0]),
        (MetricType::ActiveEnergy, [12.5, 80.0, 7.25]),
        (MetricType::Distance, [210.0, 1_000.0, 95.5]),
    ];
    for (metric, values) in &samples {
        for (hour, value) in [6, 11, 16].into_iter().zip(values) {
            provider.add_sample(*metric, *value, at(hour, 15));
        }
    }
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), evening_clock());

    let results = fetcher.fetch_all_today(&MetricType::CUMULATIVE).await;

    assert_eq!(results.len(), 3);
    for (metric, outcome) in results {
        let expected: f64 = samples
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, values)| values.iter().sum())
            .unwrap();
        assert!(approx_eq(outcome.unwrap().value, expected), "{metric}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_fetch_all_today_runs_concurrently() {
    let provider = granted_provider();
    provider.set_query_latency(Duration::from_millis(200));
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), evening_clock());

    let started = tokio::time::Instant::now();
    let results = fetcher.fetch_all_today(&MetricType::CUMULATIVE).await;

    assert!(results.iter().all(|(_, outcome)| outcome.is_ok()));
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn test_provider_units_converted_once() {
    let provider = granted_provider();
    provider.set_reporting_unit(MetricType::ActiveEnergy, MetricUnit::Kilojoules);
    provider.set_reporting_unit(MetricType::Distance, MetricUnit::Miles);
    provider.add_sample(MetricType::ActiveEnergy, 250.0, at(8, 0));
    provider.add_sample(MetricType::Distance, 3_218.688, at(8, 0));
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);

    engine.request_authorization().await.unwrap();

    let snapshot = engine.state().current();
    assert!(approx_eq(snapshot.today_active_energy(), 250.0));
    assert!(approx_eq(snapshot.today_distance(), 3_218.688));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_window_recomputed_after_midnight() {
    let provider = SyntheticHealthProvider::new();
    provider.add_sample(MetricType::Steps, 8_000.0, at(21, 0));
    let clock = Arc::new(FixedClock::new(at(23, 59)));
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();
    assert_eq!(engine.state().current().today_steps(), 8_000);

    clock.advance(TimeDelta::minutes(2));
    let next_day_sample = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 30).unwrap();
    provider.add_sample(MetricType::Steps, 35.0, next_day_sample);

    let refresh = engine.refresh_today().await;
    assert_eq!(refresh.value(MetricType::Steps), Some(35.0));

    let snapshot = engine.state().current();
    assert_eq!(snapshot.today_steps(), 35);
    let aggregate = snapshot.aggregates.get(&MetricType::Steps).unwrap();
    assert_eq!(
        aggregate.window_start,
        Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap()
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn test_day_starts_at_local_midnight() {
    let provider = granted_provider();
    // 01:30 on the 14th in UTC-05:00 is 06:30 UTC; local midnight is 05:00 UTC
    provider.add_sample(MetricType::Steps, 500.0, at(4, 59));
    provider.add_sample(MetricType::Steps, 75.0, at(5, 0));
    let offset = FixedOffset::west_opt(5 * 3_600).unwrap();
    let clock = Arc::new(FixedClock::with_offset(at(6, 30), offset));
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), clock);

    let aggregate = fetcher.fetch_today(MetricType::Steps).await.unwrap();

    assert!(approx_eq(aggregate.value, 75.0));
    assert_eq!(aggregate.window_start, at(5, 0));
}

#[tokio::test]
async fn test_query_failure_keeps_previous_value() {
    let provider = SyntheticHealthProvider::new();
    provider.add_sample(MetricType::Steps, 1_000.0, at(9, 0));
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);
    engine.request_authorization().await.unwrap();

    provider.add_sample(MetricType::Steps, 500.0, at(10, 0));
    provider.fail_queries(MetricType::Steps, "store locked");
    let refresh = engine.refresh_today().await;

    assert_eq!(
        refresh.outcomes.get(&MetricType::Steps),
        Some(&Err(SyncError::QueryFailed {
            metric: MetricType::Steps,
            reason: "store locked".to_owned(),
        }))
    );
    assert!(refresh.value(MetricType::Distance).is_some());
    assert!(!refresh.all_succeeded());

    let snapshot = engine.state().current();
    assert_eq!(snapshot.today_steps(), 1_000);
    assert!(matches!(
        snapshot.last_error,
        Some(SyncError::QueryFailed {
            metric: MetricType::Steps,
            ..
        })
    ));

    provider.clear_query_failure(MetricType::Steps);
    let refresh = engine.refresh_today().await;
    assert!(refresh.all_succeeded());
    let snapshot = engine.state().current();
    assert_eq!(snapshot.today_steps(), 1_500);
    assert!(snapshot.last_error.is_none());
    engine.shutdown().await;
}

#[tokio::test]
async fn test_dimension_mismatch_is_query_failure() {
    let provider = granted_provider();
    provider.set_reporting_unit(MetricType::Steps, MetricUnit::Meters);
    provider.add_sample(MetricType::Steps, 10.0, at(9, 0));
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), evening_clock());

    let error = fetcher.fetch_today(MetricType::Steps).await.unwrap_err();

    assert!(matches!(
        error,
        SyncError::QueryFailed {
            metric: MetricType::Steps,
            ..
        }
    ));
}

#[tokio::test]
async fn test_duplicate_completion_is_ignored() {
    let provider = granted_provider();
    provider.set_duplicate_callbacks(true);
    provider.add_sample(MetricType::ActiveEnergy, 320.0, at(12, 0));
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), evening_clock());

    let aggregate = fetcher.fetch_today(MetricType::ActiveEnergy).await.unwrap();

    assert!(approx_eq(aggregate.value, 320.0));
}

#[tokio::test]
async fn test_dropped_completion_resolves_as_query_failure() {
    let provider = granted_provider();
    provider.set_drop_callbacks(true);
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), evening_clock());

    let window = AggregateWindow {
        start: at(0, 0),
        end: at(18, 0),
    };
    let error = fetcher.fetch_sum(MetricType::Steps, window).await.unwrap_err();

    assert_eq!(
        error,
        SyncError::QueryFailed {
            metric: MetricType::Steps,
            reason: "provider dropped callback".to_owned(),
        }
    );
}

#[tokio::test]
async fn test_unauthorized_query_maps_to_unauthorized() {
    let provider = SyntheticHealthProvider::new();
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), evening_clock());

    let error = fetcher.fetch_today(MetricType::Distance).await.unwrap_err();

    assert_eq!(
        error,
        SyncError::Unauthorized {
            metric: MetricType::Distance
        }
    );
}

#[tokio::test]
async fn test_refresh_before_authorization_queries_nothing() {
    let provider = SyntheticHealthProvider::new();
    let clock = evening_clock();
    let engine = cumulative_engine(&provider, &clock);

    let refresh = engine.refresh_today().await;

    assert!(refresh.outcomes.is_empty());
    for metric in MetricType::CUMULATIVE {
        assert_eq!(provider.query_count(metric), 0);
    }
}

#[tokio::test]
async fn test_heart_rate_cannot_be_summed() {
    let provider = granted_provider();
    provider.add_sample(MetricType::HeartRate, 64.0, at(9, 0));
    let clock = evening_clock();
    let fetcher = DailyAggregateFetcher::new(Arc::new(provider), clock);

    let err = fetcher.fetch_today(MetricType::HeartRate).await.unwrap_err();

    assert_eq!(
        err,
        SyncError::QueryFailed {
            metric: MetricType::HeartRate,
            reason: "heart_rate is not supported".to_owned(),
        }
    );
}
