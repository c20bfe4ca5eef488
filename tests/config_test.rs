// ABOUTME: Unit tests for environment-driven sync configuration
// ABOUTME: Environment-mutating tests run serially to avoid cross-test interference
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use pierre_metrics_sync::{
    config::SyncConfig,
    constants::env_config,
    models::{MetricType, UpdateFrequency},
};
use serial_test::serial;

const KEYS: [&str; 4] = [
    env_config::SYNC_METRICS,
    env_config::SYNC_BACKGROUND_DELIVERY,
    env_config::SYNC_BACKGROUND_FREQUENCY,
    env_config::SYNC_LIVE_HEART_RATE,
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();

    let config = SyncConfig::from_env();

    assert_eq!(config, SyncConfig::default());
    assert_eq!(config.metrics, MetricType::ALL.to_vec());
    assert!(config.background_delivery);
    assert_eq!(config.background_frequency, UpdateFrequency::Immediate);
    assert!(config.live_heart_rate);
}

#[test]
#[serial]
fn test_values_read_from_environment() {
    clear_env();
    env::set_var(env_config::SYNC_METRICS, "steps, distance");
    env::set_var(env_config::SYNC_BACKGROUND_DELIVERY, "false");
    env::set_var(env_config::SYNC_BACKGROUND_FREQUENCY, "Daily");
    env::set_var(env_config::SYNC_LIVE_HEART_RATE, "0");

    let config = SyncConfig::from_env();
    clear_env();

    assert_eq!(config.metrics, vec![MetricType::Steps, MetricType::Distance]);
    assert!(!config.background_delivery);
    assert_eq!(config.background_frequency, UpdateFrequency::Daily);
    assert!(!config.live_heart_rate);
}

#[test]
#[serial]
fn test_invalid_values_fall_back_to_defaults() {
    clear_env();
    env::set_var(env_config::SYNC_METRICS, "steps,flights_climbed");
    env::set_var(env_config::SYNC_BACKGROUND_DELIVERY, "sometimes");
    env::set_var(env_config::SYNC_BACKGROUND_FREQUENCY, "monthly");

    let config = SyncConfig::from_env();
    clear_env();

    assert_eq!(config, SyncConfig::default());
}
