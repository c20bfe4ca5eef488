// ABOUTME: Demo driver running the metrics sync engine against the synthetic provider
// ABOUTME: Seeds a day of samples, authorizes, streams heart rate, and prints the final snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pierre Metrics Sync Demo
//!
//! Runs one complete sync session in-process: authorization, initial
//! aggregate fetch, an observer-triggered re-fetch, live heart-rate samples
//! delivered out of order, and a final refresh.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, ValueEnum};
use pierre_metrics_sync::{
    config::SyncConfig,
    engine::{MetricsSnapshot, MetricsStateView, MetricsSyncEngine},
    logging,
    models::{AuthorizationState, MetricType},
    providers::SyntheticHealthProvider,
    time::{Clock, FixedClock},
};
use tokio::time::timeout;
use tracing::{info, warn};

const STATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Parser)]
#[command(name = "pierre-metrics-sync")]
#[command(about = "Pierre metrics sync engine demo against the synthetic provider")]
struct Args {
    /// Deny read access for a metric (repeatable)
    #[arg(long)]
    deny: Vec<MetricType>,

    /// Simulate a device without a health data store
    #[arg(long)]
    unavailable: bool,

    /// Number of live heart-rate samples to stream
    #[arg(long, default_value_t = 5)]
    heart_rate_samples: u32,

    /// Output format for the final snapshot
    #[arg(long, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_from_env()?;

    let clock = Arc::new(FixedClock::new(Utc::now()));
    let provider = Arc::new(SyntheticHealthProvider::new());
    provider.set_available(!args.unavailable);
    for metric in &args.deny {
        provider.set_authorization_decision(*metric, AuthorizationState::Denied);
    }
    seed_day(&provider, clock.as_ref());

    let engine = MetricsSyncEngine::with_clock(
        provider.clone(),
        SyncConfig::from_env(),
        clock.clone(),
    );
    info!(config = ?engine.config(), "Metrics sync engine created");
    let mut view = engine.state();

    match engine.request_authorization().await {
        Ok(grants) => info!(?grants, "Authorization finished"),
        Err(error) => {
            warn!(error = %error, "Authorization failed");
            print_snapshot(&view.current(), args.format)?;
            return Ok(());
        }
    }

    simulate_activity(&provider, &clock, &mut view).await;
    stream_heart_rate(&provider, clock.as_ref(), &mut view, args.heart_rate_samples).await;

    let refresh = engine.refresh_today().await;
    for error in refresh.errors() {
        warn!(error = %error, "Refresh reported a failure");
    }

    print_snapshot(&view.current(), args.format)?;
    engine.shutdown().await;
    Ok(())
}

/// Spread a plausible morning of samples across `[start of day, now)`
fn seed_day(provider: &SyntheticHealthProvider, clock: &dyn Clock) {
    let now = clock.now();
    let start = clock.start_of_day(now);
    let slice = (now - start) / 4;
    for i in 0..4 {
        let at = start + slice * i;
        provider.add_sample(MetricType::Steps, 850.0, at);
        provider.add_sample(MetricType::ActiveEnergy, 42.5, at);
        provider.add_sample(MetricType::Distance, 610.0, at);
    }
}

async fn simulate_activity(
    provider: &SyntheticHealthProvider,
    clock: &FixedClock,
    view: &mut MetricsStateView,
) {
    let before = view.current().steps;
    let walked_at = clock.now();
    clock.advance(TimeDelta::minutes(1));
    provider.add_sample(MetricType::Steps, 120.0, walked_at);

    if provider.notify_change(MetricType::Steps) == 0 {
        return;
    }
    let updated = timeout(STATE_TIMEOUT, view.wait_for(|s| s.steps > before)).await;
    if updated.is_err() {
        warn!("Observer re-fetch did not land in time");
    }
}

async fn stream_heart_rate(
    provider: &SyntheticHealthProvider,
    clock: &dyn Clock,
    view: &mut MetricsStateView,
    count: u32,
) {
    if count == 0 {
        return;
    }
    let now = clock.now();
    // Deliver newest first; the engine must still settle on the latest timestamp
    let samples: Vec<(f64, DateTime<Utc>)> = (0..count)
        .rev()
        .map(|i| {
            let offset = i64::from(count - i);
            (68.0 + f64::from(i), now - TimeDelta::seconds(offset * 10))
        })
        .collect();
    let Some(newest) = samples.iter().map(|(_, at)| *at).max() else {
        return;
    };

    if provider.push_stream_samples(MetricType::HeartRate, &samples) == 0 {
        return;
    }
    let settled = timeout(
        STATE_TIMEOUT,
        view.wait_for(|s| s.heart_rate.is_some_and(|hr| hr.timestamp == newest)),
    )
    .await;
    if settled.is_err() {
        warn!("Live heart rate did not settle in time");
    }
}

fn print_snapshot(snapshot: &MetricsSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(snapshot)?),
        OutputFormat::Pretty => {
            println!("Today");
            println!("  steps           {}", snapshot.today_steps());
            println!("  active energy   {:.1} kcal", snapshot.today_active_energy());
            println!("  distance        {:.0} m", snapshot.today_distance());
            match snapshot.current_heart_rate() {
                Some(bpm) => println!("  heart rate      {bpm:.0} bpm"),
                None => println!("  heart rate      -"),
            }
            println!("  authorized      {}", snapshot.is_authorized());
            if let Some(error) = &snapshot.last_error {
                println!("  last error      {error}");
            }
        }
    }
    Ok(())
}
