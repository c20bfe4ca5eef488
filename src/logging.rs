// ABOUTME: Logging configuration and structured logging setup for observability and debugging
// ABOUTME: Configures log levels and formatters, and provides structured sync event helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Structured logging for the metrics sync engine

use std::env;
use std::io;

use anyhow::Result;
use pierre_core::constants::service_names;
use pierre_core::errors::SyncError;
use pierre_core::models::{AuthorizationState, MetricType};
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::engine::aggregates::FetchTrigger;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include thread information
    pub include_thread: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_thread: false,
            service_name: service_names::PIERRE_METRICS_SYNC.into(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: "development".into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_thread: is_production || env::var("LOG_INCLUDE_THREAD").is_ok(),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| service_names::PIERRE_METRICS_SYNC.into()),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment,
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let env_filter = env::var("RUST_LOG")
            .map_or_else(|_| EnvFilter::new(&self.level), |directive| EnvFilter::new(&directive))
            .add_directive(
                format!("pierre_metrics_sync={}", self.level)
                    .parse()
                    .unwrap_or_else(|_| tracing::Level::INFO.into()),
            );

        let registry = tracing_subscriber::registry().with(env_filter);

        match self.format {
            LogFormat::Json => {
                let json_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_thread_ids(self.include_thread)
                    .with_thread_names(self.include_thread)
                    .with_target(true)
                    .with_writer(io::stdout)
                    .with_span_events(FmtSpan::NONE)
                    .json();

                registry.with(json_layer).try_init()?;
            }
            LogFormat::Pretty => {
                let pretty_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_thread_ids(self.include_thread)
                    .with_thread_names(self.include_thread)
                    .with_target(true)
                    .with_writer(io::stdout);

                registry.with(pretty_layer).try_init()?;
            }
            LogFormat::Compact => {
                let compact_layer = fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(io::stdout);

                registry.with(compact_layer).try_init()?;
            }
        }

        self.log_startup_info();
        Ok(())
    }

    /// Log structured startup information
    fn log_startup_info(&self) {
        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Pierre metrics sync starting up"
        );

        let config_summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
                "features": {
                    "location": self.include_location,
                    "thread": self.include_thread
                }
            }
        });

        info!("Configuration loaded: {}", config_summary);
    }
}

/// Initialize logging from environment variables
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Structured events emitted by the sync engine
pub struct SyncLogger;

impl SyncLogger {
    /// Log the authorization state recorded for a metric
    pub fn log_authorization(provider: &str, metric: MetricType, state: AuthorizationState) {
        info!(
            sync.provider = %provider,
            sync.metric = %metric,
            sync.authorization = ?state,
            "Authorization recorded"
        );
    }

    /// Log the outcome of one aggregate fetch
    pub fn log_fetch(
        metric: MetricType,
        trigger: FetchTrigger,
        value: Option<f64>,
        error: Option<&SyncError>,
    ) {
        match error {
            None => debug!(
                sync.metric = %metric,
                sync.trigger = trigger.as_str(),
                sync.outcome = "success",
                sync.value = value.unwrap_or_default(),
                sync.unit = %metric.canonical_unit(),
                "Aggregate fetched"
            ),
            Some(error) => warn!(
                sync.metric = %metric,
                sync.trigger = trigger.as_str(),
                sync.outcome = "failure",
                sync.error = %error,
                "Aggregate fetch failed"
            ),
        }
    }

    /// Log an observer notification absorbed by an in-flight re-fetch
    pub fn log_collapsed(metric: MetricType, collapsed: u64) {
        debug!(
            sync.metric = %metric,
            sync.collapsed = collapsed,
            "Re-fetch already in flight, collapsing notification"
        );
    }

    /// Log a live stream lifecycle event
    pub fn log_stream_event(event: &str, generation: Option<u64>, details: Option<&str>) {
        info!(
            sync.metric = %MetricType::HeartRate,
            stream.event = %event,
            stream.generation = generation.unwrap_or_default(),
            stream.details = details.unwrap_or(""),
            "Live stream event"
        );
    }
}
