// ABOUTME: Authorization coordinator requesting read access for the configured metrics
// ABOUTME: Prompts only for undetermined metrics and remembers every decision for the process lifetime
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;
use std::sync::Arc;

use pierre_core::errors::SyncError;
use pierre_core::models::{AuthorizationState, MetricType};
use pierre_providers::{AuthorizationGrants, HealthDataProvider, ProviderError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::bridge::bridge;
use crate::logging::SyncLogger;

/// Requests and records read authorization per metric
///
/// Decisions already made by the user are read back from the provider
/// without prompting, so repeated calls never re-prompt for a metric that
/// was granted or denied.
pub struct AuthorizationCoordinator {
    provider: Arc<dyn HealthDataProvider>,
    recorded: Mutex<BTreeMap<MetricType, AuthorizationState>>,
}

impl AuthorizationCoordinator {
    /// Create a coordinator for `provider`
    #[must_use]
    pub fn new(provider: Arc<dyn HealthDataProvider>) -> Self {
        Self {
            provider,
            recorded: Mutex::new(BTreeMap::new()),
        }
    }

    /// Request read access for `metrics`
    ///
    /// Returns the resulting state of every requested metric. A prompt that
    /// fails leaves the prompted metrics `NotRequested`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unavailable` when the provider has no data store;
    /// the provider is not prompted in that case.
    pub async fn request_access(
        &self,
        metrics: &[MetricType],
    ) -> Result<AuthorizationGrants, SyncError> {
        if !self.provider.is_available() {
            warn!(
                provider = self.provider.name(),
                "Health data unavailable, skipping authorization"
            );
            return Err(SyncError::Unavailable);
        }

        // Serialize prompts so two concurrent requests cannot both prompt
        let mut recorded = self.recorded.lock().await;

        let mut grants = AuthorizationGrants::new();
        let mut undetermined = Vec::new();
        for &metric in metrics {
            let status = self.provider.authorization_status(metric);
            if status.is_determined() {
                grants.insert(metric, status);
            } else {
                undetermined.push(metric);
            }
        }

        if undetermined.is_empty() {
            debug!(
                provider = self.provider.name(),
                "All requested metrics already determined, not prompting"
            );
        } else {
            let prompted = self.prompt(&undetermined).await?;
            for metric in undetermined {
                let state = prompted
                    .get(&metric)
                    .copied()
                    .unwrap_or(AuthorizationState::NotRequested);
                grants.insert(metric, state);
            }
        }

        for (&metric, &state) in &grants {
            recorded.insert(metric, state);
            SyncLogger::log_authorization(self.provider.name(), metric, state);
        }
        drop(recorded);

        Ok(grants)
    }

    async fn prompt(&self, metrics: &[MetricType]) -> Result<AuthorizationGrants, SyncError> {
        let (completion, pending) =
            bridge::<AuthorizationGrants>(self.provider.name(), "request_authorization");
        self.provider.request_authorization(metrics, completion);

        match pending.resolve().await {
            Ok(prompted) => Ok(prompted),
            Err(ProviderError::NotAvailable { .. }) => Err(SyncError::Unavailable),
            Err(error) => {
                warn!(
                    provider = self.provider.name(),
                    error = %error,
                    "Authorization prompt failed, metrics remain not requested"
                );
                Ok(AuthorizationGrants::new())
            }
        }
    }

    /// Last state recorded for `metric` by this coordinator
    pub async fn recorded_state(&self, metric: MetricType) -> AuthorizationState {
        self.recorded
            .lock()
            .await
            .get(&metric)
            .copied()
            .unwrap_or_default()
    }
}
