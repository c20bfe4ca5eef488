// ABOUTME: Background delivery registration for observed metrics
// ABOUTME: Failures are recorded as advisory errors and never block foreground syncing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use pierre_core::errors::SyncError;
use pierre_core::models::{MetricType, UpdateFrequency};
use pierre_providers::HealthDataProvider;
use tracing::{info, warn};

use super::bridge::bridge;
use super::confined::ConfinedContext;

/// Asks the provider to keep waking observers while the app is backgrounded
pub struct BackgroundDeliveryRegistrar {
    provider: Arc<dyn HealthDataProvider>,
    confined: ConfinedContext,
}

impl BackgroundDeliveryRegistrar {
    pub(crate) fn new(provider: Arc<dyn HealthDataProvider>, confined: ConfinedContext) -> Self {
        Self { provider, confined }
    }

    /// Enable background delivery of `metric` at `frequency`
    ///
    /// # Errors
    ///
    /// Returns `SyncError::BackgroundDeliveryFailed`, which is also recorded
    /// as the snapshot's last error.
    pub async fn enable(
        &self,
        metric: MetricType,
        frequency: UpdateFrequency,
    ) -> Result<(), SyncError> {
        let (completion, pending) = bridge::<()>(self.provider.name(), "background_delivery");
        self.provider
            .enable_background_delivery(metric, frequency, completion);

        match pending.resolve().await {
            Ok(()) => {
                info!(
                    metric = %metric,
                    frequency = %frequency,
                    provider = self.provider.name(),
                    "Background delivery enabled"
                );
                Ok(())
            }
            Err(provider_error) => {
                let error = SyncError::BackgroundDeliveryFailed {
                    metric,
                    reason: provider_error.reason(),
                };
                warn!(metric = %metric, error = %error, "Background delivery not enabled");
                let recorded = error.clone();
                self.confined
                    .run(move |state| state.metrics.record_error(recorded))
                    .await;
                Err(error)
            }
        }
    }
}
