// ABOUTME: One-shot bridge from provider completion callbacks to awaitable results
// ABOUTME: Each call gets its own token; repeated provider invocations are ignored
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::{Arc, Mutex, PoisonError};

use pierre_providers::{callback_dropped, Completion, ProviderResult};
use tokio::sync::oneshot;
use tracing::debug;

/// Sender that delivers at most one value, however often it is fired
pub(crate) struct OnceSender<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> OnceSender<T> {
    /// Create a dedicated sender/receiver pair for a single call
    pub(crate) fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Deliver `value` if nothing was delivered yet; returns whether this call won
    pub(crate) fn fire(&self, value: T) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        sender.is_some_and(|sender| {
            // A dropped receiver means the caller stopped waiting; the value is discarded
            let _ = sender.send(value);
            true
        })
    }
}

/// Awaitable side of a completion bridge
pub(crate) struct CallbackBridge<T> {
    receiver: oneshot::Receiver<ProviderResult<T>>,
    provider: &'static str,
}

impl<T> CallbackBridge<T> {
    /// Wait for the provider's first completion
    ///
    /// A provider that releases the completion without calling it resolves
    /// to `ProviderError::CallbackDropped`.
    pub(crate) async fn resolve(self) -> ProviderResult<T> {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(callback_dropped(self.provider)))
    }
}

/// Create a completion callback and the bridge that awaits it
pub(crate) fn bridge<T: Send + 'static>(
    provider: &'static str,
    operation: &'static str,
) -> (Completion<T>, CallbackBridge<T>) {
    let (sender, receiver) = OnceSender::channel();
    let completion: Completion<T> = Arc::new(move |result| {
        if !sender.fire(result) {
            debug!(provider, operation, "Ignoring repeated provider callback");
        }
    });
    (completion, CallbackBridge { receiver, provider })
}
