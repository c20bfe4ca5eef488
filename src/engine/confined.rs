// ABOUTME: Single execution context that owns all mutable engine state
// ABOUTME: Provider callbacks hop here before touching snapshots, observer bookkeeping, or stream cursors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::aggregates::FetchSequencer;
use super::live_stream::LiveStreamCursor;
use super::observers::ObserverLedger;
use super::state::MetricsSnapshot;

/// State only ever touched from inside the confined task
#[derive(Debug, Default)]
pub(crate) struct ConfinedState {
    pub(crate) metrics: MetricsSnapshot,
    pub(crate) observers: ObserverLedger,
    pub(crate) fetches: FetchSequencer,
    pub(crate) live: LiveStreamCursor,
}

/// Reply released once the mutation's effect has been published
type Reply = Box<dyn FnOnce() + Send>;

type Mutation = Box<dyn FnOnce(&mut ConfinedState) -> Option<Reply> + Send>;

/// Handle for submitting work to the confined task
///
/// Mutations run one at a time in submission order. After each one the
/// metrics snapshot is republished if, and only if, it changed, and only
/// then is a waiting `run` caller released.
#[derive(Clone)]
pub(crate) struct ConfinedContext {
    mutations: mpsc::UnboundedSender<Mutation>,
    snapshots: watch::Receiver<MetricsSnapshot>,
}

impl ConfinedContext {
    /// Spawn the confined task on the current tokio runtime
    pub(crate) fn spawn() -> Self {
        let (mutations, receiver) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(MetricsSnapshot::default());
        tokio::spawn(Self::run_loop(receiver, publisher));
        Self {
            mutations,
            snapshots,
        }
    }

    async fn run_loop(
        mut receiver: mpsc::UnboundedReceiver<Mutation>,
        publisher: watch::Sender<MetricsSnapshot>,
    ) {
        let mut state = ConfinedState::default();
        while let Some(mutation) = receiver.recv().await {
            let reply = mutation(&mut state);
            publisher.send_if_modified(|published| {
                if *published == state.metrics {
                    return false;
                }
                state.metrics.revision = published.revision + 1;
                *published = state.metrics.clone();
                true
            });
            if let Some(reply) = reply {
                reply();
            }
        }
        debug!("Confined context stopped");
    }

    /// Queue `mutation` without waiting for it; returns `false` if the context is gone
    pub(crate) fn submit(&self, mutation: impl FnOnce(&mut ConfinedState) + Send + 'static) -> bool {
        self.mutations
            .send(Box::new(move |state| {
                mutation(state);
                None
            }))
            .is_ok()
    }

    /// Run `mutation` and wait for its result
    ///
    /// Every mutation submitted before this call has been applied by the time
    /// it returns. Returns `None` if the context is gone.
    pub(crate) async fn run<R: Send + 'static>(
        &self,
        mutation: impl FnOnce(&mut ConfinedState) -> R + Send + 'static,
    ) -> Option<R> {
        let (reply, result) = oneshot::channel();
        let submitted = self
            .mutations
            .send(Box::new(move |state| {
                let value = mutation(state);
                Some(Box::new(move || {
                    let _ = reply.send(value);
                }) as Reply)
            }))
            .is_ok();
        if !submitted {
            return None;
        }
        result.await.ok()
    }

    /// Subscribe to published snapshots
    pub(crate) fn snapshots(&self) -> watch::Receiver<MetricsSnapshot> {
        self.snapshots.clone()
    }
}
