// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Event dispatch loop
//!
//! The [`Dispatcher`] is the single consumer of the inbound event channel.
//! Each iteration waits on two inputs, the cancellation token and the
//! channel, and exits on cancellation or when the channel closes.
//! Events for unknown identifiers are logged at debug level and dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::event::Event;
use crate::state::StateRegistry;

/// Why [`Dispatcher::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
    /// The cancellation token fired
    Cancelled,
    /// Every sender of the event channel was dropped
    StreamClosed,
}

/// Counters readable while the dispatcher runs
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Events routed to a known identifier
    pub routed: AtomicU64,
    /// Events dropped because their identifier is unknown
    pub unknown: AtomicU64,
    /// Whether the dispatch loop is running
    pub running: AtomicBool,
}

impl DispatchStats {
    pub fn routed(&self) -> u64 {
        self.routed.load(Ordering::Relaxed)
    }

    pub fn unknown(&self) -> u64 {
        self.unknown.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Routes events to their [`MetricState`](crate::state::MetricState)
pub struct Dispatcher {
    registry: StateRegistry,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    /// Take ownership of a fully built registry
    pub fn new(registry: StateRegistry) -> Self {
        Self::with_stats(registry, Arc::new(DispatchStats::default()))
    }

    /// Like [`Dispatcher::new`], reporting into counters created earlier
    /// (e.g. shared with an HTTP status endpoint before the registry exists)
    pub fn with_stats(registry: StateRegistry, stats: Arc<DispatchStats>) -> Self {
        Self { registry, stats }
    }

    /// Shared handle to the dispatch counters
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Route one event. Returns `false` if the identifier is unknown.
    ///
    /// # Panics
    ///
    /// Like [`MetricState::update`](crate::state::MetricState::update), panics
    /// outside a tokio runtime once a known identifier changes.
    pub fn dispatch(&mut self, event: Event) -> bool {
        match self.registry.get_mut(&event.uuid) {
            Some(state) => {
                state.update(event.value);
                self.stats.routed.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => {
                debug!(%event, "event unknown");
                self.stats.unknown.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Consume `events` until `cancel` fires or the channel closes.
    ///
    /// Cancellation is checked first on every iteration, so no event is
    /// processed once it has been observed.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Event>,
        cancel: CancellationToken,
    ) -> DispatchExit {
        info!(states = self.registry.len(), "Start reading events");
        self.stats.running.store(true, Ordering::SeqCst);

        let exit = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutting down");
                    break DispatchExit::Cancelled;
                }
                next = events.recv() => match next {
                    Some(event) => {
                        self.dispatch(event);
                    }
                    None => {
                        warn!("Event stream closed");
                        break DispatchExit::StreamClosed;
                    }
                },
            }
        };

        self.stats.running.store(false, Ordering::SeqCst);
        info!(
            routed = self.stats.routed(),
            unknown = self.stats.unknown(),
            "Dispatcher stopped"
        );
        exit
    }
}
