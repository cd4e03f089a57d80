// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Trailing-edge debouncing
//!
//! A [`Debouncer`] owns at most one scheduled action. Every call replaces
//! the pending action and restarts the quiet window, so a burst of calls
//! runs only the last action, one window after the last call.
//!
//! Actions run on the tokio runtime; [`Debouncer::call`] must be invoked
//! from within a runtime context.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Per-key trailing-edge debouncer
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Quiet window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `action` to run once the window elapses without another call.
    ///
    /// Any action still waiting from an earlier call is aborted.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a tokio runtime.
    pub fn call<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action();
        }));
    }

    /// Abort the pending action, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether an action is scheduled and has not run yet
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}
