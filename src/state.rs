// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Per-identifier metric state and the state registry
//!
//! A [`MetricState`] turns raw values into metric writes: the value gauge
//! is set on every update, while the change counter is bumped through a
//! [`Debouncer`] so that a burst of updates counts as one change. The
//! first update after creation only primes the state and never counts.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::config::EngineConfig;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::labels::{build_label_map, LabelMap, LabelSet};
use crate::metrics::LoxoneMetrics;
use crate::structure::Structure;

/// Metric bookkeeping for one identifier
#[derive(Debug)]
pub struct MetricState {
    labels: LabelSet,
    initialized: bool,
    last_value: Option<f64>,
    debouncer: Debouncer,
    metrics: LoxoneMetrics,
}

impl MetricState {
    /// Create an uninitialized state writing to `metrics`
    pub fn new(labels: LabelSet, metrics: LoxoneMetrics, debounce_window: Duration) -> Self {
        Self {
            labels,
            initialized: false,
            last_value: None,
            debouncer: Debouncer::new(debounce_window),
            metrics,
        }
    }

    /// Record a new value.
    ///
    /// Sets the value gauge immediately. Every update after the first one
    /// (re)starts the debounce window; the change counter is incremented
    /// once when the window elapses quietly.
    ///
    /// # Panics
    ///
    /// Panics when a change has to be scheduled (every update after the
    /// first) outside the context of a tokio runtime.
    pub fn update(&mut self, value: f64) {
        self.metrics.set_value(&self.labels, value);
        self.last_value = Some(value);

        if !self.initialized {
            self.initialized = true;
            return;
        }

        debug!(labels = %self.labels, value, "state changed");

        let metrics = self.metrics.clone();
        let labels = self.labels.clone();
        self.debouncer.call(move || metrics.inc_change(&labels));
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Most recent value passed to [`update`](Self::update)
    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    /// Whether a change is waiting for its quiet window
    pub fn change_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

/// Identifier → [`MetricState`] registry.
///
/// Built once at startup and then handed to the dispatcher, which is its
/// only user from then on.
#[derive(Debug)]
pub struct StateRegistry {
    states: HashMap<String, MetricState>,
}

impl StateRegistry {
    /// Create one uninitialized state per entry of a label map
    pub fn from_labels(labels: LabelMap, metrics: &LoxoneMetrics, debounce_window: Duration) -> Self {
        let states = labels
            .into_iter()
            .map(|(uuid, labels)| {
                let state = MetricState::new(labels, metrics.clone(), debounce_window);
                (uuid, state)
            })
            .collect();
        Self { states }
    }

    /// Build label sets for `structure` and create the registry from them
    pub fn build(structure: &Structure, metrics: &LoxoneMetrics, config: &EngineConfig) -> Result<Self> {
        let labels = build_label_map(structure, config.duplicate_policy)?;
        Ok(Self::from_labels(labels, metrics, config.debounce_window))
    }

    pub fn get(&self, uuid: &str) -> Option<&MetricState> {
        self.states.get(uuid)
    }

    pub fn get_mut(&mut self, uuid: &str) -> Option<&mut MetricState> {
        self.states.get_mut(uuid)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.states.contains_key(uuid)
    }

    /// Number of registered identifiers
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterate over registered identifiers
    pub fn uuids(&self) -> impl Iterator<Item = &String> {
        self.states.keys()
    }
}
