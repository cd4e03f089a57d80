// Loxwatch Exporter - Prometheus metrics definitions
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Exporter self-metrics and text encoding.
//!
//! The per-state `loxone_changes` / `loxone_values` families live in the
//! engine ([`loxwatch::LoxoneMetrics`]). This module only adds what the
//! binary knows about itself.

use lazy_static::lazy_static;
use prometheus::{register_gauge, Encoder, Gauge, Registry, TextEncoder};

lazy_static! {
    // ============================================================
    // Exporter Metrics
    // ============================================================

    /// Number of state identifiers the dispatcher routes.
    pub static ref REGISTERED_STATES: Gauge = register_gauge!(
        "loxone_exporter_registered_states",
        "Number of Loxone state identifiers mapped to label sets"
    ).expect("loxone_exporter_registered_states registers once");
}

/// Record the size of the state registry.
pub fn set_registered_states(count: usize) {
    REGISTERED_STATES.set(count as f64);
}

/// Encode every family of `registry` to Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
