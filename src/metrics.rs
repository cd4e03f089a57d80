// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Metric families written by the engine
//!
//! [`LoxoneMetrics`] bundles the change counter and the value gauge. Both
//! are labelled with [`LABEL_NAMES`]. The handle is cheap to clone and
//! safe to write from any task; the underlying `prometheus` vectors are
//! internally synchronized.

use prometheus::core::Collector;
use prometheus::proto::{Metric, MetricFamily};
use prometheus::{CounterVec, GaugeVec, Opts, Registry};

use crate::labels::{LabelSet, LABEL_NAMES};

/// Name of the debounced change counter
pub const CHANGES_METRIC: &str = "loxone_changes";

/// Name of the latest-value gauge
pub const VALUES_METRIC: &str = "loxone_values";

/// Change counter and value gauge, keyed by label set
#[derive(Clone)]
pub struct LoxoneMetrics {
    changes: CounterVec,
    values: GaugeVec,
}

impl std::fmt::Debug for LoxoneMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoxoneMetrics")
            .field("changes", &CHANGES_METRIC)
            .field("values", &VALUES_METRIC)
            .finish()
    }
}

impl LoxoneMetrics {
    /// Create unregistered metric families
    pub fn new() -> prometheus::Result<Self> {
        let changes = CounterVec::new(Opts::new(CHANGES_METRIC, "Number of changes"), &LABEL_NAMES)?;
        let values = GaugeVec::new(
            Opts::new(VALUES_METRIC, "Current Value of changes"),
            &LABEL_NAMES,
        )?;
        Ok(Self { changes, values })
    }

    /// Create metric families and register them with `registry`
    pub fn registered(registry: &Registry) -> prometheus::Result<Self> {
        let metrics = Self::new()?;
        metrics.register(registry)?;
        Ok(metrics)
    }

    /// Register both families with `registry`
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.changes.clone()))?;
        registry.register(Box::new(self.values.clone()))?;
        Ok(())
    }

    /// Set the latest value for a label set
    pub fn set_value(&self, labels: &LabelSet, value: f64) {
        self.values.with_label_values(&labels.values()).set(value);
    }

    /// Count one change for a label set
    pub fn inc_change(&self, labels: &LabelSet) {
        self.changes.with_label_values(&labels.values()).inc();
    }

    /// Current gauge value, `None` if no value was ever set
    pub fn value(&self, labels: &LabelSet) -> Option<f64> {
        find_series(&self.values.collect(), labels).map(|metric| metric.get_gauge().get_value())
    }

    /// Current change count (0 when nothing was counted yet)
    pub fn change_count(&self, labels: &LabelSet) -> f64 {
        find_series(&self.changes.collect(), labels)
            .map_or(0.0, |metric| metric.get_counter().get_value())
    }
}

/// Look up a series without creating it
fn find_series<'a>(families: &'a [MetricFamily], labels: &LabelSet) -> Option<&'a Metric> {
    let wanted = labels.values();
    families
        .iter()
        .flat_map(|family| family.get_metric())
        .find(|metric| {
            LABEL_NAMES.iter().zip(wanted.iter()).all(|(name, value)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn blinds() -> LabelSet {
        LabelSet::new("Blinds", "Lounge", "Jalousie", "Shading", "position")
    }

    #[test]
    fn test_set_and_read_value() {
        let metrics = LoxoneMetrics::new().unwrap();
        assert_eq!(metrics.value(&blinds()), None);

        metrics.set_value(&blinds(), 42.0);
        assert_eq!(metrics.value(&blinds()), Some(42.0));

        metrics.set_value(&blinds(), 10.0);
        assert_eq!(metrics.value(&blinds()), Some(10.0));
    }

    #[test]
    fn test_change_count() {
        let metrics = LoxoneMetrics::new().unwrap();
        assert_eq!(metrics.change_count(&blinds()), 0.0);

        metrics.inc_change(&blinds());
        metrics.inc_change(&blinds());
        assert_eq!(metrics.change_count(&blinds()), 2.0);
    }

    #[test]
    fn test_register_and_encode() {
        let registry = Registry::new();
        let metrics = LoxoneMetrics::registered(&registry).unwrap();
        metrics.set_value(&blinds(), 1.0);
        metrics.inc_change(&blinds());

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("# TYPE loxone_changes counter"));
        assert!(output.contains("# TYPE loxone_values gauge"));
        assert!(output.contains("control=\"Blinds\""));
        assert!(output.contains("state=\"position\""));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        let metrics = LoxoneMetrics::registered(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());
    }
}
