//! # Loxwatch - Loxone events as Prometheus metrics
//!
//! Core engine that turns Loxone Miniserver value events into two metric
//! families: the latest value per state (`loxone_values`) and a debounced
//! count of changes per state (`loxone_changes`).
//!
//! ## Key Features
//!
//! - **Semantic labels**: every identifier is labelled with its control,
//!   room, type, category and state name
//! - **Immediate values**: the value gauge is written on every event
//! - **Debounced changes**: bursts of updates count as one change
//! - **Cooperative shutdown**: the dispatch loop exits on a cancellation token
//!
//! ## Quick Start
//!
//! ```rust
//! use loxwatch::{Dispatcher, EngineConfig, Event, LoxoneMetrics, StateRegistry, Structure};
//! use prometheus::Registry;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> loxwatch::Result<()> {
//! let structure = Structure::from_json(r#"{
//!     "rooms": { "r1": { "name": "Lounge" } },
//!     "cats": { "c1": { "name": "Shading" } },
//!     "controls": { "ctl1": {
//!         "name": "Blinds", "type": "Jalousie", "room": "r1", "cat": "c1",
//!         "states": { "position": "u1" }
//!     } }
//! }"#)?;
//!
//! let registry = Registry::new();
//! let metrics = LoxoneMetrics::registered(&registry)?;
//! let states = StateRegistry::build(&structure, &metrics, &EngineConfig::default())?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! tx.send(Event::new("u1", 42.0)).await.unwrap();
//! drop(tx);
//!
//! Dispatcher::new(states).run(rx, CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`structure`]: Structure file (`LoxAPP3.json`) model
//! - [`labels`]: Identifier → label set construction
//! - [`debounce`]: Trailing-edge debouncer
//! - [`state`]: Per-identifier metric state and registry
//! - [`dispatcher`]: Event dispatch loop
//! - [`metrics`]: Metric families

// Modules
pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod labels;
pub mod metrics;
pub mod state;
pub mod structure;

// Re-exports for convenient access
pub use config::{EngineConfig, DEFAULT_DEBOUNCE_WINDOW};
pub use debounce::Debouncer;
pub use dispatcher::{DispatchExit, DispatchStats, Dispatcher};
pub use error::{ConfigError, LoxwatchError, Result};
pub use event::Event;
pub use labels::{build_label_map, DuplicatePolicy, LabelMap, LabelSet, GLOBAL_LABEL, LABEL_NAMES};
pub use metrics::{LoxoneMetrics, CHANGES_METRIC, VALUES_METRIC};
pub use state::{MetricState, StateRegistry};
pub use structure::{Category, Control, Room, StateDef, Structure};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
