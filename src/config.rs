// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Configuration types for the engine

use std::time::Duration;

use crate::labels::DuplicatePolicy;

/// Default quiet window before a change is counted
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Engine-level configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet window for change debouncing (default: 500 ms)
    pub debounce_window: Duration,

    /// Handling of identifiers shared by two state definitions
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with a custom debounce window
    pub fn with_debounce_window(debounce_window: Duration) -> Self {
        Self {
            debounce_window,
            ..Default::default()
        }
    }

    /// Create a configuration with a custom duplicate policy
    pub fn with_duplicate_policy(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            duplicate_policy,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce_window, Duration::from_millis(500));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_engine_config_with_debounce_window() {
        let config = EngineConfig::with_debounce_window(Duration::from_secs(2));
        assert_eq!(config.debounce_window, Duration::from_secs(2));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_engine_config_with_duplicate_policy() {
        let config = EngineConfig::with_duplicate_policy(DuplicatePolicy::Overwrite);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Overwrite);
        assert_eq!(config.debounce_window, DEFAULT_DEBOUNCE_WINDOW);
    }
}
