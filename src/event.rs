// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Inbound value events

use std::fmt;

/// A value change reported by the Miniserver
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Identifier of the value stream
    pub uuid: String,
    /// New value
    pub value: f64,
}

impl Event {
    pub fn new(uuid: impl Into<String>, value: f64) -> Self {
        Self {
            uuid: uuid.into(),
            value,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.uuid, self.value)
    }
}
