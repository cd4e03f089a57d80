// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Label set construction
//!
//! This module walks a [`Structure`] once and produces the flat
//! identifier → [`LabelSet`] map that the state registry is built from.
//!
//! Indexed states get one label set per element, with the zero-based
//! index appended to the state name in decimal (`motion-0`, `motion-1`,
//! ..., `motion-10`). Controller-wide global states are labelled with
//! `global` in every dimension except `state`.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::structure::{Control, StateDef, Structure};

/// Label dimension names, in registration order
pub const LABEL_NAMES: [&str; 5] = ["control", "room", "type", "cat", "state"];

/// Value used for every non-state dimension of a global state
pub const GLOBAL_LABEL: &str = "global";

/// Identifier → label set mapping produced by [`build_label_map`]
pub type LabelMap = HashMap<String, LabelSet>;

/// Immutable label values for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSet {
    control: String,
    room: String,
    kind: String,
    cat: String,
    state: String,
}

impl LabelSet {
    /// Create a label set from its five dimensions
    pub fn new(
        control: impl Into<String>,
        room: impl Into<String>,
        kind: impl Into<String>,
        cat: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            control: control.into(),
            room: room.into(),
            kind: kind.into(),
            cat: cat.into(),
            state: state.into(),
        }
    }

    /// Label set for a controller-wide global state
    pub fn global(state: impl Into<String>) -> Self {
        Self::new(GLOBAL_LABEL, GLOBAL_LABEL, GLOBAL_LABEL, GLOBAL_LABEL, state)
    }

    pub fn control(&self) -> &str {
        &self.control
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Value of the `type` dimension
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn cat(&self) -> &str {
        &self.cat
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Label values in [`LABEL_NAMES`] order
    pub fn values(&self) -> [&str; 5] {
        [
            self.control.as_str(),
            self.room.as_str(),
            self.kind.as_str(),
            self.cat.as_str(),
            self.state.as_str(),
        ]
    }

    fn with_state(&self, state: String) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{control={}, room={}, type={}, cat={}, state={}}}",
            self.control, self.room, self.kind, self.cat, self.state
        )
    }
}

/// What to do when two state definitions share one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail the build with [`ConfigError::DuplicateIdentifier`]
    #[default]
    Reject,
    /// Keep the definition encountered last
    Overwrite,
}

/// Build the identifier → label set map for a structure.
///
/// Controls are visited in key order, then global states. Fails on the
/// first dangling room or category reference and, under
/// [`DuplicatePolicy::Reject`], on the first shared identifier. No partial
/// map is ever returned.
pub fn build_label_map(
    structure: &Structure,
    policy: DuplicatePolicy,
) -> Result<LabelMap, ConfigError> {
    let mut map = LabelMap::with_capacity(structure.identifier_count());

    for control in structure.controls.values() {
        let base = control_labels(structure, control)?;

        for (state_name, def) in &control.states {
            match def {
                StateDef::Scalar(uuid) => {
                    insert(&mut map, uuid, base.with_state(state_name.clone()), policy)?;
                }
                StateDef::Indexed(uuids) => {
                    for (index, uuid) in uuids.iter().enumerate() {
                        let labels = base.with_state(format!("{}-{}", state_name, index));
                        insert(&mut map, uuid, labels, policy)?;
                    }
                }
                StateDef::Unsupported(value) => {
                    debug!(
                        control = %control.name,
                        state = %state_name,
                        %value,
                        "unsupported state shape skipped"
                    );
                }
            }
        }
    }

    for (state_name, uuid) in &structure.global_states {
        insert(&mut map, uuid, LabelSet::global(state_name.clone()), policy)?;
    }

    Ok(map)
}

/// Label set of a control with an empty state
fn control_labels(structure: &Structure, control: &Control) -> Result<LabelSet, ConfigError> {
    let room_ref = control
        .room
        .as_ref()
        .ok_or_else(|| ConfigError::MissingRoom {
            control: control.name.clone(),
        })?;
    let room = structure
        .rooms
        .get(room_ref)
        .ok_or_else(|| ConfigError::UnknownRoom {
            control: control.name.clone(),
            room: room_ref.clone(),
        })?;

    let cat_ref = control
        .cat
        .as_ref()
        .ok_or_else(|| ConfigError::MissingCategory {
            control: control.name.clone(),
        })?;
    let cat = structure
        .cats
        .get(cat_ref)
        .ok_or_else(|| ConfigError::UnknownCategory {
            control: control.name.clone(),
            cat: cat_ref.clone(),
        })?;

    Ok(LabelSet::new(
        control.name.as_str(),
        room.name.as_str(),
        control.kind.as_str(),
        cat.name.as_str(),
        "",
    ))
}

fn insert(
    map: &mut LabelMap,
    uuid: &str,
    labels: LabelSet,
    policy: DuplicatePolicy,
) -> Result<(), ConfigError> {
    if let Some(previous) = map.get(uuid) {
        match policy {
            DuplicatePolicy::Reject => {
                return Err(ConfigError::DuplicateIdentifier {
                    uuid: uuid.to_string(),
                    first: previous.to_string(),
                    second: labels.to_string(),
                });
            }
            DuplicatePolicy::Overwrite => {
                warn!(uuid, from = %previous, to = %labels, "identifier redefined");
            }
        }
    }
    map.insert(uuid.to_string(), labels);
    Ok(())
}
