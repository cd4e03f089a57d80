// Loxwatch - Loxone event-to-metric engine
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Miniserver structure model
//!
//! Typed view of the `LoxAPP3.json` structure file: rooms, categories,
//! controls with their state definitions, and controller-wide global
//! states. Only the fields the label builder needs are modelled; every
//! other key in the file is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// A room entry of the structure file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Room {
    /// Display name
    pub name: String,
}

/// A category entry of the structure file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    /// Display name
    pub name: String,
}

/// Identifiers behind one named state of a control.
///
/// The structure file stores either a single UUID string or an array of
/// UUID strings; the shape is resolved here, once, at parse time. Any
/// other shape is kept as [`StateDef::Unsupported`] and produces no labels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StateDef {
    /// One identifier
    Scalar(String),
    /// One identifier per index, in order
    Indexed(Vec<String>),
    /// Anything else (numbers, objects, mixed arrays)
    Unsupported(serde_json::Value),
}

/// A configured device entity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Control {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Control type tag (e.g. `Jalousie`, `LightController`)
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Room reference (key into [`Structure::rooms`])
    #[serde(default)]
    pub room: Option<String>,
    /// Category reference (key into [`Structure::cats`])
    #[serde(default)]
    pub cat: Option<String>,
    /// Named states
    #[serde(default)]
    pub states: BTreeMap<String, StateDef>,
}

/// The controller configuration tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Structure {
    /// Rooms by UUID
    #[serde(default)]
    pub rooms: BTreeMap<String, Room>,
    /// Categories by UUID
    #[serde(default)]
    pub cats: BTreeMap<String, Category>,
    /// Controls by UUID
    #[serde(default)]
    pub controls: BTreeMap<String, Control>,
    /// Global state name to identifier
    #[serde(default, rename = "globalStates")]
    pub global_states: BTreeMap<String, String>,
}

impl Structure {
    /// Parse a structure file from its JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a structure file from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Load a structure file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    /// Total number of identifiers referenced by controls and global states
    pub fn identifier_count(&self) -> usize {
        let control_ids: usize = self
            .controls
            .values()
            .flat_map(|control| control.states.values())
            .map(|def| match def {
                StateDef::Scalar(_) => 1,
                StateDef::Indexed(uuids) => uuids.len(),
                StateDef::Unsupported(_) => 0,
            })
            .sum();
        control_ids + self.global_states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "lastModified": "2025-01-12 10:00:00",
        "msInfo": { "serialNr": "504F94A00000" },
        "rooms": { "r1": { "name": "Lounge", "uuid": "r1", "type": 0 } },
        "cats": { "c1": { "name": "Shading", "uuid": "c1" } },
        "controls": {
            "ctl1": {
                "name": "Blinds",
                "type": "Jalousie",
                "uuidAction": "ctl1",
                "room": "r1",
                "cat": "c1",
                "states": { "position": "u1", "motion": ["m0", "m1"] }
            }
        },
        "globalStates": { "operatingMode": "g1" }
    }"#;

    #[test]
    fn test_parse_structure() {
        let structure = Structure::from_json(SAMPLE).unwrap();
        assert_eq!(structure.rooms["r1"].name, "Lounge");
        assert_eq!(structure.cats["c1"].name, "Shading");

        let control = &structure.controls["ctl1"];
        assert_eq!(control.kind, "Jalousie");
        assert_eq!(control.room.as_deref(), Some("r1"));
        assert_eq!(
            control.states["position"],
            StateDef::Scalar("u1".to_string())
        );
        assert_eq!(
            control.states["motion"],
            StateDef::Indexed(vec!["m0".to_string(), "m1".to_string()])
        );
        assert_eq!(structure.global_states["operatingMode"], "g1");
    }

    #[test]
    fn test_identifier_count() {
        let structure = Structure::from_json(SAMPLE).unwrap();
        assert_eq!(structure.identifier_count(), 4);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let structure = Structure::from_json("{}").unwrap();
        assert!(structure.controls.is_empty());
        assert!(structure.global_states.is_empty());
    }

    #[test]
    fn test_unsupported_state_shape_is_kept() {
        let json = r#"{ "controls": { "c": {
            "name": "X", "type": "Switch",
            "states": { "active": 1.5, "nested": { "a": "b" }, "mixed": ["u1", 2] }
        } } }"#;
        let structure = Structure::from_json(json).unwrap();
        let states = &structure.controls["c"].states;
        assert!(matches!(states["active"], StateDef::Unsupported(_)));
        assert!(matches!(states["nested"], StateDef::Unsupported(_)));
        assert!(matches!(states["mixed"], StateDef::Unsupported(_)));
        assert_eq!(structure.identifier_count(), 0);
    }

    #[test]
    fn test_missing_name_and_type_default_to_empty() {
        let json = r#"{ "controls": { "c": { "states": { "active": "u1" } } } }"#;
        let structure = Structure::from_json(json).unwrap();
        let control = &structure.controls["c"];
        assert_eq!(control.name, "");
        assert_eq!(control.kind, "");
        assert_eq!(structure.identifier_count(), 1);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LoxAPP3.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let structure = Structure::from_file(&path).unwrap();
        assert_eq!(structure.controls.len(), 1);

        let missing = Structure::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
