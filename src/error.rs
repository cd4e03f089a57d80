//! Error types for Loxwatch
//!
//! This module defines the error types used by the core engine. Every
//! variant here is fatal at startup; runtime routing never fails.

use thiserror::Error;

/// Result type alias for Loxwatch operations
pub type Result<T> = std::result::Result<T, LoxwatchError>;

/// Main error type for Loxwatch operations
#[derive(Error, Debug)]
pub enum LoxwatchError {
    /// Structure could not be loaded or resolved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metric family could not be created or registered
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Errors raised while loading the structure file or building label sets
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Structure file is not valid JSON or does not match the expected shape
    #[error("Invalid structure file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Structure file could not be read
    #[error("Failed to read structure file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Control has no room reference
    #[error("Control '{control}' has no room")]
    MissingRoom { control: String },

    /// Control references a room that is not in the rooms table
    #[error("Control '{control}' references unknown room {room}")]
    UnknownRoom { control: String, room: String },

    /// Control has no category reference
    #[error("Control '{control}' has no category")]
    MissingCategory { control: String },

    /// Control references a category that is not in the categories table
    #[error("Control '{control}' references unknown category {cat}")]
    UnknownCategory { control: String, cat: String },

    /// Two state definitions share one identifier
    #[error("Identifier {uuid} is used by both {first} and {second}")]
    DuplicateIdentifier {
        uuid: String,
        first: String,
        second: String,
    },
}
