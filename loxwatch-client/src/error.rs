// Loxwatch Client - Miniserver websocket client
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Error types for the Miniserver client

use std::time::Duration;

use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Websocket transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// No response within the configured timeout
    #[error("No response to '{command}' within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Connection closed by the Miniserver
    #[error("Connection closed by Miniserver")]
    Closed,

    /// Message that does not follow the Miniserver framing
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Authentication rejected or key exchange failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Command answered with a non-success code
    #[error("Command '{command}' failed with code {code}")]
    Command { command: String, code: u16 },

    /// Structure file could not be parsed
    #[error("Structure error: {0}")]
    Structure(#[from] loxwatch::ConfigError),
}

/// Errors while decoding Miniserver messages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// Header does not start with the 0x03 marker or has the wrong size
    #[error("Invalid message header")]
    InvalidHeader,

    /// Unknown message identifier in a header
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    /// Event table length is not a multiple of the record size
    #[error("Event table of {len} bytes is not a multiple of {record}")]
    TruncatedTable { len: usize, record: usize },

    /// Text response that is not an `LL` object
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
