// Loxwatch Exporter - Prometheus exporter for Loxone state changes
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Startup and run failures of the exporter binary

use std::net::SocketAddr;

use loxwatch::LoxwatchError;
use loxwatch_client::ClientError;
use thiserror::Error;

/// Every variant ends the process with a non-zero exit status
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Connecting, authenticating or talking to the Miniserver failed
    #[error("Miniserver error: {0}")]
    Client(#[from] ClientError),

    /// Label building or metric registration failed
    #[error("Engine error: {0}")]
    Engine(#[from] LoxwatchError),

    /// The metrics listener could not be bound
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The Miniserver closed the event stream
    #[error("Event stream closed by the Miniserver")]
    StreamClosed,
}

impl From<prometheus::Error> for ExporterError {
    fn from(err: prometheus::Error) -> Self {
        ExporterError::Engine(LoxwatchError::Metrics(err))
    }
}
