// Loxwatch Client - Miniserver websocket client
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! # Loxwatch Client - Miniserver websocket client
//!
//! Talks to a Loxone Miniserver over its websocket API and produces the
//! inputs the Loxwatch engine consumes: the [`Structure`](loxwatch::Structure)
//! and a channel of value [`Event`](loxwatch::Event)s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loxwatch_client::{ClientConfig, MiniserverClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> loxwatch_client::Result<()> {
//! let config = ClientConfig::new("192.168.1.77", "admin", "secret");
//! let mut client = MiniserverClient::connect(config).await?;
//!
//! let structure = client.get_config().await?;
//! println!("{} controls", structure.controls.len());
//!
//! let mut events = client.register_events(CancellationToken::new()).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Session lifecycle
//!
//! ```text
//! connect ──► getkey ──► authenticate ──► LoxAPP3.json ──► enablebinstatusupdate
//!                                                                  │
//!                                          ┌───────────────────────┴──────┐
//!                                          ▼                              ▼
//!                                   reader task                    keepalive task
//!                              (value events → channel)          ("keepalive" / 60 s)
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

pub use client::{Frame, MiniserverClient};
pub use config::ClientConfig;
pub use error::{ClientError, ProtocolError, Result};
pub use protocol::{format_uuid, parse_value_events, LlResponse, MessageHeader, MessageType};
