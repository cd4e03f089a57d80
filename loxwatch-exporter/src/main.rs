// Loxwatch Exporter - Prometheus exporter for Loxone state changes
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! # Loxwatch Exporter
//!
//! Connects to a Loxone Miniserver, maps every state identifier of its
//! structure file to a label set and exports value and change metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Export on the default port 8080
//! loxwatch-exporter --host 192.168.1.77 --user admin --password secret
//!
//! # Longer debounce window, tolerate shared identifiers
//! loxwatch-exporter --host miniserver --user admin --password secret \
//!     --debounce-ms 2000 --duplicate-states overwrite
//! ```

mod error;
mod metrics;
mod server;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use error::ExporterError;
use loxwatch::{
    DispatchExit, DispatchStats, Dispatcher, DuplicatePolicy, EngineConfig, LoxoneMetrics,
    StateRegistry,
};
use loxwatch_client::{ClientConfig, MiniserverClient};
use server::AppState;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Loxone Prometheus Exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Loxone host name
    #[arg(long)]
    host: String,

    /// Loxone user name
    #[arg(long)]
    user: String,

    /// Loxone password
    #[arg(long)]
    password: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet window in milliseconds before a change is counted
    #[arg(long, default_value = "500")]
    debounce_ms: u64,

    /// What to do when two states share an identifier
    #[arg(long, value_enum, default_value = "reject")]
    duplicate_states: DuplicateStates,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DuplicateStates {
    /// Refuse to start
    Reject,
    /// Keep the last definition and log a warning
    Overwrite,
}

impl From<DuplicateStates> for DuplicatePolicy {
    fn from(value: DuplicateStates) -> Self {
        match value {
            DuplicateStates::Reject => DuplicatePolicy::Reject,
            DuplicateStates::Overwrite => DuplicatePolicy::Overwrite,
        }
    }
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.host.clone(), self.user.clone(), self.password.clone())
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            debounce_window: Duration::from_millis(self.debounce_ms),
            duplicate_policy: self.duplicate_states.into(),
        }
    }
}

fn log_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::from_default_env().add_directive(log_level(&args.log_level).into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Loxwatch Exporter v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ExporterError> {
    let registry = prometheus::default_registry().clone();
    let metrics = LoxoneMetrics::registered(&registry)?;

    let shutdown = CancellationToken::new();
    spawn_signal_handlers(shutdown.clone());

    let state = Arc::new(AppState::new(registry, Arc::new(DispatchStats::default())));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ExporterError::Bind { addr, source })?;
    info!("Metrics endpoint: http://{}/metrics", addr);

    let server = tokio::spawn(server::serve(
        listener,
        Arc::clone(&state),
        shutdown.clone(),
    ));

    let result = tokio::select! {
        biased;

        result = stream_events(&args, metrics, &state, shutdown.clone()) => result,
        _ = shutdown.cancelled() => {
            info!("Shutdown requested during startup");
            Ok(())
        }
    };

    // Stops the HTTP server and the client session tasks
    shutdown.cancel();
    let served = match server.await {
        Ok(served) => served,
        Err(e) => {
            warn!(error = %e, "HTTP server task failed");
            Ok(())
        }
    };

    result.and(served)
}

/// Connect, build the registry and route events until shutdown or
/// until the Miniserver closes the stream.
async fn stream_events(
    args: &Args,
    metrics: LoxoneMetrics,
    state: &AppState,
    shutdown: CancellationToken,
) -> Result<(), ExporterError> {
    let mut client = MiniserverClient::connect(args.client_config()).await?;

    let structure = client.get_config().await?;
    info!("Get Config OK");

    // Built completely here, then moved into the dispatcher, which is its
    // only user afterwards
    let registry = StateRegistry::build(&structure, &metrics, &args.engine_config())?;
    state.set_registered_states(registry.len());

    let events = client.register_events(shutdown.child_token()).await?;
    info!("RegisterEvents OK");

    let exit = Dispatcher::with_stats(registry, state.stats())
        .run(events, shutdown)
        .await;
    exit_result(exit)
}

/// Only a requested shutdown is a clean exit
fn exit_result(exit: DispatchExit) -> Result<(), ExporterError> {
    match exit {
        DispatchExit::Cancelled => Ok(()),
        DispatchExit::StreamClosed => Err(ExporterError::StreamClosed),
    }
}

fn spawn_signal_handlers(shutdown: CancellationToken) {
    let sigint = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), shutting down");
                sigint.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGINT"),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
        }
    });
}
