// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fourier backend - live telemetry over Server-Sent Events.
//!
//! Subscribes to the telemetry topic of an MQTT broker, fans every point out
//! to connected SSE clients and persists it for historical queries.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: HTTP on :8080, broker on localhost:1883, SQLite at fourier.db
//! fourier-server
//!
//! # Config file plus overrides
//! fourier-server --config fourier.toml --broker-host mqtt --bind 0.0.0.0:9000
//!
//! # Ephemeral storage
//! fourier-server --memory-store
//! ```
//!
//! # Endpoints
//!
//! - `GET /events?type=<T>` - live stream (`initial_data`, then `update_data`)
//! - `GET /historical?type=<T>&start=<RFC3339>&end=<RFC3339>` - range query
//! - `GET /health` - liveness (ingress and egress both up)
//! - `GET /stats` - distributor counters

mod broker;
mod handlers;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use fourier::{
    Config, ConfigError, Distributor, HistoricalQuery, IngestHook, MemoryStore, Readiness,
    SqliteStore, StoreBackend, StoreConfig, StreamConfig, TelemetryStore,
};
use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fourier telemetry backend
#[derive(Parser, Debug)]
#[command(name = "fourier-server")]
#[command(about = "Fourier backend - MQTT telemetry to live SSE and historical queries")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// MQTT broker host
    #[arg(long)]
    broker_host: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    broker_port: Option<u16>,

    /// SQLite database path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep points in memory instead of SQLite
    #[arg(long)]
    memory_store: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// File values first, then command-line overrides.
    fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(bind) = self.bind {
            config.http.bind = bind;
        }
        if let Some(host) = self.broker_host {
            config.broker.host = host;
        }
        if let Some(port) = self.broker_port {
            config.broker.port = port;
        }
        if let Some(db) = self.db {
            config.store.backend = StoreBackend::Sqlite;
            config.store.path = db;
        }
        if self.memory_store {
            config.store.backend = StoreBackend::Memory;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Shared application state
pub struct AppState {
    distributor: Distributor,
    query: HistoricalQuery,
    readiness: Readiness,
    stream: StreamConfig,
}

impl AppState {
    fn new(
        distributor: Distributor,
        store: Arc<dyn TelemetryStore>,
        readiness: Readiness,
        stream: StreamConfig,
    ) -> Self {
        Self {
            distributor,
            query: HistoricalQuery::new(store),
            readiness,
            stream,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    // Setup logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Fourier backend v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config.store)?;
    let distributor = Distributor::new(config.stream.subscriber_buffer);
    let readiness = Readiness::new();

    let hook = Arc::new(IngestHook::new(
        config.broker.topic.clone(),
        distributor.clone(),
        Arc::clone(&store),
        Handle::current(),
    ));
    let ingress = broker::Ingress::connect(&config.broker, hook, readiness.clone()).await?;

    let state = Arc::new(AppState::new(
        distributor,
        store,
        readiness.clone(),
        config.stream.clone(),
    ));
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http.bind)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", config.http.bind))?;
    readiness.set_egress(true);
    info!("HTTP server: http://{}", config.http.bind);
    info!("Event stream: http://{}/events", config.http.bind);

    tokio::select! {
        result = ingress.run() => result.context("MQTT ingress stopped")?,
        result = axum::serve(listener, app).into_future() => result.context("HTTP server stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}

/// Open the configured backend. Failure aborts startup.
fn open_store(config: &StoreConfig) -> Result<Arc<dyn TelemetryStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.path)
                .with_context(|| format!("Failed to open store at {}", config.path.display()))?;
            info!("Store: SQLite ({})", config.path.display());
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Store: in-memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::parse_from([
            "fourier-server",
            "--bind",
            "127.0.0.1:9000",
            "--broker-host",
            "mqtt",
            "--broker-port",
            "1884",
            "--memory-store",
        ]);
        let config = args.into_config().unwrap();

        assert_eq!(config.http.bind, "127.0.0.1:9000");
        assert_eq!(config.broker.host, "mqtt");
        assert_eq!(config.broker.port, 1884);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.broker.topic, "telemetry");
    }

    #[test]
    fn test_cli_db_selects_sqlite() {
        let args = Args::parse_from(["fourier-server", "--db", "/var/lib/fourier/points.db"]);
        let config = args.into_config().unwrap();

        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("/var/lib/fourier/points.db"));
    }

    #[test]
    fn test_missing_config_file_fails() {
        let args = Args::parse_from(["fourier-server", "--config", "/nonexistent/fourier.toml"]);
        assert!(matches!(args.into_config(), Err(ConfigError::Io(_))));
    }
}
