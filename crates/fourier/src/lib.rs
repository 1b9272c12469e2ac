// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fourier Telemetry Engine
//!
//! Bridges an MQTT telemetry feed with live observers and analytical clients.
//!
//! # Features
//!
//! - **Ingestion Hook** -- Decodes published messages into [`DataPoint`]s
//! - **Distributor** -- Non-blocking fan-out with a drop-on-full policy
//! - **Streaming Sessions** -- Snapshot of the trailing window, then a live tail
//! - **Historical Queries** -- Inclusive, type-filtered time range lookups
//! - **Storage Backends** -- SQLite (persistent) and in-memory
//!
//! # Architecture
//!
//! ```text
//! broker --> IngestHook --+--> Distributor --> StreamingSession (one per subscriber)
//!                         |
//!                         +--> TelemetryStore (spawned, fire-and-forget)
//!
//! StreamingSession --> HistoricalQuery (snapshot, once at connect)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fourier::{Distributor, HistoricalQuery, IngestHook, MemoryStore, StreamingSession};
//!
//! let store = Arc::new(MemoryStore::new());
//! let distributor = Distributor::new(64);
//! let hook = IngestHook::new("telemetry", distributor.clone(), store.clone(), Handle::current());
//!
//! let (tx, rx) = mpsc::channel(64);
//! let session = StreamingSession::connect(
//!     &distributor,
//!     HistoricalQuery::new(store),
//!     TypeFilter::parse("Temperature"),
//!     Duration::from_secs(3600),
//! );
//! tokio::spawn(session.run(tx));
//! ```

pub mod config;
pub mod distributor;
pub mod error;
pub mod health;
pub mod ingest;
pub mod model;
pub mod query;
pub mod session;
pub mod sqlite;
pub mod store;

pub use config::{BrokerConfig, Config, HttpConfig, StoreBackend, StoreConfig, StreamConfig};
pub use distributor::{Distributor, DistributorStats, Registration};
pub use error::{ConfigError, DecodeError, QueryError, StoreError};
pub use health::Readiness;
pub use ingest::{IngestHook, PublishHandler, PublishOutcome};
pub use model::{DataPoint, TypeFilter, TYPE_WILDCARD};
pub use query::HistoricalQuery;
pub use session::{Envelope, EnvelopeKind, SessionEnd, StreamingSession};
pub use sqlite::SqliteStore;
pub use store::{MemoryStore, TelemetryStore};

/// Default MQTT topic carrying telemetry points.
pub const TELEMETRY_TOPIC: &str = "telemetry";
