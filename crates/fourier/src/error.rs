// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the telemetry engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A published payload that could not be turned into a [`crate::DataPoint`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid data point JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data point type {0:?}")]
    InvalidType(String),
}

/// Persistence port failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("timestamp {0} cannot be stored")]
    TimestampOutOfRange(DateTime<Utc>),
}

/// Historical query failures.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("query task failed: {0}")]
    Task(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
