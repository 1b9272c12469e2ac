// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service configuration.
//!
//! Supports both programmatic and file-based configuration.
//!
//! ```toml
//! log_level = "info"
//!
//! [http]
//! bind = "0.0.0.0:8080"
//!
//! [broker]
//! host = "localhost"
//! port = 1883
//! topic = "telemetry"
//!
//! [store]
//! backend = "sqlite"
//! path = "fourier.db"
//!
//! [stream]
//! snapshot_window_secs = 3600
//! subscriber_buffer = 64
//! ```

use crate::error::ConfigError;
use crate::TELEMETRY_TOPIC;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (overridden by `RUST_LOG`).
    pub log_level: String,

    pub http: HttpConfig,
    pub broker: BrokerConfig,
    pub store: StoreConfig,
    pub stream: StreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http: HttpConfig::default(),
            broker: BrokerConfig::default(),
            store: StoreConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

/// HTTP egress listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// MQTT broker connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Topic carrying telemetry points
    pub topic: String,
    pub keep_alive_secs: u64,
    /// Delay before reconnecting after a connection error
    pub reconnect_delay_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "fourier-backend".to_string(),
            topic: TELEMETRY_TOPIC.to_string(),
            keep_alive_secs: 30,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Persistence store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database path
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("fourier.db"),
        }
    }
}

/// Live streaming sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Trailing window sent as the initial snapshot (seconds)
    pub snapshot_window_secs: u64,
    /// Capacity of each subscriber sink
    pub subscriber_buffer: usize,
    /// Keep-alive comment interval (seconds)
    pub keep_alive_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            snapshot_window_secs: 3600,
            subscriber_buffer: 64,
            keep_alive_secs: 15,
        }
    }
}

impl StreamConfig {
    pub fn snapshot_window(&self) -> Duration {
        Duration::from_secs(self.snapshot_window_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Log level, `info` when unset.
    pub fn log_level(&self) -> &str {
        if self.log_level.is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.topic.is_empty() {
            return Err(ConfigError::Invalid("broker.topic must not be empty".into()));
        }
        if self.broker.host.is_empty() {
            return Err(ConfigError::Invalid("broker.host must not be empty".into()));
        }
        if self.stream.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid(
                "stream.subscriber_buffer must be at least 1".into(),
            ));
        }
        if self.stream.snapshot_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "stream.snapshot_window_secs must be at least 1".into(),
            ));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "store.path is required for the sqlite backend".into(),
            ));
        }
        Ok(())
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set HTTP bind address
    pub fn http_bind(mut self, bind: impl Into<String>) -> Self {
        self.config.http.bind = bind.into();
        self
    }

    /// Set broker host and port
    pub fn broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.broker.host = host.into();
        self.config.broker.port = port;
        self
    }

    /// Set telemetry topic
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.config.broker.topic = topic.into();
        self
    }

    /// Use the SQLite backend at `path`
    pub fn sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store.backend = StoreBackend::Sqlite;
        self.config.store.path = path.into();
        self
    }

    /// Use the in-memory backend
    pub fn memory_store(mut self) -> Self {
        self.config.store.backend = StoreBackend::Memory;
        self
    }

    /// Set snapshot window in seconds
    pub fn snapshot_window_secs(mut self, secs: u64) -> Self {
        self.config.stream.snapshot_window_secs = secs;
        self
    }

    /// Set per-subscriber sink capacity
    pub fn subscriber_buffer(mut self, capacity: usize) -> Self {
        self.config.stream.subscriber_buffer = capacity;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}
