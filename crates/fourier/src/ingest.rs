// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion hook
//!
//! Turns published broker messages into data points.
//!
//! # Operation
//!
//! 1. Ignore topics other than the telemetry topic
//! 2. Decode the payload (failures are logged and dropped)
//! 3. Broadcast to live subscribers (synchronous, never blocks)
//! 4. Spawn the store insert on the blocking pool (fire-and-forget)

use crate::distributor::Distributor;
use crate::model::DataPoint;
use crate::store::TelemetryStore;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// What the hook did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Not the telemetry topic; passed through untouched
    Ignored,
    /// Telemetry topic, but the payload did not decode
    Rejected,
    /// Broadcast and handed to the store
    Dispatched,
}

/// Capability a broker integration needs: hand over each published message.
///
/// Implementations must not block and must not fail; the broker may deliver
/// the next message as soon as this returns.
pub trait PublishHandler: Send + Sync {
    fn on_publish(&self, topic: &str, payload: &[u8]) -> PublishOutcome;
}

/// Ingestion hook wiring the broker to the distributor and the store
pub struct IngestHook {
    topic: String,
    distributor: Distributor,
    store: Arc<dyn TelemetryStore>,
    runtime: Handle,
}

impl IngestHook {
    /// Create a hook for `topic`.
    ///
    /// Store inserts are spawned on `runtime`'s blocking pool.
    pub fn new(
        topic: impl Into<String>,
        distributor: Distributor,
        store: Arc<dyn TelemetryStore>,
        runtime: Handle,
    ) -> Self {
        Self {
            topic: topic.into(),
            distributor,
            store,
            runtime,
        }
    }

    /// Telemetry topic this hook consumes
    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn persist(&self, point: Arc<DataPoint>) {
        let store = Arc::clone(&self.store);

        // Detached: nothing waits on the insert and failures are only logged.
        self.runtime.spawn_blocking(move || match store.insert(&point) {
            Ok(()) => trace!("Inserted {:?} data point", point.data_type),
            Err(e) => warn!("Failed to insert {:?} data point: {}", point.data_type, e),
        });
    }
}

impl PublishHandler for IngestHook {
    fn on_publish(&self, topic: &str, payload: &[u8]) -> PublishOutcome {
        if topic != self.topic {
            return PublishOutcome::Ignored;
        }

        let point = match DataPoint::from_json(payload) {
            Ok(point) => Arc::new(point),
            Err(e) => {
                warn!("Dropping telemetry message: {}", e);
                return PublishOutcome::Rejected;
            }
        };
        debug!("Received {} = {}", point.data_type, point.value);

        self.distributor.broadcast(&point);
        self.persist(point);

        PublishOutcome::Dispatched
    }
}

impl std::fmt::Debug for IngestHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestHook")
            .field("topic", &self.topic)
            .field("distributor", &self.distributor)
            .finish_non_exhaustive()
    }
}
