// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming session
//!
//! One live subscriber's lifecycle:
//!
//! 1. **Connecting** -- register with the distributor (before the snapshot
//!    query, so nothing published in between is missed)
//! 2. **Snapshot** -- emit the trailing window as one `initial_data` envelope
//! 3. **Streaming** -- emit each live point as an `update_data` envelope
//! 4. **Closed** -- deregister, exactly once, whatever ended the session
//!
//! A point published while the snapshot is being read may show up in both
//! the snapshot and the live tail. Consumers de-duplicate by
//! timestamp + type if they need to.

use crate::distributor::{Distributor, Registration};
use crate::model::{DataPoint, TypeFilter};
use crate::query::HistoricalQuery;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Envelope kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// One-time batch from the trailing window
    InitialData,
    /// A single live point
    UpdateData,
}

/// Framed message emitted to a subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub payload: Vec<DataPoint>,
}

impl Envelope {
    /// Snapshot batch
    pub fn initial(points: Vec<DataPoint>) -> Self {
        Self {
            kind: EnvelopeKind::InitialData,
            payload: points,
        }
    }

    /// Incremental update carrying exactly one point
    pub fn update(point: DataPoint) -> Self {
        Self {
            kind: EnvelopeKind::UpdateData,
            payload: vec![point],
        }
    }
}

/// Why a session finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The subscriber's connection signalled a disconnect
    Cancelled,
    /// Writing to the subscriber failed
    SinkClosed,
    /// The distributor went away
    DistributorClosed,
}

/// A live subscriber session
pub struct StreamingSession {
    /// Session ID for logging
    id: String,
    filter: TypeFilter,
    registration: Registration,
    query: HistoricalQuery,
    window: Duration,
}

impl StreamingSession {
    /// Register with `distributor` and prepare the session.
    ///
    /// The registration is live as soon as this returns.
    pub fn connect(
        distributor: &Distributor,
        query: HistoricalQuery,
        filter: TypeFilter,
        window: Duration,
    ) -> Self {
        let id = Uuid::new_v4().to_string()[..8].to_string();
        let registration = distributor.register_filtered(filter.clone());
        info!(
            "[{}] Subscriber connected (type: {}, registration {})",
            id,
            filter,
            registration.id()
        );

        Self {
            id,
            filter,
            registration,
            query,
            window,
        }
    }

    /// Session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Requested type filter
    pub fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    /// Run until the subscriber goes away.
    ///
    /// The disconnect signal is the receiving half of `sink` being dropped.
    pub async fn run(self, sink: mpsc::Sender<Envelope>) -> SessionEnd {
        let watch = sink.clone();
        self.run_until(sink, async move { watch.closed().await })
            .await
    }

    /// Run until `cancelled` resolves or the session ends on its own.
    pub async fn run_until<F>(mut self, sink: mpsc::Sender<Envelope>, cancelled: F) -> SessionEnd
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancelled);

        let end = tokio::select! {
            _ = &mut cancelled => SessionEnd::Cancelled,
            end = self.stream(&sink) => end,
        };

        self.close();
        debug!("[{}] Session ended: {:?}", self.id, end);
        end
    }

    /// Snapshot, then live tail.
    async fn stream(&mut self, sink: &mpsc::Sender<Envelope>) -> SessionEnd {
        match self
            .query
            .trailing(&self.filter, self.window, Utc::now())
            .await
        {
            Ok(points) if !points.is_empty() => {
                debug!("[{}] Sending {} initial points", self.id, points.len());
                if sink.send(Envelope::initial(points)).await.is_err() {
                    return SessionEnd::SinkClosed;
                }
            }
            Ok(_) => {
                debug!("[{}] No initial data for type {}", self.id, self.filter);
            }
            Err(e) => {
                warn!("[{}] Initial data query failed: {}", self.id, e);
            }
        }

        loop {
            let Some(point) = self.registration.recv().await else {
                return SessionEnd::DistributorClosed;
            };

            if !self.filter.matches(&point) {
                continue;
            }

            if sink.send(Envelope::update((*point).clone())).await.is_err() {
                return SessionEnd::SinkClosed;
            }
        }
    }

    /// Release the registration. Idempotent.
    ///
    /// Returns `true` for the call that actually deregistered.
    pub fn close(&mut self) -> bool {
        let removed = self.registration.deregister();
        if removed {
            info!("[{}] Subscriber disconnected", self.id);
        }
        removed
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("registration", &self.registration)
            .field("window", &self.window)
            .finish()
    }
}
