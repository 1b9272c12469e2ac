// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Live point distributor
//!
//! Owns the set of active subscribers and fans every ingested point out to
//! them.
//!
//! # Delivery policy
//!
//! Each subscriber has a bounded sink. `broadcast` uses `try_send` on every
//! sink: a full sink means the subscriber is not ready, and the point is
//! skipped for that subscriber only. `broadcast` never waits and never
//! fails, so one wedged subscriber cannot slow ingestion or its peers.
//!
//! Registration, removal and broadcast all run under one mutex, so a
//! broadcast never observes a half-added or half-removed entry.

use crate::model::{DataPoint, TypeFilter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Fan-out distributor, cheap to clone.
#[derive(Clone)]
pub struct Distributor {
    inner: Arc<Inner>,
}

struct Inner {
    /// Active subscribers: registration id -> sink
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
    /// Capacity of each subscriber sink
    capacity: usize,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

struct Subscriber {
    filter: TypeFilter,
    sender: mpsc::Sender<Arc<DataPoint>>,
}

/// Distributor statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DistributorStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Points handed to a subscriber sink
    pub delivered: u64,
    /// Points skipped because a subscriber sink was full
    pub dropped: u64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Subscriber>> {
        // Entries are plain values; a panicked holder cannot leave one half-written.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscriber {} deregistered", id);
        }
        removed
    }
}

impl Distributor {
    /// Create a distributor whose subscriber sinks hold `capacity` points.
    ///
    /// A capacity of zero is raised to one (the smallest bounded sink).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a subscriber for every point type.
    pub fn register(&self) -> Registration {
        self.register_filtered(TypeFilter::All)
    }

    /// Register a subscriber that only receives points matching `filter`.
    pub fn register_filtered(&self, filter: TypeFilter) -> Registration {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .lock()
            .insert(id, Subscriber { filter, sender });
        tracing::debug!("Subscriber {} registered", id);

        Registration {
            id,
            receiver,
            distributor: Arc::downgrade(&self.inner),
            registered: true,
        }
    }

    /// Remove a registration. A second call is a no-op.
    ///
    /// Returns `true` if this call removed the entry.
    pub fn deregister(&self, registration: &mut Registration) -> bool {
        registration.deregister()
    }

    /// Hand `point` to every matching subscriber whose sink has room.
    pub fn broadcast(&self, point: &Arc<DataPoint>) {
        let subscribers = self.inner.lock();

        for (id, subscriber) in subscribers.iter() {
            if !subscriber.filter.matches(point) {
                continue;
            }

            match subscriber.sender.try_send(Arc::clone(point)) {
                Ok(()) => {
                    self.inner.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_)) => {
                    self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Skipping subscriber {} (sink full)", id);
                }
                Err(TrySendError::Closed(_)) => {
                    // Receiver released; the registration is about to be removed.
                    tracing::trace!("Skipping subscriber {} (sink closed)", id);
                }
            }
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Get distributor statistics
    pub fn stats(&self) -> DistributorStats {
        DistributorStats {
            subscribers: self.subscriber_count(),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Distributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distributor")
            .field("capacity", &self.inner.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Handle to one subscriber's membership and delivery endpoint.
///
/// Dropping the handle deregisters it.
pub struct Registration {
    id: u64,
    receiver: mpsc::Receiver<Arc<DataPoint>>,
    distributor: Weak<Inner>,
    registered: bool,
}

impl Registration {
    /// Registration id
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the entry is still in the subscriber set.
    #[inline]
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Wait for the next broadcast point.
    ///
    /// Returns `None` once deregistered and drained.
    pub async fn recv(&mut self) -> Option<Arc<DataPoint>> {
        self.receiver.recv().await
    }

    /// Take a buffered point without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<DataPoint>> {
        self.receiver.try_recv().ok()
    }

    /// Leave the subscriber set and close the delivery endpoint.
    ///
    /// Idempotent; returns `true` only for the call that removed the entry.
    pub fn deregister(&mut self) -> bool {
        if !self.registered {
            return false;
        }
        self.registered = false;
        self.receiver.close();

        match self.distributor.upgrade() {
            Some(inner) => inner.remove(self.id),
            None => false,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("registered", &self.registered)
            .finish()
    }
}
