// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Persistence port
//!
//! Defines the trait for storage backends (SQLite, in-memory).

use crate::error::StoreError;
use crate::model::{DataPoint, TypeFilter};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Telemetry store trait
///
/// Backend-agnostic interface for inserting points and range-querying them.
/// Calls may block; async callers run them on the blocking pool.
///
/// # Implementations
///
/// - `SqliteStore` -- Default, persistent
/// - `MemoryStore` -- Tests and ephemeral deployments
pub trait TelemetryStore: Send + Sync {
    /// Persist one point
    fn insert(&self, point: &DataPoint) -> Result<(), StoreError>;

    /// Query points within an inclusive time range
    ///
    /// # Arguments
    ///
    /// - `filter` -- Type selection ([`TypeFilter::All`] for every type)
    /// - `start` -- Range start (inclusive)
    /// - `end` -- Range end (inclusive)
    ///
    /// Results are ordered by ascending timestamp.
    fn query_range(
        &self,
        filter: &TypeFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, StoreError>;

    /// Total number of stored points
    fn count(&self) -> Result<usize, StoreError>;
}

/// In-memory store
///
/// Keeps points in insertion order behind a mutex. Can be switched to an
/// unavailable state to simulate an unreachable database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    points: Mutex<Vec<DataPoint>>,
    inserts: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `points`
    pub fn with_points(points: impl IntoIterator<Item = DataPoint>) -> Self {
        Self {
            points: Mutex::new(points.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `insert` calls
    pub fn insert_count(&self) -> u64 {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Copy of every stored point, in insertion order
    pub fn points(&self) -> Vec<DataPoint> {
        self.points
            .lock()
            .map(|points| points.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<DataPoint>>, StoreError> {
        self.points
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl TelemetryStore for MemoryStore {
    fn insert(&self, point: &DataPoint) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock()?.push(point.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn query_range(
        &self,
        filter: &TypeFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, StoreError> {
        self.check_available()?;

        let mut matching: Vec<DataPoint> = self
            .lock()?
            .iter()
            .filter(|p| filter.matches(p) && p.timestamp >= start && p.timestamp <= end)
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.timestamp);

        Ok(matching)
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.check_available()?;
        Ok(self.lock()?.len())
    }
}
