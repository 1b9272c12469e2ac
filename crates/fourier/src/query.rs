// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Historical query service
//!
//! Bounded, type-filtered lookups used by the streaming snapshot and by
//! one-shot analytical requests. Store calls run on the blocking pool.

use crate::error::QueryError;
use crate::model::{DataPoint, TypeFilter};
use crate::store::TelemetryStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Historical query service, cheap to clone.
#[derive(Clone)]
pub struct HistoricalQuery {
    store: Arc<dyn TelemetryStore>,
}

impl HistoricalQuery {
    /// Create a query service over `store`
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Return every point matching `filter` within `[start, end]`.
    ///
    /// Results are ordered by ascending timestamp. `start > end` is rejected.
    pub async fn range(
        &self,
        filter: &TypeFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, QueryError> {
        if start > end {
            return Err(QueryError::InvalidRange { start, end });
        }

        let store = Arc::clone(&self.store);
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || store.query_range(&filter, start, end))
            .await
            .map_err(|e| QueryError::Task(e.to_string()))?
            .map_err(QueryError::from)
    }

    /// Return the trailing `window` ending at `now`.
    pub async fn trailing(
        &self,
        filter: &TypeFilter,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, QueryError> {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        let start = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        self.range(filter, start, now).await
    }
}

impl std::fmt::Debug for HistoricalQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalQuery").finish_non_exhaustive()
    }
}
