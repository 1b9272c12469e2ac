// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite telemetry backend
//!
//! Persistent storage for data points, indexed for type + time range lookups.

use crate::error::StoreError;
use crate::model::{DataPoint, TypeFilter};
use crate::store::TelemetryStore;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite telemetry store
///
/// Thread-safe via internal Mutex (SQLite Connection is not Sync).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE points (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     timestamp_ns INTEGER NOT NULL,
///     value REAL NOT NULL,
///     type TEXT NOT NULL
/// );
/// CREATE INDEX idx_points_type_ts ON points(type, timestamp_ns);
/// CREATE INDEX idx_points_ts ON points(timestamp_ns);
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a file-based database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp_ns INTEGER NOT NULL,
                value REAL NOT NULL,
                type TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_points_type_ts ON points(type, timestamp_ns)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_points_ts ON points(timestamp_ns)",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("SQLite connection lock poisoned".into()))
    }

    fn row_to_point(row: &rusqlite::Row) -> rusqlite::Result<DataPoint> {
        let timestamp_ns: i64 = row.get(0)?;

        Ok(DataPoint {
            timestamp: Utc.timestamp_nanos(timestamp_ns),
            value: row.get(1)?,
            data_type: row.get(2)?,
        })
    }
}

/// Range bound in Unix nanoseconds, saturated to the representable span.
fn bound_ns(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt()
        .unwrap_or(if t.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

impl TelemetryStore for SqliteStore {
    fn insert(&self, point: &DataPoint) -> Result<(), StoreError> {
        let timestamp_ns = point
            .timestamp
            .timestamp_nanos_opt()
            .ok_or(StoreError::TimestampOutOfRange(point.timestamp))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO points (timestamp_ns, value, type) VALUES (?1, ?2, ?3)",
            params![timestamp_ns, point.value, point.data_type],
        )?;

        Ok(())
    }

    fn query_range(
        &self,
        filter: &TypeFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, StoreError> {
        let start_ns = bound_ns(start);
        let end_ns = bound_ns(end);
        let conn = self.conn()?;

        let points = match filter.as_type() {
            Some(data_type) => {
                let mut stmt = conn.prepare(
                    "SELECT timestamp_ns, value, type
                     FROM points
                     WHERE type = ?3 AND timestamp_ns BETWEEN ?1 AND ?2
                     ORDER BY timestamp_ns ASC, id ASC",
                )?;
                let rows = stmt.query_map(params![start_ns, end_ns, data_type], Self::row_to_point)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT timestamp_ns, value, type
                     FROM points
                     WHERE timestamp_ns BETWEEN ?1 AND ?2
                     ORDER BY timestamp_ns ASC, id ASC",
                )?;
                let rows = stmt.query_map(params![start_ns, end_ns], Self::row_to_point)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(points)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM points", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_and_query() {
        let store = SqliteStore::new_in_memory().unwrap();
        for (i, data_type) in ["Temperature", "PowerInput", "Temperature"].iter().enumerate() {
            let ts = base() + Duration::seconds(i as i64);
            store
                .insert(&DataPoint::new(ts, i as f64, *data_type))
                .unwrap();
        }

        let all = store
            .query_range(&TypeFilter::All, base(), base() + Duration::seconds(10))
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].timestamp, base());
        assert_eq!(all[1].data_type, "PowerInput");

        let temps = store
            .query_range(
                &TypeFilter::parse("Temperature"),
                base(),
                base() + Duration::seconds(10),
            )
            .unwrap();
        assert_eq!(temps.len(), 2);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_inclusive_bounds() {
        let store = SqliteStore::new_in_memory().unwrap();
        let point = DataPoint::new(base(), 42.5, "Temperature");
        store.insert(&point).unwrap();

        let exact = store
            .query_range(&TypeFilter::parse("Temperature"), base(), base())
            .unwrap();
        assert_eq!(exact, vec![point]);

        let after = store
            .query_range(
                &TypeFilter::All,
                base() + Duration::nanoseconds(1),
                base() + Duration::seconds(1),
            )
            .unwrap();
        assert!(after.is_empty());
    }

    #[test]
    fn test_sub_second_precision_survives() {
        let store = SqliteStore::new_in_memory().unwrap();
        let ts = base() + Duration::nanoseconds(123_456_789);
        store.insert(&DataPoint::new(ts, 1.0, "Efficiency")).unwrap();

        let points = store
            .query_range(&TypeFilter::All, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
            .unwrap();
        assert_eq!(points[0].timestamp, ts);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fourier.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert(&DataPoint::new(base(), 7.0, "WaterFlowRate"))
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_open_invalid_path_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("nested").join("fourier.db");

        assert!(matches!(
            SqliteStore::open(&path),
            Err(StoreError::Unavailable(_))
        ));
    }
}
