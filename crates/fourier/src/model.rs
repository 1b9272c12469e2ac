// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry data model.
//!
//! A single canonical schema is shared by the broker payload, the stored
//! record and the streamed payload:
//!
//! ```json
//! {"timestamp": "2024-01-01T00:00:00Z", "value": 42.5, "type": "Temperature"}
//! ```

use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type tag meaning "all types" in queries and subscriptions.
pub const TYPE_WILDCARD: &str = "*";

/// One timestamped telemetry reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Creation time (UTC), serialized as RFC3339
    pub timestamp: DateTime<Utc>,

    /// Numeric reading
    pub value: f64,

    /// Signal kind, e.g. `Temperature`
    #[serde(rename = "type")]
    pub data_type: String,
}

impl DataPoint {
    /// Create a point with an explicit timestamp.
    pub fn new(timestamp: DateTime<Utc>, value: f64, data_type: impl Into<String>) -> Self {
        Self {
            timestamp,
            value,
            data_type: data_type.into(),
        }
    }

    /// Create a point stamped with the current UTC time.
    pub fn now(value: f64, data_type: impl Into<String>) -> Self {
        Self::new(Utc::now(), value, data_type)
    }

    /// Decode a broker payload.
    ///
    /// The wildcard and the empty string are query filters, not point
    /// types, and are rejected.
    pub fn from_json(payload: &[u8]) -> Result<Self, DecodeError> {
        let point: DataPoint = serde_json::from_slice(payload)?;
        if point.data_type.is_empty() || point.data_type == TYPE_WILDCARD {
            return Err(DecodeError::InvalidType(point.data_type));
        }
        Ok(point)
    }

    /// Encode as the canonical JSON record.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Type selection for subscriptions and queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    /// Every type (`*` or empty)
    #[default]
    All,
    /// Exactly one type tag
    Only(String),
}

impl TypeFilter {
    /// Parse a `type` request parameter. Empty and `*` select everything.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == TYPE_WILDCARD {
            Self::All
        } else {
            Self::Only(raw.to_string())
        }
    }

    /// Parse an optional parameter; absent selects everything.
    pub fn from_param(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    /// Check whether a point passes the filter.
    #[inline]
    pub fn matches(&self, point: &DataPoint) -> bool {
        match self {
            Self::All => true,
            Self::Only(t) => *t == point.data_type,
        }
    }

    /// Concrete type tag, `None` for [`TypeFilter::All`].
    pub fn as_type(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(t) => Some(t),
        }
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str(TYPE_WILDCARD),
            Self::Only(t) => f.write_str(t),
        }
    }
}
