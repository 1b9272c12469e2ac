// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers.

use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use chrono::{DateTime, Utc};
use fourier::{DataPoint, QueryError, StreamingSession, TypeFilter};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Query parameters of `GET /events`
#[derive(Debug, Deserialize)]
pub struct EventsParams {
    #[serde(rename = "type")]
    data_type: Option<String>,
}

/// GET /events - live stream for one subscriber
pub async fn events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsParams>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let filter = TypeFilter::from_param(params.data_type.as_deref());
    let session = StreamingSession::connect(
        &state.distributor,
        state.query.clone(),
        filter,
        state.stream.snapshot_window(),
    );

    // The session ends when this receiver is dropped with the response body.
    let (tx, rx) = mpsc::channel(state.stream.subscriber_buffer);
    tokio::spawn(session.run(tx));

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let envelope = rx.recv().await?;
        Some((Event::default().json_data(&envelope), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.stream.keep_alive()))
}

/// Query parameters of `GET /historical`
#[derive(Debug, Deserialize)]
pub struct HistoricalParams {
    #[serde(rename = "type")]
    data_type: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// GET /historical - points of one type (or all) within `[start, end]`
pub async fn historical(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoricalParams>,
) -> Result<Json<Vec<DataPoint>>, ApiError> {
    let start = parse_time(params.start.as_deref())
        .ok_or_else(|| ApiError::bad_request("invalid 'start' parameter"))?;
    let end = parse_time(params.end.as_deref())
        .ok_or_else(|| ApiError::bad_request("invalid 'end' parameter"))?;
    let filter = TypeFilter::from_param(params.data_type.as_deref());

    match state.query.range(&filter, start, end).await {
        Ok(points) => Ok(Json(points)),
        Err(QueryError::InvalidRange { .. }) => Err(ApiError::bad_request("invalid time range")),
        Err(e) => {
            warn!("Historical query failed: {}", e);
            Err(ApiError::internal("can not fetch data"))
        }
    }
}

/// GET /health - ready once both ingress and egress are up
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    if state.readiness.is_ready() {
        (StatusCode::OK, "OK").into_response()
    } else {
        warn!("Health check NOT OK");
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
    }
}

/// GET /stats - distributor counters
pub async fn stats(State(state): State<Arc<AppState>>) -> Response {
    let stats = state.distributor.stats();

    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "subscribers": stats.subscribers,
        "delivered": stats.delivered,
        "dropped": stats.dropped,
    }))
    .into_response()
}
