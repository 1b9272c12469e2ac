// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions.

use crate::handlers;
use crate::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// API routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(handlers::events))
        .route("/historical", get(handlers::historical))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
}

/// Full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    // Dashboards are served from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use fourier::{
        DataPoint, Distributor, Envelope, EnvelopeKind, MemoryStore, Readiness, StreamConfig,
        TelemetryStore,
    };
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::time::timeout;

    struct TestServer {
        addr: SocketAddr,
        distributor: Distributor,
        readiness: Readiness,
        store: Arc<MemoryStore>,
    }

    impl TestServer {
        async fn start(store: MemoryStore) -> Self {
            let store = Arc::new(store);
            let distributor = Distributor::new(16);
            let readiness = Readiness::new();
            let stream = StreamConfig {
                keep_alive_secs: 1,
                ..StreamConfig::default()
            };

            let state = Arc::new(AppState::new(
                distributor.clone(),
                Arc::clone(&store) as Arc<dyn TelemetryStore>,
                readiness.clone(),
                stream,
            ));
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                addr,
                distributor,
                readiness,
                store,
            }
        }

        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }
    }

    /// Read SSE chunks until one complete `data:` event is buffered.
    async fn next_envelope(response: &mut reqwest::Response, buffer: &mut String) -> Envelope {
        loop {
            if let Some(end) = buffer.find("\n\n") {
                let frame: String = buffer.drain(..end + 2).collect();
                let data: String = frame
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();
                if data.is_empty() {
                    // keep-alive comment
                    continue;
                }
                return serde_json::from_str(&data).unwrap();
            }

            let chunk = timeout(Duration::from_secs(5), response.chunk())
                .await
                .expect("event in time")
                .unwrap()
                .expect("stream open");
            buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    #[tokio::test]
    async fn test_health_requires_ingress_and_egress() {
        let server = TestServer::start(MemoryStore::new()).await;

        let response = reqwest::get(server.url("/health")).await.unwrap();
        assert_eq!(response.status(), 503);
        assert_eq!(response.text().await.unwrap(), "Service Unavailable");

        server.readiness.set_ingress(true);
        server.readiness.set_egress(true);

        let response = reqwest::get(server.url("/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_historical_inclusive_range() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = t0 + ChronoDuration::minutes(1);
        let t2 = t0 + ChronoDuration::minutes(2);
        let store = MemoryStore::with_points([
            DataPoint::new(t0, 1.0, "Temperature"),
            DataPoint::new(t1, 2.0, "Temperature"),
            DataPoint::new(t1, 9.0, "Vibration"),
            DataPoint::new(t2, 3.0, "Temperature"),
        ]);
        let server = TestServer::start(store).await;

        let response = reqwest::get(server.url(
            "/historical?type=Temperature&start=2024-01-01T00:00:00Z&end=2024-01-01T00:01:00Z",
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 200);

        let points: Vec<DataPoint> = response.json().await.unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_historical_without_type_returns_all() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let store = MemoryStore::with_points([
            DataPoint::new(t0, 1.0, "Temperature"),
            DataPoint::new(t0, 2.0, "PowerInput"),
        ]);
        let server = TestServer::start(store).await;

        let points: Vec<DataPoint> = reqwest::get(
            server.url("/historical?start=2024-01-01T00:00:00Z&end=2024-01-01T00:00:00Z"),
        )
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(points.len(), 2);
    }

    #[tokio::test]
    async fn test_historical_empty_range_is_empty_array() {
        let server = TestServer::start(MemoryStore::new()).await;

        let response = reqwest::get(
            server.url("/historical?start=2024-01-01T00:00:00Z&end=2024-01-02T00:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_historical_rejects_bad_parameters() {
        let server = TestServer::start(MemoryStore::new()).await;

        let cases = [
            ("/historical?end=2024-01-01T00:00:00Z", "invalid 'start' parameter"),
            ("/historical?start=yesterday&end=2024-01-01T00:00:00Z", "invalid 'start' parameter"),
            ("/historical?start=2024-01-01T00:00:00Z", "invalid 'end' parameter"),
            (
                "/historical?start=2024-01-02T00:00:00Z&end=2024-01-01T00:00:00Z",
                "invalid time range",
            ),
        ];

        for (path, message) in cases {
            let response = reqwest::get(server.url(path)).await.unwrap();
            assert_eq!(response.status(), 400, "{}", path);
            let body: serde_json::Value = response.json().await.unwrap();
            assert_eq!(body["error"], message, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_historical_store_failure_is_500() {
        let server = TestServer::start(MemoryStore::new()).await;
        server.store.set_unavailable(true);

        let response = reqwest::get(
            server.url("/historical?start=2024-01-01T00:00:00Z&end=2024-01-02T00:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), 500);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "can not fetch data");
    }

    #[tokio::test]
    async fn test_events_snapshot_then_update() {
        let recent = DataPoint::now(21.0, "Temperature");
        let store = MemoryStore::with_points([recent.clone(), DataPoint::now(0.7, "Efficiency")]);
        let server = TestServer::start(store).await;

        let mut response = reqwest::get(server.url("/events?type=Temperature"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let mut buffer = String::new();
        let snapshot = next_envelope(&mut response, &mut buffer).await;
        assert_eq!(snapshot.kind, EnvelopeKind::InitialData);
        assert_eq!(snapshot.payload, vec![recent]);

        server
            .distributor
            .broadcast(&Arc::new(DataPoint::now(0.1, "Vibration")));
        let live = DataPoint::now(22.5, "Temperature");
        server.distributor.broadcast(&Arc::new(live.clone()));

        let update = next_envelope(&mut response, &mut buffer).await;
        assert_eq!(update.kind, EnvelopeKind::UpdateData);
        assert_eq!(update.payload, vec![live]);
    }

    #[tokio::test]
    async fn test_events_disconnect_deregisters() {
        let server = TestServer::start(MemoryStore::new()).await;

        let response = reqwest::get(server.url("/events")).await.unwrap();
        assert_eq!(server.distributor.subscriber_count(), 1);
        drop(response);

        // Keep-alive traffic surfaces the closed connection
        for _ in 0..50 {
            if server.distributor.subscriber_count() == 0 {
                return;
            }
            server
                .distributor
                .broadcast(&Arc::new(DataPoint::now(1.0, "Temperature")));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("session still registered after disconnect");
    }

    #[tokio::test]
    async fn test_stats_counts_subscribers() {
        let server = TestServer::start(MemoryStore::new()).await;
        let _response = reqwest::get(server.url("/events")).await.unwrap();

        let stats: serde_json::Value = reqwest::get(server.url("/stats"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stats["subscribers"], 1);
        assert_eq!(stats["dropped"], 0);
    }
}
