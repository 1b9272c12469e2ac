// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! fourier-producer - synthetic telemetry for Fourier
//!
//! Publishes five plant signals to the telemetry topic, each at its own
//! random cadence.
//!
//! # Usage
//!
//! ```bash
//! fourier-producer --broker-host localhost --broker-port 1883
//! ```

mod signals;

use anyhow::Result;
use clap::Parser;
use fourier::{DataPoint, TELEMETRY_TOPIC};
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use signals::Signal;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the channel merging all signal producers
const MERGE_CAPACITY: usize = 100;

/// Synthetic telemetry producer
#[derive(Parser, Debug)]
#[command(name = "fourier-producer")]
#[command(version)]
#[command(about = "Publish synthetic plant telemetry over MQTT")]
struct Args {
    /// MQTT broker host
    #[arg(long, default_value = "localhost")]
    broker_host: String,

    /// MQTT broker port
    #[arg(long, default_value = "1883")]
    broker_port: u16,

    /// MQTT client id
    #[arg(long, default_value = "telemetry-producer")]
    client_id: String,

    /// Topic to publish on
    #[arg(long, default_value = TELEMETRY_TOPIC)]
    topic: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        "Publishing to '{}' on {}:{}",
        args.topic, args.broker_host, args.broker_port
    );

    let mut options = MqttOptions::new(args.client_id, args.broker_host, args.broker_port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, eventloop) = AsyncClient::new(options, MERGE_CAPACITY);
    tokio::spawn(drive(eventloop));

    let (tx, rx) = mpsc::channel(MERGE_CAPACITY);
    for signal in Signal::ALL {
        tokio::spawn(signals::run(signal, tx.clone()));
    }
    drop(tx);

    tokio::select! {
        _ = publish(client, args.topic, rx) => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}

/// Keep the MQTT connection alive; rumqttc reconnects on the next poll.
async fn drive(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(event) => debug!("MQTT event: {:?}", event),
            Err(e) => {
                warn!("MQTT connection error: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Publish merged points until every producer has stopped.
async fn publish(client: AsyncClient, topic: String, mut rx: mpsc::Receiver<DataPoint>) {
    while let Some(point) = rx.recv().await {
        let payload = match point.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode {} point: {}", point.data_type, e);
                continue;
            }
        };

        match client
            .publish(topic.as_str(), QoS::AtMostOnce, true, payload)
            .await
        {
            Ok(()) => debug!("Published {} = {:.3}", point.data_type, point.value),
            Err(e) => warn!("Failed to publish {} point: {}", point.data_type, e),
        }
    }
}
