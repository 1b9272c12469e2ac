// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MQTT ingress.
//!
//! Drives the broker connection and hands every incoming publish to a
//! [`PublishHandler`]. The handler never blocks, so the event loop keeps
//! draining the broker at full speed.

use anyhow::{bail, Context, Result};
use fourier::{BrokerConfig, PublishHandler, PublishOutcome, Readiness};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Request channel capacity between the client handle and the event loop
const REQUEST_CAPACITY: usize = 64;

/// Build client options from the broker section.
pub fn mqtt_options(config: &BrokerConfig) -> MqttOptions {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    // rumqttc rejects keep-alive intervals below 5 seconds
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options
}

/// Connected MQTT ingress
pub struct Ingress {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    handler: Arc<dyn PublishHandler>,
    readiness: Readiness,
    reconnect_delay: Duration,
}

impl Ingress {
    /// Connect to the broker and request the telemetry subscription.
    ///
    /// Fails if the first connection attempt is not acknowledged.
    pub async fn connect(
        config: &BrokerConfig,
        handler: Arc<dyn PublishHandler>,
        readiness: Readiness,
    ) -> Result<Self> {
        info!(
            "Connecting to MQTT broker at {}:{} as '{}'",
            config.host, config.port, config.client_id
        );

        let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    debug!("Broker acknowledged connection: {:?}", ack.code);
                    break;
                }
                Ok(_) => {}
                Err(e) => bail!(
                    "Cannot connect to MQTT broker {}:{}: {}",
                    config.host,
                    config.port,
                    e
                ),
            }
        }

        let ingress = Self {
            client,
            eventloop,
            topic: config.topic.clone(),
            handler,
            readiness,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        };
        ingress.subscribe()?;

        Ok(ingress)
    }

    fn subscribe(&self) -> Result<()> {
        self.client
            .try_subscribe(self.topic.clone(), QoS::AtMostOnce)
            .with_context(|| format!("Failed to subscribe to '{}'", self.topic))
    }

    /// Run the event loop.
    ///
    /// Connection errors are retried after the reconnect delay; the
    /// subscription is renewed on every reconnect.
    pub async fn run(mut self) -> Result<()> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let outcome = self.handler.on_publish(&publish.topic, &publish.payload);
                    if outcome == PublishOutcome::Ignored {
                        trace!("Ignoring message on '{}'", publish.topic);
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    info!("Subscribed to '{}'", self.topic);
                    self.readiness.set_ingress(true);
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Reconnected to MQTT broker");
                    self.subscribe()?;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT connection error: {}", e);
                    self.readiness.set_ingress(false);
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}
