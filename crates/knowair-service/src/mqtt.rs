//! MQTT subscriber feeding gateway telemetry into the ingestion pipeline.
//!
//! # Topic Structure
//!
//! Gateways publish one JSON message per reading to
//! `{prefix}{device}/data`. The subscriber listens on `{prefix}+/data`, so
//! with the default prefix `knowair/` a reading from `node-001` arrives on
//! `knowair/node-001/data`.
//!
//! # Example Configuration
//!
//! ```toml
//! [mqtt]
//! enabled = true
//! broker = "mqtt://localhost:1883"
//! topic_prefix = "site/air_quality/"
//! qos = 1
//! ```
//!
//! # Reconnection
//!
//! Connection errors are logged and the client reconnects after five
//! seconds. The subscription is renewed on every connect.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;
use crate::ingest::{TelemetryMessage, ingest_logged};
use crate::state::AppState;

/// Delay before reconnecting after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// MQTT subscriber that ingests every telemetry message it receives.
pub struct MqttSubscriber {
    state: Arc<AppState>,
}

impl MqttSubscriber {
    /// Create a new MQTT subscriber.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start the subscriber in a background task.
    ///
    /// Returns immediately. Does nothing when `mqtt.enabled` is false.
    pub async fn start(&self) {
        let mqtt_config = self.state.config.read().await.mqtt.clone();

        if !mqtt_config.enabled {
            info!("MQTT subscriber is disabled");
            return;
        }

        info!("Starting MQTT subscriber to {}", mqtt_config.broker);

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            run_mqtt_subscriber(state, mqtt_config).await;
        });
    }
}

async fn run_mqtt_subscriber(state: Arc<AppState>, config: MqttConfig) {
    let (host, port, use_tls) = match parse_broker_url(&config.broker) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Invalid MQTT broker URL: {}", e);
            return;
        }
    };

    let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive));

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        mqtt_options.set_credentials(username, password);
    }

    if use_tls {
        mqtt_options.set_transport(rumqttc::Transport::tls_with_default_config());
    }

    let qos = qos_level(config.qos);
    let topic = config.subscription_topic();
    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("MQTT connected: {:?}", ack);
                match client.try_subscribe(topic.as_str(), qos) {
                    Ok(()) => info!("Subscribed to {}", topic),
                    Err(e) => warn!("Failed to subscribe to {}: {}", topic, e),
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(topic = %publish.topic, bytes = publish.payload.len(), "MQTT message");
                handle_message(&state, &publish.topic, &publish.payload).await;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("MQTT connection error: {}. Reconnecting...", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Parse one telemetry payload and ingest it. Malformed payloads are skipped.
async fn handle_message(state: &AppState, topic: &str, payload: &[u8]) {
    let message = match TelemetryMessage::parse(payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(topic = %topic, "Skipping malformed MQTT payload: {}", e);
            return;
        }
    };

    let reading = message.into_reading(OffsetDateTime::now_utc());
    ingest_logged(state, reading).await;
}

fn qos_level(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Parse an MQTT broker URL into (host, port, use_tls).
fn parse_broker_url(url: &str) -> Result<(String, u16, bool), String> {
    let (use_tls, rest) = if let Some(stripped) = url.strip_prefix("mqtt://") {
        (false, stripped)
    } else if let Some(stripped) = url.strip_prefix("mqtts://") {
        (true, stripped)
    } else {
        return Err("Invalid scheme: URL must start with mqtt:// or mqtts://".to_string());
    };

    let default_port = if use_tls { 8883 } else { 1883 };

    let (host, port) = if let Some((h, p)) = rest.rsplit_once(':') {
        let port = p
            .parse::<u16>()
            .map_err(|_| format!("Invalid port: {}", p))?;
        (h.to_string(), port)
    } else {
        (rest.to_string(), default_port)
    };

    if host.is_empty() {
        return Err("Host cannot be empty".to_string());
    }

    Ok((host, port, use_tls))
}
