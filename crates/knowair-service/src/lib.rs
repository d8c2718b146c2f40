//! Telemetry ingestion service and HTTP REST API for air-quality alerts.
//!
//! This crate provides a service that:
//! - Accepts readings over HTTP and, with the `mqtt` feature, from an MQTT broker
//! - Classifies each reading against the device's stored history
//! - Stores the reading with its classification
//! - Exposes a REST API for querying readings and alerts
//! - Streams classified readings over WebSocket
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/ingest` - Ingest and classify one reading
//! - `GET /api/devices` - List all known devices
//! - `GET /api/devices/{id}` - Get device info
//! - `GET /api/devices/{id}/latest` - Latest reading for device
//! - `GET /api/devices/{id}/readings` - Reading history, oldest first
//! - `GET /api/devices/{id}/alerts/latest` - Alert fields of the latest reading
//! - `GET|PUT /api/config/alerts` - Read or replace alert settings
//! - `WS /api/ws` - Real-time readings stream
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/knowair/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/knowair/data.db"
//!
//! [alerts]
//! mode = "trend"
//! warn_pct = 35.0
//! high_pct = 80.0
//!
//! [mqtt]
//! enabled = true
//! broker = "mqtt://localhost:1883"
//! topic_prefix = "knowair/"
//! ```

pub mod api;
pub mod config;
pub mod ingest;
pub mod state;
pub mod ws;

pub use config::{
    AlertsConfig, Config, ConfigError, MqttConfig, ServerConfig, StorageConfig, ValidationError,
};
pub use ingest::{IngestRequest, TelemetryMessage, ingest};
pub use state::{AppState, ReadingEvent};

#[cfg(feature = "mqtt")]
pub mod mqtt;
