//! Ingestion pipeline shared by the REST endpoint and the MQTT subscriber.
//!
//! Both transports map their wire payload to a [`Reading`] and hand it to
//! [`ingest`], which classifies it against the stored history, persists it and
//! publishes it to live subscribers.

use knowair_store::StoredReading;
use knowair_types::Reading;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::state::{AppState, ReadingEvent};

/// Body of `POST /api/ingest`.
///
/// Every channel is optional; `ts` defaults to the server's current UTC time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub device_id: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ts: Option<OffsetDateTime>,
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub hum_rh: Option<f64>,
    #[serde(default)]
    pub pressure_hpa: Option<f64>,
    #[serde(default)]
    pub tvoc_ppb: Option<f64>,
    #[serde(default)]
    pub eco2_ppm: Option<f64>,
}

impl IngestRequest {
    /// Convert to a reading, stamping `now` when no timestamp was sent.
    pub fn into_reading(self, now: OffsetDateTime) -> Reading {
        Reading {
            device_id: self.device_id,
            timestamp: self.ts.unwrap_or(now),
            temp_c: self.temp_c,
            humidity_rh: self.hum_rh,
            pressure_hpa: self.pressure_hpa,
            tvoc_ppb: self.tvoc_ppb,
            eco2_ppm: self.eco2_ppm,
        }
    }
}

/// JSON payload published by gateways on `{prefix}{device}/data`.
///
/// Gateways send epoch milliseconds in `ts_ms` (0 when their clock is not
/// synced) and some firmware names pressure `press_hpa`. Unknown fields are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryMessage {
    pub device_id: Option<String>,
    pub ts_ms: Option<i64>,
    pub temp_c: Option<f64>,
    pub hum_rh: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub press_hpa: Option<f64>,
    pub tvoc_ppb: Option<f64>,
    pub eco2_ppm: Option<f64>,
}

/// Device id used when a telemetry message does not carry one.
pub const UNKNOWN_DEVICE: &str = "unknown";

impl TelemetryMessage {
    /// Parse a raw MQTT payload.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Convert to a reading. A missing, zero or out-of-range `ts_ms` falls
    /// back to `now`.
    pub fn into_reading(self, now: OffsetDateTime) -> Reading {
        let timestamp = self
            .ts_ms
            .filter(|&ms| ms > 0)
            .and_then(|ms| {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
            })
            .unwrap_or(now);

        Reading {
            device_id: self
                .device_id
                .unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
            timestamp,
            temp_c: self.temp_c,
            humidity_rh: self.hum_rh,
            pressure_hpa: self.pressure_hpa.or(self.press_hpa),
            tvoc_ppb: self.tvoc_ppb,
            eco2_ppm: self.eco2_ppm,
        }
    }
}

/// Classify, persist and broadcast one reading.
///
/// The store lock is held for the whole classify-and-insert step, which
/// keeps each device's history lookups consistent with its inserts. The
/// alert settings are read at call time so runtime updates apply to the next
/// reading.
pub async fn ingest(state: &AppState, reading: Reading) -> knowair_store::Result<StoredReading> {
    let classifier = state.config.read().await.alerts.classifier();

    let stored = {
        let store = state.store.lock().await;
        store.ingest(&reading, &classifier)?
    };

    debug!(
        device_id = %stored.device_id,
        status = ?stored.status,
        score = ?stored.score,
        mode = %classifier.mode(),
        "Ingested reading"
    );

    let event = ReadingEvent {
        device_id: stored.device_id.clone(),
        reading: stored.clone(),
    };
    // No receivers is the common case when nobody is watching
    if state.readings_tx.send(event).is_err() {
        debug!("No live subscribers for reading");
    }

    Ok(stored)
}

/// Run [`ingest`] and log failures instead of returning them.
///
/// Used by transports with nobody to report an error to.
pub async fn ingest_logged(state: &AppState, reading: Reading) -> Option<StoredReading> {
    let device_id = reading.device_id.clone();
    match ingest(state, reading).await {
        Ok(stored) => Some(stored),
        Err(e) => {
            warn!(
                device_id = %device_id,
                retryable = e.is_retryable(),
                "Failed to ingest reading: {}",
                e
            );
            None
        }
    }
}
