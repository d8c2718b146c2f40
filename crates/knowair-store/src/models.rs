//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use knowair_core::Classification;
use knowair_types::{Reading, Status, Violation};

/// A device stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDevice {
    /// Device identifier as reported in telemetry.
    pub id: String,
    /// First time this device was seen.
    #[serde(with = "time::serde::rfc3339")]
    pub first_seen: OffsetDateTime,
    /// Last time this device was seen.
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}

/// A reading stored in the database, with whatever classification was
/// attached to it at ingest time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    /// Database row ID.
    pub id: i64,
    /// Device identifier.
    pub device_id: String,
    /// When this reading was captured.
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
    /// Temperature in Celsius.
    pub temp_c: Option<f64>,
    /// Relative humidity in percent.
    pub humidity_rh: Option<f64>,
    /// Pressure in hPa.
    pub pressure_hpa: Option<f64>,
    /// TVOC in ppb.
    pub tvoc_ppb: Option<f64>,
    /// eCO2 in ppm.
    pub eco2_ppm: Option<f64>,
    /// Persisted status label, `None` if the reading was never classified.
    pub status: Option<Status>,
    /// Trend score (trend mode only).
    pub score: Option<f64>,
    /// TVOC change from baseline in percent (trend mode only).
    pub tvoc_increase_pct: Option<f64>,
    /// eCO2 change from baseline in percent (trend mode only).
    pub eco2_increase_pct: Option<f64>,
    /// Whether the sudden-change detector fired.
    pub delta_alert: bool,
    /// Range-mode reason tags.
    pub violations: Vec<Violation>,
}

impl StoredReading {
    /// Build a row from a reading and its optional classification.
    pub fn from_reading(reading: &Reading, classification: Option<&Classification>) -> Self {
        let trend = classification.and_then(Classification::as_trend);
        Self {
            id: 0, // Will be set by database
            device_id: reading.device_id.clone(),
            captured_at: reading.timestamp,
            temp_c: reading.temp_c,
            humidity_rh: reading.humidity_rh,
            pressure_hpa: reading.pressure_hpa,
            tvoc_ppb: reading.tvoc_ppb,
            eco2_ppm: reading.eco2_ppm,
            status: classification.map(Classification::status),
            score: trend.map(|t| t.score),
            tvoc_increase_pct: trend.and_then(|t| t.tvoc_increase_pct),
            eco2_increase_pct: trend.and_then(|t| t.eco2_increase_pct),
            delta_alert: classification.is_some_and(|c| c.delta_alert),
            violations: classification
                .map(|c| c.violations().to_vec())
                .unwrap_or_default(),
        }
    }

    /// Convert back to the raw reading.
    pub fn to_reading(&self) -> Reading {
        Reading {
            device_id: self.device_id.clone(),
            timestamp: self.captured_at,
            temp_c: self.temp_c,
            humidity_rh: self.humidity_rh,
            pressure_hpa: self.pressure_hpa,
            tvoc_ppb: self.tvoc_ppb,
            eco2_ppm: self.eco2_ppm,
        }
    }

    /// Returns `true` if the stored status is `WARN` or `HIGH`.
    pub fn is_alert(&self) -> bool {
        self.status.is_some_and(|s| s.is_alert())
    }
}

/// Epoch milliseconds for a timestamp.
pub(crate) fn to_millis(ts: OffsetDateTime) -> i64 {
    // i64 milliseconds outlast any representable OffsetDateTime
    (ts.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Timestamp from epoch milliseconds.
pub(crate) fn from_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}

/// Drop sub-millisecond precision so a timestamp survives a round trip
/// through the database unchanged.
pub(crate) fn truncate_to_millis(ts: OffsetDateTime) -> OffsetDateTime {
    from_millis(to_millis(ts)).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowair_core::{Outcome, RangeStatus, TestRangeResult};
    use knowair_types::{AlertResult, TrendStatus};
    use time::macros::datetime;

    fn reading() -> Reading {
        Reading::new("node-1", datetime!(2025-03-01 10:00 UTC))
            .with_eco2(650.0)
            .with_tvoc(100.0)
    }

    #[test]
    fn test_from_trend_classification() {
        let c = Classification {
            delta_alert: true,
            outcome: Outcome::Trend(AlertResult {
                score: 30.0,
                status: TrendStatus::Ok,
                tvoc_increase_pct: Some(0.0),
                eco2_increase_pct: Some(30.0),
            }),
        };
        let row = StoredReading::from_reading(&reading(), Some(&c));
        assert_eq!(row.status, Some(Status::Ok));
        assert_eq!(row.score, Some(30.0));
        assert_eq!(row.eco2_increase_pct, Some(30.0));
        assert!(row.delta_alert);
        assert!(row.violations.is_empty());
        assert!(!row.is_alert());
    }

    #[test]
    fn test_from_range_classification() {
        let c = Classification {
            delta_alert: false,
            outcome: Outcome::Range(TestRangeResult {
                status: RangeStatus::High,
                violations: vec![Violation::Eco2OutOfRange],
            }),
        };
        let row = StoredReading::from_reading(&reading(), Some(&c));
        assert_eq!(row.status, Some(Status::High));
        assert_eq!(row.score, None);
        assert_eq!(row.violations, vec![Violation::Eco2OutOfRange]);
        assert!(row.is_alert());
    }

    #[test]
    fn test_unclassified_row_round_trips_reading() {
        let row = StoredReading::from_reading(&reading(), None);
        assert_eq!(row.status, None);
        assert!(!row.delta_alert);
        assert_eq!(row.to_reading(), reading());
    }

    #[test]
    fn test_millis_conversion() {
        let ts = datetime!(2025-03-01 10:00:00.123456 UTC);
        assert_eq!(to_millis(ts), 1_740_823_200_123);
        assert_eq!(
            truncate_to_millis(ts),
            datetime!(2025-03-01 10:00:00.123 UTC)
        );
        assert_eq!(from_millis(to_millis(ts)), Some(truncate_to_millis(ts)));
    }
}
