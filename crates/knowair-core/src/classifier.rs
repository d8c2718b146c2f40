//! Per-reading classification pipeline.
//!
//! [`Classifier`] runs the delta check first, then either the trend
//! classifier or the range classifier depending on [`AlertMode`]. It holds no
//! state of its own beyond its configuration: everything it remembers about a
//! device comes from the [`ReadingHistory`] passed to each call.
//!
//! Callers must serialize calls per device and record each reading (with its
//! returned status) before classifying the next one, otherwise two readings
//! may observe the same stale previous status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use knowair_types::{AlertResult, RangeStatus, Reading, Status, TestRangeResult, Violation};

use crate::baseline::estimate_baseline;
use crate::delta::detect_sudden_change;
use crate::error::Result;
use crate::range::evaluate_range;
use crate::thresholds::AlertConfig;
use crate::traits::ReadingHistory;
use crate::trend::evaluate_trend;

/// Which classifier runs after the delta check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    /// Percentage deviation from the rolling baseline.
    #[default]
    Trend,
    /// Fixed operating bands with hysteresis.
    Range,
}

impl AlertMode {
    /// Lowercase mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertMode::Trend => "trend",
            AlertMode::Range => "range",
        }
    }
}

impl fmt::Display for AlertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trend" | "production" => Ok(AlertMode::Trend),
            "range" | "test" => Ok(AlertMode::Range),
            other => Err(format!("unknown alert mode '{other}' (expected trend or range)")),
        }
    }
}

/// Mode-specific classification result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Trend mode output.
    Trend(AlertResult),
    /// Range mode output.
    Range(TestRangeResult),
}

/// Everything attached to a reading before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Whether the sudden-change detector fired.
    pub delta_alert: bool,
    /// The mode-specific result.
    pub outcome: Outcome,
}

impl Classification {
    /// Status label to persist.
    pub fn status(&self) -> Status {
        match &self.outcome {
            Outcome::Trend(result) => result.status.into(),
            Outcome::Range(result) => result.status.into(),
        }
    }

    /// Trend score, or `None` in range mode.
    pub fn score(&self) -> Option<f64> {
        match &self.outcome {
            Outcome::Trend(result) => Some(result.score),
            Outcome::Range(_) => None,
        }
    }

    /// Violation tags, empty in trend mode.
    pub fn violations(&self) -> &[Violation] {
        match &self.outcome {
            Outcome::Trend(_) => &[],
            Outcome::Range(result) => &result.violations,
        }
    }

    /// Trend result, if trend mode ran.
    pub fn as_trend(&self) -> Option<&AlertResult> {
        match &self.outcome {
            Outcome::Trend(result) => Some(result),
            Outcome::Range(_) => None,
        }
    }

    /// Range result, if range mode ran.
    pub fn as_range(&self) -> Option<&TestRangeResult> {
        match &self.outcome {
            Outcome::Range(result) => Some(result),
            Outcome::Trend(_) => None,
        }
    }

    /// The mode that produced this classification.
    pub fn mode(&self) -> AlertMode {
        match self.outcome {
            Outcome::Trend(_) => AlertMode::Trend,
            Outcome::Range(_) => AlertMode::Range,
        }
    }
}

/// Stateless classifier for a stream of readings.
///
/// # Example
///
/// ```
/// use knowair_core::{AlertConfig, AlertMode, Classifier, MemoryHistory};
/// use knowair_types::{Reading, Status};
/// use time::macros::datetime;
///
/// let classifier = Classifier::new(AlertConfig::default(), AlertMode::Range);
/// let history = MemoryHistory::new();
///
/// let reading = Reading::new("node-1", datetime!(2025-03-01 10:00 UTC))
///     .with_eco2(700.0)
///     .with_tvoc(40.0);
/// let classification = classifier.classify(&reading, &history).unwrap();
///
/// assert!(!classification.delta_alert);
/// assert_eq!(classification.status(), Status::High);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classifier {
    config: AlertConfig,
    mode: AlertMode,
}

impl Classifier {
    /// Create a classifier.
    pub fn new(config: AlertConfig, mode: AlertMode) -> Self {
        Self { config, mode }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Mode in use.
    pub fn mode(&self) -> AlertMode {
        self.mode
    }

    /// Classify `reading` against the device's history.
    ///
    /// The history must not yet contain `reading` for the baseline to match
    /// what was stored before it arrived. The previous reading is always looked
    /// up strictly before `reading.timestamp`.
    pub fn classify<H: ReadingHistory>(
        &self,
        reading: &Reading,
        history: &H,
    ) -> Result<Classification> {
        let (delta_alert, previous) = detect_sudden_change(history, reading, &self.config.delta)?;

        let outcome = match self.mode {
            AlertMode::Trend => {
                let baseline =
                    estimate_baseline(history, &reading.device_id, reading.timestamp, &self.config)?;
                Outcome::Trend(evaluate_trend(reading, &baseline, &self.config))
            }
            AlertMode::Range => {
                let previous_status = previous
                    .as_ref()
                    .and_then(|prev| prev.status)
                    .map_or(RangeStatus::Normal, |status| status.as_range());
                Outcome::Range(evaluate_range(
                    previous_status,
                    reading.eco2_ppm,
                    reading.tvoc_ppb,
                    delta_alert,
                    &self.config,
                ))
            }
        };

        let classification = Classification {
            delta_alert,
            outcome,
        };
        debug!(
            device_id = %reading.device_id,
            mode = %self.mode,
            status = %classification.status(),
            delta_alert,
            "Classified reading"
        );
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryHistory;
    use crate::thresholds::RangeBand;
    use knowair_types::TrendStatus;
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    const T0: OffsetDateTime = datetime!(2025-03-01 10:00 UTC);

    fn reading(secs: i64) -> Reading {
        Reading::new("node-1", T0 + Duration::seconds(secs))
    }

    #[test]
    fn test_alert_mode_parse_and_display() {
        assert_eq!("trend".parse::<AlertMode>(), Ok(AlertMode::Trend));
        assert_eq!("RANGE".parse::<AlertMode>(), Ok(AlertMode::Range));
        assert_eq!("test".parse::<AlertMode>(), Ok(AlertMode::Range));
        assert!("fuzzy".parse::<AlertMode>().is_err());
        assert_eq!(AlertMode::Range.to_string(), "range");
        assert_eq!(serde_json::to_string(&AlertMode::Trend).unwrap(), "\"trend\"");
    }

    #[test]
    fn test_trend_mode_uses_baseline() {
        let history = MemoryHistory::new();
        history.record(reading(0).with_eco2(500.0).with_tvoc(100.0));
        history.record(reading(20).with_eco2(500.0).with_tvoc(100.0));

        let classifier = Classifier::new(
            AlertConfig {
                delta: crate::thresholds::DeltaThresholds {
                    eco2: 1000.0,
                    ..Default::default()
                },
                ..AlertConfig::default()
            },
            AlertMode::Trend,
        );
        let c = classifier
            .classify(&reading(40).with_eco2(650.0).with_tvoc(100.0), &history)
            .unwrap();

        assert!(!c.delta_alert);
        let trend = c.as_trend().unwrap();
        assert_eq!(trend.eco2_increase_pct, Some(30.0));
        assert_eq!(trend.status, TrendStatus::Ok);
        assert_eq!(c.score(), Some(30.0));
        assert_eq!(c.status(), Status::Ok);
        assert!(c.violations().is_empty());
    }

    #[test]
    fn test_trend_mode_with_unbounded_window_still_classifies() {
        let history = MemoryHistory::new();
        history.record(reading(0).with_eco2(512.0));

        let classifier = Classifier::new(
            AlertConfig {
                baseline_window_secs: 1_000_000_000_000,
                ..AlertConfig::default()
            },
            AlertMode::Trend,
        );
        let c = classifier
            .classify(&reading(10).with_eco2(520.0), &history)
            .unwrap();
        assert_eq!(c.as_trend().unwrap().eco2_increase_pct, Some(1.5625));
        assert_eq!(c.status(), Status::Ok);
    }

    #[test]
    fn test_trend_mode_still_reports_delta() {
        let history = MemoryHistory::new();
        history.record(reading(0).with_eco2(500.0));

        let classifier = Classifier::default();
        let c = classifier
            .classify(&reading(10).with_eco2(560.0), &history)
            .unwrap();
        assert!(c.delta_alert);
        // Delta does not override the trend status
        assert_eq!(c.status(), Status::Ok);
        assert_eq!(c.mode(), AlertMode::Trend);
    }

    #[test]
    fn test_range_mode_first_reading_starts_normal() {
        let classifier = Classifier::new(AlertConfig::default(), AlertMode::Range);
        let c = classifier
            .classify(&reading(0).with_eco2(500.0).with_tvoc(50.0), &MemoryHistory::new())
            .unwrap();
        assert!(!c.delta_alert);
        assert_eq!(c.status(), Status::Normal);
        assert_eq!(c.score(), None);
    }

    #[test]
    fn test_range_mode_reads_previous_status() {
        let config = AlertConfig {
            eco2: RangeBand::new(450.0, 550.0, 20.0),
            ..AlertConfig::default()
        };
        let classifier = Classifier::new(config, AlertMode::Range);
        let history = MemoryHistory::new();
        history.push(reading(0).with_eco2(545.0).with_tvoc(50.0), Some(Status::High));

        let c = classifier
            .classify(&reading(10).with_eco2(545.0).with_tvoc(50.0), &history)
            .unwrap();
        assert_eq!(c.status(), Status::High);

        history.push(reading(10).with_eco2(545.0).with_tvoc(50.0), Some(Status::High));
        let c = classifier
            .classify(&reading(20).with_eco2(525.0).with_tvoc(50.0), &history)
            .unwrap();
        assert_eq!(c.status(), Status::Normal);
    }

    #[test]
    fn test_range_mode_treats_trend_labels_as_normal() {
        let classifier = Classifier::new(AlertConfig::default(), AlertMode::Range);
        let history = MemoryHistory::new();
        history.push(reading(0).with_eco2(590.0), Some(Status::Warn));

        let c = classifier
            .classify(&reading(10).with_eco2(595.0), &history)
            .unwrap();
        assert_eq!(c.status(), Status::Normal);
    }

    #[test]
    fn test_range_mode_delta_override() {
        let classifier = Classifier::new(AlertConfig::default(), AlertMode::Range);
        let history = MemoryHistory::new();
        history.push(reading(0).with_eco2(400.0).with_tvoc(20.0), Some(Status::Normal));

        let c = classifier
            .classify(&reading(10).with_eco2(500.0).with_tvoc(20.0), &history)
            .unwrap();
        assert!(c.delta_alert);
        assert_eq!(c.status(), Status::High);
        assert_eq!(c.violations(), &[Violation::SuddenChange]);
    }

    #[test]
    fn test_history_failure_propagates() {
        let history = MemoryHistory::new();
        history.set_should_fail(true);
        let err = Classifier::default()
            .classify(&reading(0).with_eco2(500.0), &history)
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
