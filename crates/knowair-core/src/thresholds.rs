//! Alert thresholds.
//!
//! This module holds every tunable the classifiers read: the baseline window,
//! the trend percentage cutoffs, the fixed operating bands used in range mode,
//! and the per-channel delta thresholds.
//!
//! The configuration is read-only from the classifiers' point of view. It is
//! passed in at call time, so a caller may swap it between readings.
//!
//! # Example
//!
//! ```
//! use knowair_core::{AlertConfig, RangeBand};
//!
//! let mut config = AlertConfig::default();
//! config.eco2 = RangeBand::new(450.0, 550.0, 20.0);
//!
//! assert!(config.eco2.is_outside(700.0));
//! assert!(!config.eco2.is_recovered(545.0));
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use time::Duration;

use knowair_types::Channel;

use crate::error::{ConfigIssue, Error, Result};

/// Longest accepted baseline window: 30 days.
pub const MAX_BASELINE_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Fixed operating band with hysteresis for one channel.
///
/// A value outside `[min, max]` enters the alarm state. Leaving it requires
/// the value to come back inside the narrower band
/// `[min + hysteresis, max - hysteresis]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBand {
    /// Lower bound of the operating band.
    pub min: f64,
    /// Upper bound of the operating band.
    pub max: f64,
    /// Margin the value must clear on each side to recover.
    pub hysteresis: f64,
}

impl RangeBand {
    /// Create a new band.
    pub const fn new(min: f64, max: f64, hysteresis: f64) -> Self {
        Self {
            min,
            max,
            hysteresis,
        }
    }

    /// Strictly outside `[min, max]`.
    pub fn is_outside(&self, value: f64) -> bool {
        value < self.min || value > self.max
    }

    /// Inside the shrunk band `[min + hysteresis, max - hysteresis]`, inclusive.
    pub fn is_recovered(&self, value: f64) -> bool {
        self.min + self.hysteresis <= value && value <= self.max - self.hysteresis
    }

    fn issues(&self, prefix: &str) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if !(self.min.is_finite() && self.max.is_finite() && self.hysteresis.is_finite()) {
            issues.push(ConfigIssue::new(prefix, "band values must be finite"));
            return issues;
        }

        if self.min >= self.max {
            issues.push(ConfigIssue::new(
                format!("{prefix}.min"),
                format!("min {} must be below max {}", self.min, self.max),
            ));
        }

        if self.hysteresis < 0.0 {
            issues.push(ConfigIssue::new(
                format!("{prefix}.hysteresis"),
                format!("hysteresis {} cannot be negative", self.hysteresis),
            ));
        } else if self.min + self.hysteresis > self.max - self.hysteresis {
            issues.push(ConfigIssue::new(
                format!("{prefix}.hysteresis"),
                format!(
                    "hysteresis {} leaves no recovery band inside [{}, {}]",
                    self.hysteresis, self.min, self.max
                ),
            ));
        }

        issues
    }
}

/// Minimum sample-to-sample change that counts as sudden, per channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaThresholds {
    /// eCO2 jump in ppm.
    pub eco2: f64,
    /// TVOC jump in ppb.
    pub tvoc: f64,
    /// Temperature jump in °C.
    pub temperature: f64,
    /// Humidity jump in %RH.
    pub humidity: f64,
    /// Pressure jump in hPa.
    pub pressure: f64,
}

impl Default for DeltaThresholds {
    fn default() -> Self {
        Self {
            eco2: 30.0,
            tvoc: 15.0,
            temperature: 0.5,
            humidity: 2.0,
            pressure: 1.0,
        }
    }
}

impl DeltaThresholds {
    /// Threshold for a channel.
    pub fn threshold(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Eco2 => self.eco2,
            Channel::Tvoc => self.tvoc,
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Pressure => self.pressure,
        }
    }
}

/// Full set of alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Length of the baseline averaging window in seconds.
    pub baseline_window_secs: u64,
    /// Percentage increase over baseline that raises `WARN`.
    pub warn_pct: f64,
    /// Percentage increase over baseline that raises `HIGH`.
    pub high_pct: f64,
    /// eCO2 operating band (ppm).
    pub eco2: RangeBand,
    /// TVOC operating band (ppb).
    pub tvoc: RangeBand,
    /// Sudden-change thresholds.
    pub delta: DeltaThresholds,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            baseline_window_secs: 60,
            warn_pct: 35.0,
            high_pct: 80.0,
            eco2: RangeBand::new(350.0, 600.0, 20.0),
            tvoc: RangeBand::new(0.0, 120.0, 10.0),
            delta: DeltaThresholds::default(),
        }
    }
}

impl AlertConfig {
    /// Baseline window as a duration.
    pub fn baseline_window(&self) -> Duration {
        Duration::seconds(i64::try_from(self.baseline_window_secs).unwrap_or(i64::MAX))
    }

    /// Operating band for a channel, if range mode checks it.
    pub fn band(&self, channel: Channel) -> Option<&RangeBand> {
        match channel {
            Channel::Eco2 => Some(&self.eco2),
            Channel::Tvoc => Some(&self.tvoc),
            _ => None,
        }
    }

    /// Collect every validation problem.
    ///
    /// The classifiers tolerate invalid values (a non-positive `high_pct`
    /// simply scores zero), so this is for configuration front-ends that want
    /// to reject a bad file up front.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.baseline_window_secs == 0 {
            issues.push(ConfigIssue::new(
                "baseline_window_secs",
                "baseline window must be at least 1 second",
            ));
        } else if self.baseline_window_secs > MAX_BASELINE_WINDOW_SECS {
            issues.push(ConfigIssue::new(
                "baseline_window_secs",
                format!(
                    "baseline window {}s exceeds the {}s maximum",
                    self.baseline_window_secs, MAX_BASELINE_WINDOW_SECS
                ),
            ));
        }

        if !(self.high_pct.is_finite() && self.high_pct > 0.0) {
            issues.push(ConfigIssue::new(
                "high_pct",
                format!("high cutoff {} must be a positive number", self.high_pct),
            ));
        }

        if !self.warn_pct.is_finite() {
            issues.push(ConfigIssue::new("warn_pct", "warn cutoff must be finite"));
        } else if self.warn_pct > self.high_pct {
            issues.push(ConfigIssue::new(
                "warn_pct",
                format!(
                    "warn cutoff {} is above high cutoff {}",
                    self.warn_pct, self.high_pct
                ),
            ));
        }

        issues.extend(self.eco2.issues("eco2"));
        issues.extend(self.tvoc.issues("tvoc"));

        for channel in Channel::ALL {
            let threshold = self.delta.threshold(channel);
            if !(threshold.is_finite() && threshold > 0.0) {
                issues.push(ConfigIssue::new(
                    format!("delta.{}", channel.name()),
                    format!("delta threshold {threshold} must be a positive number"),
                ));
            }
        }

        issues
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(issues))
        }
    }
}
