//! Core types for air-quality readings and alert results.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// A sensor channel carried by a [`Reading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Channel {
    /// Equivalent CO2 in ppm.
    Eco2,
    /// Total volatile organic compounds in ppb.
    Tvoc,
    /// Temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Barometric pressure in hPa.
    Pressure,
}

impl Channel {
    /// Every channel, in delta-evaluation order.
    pub const ALL: [Channel; 5] = [
        Channel::Eco2,
        Channel::Tvoc,
        Channel::Temperature,
        Channel::Humidity,
        Channel::Pressure,
    ];

    /// Pollutant channels tracked against a windowed baseline.
    ///
    /// Adding a channel here extends baseline and trend evaluation without
    /// touching their logic.
    pub const TRACKED: [Channel; 2] = [Channel::Tvoc, Channel::Eco2];

    /// Short machine name (`eco2`, `tvoc`, ...).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Eco2 => "eco2",
            Channel::Tvoc => "tvoc",
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Pressure => "pressure",
        }
    }

    /// Measurement unit.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Eco2 => "ppm",
            Channel::Tvoc => "ppb",
            Channel::Temperature => "°C",
            Channel::Humidity => "%RH",
            Channel::Pressure => "hPa",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownChannel(s.to_string()))
    }
}

/// A single multi-sensor reading from one device.
///
/// Every channel is optional: an absent value means the sensor did not report,
/// which is distinct from a reported zero. Readings are ordered per device by
/// `timestamp`.
///
/// # Example
///
/// ```
/// use knowair_types::{Channel, Reading};
/// use time::macros::datetime;
///
/// let reading = Reading::new("node-001", datetime!(2025-01-01 12:00 UTC))
///     .with_eco2(612.0)
///     .with_tvoc(48.0);
///
/// assert_eq!(reading.value(Channel::Eco2), Some(612.0));
/// assert_eq!(reading.value(Channel::Humidity), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Device identifier.
    pub device_id: String,
    /// When the reading was taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Temperature in degrees Celsius.
    pub temp_c: Option<f64>,
    /// Relative humidity in percent.
    pub humidity_rh: Option<f64>,
    /// Barometric pressure in hPa.
    pub pressure_hpa: Option<f64>,
    /// TVOC in ppb.
    pub tvoc_ppb: Option<f64>,
    /// eCO2 in ppm.
    pub eco2_ppm: Option<f64>,
}

impl Reading {
    /// Create a reading with no channel values.
    pub fn new(device_id: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            temp_c: None,
            humidity_rh: None,
            pressure_hpa: None,
            tvoc_ppb: None,
            eco2_ppm: None,
        }
    }

    #[must_use]
    pub fn with_eco2(mut self, ppm: f64) -> Self {
        self.eco2_ppm = Some(ppm);
        self
    }

    #[must_use]
    pub fn with_tvoc(mut self, ppb: f64) -> Self {
        self.tvoc_ppb = Some(ppb);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temp_c = Some(celsius);
        self
    }

    #[must_use]
    pub fn with_humidity(mut self, rh: f64) -> Self {
        self.humidity_rh = Some(rh);
        self
    }

    #[must_use]
    pub fn with_pressure(mut self, hpa: f64) -> Self {
        self.pressure_hpa = Some(hpa);
        self
    }

    /// Value of a channel, if the sensor reported one.
    #[must_use]
    pub fn value(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Eco2 => self.eco2_ppm,
            Channel::Tvoc => self.tvoc_ppb,
            Channel::Temperature => self.temp_c,
            Channel::Humidity => self.humidity_rh,
            Channel::Pressure => self.pressure_hpa,
        }
    }

    /// Returns `true` if no channel carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|c| self.value(*c).is_none())
    }
}

/// Status produced by the trend (baseline deviation) classifier.
///
/// # Ordering
///
/// Values are ordered by severity: `Ok < Warn < High`.
///
/// ```
/// use knowair_types::TrendStatus;
///
/// assert!(TrendStatus::High > TrendStatus::Warn);
/// assert!(TrendStatus::Warn > TrendStatus::Ok);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TrendStatus {
    #[default]
    Ok,
    Warn,
    High,
}

impl fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Status::from(*self).as_str())
    }
}

/// State of the hysteresis range classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RangeStatus {
    #[default]
    Normal,
    High,
}

impl fmt::Display for RangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Status::from(*self).as_str())
    }
}

/// Status label persisted on a classified reading.
///
/// Both classifier modes write into the same column, so the label covers the
/// union of their states. The range classifier reads its previous state back
/// through [`Status::as_range`].
///
/// # Example
///
/// ```
/// use knowair_types::{RangeStatus, Status};
///
/// let status: Status = "WARN".parse().unwrap();
/// assert_eq!(status, Status::Warn);
/// assert_eq!(status.as_range(), RangeStatus::Normal);
/// assert_eq!(Status::High.to_string(), "HIGH");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Status {
    Ok,
    Normal,
    Warn,
    High,
}

impl Status {
    /// Label as stored and displayed.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Normal => "NORMAL",
            Status::Warn => "WARN",
            Status::High => "HIGH",
        }
    }

    /// Interpret this label as a hysteresis state.
    ///
    /// `HIGH` stays `HIGH`; every other label counts as `NORMAL`.
    #[must_use]
    pub fn as_range(&self) -> RangeStatus {
        match self {
            Status::High => RangeStatus::High,
            Status::Ok | Status::Normal | Status::Warn => RangeStatus::Normal,
        }
    }

    /// Returns `true` for labels that should surface as an alert.
    #[must_use]
    pub fn is_alert(&self) -> bool {
        matches!(self, Status::Warn | Status::High)
    }
}

impl From<TrendStatus> for Status {
    fn from(status: TrendStatus) -> Self {
        match status {
            TrendStatus::Ok => Status::Ok,
            TrendStatus::Warn => Status::Warn,
            TrendStatus::High => Status::High,
        }
    }
}

impl From<RangeStatus> for Status {
    fn from(status: RangeStatus) -> Self {
        match status {
            RangeStatus::Normal => Status::Normal,
            RangeStatus::High => Status::High,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NORMAL" => Ok(Status::Normal),
            "WARN" => Ok(Status::Warn),
            "HIGH" => Ok(Status::High),
            _ => Err(ParseError::UnknownStatus(s.to_string())),
        }
    }
}

/// Reason tag raised by the range classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Violation {
    #[cfg_attr(feature = "serde", serde(rename = "eco2_out_of_range"))]
    Eco2OutOfRange,
    #[cfg_attr(feature = "serde", serde(rename = "tvoc_out_of_range"))]
    TvocOutOfRange,
    #[cfg_attr(feature = "serde", serde(rename = "sudden_change_detected"))]
    SuddenChange,
}

impl Violation {
    /// Tag as stored and reported.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Violation::Eco2OutOfRange => "eco2_out_of_range",
            Violation::TvocOutOfRange => "tvoc_out_of_range",
            Violation::SuddenChange => "sudden_change_detected",
        }
    }

    /// Out-of-range tag for a channel, if that channel has an operating band.
    #[must_use]
    pub fn out_of_range(channel: Channel) -> Option<Self> {
        match channel {
            Channel::Eco2 => Some(Violation::Eco2OutOfRange),
            Channel::Tvoc => Some(Violation::TvocOutOfRange),
            _ => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Violation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eco2_out_of_range" => Ok(Violation::Eco2OutOfRange),
            "tvoc_out_of_range" => Ok(Violation::TvocOutOfRange),
            "sudden_change_detected" => Ok(Violation::SuddenChange),
            _ => Err(ParseError::UnknownViolation(s.to_string())),
        }
    }
}

/// Result of trend (baseline deviation) classification.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlertResult {
    /// Normalized severity in `[0, 100]`.
    pub score: f64,
    /// Three-level status.
    pub status: TrendStatus,
    /// Signed TVOC change from baseline in percent, if defined.
    pub tvoc_increase_pct: Option<f64>,
    /// Signed eCO2 change from baseline in percent, if defined.
    pub eco2_increase_pct: Option<f64>,
}

impl AlertResult {
    /// Percentage change for a tracked channel.
    #[must_use]
    pub fn increase_pct(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Tvoc => self.tvoc_increase_pct,
            Channel::Eco2 => self.eco2_increase_pct,
            _ => None,
        }
    }
}

/// Result of hysteresis range classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TestRangeResult {
    /// New state, to be persisted on the reading.
    pub status: RangeStatus,
    /// Tags raised this cycle, in the order they were raised.
    pub violations: Vec<Violation>,
}

impl TestRangeResult {
    /// Returns `true` if the given tag was raised.
    #[must_use]
    pub fn has(&self, violation: Violation) -> bool {
        self.violations.contains(&violation)
    }
}
