//! Rolling baseline estimation.
//!
//! The baseline for a channel is the arithmetic mean of that channel over the
//! device's readings in `[now - window, now]`. Readings missing the channel
//! are skipped for that channel only. A channel with no samples has no
//! baseline, which is distinct from a baseline of zero.

use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::trace;

use knowair_types::{Channel, Reading};

use crate::error::{Error, Result};
use crate::thresholds::AlertConfig;
use crate::traits::ReadingHistory;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Per-channel mean of the readings in a window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Baseline {
    tvoc: Accumulator,
    eco2: Accumulator,
}

impl Baseline {
    /// Fold a set of readings into a baseline.
    pub fn from_readings<'a, I>(readings: I) -> Self
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let mut baseline = Self::default();
        for reading in readings {
            baseline.push(reading);
        }
        baseline
    }

    /// Add one reading.
    pub fn push(&mut self, reading: &Reading) {
        if let Some(tvoc) = reading.tvoc_ppb {
            self.tvoc.push(tvoc);
        }
        if let Some(eco2) = reading.eco2_ppm {
            self.eco2.push(eco2);
        }
    }

    /// Mean for a tracked channel, or `None` when it had no samples.
    pub fn mean(&self, channel: Channel) -> Option<f64> {
        self.accumulator(channel).and_then(Accumulator::mean)
    }

    /// Number of samples that contributed to a channel.
    pub fn samples(&self, channel: Channel) -> usize {
        self.accumulator(channel).map_or(0, |acc| acc.count)
    }

    fn accumulator(&self, channel: Channel) -> Option<&Accumulator> {
        match channel {
            Channel::Tvoc => Some(&self.tvoc),
            Channel::Eco2 => Some(&self.eco2),
            _ => None,
        }
    }
}

/// Estimate the baseline for `device_id` over the window ending at `now`.
///
/// The window is inclusive at both ends. If the reading being classified has
/// already been recorded at `now`, it takes part in its own baseline. A
/// window reaching past the earliest representable instant starts there.
pub fn estimate_baseline<H: ReadingHistory>(
    history: &H,
    device_id: &str,
    now: OffsetDateTime,
    config: &AlertConfig,
) -> Result<Baseline> {
    let start = now
        .checked_sub(config.baseline_window())
        .unwrap_or_else(|| PrimitiveDateTime::MIN.assume_offset(now.offset()));
    let readings = history
        .fetch_window(device_id, start, now)
        .map_err(|e| Error::history("fetch_window", e))?;

    let baseline = Baseline::from_readings(&readings);
    trace!(
        device_id,
        readings = readings.len(),
        eco2 = ?baseline.mean(Channel::Eco2),
        tvoc = ?baseline.mean(Channel::Tvoc),
        "Estimated baseline"
    );
    Ok(baseline)
}
