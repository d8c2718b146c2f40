//! Sudden-change detection.
//!
//! A reading is a sudden change when any channel moved by at least its
//! configured threshold since the device's previous reading. Channels missing
//! on either side are not compared. A device's first reading never fires.

use tracing::debug;

use knowair_types::{Channel, Reading};

use crate::error::{Error, Result};
use crate::thresholds::DeltaThresholds;
use crate::traits::{PreviousReading, ReadingHistory};

/// Channels whose change from `previous` to `current` meets its threshold.
pub fn exceeded_channels(
    previous: &Reading,
    current: &Reading,
    thresholds: &DeltaThresholds,
) -> Vec<Channel> {
    Channel::ALL
        .into_iter()
        .filter(|&channel| {
            match (previous.value(channel), current.value(channel)) {
                (Some(prev), Some(cur)) => (cur - prev).abs() >= thresholds.threshold(channel),
                _ => false,
            }
        })
        .collect()
}

/// Compare `current` with an optional previous reading.
pub fn is_sudden_change(
    previous: Option<&Reading>,
    current: &Reading,
    thresholds: &DeltaThresholds,
) -> bool {
    previous.is_some_and(|prev| !exceeded_channels(prev, current, thresholds).is_empty())
}

/// Look up the previous reading and run the delta check.
///
/// Returns the previous reading alongside the verdict so range mode can reuse
/// its stored status without a second query.
pub fn detect_sudden_change<H: ReadingHistory>(
    history: &H,
    current: &Reading,
    thresholds: &DeltaThresholds,
) -> Result<(bool, Option<PreviousReading>)> {
    let previous = history
        .fetch_previous(&current.device_id, current.timestamp)
        .map_err(|e| Error::history("fetch_previous", e))?;

    let Some(prev) = previous.as_ref() else {
        return Ok((false, None));
    };

    let exceeded = exceeded_channels(&prev.reading, current, thresholds);
    if !exceeded.is_empty() {
        debug!(
            device_id = %current.device_id,
            channels = ?exceeded,
            "Sudden change detected"
        );
    }
    Ok((!exceeded.is_empty(), previous))
}
