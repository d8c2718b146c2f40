//! Fixed-band classification with hysteresis.
//!
//! The range classifier is a two-state machine (`NORMAL`, `HIGH`) whose state
//! lives on the stored readings: the caller passes in the status persisted on
//! the device's previous reading and stores the returned status on the new
//! one. [`evaluate_range`] is therefore a pure function and can be replayed
//! over any stretch of history.
//!
//! Channels are checked eCO2 first, then TVOC. That order fixes the order of
//! the violation tags.

use knowair_types::{Channel, RangeStatus, TestRangeResult, Violation};

use crate::thresholds::AlertConfig;

/// Compute the next range state.
///
/// - A sudden change forces `HIGH` with a single `sudden_change_detected` tag
///   and skips the band checks.
/// - From `NORMAL`, each channel strictly outside its band raises `HIGH` and
///   adds its tag. Tags accumulate.
/// - From `HIGH`, the device returns to `NORMAL` only when every present
///   channel is inside its shrunk band `[min + hysteresis, max - hysteresis]`.
///   A TVOC value strictly outside its band after eCO2 has recovered is
///   tagged, since TVOC is then checked from `NORMAL`.
///
/// Absent channels are not checked. With both channels absent the previous
/// state carries over.
///
/// # Example
///
/// ```
/// use knowair_core::{AlertConfig, RangeBand, evaluate_range};
/// use knowair_types::{RangeStatus, Violation};
///
/// let mut config = AlertConfig::default();
/// config.eco2 = RangeBand::new(450.0, 550.0, 20.0);
///
/// let result = evaluate_range(RangeStatus::Normal, Some(700.0), Some(50.0), false, &config);
/// assert_eq!(result.status, RangeStatus::High);
/// assert_eq!(result.violations, vec![Violation::Eco2OutOfRange]);
///
/// // Back inside [450, 550] but not yet inside [470, 530]
/// let result = evaluate_range(RangeStatus::High, Some(545.0), Some(50.0), false, &config);
/// assert_eq!(result.status, RangeStatus::High);
/// ```
pub fn evaluate_range(
    previous: RangeStatus,
    eco2_ppm: Option<f64>,
    tvoc_ppb: Option<f64>,
    delta_alert: bool,
    config: &AlertConfig,
) -> TestRangeResult {
    if delta_alert {
        return TestRangeResult {
            status: RangeStatus::High,
            violations: vec![Violation::SuddenChange],
        };
    }

    let values = [(Channel::Eco2, eco2_ppm), (Channel::Tvoc, tvoc_ppb)];
    let present = values
        .iter()
        .filter_map(|&(channel, value)| Some((channel, value?, config.band(channel)?)));

    match previous {
        RangeStatus::Normal => {
            let violations: Vec<Violation> = present
                .filter(|(_, value, band)| band.is_outside(*value))
                .filter_map(|(channel, _, _)| Violation::out_of_range(channel))
                .collect();
            let status = if violations.is_empty() {
                RangeStatus::Normal
            } else {
                RangeStatus::High
            };
            TestRangeResult { status, violations }
        }
        RangeStatus::High => {
            let mut checked = 0;
            let mut recovered = true;
            let mut violations = Vec::new();
            for (channel, value, band) in present {
                // Every channel before this one recovered, so it is checked from NORMAL
                if checked > 0 && recovered && band.is_outside(value) {
                    violations.extend(Violation::out_of_range(channel));
                }
                checked += 1;
                recovered &= band.is_recovered(value);
            }
            let status = if checked > 0 && recovered {
                RangeStatus::Normal
            } else {
                RangeStatus::High
            };
            TestRangeResult { status, violations }
        }
    }
}
