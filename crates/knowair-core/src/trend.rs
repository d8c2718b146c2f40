//! Trend classification against the rolling baseline.
//!
//! Each tracked channel's deviation from its baseline is expressed as a
//! signed percentage. Only the largest defined percentage drives the status
//! and the score, so a calm channel never dilutes a spiking one.

use knowair_types::{AlertResult, Channel, Reading, TrendStatus};

use crate::baseline::Baseline;
use crate::thresholds::AlertConfig;

/// Score assigned to a peak exactly at the high cutoff.
pub const HIGH_SCORE: f64 = 80.0;

/// Upper bound of the score.
pub const MAX_SCORE: f64 = 100.0;

/// Signed percentage change of `current` over `baseline`.
///
/// Undefined when either side is absent or the baseline is not positive.
pub fn pct_increase(current: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    let (current, baseline) = (current?, baseline?);
    if baseline <= 0.0 {
        return None;
    }
    let pct = (current - baseline) / baseline * 100.0;
    pct.is_finite().then_some(pct)
}

/// Largest of the defined percentages.
pub fn peak<I>(pcts: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    pcts.into_iter().flatten().reduce(f64::max)
}

/// Map a peak percentage to a status.
pub fn decide_status(peak: Option<f64>, config: &AlertConfig) -> TrendStatus {
    match peak {
        Some(p) if p >= config.high_pct => TrendStatus::High,
        Some(p) if p >= config.warn_pct => TrendStatus::Warn,
        _ => TrendStatus::Ok,
    }
}

/// Map a peak percentage to a score in `[0, 100]`.
///
/// The high cutoff scores exactly [`HIGH_SCORE`]. A non-positive cutoff scores
/// zero.
pub fn compute_score(peak: Option<f64>, config: &AlertConfig) -> f64 {
    match peak {
        Some(p) if config.high_pct > 0.0 => {
            (p / config.high_pct * HIGH_SCORE).clamp(0.0, MAX_SCORE)
        }
        _ => 0.0,
    }
}

/// Classify a reading against its baseline.
pub fn evaluate_trend(reading: &Reading, baseline: &Baseline, config: &AlertConfig) -> AlertResult {
    let tvoc_increase_pct = pct_increase(reading.tvoc_ppb, baseline.mean(Channel::Tvoc));
    let eco2_increase_pct = pct_increase(reading.eco2_ppm, baseline.mean(Channel::Eco2));

    let peak = peak([tvoc_increase_pct, eco2_increase_pct]);

    AlertResult {
        score: compute_score(peak, config),
        status: decide_status(peak, config),
        tvoc_increase_pct,
        eco2_increase_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::OffsetDateTime;

    fn reading() -> Reading {
        Reading::new("node-1", OffsetDateTime::UNIX_EPOCH)
    }

    fn baseline(eco2: Option<f64>, tvoc: Option<f64>) -> Baseline {
        let mut r = reading();
        r.eco2_ppm = eco2;
        r.tvoc_ppb = tvoc;
        Baseline::from_readings(&[r])
    }

    #[test]
    fn test_pct_increase() {
        assert_eq!(pct_increase(Some(650.0), Some(500.0)), Some(30.0));
        assert_eq!(pct_increase(Some(400.0), Some(500.0)), Some(-20.0));
        assert_eq!(pct_increase(Some(100.0), Some(100.0)), Some(0.0));
    }

    #[test]
    fn test_pct_increase_undefined_cases() {
        assert_eq!(pct_increase(None, Some(500.0)), None);
        assert_eq!(pct_increase(Some(500.0), None), None);
        assert_eq!(pct_increase(Some(500.0), Some(0.0)), None);
        assert_eq!(pct_increase(Some(500.0), Some(-1.0)), None);
    }

    #[test]
    fn test_peak_ignores_undefined() {
        assert_eq!(peak([None, None]), None);
        assert_eq!(peak([Some(-5.0), None]), Some(-5.0));
        assert_eq!(peak([Some(10.0), Some(90.0)]), Some(90.0));
    }

    #[test]
    fn test_decide_status_boundaries() {
        let config = AlertConfig::default();
        assert_eq!(decide_status(None, &config), TrendStatus::Ok);
        assert_eq!(decide_status(Some(34.9), &config), TrendStatus::Ok);
        assert_eq!(decide_status(Some(35.0), &config), TrendStatus::Warn);
        assert_eq!(decide_status(Some(79.9), &config), TrendStatus::Warn);
        assert_eq!(decide_status(Some(80.0), &config), TrendStatus::High);
    }

    #[test]
    fn test_score_at_high_cutoff_is_80() {
        let config = AlertConfig::default();
        assert_eq!(compute_score(Some(80.0), &config), 80.0);
        assert_eq!(compute_score(Some(500.0), &config), 100.0);
        assert_eq!(compute_score(Some(-40.0), &config), 0.0);
        assert_eq!(compute_score(None, &config), 0.0);
    }

    #[test]
    fn test_non_positive_high_cutoff_scores_zero() {
        let config = AlertConfig {
            high_pct: 0.0,
            ..AlertConfig::default()
        };
        assert_eq!(compute_score(Some(50.0), &config), 0.0);

        let config = AlertConfig {
            high_pct: -10.0,
            ..AlertConfig::default()
        };
        assert_eq!(compute_score(Some(50.0), &config), 0.0);
    }

    #[test]
    fn test_evaluate_trend_scenario() {
        let reading = reading().with_eco2(650.0).with_tvoc(100.0);
        let result = evaluate_trend(
            &reading,
            &baseline(Some(500.0), Some(100.0)),
            &AlertConfig::default(),
        );

        assert_eq!(result.eco2_increase_pct, Some(30.0));
        assert_eq!(result.tvoc_increase_pct, Some(0.0));
        assert_eq!(result.status, TrendStatus::Ok);
        assert_eq!(result.score, 30.0);
    }

    #[test]
    fn test_spiking_channel_is_not_diluted() {
        let reading = reading().with_eco2(500.0).with_tvoc(200.0);
        let result = evaluate_trend(
            &reading,
            &baseline(Some(500.0), Some(100.0)),
            &AlertConfig::default(),
        );
        assert_eq!(result.tvoc_increase_pct, Some(100.0));
        assert_eq!(result.status, TrendStatus::High);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn test_no_baseline_is_ok() {
        let reading = reading().with_eco2(5000.0);
        let result = evaluate_trend(&reading, &Baseline::default(), &AlertConfig::default());
        assert_eq!(result, AlertResult::default());
    }

    #[test]
    fn test_zero_baseline_does_not_alert() {
        let reading = reading().with_tvoc(50.0);
        let result = evaluate_trend(
            &reading,
            &baseline(None, Some(0.0)),
            &AlertConfig::default(),
        );
        assert_eq!(result.tvoc_increase_pct, None);
        assert_eq!(result.status, TrendStatus::Ok);
    }

    proptest! {
        #[test]
        fn prop_status_is_monotonic(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
            let config = AlertConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(decide_status(Some(lo), &config) <= decide_status(Some(hi), &config));
        }

        #[test]
        fn prop_score_is_bounded_and_non_decreasing(
            a in -1e6f64..1e6,
            b in -1e6f64..1e6,
            high in 0.1f64..500.0,
        ) {
            let config = AlertConfig { high_pct: high, warn_pct: 0.0, ..AlertConfig::default() };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let s_lo = compute_score(Some(lo), &config);
            let s_hi = compute_score(Some(hi), &config);
            prop_assert!((0.0..=MAX_SCORE).contains(&s_lo));
            prop_assert!((0.0..=MAX_SCORE).contains(&s_hi));
            prop_assert!(s_lo <= s_hi);
        }

        #[test]
        fn prop_score_at_cutoff_is_exact(high in 0.1f64..500.0) {
            let config = AlertConfig { high_pct: high, ..AlertConfig::default() };
            prop_assert_eq!(compute_score(Some(high), &config), HIGH_SCORE);
        }
    }
}
