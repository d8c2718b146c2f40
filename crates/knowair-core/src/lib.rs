//! Per-device anomaly classification for air-quality telemetry.
//!
//! This crate decides, for every new reading, whether it is an anomaly worth
//! surfacing and how severe it is. It combines three detectors:
//!
//! - **Baseline estimation**: rolling mean of TVOC and eCO2 over a window
//! - **Sudden-change detection**: sample-to-sample jump on any channel
//! - **Classification**, in one of two modes:
//!   - *trend*: percentage deviation from the baseline mapped to
//!     `OK`/`WARN`/`HIGH` and a 0-100 score
//!   - *range*: fixed operating bands with hysteresis, `NORMAL`/`HIGH`, where a
//!     sudden change forces `HIGH`
//!
//! The crate performs no I/O. Earlier readings come from a [`ReadingHistory`]
//! supplied by the caller, and the range classifier's state is the status
//! stored on the device's previous reading, so classification can be replayed
//! from history at any time.
//!
//! # Concurrency
//!
//! A [`Classifier`] holds only its configuration and may be shared across
//! threads. Calls for distinct devices are independent. Calls for the same
//! device must be serialized, each reading stored before the next is
//! classified, or two readings may race on the same previous status.
//!
//! # Quick Start
//!
//! ```
//! use knowair_core::{AlertConfig, AlertMode, Classifier, MemoryHistory};
//! use knowair_types::{Reading, Status};
//! use time::macros::datetime;
//!
//! let classifier = Classifier::new(AlertConfig::default(), AlertMode::Trend);
//! let history = MemoryHistory::new();
//!
//! for (step, eco2) in [(0, 500.0), (1, 505.0)] {
//!     let ts = datetime!(2025-03-01 10:00 UTC) + time::Duration::seconds(step * 20);
//!     history.ingest(&classifier, Reading::new("node-1", ts).with_eco2(eco2)).unwrap();
//! }
//!
//! let next = Reading::new("node-1", datetime!(2025-03-01 10:00:40 UTC)).with_eco2(520.0);
//! let c = classifier.classify(&next, &history).unwrap();
//! assert_eq!(c.status(), Status::Ok);
//! ```

pub mod baseline;
pub mod classifier;
pub mod delta;
pub mod error;
pub mod mock;
pub mod range;
pub mod thresholds;
pub mod traits;
pub mod trend;

pub use baseline::{Baseline, estimate_baseline};
pub use classifier::{AlertMode, Classification, Classifier, Outcome};
pub use delta::{detect_sudden_change, exceeded_channels, is_sudden_change};
pub use error::{ConfigIssue, Error, Result};
pub use mock::{MemoryHistory, MemoryHistoryError};
pub use range::evaluate_range;
pub use thresholds::{AlertConfig, DeltaThresholds, MAX_BASELINE_WINDOW_SECS, RangeBand};
pub use traits::{PreviousReading, ReadingHistory};
pub use trend::{compute_score, decide_status, evaluate_trend, pct_increase};

// Re-export types for convenience
pub use knowair_types;
pub use knowair_types::{
    AlertResult, Channel, RangeStatus, Reading, Status, TestRangeResult, TrendStatus, Violation,
};
