//! Platform-agnostic types for air-quality telemetry.
//!
//! This crate provides the shared types used by the classifier core
//! (knowair-core), the store (knowair-store) and the ingestion service.
//!
//! # Features
//!
//! - Multi-sensor [`Reading`] with optional channels
//! - Classifier outputs: [`AlertResult`] (trend mode) and [`TestRangeResult`]
//!   (range mode)
//! - Persisted [`Status`] labels and [`Violation`] reason tags
//! - Error types for label parsing
//!
//! # Example
//!
//! ```
//! use knowair_types::{Status, TrendStatus, Violation};
//!
//! assert_eq!(Status::from(TrendStatus::Warn).to_string(), "WARN");
//! assert_eq!(Violation::SuddenChange.tag(), "sudden_change_detected");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    AlertResult, Channel, RangeStatus, Reading, Status, TestRangeResult, TrendStatus, Violation,
};
