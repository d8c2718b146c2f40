//! SQLite persistence for classified air-quality readings.
//!
//! This crate stores readings together with the classification attached at
//! ingest time, and serves as the [`ReadingHistory`](knowair_core::ReadingHistory)
//! the classifier looks back at.
//!
//! # Features
//!
//! - Ingest a reading: history lookups, classification and insert in one
//!   transaction
//! - Device registry with first/last seen times
//! - Query by device, time range, alert status, with pagination
//! - Duplicate `(device, timestamp)` readings are rejected
//!
//! # Example
//!
//! ```
//! use knowair_core::{AlertConfig, AlertMode, Classifier};
//! use knowair_store::{ReadingQuery, Store};
//! use knowair_types::{Reading, Status};
//! use time::macros::datetime;
//!
//! let store = Store::open_in_memory()?;
//! let classifier = Classifier::new(AlertConfig::default(), AlertMode::Range);
//!
//! let reading = Reading::new("node-001", datetime!(2025-03-01 10:00 UTC))
//!     .with_eco2(700.0)
//!     .with_tvoc(40.0);
//! let stored = store.ingest(&reading, &classifier)?;
//! assert_eq!(stored.status, Some(Status::High));
//!
//! let readings = store.query_readings(&ReadingQuery::new().device("node-001"))?;
//! assert_eq!(readings.len(), 1);
//! # Ok::<(), knowair_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::{StoredDevice, StoredReading};
pub use queries::ReadingQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/knowair/data.db`
/// - macOS: `~/Library/Application Support/knowair/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\knowair\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("knowair")
        .join("data.db")
}
