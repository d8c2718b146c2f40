//! In-memory reading history.
//!
//! [`MemoryHistory`] implements [`ReadingHistory`] over a per-device list
//! kept in timestamp order. It backs the classifier tests and suits callers
//! that keep recent history in memory instead of a database.
//!
//! # Features
//!
//! - **Failure injection**: make every query fail to exercise error paths
//! - **Classified entries**: store a status with each reading to drive range mode

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

use time::OffsetDateTime;

use knowair_types::{Reading, Status};

use crate::classifier::{Classification, Classifier};
use crate::error::Result;
use crate::traits::{PreviousReading, ReadingHistory};

/// Error returned by [`MemoryHistory`] when failure injection is on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MemoryHistoryError(String);

#[derive(Debug, Clone)]
struct Entry {
    reading: Reading,
    status: Option<Status>,
}

/// In-memory [`ReadingHistory`].
///
/// # Example
///
/// ```
/// use knowair_core::{MemoryHistory, ReadingHistory};
/// use knowair_types::{Reading, Status};
/// use time::macros::datetime;
///
/// let history = MemoryHistory::new();
/// history.push(
///     Reading::new("node-1", datetime!(2025-03-01 10:00 UTC)).with_eco2(700.0),
///     Some(Status::High),
/// );
///
/// let prev = history
///     .fetch_previous("node-1", datetime!(2025-03-01 10:01 UTC))
///     .unwrap()
///     .unwrap();
/// assert_eq!(prev.status, Some(Status::High));
/// ```
#[derive(Debug, Default)]
pub struct MemoryHistory {
    devices: RwLock<HashMap<String, Vec<Entry>>>,
    should_fail: AtomicBool,
    query_count: AtomicU32,
}

impl MemoryHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading with an optional status label.
    ///
    /// Entries stay ordered by timestamp regardless of insertion order. A
    /// reading with the same timestamp as an existing one is placed after it.
    pub fn push(&self, reading: Reading, status: Option<Status>) {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        let entries = devices.entry(reading.device_id.clone()).or_default();
        let at = entries.partition_point(|e| e.reading.timestamp <= reading.timestamp);
        entries.insert(at, Entry { reading, status });
    }

    /// Store an unclassified reading.
    pub fn record(&self, reading: Reading) {
        self.push(reading, None);
    }

    /// Classify `reading` against this history, then store it with its status.
    pub fn ingest(&self, classifier: &Classifier, reading: Reading) -> Result<Classification> {
        let classification = classifier.classify(&reading, self)?;
        self.push(reading, Some(classification.status()));
        Ok(classification)
    }

    /// Number of readings stored for a device.
    pub fn len(&self, device_id: &str) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .map_or(0, Vec::len)
    }

    /// Returns `true` if nothing is stored for any device.
    pub fn is_empty(&self) -> bool {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(Vec::is_empty)
    }

    /// Make every query fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Number of queries served so far, including failed ones.
    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::Relaxed)
    }

    fn check(&self, operation: &str) -> std::result::Result<(), MemoryHistoryError> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(MemoryHistoryError(format!("injected failure in {operation}")));
        }
        Ok(())
    }
}

impl ReadingHistory for MemoryHistory {
    type Error = MemoryHistoryError;

    fn fetch_window(
        &self,
        device_id: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> std::result::Result<Vec<Reading>, Self::Error> {
        self.check("fetch_window")?;
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(devices
            .get(device_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.reading.timestamp >= start && e.reading.timestamp <= end)
                    .map(|e| e.reading.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_previous(
        &self,
        device_id: &str,
        before: OffsetDateTime,
    ) -> std::result::Result<Option<PreviousReading>, Self::Error> {
        self.check("fetch_previous")?;
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(devices.get(device_id).and_then(|entries| {
            entries
                .iter()
                .rev()
                .find(|e| e.reading.timestamp < before)
                .map(|e| PreviousReading {
                    reading: e.reading.clone(),
                    status: e.status,
                })
        }))
    }
}
