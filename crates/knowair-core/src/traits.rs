//! Trait abstractions over reading history.
//!
//! This module provides the [`ReadingHistory`] trait the classifiers use to
//! look back at a device's earlier readings. The store implements it over
//! SQLite; [`MemoryHistory`](crate::MemoryHistory) implements it in memory
//! for tests.

use time::OffsetDateTime;

use knowair_types::{Reading, Status};

/// The most recent reading strictly before a given instant, together with
/// the status label that was stored for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousReading {
    /// The earlier reading.
    pub reading: Reading,
    /// Persisted status label, if the reading was classified.
    pub status: Option<Status>,
}

/// Read-only view of a device's earlier readings.
///
/// Implementors must not include readings at or after `before` in
/// [`fetch_previous`](Self::fetch_previous), so the reading being classified
/// is never compared with itself.
///
/// # Example
///
/// ```
/// use knowair_core::{MemoryHistory, ReadingHistory};
/// use knowair_types::Reading;
/// use time::macros::datetime;
///
/// let history = MemoryHistory::new();
/// history.record(Reading::new("node-1", datetime!(2025-03-01 10:00 UTC)).with_eco2(500.0));
///
/// let window = history
///     .fetch_window("node-1", datetime!(2025-03-01 09:59 UTC), datetime!(2025-03-01 10:01 UTC))
///     .unwrap();
/// assert_eq!(window.len(), 1);
/// ```
pub trait ReadingHistory {
    /// Backend error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// All readings for `device_id` with `start <= timestamp <= end`.
    fn fetch_window(
        &self,
        device_id: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Reading>, Self::Error>;

    /// The latest reading for `device_id` with `timestamp < before`.
    fn fetch_previous(
        &self,
        device_id: &str,
        before: OffsetDateTime,
    ) -> Result<Option<PreviousReading>, Self::Error>;
}

impl<T: ReadingHistory + ?Sized> ReadingHistory for &T {
    type Error = T::Error;

    fn fetch_window(
        &self,
        device_id: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Reading>, Self::Error> {
        (**self).fetch_window(device_id, start, end)
    }

    fn fetch_previous(
        &self,
        device_id: &str,
        before: OffsetDateTime,
    ) -> Result<Option<PreviousReading>, Self::Error> {
        (**self).fetch_previous(device_id, before)
    }
}
