//! Query builder for stored readings.
//!
//! # Example
//!
//! ```
//! use knowair_store::{Store, ReadingQuery};
//! use time::{OffsetDateTime, Duration};
//!
//! let store = Store::open_in_memory()?;
//! let last_hour = OffsetDateTime::now_utc() - Duration::hours(1);
//!
//! let query = ReadingQuery::new()
//!     .device("node-001")
//!     .since(last_hour)
//!     .limit(50)
//!     .oldest_first();
//!
//! let readings = store.query_readings(&query)?;
//! # Ok::<(), knowair_store::Error>(())
//! ```

use time::OffsetDateTime;

use crate::models::to_millis;

/// Columns selected for a [`StoredReading`](crate::StoredReading), in the
/// order the row mapper reads them.
pub(crate) const READING_COLUMNS: &str = "id, device_id, captured_at_ms, temp_c, humidity_rh, \
     pressure_hpa, tvoc_ppb, eco2_ppm, status, score, tvoc_increase_pct, eco2_increase_pct, \
     delta_alert, violations";

/// Fluent query builder for readings.
///
/// Use this to construct queries for [`Store::query_readings`](crate::Store::query_readings).
/// All filter methods are optional and can be chained in any order.
///
/// By default, queries return results ordered by capture time descending
/// (newest first).
#[derive(Debug, Default, Clone)]
pub struct ReadingQuery {
    /// Filter by device ID.
    pub device_id: Option<String>,
    /// Include only readings at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only readings at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Include only readings stored as `WARN` or `HIGH`.
    pub alerts_only: bool,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by capture time descending (newest first).
    pub newest_first: bool,
}

impl ReadingQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No device filter (all devices)
    /// - No time range filter
    /// - No limit (all matching records)
    /// - Ordered by newest first
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter by device ID.
    pub fn device(mut self, device_id: &str) -> Self {
        self.device_id = Some(device_id.to_string());
        self
    }

    /// Filter to readings captured at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to readings captured at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Only return readings whose stored status is an alert.
    pub fn alerts_only(mut self) -> Self {
        self.alerts_only = true;
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref device_id) = self.device_id {
            conditions.push("device_id = ?");
            params.push(Box::new(device_id.clone()));
        }

        if let Some(since) = self.since {
            conditions.push("captured_at_ms >= ?");
            params.push(Box::new(to_millis(since)));
        }

        if let Some(until) = self.until {
            conditions.push("captured_at_ms <= ?");
            params.push(Box::new(to_millis(until)));
        }

        if self.alerts_only {
            conditions.push("status IN ('WARN', 'HIGH')");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT {READING_COLUMNS} FROM readings {where_clause} ORDER BY captured_at_ms {order}"
        );

        // SQLite requires a LIMIT before OFFSET
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        sql
    }
}
