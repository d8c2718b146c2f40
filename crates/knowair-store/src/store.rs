//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use knowair_core::{Classification, Classifier, PreviousReading, ReadingHistory};
use knowair_types::{Reading, Status};

use crate::error::{Error, Result};
use crate::models::{StoredDevice, StoredReading, from_millis, to_millis, truncate_to_millis};
use crate::queries::{READING_COLUMNS, ReadingQuery};
use crate::schema;

/// SQLite-based store for classified readings.
///
/// A single `Store` wraps one connection. [`Store::ingest`] runs the
/// history lookups, the classification and the insert in one transaction, so
/// callers that share a store behind a mutex get per-device ordering for free.
pub struct Store {
    conn: Connection,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // === Device operations ===

    /// Get or create a device entry, bumping its `last_seen`.
    pub fn upsert_device(&self, device_id: &str) -> Result<StoredDevice> {
        let now = OffsetDateTime::now_utc().unix_timestamp();

        self.conn.execute(
            "INSERT INTO devices (id, first_seen, last_seen) VALUES (?1, ?2, ?2)
             ON CONFLICT(id) DO UPDATE SET last_seen = ?2",
            rusqlite::params![device_id, now],
        )?;

        self.get_device(device_id)?
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))
    }

    /// Get a device by ID.
    pub fn get_device(&self, device_id: &str) -> Result<Option<StoredDevice>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, first_seen, last_seen FROM devices WHERE id = ?")?;

        let device = stmt.query_row([device_id], device_from_row).optional()?;
        Ok(device)
    }

    /// List all devices, most recently seen first.
    pub fn list_devices(&self) -> Result<Vec<StoredDevice>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, first_seen, last_seen FROM devices ORDER BY last_seen DESC, id")?;

        let devices = stmt
            .query_map([], device_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(devices)
    }
}

// Reading operations
impl Store {
    /// Classify a reading against this store's history and persist it.
    ///
    /// The previous-reading and baseline queries, the classification and the
    /// insert all run in one transaction. An error from any step rolls the
    /// whole ingest back. A reading whose device and timestamp are already
    /// stored is rejected with [`Error::DuplicateReading`].
    pub fn ingest(&self, reading: &Reading, classifier: &Classifier) -> Result<StoredReading> {
        let mut reading = reading.clone();
        reading.timestamp = truncate_to_millis(reading.timestamp);

        let tx = self.conn.unchecked_transaction()?;
        if self.reading_exists(&reading.device_id, reading.timestamp)? {
            return Err(Error::DuplicateReading {
                device_id: reading.device_id,
                timestamp: reading.timestamp,
            });
        }

        let classification = classifier.classify(&reading, self)?;
        let stored = self.insert_row(&reading, Some(&classification))?;
        tx.commit()?;

        if stored.is_alert() || stored.delta_alert {
            info!(
                device_id = %stored.device_id,
                status = ?stored.status,
                delta_alert = stored.delta_alert,
                violations = ?stored.violations,
                "Alert raised"
            );
        }
        Ok(stored)
    }

    /// Persist a reading with a classification computed elsewhere.
    pub fn insert_classified(
        &self,
        reading: &Reading,
        classification: &Classification,
    ) -> Result<StoredReading> {
        let mut reading = reading.clone();
        reading.timestamp = truncate_to_millis(reading.timestamp);
        let tx = self.conn.unchecked_transaction()?;
        let stored = self.insert_row(&reading, Some(classification))?;
        tx.commit()?;
        Ok(stored)
    }

    /// Persist a reading without classification.
    ///
    /// Used when classification could not run; the row carries no status and
    /// the range classifier treats it as `NORMAL` when it is the previous
    /// reading.
    pub fn insert_reading(&self, reading: &Reading) -> Result<StoredReading> {
        let mut reading = reading.clone();
        reading.timestamp = truncate_to_millis(reading.timestamp);
        let tx = self.conn.unchecked_transaction()?;
        let stored = self.insert_row(&reading, None)?;
        tx.commit()?;
        warn!(
            device_id = %stored.device_id,
            "Stored reading without classification"
        );
        Ok(stored)
    }

    fn insert_row(
        &self,
        reading: &Reading,
        classification: Option<&Classification>,
    ) -> Result<StoredReading> {
        self.upsert_device(&reading.device_id)?;

        let mut row = StoredReading::from_reading(reading, classification);
        let violations = serde_json::to_string(&row.violations)?;

        let result = self.conn.execute(
            "INSERT INTO readings (device_id, captured_at_ms, temp_c, humidity_rh,
             pressure_hpa, tvoc_ppb, eco2_ppm, status, score, tvoc_increase_pct,
             eco2_increase_pct, delta_alert, violations)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                row.device_id,
                to_millis(row.captured_at),
                row.temp_c,
                row.humidity_rh,
                row.pressure_hpa,
                row.tvoc_ppb,
                row.eco2_ppm,
                row.status.map(|s| s.as_str()),
                row.score,
                row.tvoc_increase_pct,
                row.eco2_increase_pct,
                row.delta_alert,
                violations,
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(Error::DuplicateReading {
                    device_id: row.device_id,
                    timestamp: row.captured_at,
                });
            }
            Err(e) => return Err(e.into()),
        }

        row.id = self.conn.last_insert_rowid();
        debug!(
            device_id = %row.device_id,
            id = row.id,
            status = ?row.status,
            "Inserted reading"
        );
        Ok(row)
    }

    fn reading_exists(&self, device_id: &str, timestamp: OffsetDateTime) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM readings WHERE device_id = ?1 AND captured_at_ms = ?2)",
            rusqlite::params![device_id, to_millis(timestamp)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Query readings with filters.
    pub fn query_readings(&self, query: &ReadingQuery) -> Result<Vec<StoredReading>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let readings = stmt
            .query_map(params_ref.as_slice(), reading_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Get the latest reading for a device.
    pub fn get_latest_reading(&self, device_id: &str) -> Result<Option<StoredReading>> {
        let query = ReadingQuery::new().device(device_id).limit(1);
        let mut readings = self.query_readings(&query)?;
        Ok(readings.pop())
    }

    /// Get the latest reading for a device that raised an alert.
    pub fn get_latest_alert(&self, device_id: &str) -> Result<Option<StoredReading>> {
        let query = ReadingQuery::new().device(device_id).alerts_only().limit(1);
        let mut readings = self.query_readings(&query)?;
        Ok(readings.pop())
    }

    /// Count readings, optionally for one device.
    pub fn count_readings(&self, device_id: Option<&str>) -> Result<u64> {
        let count: i64 = match device_id {
            Some(id) => self.conn.query_row(
                "SELECT COUNT(*) FROM readings WHERE device_id = ?",
                [id],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?,
        };

        Ok(count.max(0) as u64)
    }
}

impl ReadingHistory for Store {
    type Error = rusqlite::Error;

    fn fetch_window(
        &self,
        device_id: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> std::result::Result<Vec<Reading>, Self::Error> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {READING_COLUMNS} FROM readings
             WHERE device_id = ?1 AND captured_at_ms >= ?2 AND captured_at_ms <= ?3
             ORDER BY captured_at_ms ASC"
        ))?;
        let readings = stmt
            .query_map(
                rusqlite::params![device_id, to_millis(start), to_millis(end)],
                reading_from_row,
            )?
            .map(|row| row.map(|r| r.to_reading()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(readings)
    }

    fn fetch_previous(
        &self,
        device_id: &str,
        before: OffsetDateTime,
    ) -> std::result::Result<Option<PreviousReading>, Self::Error> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {READING_COLUMNS} FROM readings
             WHERE device_id = ?1 AND captured_at_ms < ?2
             ORDER BY captured_at_ms DESC LIMIT 1"
        ))?;
        let row = stmt
            .query_row(
                rusqlite::params![device_id, to_millis(before)],
                reading_from_row,
            )
            .optional()?;
        Ok(row.map(|r| PreviousReading {
            status: r.status,
            reading: r.to_reading(),
        }))
    }
}

fn conversion_error(
    idx: usize,
    ty: rusqlite::types::Type,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

fn timestamp_at(row: &Row<'_>, idx: usize, scale_ms: i64) -> rusqlite::Result<OffsetDateTime> {
    let raw: i64 = row.get(idx)?;
    raw.checked_mul(scale_ms)
        .and_then(from_millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<StoredDevice> {
    Ok(StoredDevice {
        id: row.get(0)?,
        first_seen: timestamp_at(row, 1, 1000)?,
        last_seen: timestamp_at(row, 2, 1000)?,
    })
}

fn reading_from_row(row: &Row<'_>) -> rusqlite::Result<StoredReading> {
    let status = row
        .get::<_, Option<String>>(8)?
        .map(|s| s.parse::<Status>())
        .transpose()
        .map_err(|e| conversion_error(8, rusqlite::types::Type::Text, e))?;
    let violations = serde_json::from_str(&row.get::<_, String>(13)?)
        .map_err(|e| conversion_error(13, rusqlite::types::Type::Text, e))?;

    Ok(StoredReading {
        id: row.get(0)?,
        device_id: row.get(1)?,
        captured_at: timestamp_at(row, 2, 1)?,
        temp_c: row.get(3)?,
        humidity_rh: row.get(4)?,
        pressure_hpa: row.get(5)?,
        tvoc_ppb: row.get(6)?,
        eco2_ppm: row.get(7)?,
        status,
        score: row.get(9)?,
        tvoc_increase_pct: row.get(10)?,
        eco2_increase_pct: row.get(11)?,
        delta_alert: row.get(12)?,
        violations,
    })
}
