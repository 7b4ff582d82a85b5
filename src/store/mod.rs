// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Snapshot persistence for the incident collection
//!
//! The whole collection is stored as one JSON document under a single key.
//! Every save replaces the previous snapshot; there are no partial writes.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::incident::Incident;
use crate::{FlareError, Result};

/// Key/value snapshot store (thread-safe wrapper)
#[derive(Clone)]
pub struct IncidentStore {
    conn: Arc<Mutex<Connection>>,
    key: String,
}

impl IncidentStore {
    /// Open or create the store
    pub fn open<P: AsRef<Path>>(path: P, key: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, key)
    }

    /// Open an in-memory store (for testing)
    pub fn in_memory(key: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, key)
    }

    fn with_connection(conn: Connection, key: &str) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            key: key.to_string(),
        };
        store.initialize()?;
        Ok(store)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| FlareError::Config("Store lock poisoned".to_string()))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                saved_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#)?;
        Ok(())
    }

    /// Overwrite the snapshot with the entire collection.
    ///
    /// Never fails from the caller's point of view: errors are logged and the
    /// previous snapshot stays in place.
    pub fn save(&self, incidents: &[Incident]) {
        if let Err(e) = self.try_save(incidents) {
            warn!("Failed to save incident snapshot: {}", e);
        }
    }

    /// Overwrite the snapshot, reporting failures
    pub fn try_save(&self, incidents: &[Incident]) -> Result<()> {
        let encoded = encode_snapshot(incidents)?;
        let conn = self.lock_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO snapshots (key, value, saved_at)
               VALUES (?1, ?2, datetime('now'))"#,
            params![self.key, encoded],
        )?;
        debug!("Saved {} incidents under '{}'", incidents.len(), self.key);
        Ok(())
    }

    /// Read the snapshot back. Missing or unreadable data yields an empty collection.
    pub fn load(&self) -> Vec<Incident> {
        match self.read_raw() {
            Ok(Some(raw)) => decode_snapshot(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read incident snapshot: {}", e);
                Vec::new()
            }
        }
    }

    /// Remove every incident
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM snapshots WHERE key = ?1", params![self.key])?;
        Ok(())
    }

    fn read_raw(&self) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT value FROM snapshots WHERE key = ?1",
            params![self.key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    #[cfg(test)]
    fn write_raw(&self, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO snapshots (key, value) VALUES (?1, ?2)",
            params![self.key, value],
        )?;
        Ok(())
    }
}

/// Serialize a collection into the snapshot format.
///
/// JSON has no encoding for NaN or infinity, so a collection holding a
/// non-finite coordinate is rejected instead of being written as `null`.
pub fn encode_snapshot(incidents: &[Incident]) -> Result<String> {
    if let Some(bad) = incidents
        .iter()
        .find(|i| !i.latitude.is_finite() || !i.longitude.is_finite())
    {
        return Err(FlareError::InvalidSubmission(format!(
            "incident {} has non-finite coordinates ({}, {})",
            bad.id, bad.latitude, bad.longitude
        )));
    }
    Ok(serde_json::to_string(incidents)?)
}

/// Parse a snapshot; malformed input yields an empty collection
pub fn decode_snapshot(raw: &str) -> Vec<Incident> {
    match serde_json::from_str(raw) {
        Ok(incidents) => incidents,
        Err(e) => {
            warn!("Discarding malformed incident snapshot: {}", e);
            Vec::new()
        }
    }
}
