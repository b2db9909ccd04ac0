//! SQLite-backed record store with lazy expiry
//!
//! Persistence is best-effort by contract: every operation degrades to a
//! negative or empty result instead of raising, and callers must never block
//! primary application flow on it. Failures are logged and swallowed here.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::StoreOptions;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Durable local store over a single SQLite database.
///
/// Cloning hands out another handle to the same connection, so handing a
/// store to the sync queue and the gateway shares one engine. When the
/// engine cannot be opened the store runs degraded: reads return empty,
/// writes report `false`, and nothing panics.
#[derive(Clone)]
pub struct OfflineStore {
    conn: Option<Arc<Mutex<Connection>>>,
}

impl OfflineStore {
    /// Open or create the store at the default platform data location
    pub fn open() -> Self {
        match Self::data_dir() {
            Ok(dir) => Self::open_at(&dir),
            Err(e) => {
                log::error!("Local store unavailable: {}", e);
                Self { conn: None }
            }
        }
    }

    /// Get the store directory path
    fn data_dir() -> Result<PathBuf, String> {
        let base = dirs::data_dir().ok_or("no platform data directory")?;
        Ok(base.join("wildlife-offline"))
    }

    /// Open the store at a specific directory.
    ///
    /// Never fails outward: an unopenable engine produces a degraded handle
    /// whose operations are logged no-ops.
    pub fn open_at(dir: &Path) -> Self {
        match Self::try_open(dir) {
            Ok(conn) => Self {
                conn: Some(Arc::new(Mutex::new(conn))),
            },
            Err(e) => {
                log::error!("Local store unavailable at {}: {}", dir.display(), e);
                Self { conn: None }
            }
        }
    }

    /// In-memory store, used by tests and as a last-resort fallback
    pub fn in_memory() -> Self {
        match Connection::open_in_memory() {
            Ok(conn) => match Self::init_schema(&conn) {
                Ok(()) => Self {
                    conn: Some(Arc::new(Mutex::new(conn))),
                },
                Err(e) => {
                    log::error!("Failed to initialize in-memory store: {}", e);
                    Self { conn: None }
                }
            },
            Err(e) => {
                log::error!("Failed to open in-memory store: {}", e);
                Self { conn: None }
            }
        }
    }

    fn try_open(dir: &Path) -> Result<Connection, String> {
        std::fs::create_dir_all(dir).map_err(|e| format!("failed to create store dir: {}", e))?;

        let db_path = dir.join("store.db");
        let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Store schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| format!("failed to remove stale store: {}", e))?;
            let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
            Self::init_schema(&conn)?;
            return Ok(conn);
        }

        Self::init_schema(&conn)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<(), String> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                payload TEXT NOT NULL,
                expires_at INTEGER,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_expires_at ON records(expires_at);
            "#,
        )
        .map_err(|e| e.to_string())?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Whether a persistence engine is actually backing this handle
    pub fn available(&self) -> bool {
        self.conn.is_some()
    }

    /// Insert or overwrite a record by id within a collection.
    ///
    /// Overwriting keeps the record's original insertion position in
    /// [`get_all`](Self::get_all) enumeration order.
    pub fn put<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
        options: StoreOptions,
    ) -> bool {
        let Some(conn) = &self.conn else {
            return false;
        };

        let payload = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize record {}/{}: {}", collection, id, e);
                return false;
            }
        };

        let now = Utc::now().timestamp_millis();
        let expires_at = options.expiry.map(|d| now + d.as_millis() as i64);

        let result = conn.lock().map(|guard| {
            guard.execute(
                "INSERT INTO records (collection, id, payload, expires_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (collection, id) DO UPDATE SET
                     payload = excluded.payload,
                     expires_at = excluded.expires_at,
                     updated_at = excluded.updated_at",
                params![collection, id, payload, expires_at, now],
            )
        });

        match result {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                log::warn!("Failed to store record {}/{}: {}", collection, id, e);
                false
            }
            Err(_) => false,
        }
    }

    /// Get a record, or `None` if absent or expired.
    ///
    /// An expired record is deleted as a side effect of the read.
    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Option<T> {
        let Some(conn) = &self.conn else {
            return None;
        };
        let guard = conn.lock().ok()?;

        let row: Option<(String, Option<i64>)> = guard
            .query_row(
                "SELECT payload, expires_at FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .unwrap_or_else(|e| {
                log::warn!("Failed to read record {}/{}: {}", collection, id, e);
                None
            });

        let (payload, expires_at) = row?;
        if is_expired(expires_at) {
            let _ = guard.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            );
            return None;
        }

        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Corrupt record {}/{}: {}", collection, id, e);
                None
            }
        }
    }

    /// All non-expired records in a collection, in insertion order.
    ///
    /// Expired records encountered during the scan are deleted.
    pub fn get_all<T: DeserializeOwned>(&self, collection: &str) -> Vec<T> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };
        let Ok(guard) = conn.lock() else {
            return Vec::new();
        };

        let rows: Vec<(String, String, Option<i64>)> = {
            let mut stmt = match guard.prepare(
                "SELECT id, payload, expires_at FROM records
                 WHERE collection = ?1 ORDER BY rowid",
            ) {
                Ok(stmt) => stmt,
                Err(e) => {
                    log::warn!("Failed to scan collection {}: {}", collection, e);
                    return Vec::new();
                }
            };

            let mapped = stmt.query_map(params![collection], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            });
            match mapped {
                Ok(iter) => iter.filter_map(|r| r.ok()).collect(),
                Err(e) => {
                    log::warn!("Failed to scan collection {}: {}", collection, e);
                    return Vec::new();
                }
            }
        };

        let mut valid = Vec::new();
        let mut expired = Vec::new();
        for (id, payload, expires_at) in rows {
            if is_expired(expires_at) {
                expired.push(id);
                continue;
            }
            match serde_json::from_str(&payload) {
                Ok(value) => valid.push(value),
                Err(e) => log::warn!("Corrupt record {}/{}: {}", collection, id, e),
            }
        }

        for id in expired {
            let _ = guard.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            );
        }

        valid
    }

    /// Remove a record. Idempotent: absent records are not an error.
    pub fn delete(&self, collection: &str, id: &str) -> bool {
        let Some(conn) = &self.conn else {
            return false;
        };

        let result = conn.lock().map(|guard| {
            guard.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
        });

        match result {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                log::warn!("Failed to delete record {}/{}: {}", collection, id, e);
                false
            }
            Err(_) => false,
        }
    }

    /// Remove every record in a collection
    pub fn clear(&self, collection: &str) -> bool {
        let Some(conn) = &self.conn else {
            return false;
        };

        let result = conn.lock().map(|guard| {
            guard.execute(
                "DELETE FROM records WHERE collection = ?1",
                params![collection],
            )
        });

        match result {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                log::warn!("Failed to clear collection {}: {}", collection, e);
                false
            }
            Err(_) => false,
        }
    }
}

fn is_expired(expires_at: Option<i64>) -> bool {
    match expires_at {
        Some(at) => at <= Utc::now().timestamp_millis(),
        None => false,
    }
}
