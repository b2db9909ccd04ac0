//! SQLite-backed response cache with versioned namespaces
//!
//! Entries live in named namespaces (`wildlife-static-v1`,
//! `wildlife-dynamic-v1`, ...). Rotation is by name: activation calls
//! [`retain`](ResponseCache::retain) with the current names and every other
//! namespace is dropped wholesale. Entries carry no TTL; they persist until
//! their namespace rotates away or they are overwritten.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// A stored response snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Response cache shared by every namespace.
///
/// Like the local store, the cache is best-effort: an unopenable engine
/// degrades to a handle whose reads miss and whose writes are logged no-ops,
/// so caching failures can never break the response path.
#[derive(Clone)]
pub struct ResponseCache {
    conn: Option<Arc<Mutex<Connection>>>,
}

impl ResponseCache {
    /// Open or create the cache at a specific directory
    pub fn open_at(dir: &Path) -> Self {
        match Self::try_open(dir) {
            Ok(conn) => Self {
                conn: Some(Arc::new(Mutex::new(conn))),
            },
            Err(e) => {
                log::error!("Response cache unavailable at {}: {}", dir.display(), e);
                Self { conn: None }
            }
        }
    }

    /// In-memory cache, used by tests
    pub fn in_memory() -> Self {
        match Connection::open_in_memory() {
            Ok(conn) => match Self::init_schema(&conn) {
                Ok(()) => Self {
                    conn: Some(Arc::new(Mutex::new(conn))),
                },
                Err(e) => {
                    log::error!("Failed to initialize in-memory response cache: {}", e);
                    Self { conn: None }
                }
            },
            Err(e) => {
                log::error!("Failed to open in-memory response cache: {}", e);
                Self { conn: None }
            }
        }
    }

    fn try_open(dir: &Path) -> Result<Connection, String> {
        std::fs::create_dir_all(dir).map_err(|e| format!("failed to create cache dir: {}", e))?;

        let db_path = dir.join("responses.db");
        let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Response cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| format!("failed to remove stale cache: {}", e))?;
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
            CREATE TABLE IF NOT EXISTS responses (
                namespace TEXT NOT NULL,
                request_key TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers TEXT NOT NULL,
                body BLOB NOT NULL,
                stored_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, request_key)
            );

            CREATE INDEX IF NOT EXISTS idx_responses_namespace ON responses(namespace);
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

    /// Look up a cached response
    pub fn get(&self, namespace: &str, key: &str) -> Option<CachedResponse> {
        let conn = self.conn.as_ref()?;
        let guard = conn.lock().ok()?;

        let row: Option<(u16, String, Vec<u8>)> = guard
            .query_row(
                "SELECT status, headers, body FROM responses
                 WHERE namespace = ?1 AND request_key = ?2",
                params![namespace, key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .unwrap_or_else(|e| {
                log::warn!("Failed to read cached response {}: {}", key, e);
                None
            });

        let (status, headers_json, body) = row?;
        let headers = serde_json::from_str(&headers_json).unwrap_or_default();

        Some(CachedResponse {
            status,
            headers,
            body,
        })
    }

    /// Store a response snapshot, overwriting any prior entry for the key
    pub fn put(&self, namespace: &str, key: &str, url: &str, response: &CachedResponse) -> bool {
        let Some(conn) = &self.conn else {
            return false;
        };

        let headers_json = match serde_json::to_string(&response.headers) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize headers for {}: {}", url, e);
                return false;
            }
        };

        let result = conn.lock().map(|guard| {
            guard.execute(
                "INSERT OR REPLACE INTO responses
                 (namespace, request_key, url, status, headers, body, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    namespace,
                    key,
                    url,
                    response.status,
                    headers_json,
                    response.body,
                    Utc::now().timestamp_millis(),
                ],
            )
        });

        match result {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                log::warn!("Failed to cache response for {}: {}", url, e);
                false
            }
            Err(_) => false,
        }
    }

    /// Namespaces currently present in storage
    pub fn namespaces(&self) -> Vec<String> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };
        let Ok(guard) = conn.lock() else {
            return Vec::new();
        };

        let mut stmt = match guard.prepare("SELECT DISTINCT namespace FROM responses") {
            Ok(stmt) => stmt,
            Err(e) => {
                log::warn!("Failed to list cache namespaces: {}", e);
                return Vec::new();
            }
        };

        match stmt.query_map([], |row| row.get(0)) {
            Ok(iter) => iter.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                log::warn!("Failed to list cache namespaces: {}", e);
                Vec::new()
            }
        }
    }

    /// Delete every namespace not in `current`. Returns the number of
    /// entries removed.
    pub fn retain(&self, current: &[String]) -> usize {
        let Some(conn) = &self.conn else {
            return 0;
        };
        let Ok(guard) = conn.lock() else {
            return 0;
        };

        let mut removed = 0;
        for namespace in self.namespaces_locked(&guard) {
            if current.contains(&namespace) {
                continue;
            }
            match guard.execute(
                "DELETE FROM responses WHERE namespace = ?1",
                params![namespace],
            ) {
                Ok(count) => {
                    log::info!("Deleting stale cache namespace {} ({} entries)", namespace, count);
                    removed += count;
                }
                Err(e) => log::warn!("Failed to delete namespace {}: {}", namespace, e),
            }
        }
        removed
    }

    fn namespaces_locked(&self, guard: &Connection) -> Vec<String> {
        let mut stmt = match guard.prepare("SELECT DISTINCT namespace FROM responses") {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        match stmt.query_map([], |row| row.get(0)) {
            Ok(iter) => iter.filter_map(|r| r.ok()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
