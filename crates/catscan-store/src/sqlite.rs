use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use catscan_types::{Entry, Extension, Identifier};
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::RegistryStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS found_ids (
    id CHAR(6) NOT NULL UNIQUE,
    ext VARCHAR(10) NOT NULL
);
CREATE INDEX IF NOT EXISTS found_ids_ext ON found_ids (ext);
";

/// Configuration for [`SqliteRegistryStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteStoreConfig {
    /// Database file. Created if missing.
    pub path: PathBuf,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Number of read connections. Reads are spread round-robin.
    pub read_connections: usize,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./catbox-scanner-db.db"),
            busy_timeout_ms: 5_000,
            read_connections: 4,
        }
    }
}

impl SqliteStoreConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Durable registry backed by a SQLite file in WAL mode.
///
/// One connection is dedicated to writes; reads use a small pool of separate
/// connections so they proceed while the writer holds its lock. WAL gives
/// readers a consistent snapshot without blocking the writer.
pub struct SqliteRegistryStore {
    path: PathBuf,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl SqliteRegistryStore {
    /// Open or create the database and ensure the schema exists.
    ///
    /// Fails with [`StoreError::Unavailable`] if the file cannot be opened or
    /// the schema cannot be applied.
    pub fn open(config: &SqliteStoreConfig) -> StoreResult<Self> {
        let writer = open_connection(&config.path, config.busy_timeout_ms)?;
        writer
            .execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        writer
            .execute_batch(SCHEMA)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let readers = (0..config.read_connections.max(1))
            .map(|_| open_connection(&config.path, config.busy_timeout_ms).map(Mutex::new))
            .collect::<StoreResult<Vec<_>>>()?;

        info!(path = %config.path.display(), readers = readers.len(), "registry store opened");
        Ok(Self {
            path: config.path.clone(),
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::WriteFailed("writer connection lock poisoned".into()))
    }

    fn reader(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        let slot = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[slot]
            .lock()
            .map_err(|_| StoreError::ReadFailed("reader connection lock poisoned".into()))
    }
}

impl RegistryStore for SqliteRegistryStore {
    fn insert_if_absent(&self, entry: &Entry) -> StoreResult<bool> {
        let conn = self.writer()?;
        let mut stmt = conn
            .prepare_cached("INSERT OR IGNORE INTO found_ids (id, ext) VALUES (?1, ?2)")
            .map_err(write_failed)?;
        let changed = stmt
            .execute(params![entry.identifier().as_str(), entry.extension().as_str()])
            .map_err(write_failed)?;
        Ok(changed > 0)
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.reader()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM found_ids", [], |row| row.get(0))
            .map_err(read_failed)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn sample_random(&self, n: usize, extension: Option<&Extension>) -> StoreResult<Vec<Entry>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let conn = self.reader()?;

        let rows: Vec<(String, String)> = match extension {
            Some(ext) => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT id, ext FROM found_ids WHERE ext = ?1 ORDER BY RANDOM() LIMIT ?2",
                    )
                    .map_err(read_failed)?;
                let mapped = stmt
                    .query_map(params![ext.as_str(), limit], |row| Ok((row.get(0)?, row.get(1)?)))
                    .map_err(read_failed)?;
                let rows = mapped.collect::<Result<_, _>>().map_err(read_failed)?;
                rows
            }
            None => {
                let mut stmt = conn
                    .prepare_cached("SELECT id, ext FROM found_ids ORDER BY RANDOM() LIMIT ?1")
                    .map_err(read_failed)?;
                let mapped = stmt
                    .query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?)))
                    .map_err(read_failed)?;
                let rows = mapped.collect::<Result<_, _>>().map_err(read_failed)?;
                rows
            }
        };

        debug!(requested = n, returned = rows.len(), "sampled registry");
        let entries = rows
            .into_iter()
            .filter_map(|(id, ext)| match Entry::new(id.as_str(), ext.as_str()) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(identifier = %id, extension = %ext, error = %e, "skipping malformed row");
                    None
                }
            })
            .collect();
        Ok(entries)
    }

    fn remove(&self, entry: &Entry) -> StoreResult<bool> {
        let conn = self.writer()?;
        let mut stmt = conn
            .prepare_cached("DELETE FROM found_ids WHERE id = ?1 AND ext = ?2")
            .map_err(write_failed)?;
        let changed = stmt
            .execute(params![entry.identifier().as_str(), entry.extension().as_str()])
            .map_err(write_failed)?;
        Ok(changed > 0)
    }

    fn contains(&self, identifier: &Identifier) -> StoreResult<bool> {
        let conn = self.reader()?;
        let found: i64 = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM found_ids WHERE id = ?1)",
                params![identifier.as_str()],
                |row| row.get(0),
            )
            .map_err(read_failed)?;
        Ok(found != 0)
    }
}

impl std::fmt::Debug for SqliteRegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistryStore")
            .field("path", &self.path)
            .field("readers", &self.readers.len())
            .finish()
    }
}

fn open_connection(path: &Path, busy_timeout_ms: u64) -> StoreResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(conn)
}

fn write_failed(err: rusqlite::Error) -> StoreError {
    StoreError::WriteFailed(err.to_string())
}

fn read_failed(err: rusqlite::Error) -> StoreError {
    StoreError::ReadFailed(err.to_string())
}
