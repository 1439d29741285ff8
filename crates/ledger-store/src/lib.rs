//! # ledger-store
//!
//! Append-only audit log on libSQL (embedded `SQLite` fork, v0.9.29).
//!
//! - Write path: [`LedgerStore::append`] commits a business mutation and its
//!   audit record in one `BEGIN IMMEDIATE` transaction, or neither.
//! - Index layer: resource/time, actor/time, type/time and created_at B-tree
//!   indexes, an inverted index over top-level payload keys, and FTS5.
//! - Query engine: state reconstruction, hot resources, paged actor timelines,
//!   lookups, search, and hash-chain verification.
//!
//! The host database serializes writers; this crate funnels all writes
//! through a single connection behind an async mutex.

pub mod clock;
pub mod error;
pub mod helpers;
pub mod index;
pub mod integrity;
mod migrations;
pub mod query;
pub mod store;
pub mod write;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{QueryError, RejectReason, StoreError, WriteError};
pub use integrity::IntegrityReport;
pub use query::{FieldQuery, HotResource, TimeRange, Timeline, TimelineCursor, TimelinePage};
pub use store::LedgerStore;
pub use write::{BusinessMutation, NoMutation, SqlMutation};

use std::ops::Deref;

use libsql::Builder;
use tokio::sync::{Mutex, MutexGuard};

use ledger_config::StoreConfig;

/// Database handle: the libSQL database, its single writer connection, and
/// read-connection factory.
pub struct LedgerDb {
    db: libsql::Database,
    pub(crate) writer: Mutex<libsql::Connection>,
    in_memory: bool,
    busy_timeout_ms: u64,
}

/// A connection for one read. File-backed stores hand out a fresh connection;
/// in-memory stores lend the shared one under the writer lock.
pub enum ReadConn<'a> {
    Owned(libsql::Connection),
    Shared(MutexGuard<'a, libsql::Connection>),
}

impl Deref for ReadConn<'_> {
    type Target = libsql::Connection;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Owned(conn) => conn,
            Self::Shared(guard) => guard,
        }
    }
}

impl LedgerDb {
    /// Open a local database and run migrations.
    ///
    /// File-backed databases are switched to WAL so readers never block the
    /// writer.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the database cannot be opened, a pragma
    /// fails, or migrations fail.
    pub async fn open_local(config: &StoreConfig) -> Result<Self, StoreError> {
        let db = Builder::new_local(&config.path).build().await?;
        let conn = db.connect()?;
        let in_memory = config.is_in_memory();

        configure_connection(&conn, config.busy_timeout_ms)
            .await
            .map_err(|e| StoreError::Setup(format!("connection pragmas: {e}")))?;
        if !in_memory {
            let mut rows = conn
                .query("PRAGMA journal_mode = WAL", ())
                .await
                .map_err(|e| StoreError::Setup(format!("PRAGMA journal_mode: {e}")))?;
            while rows.next().await?.is_some() {}
        }

        let ledger_db = Self {
            db,
            writer: Mutex::new(conn),
            in_memory,
            busy_timeout_ms: config.busy_timeout_ms,
        };
        ledger_db.run_migrations().await?;
        Ok(ledger_db)
    }

    #[must_use]
    pub const fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    /// Acquire a connection for a read.
    ///
    /// # Errors
    ///
    /// Returns `libsql::Error` if a new connection cannot be configured.
    pub async fn read_conn(&self) -> Result<ReadConn<'_>, libsql::Error> {
        if self.in_memory {
            let guard = self.writer.lock().await;
            recover(&guard).await?;
            return Ok(ReadConn::Shared(guard));
        }
        let conn = self.db.connect()?;
        configure_connection(&conn, self.busy_timeout_ms).await?;
        Ok(ReadConn::Owned(conn))
    }

    /// Run DDL for host business tables on the writer connection.
    ///
    /// Business tables share the database so that mutations and audit
    /// records commit in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Migration` if a statement fails.
    pub async fn apply_schema(&self, sql: &str) -> Result<(), StoreError> {
        let conn = self.writer.lock().await;
        recover(&conn).await?;
        conn.execute_batch(sql)
            .await
            .map_err(|e| StoreError::Migration(format!("host schema: {e}")))?;
        Ok(())
    }

    /// Generate a record id. Returns e.g. `"aud-3f8b2c1d..."` (32 hex chars).
    ///
    /// # Errors
    ///
    /// Returns `libsql::Error` if the query fails.
    pub async fn generate_id(conn: &libsql::Connection) -> Result<String, libsql::Error> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT '{}-' || lower(hex(randomblob(16)))",
                    ledger_core::ids::PREFIX_AUDIT
                ),
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => row.get::<String>(0),
            None => Err(libsql::Error::QueryReturnedNoRows),
        }
    }
}

/// Per-connection pragmas.
async fn configure_connection(
    conn: &libsql::Connection,
    busy_timeout_ms: u64,
) -> Result<(), libsql::Error> {
    conn.execute("PRAGMA foreign_keys = ON", ()).await?;
    // busy_timeout returns a row, so it must go through `query`.
    let mut rows = conn
        .query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"), ())
        .await?;
    while rows.next().await?.is_some() {}
    Ok(())
}

/// Roll back a transaction left open by a cancelled write.
pub(crate) async fn recover(conn: &libsql::Connection) -> Result<(), libsql::Error> {
    if !conn.is_autocommit() {
        tracing::warn!("rolling back transaction left open by a cancelled write");
        conn.execute("ROLLBACK", ()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LedgerDb {
        LedgerDb::open_local(&StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;
        let conn = db.read_conn().await.unwrap();

        for table in ["audit_records", "audit_payload_keys", "audit_fts"] {
            let mut rows = conn
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn indexes_exist() {
        let db = test_db().await;
        let conn = db.read_conn().await.unwrap();

        for index in [
            "idx_audit_resource_time",
            "idx_audit_actor_time",
            "idx_audit_type_time",
            "idx_audit_created",
            "idx_payload_key_value",
        ] {
            let mut rows = conn
                .query(
                    "SELECT name FROM sqlite_master WHERE type='index' AND name=?1",
                    [index],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "index '{index}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn generate_id_correct_format() {
        let db = test_db().await;
        let conn = db.writer.lock().await;
        let id = LedgerDb::generate_id(&conn).await.unwrap();
        assert!(ledger_core::ids::is_record_id(&id), "bad id: {id}");

        let other = LedgerDb::generate_id(&conn).await.unwrap();
        assert_ne!(id, other);
    }

    #[tokio::test]
    async fn file_database_uses_wal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let config = StoreConfig {
            path: path.to_string_lossy().into_owned(),
            ..StoreConfig::default()
        };
        let db = LedgerDb::open_local(&config).await.unwrap();
        let conn = db.read_conn().await.unwrap();
        let mut rows = conn.query("PRAGMA journal_mode", ()).await.unwrap();
        let mode: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn recover_rolls_back_open_transaction() {
        let db = test_db().await;
        let conn = db.writer.lock().await;
        conn.execute("BEGIN", ()).await.unwrap();
        assert!(!conn.is_autocommit());
        recover(&conn).await.unwrap();
        assert!(conn.is_autocommit());
    }
}
