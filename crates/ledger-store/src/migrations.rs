//! Database migration runner.
//!
//! Embeds the SQL migration files at compile time and executes them on
//! database open. All statements use `IF NOT EXISTS` for idempotent re-running.

use crate::LedgerDb;
use crate::error::StoreError;

/// Initial schema: records, payload postings, FTS5, indexes, append-only triggers.
const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");

impl LedgerDb {
    /// Run all embedded migrations in sequence on the writer connection.
    pub(crate) async fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.writer.lock().await;
        conn.execute_batch(MIGRATION_001)
            .await
            .map_err(|e| StoreError::Migration(format!("001_initial: {e}")))?;
        Ok(())
    }
}
