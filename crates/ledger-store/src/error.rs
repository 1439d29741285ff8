//! Error types for ledger-store.
//!
//! - `StoreError`: opening the database and running migrations.
//! - `WriteError`: the write path. `Rejected` is final, `Transient` may be
//!   retried by the caller as a whole unit.
//! - `QueryError`: the read path.
//!
//! libSQL errors are classified by [`is_transient`] when converted.

use chrono::{DateTime, Utc};
use thiserror::Error;

use ledger_core::ValidationError;

/// Errors from opening a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Connection setup (pragmas, key material) failed.
    #[error("Store setup failed: {0}")]
    Setup(String),

    /// Invalid configuration handed to the store.
    #[error(transparent)]
    Config(#[from] ledger_config::ConfigError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

/// Why a write was rejected. Not retryable without caller correction.
#[derive(Debug, Error)]
pub enum RejectReason {
    /// The candidate record failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A schema constraint fired (duplicate id, append-only trigger, CHECK).
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The business mutation declined the unit of work.
    #[error("Business mutation rejected: {0}")]
    Mutation(String),

    /// A non-transient storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from [`crate::LedgerStore::append`].
///
/// Either way, neither the business mutation nor the audit record is left
/// behind.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Write rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("Transient storage error: {0}")]
    Transient(String),
}

impl WriteError {
    /// Rejection raised by a business mutation.
    pub fn mutation(reason: impl Into<String>) -> Self {
        Self::Rejected(RejectReason::Mutation(reason.into()))
    }

    /// Whether the caller may retry the whole transactional unit.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<ValidationError> for WriteError {
    fn from(e: ValidationError) -> Self {
        Self::Rejected(RejectReason::Validation(e))
    }
}

impl From<libsql::Error> for WriteError {
    fn from(e: libsql::Error) -> Self {
        if is_transient(&e) {
            return Self::Transient(e.to_string());
        }
        let msg = e.to_string();
        if is_constraint_violation(&msg) {
            Self::Rejected(RejectReason::Constraint(msg))
        } else {
            Self::Rejected(RejectReason::Storage(msg))
        }
    }
}

/// Errors from the query engine.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Reconstruction requested before the resource's first record.
    #[error("No history for {resource_type:?}/{resource_id} at or before {as_of}")]
    NoHistory {
        resource_type: Option<String>,
        resource_id: String,
        as_of: DateTime<Utc>,
    },

    /// Storage temporarily unreachable; the caller may retry.
    #[error("Transient storage error: {0}")]
    Transient(String),

    /// A non-transient storage failure (bad FTS syntax, missing table).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored row could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<libsql::Error> for QueryError {
    fn from(e: libsql::Error) -> Self {
        if is_transient(&e) {
            Self::Transient(e.to_string())
        } else {
            Self::Storage(e.to_string())
        }
    }
}

/// Detect transient lock/availability errors.
///
/// `SQLITE_BUSY` / `SQLITE_LOCKED` surface when another connection holds the
/// write lock past the busy timeout. The Hrana messages are what remote
/// replicas report while nodes are recycled.
pub fn is_transient(e: &libsql::Error) -> bool {
    let msg = e.to_string();
    msg.contains("database is locked")
        || msg.contains("database table is locked")
        || msg.contains("database is busy")
        || msg.contains("SQLITE_BUSY")
        || msg.contains("unable to acquire shared lock")
        || msg.contains("deletion must be in progress")
}

fn is_constraint_violation(msg: &str) -> bool {
    msg.contains("constraint failed") || msg.contains("append-only")
}
