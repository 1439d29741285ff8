//! Write path: the only way records enter the store.
//!
//! `append` runs validation, then the business mutation, the audit row, and
//! its index postings inside one `BEGIN IMMEDIATE` transaction on the writer
//! connection. Either all of it commits or none of it does. Nothing here
//! retries; `WriteError::Transient` tells the caller a retry of the whole
//! unit may succeed.

mod mutation;

pub use mutation::{BusinessMutation, NoMutation, SqlMutation};

use chrono::{DateTime, Duration, Utc};
use libsql::{Transaction, TransactionBehavior};
use tracing::{debug, warn};

use ledger_core::{AuditRecord, NewAuditRecord, ValidationError, validate};

use crate::LedgerDb;
use crate::error::{QueryError, RejectReason, WriteError};
use crate::helpers::{encode_optional_document, format_datetime, parse_datetime, truncate_micros};
use crate::index::{insert_postings, payload_postings};
use crate::integrity::GENESIS_HASH;
use crate::store::LedgerStore;

impl LedgerStore {
    /// Atomically apply `mutation` and append `record`.
    ///
    /// Returns the committed record with its assigned `id`, `seq`,
    /// `created_at` and hash-chain fields.
    ///
    /// `created_at` is the store clock's time, clamped to strictly after the
    /// newest committed record, so commit order and timestamp order agree.
    ///
    /// # Errors
    ///
    /// - `WriteError::Rejected` for validation failures (before any storage
    ///   access), constraint violations, and mutation rejections.
    /// - `WriteError::Transient` when the database is busy or unavailable.
    pub async fn append<M: BusinessMutation>(
        &self,
        record: NewAuditRecord,
        mutation: M,
    ) -> Result<AuditRecord, WriteError> {
        validate(&record)?;

        let conn = self.db().writer.lock().await;
        crate::recover(&conn).await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        match self.append_in_tx(&tx, record, mutation).await {
            Ok(committed) => {
                if let Err(e) = tx.commit().await {
                    let err = WriteError::from(e);
                    warn!(error = %err, "audit append failed to commit");
                    return Err(err);
                }
                debug!(
                    id = %committed.id,
                    actor = %committed.actor_id,
                    action = %committed.action,
                    resource_type = ?committed.resource_type,
                    resource_id = %committed.resource_id,
                    "audit record committed"
                );
                Ok(committed)
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "rollback failed; connection is recovered on next use");
                }
                warn!(error = %err, "audit append rolled back");
                Err(err)
            }
        }
    }

    async fn append_in_tx<M: BusinessMutation>(
        &self,
        tx: &Transaction,
        record: NewAuditRecord,
        mutation: M,
    ) -> Result<AuditRecord, WriteError> {
        mutation.apply(tx).await?;

        let action = record
            .action
            .ok_or(ValidationError::MissingRequiredField { field: "action" })?;
        let (tip_created_at, previous_hash) = read_tip(tx).await?;
        let created_at = next_timestamp(truncate_micros(self.clock().now()), tip_created_at);
        let id = LedgerDb::generate_id(tx).await?;
        let postings = payload_postings(&record);

        let old_json = encode_optional_document(record.old_values.as_ref());
        let new_json = encode_optional_document(record.new_values.as_ref());
        let mut committed = AuditRecord {
            id,
            seq: 0,
            actor_id: record.actor_id,
            action,
            resource_type: record.resource_type,
            resource_id: record.resource_id,
            old_values: record.old_values.filter(|d| !d.is_null()),
            new_values: record.new_values.filter(|d| !d.is_null()),
            created_at,
            previous_hash,
            hash: String::new(),
        };
        committed.hash = self.chain_key().hash_record(&committed);

        tx.execute(
            "INSERT INTO audit_records
                (id, actor_id, action, resource_type, resource_id,
                 old_values, new_values, created_at, previous_hash, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            libsql::params![
                committed.id.as_str(),
                committed.actor_id.as_str(),
                committed.action.as_str(),
                committed.resource_type.as_deref(),
                committed.resource_id.as_str(),
                old_json,
                new_json,
                format_datetime(&committed.created_at),
                committed.previous_hash.as_str(),
                committed.hash.as_str()
            ],
        )
        .await?;
        committed.seq = tx.last_insert_rowid();

        insert_postings(tx, committed.seq, &postings).await?;
        Ok(committed)
    }
}

/// `created_at` and `hash` of the newest record, or the chain's genesis.
async fn read_tip(tx: &Transaction) -> Result<(Option<DateTime<Utc>>, String), WriteError> {
    let mut rows = tx
        .query(
            "SELECT created_at, hash FROM audit_records ORDER BY seq DESC LIMIT 1",
            (),
        )
        .await?;
    let Some(row) = rows.next().await? else {
        return Ok((None, GENESIS_HASH.to_string()));
    };
    let created_at = parse_datetime(&row.get::<String>(0)?).map_err(corrupt_tip)?;
    Ok((Some(created_at), row.get::<String>(1)?))
}

fn corrupt_tip(e: QueryError) -> WriteError {
    WriteError::Rejected(RejectReason::Storage(e.to_string()))
}

/// Clock time, or one microsecond after the newest record if the clock has
/// not moved past it.
fn next_timestamp(now: DateTime<Utc>, tip: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match tip {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}
