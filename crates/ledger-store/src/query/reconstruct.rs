//! State-at-time reconstruction.
//!
//! A resource's state is a left fold over its records in `(created_at, seq)`
//! order. Nothing is cached; every call re-reads the log.

use chrono::{DateTime, Utc};

use ledger_core::{AuditAction, AuditRecord, ResourceState};

use crate::error::QueryError;
use crate::helpers::{RECORD_COLUMNS, collect_records, format_datetime};
use crate::store::LedgerStore;

/// Apply one record to a state. CREATE and UPDATE yield the record's new
/// values, DELETE yields `Absent`.
///
/// Each record carries the full post-change state, so it replaces the prior
/// state entirely; the previous state is accepted only to fit `fold`.
#[must_use]
pub fn apply(_state: Option<ResourceState>, record: &AuditRecord) -> Option<ResourceState> {
    match (record.action, record.new_values.as_ref()) {
        (AuditAction::Delete, _) | (_, None) => Some(ResourceState::Absent),
        (_, Some(values)) => Some(ResourceState::Present(values.clone())),
    }
}

/// Fold ordered records into a state. `None` if there are no records.
pub fn fold_state<'a, I>(records: I) -> Option<ResourceState>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    records.into_iter().fold(None, apply)
}

/// State as of `as_of`: fold of the prefix of `records` at or before the cutoff.
///
/// `records` must be in `(created_at, seq)` order.
pub fn state_at<'a, I>(records: I, as_of: DateTime<Utc>) -> Option<ResourceState>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    fold_state(records.into_iter().take_while(|r| r.created_at <= as_of))
}

impl LedgerStore {
    /// The resource's state as of `as_of` (inclusive).
    ///
    /// # Errors
    ///
    /// - `QueryError::NoHistory` if the resource has no record at or before `as_of`.
    /// - `QueryError::Transient` / `Storage` / `Corrupt` on read failures.
    pub async fn reconstruct(
        &self,
        resource_type: Option<&str>,
        resource_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<ResourceState, QueryError> {
        let conn = self.db().read_conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM audit_records
                     WHERE resource_type IS ?1 AND resource_id = ?2 AND created_at <= ?3
                     ORDER BY created_at, seq"
                ),
                libsql::params![resource_type, resource_id, format_datetime(&as_of)],
            )
            .await?;

        let records = collect_records(rows).await?;

        fold_state(&records).ok_or_else(|| QueryError::NoHistory {
            resource_type: resource_type.map(str::to_string),
            resource_id: resource_id.to_string(),
            as_of,
        })
    }
}
