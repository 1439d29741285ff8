//! Row-to-entity parsing helpers.
//!
//! `created_at` is written as fixed-width RFC 3339 UTC with microseconds
//! (`2026-02-09T14:30:00.000000Z`) so TEXT comparison in SQL matches
//! chronological order. Every read path decodes rows through [`row_to_record`].

use chrono::{DateTime, SecondsFormat, Utc};

use ledger_core::{AuditRecord, Document};

use crate::error::QueryError;

/// Column list matching [`row_to_record`]'s indices.
pub const RECORD_COLUMNS: &str = "seq, id, actor_id, action, resource_type, resource_id, \
     old_values, new_values, created_at, previous_hash, hash";

/// [`RECORD_COLUMNS`] qualified with the `r.` alias, for joins.
pub const RECORD_COLUMNS_R: &str = "r.seq, r.id, r.actor_id, r.action, r.resource_type, \
     r.resource_id, r.old_values, r.new_values, r.created_at, r.previous_hash, r.hash";

/// Format a timestamp the way it is stored.
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drop sub-microsecond precision so a timestamp survives a storage round trip.
#[must_use]
pub fn truncate_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(dt.timestamp_micros()).unwrap_or(dt)
}

/// Parse a stored TEXT timestamp.
///
/// # Errors
///
/// Returns `QueryError::Corrupt` if the string is not RFC 3339.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, QueryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| QueryError::Corrupt(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// # Errors
///
/// Returns `QueryError::Corrupt` if the string does not match any variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, QueryError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| QueryError::Corrupt(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `QueryError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, QueryError> {
    Ok(row.get::<Option<String>>(idx)?)
}

/// Decode an optional payload column.
///
/// # Errors
///
/// Returns `QueryError::Corrupt` if the column holds invalid JSON.
pub fn parse_optional_document(s: Option<&str>) -> Result<Option<Document>, QueryError> {
    s.map(|s| {
        Document::from_json(s)
            .map_err(|e| QueryError::Corrupt(format!("Invalid payload JSON: {e}")))
    })
    .transpose()
}

/// Encode an optional payload for storage. JSON `null` is stored as SQL NULL.
#[must_use]
pub fn encode_optional_document(doc: Option<&Document>) -> Option<String> {
    doc.filter(|d| !d.is_null()).map(Document::to_canonical_json)
}

/// Decode a row selected with [`RECORD_COLUMNS`].
///
/// # Errors
///
/// Returns `QueryError::Corrupt` for unparseable columns.
pub fn row_to_record(row: &libsql::Row) -> Result<AuditRecord, QueryError> {
    Ok(AuditRecord {
        seq: row.get::<i64>(0)?,
        id: row.get::<String>(1)?,
        actor_id: row.get::<String>(2)?,
        action: parse_enum(&row.get::<String>(3)?)?,
        resource_type: get_opt_string(row, 4)?,
        resource_id: row.get::<String>(5)?,
        old_values: parse_optional_document(get_opt_string(row, 6)?.as_deref())?,
        new_values: parse_optional_document(get_opt_string(row, 7)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        previous_hash: row.get::<String>(9)?,
        hash: row.get::<String>(10)?,
    })
}

/// Drain a row cursor into records.
///
/// # Errors
///
/// Returns `QueryError` on a read or decode failure.
pub async fn collect_records(mut rows: libsql::Rows) -> Result<Vec<AuditRecord>, QueryError> {
    let mut records = Vec::new();
    while let Some(row) = rows.next().await? {
        records.push(row_to_record(&row)?);
    }
    Ok(records)
}
