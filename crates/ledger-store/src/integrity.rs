//! Tamper-evident hash chain over committed records.
//!
//! Each record stores the `hash` of the record before it (by `seq`) as
//! `previous_hash`, or [`GENESIS_HASH`] for the first record, and its own
//! `hash = HMAC-SHA256(key, previous_hash ":" canonical-json(fields))`.
//! Rewriting any stored field breaks the record's own hash; removing or
//! reordering records breaks the link of the next one.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use ledger_core::AuditRecord;

use crate::error::{QueryError, StoreError};
use crate::helpers::{RECORD_COLUMNS, format_datetime, row_to_record};
use crate::store::LedgerStore;

/// `previous_hash` of the first record.
pub const GENESIS_HASH: &str = "genesis";

/// Result of walking the chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub total_records: u64,
    pub valid: bool,
    /// `seq` of the first record whose link or hash does not verify.
    pub first_invalid: Option<i64>,
    pub message: String,
}

/// Keyed HMAC, built once per store and cloned per record.
#[derive(Clone)]
pub struct ChainKey {
    mac: Hmac<Sha256>,
}

impl std::fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChainKey(..)")
    }
}

impl ChainKey {
    /// # Errors
    ///
    /// Returns `StoreError::Setup` if the key is rejected by the MAC.
    pub fn new(secret: &str) -> Result<Self, StoreError> {
        let mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|e| StoreError::Setup(format!("integrity key: {e}")))?;
        Ok(Self { mac })
    }

    /// Hash a record against its `previous_hash`. The record's own `hash`
    /// field is ignored.
    #[must_use]
    pub fn hash_record(&self, record: &AuditRecord) -> String {
        let mut mac = self.mac.clone();
        mac.update(record.previous_hash.as_bytes());
        mac.update(b":");
        mac.update(hashed_fields(record).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Canonical JSON of the hashed fields, keys sorted.
fn hashed_fields(record: &AuditRecord) -> String {
    let payload = |doc: Option<&ledger_core::Document>| {
        doc.filter(|d| !d.is_null())
            .map_or(Value::Null, |d| Value::String(d.to_canonical_json()))
    };
    let fields: BTreeMap<&str, Value> = BTreeMap::from([
        ("id", Value::String(record.id.clone())),
        ("actor", Value::String(record.actor_id.clone())),
        ("action", Value::String(record.action.as_str().to_string())),
        (
            "resource",
            Value::String(format!(
                "{}:{}",
                record.resource_type.as_deref().unwrap_or(""),
                record.resource_id
            )),
        ),
        ("timestamp", Value::String(format_datetime(&record.created_at))),
        ("old", payload(record.old_values.as_ref())),
        ("new", payload(record.new_values.as_ref())),
    ]);
    serde_json::to_string(&fields).unwrap_or_default()
}

impl LedgerStore {
    /// Walk every record in `seq` order and verify links and hashes.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if the scan fails or a row cannot be decoded.
    pub async fn verify_integrity(&self) -> Result<IntegrityReport, QueryError> {
        let conn = self.db().read_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM audit_records ORDER BY seq"),
                (),
            )
            .await?;

        let mut total_records = 0_u64;
        let mut expected_prev = GENESIS_HASH.to_string();
        let mut failure: Option<(i64, String)> = None;

        while let Some(row) = rows.next().await? {
            total_records += 1;
            if failure.is_some() {
                continue;
            }
            let record = row_to_record(&row)?;
            if record.previous_hash != expected_prev {
                failure = Some((
                    record.seq,
                    format!(
                        "chain broken at seq {}: expected previous_hash '{expected_prev}', found '{}'",
                        record.seq, record.previous_hash
                    ),
                ));
                continue;
            }
            let recomputed = self.chain_key().hash_record(&record);
            if recomputed != record.hash {
                failure = Some((
                    record.seq,
                    format!(
                        "hash mismatch at seq {}: stored '{}', computed '{recomputed}'",
                        record.seq, record.hash
                    ),
                ));
                continue;
            }
            expected_prev = record.hash;
        }

        let report = match failure {
            Some((seq, message)) => IntegrityReport {
                total_records,
                valid: false,
                first_invalid: Some(seq),
                message,
            },
            None if total_records == 0 => IntegrityReport {
                total_records,
                valid: true,
                first_invalid: None,
                message: "ledger is empty".to_string(),
            },
            None => IntegrityReport {
                total_records,
                valid: true,
                first_invalid: None,
                message: format!("all {total_records} records verified"),
            },
        };
        if !report.valid {
            tracing::warn!(first_invalid = ?report.first_invalid, "{}", report.message);
        }
        Ok(report)
    }
}
