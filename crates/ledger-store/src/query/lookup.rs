//! Point lookups, resource history, payload-field lookups, and FTS5 search.

use ledger_core::{AuditRecord, Document, PayloadSide};

use crate::error::QueryError;
use crate::helpers::{RECORD_COLUMNS, RECORD_COLUMNS_R, collect_records, row_to_record};
use crate::store::LedgerStore;

/// Match records whose payload has `key` set to exactly `value` at the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldQuery {
    pub key: String,
    pub value: Document,
    /// Restrict to one payload side; `None` matches either.
    pub side: Option<PayloadSide>,
    pub limit: Option<u32>,
}

impl FieldQuery {
    pub fn new(key: impl Into<String>, value: impl Into<Document>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            side: None,
            limit: None,
        }
    }

    #[must_use]
    pub const fn side(mut self, side: PayloadSide) -> Self {
        self.side = Some(side);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl LedgerStore {
    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` on read failures.
    pub async fn get(&self, id: &str) -> Result<Option<AuditRecord>, QueryError> {
        let conn = self.db().read_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM audit_records WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// A resource's records, newest first.
    ///
    /// `limit` defaults to `query.history_limit`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` on read failures.
    pub async fn resource_history(
        &self,
        resource_type: Option<&str>,
        resource_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AuditRecord>, QueryError> {
        let limit = limit.unwrap_or(self.query_config().history_limit);
        let conn = self.db().read_conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM audit_records
                     WHERE resource_type IS ?1 AND resource_id = ?2
                     ORDER BY created_at DESC, seq DESC
                     LIMIT ?3"
                ),
                libsql::params![resource_type, resource_id, i64::from(limit)],
            )
            .await?;
        collect_records(rows).await
    }

    /// Records whose payload carries `query.key == query.value`, oldest first.
    ///
    /// Served by the inverted index; only top-level keys of mapping payloads
    /// are addressable.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` on read failures.
    pub async fn find_by_field(&self, query: &FieldQuery) -> Result<Vec<AuditRecord>, QueryError> {
        let mut params: Vec<libsql::Value> = vec![
            libsql::Value::Text(query.key.clone()),
            libsql::Value::Text(query.value.to_canonical_json()),
        ];
        let mut side_clause = String::new();
        if let Some(side) = query.side {
            params.push(libsql::Value::Text(side.as_str().to_string()));
            side_clause = format!(" AND side = ?{}", params.len());
        }
        let limit = query.limit.unwrap_or(self.query_config().history_limit);

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM audit_records
             WHERE seq IN (
                 SELECT record_seq FROM audit_payload_keys
                 WHERE key = ?1 AND value = ?2{side_clause}
             )
             ORDER BY created_at, seq
             LIMIT {limit}"
        );
        let conn = self.db().read_conn().await?;
        let rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
        collect_records(rows).await
    }

    /// FTS5 search across actor, action, resource and payload text.
    ///
    /// `text` uses FTS5 query syntax; a malformed query is a `Storage` error.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` on read failures.
    pub async fn search(&self, text: &str, limit: u32) -> Result<Vec<AuditRecord>, QueryError> {
        let conn = self.db().read_conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {RECORD_COLUMNS_R}
                     FROM audit_fts
                     JOIN audit_records r ON r.seq = audit_fts.rowid
                     WHERE audit_fts MATCH ?1
                     ORDER BY rank LIMIT ?2"
                ),
                libsql::params![text, i64::from(limit)],
            )
            .await?;
        collect_records(rows).await
    }

    /// Total number of committed records.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` on read failures.
    pub async fn count(&self) -> Result<u64, QueryError> {
        let conn = self.db().read_conn().await?;
        let mut rows = conn.query("SELECT COUNT(*) FROM audit_records", ()).await?;
        let n = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        u64::try_from(n).map_err(|_| QueryError::Corrupt(format!("negative count {n}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::NewAuditRecord;
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::test_store;
    use crate::write::NoMutation;

    fn invoice(status: &str, amount: i64) -> Document {
        Document::mapping([("status", status.into()), ("amount", amount.into())])
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let (store, _clock) = test_store().await;
        assert_eq!(store.get("aud-missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let (store, _clock) = test_store().await;
        let a = store
            .append(NewAuditRecord::create("u", "INVOICE", "42", invoice("draft", 1)), NoMutation)
            .await
            .unwrap();
        let b = store
            .append(
                NewAuditRecord::update("u", "INVOICE", "42", invoice("draft", 1), invoice("sent", 1)),
                NoMutation,
            )
            .await
            .unwrap();
        store
            .append(NewAuditRecord::create("u", "INVOICE", "43", invoice("draft", 2)), NoMutation)
            .await
            .unwrap();

        let history = store.resource_history(Some("INVOICE"), "42", None).await.unwrap();
        assert_eq!(history, vec![b.clone(), a]);

        let latest = store.resource_history(Some("INVOICE"), "42", Some(1)).await.unwrap();
        assert_eq!(latest, vec![b]);
    }

    #[tokio::test]
    async fn find_by_field_uses_exact_values_and_sides() {
        let (store, _clock) = test_store().await;
        let created = store
            .append(NewAuditRecord::create("u", "INVOICE", "42", invoice("draft", 100)), NoMutation)
            .await
            .unwrap();
        let updated = store
            .append(
                NewAuditRecord::update("u", "INVOICE", "42", invoice("draft", 100), invoice("paid", 100)),
                NoMutation,
            )
            .await
            .unwrap();

        let draft = store.find_by_field(&FieldQuery::new("status", "draft")).await.unwrap();
        assert_eq!(draft, vec![created.clone(), updated.clone()]);

        let draft_new = store
            .find_by_field(&FieldQuery::new("status", "draft").side(PayloadSide::New))
            .await
            .unwrap();
        assert_eq!(draft_new, vec![created]);

        let paid = store
            .find_by_field(&FieldQuery::new("status", "paid").side(PayloadSide::Old))
            .await
            .unwrap();
        assert!(paid.is_empty());

        // 100 and "100" are different values.
        let text_amount = store.find_by_field(&FieldQuery::new("amount", "100")).await.unwrap();
        assert!(text_amount.is_empty());
        let int_amount = store.find_by_field(&FieldQuery::new("amount", 100)).await.unwrap();
        assert_eq!(int_amount.len(), 2);
    }

    #[tokio::test]
    async fn search_finds_payload_text() {
        let (store, _clock) = test_store().await;
        let record = store
            .append(
                NewAuditRecord::create(
                    "usr-alice",
                    "INVOICE",
                    "42",
                    Document::mapping([("note", "overdue reminder sent".into())]),
                ),
                NoMutation,
            )
            .await
            .unwrap();
        store
            .append(NewAuditRecord::create("usr-bob", "ORDER", "7", invoice("open", 5)), NoMutation)
            .await
            .unwrap();

        let hits = store.search("overdue", 10).await.unwrap();
        assert_eq!(hits, vec![record]);
        assert_eq!(store.search("ORDER", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn count_tracks_appends() {
        let (store, _clock) = test_store().await;
        assert_eq!(store.count().await.unwrap(), 0);
        store
            .append(NewAuditRecord::create("u", "INVOICE", "1", invoice("draft", 1)), NoMutation)
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
