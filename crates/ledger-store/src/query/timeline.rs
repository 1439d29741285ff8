//! Actor timelines: keyset-paginated, ascending `(created_at, id)`.
//!
//! [`LedgerStore::timeline_page`] is the stateless primitive: give it the
//! cursor from the previous page and it returns everything strictly after it.
//! [`Timeline`] wraps it into a lazy pager. On its first fetch the pager pins
//! the newest `seq`, so records committed while it is being consumed do not
//! leak into a walk that started before them.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::AuditRecord;

use crate::error::QueryError;
use crate::helpers::{RECORD_COLUMNS, collect_records, format_datetime};
use crate::store::LedgerStore;

/// Inclusive time bounds. A missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// No bounds.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    #[must_use]
    pub const fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    #[must_use]
    pub const fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end.is_none_or(|e| at <= e)
    }
}

/// Position of the last record a page returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineCursor {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl From<&AuditRecord> for TimelineCursor {
    fn from(record: &AuditRecord) -> Self {
        Self {
            created_at: record.created_at,
            id: record.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePage {
    pub records: Vec<AuditRecord>,
    /// `None` once the timeline is exhausted.
    pub next_cursor: Option<TimelineCursor>,
}

impl LedgerStore {
    /// One page of `actor_id`'s records in `range`, strictly after `after`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` on read failures.
    pub async fn timeline_page(
        &self,
        actor_id: &str,
        range: &TimeRange,
        after: Option<&TimelineCursor>,
        limit: u32,
    ) -> Result<TimelinePage, QueryError> {
        self.fetch_timeline(actor_id, range, after, limit, None).await
    }

    /// A lazy pager over `actor_id`'s records in `range`.
    ///
    /// Nothing is read until the first `next` / `next_page` call.
    #[must_use]
    pub fn timeline(&self, actor_id: impl Into<String>, range: TimeRange) -> Timeline<'_> {
        Timeline {
            store: self,
            actor_id: actor_id.into(),
            range,
            page_size: self.query_config().timeline_page_size.max(1),
            cursor: None,
            horizon: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    async fn fetch_timeline(
        &self,
        actor_id: &str,
        range: &TimeRange,
        after: Option<&TimelineCursor>,
        limit: u32,
        horizon: Option<i64>,
    ) -> Result<TimelinePage, QueryError> {
        if limit == 0 {
            return Ok(TimelinePage {
                records: Vec::new(),
                next_cursor: after.cloned(),
            });
        }

        let mut params: Vec<libsql::Value> = vec![libsql::Value::Text(actor_id.to_string())];
        let mut conditions = vec!["actor_id = ?1".to_string()];

        if let Some(start) = range.start {
            params.push(libsql::Value::Text(format_datetime(&start)));
            conditions.push(format!("created_at >= ?{}", params.len()));
        }
        if let Some(end) = range.end {
            params.push(libsql::Value::Text(format_datetime(&end)));
            conditions.push(format!("created_at <= ?{}", params.len()));
        }
        if let Some(cursor) = after {
            params.push(libsql::Value::Text(format_datetime(&cursor.created_at)));
            let at = params.len();
            params.push(libsql::Value::Text(cursor.id.clone()));
            let id = params.len();
            conditions.push(format!(
                "(created_at > ?{at} OR (created_at = ?{at} AND id > ?{id}))"
            ));
        }
        if let Some(seq) = horizon {
            params.push(libsql::Value::Integer(seq));
            conditions.push(format!("seq <= ?{}", params.len()));
        }

        let fetch = i64::from(limit) + 1;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM audit_records
             WHERE {}
             ORDER BY created_at, id
             LIMIT {fetch}",
            conditions.join(" AND ")
        );

        let conn = self.db().read_conn().await?;
        let rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
        let mut records = collect_records(rows).await?;

        let has_more = records.len() > limit as usize;
        records.truncate(limit as usize);
        let next_cursor = if has_more {
            records.last().map(TimelineCursor::from)
        } else {
            None
        };
        Ok(TimelinePage {
            records,
            next_cursor,
        })
    }

    async fn newest_seq(&self) -> Result<i64, QueryError> {
        let conn = self.db().read_conn().await?;
        let mut rows = conn
            .query("SELECT COALESCE(MAX(seq), 0) FROM audit_records", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}

/// Lazy, finite, restartable pager over an actor's timeline.
///
/// Restart from any point with [`Timeline::starting_after`] and a cursor
/// taken from an earlier page.
pub struct Timeline<'a> {
    store: &'a LedgerStore,
    actor_id: String,
    range: TimeRange,
    page_size: u32,
    cursor: Option<TimelineCursor>,
    horizon: Option<i64>,
    buffer: VecDeque<AuditRecord>,
    exhausted: bool,
}

impl Timeline<'_> {
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Resume strictly after `cursor`.
    #[must_use]
    pub fn starting_after(mut self, cursor: TimelineCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Cursor of the last record fetched from storage.
    #[must_use]
    pub const fn cursor(&self) -> Option<&TimelineCursor> {
        self.cursor.as_ref()
    }

    /// The next record, fetching a page when the buffer runs dry.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if a page fetch fails. The pager can be retried;
    /// its position is unchanged by a failed fetch.
    pub async fn next(&mut self) -> Result<Option<AuditRecord>, QueryError> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = self.fetch().await?;
            self.buffer.extend(page);
        }
        Ok(self.buffer.pop_front())
    }

    /// The next page. Returns an empty page with no cursor once exhausted.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if the fetch fails.
    pub async fn next_page(&mut self) -> Result<TimelinePage, QueryError> {
        let records: Vec<AuditRecord> = if self.buffer.is_empty() {
            if self.exhausted {
                Vec::new()
            } else {
                self.fetch().await?
            }
        } else {
            self.buffer.drain(..).collect()
        };
        let next_cursor = if self.exhausted {
            None
        } else {
            self.cursor.clone()
        };
        Ok(TimelinePage {
            records,
            next_cursor,
        })
    }

    /// Drain the remaining timeline.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if any page fetch fails.
    pub async fn collect_all(mut self) -> Result<Vec<AuditRecord>, QueryError> {
        let mut all = Vec::new();
        while let Some(record) = self.next().await? {
            all.push(record);
        }
        Ok(all)
    }

    async fn fetch(&mut self) -> Result<Vec<AuditRecord>, QueryError> {
        let horizon = match self.horizon {
            Some(seq) => seq,
            None => {
                let seq = self.store.newest_seq().await?;
                self.horizon = Some(seq);
                seq
            }
        };
        let page = self
            .store
            .fetch_timeline(
                &self.actor_id,
                &self.range,
                self.cursor.as_ref(),
                self.page_size,
                Some(horizon),
            )
            .await?;
        if let Some(last) = page.records.last() {
            self.cursor = Some(TimelineCursor::from(last));
        }
        self.exhausted = page.next_cursor.is_none();
        Ok(page.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ledger_core::{Document, NewAuditRecord};
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::{t0, test_store};
    use crate::write::NoMutation;

    async fn seed(store: &LedgerStore, actor: &str, n: usize) -> Vec<AuditRecord> {
        let mut out = Vec::new();
        for i in 0..n {
            let record = NewAuditRecord::create(actor, "DOC", i.to_string(), Document::empty_mapping());
            out.push(store.append(record, NoMutation).await.unwrap());
        }
        out
    }

    fn ids(records: &[AuditRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = TimeRange::between(t0(), t0() + Duration::seconds(10));
        assert!(range.contains(t0()));
        assert!(range.contains(t0() + Duration::seconds(10)));
        assert!(!range.contains(t0() + Duration::seconds(11)));
        assert!(TimeRange::all().contains(t0()));
    }

    #[tokio::test]
    async fn pages_concatenate_to_full_result() {
        let (store, _clock) = test_store().await;
        let expected = seed(&store, "usr-1", 7).await;
        seed(&store, "usr-2", 3).await;

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = store
                .timeline_page("usr-1", &TimeRange::all(), cursor.as_ref(), 3)
                .await
                .unwrap();
            assert!(page.records.len() <= 3);
            seen.extend(page.records);
            match page.next_cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        assert_eq!(ids(&seen), ids(&expected));
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size_ends_cleanly() {
        let (store, _clock) = test_store().await;
        seed(&store, "usr-1", 4).await;
        let first = store.timeline_page("usr-1", &TimeRange::all(), None, 2).await.unwrap();
        let second = store
            .timeline_page("usr-1", &TimeRange::all(), first.next_cursor.as_ref(), 2)
            .await
            .unwrap();
        assert_eq!(second.records.len(), 2);
        assert_eq!(second.next_cursor, None);
    }

    #[tokio::test]
    async fn range_filters_records() {
        let (store, clock) = test_store().await;
        seed(&store, "usr-1", 1).await;
        clock.advance(Duration::seconds(10));
        let middle = seed(&store, "usr-1", 2).await;
        clock.advance(Duration::seconds(10));
        seed(&store, "usr-1", 1).await;

        let range = TimeRange::between(t0() + Duration::seconds(5), t0() + Duration::seconds(15));
        let got = store.timeline("usr-1", range).collect_all().await.unwrap();
        assert_eq!(ids(&got), ids(&middle));
    }

    #[tokio::test]
    async fn pager_is_lazy_and_matches_unpaged() {
        let (store, _clock) = test_store().await;
        let expected = seed(&store, "usr-1", 5).await;

        let mut timeline = store.timeline("usr-1", TimeRange::all()).with_page_size(2);
        assert!(timeline.cursor().is_none());

        let first = timeline.next().await.unwrap().unwrap();
        assert_eq!(first.id, expected[0].id);
        assert_eq!(timeline.cursor().map(|c| c.id.as_str()), Some(expected[1].id.as_str()));

        let mut rest = vec![first];
        while let Some(r) = timeline.next().await.unwrap() {
            rest.push(r);
        }
        assert_eq!(ids(&rest), ids(&expected));
        assert!(timeline.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pager_restarts_from_cursor() {
        let (store, _clock) = test_store().await;
        let expected = seed(&store, "usr-1", 5).await;

        let mut timeline = store.timeline("usr-1", TimeRange::all()).with_page_size(2);
        let page = timeline.next_page().await.unwrap();
        assert_eq!(ids(&page.records), ids(&expected[..2]));
        let cursor = page.next_cursor.unwrap();

        let resumed = store
            .timeline("usr-1", TimeRange::all())
            .starting_after(cursor)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(ids(&resumed), ids(&expected[2..]));
    }

    #[tokio::test]
    async fn pager_ignores_records_committed_after_start() {
        let (store, _clock) = test_store().await;
        let expected = seed(&store, "usr-1", 3).await;

        let mut timeline = store.timeline("usr-1", TimeRange::all()).with_page_size(1);
        let mut seen = vec![timeline.next().await.unwrap().unwrap()];
        seed(&store, "usr-1", 2).await;
        while let Some(r) = timeline.next().await.unwrap() {
            seen.push(r);
        }
        assert_eq!(ids(&seen), ids(&expected));
    }

    #[test]
    fn cursor_serializes() {
        let cursor = TimelineCursor {
            created_at: t0(),
            id: "aud-1".into(),
        };
        let json = serde_json::to_string(&cursor).unwrap();
        let back: TimelineCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cursor);
    }
}
