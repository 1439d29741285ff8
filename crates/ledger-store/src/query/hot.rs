//! Hot-resource ranking: most frequently changed resources in a recent window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::helpers::{format_datetime, parse_datetime};
use crate::store::LedgerStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotResource {
    pub resource_id: String,
    pub change_count: u64,
    pub last_changed_at: DateTime<Utc>,
}

impl LedgerStore {
    /// The `top_n` resources of `resource_type` with the most records whose
    /// `created_at` falls in `[now - window, now]` on the store clock.
    /// The upper end stretches to the newest committed record when that
    /// record is ahead of the clock.
    ///
    /// Ordered by change count (desc), then most recent change (desc), then
    /// `resource_id` (asc). Resources with no change in the window never
    /// appear. `top_n == 0` or a negative window yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` on read failures.
    pub async fn hot_resources(
        &self,
        resource_type: Option<&str>,
        window: Duration,
        top_n: u32,
    ) -> Result<Vec<HotResource>, QueryError> {
        if top_n == 0 || window < Duration::zero() {
            return Ok(Vec::new());
        }
        let conn = self.db().read_conn().await?;

        // Appends clamp `created_at` past the previous record, so the newest
        // one can sit ahead of the clock. The window must still cover it.
        let mut tip_rows = conn
            .query("SELECT MAX(created_at) FROM audit_records", ())
            .await?;
        let tip = match tip_rows.next().await? {
            Some(row) => row
                .get::<Option<String>>(0)?
                .map(|raw| parse_datetime(&raw))
                .transpose()?,
            None => None,
        };
        let now = self.clock().now();
        let until = tip.map_or(now, |tip| tip.max(now));
        let since = now - window;

        let mut rows = conn
            .query(
                "SELECT resource_id, COUNT(*) AS changes, MAX(created_at) AS last_changed
                 FROM audit_records
                 WHERE resource_type IS ?1 AND created_at >= ?2 AND created_at <= ?3
                 GROUP BY resource_id
                 ORDER BY changes DESC, last_changed DESC, resource_id ASC
                 LIMIT ?4",
                libsql::params![
                    resource_type,
                    format_datetime(&since),
                    format_datetime(&until),
                    i64::from(top_n)
                ],
            )
            .await?;

        let mut hot = Vec::new();
        while let Some(row) = rows.next().await? {
            let count = row.get::<i64>(1)?;
            hot.push(HotResource {
                resource_id: row.get::<String>(0)?,
                change_count: u64::try_from(count)
                    .map_err(|_| QueryError::Corrupt(format!("negative change count {count}")))?,
                last_changed_at: parse_datetime(&row.get::<String>(2)?)?,
            });
        }
        Ok(hot)
    }
}
