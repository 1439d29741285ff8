//! Inverted index over top-level payload keys.
//!
//! One posting per top-level key of `old_values` (`side = 'old'`) and
//! `new_values` (`side = 'new'`). Values are stored as canonical JSON, so an
//! equality lookup on `(key, value)` is exact for any value shape.
//! Postings are written inside the append transaction; there is no other
//! insert path.

use ledger_core::{Document, NewAuditRecord, PayloadSide};

/// One inverted-index row, before it is tied to a record `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub side: PayloadSide,
    pub key: String,
    pub value: String,
}

/// Postings for a candidate record.
///
/// Non-mapping payloads and JSON `null` payloads contribute nothing.
#[must_use]
pub fn payload_postings(record: &NewAuditRecord) -> Vec<Posting> {
    let sides = [
        (PayloadSide::Old, record.old_values.as_ref()),
        (PayloadSide::New, record.new_values.as_ref()),
    ];
    sides
        .into_iter()
        .filter_map(|(side, doc)| doc.map(|d| (side, d)))
        .flat_map(|(side, doc)| postings_for(side, doc))
        .collect()
}

fn postings_for(side: PayloadSide, doc: &Document) -> impl Iterator<Item = Posting> + '_ {
    doc.top_level_entries().map(move |(key, value)| Posting {
        side,
        key: key.to_string(),
        value: value.to_canonical_json(),
    })
}

/// Insert postings for a freshly inserted record.
///
/// # Errors
///
/// Returns `libsql::Error` if an insert fails; the caller rolls back.
pub async fn insert_postings(
    conn: &libsql::Connection,
    record_seq: i64,
    postings: &[Posting],
) -> Result<(), libsql::Error> {
    for posting in postings {
        conn.execute(
            "INSERT INTO audit_payload_keys (record_seq, side, key, value) VALUES (?1, ?2, ?3, ?4)",
            libsql::params![
                record_seq,
                posting.side.as_str(),
                posting.key.as_str(),
                posting.value.as_str()
            ],
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn update_posts_both_sides() {
        let record = NewAuditRecord::update(
            "usr-1",
            "INVOICE",
            "42",
            Document::mapping([("amount", 100.into()), ("status", "draft".into())]),
            Document::mapping([("amount", 150.into())]),
        );
        let postings = payload_postings(&record);
        assert_eq!(
            postings,
            vec![
                Posting { side: PayloadSide::Old, key: "amount".into(), value: "100".into() },
                Posting { side: PayloadSide::Old, key: "status".into(), value: r#""draft""#.into() },
                Posting { side: PayloadSide::New, key: "amount".into(), value: "150".into() },
            ]
        );
    }

    #[test]
    fn nested_values_are_posted_as_canonical_json() {
        let owner = Document::mapping([("name", "b".into()), ("id", "u1".into())]);
        let record = NewAuditRecord::create(
            "usr-1",
            "INVOICE",
            "42",
            Document::mapping([("owner", owner)]),
        );
        let postings = payload_postings(&record);
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].value, r#"{"id":"u1","name":"b"}"#);
    }

    #[test]
    fn non_mapping_payloads_have_no_postings() {
        let record = NewAuditRecord::create("usr-1", "COUNTER", "c1", Document::from(7));
        assert!(payload_postings(&record).is_empty());
    }
}
