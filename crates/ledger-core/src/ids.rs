//! ID prefix constants.
//!
//! Record IDs are `{prefix}-{32 hex chars}`. The random part is produced by
//! the store inside the write transaction (`lower(hex(randomblob(16)))`).

/// Prefix for audit record IDs.
pub const PREFIX_AUDIT: &str = "aud";

/// Length of the random hex part of a record ID.
pub const RANDOM_HEX_LEN: usize = 32;

/// Identifier of a committed audit record.
pub type RecordId = String;

/// Check that `id` has the shape `{PREFIX_AUDIT}-{32 lowercase hex}`.
#[must_use]
pub fn is_record_id(id: &str) -> bool {
    id.strip_prefix(PREFIX_AUDIT)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| {
            hex.len() == RANDOM_HEX_LEN
                && hex
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}
