//! Entity structs for the audit ledger.
//!
//! `AuditRecord` maps to the `audit_records` table. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and schema
//! validation.

mod record;
mod state;

pub use record::{AuditRecord, NewAuditRecord, NewAuditRecordBuilder};
pub use state::ResourceState;
