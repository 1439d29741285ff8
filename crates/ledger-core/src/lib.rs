//! # ledger-core
//!
//! Record model for the audit ledger.
//!
//! - `AuditRecord`: the committed, immutable audit entry
//! - `NewAuditRecord`: a candidate submitted to the write path, plus builder
//! - `Document`: the semi-structured `old_values` / `new_values` payload tree
//! - `AuditAction`, `PayloadSide`: action kinds and payload selectors
//! - `ResourceState`: result of state-at-time reconstruction
//! - `validate`: action/payload presence rules, checked before storage

pub mod document;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod validation;

pub use document::{Document, Scalar};
pub use entities::{AuditRecord, NewAuditRecord, NewAuditRecordBuilder, ResourceState};
pub use enums::{AuditAction, PayloadSide};
pub use errors::ValidationError;
pub use validation::validate;
