//! Record-model error types.
//!
//! Storage errors (`WriteError`, `QueryError`) live in `ledger-store`; this
//! module only covers what can be decided without touching storage.

use thiserror::Error;

use crate::enums::AuditAction;

/// A candidate record failed validation. Caller error; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `actor_id`, `resource_id`, or `action` is missing or blank.
    #[error("Missing required field: {field}")]
    MissingRequiredField { field: &'static str },

    /// `old_values` / `new_values` presence does not match the action kind.
    #[error("Invalid payload for {action}: {reason}")]
    InvalidActionPayload {
        action: AuditAction,
        reason: &'static str,
    },

    /// A payload contains NaN or an infinity, which JSON cannot represent.
    #[error("Non-finite number in {field}")]
    NonFinitePayload { field: &'static str },
}
