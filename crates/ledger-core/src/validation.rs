//! Candidate record validation.
//!
//! Runs before a record reaches storage. Required fields are checked first
//! (actor, action, resource id), then payload presence against the action,
//! then that every number in the payloads has a JSON encoding.
//! A payload that is JSON `null` counts as absent: it serializes the same way.

use crate::document::Document;
use crate::entities::NewAuditRecord;
use crate::errors::ValidationError;

/// Validate a candidate record.
///
/// # Errors
///
/// - `MissingRequiredField` if `actor_id` or `resource_id` is blank, or `action` is unset.
/// - `InvalidActionPayload` if `old_values` / `new_values` presence does not match the action.
/// - `NonFinitePayload` if either payload holds NaN or an infinity at any depth.
pub fn validate(record: &NewAuditRecord) -> Result<(), ValidationError> {
    if record.actor_id.trim().is_empty() {
        return Err(ValidationError::MissingRequiredField { field: "actor_id" });
    }
    let Some(action) = record.action else {
        return Err(ValidationError::MissingRequiredField { field: "action" });
    };
    if record.resource_id.trim().is_empty() {
        return Err(ValidationError::MissingRequiredField {
            field: "resource_id",
        });
    }

    match (action.requires_old_values(), is_present(record.old_values.as_ref())) {
        (true, false) => {
            return Err(ValidationError::InvalidActionPayload {
                action,
                reason: "old_values must be present",
            });
        }
        (false, true) => {
            return Err(ValidationError::InvalidActionPayload {
                action,
                reason: "old_values must be absent",
            });
        }
        _ => {}
    }

    match (action.requires_new_values(), is_present(record.new_values.as_ref())) {
        (true, false) => {
            return Err(ValidationError::InvalidActionPayload {
                action,
                reason: "new_values must be present",
            });
        }
        (false, true) => {
            return Err(ValidationError::InvalidActionPayload {
                action,
                reason: "new_values must be absent",
            });
        }
        _ => {}
    }

    for (field, payload) in [
        ("old_values", record.old_values.as_ref()),
        ("new_values", record.new_values.as_ref()),
    ] {
        if payload.is_some_and(|doc| !doc.is_finite()) {
            return Err(ValidationError::NonFinitePayload { field });
        }
    }
    Ok(())
}

/// Whether a payload counts as present (set and not JSON `null`).
#[must_use]
pub fn is_present(payload: Option<&Document>) -> bool {
    payload.is_some_and(|doc| !doc.is_null())
}
