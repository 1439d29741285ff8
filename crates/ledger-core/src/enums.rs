//! Action kinds and payload sides.
//!
//! All enums serialize to the exact strings stored in SQL, so the store can
//! parse columns back through serde.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Kind of change an audit record describes.
///
/// The payload presence rules per action:
///
/// ```text
/// CREATE  old: absent   new: present
/// UPDATE  old: present  new: present
/// DELETE  old: present  new: absent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Whether `old_values` must be present for this action.
    #[must_use]
    pub const fn requires_old_values(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }

    /// Whether `new_values` must be present for this action.
    #[must_use]
    pub const fn requires_new_values(self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PayloadSide
// ---------------------------------------------------------------------------

/// Which payload of a record a field lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSide {
    Old,
    New,
}

impl PayloadSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Old => "old",
            Self::New => "new",
        }
    }
}

impl fmt::Display for PayloadSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serde_matches_as_str() {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Delete] {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, serde_json::Value::String(action.as_str().to_string()));
            let back: AuditAction = serde_json::from_value(json).unwrap();
            assert_eq!(back, action);
        }
    }

    #[test]
    fn payload_requirements() {
        assert!(!AuditAction::Create.requires_old_values());
        assert!(AuditAction::Create.requires_new_values());
        assert!(AuditAction::Update.requires_old_values());
        assert!(AuditAction::Update.requires_new_values());
        assert!(AuditAction::Delete.requires_old_values());
        assert!(!AuditAction::Delete.requires_new_values());
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", AuditAction::Delete), "DELETE");
        assert_eq!(format!("{}", PayloadSide::New), "new");
    }
}
