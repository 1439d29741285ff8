use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::enums::AuditAction;
use crate::ids::RecordId;

/// A committed, immutable audit record.
///
/// Produced only by the store's write path. `seq` is the insertion sequence
/// that breaks `created_at` ties within a resource's history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditRecord {
    pub id: RecordId,
    pub seq: i64,
    pub actor_id: String,
    pub action: AuditAction,
    pub resource_type: Option<String>,
    pub resource_id: String,
    pub old_values: Option<Document>,
    pub new_values: Option<Document>,
    pub created_at: DateTime<Utc>,
    pub previous_hash: String,
    pub hash: String,
}

/// A candidate record submitted to the write path.
///
/// `id`, `created_at` and the hash chain are assigned by the store. `action`
/// is optional so that a candidate decoded from external input can be
/// rejected with `MissingRequiredField` instead of failing to deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NewAuditRecord {
    pub actor_id: String,
    pub action: Option<AuditAction>,
    pub resource_type: Option<String>,
    pub resource_id: String,
    pub old_values: Option<Document>,
    pub new_values: Option<Document>,
}

impl NewAuditRecord {
    #[must_use]
    pub fn builder() -> NewAuditRecordBuilder {
        NewAuditRecordBuilder::default()
    }

    /// A `CREATE` record carrying the new state.
    pub fn create(
        actor_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        new_values: Document,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            action: Some(AuditAction::Create),
            resource_type: Some(resource_type.into()),
            resource_id: resource_id.into(),
            old_values: None,
            new_values: Some(new_values),
        }
    }

    /// An `UPDATE` record carrying both states.
    pub fn update(
        actor_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        old_values: Document,
        new_values: Document,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            action: Some(AuditAction::Update),
            resource_type: Some(resource_type.into()),
            resource_id: resource_id.into(),
            old_values: Some(old_values),
            new_values: Some(new_values),
        }
    }

    /// A `DELETE` record carrying the last state.
    pub fn delete(
        actor_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        old_values: Document,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            action: Some(AuditAction::Delete),
            resource_type: Some(resource_type.into()),
            resource_id: resource_id.into(),
            old_values: Some(old_values),
            new_values: None,
        }
    }
}

/// Builder for [`NewAuditRecord`]. Does not validate; see [`crate::validation::validate`].
#[derive(Debug, Default)]
pub struct NewAuditRecordBuilder {
    record: NewAuditRecord,
}

impl NewAuditRecordBuilder {
    #[must_use]
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.record.actor_id = actor_id.into();
        self
    }

    #[must_use]
    pub const fn action(mut self, action: AuditAction) -> Self {
        self.record.action = Some(action);
        self
    }

    /// Set both the resource type and id.
    #[must_use]
    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.record.resource_type = Some(resource_type.into());
        self.record.resource_id = resource_id.into();
        self
    }

    /// Set only the resource id, leaving the type unset.
    #[must_use]
    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.record.resource_id = resource_id.into();
        self
    }

    #[must_use]
    pub fn old_values(mut self, old_values: Document) -> Self {
        self.record.old_values = Some(old_values);
        self
    }

    #[must_use]
    pub fn new_values(mut self, new_values: Document) -> Self {
        self.record.new_values = Some(new_values);
        self
    }

    #[must_use]
    pub fn build(self) -> NewAuditRecord {
        self.record
    }
}
