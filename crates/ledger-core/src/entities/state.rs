use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::document::Document;

/// A resource's state as of some point in time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "status", content = "values", rename_all = "snake_case")]
pub enum ResourceState {
    /// The resource exists with these field values.
    Present(Document),
    /// The resource has been deleted.
    Absent,
}

impl ResourceState {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn values(&self) -> Option<&Document> {
        match self {
            Self::Present(doc) => Some(doc),
            Self::Absent => None,
        }
    }
}
