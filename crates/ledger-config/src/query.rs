//! Query engine defaults.

use serde::{Deserialize, Serialize};

/// Default page size for actor timelines.
const fn default_timeline_page_size() -> u32 {
    100
}

/// Default result limit for resource history.
const fn default_history_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Records fetched per timeline page.
    #[serde(default = "default_timeline_page_size")]
    pub timeline_page_size: u32,

    /// Records returned by `resource_history` when no limit is given.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeline_page_size: default_timeline_page_size(),
            history_limit: default_history_limit(),
        }
    }
}
