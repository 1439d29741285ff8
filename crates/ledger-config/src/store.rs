//! Storage configuration for the libSQL host database.

use serde::{Deserialize, Serialize};

/// Path used for in-memory databases.
pub const IN_MEMORY_PATH: &str = ":memory:";

fn default_path() -> String {
    "ledger.db".to_string()
}

/// Default busy timeout in milliseconds.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Database file path, or `:memory:` for a process-local store.
    #[serde(default = "default_path")]
    pub path: String,

    /// How long a connection waits on a locked database before reporting busy.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Config for a process-local in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: IN_MEMORY_PATH.to_string(),
            ..Self::default()
        }
    }

    /// Whether the store lives only in memory (single shared connection).
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}
