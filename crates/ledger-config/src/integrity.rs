//! Hash-chain configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntegrityConfig {
    /// HMAC key for the record hash chain. Set via `LEDGER_INTEGRITY__SECRET_KEY`.
    #[serde(default)]
    pub secret_key: String,
}

impl IntegrityConfig {
    /// Check whether a non-empty key is configured.
    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }
}
