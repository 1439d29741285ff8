//! `LedgerStore`: the shared handle for the write path and the query engine.
//!
//! Write operations live in [`crate::write`], reads in [`crate::query`] and
//! [`crate::integrity`], each adding methods via `impl LedgerStore` blocks.

use std::sync::Arc;

use ledger_config::{LedgerConfig, QueryConfig, StoreConfig};

use crate::LedgerDb;
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::integrity::ChainKey;

/// Append-only audit store. `Send + Sync`; share it behind an `Arc`.
pub struct LedgerStore {
    db: LedgerDb,
    clock: Arc<dyn Clock>,
    chain: ChainKey,
    query: QueryConfig,
}

impl LedgerStore {
    /// Open the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the config is invalid, the database cannot be
    /// opened, or migrations fail.
    pub async fn open(config: &LedgerConfig) -> Result<Self, StoreError> {
        config.validate()?;
        if !config.integrity.is_configured() {
            tracing::warn!("integrity.secret_key is empty; hash chain is unkeyed");
        }
        let db = LedgerDb::open_local(&config.store).await?;
        let chain = ChainKey::new(&config.integrity.secret_key)?;
        tracing::info!(
            path = %config.store.path,
            in_memory = db.is_in_memory(),
            "ledger store opened"
        );
        Ok(Self {
            db,
            clock: Arc::new(SystemClock),
            chain,
            query: config.query.clone(),
        })
    }

    /// Open a file-backed store at `path` with default settings.
    ///
    /// # Errors
    ///
    /// Same as [`Self::open`].
    pub async fn open_local(path: &str) -> Result<Self, StoreError> {
        let config = LedgerConfig {
            store: StoreConfig {
                path: path.to_string(),
                ..StoreConfig::default()
            },
            ..LedgerConfig::default()
        };
        Self::open(&config).await
    }

    /// Open a process-local in-memory store.
    ///
    /// # Errors
    ///
    /// Same as [`Self::open`].
    pub async fn in_memory() -> Result<Self, StoreError> {
        let config = LedgerConfig {
            store: StoreConfig::in_memory(),
            ..LedgerConfig::default()
        };
        Self::open(&config).await
    }

    /// Replace the time source used for `created_at` and query windows.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn db(&self) -> &LedgerDb {
        &self.db
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) const fn chain_key(&self) -> &ChainKey {
        &self.chain
    }

    pub(crate) const fn query_config(&self) -> &QueryConfig {
        &self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_rejects_invalid_config() {
        let mut config = LedgerConfig {
            store: StoreConfig::in_memory(),
            ..LedgerConfig::default()
        };
        config.query.timeline_page_size = 0;
        let err = LedgerStore::open(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[tokio::test]
    async fn open_local_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.db");
        let store = LedgerStore::open_local(&path.to_string_lossy()).await.unwrap();
        assert!(!store.db().is_in_memory());
        assert!(path.exists());
    }

    #[test]
    fn store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LedgerStore>();
    }
}
