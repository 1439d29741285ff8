//! Shared test utilities for ledger-store unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::clock::ManualClock;
    use crate::store::LedgerStore;

    /// Start of every test clock.
    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    /// In-memory store on a manual clock frozen at [`t0`].
    pub async fn test_store() -> (LedgerStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = LedgerStore::in_memory()
            .await
            .unwrap()
            .with_clock(clock.clone());
        (store, clock)
    }
}
