//! Per-transaction-id serialization.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutex map. Holding the guard for a transaction id gives
/// exclusive right to read-modify-write that flow's ledger row.
///
/// Entries are created on first use and kept for the process lifetime; the
/// per-entry cost is one `Arc<Mutex<()>>`.
#[derive(Default)]
pub struct TxnLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TxnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one transaction id, waiting if a sibling task
    /// holds it.
    pub async fn acquire(&self, transaction_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(transaction_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
