//! Ledger service.
//!
//! Typed facade over the [`DocumentStore`] port. Owns the key scheme and
//! the JSON codec; callers never touch raw bytes. All writes are
//! whole-row upserts keyed by the record's id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared_types::{Negotiation, TransactionRecord, Workload, WorkloadStatus, ZoneRecord};

use crate::errors::StoreError;
use crate::ports::DocumentStore;

const TXN_PREFIX: &str = "txn:";
const WORKLOAD_PREFIX: &str = "wl:";
const ZONE_PREFIX: &str = "zone:";
const NEGOTIATION_PREFIX: &str = "neg:";

/// Typed persistence facade shared by every subsystem.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn DocumentStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn encode<T: serde::Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::codec(key, e))
    }

    fn decode<T: serde::de::DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::codec(key, e))
    }

    // --- Transactions -----------------------------------------------------

    /// Upsert a transaction row. Racing writers converge on the last write.
    pub fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let key = format!("{TXN_PREFIX}{}", record.transaction_id);
        let bytes = Self::encode(&key, record)?;
        self.store.put(key.as_bytes(), &bytes)?;
        tracing::debug!(
            "[gw-01] Upserted transaction {} (state: {})",
            record.transaction_id,
            record.state
        );
        Ok(())
    }

    /// Look up a transaction row by id.
    pub fn get_transaction(&self, transaction_id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        let key = format!("{TXN_PREFIX}{transaction_id}");
        match self.store.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// All pending flows last touched before `cutoff`, for the reaper.
    pub fn pending_transactions_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut stalled = Vec::new();
        for (key, bytes) in self.store.prefix_scan(TXN_PREFIX.as_bytes())? {
            let key = String::from_utf8_lossy(&key).into_owned();
            let record: TransactionRecord = Self::decode(&key, &bytes)?;
            if record.state.is_pending() && record.updated_at < cutoff {
                stalled.push(record);
            }
        }
        Ok(stalled)
    }

    // --- Workloads ---------------------------------------------------------

    /// Upsert a workload row.
    pub fn upsert_workload(&self, workload: &Workload) -> Result<(), StoreError> {
        let key = format!("{WORKLOAD_PREFIX}{}", workload.workload_id);
        let bytes = Self::encode(&key, workload)?;
        self.store.put(key.as_bytes(), &bytes)
    }

    /// Look up a workload by id.
    pub fn get_workload(&self, workload_id: &str) -> Result<Option<Workload>, StoreError> {
        let key = format!("{WORKLOAD_PREFIX}{workload_id}");
        match self.store.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Up to `limit` workloads still in `Submitted`, in key order.
    pub fn unprocessed_workloads(&self, limit: usize) -> Result<Vec<Workload>, StoreError> {
        let mut batch = Vec::new();
        for (key, bytes) in self.store.prefix_scan(WORKLOAD_PREFIX.as_bytes())? {
            if batch.len() >= limit {
                break;
            }
            let key = String::from_utf8_lossy(&key).into_owned();
            let workload: Workload = Self::decode(&key, &bytes)?;
            if workload.status == WorkloadStatus::Submitted {
                batch.push(workload);
            }
        }
        Ok(batch)
    }

    // --- Zones -------------------------------------------------------------

    /// Register (or replace) a grid zone.
    pub fn put_zone(&self, zone: &ZoneRecord) -> Result<(), StoreError> {
        let key = format!("{ZONE_PREFIX}{}", zone.zone_id);
        let bytes = Self::encode(&key, zone)?;
        self.store.put(key.as_bytes(), &bytes)
    }

    /// Resolve a zone by human-readable name, case-insensitively.
    pub fn resolve_zone(&self, name: &str) -> Result<Option<ZoneRecord>, StoreError> {
        let wanted = name.trim().to_lowercase();
        for (key, bytes) in self.store.prefix_scan(ZONE_PREFIX.as_bytes())? {
            let key = String::from_utf8_lossy(&key).into_owned();
            let zone: ZoneRecord = Self::decode(&key, &bytes)?;
            if zone.name.to_lowercase() == wanted {
                return Ok(Some(zone));
            }
        }
        Ok(None)
    }

    /// The zone with the smallest id, used as the deterministic fallback
    /// when a catalog entry names no resolvable zone.
    pub fn first_zone(&self) -> Result<Option<ZoneRecord>, StoreError> {
        match self.store.prefix_scan(ZONE_PREFIX.as_bytes())?.into_iter().next() {
            Some((key, bytes)) => {
                let key = String::from_utf8_lossy(&key).into_owned();
                Ok(Some(Self::decode(&key, &bytes)?))
            }
            None => Ok(None),
        }
    }

    // --- Negotiations ------------------------------------------------------

    /// Persist the aggregate record of a completed flow.
    pub fn record_negotiation(&self, negotiation: &Negotiation) -> Result<(), StoreError> {
        let key = format!("{NEGOTIATION_PREFIX}{}", negotiation.transaction_id);
        let bytes = Self::encode(&key, negotiation)?;
        self.store.put(key.as_bytes(), &bytes)
    }

    /// Look up a completed-flow record by transaction id.
    pub fn get_negotiation(&self, transaction_id: &str) -> Result<Option<Negotiation>, StoreError> {
        let key = format!("{NEGOTIATION_PREFIX}{transaction_id}");
        match self.store.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }
}
