//! # Storage Port
//!
//! Abstract interface for the document store plus the two shipped
//! adapters. The port only requires upsert, point lookup, delete, and
//! prefix scan; anything richer (secondary indexes, SQL) stays behind the
//! host application's own adapter.

use crate::errors::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Abstract interface for keyed document storage.
///
/// Production: [`FileBackedStore`].
/// Testing: [`InMemoryStore`].
///
/// `put` is an upsert: writing an existing key replaces the value, which is
/// what makes ledger writes idempotent under races.
pub trait DocumentStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Upsert a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// Iterate over key-value pairs with a prefix, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// In-memory document store for unit tests.
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut results: Vec<_> = self
            .data
            .read()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }
}

/// File-backed document store for production.
///
/// Persists the full map to a binary file on every write, via an atomic
/// temp-file rename so a crash mid-write never leaves a torn file. Suited
/// to the engine's write rates (a handful of upserts per flow step).
pub struct FileBackedStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    path: std::path::PathBuf,
}

impl FileBackedStore {
    /// Open (or create) the store at `path`, loading any existing records.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match Self::load(&path) {
            Some(map) => {
                tracing::info!(
                    "[gw-01] Loaded {} records from {}",
                    map.len(),
                    path.display()
                );
                map
            }
            None => {
                tracing::info!("[gw-01] No existing ledger file at {}", path.display());
                HashMap::new()
            }
        };
        Ok(Self {
            data: RwLock::new(data),
            path,
        })
    }

    // Record layout: [key_len:u32 le][key][value_len:u32 le][value], repeated.
    fn load(path: &std::path::Path) -> Option<HashMap<Vec<u8>, Vec<u8>>> {
        let bytes = std::fs::read(path).ok()?;
        let mut data = HashMap::new();
        let mut cursor = 0usize;

        while cursor + 4 <= bytes.len() {
            let key_len = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().ok()?) as usize;
            cursor += 4;
            if cursor + key_len > bytes.len() {
                break;
            }
            let key = bytes[cursor..cursor + key_len].to_vec();
            cursor += key_len;

            if cursor + 4 > bytes.len() {
                break;
            }
            let value_len =
                u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().ok()?) as usize;
            cursor += 4;
            if cursor + value_len > bytes.len() {
                break;
            }
            let value = bytes[cursor..cursor + value_len].to_vec();
            cursor += value_len;

            data.insert(key, value);
        }

        Some(data)
    }

    fn flush(&self, data: &HashMap<Vec<u8>, Vec<u8>>) -> Result<(), StoreError> {
        use std::io::Write;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::io)?;
        }

        let mut bytes = Vec::new();
        for (key, value) in data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(StoreError::io)?;
        file.write_all(&bytes).map_err(StoreError::io)?;
        file.sync_all().map_err(StoreError::io)?;
        std::fs::rename(&temp_path, &self.path).map_err(StoreError::io)?;

        Ok(())
    }
}

impl DocumentStore for FileBackedStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.insert(key.to_vec(), value.to_vec());
        self.flush(&data)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.remove(key);
        self.flush(&data)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut results: Vec<_> = self
            .data
            .read()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }
}
