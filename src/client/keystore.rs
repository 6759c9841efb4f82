//! In-memory key store.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::core::{KeyStore, KeyStoreError};
use crate::crypto::PublicKey;

/// [`KeyStore`] backed by a map, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, PublicKey>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    fn set_recipient(&self, address: &str, key: PublicKey) -> Result<(), KeyStoreError> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| KeyStoreError("key store lock poisoned".into()))?;
        debug!(%address, %key, "stored recipient key");
        keys.insert(address.to_string(), key);
        Ok(())
    }

    fn get_recipient(&self, address: &str) -> Option<PublicKey> {
        self.keys.read().ok()?.get(address).copied()
    }
}
