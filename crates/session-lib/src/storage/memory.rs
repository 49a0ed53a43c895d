//! In-memory channels, used by tests and short-lived hosts.
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

use super::{expiry_from_now, DurableStore, SecureExpiringStore, TokenAttributes};
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct SecureEntry {
    value: String,
    attrs: TokenAttributes,
    expires_at: DateTime<Utc>,
}

/// Expiring store held in process memory
#[derive(Debug, Clone, Default)]
pub struct MemorySecureStore {
    entries: Arc<RwLock<HashMap<String, SecureEntry>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes the live entry was written with
    pub fn attributes(&self, key: &str) -> Option<TokenAttributes> {
        self.entries.read().get(key).map(|e| e.attrs)
    }

    /// Expiry of the live entry
    pub fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.read().get(key).map(|e| e.expires_at)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SecureExpiringStore for MemorySecureStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = Utc::now();
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            },
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, attrs: &TokenAttributes) -> Result<(), StorageError> {
        let expires_at = expiry_from_now(attrs);
        self.entries.write().insert(
            key.to_string(),
            SecureEntry {
                value: value.to_string(),
                attrs: *attrs,
                expires_at,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Durable store held in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDurableStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl DurableStore for MemoryDurableStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
