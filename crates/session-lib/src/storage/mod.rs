// ============================
// crates/session-lib/src/storage/mod.rs
// ============================
//! Storage channels for the session token and the cached profile.
//!
//! The two channels have different guarantees. The token goes to a
//! [`SecureExpiringStore`], which carries an expiry and security attributes
//! per entry; the profile goes to a plain [`DurableStore`]. Both are small
//! synchronous key/value interfaces so that browser-like, in-memory and
//! on-disk backings can be swapped without touching the session logic.

mod encrypted;
mod file;
mod memory;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub use encrypted::EncryptedFileStore;
pub use file::FileDurableStore;
pub use memory::{MemoryDurableStore, MemorySecureStore};

/// Cross-site policy recorded with a secure entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Expiry and exposure attributes of a secure entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAttributes {
    /// Lifetime from the moment the entry is written
    pub ttl: Duration,
    /// Only ever sent over encrypted transport / stored encrypted
    pub secure: bool,
    pub same_site: SameSite,
}

impl TokenAttributes {
    /// Secure, same-site strict attributes with the given lifetime
    pub fn strict(ttl: Duration) -> Self {
        Self {
            ttl,
            secure: true,
            same_site: SameSite::Strict,
        }
    }
}

/// Key/value channel whose entries expire on their own
pub trait SecureExpiringStore: Send + Sync {
    /// Current value, `None` when missing or expired
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str, attrs: &TokenAttributes) -> Result<(), StorageError>;

    /// Remove a value; removing a missing key succeeds
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Plain durable key/value channel
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing a missing key succeeds
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Absolute expiry of an entry written now; saturates for huge ttls
pub(crate) fn expiry_from_now(attrs: &TokenAttributes) -> chrono::DateTime<chrono::Utc> {
    chrono::Duration::from_std(attrs.ttl)
        .ok()
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
}

/// Keys become file names in the on-disk stores
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Corrupt {
            key: key.to_string(),
            reason: "key must be non-empty and contain only [A-Za-z0-9_-]".to_string(),
        })
    }
}
