//! Encrypted expiring store on disk.
//!
//! Each entry is sealed with AES-256-GCM together with its expiry and
//! attributes, so a token copied out of the directory is unreadable and an
//! expired one is discarded on the next read. The key is generated on first
//! use and kept next to the entries.
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use zeroize::Zeroize;

use super::{check_key, expiry_from_now, SecureExpiringStore, TokenAttributes};
use crate::error::StorageError;

const KEY_FILE: &str = "store_key";
const NONCE_LEN: usize = 12;

#[derive(Serialize, Deserialize)]
struct SealedEntry {
    value: String,
    expires_at: DateTime<Utc>,
    attrs: TokenAttributes,
}

#[derive(Clone)]
pub struct EncryptedFileStore {
    root: PathBuf,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl EncryptedFileStore {
    /// Open the store under `root`, creating the directory and key if needed
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let key_path = root.join(KEY_FILE);
        let mut key = if key_path.exists() {
            let key_data = fs::read(&key_path)?;
            if key_data.len() != 32 {
                return Err(StorageError::Crypto("invalid encryption key length".to_string()));
            }
            let mut key = [0u8; 32];
            key.copy_from_slice(&key_data);
            key
        } else {
            let mut key = [0u8; 32];
            OsRng.fill_bytes(&mut key);
            write_private(&key_path, &key)?;
            key
        };

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| StorageError::Crypto(e.to_string()));
        key.zeroize();

        Ok(Self { root, cipher: cipher? })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.root.join(format!("{key}.sealed")))
    }

    fn seal(&self, entry: &SealedEntry) -> Result<String, StorageError> {
        let mut plain = serde_json::to_vec(entry)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plain.as_slice())
            .map_err(|e| StorageError::Crypto(format!("encryption failed: {e}")));
        plain.zeroize();

        let mut combined = Vec::with_capacity(NONCE_LEN + 64);
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&sealed?);
        Ok(STANDARD.encode(combined))
    }

    fn open_entry(&self, key: &str, text: &str) -> Result<SealedEntry, StorageError> {
        let corrupt = |reason: String| StorageError::Corrupt {
            key: key.to_string(),
            reason,
        };

        let combined = STANDARD
            .decode(text.trim())
            .map_err(|e| corrupt(e.to_string()))?;
        if combined.len() < NONCE_LEN {
            return Err(corrupt("sealed entry too short".to_string()));
        }
        let (nonce_bytes, data) = combined.split_at(NONCE_LEN);

        let mut plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), data)
            .map_err(|_| corrupt("decryption failed".to_string()))?;
        let entry = serde_json::from_slice(&plain);
        plain.zeroize();
        entry.map_err(|e| corrupt(e.to_string()))
    }
}

impl SecureExpiringStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8(bytes).map_err(|_| StorageError::Corrupt {
            key: key.to_string(),
            reason: "sealed entry is not valid base64 text".to_string(),
        })?;

        let entry = self.open_entry(key, &text)?;
        if Utc::now() >= entry.expires_at {
            tracing::debug!(key, "sealed entry expired, discarding");
            self.remove(key)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &str, attrs: &TokenAttributes) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let mut entry = SealedEntry {
            value: value.to_string(),
            expires_at: expiry_from_now(attrs),
            attrs: *attrs,
        };
        let sealed = self.seal(&entry);
        entry.value.zeroize();

        let tmp = path.with_extension("sealed.tmp");
        write_private(&tmp, sealed?.as_bytes())?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write a file readable only by the current user where the platform allows it
fn write_private(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    fs::write(path, data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
