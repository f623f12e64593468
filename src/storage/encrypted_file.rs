//! Encrypted single-file backend
//!
//! All keys live in one JSON map sealed with AES-256-GCM. Writes replace the
//! file through a sibling temp file and a rename, so a crash never leaves a
//! half-written map behind.

use super::{KeyValueStore, StorageError};
use crate::utils::crypto::{derive_encryption_key, open, seal, ENCRYPTION_KEY_SIZE};
use async_trait::async_trait;
use log::warn;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Entries = HashMap<String, String>;

pub struct EncryptedFileStore {
    path: PathBuf,
    key: [u8; ENCRYPTION_KEY_SIZE],
    // Serializes read-modify-write cycles within this process.
    io: Mutex<()>,
}

impl EncryptedFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, secret: &[u8]) -> Self {
        Self {
            path: path.into(),
            key: derive_encryption_key(secret),
            io: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries, StorageError> {
        let sealed = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        if sealed.trim().is_empty() {
            return Ok(Entries::new());
        }
        open(&sealed, &self.key).map_err(|e| StorageError::Encoding(e.to_string()))
    }

    /// Entries to build the next write on; an unreadable file is replaced
    async fn entries_for_update(&self) -> Result<Entries, StorageError> {
        match self.read_entries().await {
            Err(StorageError::Encoding(e)) => {
                warn!(
                    "Credential file {} is unreadable ({e}); starting from an empty map",
                    self.path.display()
                );
                Ok(Entries::new())
            }
            other => other,
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<(), StorageError> {
        let sealed = seal(entries, &self.key).map_err(|e| StorageError::Encoding(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, sealed).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for EncryptedFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.io.lock().await;
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.io.lock().await;
        let mut entries = self.entries_for_update().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries).await
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.io.lock().await;
        let mut entries = self.entries_for_update().await?;
        for key in keys {
            entries.remove(*key);
        }
        self.write_entries(&entries).await
    }
}
