//! Credential storage
//!
//! # Modules
//!
//! - [`credential_store`] - Best-effort typed access to the four credential fields
//! - [`memory`] - In-process backend
//! - [`encrypted_file`] - AES-256-GCM encrypted single-file backend

pub mod credential_store;
pub mod encrypted_file;
pub mod memory;

pub use credential_store::{Credential, CredentialField, CredentialStore};
pub use encrypted_file::EncryptedFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Failure reported by a [`KeyValueStore`] backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Encoding(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Async key-value persistence for small string values
///
/// Platforms may provide their own implementation (keychain, shared
/// preferences, ...); the crate ships [`MemoryStore`] and [`EncryptedFileStore`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove every key in `keys` as one batch
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}
