//! Best-effort credential persistence
//!
//! Read failures are treated as "absent" and write failures are logged and
//! dropped: storage problems must never abort a request or session flow.

use super::KeyValueStore;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The four persisted credential fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    AccessToken,
    RefreshToken,
    UserId,
    Email,
}

impl CredentialField {
    pub const ALL: [CredentialField; 4] = [
        CredentialField::AccessToken,
        CredentialField::RefreshToken,
        CredentialField::UserId,
        CredentialField::Email,
    ];

    /// Fixed storage key
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            CredentialField::AccessToken => "idToken",
            CredentialField::RefreshToken => "refreshToken",
            CredentialField::UserId => "userId",
            CredentialField::Email => "email",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Session authentication material; every field may be absent on its own
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "idToken")]
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl Credential {
    /// Credential holding only a token pair
    #[must_use]
    pub fn tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            user_id: None,
            email: None,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, user_id: Option<String>, email: Option<String>) -> Self {
        self.user_id = user_id;
        self.email = email;
        self
    }

    /// Both tokens present and non-empty
    #[must_use]
    pub fn has_token_pair(&self) -> bool {
        non_empty(self.access_token.as_deref()) && non_empty(self.refresh_token.as_deref())
    }

    #[must_use]
    pub fn field(&self, field: CredentialField) -> Option<&str> {
        match field {
            CredentialField::AccessToken => self.access_token.as_deref(),
            CredentialField::RefreshToken => self.refresh_token.as_deref(),
            CredentialField::UserId => self.user_id.as_deref(),
            CredentialField::Email => self.email.as_deref(),
        }
    }
}

// Tokens never reach logs through Debug.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Typed, failure-swallowing view over a [`KeyValueStore`]
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Stored value for `field`; `None` when absent or unreadable
    pub async fn get(&self, field: CredentialField) -> Option<String> {
        match self.backend.get(field.key()).await {
            Ok(value) => value,
            Err(e) => {
                error!("[CredentialStore] Error reading {field}: {e}");
                None
            }
        }
    }

    /// Persist `value` for `field`
    pub async fn set(&self, field: CredentialField, value: &str) {
        if let Err(e) = self.backend.set(field.key(), value).await {
            error!("[CredentialStore] Error writing {field}: {e}");
        }
    }

    /// Remove all four fields in one batch
    pub async fn clear_all(&self) {
        let keys = CredentialField::ALL.map(CredentialField::key);
        match self.backend.multi_remove(&keys).await {
            Ok(()) => debug!("[CredentialStore] Credentials cleared"),
            Err(e) => error!("[CredentialStore] Error clearing credentials: {e}"),
        }
    }

    /// Write every field present in `credential`, leaving the others untouched
    pub async fn save(&self, credential: &Credential) {
        for field in CredentialField::ALL {
            if let Some(value) = credential.field(field) {
                self.set(field, value).await;
            }
        }
    }

    /// Read all four fields
    pub async fn load(&self) -> Credential {
        Credential {
            access_token: self.get(CredentialField::AccessToken).await,
            refresh_token: self.get(CredentialField::RefreshToken).await,
            user_id: self.get(CredentialField::UserId).await,
            email: self.get(CredentialField::Email).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::mock::FailingStore;

    #[tokio::test]
    async fn test_save_writes_only_present_fields() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        store.set(CredentialField::Email, "old@b.com").await;

        store.save(&Credential::tokens("T1", "R1")).await;

        let loaded = store.load().await;
        assert_eq!(loaded.access_token.as_deref(), Some("T1"));
        assert_eq!(loaded.refresh_token.as_deref(), Some("R1"));
        assert_eq!(loaded.email.as_deref(), Some("old@b.com"));
        assert_eq!(loaded.user_id, None);
    }

    #[tokio::test]
    async fn test_clear_all_removes_every_field() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        store
            .save(&Credential::tokens("T1", "R1").with_identity(
                Some("U1".into()),
                Some("a@b.com".into()),
            ))
            .await;

        store.clear_all().await;

        assert_eq!(store.load().await, Credential::default());
    }

    #[tokio::test]
    async fn test_backend_failures_are_swallowed() {
        let store = CredentialStore::new(Arc::new(FailingStore));

        store.set(CredentialField::AccessToken, "T1").await;
        store.clear_all().await;

        assert_eq!(store.get(CredentialField::AccessToken).await, None);
        assert_eq!(store.load().await, Credential::default());
    }

    #[test]
    fn test_fixed_storage_keys() {
        let keys = CredentialField::ALL.map(CredentialField::key);
        assert_eq!(keys, ["idToken", "refreshToken", "userId", "email"]);
    }

    #[test]
    fn test_token_pair_requires_both_non_empty() {
        assert!(Credential::tokens("T", "R").has_token_pair());
        assert!(!Credential::tokens("", "R").has_token_pair());
        assert!(!Credential::default().has_token_pair());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", Credential::tokens("secret-access", "secret-refresh"));
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }
}
