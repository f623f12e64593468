//! Client facade
//!
//! Wires the transport, credential backend, session context, dispatcher and
//! services into one handle for the UI layer.

use crate::dispatcher::{BatchOperation, RequestDispatcher};
use crate::error::RequestResult;
use crate::operations::OperationDocument;
use crate::services::{AuthService, UserService};
use crate::session::SessionContext;
use crate::settings::{ClientSettings, StorageBackend};
use crate::storage::{CredentialStore, EncryptedFileStore, KeyValueStore, MemoryStore};
use crate::transport::{GraphqlHttpTransport, Transport, Variables};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Failure to construct an [`ApiClient`]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid API endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("storage.secret is required for the encrypted_file backend")]
    MissingStorageSecret,
}

#[derive(Clone)]
pub struct ApiClient {
    dispatcher: RequestDispatcher,
    users: UserService,
    auth: AuthService,
}

impl ApiClient {
    /// Assemble a client over an existing transport and credential backend
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, backend: Arc<dyn KeyValueStore>) -> Self {
        let session = SessionContext::new(CredentialStore::new(backend));
        let dispatcher = RequestDispatcher::new(transport, session);
        Self {
            users: UserService::new(dispatcher.clone()),
            auth: AuthService::new(dispatcher.clone()),
            dispatcher,
        }
    }

    /// Build the HTTP transport and storage backend described by `settings`
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid, the HTTP client cannot be
    /// built, or the encrypted file backend has no secret
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        let transport = GraphqlHttpTransport::from_settings(&settings.api)?;
        log::info!(
            "🔧 API endpoint {} (timeout {}s)",
            transport.endpoint(),
            settings.api.timeout_seconds
        );

        let backend: Arc<dyn KeyValueStore> = match settings.storage.backend {
            StorageBackend::Memory => {
                log::info!("🔧 Using in-memory credential storage");
                Arc::new(MemoryStore::new())
            }
            StorageBackend::EncryptedFile => {
                if settings.storage.secret.is_empty() {
                    return Err(ClientError::MissingStorageSecret);
                }
                log::info!(
                    "🔧 Using encrypted credential file {}",
                    settings.storage.path
                );
                Arc::new(EncryptedFileStore::new(
                    settings.storage.path_buf(),
                    settings.storage.secret.as_bytes(),
                ))
            }
        };

        Ok(Self::new(Arc::new(transport), backend))
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        self.dispatcher.session()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.users
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// See [`RequestDispatcher::execute`]
    ///
    /// # Errors
    ///
    /// Returns the normalised dispatch error
    pub async fn execute(
        &self,
        document: &OperationDocument,
        variables: Variables,
        operation_name: &str,
    ) -> RequestResult<Value> {
        self.dispatcher
            .execute(document, variables, operation_name)
            .await
    }

    /// See [`RequestDispatcher::execute_all`]
    pub async fn execute_all(
        &self,
        batch: Vec<BatchOperation>,
    ) -> HashMap<String, RequestResult<Value>> {
        self.dispatcher.execute_all(batch).await
    }

    /// See [`AuthService::bootstrap`]
    pub async fn bootstrap(&self) -> bool {
        self.auth.bootstrap().await
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
    }
}
