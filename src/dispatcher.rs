//! Authenticated request dispatch
//!
//! [`RequestDispatcher::execute`] sends one operation, attaching the access
//! token for protected operations. An authorization failure on a protected
//! operation triggers one refresh and at most one retry.
//! [`RequestDispatcher::execute_all`] runs a batch of operations concurrently.

use crate::error::{ApiError, RequestResult};
use crate::operations::{requires_auth, OperationDocument};
use crate::session::{SessionContext, SessionRefresher};
use crate::transport::{Transport, TransportError, Variables};
use crate::utils::logging::LoggingHelper;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One named entry of a batch for [`RequestDispatcher::execute_all`]
#[derive(Debug, Clone)]
pub struct BatchOperation {
    pub document: OperationDocument,
    pub variables: Variables,
    pub name: String,
}

impl BatchOperation {
    #[must_use]
    pub fn new(document: &OperationDocument, variables: Variables) -> Self {
        Self {
            document: *document,
            variables,
            name: document.name.to_string(),
        }
    }

    /// Key the result under `name` instead of the registry name
    ///
    /// Authentication is still decided by the document's registry name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    session: SessionContext,
    refresher: SessionRefresher,
}

impl RequestDispatcher {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, session: SessionContext) -> Self {
        let refresher = SessionRefresher::new(transport.clone(), session.clone());
        Self {
            transport,
            session,
            refresher,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[must_use]
    pub fn refresher(&self) -> &SessionRefresher {
        &self.refresher
    }

    /// Execute `document` with `variables`
    ///
    /// `operation_name` decides whether a bearer token is attached and is used
    /// in logs; it is not sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns a normalised [`ApiError`] when the request fails. A protected
    /// operation whose session cannot be refreshed yields `TOKEN_EXPIRED`
    /// after the session has been logged out.
    pub async fn execute(
        &self,
        document: &OperationDocument,
        variables: Variables,
        operation_name: &str,
    ) -> RequestResult<Value> {
        let needs_auth = requires_auth(operation_name);
        LoggingHelper::log_operation_start(document, operation_name, needs_auth, &variables);

        let observed_revision = self.session.revision();
        let bearer = if needs_auth {
            self.session.access_token().await
        } else {
            None
        };

        match self
            .transport
            .send(document, &variables, bearer.as_deref())
            .await
        {
            Ok(data) => {
                LoggingHelper::log_operation_success(operation_name);
                Ok(data)
            }
            Err(err) if needs_auth && err.is_authorization_failure() => {
                LoggingHelper::log_authorization_failure(operation_name);
                self.retry_after_refresh(document, &variables, operation_name, observed_revision)
                    .await
            }
            Err(err) => Err(Self::normalise(operation_name, &err)),
        }
    }

    /// Execute `document` under its own registry name
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::execute`]
    pub async fn execute_document(
        &self,
        document: &OperationDocument,
        variables: Variables,
    ) -> RequestResult<Value> {
        self.execute(document, variables, document.name).await
    }

    /// Execute every operation of `batch` concurrently
    ///
    /// Each result is keyed by its entry's name; a later entry with the same
    /// name replaces an earlier one. Entries that hit an expired session share
    /// one refresh.
    pub async fn execute_all(
        &self,
        batch: Vec<BatchOperation>,
    ) -> HashMap<String, RequestResult<Value>> {
        join_all(batch.into_iter().map(|operation| async move {
            let BatchOperation {
                document,
                variables,
                name,
            } = operation;
            let result = self.execute_document(&document, variables).await;
            (name, result)
        }))
        .await
        .into_iter()
        .collect()
    }

    async fn retry_after_refresh(
        &self,
        document: &OperationDocument,
        variables: &Variables,
        operation_name: &str,
        observed_revision: u64,
    ) -> RequestResult<Value> {
        let credential = match self.refresher.refresh_after(observed_revision).await {
            Ok(credential) => credential,
            Err(_) => {
                self.session.logout().await;
                LoggingHelper::log_session_expired(operation_name);
                return Err(ApiError::session_expired());
            }
        };

        LoggingHelper::log_operation_retry(operation_name);
        match self
            .transport
            .send(document, variables, credential.access_token.as_deref())
            .await
        {
            Ok(data) => {
                LoggingHelper::log_operation_success(operation_name);
                Ok(data)
            }
            Err(err) => Err(Self::normalise(operation_name, &err)),
        }
    }

    fn normalise(operation_name: &str, err: &TransportError) -> ApiError {
        let result = ApiError::from(err);
        LoggingHelper::log_operation_failure(operation_name, err, &result);
        result
    }
}
