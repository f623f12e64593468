//! Session bootstrap, logout and token verification

use super::StatusPayload;
use crate::dispatcher::RequestDispatcher;
use crate::operations::documents::VERIFY_TOKEN;
use crate::storage::{Credential, CredentialField};
use crate::transport::Variables;
use crate::utils::logging::LoggingHelper;
use log::{debug, warn};
use serde_json::Value;

#[derive(Clone)]
pub struct AuthService {
    dispatcher: RequestDispatcher,
}

impl AuthService {
    #[must_use]
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Rehydrate the session from stored credentials
    ///
    /// Returns `false` without any backend call when either token is missing.
    /// Otherwise the stored refresh token is exchanged once; a failed exchange
    /// leaves the session logged out.
    pub async fn bootstrap(&self) -> bool {
        let session = self.dispatcher.session();
        let stored = session.store().load().await;
        if !stored.has_token_pair() {
            debug!("[AuthService] Missing required tokens for auto-login");
            LoggingHelper::log_bootstrap(false);
            return false;
        }

        let restored = match self.dispatcher.refresher().refresh().await {
            Ok(fresh) => {
                let credential = Credential {
                    user_id: stored.user_id.or(fresh.user_id),
                    email: stored.email.or(fresh.email),
                    ..fresh
                };
                session.login_success(credential).await;
                true
            }
            Err(e) => {
                warn!("[AuthService] Token refresh failed during auto-login: {e}");
                false
            }
        };
        LoggingHelper::log_bootstrap(restored);
        restored
    }

    /// Clear stored credentials and reset the session
    pub async fn logout(&self) {
        debug!("[AuthService] Logging out user");
        self.dispatcher.session().logout().await;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.dispatcher.session().is_authenticated()
    }

    /// Ask the backend whether the stored access token is still valid
    ///
    /// Any failure, including a missing token, reads as `false`.
    pub async fn verify_token(&self) -> bool {
        let Some(token) = self
            .dispatcher
            .session()
            .store()
            .get(CredentialField::AccessToken)
            .await
            .filter(|token| !token.is_empty())
        else {
            return false;
        };

        let mut variables = Variables::new();
        variables.insert("idToken".to_string(), Value::String(token));
        match self
            .dispatcher
            .execute_document(&VERIFY_TOKEN, variables)
            .await
            .and_then(|data| VERIFY_TOKEN.decode::<StatusPayload>(data))
        {
            Ok(payload) => payload.status,
            Err(e) => {
                warn!("[AuthService] Error checking authentication status: {e}");
                false
            }
        }
    }
}
