//! Token refresh protocol
//!
//! Exchanges the stored refresh token for a new token pair. Attempts are
//! single-flight: concurrent callers queue on one gate, and a caller whose
//! view of the session went stale while queued takes over the outcome of the
//! refresh that finished ahead of it instead of sending its own.

use super::context::SessionContext;
use super::state::SessionAction;
use crate::operations::documents::REFRESH_TOKEN;
use crate::storage::credential_store::non_empty;
use crate::storage::{Credential, CredentialField};
use crate::transport::{Transport, TransportError, Variables};
use crate::utils::logging::LoggingHelper;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RefreshError {
    #[error("No refresh token available")]
    MissingRefreshToken,
    #[error("Token refresh failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Token refresh returned an unexpected response")]
    InvalidResponse,
    /// The session was ended or replaced while this refresh was pending
    #[error("Session ended during token refresh")]
    SessionEnded,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshPayload {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Clone)]
pub struct SessionRefresher {
    transport: Arc<dyn Transport>,
    session: SessionContext,
    gate: Arc<Mutex<()>>,
}

impl SessionRefresher {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, session: SessionContext) -> Self {
        Self {
            transport,
            session,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Refresh the session's token pair
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] when no refresh token is stored or the
    /// backend rejected it. The session is torn down in that case.
    pub async fn refresh(&self) -> Result<Credential, RefreshError> {
        self.refresh_after(self.session.revision()).await
    }

    /// Refresh on behalf of a caller that last saw `observed_revision`
    ///
    /// If the credential changed since then, the current outcome is returned
    /// without contacting the backend.
    pub(crate) async fn refresh_after(
        &self,
        observed_revision: u64,
    ) -> Result<Credential, RefreshError> {
        let _guard = self.gate.lock().await;

        if self.session.revision() != observed_revision {
            LoggingHelper::log_refresh_joined();
            return self
                .session
                .current_credential()
                .ok_or(RefreshError::SessionEnded);
        }

        match self.exchange().await {
            Ok(credential) => {
                LoggingHelper::log_refresh_success();
                Ok(credential)
            }
            // Whoever moved the session on owns it now; leave it alone.
            Err(RefreshError::SessionEnded) => {
                LoggingHelper::log_refresh_failure(&RefreshError::SessionEnded);
                Err(RefreshError::SessionEnded)
            }
            Err(err) => {
                LoggingHelper::log_refresh_failure(&err);
                self.session.store().clear_all().await;
                self.session
                    .dispatch(SessionAction::RefreshFailure(err.to_string()));
                Err(err)
            }
        }
    }

    async fn exchange(&self) -> Result<Credential, RefreshError> {
        let store = self.session.store();
        let refresh_token = store
            .get(CredentialField::RefreshToken)
            .await
            .filter(|token| non_empty(Some(token)))
            .ok_or(RefreshError::MissingRefreshToken)?;

        self.session.dispatch(SessionAction::RefreshStart);
        LoggingHelper::log_refresh_start();
        let started_at = self.session.revision();

        let mut variables = Variables::new();
        variables.insert("refreshToken".to_string(), Value::String(refresh_token));
        let sent = self.transport.send(&REFRESH_TOKEN, &variables, None).await;
        if self.session.revision() != started_at {
            return Err(RefreshError::SessionEnded);
        }
        let data = sent?;

        let payload: RefreshPayload = REFRESH_TOKEN
            .decode(data)
            .map_err(|_| RefreshError::InvalidResponse)?;
        if payload.id_token.is_empty() || payload.refresh_token.is_empty() {
            return Err(RefreshError::InvalidResponse);
        }

        store
            .set(CredentialField::AccessToken, &payload.id_token)
            .await;
        store
            .set(CredentialField::RefreshToken, &payload.refresh_token)
            .await;
        let applied = self.session.dispatch_if_current(
            started_at,
            SessionAction::RefreshSuccess {
                access_token: payload.id_token.clone(),
                refresh_token: payload.refresh_token.clone(),
            },
        );
        if !applied {
            // A logout landed while the new pair was being written.
            if !self.session.is_authenticated() {
                store.clear_all().await;
            }
            return Err(RefreshError::SessionEnded);
        }

        Ok(Credential::tokens(payload.id_token, payload.refresh_token)
            .with_identity(payload.uid, payload.email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CredentialStore, MemoryStore};
    use crate::testing::mock::{MockTransport, ScriptedResponse};
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, SessionContext, SessionRefresher) {
        let transport = Arc::new(MockTransport::new());
        let session = SessionContext::new(CredentialStore::new(Arc::new(MemoryStore::new())));
        let refresher = SessionRefresher::new(transport.clone(), session.clone());
        (transport, session, refresher)
    }

    #[tokio::test]
    async fn test_missing_refresh_token_skips_backend() {
        let (transport, session, refresher) = setup();
        session.store().set(CredentialField::AccessToken, "T1").await;

        let err = refresher.refresh().await.unwrap_err();

        assert_eq!(err, RefreshError::MissingRefreshToken);
        assert_eq!(transport.call_count(), 0);
        assert_eq!(session.store().load().await, Credential::default());
        assert_eq!(
            session.snapshot().last_error(),
            Some("No refresh token available")
        );
    }

    #[tokio::test]
    async fn test_successful_refresh_persists_new_pair() {
        let (transport, session, refresher) = setup();
        session.login_success(Credential::tokens("T1", "R1")).await;
        transport.push(
            "refreshToken",
            ScriptedResponse::data(json!({
                "refreshToken": {"idToken": "T2", "refreshToken": "R2", "uid": "U1", "email": null}
            })),
        );

        let credential = refresher.refresh().await.unwrap();

        assert_eq!(credential.access_token.as_deref(), Some("T2"));
        let calls = transport.calls();
        assert_eq!(calls[0].bearer, None);
        assert_eq!(calls[0].variables["refreshToken"], "R1");
        let stored = session.store().load().await;
        assert_eq!(stored.refresh_token.as_deref(), Some("R2"));
        let state = session.snapshot();
        assert!(state.is_authenticated());
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_empty_tokens_count_as_failure() {
        let (transport, session, refresher) = setup();
        session.login_success(Credential::tokens("T1", "R1")).await;
        transport.push(
            "refreshToken",
            ScriptedResponse::data(json!({"refreshToken": {"idToken": "", "refreshToken": "R2"}})),
        );

        assert_eq!(
            refresher.refresh().await.unwrap_err(),
            RefreshError::InvalidResponse
        );
        assert!(!session.is_authenticated());
        assert_eq!(session.store().load().await, Credential::default());
    }

    #[tokio::test]
    async fn test_stale_caller_adopts_finished_refresh() {
        let (transport, session, refresher) = setup();
        session.login_success(Credential::tokens("T1", "R1")).await;
        let observed = session.revision();
        transport.push(
            "refreshToken",
            ScriptedResponse::data(json!({
                "refreshToken": {"idToken": "T2", "refreshToken": "R2"}
            })),
        );

        refresher.refresh_after(observed).await.unwrap();
        let joined = refresher.refresh_after(observed).await.unwrap();

        assert_eq!(joined.access_token.as_deref(), Some("T2"));
        assert_eq!(transport.count_for("refreshToken"), 1);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_discards_new_pair() {
        let (transport, session, refresher) = setup();
        session.login_success(Credential::tokens("T1", "R1")).await;
        transport.push(
            "refreshToken",
            ScriptedResponse::data(json!({
                "refreshToken": {"idToken": "T2", "refreshToken": "R2"}
            })),
        );
        let hold = transport.hold("refreshToken");

        let pending = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.refresh().await }
        });
        hold.arrived().await;
        session.logout().await;
        hold.release();

        assert_eq!(pending.await.unwrap().unwrap_err(), RefreshError::SessionEnded);
        assert!(!session.is_authenticated());
        assert_eq!(session.store().load().await, Credential::default());
        assert!(session.snapshot().last_error().is_none());
    }

    #[tokio::test]
    async fn test_login_during_refresh_is_kept() {
        let (transport, session, refresher) = setup();
        session.login_success(Credential::tokens("T1", "R1")).await;
        transport.push(
            "refreshToken",
            ScriptedResponse::error(TransportError::Http {
                status: 401,
                message: "Request failed with status code 401".into(),
            }),
        );
        let hold = transport.hold("refreshToken");

        let pending = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.refresh().await }
        });
        hold.arrived().await;
        session.login_success(Credential::tokens("T3", "R3")).await;
        hold.release();

        assert_eq!(pending.await.unwrap().unwrap_err(), RefreshError::SessionEnded);
        assert_eq!(session.snapshot().access_token(), Some("T3"));
        let stored = session.store().load().await;
        assert_eq!(stored.refresh_token.as_deref(), Some("R3"));
    }

    #[tokio::test]
    async fn test_stale_caller_after_failed_refresh_sees_session_ended() {
        let (transport, session, refresher) = setup();
        session.login_success(Credential::tokens("T1", "R1")).await;
        let observed = session.revision();
        transport.push(
            "refreshToken",
            ScriptedResponse::error(TransportError::Http {
                status: 401,
                message: "Request failed with status code 401".into(),
            }),
        );

        assert!(refresher.refresh_after(observed).await.is_err());
        assert_eq!(
            refresher.refresh_after(observed).await.unwrap_err(),
            RefreshError::SessionEnded
        );
        assert_eq!(transport.call_count(), 1);
    }
}
