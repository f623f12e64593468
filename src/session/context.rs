use super::state::{SessionAction, SessionState};
use crate::storage::credential_store::non_empty;
use crate::storage::{Credential, CredentialField, CredentialStore};
use crate::utils::logging::LoggingHelper;
use std::sync::Arc;
use tokio::sync::watch;

struct Inner {
    state: watch::Sender<SessionState>,
    store: CredentialStore,
}

/// Handle to the process-wide session
///
/// Owned by the application root and cloned into the dispatcher, the refresh
/// protocol and the UI layer. Clones share the same state and store.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    #[must_use]
    pub fn new(store: CredentialStore) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner { state, store }),
        }
    }

    /// Receiver notified on every state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.state.borrow().revision()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    pub(crate) fn dispatch(&self, action: SessionAction) {
        LoggingHelper::log_session_action(&action);
        self.inner.state.send_modify(|state| state.apply(action));
    }

    /// Apply `action` only if the session is still at `revision`
    ///
    /// Returns whether the action was applied.
    pub(crate) fn dispatch_if_current(&self, revision: u64, action: SessionAction) -> bool {
        self.inner.state.send_if_modified(|state| {
            if state.revision() != revision {
                return false;
            }
            LoggingHelper::log_session_action(&action);
            state.apply(action);
            true
        })
    }

    /// Access token for the next request
    ///
    /// Read from the credential store on every call; the in-memory mirror is
    /// used only when the store has nothing.
    pub async fn access_token(&self) -> Option<String> {
        match self.inner.store.get(CredentialField::AccessToken).await {
            Some(token) if non_empty(Some(&token)) => Some(token),
            _ => self.inner.state.borrow().access_token().map(str::to_string),
        }
    }

    /// Current credential when authenticated
    #[must_use]
    pub fn current_credential(&self) -> Option<Credential> {
        self.inner.state.borrow().credential()
    }

    /// Persist a freshly issued credential and mark the session authenticated
    pub async fn login_success(&self, credential: Credential) {
        self.inner.store.save(&credential).await;
        self.dispatch(SessionAction::LoginSuccess(credential));
    }

    /// Record a failed login attempt
    pub fn login_failure(&self, message: impl Into<String>) {
        self.dispatch(SessionAction::LoginFailure(message.into()));
    }

    pub(crate) fn login_start(&self) {
        self.dispatch(SessionAction::LoginStart);
    }

    /// Update the cached identity fields
    pub async fn set_user(&self, user_id: Option<String>, email: Option<String>) {
        if let Some(id) = user_id.as_deref() {
            self.inner.store.set(CredentialField::UserId, id).await;
        }
        if let Some(address) = email.as_deref() {
            self.inner.store.set(CredentialField::Email, address).await;
        }
        self.dispatch(SessionAction::SetUser { user_id, email });
    }

    /// Clear stored credentials and reset the session. Safe to repeat.
    pub async fn logout(&self) {
        self.inner.store.clear_all().await;
        self.dispatch(SessionAction::Logout);
    }
}
