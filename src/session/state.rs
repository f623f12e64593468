//! Session state and the actions that mutate it

use crate::storage::credential_store::non_empty;
use crate::storage::Credential;
use serde::Serialize;

/// Process-wide authentication state mirrored for the UI layer
///
/// Fields are read-only outside this crate; every change goes through
/// [`SessionState::apply`].
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    is_authenticated: bool,
    #[serde(skip)]
    access_token: Option<String>,
    #[serde(skip)]
    refresh_token: Option<String>,
    user_id: Option<String>,
    email: Option<String>,
    is_loading: bool,
    last_error: Option<String>,
    revision: u64,
}

/// The only ways session state changes
#[derive(Clone, PartialEq, Eq)]
pub enum SessionAction {
    LoginStart,
    LoginSuccess(Credential),
    LoginFailure(String),
    RefreshStart,
    RefreshSuccess {
        access_token: String,
        refresh_token: String,
    },
    RefreshFailure(String),
    Logout,
    SetUser {
        user_id: Option<String>,
        email: Option<String>,
    },
}

impl SessionAction {
    /// Short name used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            SessionAction::LoginStart => "login_start",
            SessionAction::LoginSuccess(_) => "login_success",
            SessionAction::LoginFailure(_) => "login_failure",
            SessionAction::RefreshStart => "refresh_start",
            SessionAction::RefreshSuccess { .. } => "refresh_success",
            SessionAction::RefreshFailure(_) => "refresh_failure",
            SessionAction::Logout => "logout",
            SessionAction::SetUser { .. } => "set_user",
        }
    }
}

impl std::fmt::Debug for SessionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Changes whenever the credential pair changes
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current credential when authenticated
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.is_authenticated.then(|| Credential {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            user_id: self.user_id.clone(),
            email: self.email.clone(),
        })
    }

    /// Reduce `action` into the state
    pub fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::LoginStart | SessionAction::RefreshStart => {
                self.is_loading = true;
                self.last_error = None;
            }
            SessionAction::LoginSuccess(credential) => {
                self.access_token = credential.access_token;
                self.refresh_token = credential.refresh_token;
                self.user_id = credential.user_id;
                self.email = credential.email;
                self.is_loading = false;
                self.last_error = None;
                self.revision += 1;
            }
            SessionAction::LoginFailure(message) => {
                self.is_loading = false;
                self.last_error = Some(message);
            }
            SessionAction::RefreshSuccess {
                access_token,
                refresh_token,
            } => {
                self.access_token = Some(access_token);
                self.refresh_token = Some(refresh_token);
                self.is_loading = false;
                self.last_error = None;
                self.revision += 1;
            }
            SessionAction::RefreshFailure(message) => {
                self.reset();
                self.last_error = Some(message);
            }
            SessionAction::Logout => self.reset(),
            SessionAction::SetUser { user_id, email } => {
                self.user_id = user_id;
                self.email = email;
            }
        }
        self.is_authenticated =
            non_empty(self.access_token.as_deref()) && non_empty(self.refresh_token.as_deref());
    }

    fn reset(&mut self) {
        *self = Self {
            revision: self.revision + 1,
            ..Self::default()
        };
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("is_authenticated", &self.is_authenticated)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("is_loading", &self.is_loading)
            .field("last_error", &self.last_error)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}
