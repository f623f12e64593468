//! Typed wrappers around the backend operations

pub mod auth;
pub mod user;

pub use auth::AuthService;
pub use user::{LoginData, NewUser, RegisterData, RegisteredUser, UserProfile, UserService};

use crate::error::{ApiError, RequestResult};
use serde::{Deserialize, Serialize};

/// `{ status, code, message }` acknowledgement returned by most mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusPayload {
    /// `Ok(self)` when `status` is true, otherwise the rejection as an error
    ///
    /// # Errors
    ///
    /// Returns the payload's code and message, with `fallback` as the message
    /// when the payload carries none
    pub fn accepted(self, fallback: &str) -> RequestResult<Self> {
        if self.status {
            Ok(self)
        } else {
            Err(self.rejection(fallback))
        }
    }

    pub(crate) fn rejection(&self, fallback: &str) -> ApiError {
        ApiError::rejected(self.code.as_deref(), self.message.as_deref(), fallback)
    }
}
