//! Error taxonomy returned to callers
//!
//! Every dispatched operation resolves to a [`RequestResult`]. Failures are
//! normalised into an [`ApiError`] carrying one of the fixed [`ErrorCode`]s so
//! the UI layer can branch on the code and show the message as-is.

use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniform return shape of every dispatched operation
pub type RequestResult<T = serde_json::Value> = Result<T, ApiError>;

/// Standardised error codes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    WrongCredentials,
    TokenExpired,
    UserNotFound,
    RateLimit,
    ServerError,
    NetworkOffline,
}

impl ErrorCode {
    /// All codes in taxonomy order
    pub const ALL: [ErrorCode; 7] = [
        ErrorCode::InvalidInput,
        ErrorCode::WrongCredentials,
        ErrorCode::TokenExpired,
        ErrorCode::UserNotFound,
        ErrorCode::RateLimit,
        ErrorCode::ServerError,
        ErrorCode::NetworkOffline,
    ];

    /// Wire representation, identical to the backend's `extensions.code`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::WrongCredentials => "WRONG_CREDENTIALS",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::NetworkOffline => "NETWORK_OFFLINE",
        }
    }

    /// Parse a backend-supplied code. Unrecognised codes yield `None`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == code)
    }

    /// Fixed user-facing message for this code
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input provided.",
            ErrorCode::WrongCredentials => "Incorrect email or password.",
            ErrorCode::TokenExpired => "Session expired. Please log in again.",
            ErrorCode::UserNotFound => "User not found.",
            ErrorCode::RateLimit => "Too many requests. Please try again later.",
            ErrorCode::ServerError => "Something went wrong. Please try again later.",
            ErrorCode::NetworkOffline => {
                "Network connection failed. Please check your internet connection."
            }
        }
    }

    /// Whether a server-provided message is shown instead of the fixed one
    const fn keeps_server_message(self) -> bool {
        matches!(self, ErrorCode::InvalidInput | ErrorCode::ServerError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalised, user-presentable failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error carrying the fixed message for `code`
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Error for `code`, keeping `server_message` where the taxonomy allows it
    #[must_use]
    pub fn with_server_message(code: ErrorCode, server_message: Option<&str>) -> Self {
        match server_message.map(str::trim) {
            Some(message) if code.keeps_server_message() && !message.is_empty() => {
                Self::new(code, message)
            }
            _ => Self::from_code(code),
        }
    }

    /// The error returned when the session could not be recovered
    #[must_use]
    pub fn session_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    /// The backend answered with a payload that does not match the operation's schema
    #[must_use]
    pub fn unexpected_response(root_field: &str) -> Self {
        log::error!("Unexpected response shape for '{root_field}'");
        Self::new(ErrorCode::ServerError, "Unexpected response from server")
    }

    /// A business-level rejection (`status: false`) reported inside a payload
    #[must_use]
    pub fn rejected(code: Option<&str>, message: Option<&str>, fallback: &str) -> Self {
        let code = code
            .and_then(ErrorCode::from_code)
            .unwrap_or(ErrorCode::ServerError);
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback);
        Self::new(code, message)
    }
}

impl From<&TransportError> for ApiError {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Network(_) => Self::from_code(ErrorCode::NetworkOffline),
            TransportError::Graphql { status, errors } => {
                let first = errors.first();
                let server_message = first.map(|e| e.message.as_str());
                match first.and_then(|e| e.code()).and_then(ErrorCode::from_code) {
                    Some(code) => Self::with_server_message(code, server_message),
                    None if *status == 429 => Self::from_code(ErrorCode::RateLimit),
                    None => Self::with_server_message(ErrorCode::ServerError, server_message),
                }
            }
            TransportError::Http { status: 429, .. } => Self::from_code(ErrorCode::RateLimit),
            TransportError::Http { message, .. } => {
                Self::with_server_message(ErrorCode::ServerError, Some(message))
            }
            TransportError::InvalidResponse(_) => Self::from_code(ErrorCode::ServerError),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self::from(&err)
    }
}

/// `{ success, data | error }` envelope for UI bridges that expect the flat shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Convert back into a [`RequestResult`]
    ///
    /// # Errors
    ///
    /// Returns the carried [`ApiError`] for a failed response
    pub fn into_result(self) -> RequestResult<T> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(ApiError::from_code(ErrorCode::ServerError)),
        }
    }
}

impl<T> From<RequestResult<T>> for ApiResponse<T> {
    fn from(result: RequestResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}
