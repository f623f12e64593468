//! Backend transport seam
//!
//! The dispatcher only needs "send a named operation with variables, get back
//! data or a classified failure". [`Transport`] is that contract; the
//! [`http`] module implements it as GraphQL over HTTP.

pub mod http;

pub use http::GraphqlHttpTransport;

use crate::operations::OperationDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Variables map sent alongside an operation
pub type Variables = Map<String, Value>;

/// Extension code the backend uses for an expired access token
pub const TOKEN_EXPIRED_CODE: &str = "TOKEN_EXPIRED";

/// Backend transport used by the dispatcher and the refresh protocol
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `document` with `variables`, attaching `bearer` as the
    /// `Authorization` credential when present
    ///
    /// Returns the `data` payload on success.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the request could not be delivered,
    /// the server answered with a non-success status, or the response carried
    /// GraphQL errors.
    async fn send(
        &self,
        document: &OperationDocument,
        variables: &Variables,
        bearer: Option<&str>,
    ) -> Result<Value, TransportError>;
}

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphqlError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: None,
        }
    }

    /// Error carrying an `extensions.code`
    #[must_use]
    pub fn with_code(message: impl Into<String>, code: &str) -> Self {
        let mut extensions = Map::new();
        extensions.insert("code".to_string(), Value::String(code.to_string()));
        Self {
            message: message.into(),
            extensions: Some(extensions),
        }
    }

    /// Machine-readable `extensions.code`, if any
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(Value::as_str)
    }
}

/// Transport-level failure of a single request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// No HTTP response was received (offline, DNS, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),
    /// The server answered with a non-success status
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The server answered with a GraphQL error list
    #[error("{}", first_message(errors))]
    Graphql {
        status: u16,
        errors: Vec<GraphqlError>,
    },
    /// The response body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn first_message(errors: &[GraphqlError]) -> &str {
    errors
        .first()
        .map_or("GraphQL request failed", |e| e.message.as_str())
}

impl TransportError {
    /// GraphQL errors delivered with HTTP 200
    #[must_use]
    pub fn graphql(errors: Vec<GraphqlError>) -> Self {
        TransportError::Graphql {
            status: 200,
            errors,
        }
    }

    /// HTTP 401, or any GraphQL error with `extensions.code == TOKEN_EXPIRED`
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        match self {
            TransportError::Http { status, .. } => *status == 401,
            TransportError::Graphql { errors, .. } => errors
                .iter()
                .any(|e| e.code() == Some(TOKEN_EXPIRED_CODE)),
            TransportError::Network(_) | TransportError::InvalidResponse(_) => false,
        }
    }
}
