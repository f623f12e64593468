//! Operation registry
//!
//! Static metadata for every named backend operation: the public/protected
//! classification and the catalogue of GraphQL documents the client sends.

pub mod documents;

use crate::error::{ApiError, RequestResult};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Operations usable without an access token
pub const PUBLIC_OPERATIONS: [&str; 5] = [
    "createUser",
    "login",
    "register",
    "sendOtpForSignup",
    "verifyOtpForSignup",
];

/// Whether `operation_name` must be sent with a bearer credential
///
/// Unknown names are protected.
#[must_use]
pub fn requires_auth(operation_name: &str) -> bool {
    let needs_auth = !PUBLIC_OPERATIONS.contains(&operation_name);
    debug!("Operation \"{operation_name}\" requires authentication: {needs_auth}");
    needs_auth
}

/// GraphQL operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            OperationKind::Query => "GraphQL Query",
            OperationKind::Mutation => "GraphQL Mutation",
        }
    }
}

/// An immutable query or mutation document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDocument {
    pub kind: OperationKind,
    /// Registry key, also used for auth classification
    pub name: &'static str,
    /// Response field carrying this operation's payload
    pub root_field: &'static str,
    /// GraphQL source text
    pub source: &'static str,
}

impl OperationDocument {
    #[must_use]
    pub const fn query(name: &'static str, root_field: &'static str, source: &'static str) -> Self {
        Self {
            kind: OperationKind::Query,
            name,
            root_field,
            source,
        }
    }

    #[must_use]
    pub const fn mutation(
        name: &'static str,
        root_field: &'static str,
        source: &'static str,
    ) -> Self {
        Self {
            kind: OperationKind::Mutation,
            name,
            root_field,
            source,
        }
    }

    #[must_use]
    pub fn requires_auth(&self) -> bool {
        requires_auth(self.name)
    }

    /// Decode this operation's payload from a response `data` object
    ///
    /// Each operation has exactly one schema; anything else is rejected.
    ///
    /// # Errors
    ///
    /// Returns a `SERVER_ERROR` when the root field is missing or does not
    /// match `T`
    pub fn decode<T: DeserializeOwned>(&self, mut data: Value) -> RequestResult<T> {
        let payload = match data.get_mut(self.root_field) {
            Some(payload) if !payload.is_null() => payload.take(),
            _ => return Err(ApiError::unexpected_response(self.root_field)),
        };
        serde_json::from_value(payload).map_err(|e| {
            debug!("Payload of '{}' did not decode: {e}", self.root_field);
            ApiError::unexpected_response(self.root_field)
        })
    }
}
