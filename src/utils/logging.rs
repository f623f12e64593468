// Centralized logging for request dispatch and session lifecycle
use crate::error::ApiError;
use crate::operations::OperationDocument;
use crate::session::{RefreshError, SessionAction};
use crate::transport::{TransportError, Variables};
use log::{debug, error, info, warn};
use serde_json::Value;

/// Variables whose values never reach the logs
const REDACTED_VARIABLES: [&str; 4] = ["password", "otp", "refreshToken", "idToken"];

pub struct LoggingHelper;

impl LoggingHelper {
    /// Copy of `variables` with secret values replaced
    #[must_use]
    pub fn redact_variables(variables: &Variables) -> Variables {
        variables
            .iter()
            .map(|(key, value)| {
                let value = if REDACTED_VARIABLES.contains(&key.as_str()) {
                    Value::String("<redacted>".to_string())
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Log an outgoing operation
    pub fn log_operation_start(
        document: &OperationDocument,
        operation_name: &str,
        requires_auth: bool,
        variables: &Variables,
    ) {
        debug!(
            "{}: {operation_name} (auth: {requires_auth}) variables: {}",
            document.kind.label(),
            Value::Object(Self::redact_variables(variables))
        );
    }

    pub fn log_operation_success(operation_name: &str) {
        debug!("✅ {operation_name} succeeded");
    }

    pub fn log_operation_failure(operation_name: &str, err: &TransportError, result: &ApiError) {
        warn!("❌ {operation_name} failed: {err} -> {}", result.code);
    }

    /// Log the retry that follows a successful refresh
    pub fn log_operation_retry(operation_name: &str) {
        info!("🔄 Retrying {operation_name} with refreshed token");
    }

    pub fn log_authorization_failure(operation_name: &str) {
        info!("🔐 {operation_name} was rejected as unauthorized, refreshing session");
    }

    pub fn log_refresh_start() {
        info!("🔄 Refreshing session tokens");
    }

    pub fn log_refresh_success() {
        info!("✅ Session tokens refreshed");
    }

    /// Log a caller served by the refresh that completed while it waited
    pub fn log_refresh_joined() {
        debug!("Session changed while waiting for refresh; reusing its outcome");
    }

    pub fn log_refresh_failure(err: &RefreshError) {
        error!("Token refresh failed: {err}");
    }

    pub fn log_session_expired(operation_name: &str) {
        warn!("Session expired during {operation_name}; logged out");
    }

    pub fn log_session_action(action: &SessionAction) {
        debug!("Session action: {action:?}");
    }

    /// Log the outcome of startup rehydration
    pub fn log_bootstrap(restored: bool) {
        if restored {
            info!("Session restored from stored credentials");
        } else {
            info!("No usable stored session; starting logged out");
        }
    }
}
