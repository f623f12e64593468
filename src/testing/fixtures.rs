//! Test fixtures providing pre-built test objects

use super::constants::{
    TEST_ACCESS_TOKEN, TEST_EMAIL, TEST_ENDPOINT, TEST_REFRESH_TOKEN, TEST_USER_ID,
};
use super::mock::{MockTransport, ScriptedResponse};
use crate::client::ApiClient;
use crate::settings::ClientSettings;
use crate::storage::{Credential, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Complete credential for the default test user
    #[must_use]
    pub fn credential() -> Credential {
        Credential::tokens(TEST_ACCESS_TOKEN, TEST_REFRESH_TOKEN)
            .with_identity(Some(TEST_USER_ID.to_string()), Some(TEST_EMAIL.to_string()))
    }

    /// Settings pointing at a local endpoint with in-memory storage
    #[must_use]
    pub fn settings() -> ClientSettings {
        let mut settings = ClientSettings::default();
        settings.api.endpoint = TEST_ENDPOINT.to_string();
        settings.api.timeout_seconds = 5;
        settings
    }

    #[must_use]
    pub fn transport() -> Arc<MockTransport> {
        Arc::new(MockTransport::new())
    }

    /// Client over `transport` with an empty in-memory store
    #[must_use]
    pub fn client(transport: &Arc<MockTransport>) -> ApiClient {
        ApiClient::new(transport.clone(), Arc::new(MemoryStore::new()))
    }

    /// Client whose session already holds [`TestFixtures::credential`]
    pub async fn logged_in_client(transport: &Arc<MockTransport>) -> ApiClient {
        let client = Self::client(transport);
        client.session().login_success(Self::credential()).await;
        client
    }

    /// `login` response accepting the given tokens
    #[must_use]
    pub fn login_response(access_token: &str, refresh_token: &str) -> ScriptedResponse {
        ScriptedResponse::data(json!({
            "login": {
                "status": true,
                "code": null,
                "message": "Login successful",
                "data": {
                    "idToken": access_token,
                    "refreshToken": refresh_token,
                    "userId": TEST_USER_ID,
                    "email": TEST_EMAIL
                }
            }
        }))
    }

    /// `refreshToken` response issuing the given pair
    #[must_use]
    pub fn refresh_response(access_token: &str, refresh_token: &str) -> ScriptedResponse {
        ScriptedResponse::data(json!({
            "refreshToken": {
                "idToken": access_token,
                "refreshToken": refresh_token,
                "uid": TEST_USER_ID,
                "email": TEST_EMAIL
            }
        }))
    }

    #[must_use]
    pub fn profile_response() -> ScriptedResponse {
        ScriptedResponse::data(Self::profile_data())
    }

    #[must_use]
    pub fn profile_data() -> Value {
        json!({
            "getUserProfile": {
                "id": TEST_USER_ID,
                "email": TEST_EMAIL,
                "name": "Test User",
                "createdAt": "2024-01-01T00:00:00Z"
            }
        })
    }

    /// `{ status, code, message }` acknowledgement under `root_field`
    #[must_use]
    pub fn status_response(
        root_field: &str,
        status: bool,
        code: Option<&str>,
        message: &str,
    ) -> ScriptedResponse {
        let mut data = serde_json::Map::new();
        data.insert(
            root_field.to_string(),
            json!({ "status": status, "code": code, "message": message }),
        );
        ScriptedResponse::data(Value::Object(data))
    }
}
