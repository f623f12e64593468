// End-to-end session flows over a scripted transport
use petsnap_api::error::ErrorCode;
use petsnap_api::operations::documents::{CREATE_USER, GET_USER_PROFILE, LOGIN, VERIFY_TOKEN};
use petsnap_api::storage::{Credential, CredentialField, EncryptedFileStore, MemoryStore};
use petsnap_api::testing::constants::{
    TEST_ACCESS_TOKEN, TEST_EMAIL, TEST_PASSWORD, TEST_REFRESH_TOKEN, TEST_USER_ID,
};
use petsnap_api::testing::{FailingStore, ScriptedResponse, TestFixtures};
use petsnap_api::{ApiClient, ApiError, BatchOperation, SessionState, Variables};
use serde_json::json;
use std::sync::Arc;

fn assert_credential_invariant(state: &SessionState) {
    let pair = state.access_token().is_some_and(|t| !t.is_empty())
        && state.refresh_token().is_some_and(|t| !t.is_empty());
    assert_eq!(state.is_authenticated(), pair, "{state:?}");
}

fn login_variables() -> Variables {
    let mut variables = Variables::new();
    variables.insert("email".into(), json!(TEST_EMAIL));
    variables.insert("password".into(), json!(TEST_PASSWORD));
    variables
}

#[tokio::test]
async fn test_login_persists_credentials() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    transport.push("login", TestFixtures::login_response("T1", "R1"));

    let data = client
        .users()
        .login(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();

    assert_eq!(data.id_token, "T1");
    let stored = client.session().store().load().await;
    assert_eq!(stored.access_token.as_deref(), Some("T1"));
    assert_eq!(stored.refresh_token.as_deref(), Some("R1"));
    assert_eq!(stored.user_id.as_deref(), Some(TEST_USER_ID));

    let state = client.session().snapshot();
    assert!(state.is_authenticated());
    assert_credential_invariant(&state);
    assert_eq!(transport.calls()[0].bearer, None);
}

#[tokio::test]
async fn test_execute_returns_login_payload_as_is() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    transport.push("login", TestFixtures::login_response("T1", "R1"));

    let data = client
        .execute(&LOGIN, login_variables(), "login")
        .await
        .unwrap();

    assert_eq!(data["login"]["status"], true);
    assert_eq!(data["login"]["data"]["idToken"], "T1");
    assert_eq!(transport.calls()[0].variables["email"], TEST_EMAIL);
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_expires_session() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    transport.push("getUserProfile", ScriptedResponse::unauthorized());

    let err = client
        .execute(&GET_USER_PROFILE, Variables::new(), "getUserProfile")
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::TokenExpired);
    assert_eq!(err.message, "Session expired. Please log in again.");
    assert_eq!(transport.count_for("refreshToken"), 0);
    assert_eq!(client.session().store().load().await, Credential::default());
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    client
        .session()
        .login_success(Credential::tokens("T1", "R1"))
        .await;
    transport
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("refreshToken", TestFixtures::refresh_response("T2", "R2"))
        .push("getUserProfile", TestFixtures::profile_response());

    let data = client
        .execute(&GET_USER_PROFILE, Variables::new(), "getUserProfile")
        .await
        .unwrap();

    assert_eq!(data, TestFixtures::profile_data());
    let stored = client.session().store().load().await;
    assert_eq!(stored.access_token.as_deref(), Some("T2"));
    assert_eq!(stored.refresh_token.as_deref(), Some("R2"));

    let profile_calls = transport.calls_for("getUserProfile");
    assert_eq!(profile_calls.len(), 2);
    assert_eq!(profile_calls[0].bearer.as_deref(), Some("T1"));
    assert_eq!(profile_calls[1].bearer.as_deref(), Some("T2"));
    assert_eq!(
        transport.calls_for("refreshToken")[0].variables["refreshToken"],
        "R1"
    );
    assert_credential_invariant(&client.session().snapshot());
}

#[tokio::test]
async fn test_token_expired_extension_triggers_refresh() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport
        .push("getUserProfile", ScriptedResponse::token_expired())
        .push("refreshToken", TestFixtures::refresh_response("T2", "R2"))
        .push("getUserProfile", TestFixtures::profile_response());

    let profile = client.users().get_user_profile().await.unwrap();

    assert_eq!(profile.id, TEST_USER_ID);
    assert_eq!(transport.count_for("refreshToken"), 1);
}

#[tokio::test]
async fn test_public_validation_failure_has_no_refresh() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport.push(
        "createUser",
        ScriptedResponse::graphql_error("Username is already taken", "INVALID_INPUT"),
    );

    let err = client
        .execute(&CREATE_USER, Variables::new(), "createUser")
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(err.message, "Username is already taken");
    assert_eq!(transport.count_for("refreshToken"), 0);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_public_operations_never_refresh() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport
        .push("login", ScriptedResponse::unauthorized())
        .push("login", ScriptedResponse::token_expired());

    for _ in 0..2 {
        assert!(client
            .execute(&LOGIN, login_variables(), "login")
            .await
            .is_err());
    }

    assert_eq!(transport.count_for("refreshToken"), 0);
    assert_eq!(transport.call_count(), 2);
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn test_retry_failure_is_final() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("refreshToken", TestFixtures::refresh_response("T2", "R2"))
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("getUserProfile", TestFixtures::profile_response());

    let err = client
        .execute(&GET_USER_PROFILE, Variables::new(), "getUserProfile")
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ServerError);
    assert_eq!(transport.count_for("getUserProfile"), 2);
    assert_eq!(transport.count_for("refreshToken"), 1);
}

#[tokio::test]
async fn test_refresh_failure_logs_out() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push(
            "refreshToken",
            ScriptedResponse::graphql_error("Invalid refresh token", "TOKEN_EXPIRED"),
        );

    let err = client.users().get_user_profile().await.unwrap_err();

    assert_eq!(err, ApiError::session_expired());
    assert_eq!(client.session().store().load().await, Credential::default());
    let state = client.session().snapshot();
    assert!(!state.is_authenticated());
    assert!(state.user_id().is_none());
    assert_credential_invariant(&state);
}

#[tokio::test]
async fn test_logout_during_refresh_stays_logged_out() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("refreshToken", TestFixtures::refresh_response("T2", "R2"))
        .push("getUserProfile", TestFixtures::profile_response());
    let hold = transport.hold("refreshToken");

    let pending = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .execute(&GET_USER_PROFILE, Variables::new(), "getUserProfile")
                .await
        }
    });
    hold.arrived().await;
    client.logout().await;
    hold.release();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err, ApiError::session_expired());
    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().store().load().await, Credential::default());
    assert_eq!(transport.count_for("getUserProfile"), 1);
}

#[tokio::test]
async fn test_bootstrap_with_empty_store() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);

    assert!(!client.bootstrap().await);
    assert_eq!(transport.call_count(), 0);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_bootstrap_with_one_token_makes_no_calls() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    client
        .session()
        .store()
        .set(CredentialField::RefreshToken, "R1")
        .await;

    assert!(!client.bootstrap().await);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_bootstrap_restores_session() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    client
        .session()
        .store()
        .save(&TestFixtures::credential())
        .await;
    transport.push("refreshToken", TestFixtures::refresh_response("T2", "R2"));

    assert!(client.bootstrap().await);

    let state = client.session().snapshot();
    assert!(state.is_authenticated());
    assert_eq!(state.access_token(), Some("T2"));
    assert_eq!(state.user_id(), Some(TEST_USER_ID));
    assert_eq!(state.email(), Some(TEST_EMAIL));
    assert_eq!(
        transport.calls()[0].variables["refreshToken"],
        TEST_REFRESH_TOKEN
    );
}

#[tokio::test]
async fn test_bootstrap_with_rejected_refresh() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    client
        .session()
        .store()
        .save(&TestFixtures::credential())
        .await;
    transport.push("refreshToken", ScriptedResponse::unauthorized());

    assert!(!client.bootstrap().await);
    assert_eq!(client.session().store().load().await, Credential::default());
    assert!(client.session().snapshot().last_error().is_some());
}

#[tokio::test]
async fn test_logout_twice() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;

    client.logout().await;
    let once = client.session().snapshot();
    let stored_once = client.session().store().load().await;
    client.logout().await;
    let twice = client.session().snapshot();

    assert_eq!(stored_once, Credential::default());
    assert_eq!(client.session().store().load().await, stored_once);
    assert_eq!(once.is_authenticated(), twice.is_authenticated());
    assert_eq!(once.credential(), twice.credential());
    assert_eq!(once.last_error(), twice.last_error());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_concurrent_expired_calls_share_one_refresh() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("getUserProfile", TestFixtures::profile_response())
        .push("getUserProfile", TestFixtures::profile_response())
        .push("refreshToken", TestFixtures::refresh_response("T2", "R2"));

    let (first, second) = tokio::join!(
        client.users().get_user_profile(),
        client.users().get_user_profile()
    );

    assert!(first.is_ok(), "{first:?}");
    assert!(second.is_ok(), "{second:?}");
    assert_eq!(transport.count_for("refreshToken"), 1);

    let calls = transport.calls_for("getUserProfile");
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].bearer.as_deref(), Some(TEST_ACCESS_TOKEN));
    assert_eq!(calls[1].bearer.as_deref(), Some(TEST_ACCESS_TOKEN));
    assert_eq!(calls[2].bearer.as_deref(), Some("T2"));
    assert_eq!(calls[3].bearer.as_deref(), Some("T2"));

    let stored = client.session().store().load().await;
    assert_eq!(stored.refresh_token.as_deref(), Some("R2"));
}

#[tokio::test]
async fn test_subscribers_observe_consistent_states() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::client(&transport);
    let mut updates = client.session().subscribe();
    transport
        .push("login", TestFixtures::login_response("T1", "R1"))
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("refreshToken", ScriptedResponse::unauthorized());

    client
        .users()
        .login(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();
    assert!(updates.has_changed().unwrap());
    let after_login = updates.borrow_and_update().clone();
    assert!(after_login.is_authenticated());
    assert_credential_invariant(&after_login);

    let _ = client.users().get_user_profile().await;
    assert!(updates.has_changed().unwrap());
    let after_expiry = updates.borrow_and_update().clone();
    assert!(!after_expiry.is_authenticated());
    assert_credential_invariant(&after_expiry);
}

#[tokio::test]
async fn test_storage_failures_do_not_break_login() {
    let transport = TestFixtures::transport();
    let client = ApiClient::new(transport.clone(), Arc::new(FailingStore));
    transport
        .push("login", TestFixtures::login_response("T1", "R1"))
        .push("getUserProfile", TestFixtures::profile_response());

    client
        .users()
        .login(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();
    assert!(client.session().is_authenticated());

    // The in-memory session still supplies the bearer token.
    client.users().get_user_profile().await.unwrap();
    assert_eq!(
        transport.calls_for("getUserProfile")[0].bearer.as_deref(),
        Some("T1")
    );
}

#[tokio::test]
async fn test_session_survives_restart_with_encrypted_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.enc");

    let transport = TestFixtures::transport();
    let client = ApiClient::new(
        transport.clone(),
        Arc::new(EncryptedFileStore::new(&path, b"test-secret")),
    );
    transport.push("login", TestFixtures::login_response("T1", "R1"));
    client
        .users()
        .login(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();
    drop(client);

    let transport = TestFixtures::transport();
    let restarted = ApiClient::new(
        transport.clone(),
        Arc::new(EncryptedFileStore::new(&path, b"test-secret")),
    );
    transport.push("refreshToken", TestFixtures::refresh_response("T2", "R2"));

    assert!(restarted.bootstrap().await);
    assert_eq!(
        transport.calls()[0].variables["refreshToken"],
        "R1"
    );
    assert_eq!(restarted.session().snapshot().user_id(), Some(TEST_USER_ID));
}

#[tokio::test]
async fn test_memory_clients_do_not_share_sessions() {
    let transport = TestFixtures::transport();
    let first = ApiClient::new(transport.clone(), Arc::new(MemoryStore::new()));
    let second = ApiClient::new(transport.clone(), Arc::new(MemoryStore::new()));

    first
        .session()
        .login_success(TestFixtures::credential())
        .await;

    assert!(first.session().is_authenticated());
    assert!(!second.session().is_authenticated());
}

#[tokio::test]
async fn test_batch_with_expired_session_refreshes_once() {
    let transport = TestFixtures::transport();
    let client = TestFixtures::logged_in_client(&transport).await;
    transport
        .push("getUserProfile", ScriptedResponse::unauthorized())
        .push("verifyToken", ScriptedResponse::token_expired())
        .push("refreshToken", TestFixtures::refresh_response("T2", "R2"))
        .push("getUserProfile", TestFixtures::profile_response())
        .push(
            "verifyToken",
            TestFixtures::status_response("verifyToken", true, None, "Token is valid"),
        );

    let mut verify = Variables::new();
    verify.insert("idToken".into(), json!(TEST_ACCESS_TOKEN));
    let results = client
        .execute_all(vec![
            BatchOperation::new(&GET_USER_PROFILE, Variables::new()),
            BatchOperation::new(&VERIFY_TOKEN, verify).named("verify"),
        ])
        .await;

    assert_eq!(
        results["getUserProfile"].as_ref().unwrap(),
        &TestFixtures::profile_data()
    );
    assert_eq!(results["verify"].as_ref().unwrap()["verifyToken"]["status"], true);
    assert_eq!(transport.count_for("refreshToken"), 1);
    assert_credential_invariant(&client.session().snapshot());
}
