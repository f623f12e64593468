//! Testing utilities for petsnap-api
//!
//! Available to unit tests and, through the `testing` feature, to the
//! integration tests under `tests/`.
//!
//! - [`fixtures`] - Pre-built credentials, settings, clients and backend payloads
//! - [`mock`] - Scripted transport and failing storage backend
//!
//! ## Usage
//!
//! ```rust,ignore
//! use petsnap_api::testing::{fixtures::TestFixtures, mock::ScriptedResponse};
//!
//! # async fn example() {
//! let transport = TestFixtures::transport();
//! transport.push("getUserProfile", ScriptedResponse::unauthorized());
//! let client = TestFixtures::logged_in_client(&transport).await;
//! # }
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{FailingStore, Hold, MockTransport, RecordedCall, ScriptedResponse};

/// Common test constants
pub mod constants {
    /// Default test email address
    pub const TEST_EMAIL: &str = "test@example.com";

    /// Default test user id
    pub const TEST_USER_ID: &str = "user-123";

    /// Default test password
    pub const TEST_PASSWORD: &str = "secret123";

    /// Access token held by fixture sessions
    pub const TEST_ACCESS_TOKEN: &str = "test_access_token";

    /// Refresh token held by fixture sessions
    pub const TEST_REFRESH_TOKEN: &str = "test_refresh_token";

    /// Endpoint used by fixture settings
    pub const TEST_ENDPOINT: &str = "http://localhost:4000/graphql";
}
