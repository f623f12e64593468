#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the petsnap-api crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod operations;
pub mod services;
pub mod session;
pub mod settings;
pub mod storage;
pub mod transport;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use client::{ApiClient, ClientError};
pub use dispatcher::{BatchOperation, RequestDispatcher};
pub use error::{ApiError, ApiResponse, ErrorCode, RequestResult};
pub use operations::{requires_auth, OperationDocument};
pub use session::{SessionContext, SessionState};
pub use settings::ClientSettings;
pub use storage::{Credential, CredentialStore, KeyValueStore};
pub use transport::{Transport, Variables};
