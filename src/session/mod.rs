//! Session state, its owning context, and the refresh protocol

pub mod context;
pub mod refresh;
pub mod state;

pub use context::SessionContext;
pub use refresh::{RefreshError, SessionRefresher};
pub use state::{SessionAction, SessionState};
