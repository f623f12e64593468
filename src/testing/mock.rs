//! Mock objects and fake implementations for testing
//!
//! [`MockTransport`] answers each operation from a per-operation queue of
//! scripted responses and records every request it receives.

use crate::operations::OperationDocument;
use crate::storage::{KeyValueStore, StorageError};
use crate::transport::{GraphqlError, Transport, TransportError, Variables, TOKEN_EXPIRED_CODE};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// One scripted transport outcome
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Data(Value),
    Error(TransportError),
}

impl ScriptedResponse {
    #[must_use]
    pub fn data(data: Value) -> Self {
        ScriptedResponse::Data(data)
    }

    #[must_use]
    pub fn error(error: TransportError) -> Self {
        ScriptedResponse::Error(error)
    }

    /// HTTP 401
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::error(TransportError::Http {
            status: 401,
            message: "Request failed with status code 401".to_string(),
        })
    }

    /// GraphQL error carrying `extensions.code == TOKEN_EXPIRED`
    #[must_use]
    pub fn token_expired() -> Self {
        Self::graphql_error("jwt expired", TOKEN_EXPIRED_CODE)
    }

    #[must_use]
    pub fn graphql_error(message: &str, code: &str) -> Self {
        Self::error(TransportError::graphql(vec![GraphqlError::with_code(
            message, code,
        )]))
    }

    #[must_use]
    pub fn offline() -> Self {
        Self::error(TransportError::Network("connection refused".to_string()))
    }
}

/// A request seen by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub variables: Variables,
    pub bearer: Option<String>,
}

/// Parks the next call to one operation until released
#[derive(Default)]
pub struct Hold {
    arrived: Notify,
    released: Notify,
}

impl Hold {
    /// Wait until the held call has reached the transport
    pub async fn arrived(&self) {
        self.arrived.notified().await;
    }

    /// Let the held call return its scripted response
    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[derive(Default)]
struct MockState {
    scripts: HashMap<String, VecDeque<ScriptedResponse>>,
    holds: HashMap<String, Arc<Hold>>,
    calls: Vec<RecordedCall>,
}

/// Scripted [`Transport`]
///
/// An operation with no scripted response left fails as a network error.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `response` for the next call to `operation`
    pub fn push(&self, operation: &str, response: ScriptedResponse) -> &Self {
        self.state()
            .scripts
            .entry(operation.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Park the next call to `operation` until the returned [`Hold`] is released
    #[must_use]
    pub fn hold(&self, operation: &str) -> Arc<Hold> {
        let hold = Arc::new(Hold::default());
        self.state()
            .holds
            .insert(operation.to_string(), hold.clone());
        hold
    }

    /// Every call received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of calls received for `operation`
    #[must_use]
    pub fn count_for(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Calls received for `operation`, in order
    #[must_use]
    pub fn calls_for(&self, operation: &str) -> Vec<RecordedCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        document: &OperationDocument,
        variables: &Variables,
        bearer: Option<&str>,
    ) -> Result<Value, TransportError> {
        let (scripted, hold) = {
            let mut state = self.state();
            state.calls.push(RecordedCall {
                operation: document.name.to_string(),
                variables: variables.clone(),
                bearer: bearer.map(str::to_string),
            });
            let scripted = state
                .scripts
                .get_mut(document.name)
                .and_then(VecDeque::pop_front);
            (scripted, state.holds.remove(document.name))
        };

        if let Some(hold) = hold {
            hold.arrived.notify_one();
            hold.released.notified().await;
        }
        // Let other in-flight requests reach the transport before answering.
        tokio::task::yield_now().await;

        match scripted {
            Some(ScriptedResponse::Data(data)) => Ok(data),
            Some(ScriptedResponse::Error(error)) => Err(error),
            None => Err(TransportError::Network(format!(
                "no scripted response for {}",
                document.name
            ))),
        }
    }
}

/// Backend whose every operation fails
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("read refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("write refused".to_string()))
    }

    async fn multi_remove(&self, _keys: &[&str]) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("remove refused".to_string()))
    }
}
