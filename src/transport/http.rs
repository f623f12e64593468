//! GraphQL over HTTP

use super::{GraphqlError, Transport, TransportError, Variables};
use crate::client::ClientError;
use crate::operations::OperationDocument;
use crate::settings::ApiSettings;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

const CLIENT_USER_AGENT: &str = concat!("petsnap-api/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: &'a Variables,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

/// [`Transport`] posting JSON requests to a single GraphQL endpoint
#[derive(Debug, Clone)]
pub struct GraphqlHttpTransport {
    client: Client,
    endpoint: Url,
}

impl GraphqlHttpTransport {
    /// Build a transport for `endpoint` with a per-request `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Build a transport from the `[api]` settings section
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP client
    /// cannot be constructed
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ClientError> {
        let endpoint = settings.endpoint_url()?;
        Ok(Self::new(endpoint, settings.timeout())?)
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for GraphqlHttpTransport {
    async fn send(
        &self,
        document: &OperationDocument,
        variables: &Variables,
        bearer: Option<&str>,
    ) -> Result<Value, TransportError> {
        let body = GraphqlRequest {
            query: document.source,
            variables,
        };

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        debug!(
            "{} '{}' answered with HTTP {status}",
            document.kind.label(),
            document.name
        );
        parse_response(status, &text)
    }
}

/// Classify an HTTP status and body into the `data` payload or a failure
///
/// A 401 always wins so an expired session is detected even when the body
/// carries unrelated GraphQL errors.
pub(crate) fn parse_response(status: u16, body: &str) -> Result<Value, TransportError> {
    if status == 401 {
        return Err(TransportError::Http {
            status,
            message: status_message(status),
        });
    }

    let success = (200..300).contains(&status);
    let parsed: GraphqlResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) if !success => {
            return Err(TransportError::Http {
                status,
                message: status_message(status),
            })
        }
        Err(e) => return Err(TransportError::InvalidResponse(e.to_string())),
    };

    if let Some(errors) = parsed.errors.filter(|errors| !errors.is_empty()) {
        return Err(TransportError::Graphql { status, errors });
    }
    if !success {
        return Err(TransportError::Http {
            status,
            message: status_message(status),
        });
    }

    match parsed.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(TransportError::InvalidResponse(
            "response carried no data".to_string(),
        )),
    }
}

fn status_message(status: u16) -> String {
    format!("Request failed with status code {status}")
}
