//! JSON-over-HTTP GraphQL transport shared by both endpoint clients

use crate::error::{ClientError, Result};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct GraphqlResponse<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

pub(crate) struct GraphqlTransport {
    endpoint: String,
    client: Client,
}

impl GraphqlTransport {
    pub(crate) fn new(endpoint: String, access_token: Option<&str>, timeout_secs: u64) -> Self {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = access_token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .expect("Invalid access token"),
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self { endpoint, client }
    }

    /// Execute one query or mutation and decode its `data` payload.
    /// Top-level GraphQL errors are transport-class failures; mutation-level
    /// userErrors stay inside the decoded payload for the caller to check.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&GraphqlRequest { query, variables })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status,
                message: body,
            });
        }

        let body: GraphqlResponse<T> = response.json().await?;
        if !body.errors.is_empty() {
            let joined = body
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ClientError::Graphql(joined));
        }

        body.data.ok_or(ClientError::MissingData("data"))
    }
}
