//! Gateway HTTP client.

use std::time::Duration;

use common::models::document::DocumentQueryRequest;
use common::models::query::{ResultSet, SqlQueryRequest};
use common::response::ErrorResponse;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;

use crate::error::{ConsoleError, ConsoleResult};
use crate::state::Submission;

/// Default gateway address.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:5000";

/// Client for the query gateway endpoints.
#[derive(Clone)]
pub struct GatewayClient {
    base_url: Url,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Creates a client for the gateway at `base_url`. Requests wait as long
    /// as the gateway takes.
    pub fn new(base_url: &str) -> ConsoleResult<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Like [`GatewayClient::new`], failing requests that take longer than
    /// `timeout` with a transport error.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> ConsoleResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ConsoleError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConsoleError::InvalidUrl(base_url.to_string()));
        }
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { base_url, http })
    }

    /// Gateway base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /api/query/sql`
    pub async fn run_sql(&self, query: &str) -> ConsoleResult<ResultSet> {
        let response = self
            .http
            .post(self.endpoint(&["api", "query", "sql"])?)
            .json(&SqlQueryRequest::new(query))
            .send()
            .await?;
        decode(response).await
    }

    /// `POST /api/query/nosql`
    pub async fn run_document_query(&self, req: &DocumentQueryRequest) -> ConsoleResult<ResultSet> {
        let response = self
            .http
            .post(self.endpoint(&["api", "query", "nosql"])?)
            .json(req)
            .send()
            .await?;
        decode(response).await
    }

    /// Sends a console submission to the matching endpoint.
    pub async fn submit(&self, submission: &Submission) -> ConsoleResult<ResultSet> {
        match submission {
            Submission::Sql(query) => self.run_sql(query).await,
            Submission::Document(req) => self.run_document_query(req).await,
        }
    }

    /// `GET /api/query/sql/table/{name}`
    pub async fn fetch_table_preview(&self, table: &str) -> ConsoleResult<ResultSet> {
        let url = self.endpoint(&["api", "query", "sql", "table", table])?;
        decode(self.http.get(url).send().await?).await
    }

    /// `GET /api/query/sql/tables`
    pub async fn list_tables(&self) -> ConsoleResult<Vec<String>> {
        let url = self.endpoint(&["api", "query", "sql", "tables"])?;
        decode(self.http.get(url).send().await?).await
    }

    /// `GET /api/query/nosql/collections`
    pub async fn list_collections(&self) -> ConsoleResult<Vec<String>> {
        let url = self.endpoint(&["api", "query", "nosql", "collections"])?;
        decode(self.http.get(url).send().await?).await
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> ConsoleResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConsoleError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Decodes a success body, or turns an error status into [`ConsoleError::Gateway`].
///
/// The message is the body's `error` string when there is one, else a generic
/// `Request failed with status <code>`.
async fn decode<T: DeserializeOwned>(response: Response) -> ConsoleResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .map(|e| e.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

    tracing::debug!(status = status.as_u16(), %message, "gateway returned an error");
    Err(ConsoleError::Gateway {
        status: status.as_u16(),
        message,
    })
}
