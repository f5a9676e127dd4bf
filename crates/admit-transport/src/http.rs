// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the live-support request/response API.
//!
//! Provides [`SupportHttpClient`], the reqwest-backed implementation of the
//! queue, history and session-termination seams.

use std::time::Duration;

use admit_core::{
    AdmitError, EndSessionRequest, ErrorCategory, HistoryEntry, HistoryLoader, QueueClient,
    QueueTicket, SessionId, SessionTerminator, UserId,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::endpoints::Endpoints;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP client for the support backend.
#[derive(Debug, Clone)]
pub struct SupportHttpClient {
    client: reqwest::Client,
    endpoints: Endpoints,
}

/// A failed call, before it is mapped onto the operation's error variant.
struct RequestFailure {
    message: String,
    category: ErrorCategory,
    source: Option<BoxError>,
}

impl RequestFailure {
    fn into_queue_join(self) -> AdmitError {
        AdmitError::QueueJoin {
            message: self.message,
            category: self.category,
            source: self.source,
        }
    }

    fn into_queue_cancel(self) -> AdmitError {
        AdmitError::QueueCancel {
            message: self.message,
            source: self.source,
        }
    }

    fn into_history(self) -> AdmitError {
        AdmitError::HistoryFetch {
            message: self.message,
            source: self.source,
        }
    }

    fn into_session_end(self) -> AdmitError {
        AdmitError::SessionEnd {
            message: self.message,
            category: self.category,
            source: self.source,
        }
    }

    fn into_rating(self) -> AdmitError {
        AdmitError::RatingSubmit {
            message: self.message,
            category: self.category,
            source: self.source,
        }
    }
}

/// `sessionMessages` returns a bare list on current backends and a
/// `{"messages": [...]}` wrapper on older ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    List(Vec<HistoryEntry>),
    Wrapped { messages: Vec<HistoryEntry> },
}

impl SupportHttpClient {
    /// Creates a client with a per-request timeout.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, AdmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdmitError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, endpoints))
    }

    /// Wraps an existing reqwest client (shared connection pool).
    pub fn with_client(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Sends the request and returns the decoded JSON body.
    ///
    /// A successful status whose body carries an `error` field still counts as
    /// a failure. An empty or non-JSON success body decodes to `Value::Null`.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, RequestFailure> {
        let response = request.send().await.map_err(|e| RequestFailure {
            message: format!("HTTP request failed: {e}"),
            category: ErrorCategory::Network,
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        debug!(status = %status, url = %response.url(), "support API response");
        let body = response.text().await.map_err(|e| RequestFailure {
            message: format!("failed to read response body: {e}"),
            category: ErrorCategory::Network,
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(RequestFailure {
                message: format!("API returned {status}: {}", error_detail(&body)),
                category: ErrorCategory::from_status(status.as_u16()),
                source: None,
            });
        }

        let value = serde_json::from_str(&body).unwrap_or(Value::Null);
        if let Some(error) = body_error(&value) {
            return Err(RequestFailure {
                message: format!("API reported an error: {error}"),
                category: ErrorCategory::Validation,
                source: None,
            });
        }
        Ok(value)
    }
}

/// The `error` field of a success body, when it is set to anything truthy.
fn body_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(body)
}

/// Extracts the server's explanation from an error body.
///
/// Prefers a JSON `detail` or `message` string and falls back to the raw body.
fn error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "<empty body>".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[async_trait]
impl QueueClient for SupportHttpClient {
    async fn join_queue(&self, customer_id: UserId) -> Result<QueueTicket, AdmitError> {
        let request = self.client.post(self.endpoints.join_queue(customer_id));
        let body = self
            .execute(request)
            .await
            .map_err(RequestFailure::into_queue_join)?;
        let ticket: QueueTicket = decode(body).map_err(|e| AdmitError::QueueJoin {
            message: format!("unexpected join response: {e}"),
            category: ErrorCategory::Unknown,
            source: Some(Box::new(e)),
        })?;
        info!(customer_id = %customer_id, queue_id = %ticket.queue_id, "joined support queue");
        Ok(ticket)
    }

    async fn cancel_queue(&self, customer_id: UserId) -> Result<(), AdmitError> {
        let request = self.client.post(self.endpoints.cancel_queue(customer_id));
        self.execute(request)
            .await
            .map_err(RequestFailure::into_queue_cancel)?;
        info!(customer_id = %customer_id, "left support queue");
        Ok(())
    }
}

#[async_trait]
impl HistoryLoader for SupportHttpClient {
    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<HistoryEntry>, AdmitError> {
        let request = self.client.get(self.endpoints.session_messages(session_id));
        let body = self
            .execute(request)
            .await
            .map_err(RequestFailure::into_history)?;
        let body: HistoryBody = decode(body).map_err(|e| AdmitError::HistoryFetch {
            message: format!("unexpected history response: {e}"),
            source: Some(Box::new(e)),
        })?;
        let entries = match body {
            HistoryBody::List(entries) | HistoryBody::Wrapped { messages: entries } => entries,
        };
        debug!(session_id = %session_id, count = entries.len(), "loaded session history");
        Ok(entries)
    }
}

#[async_trait]
impl SessionTerminator for SupportHttpClient {
    /// Failures map to `RatingSubmit` when a rating is attached and to
    /// `SessionEnd` otherwise.
    async fn end_session(&self, request: &EndSessionRequest) -> Result<(), AdmitError> {
        let url = self
            .endpoints
            .end_session(&request.session_id, request.ended_by, request.rating);
        self.execute(self.client.post(url))
            .await
            .map_err(|failure| match request.rating {
                Some(_) => failure.into_rating(),
                None => failure.into_session_end(),
            })?;
        info!(
            session_id = %request.session_id,
            rating = ?request.rating.map(|r| r.stars()),
            "session end recorded"
        );
        Ok(())
    }
}
