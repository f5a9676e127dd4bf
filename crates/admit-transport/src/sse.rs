// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events notification channel.
//!
//! Converts the long-lived notification response into typed
//! [`NotificationEvent`]s using `eventsource-stream`, and pumps them into a
//! [`Subscription`] until either side goes away.

use std::pin::Pin;
use std::time::Duration;

use admit_core::{
    AdmitError, EventSink, NotificationChannel, NotificationEvent, Subscription, UserId,
};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use tracing::{debug, info, warn};

use crate::endpoints::Endpoints;
use crate::wire::parse_notification;

/// Notification channel over `GET {api}/live_chat/livechat/sse/customer/{customer}`.
#[derive(Debug, Clone)]
pub struct SseNotificationChannel {
    client: reqwest::Client,
    endpoints: Endpoints,
    buffer: usize,
}

impl SseNotificationChannel {
    /// Creates the channel. Only the connect phase is bounded by a timeout;
    /// the stream itself stays open indefinitely.
    pub fn new(
        endpoints: Endpoints,
        connect_timeout: Duration,
        buffer: usize,
    ) -> Result<Self, AdmitError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AdmitError::Config(format!("failed to build SSE client: {e}")))?;
        Ok(Self {
            client,
            endpoints,
            buffer,
        })
    }
}

#[async_trait]
impl NotificationChannel for SseNotificationChannel {
    async fn subscribe(
        &self,
        customer_id: UserId,
        auth_token: Option<&str>,
    ) -> Result<Subscription<NotificationEvent>, AdmitError> {
        let mut request = self
            .client
            .get(self.endpoints.notifications(customer_id))
            .header(ACCEPT, "text/event-stream");
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdmitError::ChannelConnection {
                message: format!("notification stream request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdmitError::channel(format!(
                "notification stream returned {status}"
            )));
        }

        let (subscription, sink) = Subscription::pair(self.buffer);
        tokio::spawn(pump(notification_stream(response), sink, customer_id));
        info!(customer_id = %customer_id, "notification stream opened");
        Ok(subscription)
    }
}

/// Parses a streaming response into notification events.
///
/// Heartbeats, unknown events and malformed payloads never leave this
/// function; the latter are logged and skipped.
pub fn notification_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = NotificationEvent> + Send>> {
    let mapped = response
        .bytes_stream()
        .eventsource()
        .filter_map(|result| async move {
            match result {
                Ok(event) => match parse_notification(&event.event, &event.data) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(error = %e, "dropping notification");
                        None
                    }
                },
                Err(e) => {
                    warn!(error = %e, "notification stream error");
                    None
                }
            }
        });
    Box::pin(mapped)
}

async fn pump(
    mut events: Pin<Box<dyn Stream<Item = NotificationEvent> + Send>>,
    sink: EventSink<NotificationEvent>,
    customer_id: UserId,
) {
    loop {
        tokio::select! {
            _ = sink.closed() => {
                debug!(customer_id = %customer_id, "notification subscription closed");
                break;
            }
            next = events.next() => match next {
                Some(event) => {
                    if !sink.send(event).await {
                        break;
                    }
                }
                None => {
                    info!(customer_id = %customer_id, "notification stream ended");
                    break;
                }
            },
        }
    }
}
