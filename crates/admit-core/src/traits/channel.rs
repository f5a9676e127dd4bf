// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel traits for server push (notifications) and duplex chat messages.

use async_trait::async_trait;

use crate::error::AdmitError;
use crate::handle::{Connection, Subscription};
use crate::types::{NotificationEvent, SessionId, UserId};

/// Subscribe-only server push channel scoped to a customer.
///
/// Implementations drop malformed payloads and heartbeats before they reach
/// the subscription, and never raise transport errors to the consumer after
/// `subscribe` returned. Resubscribing is the caller's decision.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Opens a long-lived event stream for `customer_id`.
    async fn subscribe(
        &self,
        customer_id: UserId,
        auth_token: Option<&str>,
    ) -> Result<Subscription<NotificationEvent>, AdmitError>;
}

/// Bidirectional message channel scoped to an accepted session.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Opens the channel for `session_id`. The returned connection is ready
    /// for sends once the transport marked it open.
    async fn connect(&self, session_id: &SessionId) -> Result<Connection, AdmitError>;
}
