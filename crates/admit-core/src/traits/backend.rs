// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response contracts of the support backend.
//!
//! All calls are single-shot. Retries are an explicit re-invocation by the
//! caller, never automatic.

use async_trait::async_trait;

use crate::error::AdmitError;
use crate::types::{EndSessionRequest, HistoryEntry, QueueTicket, SessionId, UserId};

/// Joins and leaves the support queue.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Enters the queue. Fails with `QueueJoin` on rejection or transport failure.
    async fn join_queue(&self, customer_id: UserId) -> Result<QueueTicket, AdmitError>;

    /// Leaves the queue. Fails with `QueueCancel`; callers treat it as non-fatal.
    async fn cancel_queue(&self, customer_id: UserId) -> Result<(), AdmitError>;
}

/// One-shot fetch of the messages persisted for a session.
#[async_trait]
pub trait HistoryLoader: Send + Sync {
    async fn session_messages(&self, session_id: &SessionId)
    -> Result<Vec<HistoryEntry>, AdmitError>;
}

/// Terminates a session, optionally with a rating.
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    async fn end_session(&self, request: &EndSessionRequest) -> Result<(), AdmitError>;
}

/// The full backend surface consumed by the session driver.
pub trait SupportBackend: QueueClient + HistoryLoader + SessionTerminator {}

impl<T> SupportBackend for T where T: QueueClient + HistoryLoader + SessionTerminator {}
