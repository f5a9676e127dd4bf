// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Admit live-support client.
//!
//! This crate provides the error taxonomy, the session data model, the
//! owned channel handles, and the seam traits that the transports and the
//! session state machine meet at.

pub mod error;
pub mod handle;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{AdmitError, ErrorCategory};
pub use handle::{Connection, ConnectionEnd, EventSink, Subscription};
pub use types::{
    ChannelEvent, EndSessionRequest, HistoryEntry, IncomingMessage, Message, NotificationEvent,
    OutgoingMessage, QueueId, QueueTicket, Rating, SenderType, SessionId, UserId,
};

pub use traits::{
    HistoryLoader, IdentitySource, MessageChannel, NotificationChannel, QueueClient,
    SessionTerminator, StaticIdentity, SupportBackend,
};
