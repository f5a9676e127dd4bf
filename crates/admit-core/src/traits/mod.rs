// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seam traits between the session state machine and its collaborators.
//!
//! The session depends only on these contracts, never on a concrete
//! transport library. Async traits use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod backend;
pub mod channel;
pub mod identity;

pub use backend::{HistoryLoader, QueueClient, SessionTerminator, SupportBackend};
pub use channel::{MessageChannel, NotificationChannel};
pub use identity::{IdentitySource, StaticIdentity};
