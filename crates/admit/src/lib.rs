// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admit live-support client.
//!
//! Composition root: wires the reqwest, SSE and WebSocket transports from
//! `admit-transport` into a [`SupportSession`] built from an
//! [`AdmitConfig`], and installs the tracing subscriber.
//!
//! ```no_run
//! # async fn demo() -> Result<(), admit::AdmitError> {
//! use std::sync::Arc;
//! use admit::{StaticIdentity, UserId};
//!
//! let config = admit::AdmitConfig::default();
//! let identity = Arc::new(StaticIdentity::new(UserId(42), None));
//! let mut session = admit::bootstrap::build_session(&config, identity)?;
//! session.join_queue().await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod telemetry;

pub use admit_config::{AdmitConfig, ConfigError, load_and_validate};
pub use admit_core::{
    AdmitError, ErrorCategory, IdentitySource, Message, SenderType, SessionId, StaticIdentity,
    UserId,
};
pub use admit_support::{
    ChatView, Command, SessionHandle, SessionSettings, SessionSnapshot, SessionState,
    SupportSession,
};
pub use admit_transport::ChatbotClient;
