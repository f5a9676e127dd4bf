// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Admit live-support client.
//!
//! Transport and parsing failures are contained at the channel boundary.
//! Only operation-level errors (join, cancel, send, end, rate) reach the
//! presentation layer, and each of them renders to a human-readable,
//! retryable message through [`AdmitError::user_message`].

use strum::Display;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across the Admit crates.
#[derive(Debug, Error)]
pub enum AdmitError {
    /// Joining the support queue failed (missing identity, network, server rejection).
    #[error("queue join failed: {message}")]
    QueueJoin {
        message: String,
        category: ErrorCategory,
        source: Option<BoxError>,
    },

    /// Cancelling the queue entry failed. Never blocks the local reset.
    #[error("queue cancel failed: {message}")]
    QueueCancel {
        message: String,
        source: Option<BoxError>,
    },

    /// A send was attempted while the message channel is not open.
    #[error("message channel is not open")]
    ChannelNotOpen,

    /// Transport-level failure on either channel.
    #[error("channel connection error: {message}")]
    ChannelConnection {
        message: String,
        source: Option<BoxError>,
    },

    /// Loading prior session messages failed. Non-fatal.
    #[error("history fetch failed: {message}")]
    HistoryFetch {
        message: String,
        source: Option<BoxError>,
    },

    /// Ending the session from the chat screen failed. The chat stays open.
    #[error("session end failed: {message}")]
    SessionEnd {
        message: String,
        category: ErrorCategory,
        source: Option<BoxError>,
    },

    /// Submitting the session rating failed.
    #[error("rating submission failed: {message}")]
    RatingSubmit {
        message: String,
        category: ErrorCategory,
        source: Option<BoxError>,
    },

    /// The rating was missing or outside 1..=5. Raised before any network call.
    #[error("invalid rating: {0}")]
    RatingValidation(String),

    /// A channel payload could not be parsed. Dropped at the parsing boundary.
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// The AI chatbot reported an error or hung up before finishing its reply.
    #[error("chatbot error: {0}")]
    Chatbot(String),

    /// The operation is not allowed in the current session state.
    #[error("operation `{operation}` not allowed while {state}")]
    InvalidState { operation: String, state: String },

    /// Configuration errors (invalid URL, bad header value).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a failed request, used to pick user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// No response: DNS, connect, TLS or timeout failure.
    Network,
    /// 401 / 403.
    Auth,
    /// Any other 4xx.
    Validation,
    /// 5xx.
    Server,
    Unknown,
}

impl ErrorCategory {
    /// Classifies an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorCategory::Auth,
            400..=499 => ErrorCategory::Validation,
            500..=599 => ErrorCategory::Server,
            _ => ErrorCategory::Unknown,
        }
    }

    fn user_message(self) -> &'static str {
        match self {
            ErrorCategory::Network => {
                "Cannot reach the server. Please check your internet connection."
            }
            ErrorCategory::Auth => "Your sign-in has expired. Please log in again.",
            ErrorCategory::Validation => "The request was not accepted.",
            ErrorCategory::Server => "The server had a problem. Please try again later.",
            ErrorCategory::Unknown => "Something went wrong.",
        }
    }
}

impl AdmitError {
    /// Builds a `QueueJoin` error without an upstream cause.
    pub fn queue_join(message: impl Into<String>, category: ErrorCategory) -> Self {
        AdmitError::QueueJoin {
            message: message.into(),
            category,
            source: None,
        }
    }

    /// Builds a `ChannelConnection` error without an upstream cause.
    pub fn channel(message: impl Into<String>) -> Self {
        AdmitError::ChannelConnection {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a `MalformedPayload` error.
    pub fn malformed(message: impl Into<String>) -> Self {
        AdmitError::MalformedPayload {
            message: message.into(),
        }
    }

    /// Builds an `InvalidState` error.
    pub fn invalid_state(operation: &str, state: impl std::fmt::Display) -> Self {
        AdmitError::InvalidState {
            operation: operation.to_string(),
            state: state.to_string(),
        }
    }

    /// Whether the user can meaningfully retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdmitError::QueueJoin { category, .. }
            | AdmitError::SessionEnd { category, .. }
            | AdmitError::RatingSubmit { category, .. } => *category != ErrorCategory::Auth,
            AdmitError::QueueCancel { .. }
            | AdmitError::ChannelNotOpen
            | AdmitError::ChannelConnection { .. }
            | AdmitError::HistoryFetch { .. }
            | AdmitError::RatingValidation(_)
            | AdmitError::Chatbot(_) => true,
            AdmitError::MalformedPayload { .. }
            | AdmitError::InvalidState { .. }
            | AdmitError::Config(_)
            | AdmitError::Internal(_) => false,
        }
    }

    /// Human-readable text for the presentation layer.
    pub fn user_message(&self) -> String {
        match self {
            AdmitError::QueueJoin { category, .. } => format!(
                "Could not join the support queue. {} Tap to retry.",
                category.user_message()
            ),
            AdmitError::QueueCancel { .. } => "Left the queue.".to_string(),
            AdmitError::ChannelNotOpen => {
                "Not connected to the chat. Reconnect and try sending again.".to_string()
            }
            AdmitError::ChannelConnection { .. } => {
                "Connection to the chat was interrupted. Reconnect to continue.".to_string()
            }
            AdmitError::HistoryFetch { .. } => {
                "Earlier messages could not be loaded.".to_string()
            }
            AdmitError::SessionEnd { category, .. } => format!(
                "Could not end the chat. {} Please try again.",
                category.user_message()
            ),
            AdmitError::RatingSubmit { category, .. } => format!(
                "Could not submit your rating. {} You can try again.",
                category.user_message()
            ),
            AdmitError::RatingValidation(_) => {
                "Please select a rating from 1 to 5 stars.".to_string()
            }
            AdmitError::Chatbot(_) => {
                "The chatbot could not answer. Please try again later.".to_string()
            }
            AdmitError::InvalidState { .. } => {
                "That action is not available right now.".to_string()
            }
            AdmitError::MalformedPayload { .. }
            | AdmitError::Config(_)
            | AdmitError::Internal(_) => ErrorCategory::Unknown.user_message().to_string(),
        }
    }
}
