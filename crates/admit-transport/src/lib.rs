// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network transports for the Admit live-support client.
//!
//! - [`SupportHttpClient`]: queue, history and session-end calls (reqwest).
//! - [`SseNotificationChannel`]: per-customer notification stream (SSE).
//! - [`WsMessageChannel`]: per-session duplex chat channel (WebSocket).
//! - [`ChatbotClient`]: streamed answers from the AI admissions bot.

pub mod chatbot;
pub mod endpoints;
pub mod http;
pub mod sse;
pub mod wire;
pub mod ws;

pub use chatbot::ChatbotClient;
pub use endpoints::Endpoints;
pub use http::SupportHttpClient;
pub use sse::SseNotificationChannel;
pub use ws::WsMessageChannel;
