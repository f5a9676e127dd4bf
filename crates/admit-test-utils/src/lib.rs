// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Admit integration tests.
//!
//! In-memory implementations of the channel and backend traits, so session
//! behavior can be exercised deterministically without a server.
//!
//! # Components
//!
//! - [`MockNotificationChannel`] - push events into the live subscription
//! - [`MockMessageChannel`] - inject peer events, capture outgoing payloads
//! - [`MockSupportBackend`] - scripted queue, history and end-session calls
//! - [`TestHarness`] - a [`SupportSession`](admit_support::SupportSession) wired to all three

pub mod harness;
pub mod mock_backend;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_backend::{BackendCall, MockSupportBackend};
pub use mock_channel::{MockMessageChannel, MockNotificationChannel};
