// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live-support session for the Admit client.
//!
//! [`machine`] holds the pure reducer that owns every lifecycle transition.
//! [`session`] drives it against the channel and backend traits from
//! `admit-core`, and [`presentation`] turns published snapshots into a
//! render model.

pub mod history;
pub mod machine;
pub mod presentation;
pub mod rating;
pub mod session;
pub mod timer;

pub use machine::{Effect, Input, SessionMachine, SessionState};
pub use presentation::{Alignment, ChatView, DeliveryMark, MessageRow};
pub use session::{
    Command, Request, SessionHandle, SessionSettings, SessionSnapshot, SupportSession,
};
pub use timer::{InactivityTimer, TimerId};
