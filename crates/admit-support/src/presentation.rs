// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Render model for the live-support screen.
//!
//! A pure function of [`SessionSnapshot`]; the screen draws rows and toggles
//! its buttons from a [`ChatView`] without inspecting session state itself.

use admit_core::{Message, SenderType};

use crate::machine::SessionState;
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Officer bubble.
    Left,
    /// Student bubble.
    Right,
}

/// Delivery marker shown on the student's own messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMark {
    Sending,
    Delivered,
    Read,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub sender_type: SenderType,
    pub alignment: Alignment,
    /// `HH:MM`, UTC.
    pub time: String,
    pub mark: Option<DeliveryMark>,
}

impl MessageRow {
    fn from_message(message: &Message) -> Self {
        let (alignment, mark) = match message.sender_type {
            SenderType::Student => (Alignment::Right, Some(delivery_mark(message))),
            SenderType::Officer => (Alignment::Left, None),
        };
        Self {
            id: message.id.clone(),
            text: message.text.clone(),
            sender_type: message.sender_type,
            alignment,
            time: message.timestamp.format("%H:%M").to_string(),
            mark,
        }
    }
}

fn delivery_mark(message: &Message) -> DeliveryMark {
    if message.read {
        DeliveryMark::Read
    } else if message.delivered {
        DeliveryMark::Delivered
    } else {
        DeliveryMark::Sending
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub rows: Vec<MessageRow>,
    pub status: String,
    pub draft: String,
    pub notice: Option<String>,
    pub can_send: bool,
    pub show_join: bool,
    pub show_cancel: bool,
    pub show_end: bool,
    pub show_reconnect: bool,
    pub show_rating_prompt: bool,
    pub loading_history: bool,
}

impl ChatView {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let connected = matches!(snapshot.state, SessionState::Connected { .. });
        Self {
            rows: snapshot.messages.iter().map(MessageRow::from_message).collect(),
            status: status_text(&snapshot.state),
            draft: snapshot.draft.clone(),
            notice: snapshot.notice.clone(),
            can_send: connected && snapshot.channel_open && !snapshot.draft.trim().is_empty(),
            show_join: snapshot.state.can_join(),
            show_cancel: matches!(snapshot.state, SessionState::InQueue { .. }),
            show_end: connected,
            show_reconnect: (connected && !snapshot.channel_open)
                || snapshot.state == SessionState::TimedOut,
            show_rating_prompt: snapshot.state.awaiting_rating().is_some(),
            loading_history: connected && snapshot.history_pending,
        }
    }
}

/// Status banner text for a state.
pub fn status_text(state: &SessionState) -> String {
    match state {
        SessionState::Idle => "Tap \"Request support\" to join the queue.".to_string(),
        SessionState::InQueue { .. } => {
            "You are in the queue. Please wait for an admissions officer...".to_string()
        }
        SessionState::Connected { .. } => {
            "You are connected. Start the conversation.".to_string()
        }
        SessionState::Ended { .. } => "The chat has ended. You can start again.".to_string(),
        SessionState::TimedOut => {
            "All officers are busy. Please try reconnecting.".to_string()
        }
        SessionState::Rejected { reason: Some(reason) } if !reason.trim().is_empty() => {
            format!("Your request was declined: {reason}")
        }
        SessionState::Rejected { .. } => {
            "Your request was declined. You can send it again.".to_string()
        }
    }
}
