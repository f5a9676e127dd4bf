// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live-support session state machine.
//!
//! [`SessionMachine::apply`] is the only place the session state changes.
//! It is synchronous and performs no I/O: each [`Input`] yields the list of
//! [`Effect`]s the driver must carry out. Any (state, input) pair without a
//! transition leaves the machine untouched and yields no effects.
//!
//! ```text
//! Idle ──join──▶ InQueue ──accepted──▶ Connected ──chat_ended / end──▶ Ended
//!                  │  └──rejected──▶ Rejected                            │
//!                  └──timeout──▶ TimedOut          (re-join from any of these)
//! ```

use admit_core::{
    ChannelEvent, HistoryEntry, IncomingMessage, Message, NotificationEvent, QueueId, SessionId,
    UserId,
};
use tracing::{debug, info};

use crate::history;

/// Lifecycle state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state, and the state after a full reset.
    Idle,
    /// Waiting in the support queue for an officer.
    InQueue { queue_id: QueueId },
    /// Paired with an officer.
    Connected { session_id: SessionId },
    /// The chat finished. `awaiting_rating` holds the session to rate until
    /// the rating is submitted or dismissed.
    Ended { awaiting_rating: Option<SessionId> },
    /// Nobody accepted the request in time.
    TimedOut,
    /// The request was declined.
    Rejected { reason: Option<String> },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::InQueue { .. } => write!(f, "in_queue"),
            SessionState::Connected { .. } => write!(f, "connected"),
            SessionState::Ended { .. } => write!(f, "ended"),
            SessionState::TimedOut => write!(f, "timed_out"),
            SessionState::Rejected { .. } => write!(f, "rejected"),
        }
    }
}

impl SessionState {
    /// Whether the student may (re-)join the queue from here.
    pub fn can_join(&self) -> bool {
        matches!(
            self,
            SessionState::Idle
                | SessionState::Ended { .. }
                | SessionState::TimedOut
                | SessionState::Rejected { .. }
        )
    }

    pub fn queue_id(&self) -> Option<&QueueId> {
        match self {
            SessionState::InQueue { queue_id } => Some(queue_id),
            _ => None,
        }
    }

    /// The active session, only while connected.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            SessionState::Connected { session_id } => Some(session_id),
            _ => None,
        }
    }

    pub fn awaiting_rating(&self) -> Option<&SessionId> {
        match self {
            SessionState::Ended { awaiting_rating } => awaiting_rating.as_ref(),
            _ => None,
        }
    }
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// `joinQueue` succeeded.
    Joined { queue_id: QueueId },
    Notification(NotificationEvent),
    Channel(ChannelEvent),
    /// The history fetch launched at `generation` resolved. `None` on failure.
    HistoryLoaded {
        generation: u64,
        entries: Option<Vec<HistoryEntry>>,
    },
    /// The armed inactivity timer fired.
    InactivityElapsed,
    /// The local user's message was accepted by the channel.
    Sent(Message),
    /// The student ended the chat.
    EndRequested,
    /// The student asked to restore the message channel.
    Reconnect,
    RatingSubmitted,
    RatingDismissed,
    /// Teardown: unmount or explicit reset.
    Reset,
}

impl Input {
    fn name(&self) -> &'static str {
        match self {
            Input::Joined { .. } => "joined",
            Input::Notification(NotificationEvent::Queued { .. }) => "notification.queued",
            Input::Notification(NotificationEvent::Accepted { .. }) => "notification.accepted",
            Input::Notification(NotificationEvent::Rejected { .. }) => "notification.rejected",
            Input::Notification(NotificationEvent::ChatEnded) => "notification.chat_ended",
            Input::Channel(ChannelEvent::ChatConnected) => "channel.chat_connected",
            Input::Channel(ChannelEvent::Message(_)) => "channel.message",
            Input::Channel(ChannelEvent::ChatEnded) => "channel.chat_ended",
            Input::HistoryLoaded { .. } => "history_loaded",
            Input::InactivityElapsed => "inactivity_elapsed",
            Input::Sent(_) => "sent",
            Input::EndRequested => "end_requested",
            Input::Reconnect => "reconnect",
            Input::RatingSubmitted => "rating_submitted",
            Input::RatingDismissed => "rating_dismissed",
            Input::Reset => "reset",
        }
    }
}

/// Side effects requested by a transition, executed in order by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Subscribe to notifications unless a live subscription exists.
    EnsureNotifications,
    CloseNotifications,
    /// Open the message channel, closing any previous one first.
    OpenMessageChannel { session_id: SessionId },
    CloseMessageChannel,
    FetchHistory { session_id: SessionId, generation: u64 },
    ArmInactivityTimer,
    DisarmInactivityTimer,
    /// Best-effort `cancelQueue` for the local customer.
    CancelQueue,
    PromptRating { session_id: SessionId },
}

/// The session reducer with its owned data.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    messages: Vec<Message>,
    draft: String,
    local_user: Option<UserId>,
    generation: u64,
    history_pending: bool,
}

impl SessionMachine {
    pub fn new(local_user: Option<UserId>) -> Self {
        Self {
            state: SessionState::Idle,
            messages: Vec::new(),
            draft: String::new(),
            local_user,
            generation: 0,
            history_pending: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn local_user(&self) -> Option<UserId> {
        self.local_user
    }

    /// Increments on every state change; async results tagged with an
    /// older value are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history_pending(&self) -> bool {
        self.history_pending
    }

    pub fn set_local_user(&mut self, user: Option<UserId>) {
        self.local_user = user;
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Applies one input and returns the effects to execute.
    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        use SessionState as S;

        match (self.state.clone(), input) {
            (_, Input::Reset) => self.reset(),
            (state, Input::Joined { queue_id }) if state.can_join() => self.enter_queue(queue_id),

            (S::InQueue { .. }, Input::Notification(NotificationEvent::Queued { queue_id })) => {
                debug!(queue_id = %queue_id, "queue update");
                Vec::new()
            }
            (
                S::InQueue { .. },
                Input::Notification(NotificationEvent::Accepted { session_id }),
            ) => self.connect(session_id),
            (S::InQueue { .. }, Input::Notification(NotificationEvent::Rejected { reason })) => {
                self.reject(reason)
            }
            (S::InQueue { .. }, Input::InactivityElapsed) => self.time_out(),

            (S::Connected { session_id }, Input::Notification(NotificationEvent::ChatEnded))
            | (S::Connected { session_id }, Input::Channel(ChannelEvent::ChatEnded))
            | (S::Connected { session_id }, Input::EndRequested) => self.end(session_id),
            (S::Connected { .. }, Input::Channel(ChannelEvent::Message(incoming))) => {
                self.ingest(incoming);
                Vec::new()
            }
            (S::Connected { session_id }, Input::Channel(ChannelEvent::ChatConnected)) => {
                debug!(session_id = %session_id, "officer joined the chat");
                Vec::new()
            }
            (S::Connected { .. }, Input::HistoryLoaded { generation, entries })
                if generation == self.generation && self.history_pending =>
            {
                self.hydrate(entries);
                Vec::new()
            }
            (S::Connected { .. }, Input::Sent(message)) => {
                self.messages.push(message);
                self.draft.clear();
                Vec::new()
            }
            (S::Connected { session_id }, Input::Reconnect) => vec![
                Effect::EnsureNotifications,
                Effect::OpenMessageChannel { session_id },
            ],

            (
                S::Ended {
                    awaiting_rating: Some(session_id),
                },
                input @ (Input::RatingSubmitted | Input::RatingDismissed),
            ) => {
                info!(session_id = %session_id, outcome = input.name(), "rating prompt closed");
                self.state = S::Ended {
                    awaiting_rating: None,
                };
                Vec::new()
            }

            (state, input) => {
                debug!(state = %state, input = input.name(), "input ignored");
                Vec::new()
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = %self.state, to = %next, "session transition");
        self.state = next;
        self.generation += 1;
    }

    fn enter_queue(&mut self, queue_id: QueueId) -> Vec<Effect> {
        self.transition(SessionState::InQueue { queue_id });
        self.messages.clear();
        self.history_pending = false;
        vec![
            Effect::CloseMessageChannel,
            Effect::EnsureNotifications,
            Effect::ArmInactivityTimer,
        ]
    }

    fn connect(&mut self, session_id: SessionId) -> Vec<Effect> {
        self.transition(SessionState::Connected {
            session_id: session_id.clone(),
        });
        self.messages.clear();
        self.history_pending = true;
        vec![
            Effect::DisarmInactivityTimer,
            Effect::EnsureNotifications,
            Effect::OpenMessageChannel {
                session_id: session_id.clone(),
            },
            Effect::FetchHistory {
                session_id,
                generation: self.generation,
            },
        ]
    }

    fn reject(&mut self, reason: Option<String>) -> Vec<Effect> {
        self.transition(SessionState::Rejected { reason });
        self.messages.clear();
        vec![
            Effect::DisarmInactivityTimer,
            Effect::CloseMessageChannel,
            Effect::CloseNotifications,
        ]
    }

    fn time_out(&mut self) -> Vec<Effect> {
        self.transition(SessionState::TimedOut);
        self.messages.clear();
        vec![
            Effect::DisarmInactivityTimer,
            Effect::CancelQueue,
            Effect::CloseNotifications,
        ]
    }

    fn end(&mut self, session_id: SessionId) -> Vec<Effect> {
        self.transition(SessionState::Ended {
            awaiting_rating: Some(session_id.clone()),
        });
        self.messages.clear();
        self.draft.clear();
        self.history_pending = false;
        vec![
            Effect::CloseMessageChannel,
            Effect::CloseNotifications,
            Effect::PromptRating { session_id },
        ]
    }

    fn reset(&mut self) -> Vec<Effect> {
        if self.state != SessionState::Idle {
            self.transition(SessionState::Idle);
        } else {
            self.generation += 1;
        }
        self.messages.clear();
        self.draft.clear();
        self.history_pending = false;
        vec![
            Effect::DisarmInactivityTimer,
            Effect::CloseMessageChannel,
            Effect::CloseNotifications,
        ]
    }

    /// Appends a peer message. Self-echoes and known interaction ids are dropped.
    fn ingest(&mut self, incoming: IncomingMessage) {
        if Some(incoming.sender_id) == self.local_user {
            debug!(sender_id = %incoming.sender_id, "discarding self-echo");
            return;
        }
        if history::contains_interaction(&self.messages, incoming.interaction_id.as_deref()) {
            debug!(interaction_id = ?incoming.interaction_id, "discarding duplicate message");
            return;
        }
        self.messages
            .push(Message::from_incoming(&incoming, self.local_user));
    }

    fn hydrate(&mut self, entries: Option<Vec<HistoryEntry>>) {
        self.history_pending = false;
        match entries {
            Some(entries) => {
                let live = std::mem::take(&mut self.messages);
                self.messages = history::hydrate(&entries, live, self.local_user);
                debug!(count = entries.len(), "history merged");
            }
            None => debug!("history unavailable, keeping live messages only"),
        }
    }
}
