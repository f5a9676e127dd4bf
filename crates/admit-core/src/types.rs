// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transports, the session state machine and the
//! presentation layer.
//!
//! Identifiers arrive from the backend both as JSON numbers and as strings,
//! so every id type deserializes from either form.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::Display;

use crate::error::AdmitError;

/// An id as it appears on the wire: number or string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(i64),
    Str(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Num(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

/// Backend-assigned identifier of an accepted live-chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| SessionId(raw.into_string()))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        SessionId(raw.to_string())
    }
}

impl From<i64> for SessionId {
    fn from(raw: i64) -> Self {
        SessionId(raw.to_string())
    }
}

/// Identifier of a queue entry. Present only while queued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QueueId(pub String);

impl<'de> Deserialize<'de> for QueueId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| QueueId(raw.into_string()))
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl QueueId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QueueId {
    fn from(raw: &str) -> Self {
        QueueId(raw.to_string())
    }
}

impl From<i64> for QueueId {
    fn from(raw: i64) -> Self {
        QueueId(raw.to_string())
    }
}

/// Numeric identity of a user: the student (customer) or a support officer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Num(n) => Ok(UserId(n)),
            RawId::Str(s) => s
                .trim()
                .parse()
                .map(UserId)
                .map_err(|_| serde::de::Error::custom(format!("non-numeric user id `{s}`"))),
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn deserialize_opt_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_string))
}

/// Who authored a message, relative to the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Student,
    Officer,
}

impl SenderType {
    /// Classifies `sender` against the local user id.
    pub fn classify(sender: UserId, local_user: Option<UserId>) -> Self {
        if Some(sender) == local_user {
            SenderType::Student
        } else {
            SenderType::Officer
        }
    }
}

/// A single chat line in the session's message list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Server interaction id when known, otherwise a locally generated UUID.
    pub id: String,
    pub text: String,
    pub sender_id: UserId,
    pub sender_type: SenderType,
    pub timestamp: DateTime<Utc>,
    pub delivered: bool,
    pub read: bool,
}

impl Message {
    /// A message the local user just sent; accepted by the channel, not yet read.
    pub fn local(sender_id: UserId, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            sender_id,
            sender_type: SenderType::Student,
            timestamp: Utc::now(),
            delivered: true,
            read: false,
        }
    }

    /// A peer message received on the message channel. Peer messages count as read.
    pub fn from_incoming(incoming: &IncomingMessage, local_user: Option<UserId>) -> Self {
        Self {
            id: incoming
                .interaction_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            text: incoming.message.clone(),
            sender_id: incoming.sender_id,
            sender_type: SenderType::classify(incoming.sender_id, local_user),
            timestamp: parse_timestamp(incoming.timestamp.as_deref()),
            delivered: true,
            read: Some(incoming.sender_id) != local_user,
        }
    }

    /// A persisted message loaded from session history.
    ///
    /// Only the peer's messages are marked read; the student's own stay unread.
    pub fn from_history(entry: &HistoryEntry, local_user: Option<UserId>) -> Self {
        Self {
            id: entry
                .interaction_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            text: entry.message_text.clone(),
            sender_id: entry.sender_id,
            sender_type: SenderType::classify(entry.sender_id, local_user),
            timestamp: parse_timestamp(entry.timestamp.as_deref()),
            delivered: true,
            read: Some(entry.sender_id) != local_user,
        }
    }
}

/// Parses a server timestamp, falling back to the local receipt time.
///
/// Accepts RFC 3339 and naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` (taken as UTC).
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Utc::now();
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.and_utc();
        }
    }
    Utc::now()
}

// --- Channel events ---

/// Typed events from the notification channel, heartbeats already removed.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Queued { queue_id: QueueId },
    Accepted { session_id: SessionId },
    Rejected { reason: Option<String> },
    ChatEnded,
}

/// A chat line as delivered by the message channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "senderId", alias = "sender_id")]
    pub sender_id: UserId,
    #[serde(default, alias = "message_text")]
    pub message: String,
    #[serde(
        default,
        rename = "interactionId",
        alias = "interaction_id",
        deserialize_with = "deserialize_opt_id"
    )]
    pub interaction_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Typed events from the message channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Informational only.
    ChatConnected,
    Message(IncomingMessage),
    ChatEnded,
}

/// Client to server payload on the message channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub sender_id: UserId,
    pub message: String,
}

// --- HTTP payloads ---

/// Response of `joinQueue`. Older backends name the id `id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawTicket")]
pub struct QueueTicket {
    pub queue_id: QueueId,
}

#[derive(Deserialize)]
struct RawTicket {
    #[serde(default)]
    queue_id: Option<QueueId>,
    #[serde(default)]
    id: Option<QueueId>,
}

impl TryFrom<RawTicket> for QueueTicket {
    type Error = String;

    fn try_from(raw: RawTicket) -> Result<Self, Self::Error> {
        raw.queue_id
            .or(raw.id)
            .map(|queue_id| QueueTicket { queue_id })
            .ok_or_else(|| "missing `queue_id`".to_string())
    }
}

/// One persisted message from `sessionMessages`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub interaction_id: Option<String>,
    pub sender_id: UserId,
    #[serde(default, alias = "message")]
    pub message_text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A session rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Result<Self, AdmitError> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Rating(stars))
        } else {
            Err(AdmitError::RatingValidation(format!(
                "rating must be between {} and {}, got {stars}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

/// Arguments of `endSession`, sent as query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EndSessionRequest {
    pub session_id: SessionId,
    pub ended_by: UserId,
    pub rating: Option<Rating>,
}
