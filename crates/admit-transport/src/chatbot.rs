// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming client for the AI admissions chatbot.
//!
//! Each question opens a fresh socket to `{channel}/chat/ws/chat`, sends a
//! `{user_id, session_id}` handshake followed by the question, and collects
//! `chunk` frames until `done`. The bot's `session_created` id is kept so
//! follow-up questions continue the same conversation.

use std::time::Duration;

use admit_core::{AdmitError, UserId};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use url::Url;

use crate::endpoints::Endpoints;

/// `user_id` sent for visitors who are not signed in.
pub const GUEST_USER: &str = "guest";

/// Reply text used when the bot finishes without sending any content.
pub const EMPTY_REPLY: &str = "(no response from the chatbot)";

/// One decoded frame of the chatbot stream.
#[derive(Debug, Clone, PartialEq)]
pub enum BotFrame {
    SessionCreated(String),
    Chunk(String),
    Done,
    Error(String),
    Other,
}

/// Decodes a chatbot text frame. The event name is `event` or `type`; chunk
/// text is the first of `content`, `text`, `message`.
pub fn parse_bot_frame(text: &str) -> Result<BotFrame, AdmitError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| AdmitError::malformed(format!("chatbot frame is not JSON: {e}")))?;
    let name = value
        .get("event")
        .or_else(|| value.get("type"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let frame = match name {
        "session_created" => match value.get("session_id") {
            Some(Value::String(id)) if !id.is_empty() => BotFrame::SessionCreated(id.clone()),
            Some(Value::Number(id)) => BotFrame::SessionCreated(id.to_string()),
            _ => BotFrame::Other,
        },
        "chunk" => BotFrame::Chunk(
            ["content", "text", "message"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string(),
        ),
        "done" => BotFrame::Done,
        "error" => BotFrame::Error(
            value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("the chatbot failed to process the question")
                .to_string(),
        ),
        _ => BotFrame::Other,
    };
    Ok(frame)
}

/// Accumulates streamed chunks into the final reply.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    partial: String,
}

impl ReplyAccumulator {
    pub fn push(&mut self, chunk: &str) {
        self.partial.push_str(chunk);
    }

    /// The trimmed reply, or [`EMPTY_REPLY`] when nothing arrived.
    pub fn finish(self) -> String {
        let trimmed = self.partial.trim();
        if trimmed.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Chatbot client. Cheap to share; the conversation id lives behind a mutex.
#[derive(Debug)]
pub struct ChatbotClient {
    url: Url,
    connect_timeout: Duration,
    session_id: Mutex<Option<String>>,
}

impl ChatbotClient {
    pub fn new(endpoints: &Endpoints, connect_timeout: Duration) -> Self {
        Self {
            url: endpoints.chatbot(),
            connect_timeout,
            session_id: Mutex::new(None),
        }
    }

    /// Conversation id assigned by the bot, if any question was answered yet.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    /// Forgets the conversation so the next question starts a new one.
    pub async fn reset(&self) {
        *self.session_id.lock().await = None;
    }

    /// Asks one question and waits for the complete streamed answer.
    pub async fn ask(&self, user_id: Option<UserId>, question: &str) -> Result<String, AdmitError> {
        let user = user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| GUEST_USER.to_string());
        let session = self.session_id().await;

        let (mut socket, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| AdmitError::Chatbot("could not reach the chatbot in time".into()))?
                .map_err(|e| AdmitError::Chatbot(format!("could not connect to the chatbot: {e}")))?;

        let handshake = json!({ "user_id": user, "session_id": session });
        let payload = json!({ "message": question, "user_id": user, "session_id": session });
        for frame in [handshake, payload] {
            socket
                .send(WsMessage::Text(frame.to_string().into()))
                .await
                .map_err(|e| AdmitError::Chatbot(format!("failed to send question: {e}")))?;
        }
        debug!(user_id = %user, "question sent to chatbot");

        let mut reply = ReplyAccumulator::default();
        while let Some(frame) = socket.next().await {
            let text = match frame {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => return Err(AdmitError::Chatbot(format!("chatbot connection error: {e}"))),
            };
            match parse_bot_frame(text.as_str()) {
                Ok(BotFrame::SessionCreated(id)) => {
                    info!(chat_session = %id, "chatbot conversation started");
                    *self.session_id.lock().await = Some(id);
                }
                Ok(BotFrame::Chunk(chunk)) => reply.push(&chunk),
                Ok(BotFrame::Done) => {
                    let _ = socket.close(None).await;
                    return Ok(reply.finish());
                }
                Ok(BotFrame::Error(message)) => {
                    let _ = socket.close(None).await;
                    return Err(AdmitError::Chatbot(message));
                }
                Ok(BotFrame::Other) => {}
                Err(e) => warn!(error = %e, "dropping chatbot frame"),
            }
        }

        Err(AdmitError::Chatbot(
            "connection closed before the reply finished".into(),
        ))
    }
}
