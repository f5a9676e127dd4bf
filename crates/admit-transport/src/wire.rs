// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload parsing for both channels.
//!
//! Every function here is pure. Callers drop `Err` results with a warning,
//! so a bad payload never reaches the session.

use admit_core::{AdmitError, ChannelEvent, IncomingMessage, NotificationEvent, QueueId, SessionId};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

/// Event names that carry no session information.
const HEARTBEATS: &[&str] = &["ping", "connected"];

fn is_heartbeat(name: &str) -> bool {
    HEARTBEATS.contains(&name)
}

/// Parses one notification-stream event.
///
/// `sse_event` is the SSE `event:` field (`message` when absent). The JSON
/// body's own `event` (or `type`) name takes precedence, then the one inside
/// `data`. Payload fields are read from the nested `data` object, or from the
/// top level when there is none. Returns `Ok(None)` for heartbeats and unknown
/// event names.
pub fn parse_notification(
    sse_event: &str,
    data: &str,
) -> Result<Option<NotificationEvent>, AdmitError> {
    let sse_event = sse_event.trim();
    if is_heartbeat(sse_event) {
        return Ok(None);
    }

    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(_) if is_heartbeat(data.trim()) => return Ok(None),
        Err(e) => {
            return Err(AdmitError::malformed(format!(
                "notification is not JSON: {e}"
            )));
        }
    };
    let Value::Object(envelope) = value else {
        return Err(AdmitError::malformed("notification is not a JSON object"));
    };

    let payload = match envelope.get("data") {
        Some(Value::Object(inner)) => inner,
        _ => &envelope,
    };

    let name = event_name(&envelope)
        .or_else(|| event_name(payload))
        .or_else(|| (!sse_event.is_empty() && sse_event != "message").then_some(sse_event))
        .ok_or_else(|| AdmitError::malformed("notification has no event name"))?;

    match name {
        name if is_heartbeat(name) => Ok(None),
        "queued" => {
            let queue_id: QueueId = field(payload, &["queue_id", "queueId", "id"])?;
            Ok(Some(NotificationEvent::Queued { queue_id }))
        }
        "accepted" => {
            let session_id: SessionId = field(payload, &["session_id", "sessionId"])?;
            if !is_assigned(&session_id) {
                return Err(AdmitError::malformed(format!(
                    "accepted without a session id (`{session_id}`)"
                )));
            }
            Ok(Some(NotificationEvent::Accepted { session_id }))
        }
        "rejected" => Ok(Some(NotificationEvent::Rejected {
            reason: payload
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })),
        "chat_ended" => Ok(Some(NotificationEvent::ChatEnded)),
        other => {
            debug!(event = other, "ignoring unknown notification");
            Ok(None)
        }
    }
}

/// Parses one message-channel text frame.
///
/// Returns `Ok(None)` for unknown event names.
pub fn parse_channel_event(text: &str) -> Result<Option<ChannelEvent>, AdmitError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| AdmitError::malformed(format!("channel frame is not JSON: {e}")))?;
    let Value::Object(frame) = value else {
        return Err(AdmitError::malformed("channel frame is not a JSON object"));
    };
    let name =
        event_name(&frame).ok_or_else(|| AdmitError::malformed("channel frame has no event"))?;

    match name {
        "message" => {
            let body = match frame.get("data") {
                Some(Value::Object(inner))
                    if !frame.contains_key("senderId") && !frame.contains_key("sender_id") =>
                {
                    inner.clone()
                }
                _ => frame.clone(),
            };
            let message: IncomingMessage = serde_json::from_value(Value::Object(body))
                .map_err(|e| AdmitError::malformed(format!("invalid chat message: {e}")))?;
            Ok(Some(ChannelEvent::Message(message)))
        }
        "chat_connected" => Ok(Some(ChannelEvent::ChatConnected)),
        "chat_ended" => Ok(Some(ChannelEvent::ChatEnded)),
        other => {
            debug!(event = other, "ignoring unknown channel event");
            Ok(None)
        }
    }
}

fn event_name(object: &Map<String, Value>) -> Option<&str> {
    object
        .get("event")
        .or_else(|| object.get("type"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// The backend uses `0` and `""` for "no session yet".
fn is_assigned(session_id: &SessionId) -> bool {
    let raw = session_id.as_str().trim();
    !raw.is_empty() && raw.parse::<i64>().map(|n| n > 0).unwrap_or(true)
}

/// First non-null value among `keys`.
fn field<T: DeserializeOwned>(payload: &Map<String, Value>, keys: &[&str]) -> Result<T, AdmitError> {
    let raw = keys
        .iter()
        .find_map(|key| payload.get(*key).filter(|value| !value.is_null()))
        .ok_or_else(|| AdmitError::malformed(format!("missing `{}`", keys[0])))?;
    serde_json::from_value(raw.clone())
        .map_err(|e| AdmitError::malformed(format!("invalid `{}`: {e}", keys[0])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use admit_core::UserId;

    #[test]
    fn accepted_with_nested_data() {
        let event =
            parse_notification("message", r#"{"event":"accepted","data":{"session_id":99}}"#)
                .unwrap();
        assert_eq!(
            event,
            Some(NotificationEvent::Accepted {
                session_id: SessionId::from(99)
            })
        );
    }

    #[test]
    fn event_name_inside_data() {
        let event =
            parse_notification("message", r#"{"data":{"event":"accepted","session_id":99}}"#)
                .unwrap();
        assert_eq!(
            event,
            Some(NotificationEvent::Accepted {
                session_id: SessionId::from(99)
            })
        );
    }

    #[test]
    fn queued_accepts_id_alias() {
        let event =
            parse_notification("message", r#"{"event":"queued","data":{"id":5}}"#).unwrap();
        assert_eq!(
            event,
            Some(NotificationEvent::Queued {
                queue_id: QueueId::from(5)
            })
        );
        let event = parse_notification(
            "message",
            r#"{"event":"queued","data":{"queue_id":null,"id":5}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(NotificationEvent::Queued {
                queue_id: QueueId::from(5)
            })
        );
    }

    #[test]
    fn accepted_without_real_session_is_dropped() {
        for data in [
            r#"{"event":"accepted","data":{"session_id":0}}"#,
            r#"{"event":"accepted","data":{"session_id":"0"}}"#,
            r#"{"event":"accepted","data":{"session_id":""}}"#,
            r#"{"event":"accepted","data":{"session_id":null}}"#,
        ] {
            let err = parse_notification("message", data).unwrap_err();
            assert!(matches!(err, AdmitError::MalformedPayload { .. }), "{data}");
        }
    }

    #[test]
    fn event_name_from_sse_field() {
        let event = parse_notification("queued", r#"{"queue_id":"7"}"#).unwrap();
        assert_eq!(
            event,
            Some(NotificationEvent::Queued {
                queue_id: QueueId::from(7)
            })
        );
    }

    #[test]
    fn heartbeats_are_filtered() {
        assert_eq!(parse_notification("ping", "").unwrap(), None);
        assert_eq!(parse_notification("message", "ping").unwrap(), None);
        assert_eq!(
            parse_notification("message", r#"{"event":"connected","data":{}}"#).unwrap(),
            None
        );
    }

    #[test]
    fn rejected_reason_is_optional() {
        assert_eq!(
            parse_notification("message", r#"{"event":"rejected","data":{}}"#).unwrap(),
            Some(NotificationEvent::Rejected { reason: None })
        );
        assert_eq!(
            parse_notification("message", r#"{"event":"rejected","data":{"reason":"busy"}}"#)
                .unwrap(),
            Some(NotificationEvent::Rejected {
                reason: Some("busy".into())
            })
        );
    }

    #[test]
    fn malformed_notifications_are_errors() {
        for data in ["{not json", "[1,2]", r#"{"data":{}}"#, r#"{"event":"accepted"}"#] {
            let err = parse_notification("message", data).unwrap_err();
            assert!(matches!(err, AdmitError::MalformedPayload { .. }), "{data}");
        }
    }

    #[test]
    fn unknown_notification_is_ignored() {
        assert_eq!(
            parse_notification("message", r#"{"event":"officer_typing"}"#).unwrap(),
            None
        );
    }

    #[test]
    fn chat_message_frame() {
        let event = parse_channel_event(
            r#"{"event":"message","senderId":7,"message":"How can I help?","interactionId":5}"#,
        )
        .unwrap();
        let Some(ChannelEvent::Message(msg)) = event else {
            panic!("expected message, got {event:?}");
        };
        assert_eq!(msg.sender_id, UserId(7));
        assert_eq!(msg.message, "How can I help?");
        assert_eq!(msg.interaction_id.as_deref(), Some("5"));
    }

    #[test]
    fn snake_case_message_frame() {
        let event = parse_channel_event(
            r#"{"event":"message","sender_id":"7","message_text":"Hello","interaction_id":6}"#,
        )
        .unwrap();
        let Some(ChannelEvent::Message(msg)) = event else {
            panic!("expected message, got {event:?}");
        };
        assert_eq!(msg.sender_id, UserId(7));
        assert_eq!(msg.message, "Hello");
        assert_eq!(msg.interaction_id.as_deref(), Some("6"));
    }

    #[test]
    fn control_frames() {
        assert_eq!(
            parse_channel_event(r#"{"event":"chat_connected"}"#).unwrap(),
            Some(ChannelEvent::ChatConnected)
        );
        assert_eq!(
            parse_channel_event(r#"{"type":"chat_ended"}"#).unwrap(),
            Some(ChannelEvent::ChatEnded)
        );
    }

    #[test]
    fn message_without_sender_is_malformed() {
        let err = parse_channel_event(r#"{"event":"message","message":"hi"}"#).unwrap_err();
        assert!(matches!(err, AdmitError::MalformedPayload { .. }));
    }
}
