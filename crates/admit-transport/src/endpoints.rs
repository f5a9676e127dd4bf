// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL layout of the live-support backend.

use admit_config::model::ApiConfig;
use admit_core::{AdmitError, Rating, SessionId, UserId};
use url::Url;

/// Resolved base URLs plus the per-operation paths below them.
#[derive(Debug, Clone)]
pub struct Endpoints {
    api: Url,
    channel: Url,
}

impl Endpoints {
    /// Parses both base URLs. `channel_base_url` must use a ws(s) scheme.
    pub fn new(api_base_url: &str, channel_base_url: &str) -> Result<Self, AdmitError> {
        let api = parse_base(api_base_url, &["http", "https"])?;
        let channel = parse_base(channel_base_url, &["ws", "wss"])?;
        Ok(Self { api, channel })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, AdmitError> {
        Self::new(&config.api_base_url, &config.resolved_channel_base_url())
    }

    /// `POST`, customer passed as a query parameter.
    pub fn join_queue(&self, customer_id: UserId) -> Url {
        let mut url = extend(&self.api, &["live_chat", "livechat", "live-chat", "join_queue"]);
        url.query_pairs_mut()
            .append_pair("customer_id", &customer_id.to_string());
        url
    }

    pub fn cancel_queue(&self, customer_id: UserId) -> Url {
        let mut url = extend(&self.api, &["live_chat", "livechat", "customer", "cancel_queue"]);
        url.query_pairs_mut()
            .append_pair("customer_id", &customer_id.to_string());
        url
    }

    /// `POST`. `rating` is appended only when the student picked one.
    pub fn end_session(
        &self,
        session_id: &SessionId,
        ended_by: UserId,
        rating: Option<Rating>,
    ) -> Url {
        let mut url = extend(&self.api, &["live_chat", "livechat", "live-chat", "end"]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("session_id", session_id.as_str())
                .append_pair("ended_by", &ended_by.to_string());
            if let Some(rating) = rating {
                query.append_pair("rating", &rating.stars().to_string());
            }
        }
        url
    }

    pub fn session_messages(&self, session_id: &SessionId) -> Url {
        extend(
            &self.api,
            &["live_chat", "livechat", "session", session_id.as_str(), "messages"],
        )
    }

    /// Notification stream scoped to one customer.
    pub fn notifications(&self, customer_id: UserId) -> Url {
        let id = customer_id.to_string();
        extend(&self.api, &["live_chat", "livechat", "sse", "customer", &id])
    }

    /// Message channel scoped to one accepted session.
    pub fn message_channel(&self, session_id: &SessionId) -> Url {
        extend(
            &self.channel,
            &["live_chat", "livechat", "chat", session_id.as_str()],
        )
    }

    /// Streaming endpoint of the AI chatbot.
    pub fn chatbot(&self) -> Url {
        extend(&self.channel, &["chat", "ws", "chat"])
    }
}

fn parse_base(raw: &str, schemes: &[&str]) -> Result<Url, AdmitError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AdmitError::Config(format!("invalid base URL `{raw}`: {e}")))?;
    if !schemes.contains(&url.scheme()) || url.cannot_be_a_base() {
        return Err(AdmitError::Config(format!(
            "base URL `{raw}` must use one of {}",
            schemes.join("/")
        )));
    }
    Ok(url)
}

/// Appends percent-encoded path segments, tolerating a trailing slash on the base.
fn extend(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
