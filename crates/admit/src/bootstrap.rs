// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds sessions and the chatbot client from configuration.

use std::sync::Arc;

use admit_config::AdmitConfig;
use admit_core::{AdmitError, IdentitySource};
use admit_support::{SessionSettings, SupportSession};
use admit_transport::{
    ChatbotClient, Endpoints, SseNotificationChannel, SupportHttpClient, WsMessageChannel,
};
use tracing::info;

/// A live-support session over the production transports.
pub fn build_session(
    config: &AdmitConfig,
    identity: Arc<dyn IdentitySource>,
) -> Result<SupportSession, AdmitError> {
    let endpoints = Endpoints::from_config(&config.api)?;
    let timeout = config.api.request_timeout();
    let buffer = config.support.channel_buffer;

    let backend = SupportHttpClient::new(endpoints.clone(), timeout)?;
    let notifications = SseNotificationChannel::new(endpoints.clone(), timeout, buffer)?;
    let messages = WsMessageChannel::new(endpoints, timeout, buffer);

    info!(
        api = %config.api.api_base_url,
        channel = %config.api.resolved_channel_base_url(),
        require_auth = config.support.require_auth,
        "live-support session configured"
    );
    Ok(SupportSession::new(
        Arc::new(backend),
        Arc::new(notifications),
        Arc::new(messages),
        identity,
        SessionSettings::from_config(&config.support),
    ))
}

/// The AI chatbot client for the same deployment.
pub fn build_chatbot(config: &AdmitConfig) -> Result<ChatbotClient, AdmitError> {
    let endpoints = Endpoints::from_config(&config.api)?;
    Ok(ChatbotClient::new(&endpoints, config.api.request_timeout()))
}
