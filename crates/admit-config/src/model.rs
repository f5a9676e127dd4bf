// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Admit client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Admit configuration.
///
/// All sections are optional and default to values that work against a
/// backend on `localhost:8000`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdmitConfig {
    /// Backend endpoints.
    #[serde(default)]
    pub api: ApiConfig,

    /// Live-support session behavior.
    #[serde(default)]
    pub support: SupportConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Base URLs for the HTTP API and the WebSocket channels.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the HTTP API, also serving the notification stream.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL of the WebSocket channels. Derived from `api_base_url`
    /// when unset.
    #[serde(default)]
    pub channel_base_url: Option<String>,

    /// Timeout applied to each request/response call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            channel_base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// The WebSocket base URL: explicit `channel_base_url`, or
    /// `api_base_url` with `http` swapped for `ws` and `https` for `wss`.
    pub fn resolved_channel_base_url(&self) -> String {
        if let Some(url) = self.channel_base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url.trim_end_matches('/').to_string();
        }
        derive_ws_url(&self.api_base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Swaps an http(s) scheme for the matching ws(s) scheme.
pub fn derive_ws_url(http_url: &str) -> String {
    let trimmed = http_url.trim().trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        trimmed.to_string()
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Live-support session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SupportConfig {
    /// Refuse to join the queue without a bearer token.
    #[serde(default)]
    pub require_auth: bool,

    /// How long to wait in the queue for an officer before timing out.
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,

    /// Event buffer size of each channel handle.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl SupportConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

fn default_inactivity_timeout_secs() -> u64 {
    180
}

fn default_channel_buffer() -> usize {
    64
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
