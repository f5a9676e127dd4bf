// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express:
//! URL schemes, positive timeouts, and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::AdmitConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or every collected error
/// (does not fail fast).
pub fn validate_config(config: &AdmitConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    check_url(
        &mut errors,
        "api.api_base_url",
        &config.api.api_base_url,
        &["http", "https"],
    );

    if let Some(channel) = config.api.channel_base_url.as_deref() {
        check_url(&mut errors, "api.channel_base_url", channel, &["ws", "wss"]);
    }

    if config.api.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "api.request_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.support.inactivity_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "support.inactivity_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.support.channel_buffer == 0 {
        errors.push(ConfigError::Validation {
            message: "support.channel_buffer must be greater than 0".to_string(),
        });
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, value: &str, schemes: &[&str]) {
    match url::Url::parse(value.trim()) {
        Ok(parsed) if schemes.contains(&parsed.scheme()) => {}
        Ok(parsed) => errors.push(ConfigError::Validation {
            message: format!(
                "{key} must use one of the schemes {}, got `{}`",
                schemes.join("/"),
                parsed.scheme()
            ),
        }),
        Err(e) => errors.push(ConfigError::Validation {
            message: format!("{key} `{value}` is not a valid URL: {e}"),
        }),
    }
}
