// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./admit.toml` > `~/.config/admit/admit.toml` > `/etc/admit/admit.toml`
//! with environment variable overrides via the `ADMIT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AdmitConfig;

/// Legacy variable of the mobile build, mapped onto `api.api_base_url`.
pub const LEGACY_API_BASE_URL_VAR: &str = "EXPO_PUBLIC_API_BASE_URL";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/admit/admit.toml`
/// 3. `~/.config/admit/admit.toml`
/// 4. `./admit.toml`
/// 5. `EXPO_PUBLIC_API_BASE_URL`
/// 6. `ADMIT_*` environment variables
pub fn load_config() -> Result<AdmitConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<AdmitConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdmitConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AdmitConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdmitConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AdmitConfig::default()))
        .merge(Toml::file("/etc/admit/admit.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("admit/admit.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("admit.toml"))
        .merge(legacy_env_provider())
        .merge(env_provider())
}

/// `ADMIT_*` variables, mapped section-by-section.
///
/// Uses an explicit prefix map instead of `Env::split("_")` because key
/// names contain underscores: `ADMIT_API_API_BASE_URL` must become
/// `api.api_base_url`, not `api.api.base.url`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("ADMIT_").map(|key| map_env_key(key.as_str()).into())
}

fn legacy_env_provider() -> Env {
    Env::raw()
        .only(&[LEGACY_API_BASE_URL_VAR])
        .map(|_| "api.api_base_url".into())
}

/// Maps a lowercased, prefix-stripped env key to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ["api", "support", "logging"] {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
