// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup for host applications.

use admit_core::AdmitError;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over
/// `log_level`. Fails if a global subscriber is already set.
pub fn init_tracing(log_level: &str) -> Result<(), AdmitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init()
        .map_err(|e| AdmitError::Internal(format!("tracing already initialised: {e}")))
}

fn default_filter(log_level: &str) -> EnvFilter {
    EnvFilter::new(directive(log_level))
}

/// `admit*` crates at `log_level`, everything else at warn.
fn directive(log_level: &str) -> String {
    let level = log_level.trim().to_ascii_lowercase();
    ["admit", "admit_core", "admit_config", "admit_transport", "admit_support"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_every_crate() {
        let d = directive("DEBUG");
        assert!(d.starts_with("admit=debug,"));
        assert!(d.contains("admit_support=debug"));
        assert!(d.ends_with(",warn"));
    }

    #[test]
    fn second_init_fails_instead_of_panicking() {
        let _ = init_tracing("info");
        assert!(init_tracing("info").is_err());
    }
}
