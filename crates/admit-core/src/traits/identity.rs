// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication collaborator boundary.

use crate::types::UserId;

/// Supplies the signed-in student's identity and bearer token.
///
/// Token storage lives outside this crate; the session reads the current
/// values each time it joins the queue.
pub trait IdentitySource: Send + Sync {
    /// The customer id, or `None` when nobody is signed in.
    fn customer_id(&self) -> Option<UserId>;

    /// Bearer token for the notification subscription, if any.
    fn auth_token(&self) -> Option<String>;
}

/// Fixed identity, for hosts that resolve the user once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    pub customer_id: Option<UserId>,
    pub auth_token: Option<String>,
}

impl StaticIdentity {
    pub fn new(customer_id: UserId, auth_token: Option<String>) -> Self {
        Self {
            customer_id: Some(customer_id),
            auth_token,
        }
    }

    /// No signed-in user.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentitySource for StaticIdentity {
    fn customer_id(&self) -> Option<UserId> {
        self.customer_id
    }

    fn auth_token(&self) -> Option<String> {
        self.auth_token.clone()
    }
}
