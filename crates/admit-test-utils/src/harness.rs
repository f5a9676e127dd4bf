// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a real [`SupportSession`] to the mocks.

use std::sync::Arc;
use std::time::Duration;

use admit_core::{
    AdmitError, HistoryEntry, IdentitySource, NotificationEvent, QueueId, SessionId,
    StaticIdentity, UserId,
};
use admit_support::{SessionSettings, SupportSession};

use crate::mock_backend::MockSupportBackend;
use crate::mock_channel::{MockMessageChannel, MockNotificationChannel};

/// Builder for creating test sessions with configurable options.
pub struct TestHarnessBuilder {
    identity: StaticIdentity,
    settings: SessionSettings,
    queue_id: QueueId,
    history: Vec<HistoryEntry>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            identity: StaticIdentity::new(UserId(42), None),
            settings: SessionSettings::default(),
            queue_id: QueueId::from(7),
            history: Vec::new(),
        }
    }

    /// Signed-in student id. Defaults to 42.
    pub fn with_customer(mut self, customer_id: UserId) -> Self {
        self.identity.customer_id = Some(customer_id);
        self
    }

    /// Nobody signed in.
    pub fn anonymous(mut self) -> Self {
        self.identity = StaticIdentity::anonymous();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.identity.auth_token = Some(token.to_string());
        self
    }

    pub fn require_auth(mut self, required: bool) -> Self {
        self.settings.require_auth = required;
        self
    }

    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.settings.inactivity_timeout = timeout;
        self
    }

    /// Queue id returned by `join_queue`. Defaults to 7.
    pub fn with_queue_id(mut self, queue_id: i64) -> Self {
        self.queue_id = QueueId::from(queue_id);
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn build(self) -> TestHarness {
        let backend = Arc::new(MockSupportBackend::new(self.queue_id).with_history(self.history));
        let notifications = Arc::new(MockNotificationChannel::new());
        let messages = Arc::new(MockMessageChannel::new());
        let identity: Arc<dyn IdentitySource> = Arc::new(self.identity);
        let session = SupportSession::new(
            backend.clone(),
            notifications.clone(),
            messages.clone(),
            identity,
            self.settings,
        );
        TestHarness {
            session,
            backend,
            notifications,
            messages,
        }
    }
}

/// A session plus handles to every mock it talks to.
pub struct TestHarness {
    pub session: SupportSession,
    pub backend: Arc<MockSupportBackend>,
    pub notifications: Arc<MockNotificationChannel>,
    pub messages: Arc<MockMessageChannel>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Default harness: student 42, queue 7, no history.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Lets spawned work finish and handles every pending input.
    pub async fn settle(&mut self) -> usize {
        self.session.process_pending().await
    }

    /// Pushes a notification and handles it.
    pub async fn notify(&mut self, event: NotificationEvent) {
        self.notifications.emit(event).await;
        self.settle().await;
    }

    /// Joins the queue and gets accepted into `session_id`, with history loaded.
    pub async fn connect(&mut self, session_id: i64) -> Result<(), AdmitError> {
        self.session.join_queue().await?;
        self.notify(NotificationEvent::Accepted {
            session_id: SessionId::from(session_id),
        })
        .await;
        Ok(())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
