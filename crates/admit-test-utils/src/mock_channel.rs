// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification and message channels for deterministic testing.
//!
//! Both mocks keep the transport end of every handle they hand out, so tests
//! can inject server events and observe whether the client closed its side.

use async_trait::async_trait;
use tokio::sync::Mutex;

use admit_core::{
    AdmitError, ChannelEvent, Connection, ConnectionEnd, EventSink, MessageChannel,
    NotificationChannel, NotificationEvent, OutgoingMessage, SessionId, Subscription, UserId,
};

const BUFFER: usize = 64;

#[derive(Default)]
struct NotificationState {
    sink: Option<EventSink<NotificationEvent>>,
    sinks: Vec<EventSink<NotificationEvent>>,
    subscriptions: Vec<(UserId, Option<String>)>,
    fail_next: bool,
}

/// A fake server-push channel.
#[derive(Default)]
pub struct MockNotificationChannel {
    state: Mutex<NotificationState>,
}

impl MockNotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to the current subscription. Returns `false` when
    /// there is none or the client closed it.
    pub async fn emit(&self, event: NotificationEvent) -> bool {
        let sink = self.state.lock().await.sink.clone();
        match sink {
            Some(sink) => sink.send(event).await,
            None => false,
        }
    }

    /// Ends the current stream from the server side.
    pub async fn end_stream(&self) {
        let mut state = self.state.lock().await;
        state.sink = None;
        state.sinks.pop();
    }

    /// Makes the next `subscribe` fail with a channel error.
    pub async fn fail_next_subscribe(&self) {
        self.state.lock().await.fail_next = true;
    }

    /// Every `(customer_id, token)` pair subscribed with, in order.
    pub async fn subscriptions(&self) -> Vec<(UserId, Option<String>)> {
        self.state.lock().await.subscriptions.clone()
    }

    pub async fn subscribe_count(&self) -> usize {
        self.state.lock().await.subscriptions.len()
    }

    /// Number of subscriptions the client still holds open.
    pub async fn open_subscriptions(&self) -> usize {
        let state = self.state.lock().await;
        state.sinks.iter().filter(|s| !s.is_closed()).count()
    }
}

#[async_trait]
impl NotificationChannel for MockNotificationChannel {
    async fn subscribe(
        &self,
        customer_id: UserId,
        auth_token: Option<&str>,
    ) -> Result<Subscription<NotificationEvent>, AdmitError> {
        let mut state = self.state.lock().await;
        if std::mem::take(&mut state.fail_next) {
            return Err(AdmitError::channel("mock subscribe failure"));
        }
        state
            .subscriptions
            .push((customer_id, auth_token.map(str::to_string)));
        let (subscription, sink) = Subscription::pair(BUFFER);
        state.sink = Some(sink.clone());
        state.sinks.push(sink);
        Ok(subscription)
    }
}

#[derive(Default)]
struct MessageState {
    ends: Vec<ConnectionEnd>,
    connects: Vec<SessionId>,
    sent: Vec<OutgoingMessage>,
    fail_next: bool,
}

impl MessageState {
    fn drain_outbound(&mut self) {
        for end in &mut self.ends {
            while let Ok(message) = end.outbound.try_recv() {
                self.sent.push(message);
            }
        }
    }
}

/// A fake duplex message channel. Connections are ready immediately.
#[derive(Default)]
pub struct MockMessageChannel {
    state: Mutex<MessageState>,
}

impl MockMessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` on the most recent connection.
    pub async fn emit(&self, event: ChannelEvent) -> bool {
        let sink = {
            let state = self.state.lock().await;
            state.ends.last().map(|end| end.events.clone())
        };
        match sink {
            Some(sink) => sink.send(event).await,
            None => false,
        }
    }

    /// Payloads the client transmitted on any connection, in order.
    pub async fn sent_messages(&self) -> Vec<OutgoingMessage> {
        let mut state = self.state.lock().await;
        state.drain_outbound();
        state.sent.clone()
    }

    /// Drops the most recent connection from the server side.
    pub async fn drop_connection(&self) {
        let mut state = self.state.lock().await;
        state.drain_outbound();
        if let Some(end) = state.ends.pop() {
            end.mark_closed();
        }
    }

    pub async fn fail_next_connect(&self) {
        self.state.lock().await.fail_next = true;
    }

    /// Session ids of every successful connect, in order.
    pub async fn connects(&self) -> Vec<SessionId> {
        self.state.lock().await.connects.clone()
    }

    /// Number of connections the client has not closed yet.
    pub async fn open_connections(&self) -> usize {
        let state = self.state.lock().await;
        state.ends.iter().filter(|e| !e.events.is_closed()).count()
    }
}

#[async_trait]
impl MessageChannel for MockMessageChannel {
    async fn connect(&self, session_id: &SessionId) -> Result<Connection, AdmitError> {
        let mut state = self.state.lock().await;
        if std::mem::take(&mut state.fail_next) {
            return Err(AdmitError::channel("mock connect failure"));
        }
        let (connection, end) = Connection::pair(BUFFER);
        end.mark_open();
        state.connects.push(session_id.clone());
        state.ends.push(end);
        Ok(connection)
    }
}
