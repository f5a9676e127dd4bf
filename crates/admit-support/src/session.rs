// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async driver around the session reducer.
//!
//! [`SupportSession`] owns the channel handles, the inactivity timer and the
//! reducer. Every input, whether a student command, a channel event, a timer
//! fire or a resolved history fetch, is handled one at a time on the task
//! that owns the session, so transitions never interleave. After each input
//! the reducer's effects are executed in order and a fresh
//! [`SessionSnapshot`] is published.

use std::sync::Arc;
use std::time::Duration;

use admit_config::model::SupportConfig;
use admit_core::{
    AdmitError, ChannelEvent, Connection, EndSessionRequest, ErrorCategory, HistoryEntry,
    IdentitySource, Message, MessageChannel, NotificationChannel, NotificationEvent,
    OutgoingMessage, QueueId, SessionId, Subscription, SupportBackend, UserId,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::machine::{Effect, Input, SessionMachine, SessionState};
use crate::rating;
use crate::timer::{InactivityTimer, TimerId};

/// Yields granted to spawned work before [`SupportSession::process_pending`]
/// considers the session idle.
const IDLE_YIELDS: usize = 8;

const COMMAND_BUFFER: usize = 32;

/// Session behavior knobs.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Refuse to join without a bearer token.
    pub require_auth: bool,
    pub inactivity_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&SupportConfig::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &SupportConfig) -> Self {
        Self {
            require_auth: config.require_auth,
            inactivity_timeout: config.inactivity_timeout(),
        }
    }
}

/// Everything the presentation layer needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub messages: Vec<Message>,
    pub draft: String,
    /// Whether the message channel is ready for sends.
    pub channel_open: bool,
    pub history_pending: bool,
    /// Latest user-facing error or connection notice.
    pub notice: Option<String>,
    pub local_user: Option<UserId>,
}

/// Results of background work, routed back into the session task.
#[derive(Debug)]
enum Inbox {
    History {
        generation: u64,
        entries: Option<Vec<HistoryEntry>>,
    },
    TimerFired {
        id: TimerId,
    },
}

/// What woke the session up.
#[derive(Debug)]
enum Wake {
    Inbox(Inbox),
    Notification(Option<NotificationEvent>),
    Channel(Option<ChannelEvent>),
}

/// A live-support session bound to its collaborators.
pub struct SupportSession {
    machine: SessionMachine,
    backend: Arc<dyn SupportBackend>,
    notification_channel: Arc<dyn NotificationChannel>,
    message_channel: Arc<dyn MessageChannel>,
    identity: Arc<dyn IdentitySource>,
    settings: SessionSettings,
    notifications: Option<Subscription<NotificationEvent>>,
    connection: Option<Connection>,
    timer: InactivityTimer,
    inbox_tx: mpsc::Sender<Inbox>,
    inbox_rx: mpsc::Receiver<Inbox>,
    snapshots: watch::Sender<SessionSnapshot>,
    notice: Option<String>,
}

impl SupportSession {
    pub fn new(
        backend: Arc<dyn SupportBackend>,
        notification_channel: Arc<dyn NotificationChannel>,
        message_channel: Arc<dyn MessageChannel>,
        identity: Arc<dyn IdentitySource>,
        settings: SessionSettings,
    ) -> Self {
        let machine = SessionMachine::new(identity.customer_id());
        let (inbox_tx, inbox_rx) = mpsc::channel(COMMAND_BUFFER);
        let timer = InactivityTimer::new(settings.inactivity_timeout);
        let (snapshots, _) = watch::channel(SessionSnapshot {
            state: machine.state().clone(),
            messages: Vec::new(),
            draft: String::new(),
            channel_open: false,
            history_pending: false,
            notice: None,
            local_user: machine.local_user(),
        });
        Self {
            machine,
            backend,
            notification_channel,
            message_channel,
            identity,
            settings,
            notifications: None,
            connection: None,
            timer,
            inbox_tx,
            inbox_rx,
            snapshots,
            notice: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    pub fn messages(&self) -> &[Message] {
        self.machine.messages()
    }

    pub fn is_channel_open(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_open)
    }

    pub fn is_subscribed(&self) -> bool {
        self.notifications.as_ref().is_some_and(Subscription::is_open)
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.machine.state().clone(),
            messages: self.machine.messages().to_vec(),
            draft: self.machine.draft().to_string(),
            channel_open: self.is_channel_open(),
            history_pending: self.machine.history_pending(),
            notice: self.notice.clone(),
            local_user: self.machine.local_user(),
        }
    }

    /// Receiver of the snapshot published after every handled input.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    // --- Commands ---

    /// Enters the support queue from any joinable state.
    pub async fn join_queue(&mut self) -> Result<QueueId, AdmitError> {
        let result = self.try_join_queue().await;
        self.settle_command(result)
    }

    async fn try_join_queue(&mut self) -> Result<QueueId, AdmitError> {
        if !self.machine.state().can_join() {
            return Err(AdmitError::invalid_state("join_queue", self.machine.state()));
        }
        let customer_id = self.identity.customer_id().ok_or_else(|| {
            AdmitError::queue_join("no signed-in student", ErrorCategory::Validation)
        })?;
        if self.settings.require_auth && self.auth_token().is_none() {
            return Err(AdmitError::queue_join(
                "sign-in required for live support",
                ErrorCategory::Auth,
            ));
        }

        let ticket = self.backend.join_queue(customer_id).await?;
        info!(customer_id = %customer_id, queue_id = %ticket.queue_id, "joined support queue");
        self.machine.set_local_user(Some(customer_id));
        self.dispatch(Input::Joined {
            queue_id: ticket.queue_id.clone(),
        })
        .await;
        Ok(ticket.queue_id)
    }

    /// Leaves the queue. The local reset happens even when the server call fails.
    pub async fn cancel_queue(&mut self) -> Result<(), AdmitError> {
        let Some(queue_id) = self.machine.state().queue_id().cloned() else {
            let err = AdmitError::invalid_state("cancel_queue", self.machine.state());
            return self.settle_command(Err(err));
        };
        self.dispatch(Input::Reset).await;

        let Some(customer_id) = self.machine.local_user() else {
            return Ok(());
        };
        match self.backend.cancel_queue(customer_id).await {
            Ok(()) => {
                info!(queue_id = %queue_id, "left support queue");
                self.settle_command(Ok(()))
            }
            Err(e) => {
                warn!(queue_id = %queue_id, error = %e, "queue cancel failed");
                Err(e)
            }
        }
    }

    /// Sends a chat line. Blank input is ignored.
    pub async fn send_message(&mut self, text: &str) -> Result<(), AdmitError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let result = self.try_send(text).await;
        self.settle_command(result)
    }

    async fn try_send(&mut self, text: &str) -> Result<(), AdmitError> {
        let (Some(session_id), Some(sender_id)) = (
            self.machine.state().session_id().cloned(),
            self.machine.local_user(),
        ) else {
            return Err(AdmitError::invalid_state("send_message", self.machine.state()));
        };
        let connection = self
            .connection
            .as_ref()
            .filter(|c| c.is_open())
            .ok_or(AdmitError::ChannelNotOpen)?;

        connection.send(OutgoingMessage {
            sender_id,
            message: text.to_string(),
        })?;
        debug!(session_id = %session_id, "message sent");
        self.dispatch(Input::Sent(Message::local(sender_id, text)))
            .await;
        Ok(())
    }

    pub async fn set_draft(&mut self, text: impl Into<String>) {
        self.machine.set_draft(text);
        self.publish();
    }

    /// Ends the chat on the student's request.
    ///
    /// The session moves to `Ended` only after the server acknowledges. On
    /// failure it stays `Connected` with both channels open, so the student
    /// can keep chatting or retry.
    pub async fn end_chat(&mut self) -> Result<(), AdmitError> {
        let (Some(session_id), Some(ended_by)) = (
            self.machine.state().session_id().cloned(),
            self.machine.local_user(),
        ) else {
            let err = AdmitError::invalid_state("end_chat", self.machine.state());
            return self.settle_command(Err(err));
        };

        let request = EndSessionRequest {
            session_id: session_id.clone(),
            ended_by,
            rating: None,
        };
        let result = self.backend.end_session(&request).await;
        match &result {
            Ok(()) => self.dispatch(Input::EndRequested).await,
            Err(e) => warn!(session_id = %session_id, error = %e, "end session call failed"),
        }
        self.settle_command(result)
    }

    /// Submits the post-session rating. Validation runs before any network call.
    pub async fn submit_rating(&mut self, stars: Option<u8>) -> Result<(), AdmitError> {
        let result = self.try_submit_rating(stars).await;
        self.settle_command(result)
    }

    async fn try_submit_rating(&mut self, stars: Option<u8>) -> Result<(), AdmitError> {
        let rating = rating::validate_selection(stars)?;
        let (Some(session_id), Some(ended_by)) = (
            self.machine.state().awaiting_rating().cloned(),
            self.machine.local_user(),
        ) else {
            return Err(AdmitError::invalid_state("submit_rating", self.machine.state()));
        };

        let request = rating::rating_request(session_id.clone(), ended_by, rating);
        self.backend.end_session(&request).await?;
        info!(session_id = %session_id, stars = rating.stars(), "rating submitted");
        self.dispatch(Input::RatingSubmitted).await;
        Ok(())
    }

    pub async fn dismiss_rating(&mut self) {
        self.dispatch(Input::RatingDismissed).await;
    }

    /// Restores a dropped message channel, or re-joins after a timeout.
    pub async fn reconnect(&mut self) -> Result<(), AdmitError> {
        let result = match self.machine.state() {
            SessionState::Connected { .. } => self.reopen_channels().await,
            SessionState::TimedOut => {
                self.dispatch(Input::Reset).await;
                self.try_join_queue().await.map(|_| ())
            }
            state => Err(AdmitError::invalid_state("reconnect", state)),
        };
        self.settle_command(result)
    }

    async fn reopen_channels(&mut self) -> Result<(), AdmitError> {
        if self.is_channel_open() {
            self.execute(Effect::EnsureNotifications).await;
            self.publish();
            return Ok(());
        }
        self.dispatch(Input::Reconnect).await;
        if self.is_channel_open() {
            Ok(())
        } else {
            Err(AdmitError::channel("message channel could not be reopened"))
        }
    }

    /// Tears everything down and returns to `Idle`. Safe to call repeatedly.
    pub async fn reset(&mut self) {
        self.notice = None;
        self.dispatch(Input::Reset).await;
    }

    // --- Event processing ---

    /// Waits for the next channel event, timer fire or history result and
    /// handles it.
    pub async fn process_next(&mut self) {
        let wake = self.wait().await;
        self.handle(wake).await;
    }

    /// Handles every input that is already available, letting spawned work
    /// run first. Returns the number of inputs handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let wake = tokio::select! {
                biased;
                wake = self.wait() => wake,
                () = idle() => return handled,
            };
            self.handle(wake).await;
            handled += 1;
        }
    }

    /// Cancel-safe: every branch is an mpsc receive.
    async fn wait(&mut self) -> Wake {
        tokio::select! {
            biased;
            Some(item) = self.inbox_rx.recv() => Wake::Inbox(item),
            event = next_channel_event(&mut self.connection) => Wake::Channel(event),
            event = next_notification(&mut self.notifications) => Wake::Notification(event),
        }
    }

    async fn handle(&mut self, wake: Wake) {
        match wake {
            Wake::Inbox(Inbox::History {
                generation,
                entries,
            }) => {
                self.dispatch(Input::HistoryLoaded {
                    generation,
                    entries,
                })
                .await;
            }
            Wake::Inbox(Inbox::TimerFired { id }) => {
                if self.timer.take_fired(id) {
                    info!(timer = id, "inactivity timeout elapsed");
                    self.dispatch(Input::InactivityElapsed).await;
                } else {
                    debug!(timer = id, "ignoring stale timer fire");
                }
            }
            Wake::Notification(Some(event)) => {
                self.dispatch(Input::Notification(event)).await;
            }
            Wake::Notification(None) => {
                warn!(state = %self.machine.state(), "notification stream ended");
                self.notifications = None;
                self.publish();
            }
            Wake::Channel(Some(event)) => {
                self.dispatch(Input::Channel(event)).await;
            }
            Wake::Channel(None) => {
                warn!(state = %self.machine.state(), "message channel dropped");
                self.connection = None;
                if self.machine.state().session_id().is_some() {
                    self.notice = Some(AdmitError::channel("dropped").user_message());
                }
                self.publish();
            }
        }
    }

    /// Applies an input and runs the resulting effects, then publishes.
    async fn dispatch(&mut self, input: Input) {
        let effects = self.machine.apply(input);
        for effect in effects {
            self.execute(effect).await;
        }
        self.publish();
    }

    async fn execute(&mut self, effect: Effect) {
        debug!(effect = ?effect, generation = self.machine.generation(), "executing effect");
        match effect {
            Effect::EnsureNotifications => self.ensure_notifications().await,
            Effect::CloseNotifications => {
                if let Some(mut subscription) = self.notifications.take() {
                    subscription.close();
                }
            }
            Effect::OpenMessageChannel { session_id } => self.open_message_channel(session_id).await,
            Effect::CloseMessageChannel => {
                if let Some(mut connection) = self.connection.take() {
                    connection.close();
                }
            }
            Effect::FetchHistory {
                session_id,
                generation,
            } => self.spawn_history_fetch(session_id, generation),
            Effect::ArmInactivityTimer => {
                let inbox = self.inbox_tx.clone();
                self.timer.arm(move |id| async move {
                    let _ = inbox.send(Inbox::TimerFired { id }).await;
                });
            }
            Effect::DisarmInactivityTimer => {
                self.timer.disarm();
            }
            Effect::CancelQueue => {
                if let Some(customer_id) = self.machine.local_user() {
                    if let Err(e) = self.backend.cancel_queue(customer_id).await {
                        warn!(customer_id = %customer_id, error = %e, "best-effort queue cancel failed");
                    }
                }
            }
            Effect::PromptRating { session_id } => {
                info!(session_id = %session_id, "chat ended, awaiting rating");
            }
        }
    }

    async fn ensure_notifications(&mut self) {
        if self.is_subscribed() {
            return;
        }
        let Some(customer_id) = self.machine.local_user() else {
            warn!("cannot subscribe to notifications without a customer id");
            return;
        };
        let token = self.auth_token();
        match self
            .notification_channel
            .subscribe(customer_id, token.as_deref())
            .await
        {
            Ok(subscription) => {
                if let Some(mut previous) = self.notifications.replace(subscription) {
                    previous.close();
                }
            }
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "notification subscribe failed");
                self.notice = Some(e.user_message());
            }
        }
    }

    async fn open_message_channel(&mut self, session_id: SessionId) {
        if let Some(mut previous) = self.connection.take() {
            previous.close();
        }
        match self.message_channel.connect(&session_id).await {
            Ok(connection) => {
                info!(session_id = %session_id, "message channel open");
                self.connection = Some(connection);
                self.notice = None;
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "message channel connect failed");
                self.notice = Some(e.user_message());
            }
        }
    }

    fn spawn_history_fetch(&self, session_id: SessionId, generation: u64) {
        let backend = Arc::clone(&self.backend);
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let entries = match backend.session_messages(&session_id).await {
                Ok(entries) => Some(entries),
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "history unavailable");
                    None
                }
            };
            let _ = inbox.send(Inbox::History { generation, entries }).await;
        });
    }

    fn auth_token(&self) -> Option<String> {
        self.identity.auth_token().filter(|t| !t.trim().is_empty())
    }

    /// Records the outcome of a student command in the notice slot.
    fn settle_command<T>(&mut self, result: Result<T, AdmitError>) -> Result<T, AdmitError> {
        match &result {
            Ok(_) => self.notice = None,
            Err(e) => {
                debug!(error = %e, "command failed");
                self.notice = Some(e.user_message());
            }
        }
        self.publish();
        result
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    // --- Actor mode ---

    /// Runs the session on its own task and returns a cloneable handle.
    pub fn spawn(self, cancel: CancellationToken) -> (SessionHandle, tokio::task::JoinHandle<()>) {
        let (requests_tx, requests_rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = SessionHandle {
            requests: requests_tx,
            snapshots: self.subscribe(),
        };
        let task = tokio::spawn(self.run(requests_rx, cancel));
        (handle, task)
    }

    /// Serializes commands and events until cancelled or every handle is
    /// dropped, then tears the session down.
    pub async fn run(mut self, mut requests: mpsc::Receiver<Request>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("session shutting down");
                    break;
                }
                request = requests.recv() => match request {
                    Some(request) => self.serve(request).await,
                    None => break,
                },
                wake = self.wait() => self.handle(wake).await,
            }
        }
        self.reset().await;
    }

    async fn serve(&mut self, request: Request) {
        let result = match request.command {
            Command::JoinQueue => self.join_queue().await.map(|_| ()),
            Command::CancelQueue => self.cancel_queue().await,
            Command::SendMessage(text) => self.send_message(&text).await,
            Command::SetDraft(text) => {
                self.set_draft(text).await;
                Ok(())
            }
            Command::EndChat => self.end_chat().await,
            Command::SubmitRating(stars) => self.submit_rating(stars).await,
            Command::DismissRating => {
                self.dismiss_rating().await;
                Ok(())
            }
            Command::Reconnect => self.reconnect().await,
            Command::Reset => {
                self.reset().await;
                Ok(())
            }
        };
        let _ = request.reply.send(result);
    }
}

impl Drop for SupportSession {
    fn drop(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        if let Some(mut subscription) = self.notifications.take() {
            subscription.close();
        }
    }
}

async fn next_channel_event(connection: &mut Option<Connection>) -> Option<ChannelEvent> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_notification(
    subscription: &mut Option<Subscription<NotificationEvent>>,
) -> Option<NotificationEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn idle() {
    for _ in 0..IDLE_YIELDS {
        tokio::task::yield_now().await;
    }
}

/// Student commands accepted by a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    JoinQueue,
    CancelQueue,
    SendMessage(String),
    SetDraft(String),
    EndChat,
    SubmitRating(Option<u8>),
    DismissRating,
    Reconnect,
    Reset,
}

#[derive(Debug)]
pub struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<Result<(), AdmitError>>,
}

/// Cloneable front end of a session running under [`SupportSession::spawn`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<(), AdmitError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .await
            .map_err(|_| AdmitError::Internal("session is not running".to_string()))?;
        response
            .await
            .map_err(|_| AdmitError::Internal("session stopped before replying".to_string()))?
    }

    pub async fn join_queue(&self) -> Result<(), AdmitError> {
        self.send(Command::JoinQueue).await
    }

    pub async fn cancel_queue(&self) -> Result<(), AdmitError> {
        self.send(Command::CancelQueue).await
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), AdmitError> {
        self.send(Command::SendMessage(text.into())).await
    }

    pub async fn end_chat(&self) -> Result<(), AdmitError> {
        self.send(Command::EndChat).await
    }

    pub async fn submit_rating(&self, stars: Option<u8>) -> Result<(), AdmitError> {
        self.send(Command::SubmitRating(stars)).await
    }

    pub async fn reset(&self) -> Result<(), AdmitError> {
        self.send(Command::Reset).await
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn changes(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}
