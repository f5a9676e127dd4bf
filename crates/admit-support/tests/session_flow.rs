// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end session behavior against the in-memory channels and backend.

use std::time::Duration;

use admit_core::{
    AdmitError, ChannelEvent, EndSessionRequest, ErrorCategory, HistoryEntry, IncomingMessage,
    NotificationEvent, OutgoingMessage, QueueId, Rating, SenderType, SessionId, UserId,
};
use admit_support::{ChatView, SessionState};
use admit_test_utils::{BackendCall, TestHarness};
use tokio_util::sync::CancellationToken;

const ME: UserId = UserId(42);
const OFFICER: UserId = UserId(7);
const TIMEOUT: Duration = Duration::from_secs(180);

fn entry(id: i64, sender: UserId, text: &str) -> HistoryEntry {
    HistoryEntry {
        interaction_id: Some(id.to_string()),
        sender_id: sender,
        message_text: text.to_string(),
        timestamp: Some("2026-03-01T09:00:00Z".to_string()),
    }
}

fn peer(sender: UserId, text: &str) -> ChannelEvent {
    ChannelEvent::Message(IncomingMessage {
        sender_id: sender,
        message: text.to_string(),
        interaction_id: None,
        timestamp: None,
    })
}

fn texts(h: &TestHarness) -> Vec<String> {
    h.session.messages().iter().map(|m| m.text.clone()).collect()
}

fn connected(id: i64) -> SessionState {
    SessionState::Connected {
        session_id: SessionId::from(id),
    }
}

async fn two_message_session() -> TestHarness {
    let mut h = TestHarness::builder()
        .with_history(vec![entry(1, OFFICER, "Welcome"), entry(2, ME, "Hi there")])
        .build();
    h.connect(99).await.unwrap();
    h
}

// --- Queue ---

#[tokio::test(start_paused = true)]
async fn queue_times_out_and_cancels() {
    let mut h = TestHarness::new();
    let queue_id = h.session.join_queue().await.unwrap();
    h.settle().await;
    assert_eq!(queue_id, QueueId::from(7));
    assert_eq!(
        h.session.state(),
        &SessionState::InQueue {
            queue_id: QueueId::from(7)
        }
    );
    assert_eq!(h.notifications.subscribe_count().await, 1);
    assert!(h.session.is_timer_armed());

    tokio::time::advance(TIMEOUT - Duration::from_secs(1)).await;
    h.settle().await;
    assert!(matches!(h.session.state(), SessionState::InQueue { .. }));

    tokio::time::advance(Duration::from_secs(1)).await;
    h.settle().await;
    assert_eq!(h.session.state(), &SessionState::TimedOut);
    assert!(h.backend.calls().await.contains(&BackendCall::Cancel(ME)));
    assert_eq!(h.notifications.open_subscriptions().await, 0);
    assert!(!h.session.is_timer_armed());
}

#[tokio::test(start_paused = true)]
async fn rapid_rejoin_leaves_a_single_timer() {
    let mut h = TestHarness::new();
    h.session.join_queue().await.unwrap();
    h.settle().await;
    h.session.cancel_queue().await.unwrap();
    assert_eq!(h.session.state(), &SessionState::Idle);
    h.session.join_queue().await.unwrap();
    h.settle().await;

    tokio::time::advance(TIMEOUT).await;
    h.settle().await;
    assert_eq!(h.session.state(), &SessionState::TimedOut);
    assert_eq!(h.backend.cancel_count().await, 2);

    tokio::time::advance(TIMEOUT * 2).await;
    h.settle().await;
    assert_eq!(h.backend.cancel_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn acceptance_stops_the_timer() {
    let mut h = TestHarness::new();
    h.connect(99).await.unwrap();
    assert!(!h.session.is_timer_armed());

    tokio::time::advance(TIMEOUT * 2).await;
    h.settle().await;
    assert_eq!(h.session.state(), &connected(99));
    assert_eq!(h.backend.cancel_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_session_reconnects_by_rejoining() {
    let mut h = TestHarness::new();
    h.session.join_queue().await.unwrap();
    h.settle().await;
    tokio::time::advance(TIMEOUT).await;
    h.settle().await;
    assert_eq!(h.session.state(), &SessionState::TimedOut);

    h.session.reconnect().await.unwrap();
    assert!(matches!(h.session.state(), SessionState::InQueue { .. }));
    let joins = h
        .backend
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, BackendCall::Join(_)))
        .count();
    assert_eq!(joins, 2);
    assert!(h.session.is_timer_armed());
}

#[tokio::test]
async fn rejection_closes_channels() {
    let mut h = TestHarness::new();
    h.session.join_queue().await.unwrap();
    h.notify(NotificationEvent::Rejected {
        reason: Some("office closed".to_string()),
    })
    .await;

    assert!(matches!(h.session.state(), SessionState::Rejected { .. }));
    assert_eq!(h.notifications.open_subscriptions().await, 0);
    assert!(!h.session.is_timer_armed());
    assert!(ChatView::from_snapshot(&h.session.snapshot()).show_join);

    h.session.join_queue().await.unwrap();
    assert!(matches!(h.session.state(), SessionState::InQueue { .. }));
}

#[tokio::test]
async fn queued_update_keeps_session_waiting() {
    let mut h = TestHarness::new();
    h.session.join_queue().await.unwrap();
    h.notify(NotificationEvent::Queued {
        queue_id: QueueId::from(11),
    })
    .await;
    assert_eq!(h.session.state().queue_id(), Some(&QueueId::from(7)));
}

#[tokio::test]
async fn join_without_student_fails_before_network() {
    let mut h = TestHarness::builder().anonymous().build();
    let err = h.session.join_queue().await.unwrap_err();
    assert!(matches!(
        err,
        AdmitError::QueueJoin {
            category: ErrorCategory::Validation,
            ..
        }
    ));
    assert!(h.backend.calls().await.is_empty());
}

#[tokio::test]
async fn required_auth_gates_join() {
    let mut h = TestHarness::builder().require_auth(true).build();
    let err = h.session.join_queue().await.unwrap_err();
    assert!(matches!(
        err,
        AdmitError::QueueJoin {
            category: ErrorCategory::Auth,
            ..
        }
    ));
    assert!(h.backend.calls().await.is_empty());

    let mut h = TestHarness::builder()
        .require_auth(true)
        .with_token("bearer-123")
        .build();
    h.session.join_queue().await.unwrap();
    assert_eq!(
        h.notifications.subscriptions().await,
        vec![(ME, Some("bearer-123".to_string()))]
    );
}

#[tokio::test]
async fn failed_join_is_retryable_and_visible() {
    let mut h = TestHarness::new();
    h.backend.fail_next_join(ErrorCategory::Server).await;

    let err = h.session.join_queue().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.session.state(), &SessionState::Idle);
    assert!(h.session.snapshot().notice.is_some());

    h.session.join_queue().await.unwrap();
    assert!(h.session.snapshot().notice.is_none());
}

#[tokio::test]
async fn join_is_refused_while_queued() {
    let mut h = TestHarness::new();
    h.session.join_queue().await.unwrap();
    let err = h.session.join_queue().await.unwrap_err();
    assert!(matches!(err, AdmitError::InvalidState { .. }));
}

#[tokio::test]
async fn cancel_failure_still_resets() {
    let mut h = TestHarness::new();
    h.session.join_queue().await.unwrap();
    h.backend.fail_next_cancel().await;

    let err = h.session.cancel_queue().await.unwrap_err();
    assert!(matches!(err, AdmitError::QueueCancel { .. }));
    assert_eq!(h.session.state(), &SessionState::Idle);
    assert_eq!(h.notifications.open_subscriptions().await, 0);
    assert!(!h.session.is_timer_armed());
}

// --- Connected ---

#[tokio::test]
async fn accepted_session_hydrates_history_and_drops_self_echo() {
    let mut h = two_message_session().await;
    assert_eq!(h.session.state(), &connected(99));
    assert_eq!(h.messages.connects().await, vec![SessionId::from(99)]);
    assert_eq!(texts(&h), ["Welcome", "Hi there"]);
    assert_eq!(h.session.messages()[1].sender_type, SenderType::Student);

    h.messages.emit(peer(ME, "hi")).await;
    h.settle().await;
    assert_eq!(h.session.messages().len(), 2);
}

#[tokio::test]
async fn send_appends_immediately_and_transmits() {
    let mut h = two_message_session().await;
    h.session.set_draft("Hello").await;
    h.session.send_message("Hello").await.unwrap();

    assert_eq!(h.session.messages().len(), 3);
    let last = &h.session.messages()[2];
    assert_eq!(last.sender_type, SenderType::Student);
    assert!(last.delivered);
    assert!(!last.read);
    assert!(h.session.snapshot().draft.is_empty());
    assert_eq!(
        h.messages.sent_messages().await,
        vec![OutgoingMessage {
            sender_id: ME,
            message: "Hello".to_string(),
        }]
    );

    h.messages.emit(peer(ME, "Hello")).await;
    h.settle().await;
    assert_eq!(h.session.messages().len(), 3);
}

#[tokio::test]
async fn officer_message_is_appended() {
    let mut h = two_message_session().await;
    h.messages.emit(peer(OFFICER, "How can I help?")).await;
    h.settle().await;

    let last = h.session.messages().last().unwrap();
    assert_eq!(last.text, "How can I help?");
    assert_eq!(last.sender_type, SenderType::Officer);
}

#[tokio::test]
async fn blank_send_is_a_no_op() {
    let mut h = two_message_session().await;
    h.session.send_message("   ").await.unwrap();
    assert_eq!(h.session.messages().len(), 2);
    assert!(h.messages.sent_messages().await.is_empty());
}

#[tokio::test]
async fn send_outside_a_session_is_refused() {
    let mut h = TestHarness::new();
    let err = h.session.send_message("hello?").await.unwrap_err();
    assert!(matches!(err, AdmitError::InvalidState { .. }));
    assert!(h.session.messages().is_empty());
}

#[tokio::test]
async fn dropped_channel_requires_reconnect() {
    let mut h = two_message_session().await;
    h.messages.drop_connection().await;
    h.settle().await;

    assert_eq!(h.session.state(), &connected(99));
    let snapshot = h.session.snapshot();
    assert!(!snapshot.channel_open);
    assert!(snapshot.notice.is_some());
    assert!(ChatView::from_snapshot(&snapshot).show_reconnect);

    let err = h.session.send_message("anyone?").await.unwrap_err();
    assert!(matches!(err, AdmitError::ChannelNotOpen));
    assert_eq!(h.session.messages().len(), 2);

    h.session.reconnect().await.unwrap();
    assert_eq!(h.messages.connects().await.len(), 2);
    h.session.send_message("back").await.unwrap();
    assert_eq!(h.session.messages().len(), 3);
}

#[tokio::test]
async fn failed_connect_leaves_session_connected() {
    let mut h = TestHarness::new();
    h.messages.fail_next_connect().await;
    h.connect(99).await.unwrap();

    assert_eq!(h.session.state(), &connected(99));
    assert!(!h.session.is_channel_open());
    assert!(h.session.snapshot().notice.is_some());

    h.session.reconnect().await.unwrap();
    assert!(h.session.is_channel_open());
}

#[tokio::test]
async fn reconnect_resubscribes_after_stream_end() {
    let mut h = two_message_session().await;
    h.notifications.end_stream().await;
    h.settle().await;
    assert!(!h.session.is_subscribed());

    h.session.reconnect().await.unwrap();
    assert!(h.session.is_subscribed());
    assert_eq!(h.notifications.subscribe_count().await, 2);
    assert_eq!(h.messages.connects().await.len(), 1);
}

// --- History ---

#[tokio::test]
async fn history_precedes_messages_that_arrived_first() {
    let mut h = TestHarness::builder()
        .with_history(vec![entry(1, OFFICER, "old-1"), entry(2, ME, "old-2")])
        .build();
    h.backend.hold_history().await;
    h.connect(99).await.unwrap();
    assert!(h.session.snapshot().history_pending);

    h.messages.emit(peer(OFFICER, "live")).await;
    h.settle().await;
    assert_eq!(texts(&h), ["live"]);

    h.backend.release_history().await;
    h.settle().await;
    assert_eq!(texts(&h), ["old-1", "old-2", "live"]);
    assert!(!h.session.snapshot().history_pending);
}

#[tokio::test]
async fn history_resolving_after_reset_is_ignored() {
    let mut h = TestHarness::builder()
        .with_history(vec![entry(1, OFFICER, "old")])
        .build();
    h.backend.hold_history().await;
    h.connect(99).await.unwrap();
    h.session.reset().await;

    h.backend.release_history().await;
    h.settle().await;
    assert_eq!(h.session.state(), &SessionState::Idle);
    assert!(h.session.messages().is_empty());
}

#[tokio::test]
async fn history_failure_leaves_an_empty_usable_list() {
    let mut h = TestHarness::new();
    h.backend.fail_history().await;
    h.connect(99).await.unwrap();

    assert_eq!(h.session.state(), &connected(99));
    assert!(h.session.messages().is_empty());
    h.session.send_message("still here").await.unwrap();
    assert_eq!(h.session.messages().len(), 1);
}

// --- Ending and rating ---

#[tokio::test]
async fn chat_end_then_rating() {
    let mut h = two_message_session().await;
    h.messages.emit(ChannelEvent::ChatEnded).await;
    h.settle().await;

    assert_eq!(
        h.session.state(),
        &SessionState::Ended {
            awaiting_rating: Some(SessionId::from(99))
        }
    );
    assert_eq!(h.messages.open_connections().await, 0);
    assert!(h.session.messages().is_empty());
    assert!(ChatView::from_snapshot(&h.session.snapshot()).show_rating_prompt);

    h.session.submit_rating(Some(4)).await.unwrap();
    assert_eq!(
        h.backend.end_requests().await,
        vec![EndSessionRequest {
            session_id: SessionId::from(99),
            ended_by: ME,
            rating: Some(Rating::new(4).unwrap()),
        }]
    );
    assert_eq!(
        h.session.state(),
        &SessionState::Ended {
            awaiting_rating: None
        }
    );
    assert!(h.session.state().can_join());
}

#[tokio::test]
async fn notification_chat_end_also_ends() {
    let mut h = two_message_session().await;
    h.notify(NotificationEvent::ChatEnded).await;
    assert!(h.session.state().awaiting_rating().is_some());
    assert_eq!(h.messages.open_connections().await, 0);
    assert_eq!(h.notifications.open_subscriptions().await, 0);
}

#[tokio::test]
async fn missing_rating_makes_no_network_call() {
    let mut h = two_message_session().await;
    h.messages.emit(ChannelEvent::ChatEnded).await;
    h.settle().await;

    let err = h.session.submit_rating(None).await.unwrap_err();
    assert!(matches!(err, AdmitError::RatingValidation(_)));
    assert!(h.backend.end_requests().await.is_empty());
    assert!(h.session.state().awaiting_rating().is_some());
}

#[tokio::test]
async fn failed_rating_keeps_prompt_for_retry() {
    let mut h = two_message_session().await;
    h.messages.emit(ChannelEvent::ChatEnded).await;
    h.settle().await;
    h.backend.fail_next_end().await;

    let err = h.session.submit_rating(Some(5)).await.unwrap_err();
    assert!(matches!(err, AdmitError::RatingSubmit { .. }));
    assert!(h.session.state().awaiting_rating().is_some());

    h.session.submit_rating(Some(5)).await.unwrap();
    assert!(h.session.state().awaiting_rating().is_none());
}

#[tokio::test]
async fn dismissed_rating_does_not_resurrect() {
    let mut h = two_message_session().await;
    h.messages.emit(ChannelEvent::ChatEnded).await;
    h.settle().await;
    h.session.dismiss_rating().await;

    h.messages.emit(peer(OFFICER, "late")).await;
    h.settle().await;
    assert!(h.session.messages().is_empty());
    assert!(h.backend.end_requests().await.is_empty());
    assert_eq!(
        h.session.state(),
        &SessionState::Ended {
            awaiting_rating: None
        }
    );
}

#[tokio::test]
async fn explicit_end_calls_server_without_rating() {
    let mut h = two_message_session().await;
    h.session.end_chat().await.unwrap();

    assert_eq!(
        h.backend.end_requests().await,
        vec![EndSessionRequest {
            session_id: SessionId::from(99),
            ended_by: ME,
            rating: None,
        }]
    );
    assert!(h.session.state().awaiting_rating().is_some());
    assert_eq!(h.messages.open_connections().await, 0);
}

#[tokio::test]
async fn failed_end_keeps_chat_open_for_retry() {
    let mut h = two_message_session().await;
    h.backend.fail_next_end().await;

    let err = h.session.end_chat().await.unwrap_err();
    assert!(matches!(err, AdmitError::SessionEnd { .. }));
    assert!(err.is_retryable());
    assert_eq!(h.session.state(), &connected(99));
    assert!(h.session.is_channel_open());
    assert_eq!(h.session.messages().len(), 2);
    let notice = h.session.snapshot().notice.unwrap();
    assert!(notice.starts_with("Could not end the chat."), "got: {notice}");

    h.session.end_chat().await.unwrap();
    assert_eq!(
        h.session.state().awaiting_rating(),
        Some(&SessionId::from(99))
    );
    assert_eq!(h.messages.open_connections().await, 0);
    assert_eq!(h.backend.end_requests().await.len(), 2);
    assert!(h.session.snapshot().notice.is_none());
}

// --- Teardown ---

#[tokio::test]
async fn reset_twice_is_harmless() {
    let mut h = two_message_session().await;
    h.session.reset().await;
    h.session.reset().await;

    assert_eq!(h.session.state(), &SessionState::Idle);
    assert!(h.session.messages().is_empty());
    assert_eq!(h.messages.open_connections().await, 0);
    assert_eq!(h.notifications.open_subscriptions().await, 0);
    assert!(!h.session.is_timer_armed());
}

#[tokio::test]
async fn snapshots_follow_transitions() {
    let mut h = TestHarness::new();
    let mut rx = h.session.subscribe();
    h.session.join_queue().await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert!(matches!(
        rx.borrow_and_update().state,
        SessionState::InQueue { .. }
    ));

    h.notify(NotificationEvent::Accepted {
        session_id: SessionId::from(99),
    })
    .await;
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.state, connected(99));
    assert!(snapshot.channel_open);
    assert_eq!(snapshot.local_user, Some(ME));
}

#[tokio::test]
async fn spawned_session_serves_commands_and_shuts_down() {
    let h = TestHarness::new();
    let notifications = h.notifications.clone();
    let messages = h.messages.clone();
    let cancel = CancellationToken::new();
    let (handle, task) = h.session.spawn(cancel.clone());

    handle.join_queue().await.unwrap();
    notifications
        .emit(NotificationEvent::Accepted {
            session_id: SessionId::from(99),
        })
        .await;
    let mut changes = handle.changes();
    changes
        .wait_for(|s| s.channel_open)
        .await
        .unwrap();
    handle.send_message("Hello").await.unwrap();
    assert_eq!(handle.snapshot().messages.len(), 1);

    cancel.cancel();
    task.await.unwrap();
    assert_eq!(messages.open_connections().await, 0);
    assert_eq!(notifications.open_subscriptions().await, 0);
    assert!(matches!(
        handle.join_queue().await,
        Err(AdmitError::Internal(_))
    ));
}
