// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message-channel and chatbot tests against an in-process WebSocket server.

use std::future::Future;
use std::time::Duration;

use admit_core::{AdmitError, ChannelEvent, MessageChannel, OutgoingMessage, SessionId, UserId};
use admit_transport::chatbot::{ChatbotClient, EMPTY_REPLY};
use admit_transport::{Endpoints, WsMessageChannel};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

type ServerSocket = WebSocketStream<TcpStream>;

/// Accepts `connections` sockets in turn and hands each to `handler`.
async fn serve<F, Fut>(connections: usize, handler: F) -> Endpoints
where
    F: Fn(ServerSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for _ in 0..connections {
            let (stream, _) = listener.accept().await.unwrap();
            let socket = accept_async(stream).await.unwrap();
            handler(socket).await;
        }
    });
    Endpoints::new(&format!("http://{addr}"), &format!("ws://{addr}")).unwrap()
}

fn text(value: Value) -> Message {
    Message::Text(value.to_string().into())
}

async fn next_json(socket: &mut ServerSocket) -> Value {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(t))) => return serde_json::from_str(t.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

fn channel(endpoints: Endpoints) -> WsMessageChannel {
    WsMessageChannel::new(endpoints, Duration::from_secs(5), 16)
}

#[tokio::test]
async fn events_flow_both_ways() {
    let endpoints = serve(1, |mut socket| async move {
        socket.send(text(json!({ "event": "chat_connected" }))).await.unwrap();
        socket
            .send(text(json!({ "event": "message", "sender_id": 7, "message": "How can I help?" })))
            .await
            .unwrap();
        socket.send(Message::Text("not json".to_string().into())).await.unwrap();

        let sent = next_json(&mut socket).await;
        assert_eq!(sent, json!({ "sender_id": 42, "message": "Hello" }));
        socket
            .send(text(json!({
                "event": "message",
                "sender_id": sent["sender_id"],
                "message": sent["message"],
            })))
            .await
            .unwrap();
        socket.send(text(json!({ "event": "chat_ended" }))).await.unwrap();
        let _ = socket.close(None).await;
    })
    .await;

    let mut conn = channel(endpoints)
        .connect(&SessionId::from(99))
        .await
        .unwrap();
    assert!(conn.is_open());
    assert_eq!(conn.recv().await, Some(ChannelEvent::ChatConnected));

    let Some(ChannelEvent::Message(first)) = conn.recv().await else {
        panic!("expected officer message");
    };
    assert_eq!(first.sender_id, UserId(7));
    assert_eq!(first.message, "How can I help?");

    conn.send(OutgoingMessage {
        sender_id: UserId(42),
        message: "Hello".into(),
    })
    .unwrap();

    let Some(ChannelEvent::Message(echo)) = conn.recv().await else {
        panic!("expected echo");
    };
    assert_eq!(echo.sender_id, UserId(42));
    assert_eq!(echo.message, "Hello");

    assert_eq!(conn.recv().await, Some(ChannelEvent::ChatEnded));
    assert_eq!(conn.recv().await, None);
    assert!(!conn.is_open());
}

#[tokio::test]
async fn closing_the_handle_closes_the_socket() {
    let (seen_tx, mut seen_rx) = mpsc::channel(1);
    let endpoints = serve(1, move |mut socket| {
        let seen_tx = seen_tx.clone();
        async move {
            let closed = matches!(socket.next().await, Some(Ok(Message::Close(_))) | None);
            let _ = seen_tx.send(closed).await;
        }
    })
    .await;

    let mut conn = channel(endpoints)
        .connect(&SessionId::from(99))
        .await
        .unwrap();
    assert!(conn.close());
    assert!(!conn.close());
    let err = conn
        .send(OutgoingMessage {
            sender_id: UserId(42),
            message: "late".into(),
        })
        .unwrap_err();
    assert!(matches!(err, AdmitError::ChannelNotOpen));
    assert_eq!(seen_rx.recv().await, Some(true));
}

#[tokio::test]
async fn server_drop_marks_connection_closed() {
    let endpoints = serve(1, |socket| async move {
        drop(socket);
    })
    .await;

    let mut conn = channel(endpoints)
        .connect(&SessionId::from(99))
        .await
        .unwrap();
    assert_eq!(conn.recv().await, None);
    let err = conn
        .send(OutgoingMessage {
            sender_id: UserId(42),
            message: "anyone?".into(),
        })
        .unwrap_err();
    assert!(matches!(err, AdmitError::ChannelNotOpen));
}

#[tokio::test]
async fn connect_failure_is_channel_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoints = Endpoints::new(&format!("http://{addr}"), &format!("ws://{addr}")).unwrap();
    let err = channel(endpoints)
        .connect(&SessionId::from(99))
        .await
        .unwrap_err();
    assert!(matches!(err, AdmitError::ChannelConnection { .. }));
}

#[tokio::test]
async fn chatbot_streams_reply_and_keeps_session() {
    let (hello_tx, mut hello_rx) = mpsc::channel(4);
    let endpoints = serve(2, move |mut socket| {
        let hello_tx = hello_tx.clone();
        async move {
            let handshake = next_json(&mut socket).await;
            let question = next_json(&mut socket).await;
            let _ = hello_tx.send(handshake).await;
            assert_eq!(question["message"], "When is the deadline?");
            socket
                .send(text(json!({ "event": "session_created", "session_id": "s-1" })))
                .await
                .unwrap();
            socket.send(text(json!({ "event": "chunk", "content": " The deadline " }))).await.unwrap();
            socket.send(text(json!({ "type": "chunk", "text": "is May 1. " }))).await.unwrap();
            socket.send(text(json!({ "event": "done" }))).await.unwrap();
            let _ = socket.next().await;
        }
    })
    .await;

    let bot = ChatbotClient::new(&endpoints, Duration::from_secs(5));
    let reply = bot
        .ask(Some(UserId(42)), "When is the deadline?")
        .await
        .unwrap();
    assert_eq!(reply, "The deadline is May 1.");
    assert_eq!(bot.session_id().await.as_deref(), Some("s-1"));

    let first = hello_rx.recv().await.unwrap();
    assert_eq!(first, json!({ "user_id": "42", "session_id": null }));

    bot.ask(Some(UserId(42)), "When is the deadline?")
        .await
        .unwrap();
    let second = hello_rx.recv().await.unwrap();
    assert_eq!(second["session_id"], "s-1");
}

#[tokio::test]
async fn chatbot_guest_and_empty_reply() {
    let (hello_tx, mut hello_rx) = mpsc::channel(1);
    let endpoints = serve(1, move |mut socket| {
        let hello_tx = hello_tx.clone();
        async move {
            let handshake = next_json(&mut socket).await;
            let _question = next_json(&mut socket).await;
            let _ = hello_tx.send(handshake).await;
            socket.send(text(json!({ "event": "done" }))).await.unwrap();
            let _ = socket.next().await;
        }
    })
    .await;

    let bot = ChatbotClient::new(&endpoints, Duration::from_secs(5));
    assert_eq!(bot.ask(None, "hi").await.unwrap(), EMPTY_REPLY);
    assert_eq!(hello_rx.recv().await.unwrap()["user_id"], "guest");
}

#[tokio::test]
async fn chatbot_error_frame_fails() {
    let endpoints = serve(1, |mut socket| async move {
        let _ = next_json(&mut socket).await;
        let _ = next_json(&mut socket).await;
        socket
            .send(text(json!({ "event": "error", "message": "model overloaded" })))
            .await
            .unwrap();
        let _ = socket.next().await;
    })
    .await;

    let bot = ChatbotClient::new(&endpoints, Duration::from_secs(5));
    let err = bot.ask(None, "hi").await.unwrap_err();
    assert!(matches!(err, AdmitError::Chatbot(ref m) if m == "model overloaded"));
}

#[tokio::test]
async fn chatbot_close_before_done_fails() {
    let endpoints = serve(1, |mut socket| async move {
        let _ = next_json(&mut socket).await;
        let _ = next_json(&mut socket).await;
        socket.send(text(json!({ "event": "chunk", "content": "partial" }))).await.unwrap();
        let _ = socket.close(None).await;
    })
    .await;

    let bot = ChatbotClient::new(&endpoints, Duration::from_secs(5));
    let err = bot.ask(None, "hi").await.unwrap_err();
    assert!(matches!(err, AdmitError::Chatbot(_)));
}
