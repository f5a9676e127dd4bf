// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket message channel.
//!
//! One socket per accepted session. A pump task owns the socket: it writes
//! queued [`OutgoingMessage`]s, parses text frames into [`ChannelEvent`]s,
//! and shuts the socket down when the [`Connection`] handle is closed.

use std::time::Duration;

use admit_core::{AdmitError, Connection, ConnectionEnd, MessageChannel, SessionId};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::endpoints::Endpoints;
use crate::wire::parse_channel_event;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Message channel over `{channel}/live_chat/livechat/chat/{session_id}`.
#[derive(Debug, Clone)]
pub struct WsMessageChannel {
    endpoints: Endpoints,
    connect_timeout: Duration,
    buffer: usize,
}

impl WsMessageChannel {
    pub fn new(endpoints: Endpoints, connect_timeout: Duration, buffer: usize) -> Self {
        Self {
            endpoints,
            connect_timeout,
            buffer,
        }
    }
}

#[async_trait]
impl MessageChannel for WsMessageChannel {
    async fn connect(&self, session_id: &SessionId) -> Result<Connection, AdmitError> {
        let url = self.endpoints.message_channel(session_id);
        let (socket, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
                .await
                .map_err(|_| AdmitError::channel("message channel handshake timed out"))?
                .map_err(|e| AdmitError::ChannelConnection {
                    message: format!("message channel handshake failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

        let (connection, end) = Connection::pair(self.buffer);
        end.mark_open();
        info!(session_id = %session_id, "message channel open");
        tokio::spawn(pump(socket, end, session_id.clone()));
        Ok(connection)
    }
}

async fn pump(socket: Socket, mut end: ConnectionEnd, session_id: SessionId) {
    let (mut writer, mut reader) = socket.split();

    loop {
        tokio::select! {
            _ = end.events.closed() => {
                debug!(session_id = %session_id, "message channel closed by the session");
                let _ = writer.send(WsMessage::Close(None)).await;
                break;
            }
            outgoing = end.outbound.recv() => {
                let Some(outgoing) = outgoing else { break };
                let text = match serde_json::to_string(&outgoing) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode outgoing message");
                        continue;
                    }
                };
                if let Err(e) = writer.send(WsMessage::Text(text.into())).await {
                    warn!(session_id = %session_id, error = %e, "message channel write failed");
                    break;
                }
            }
            incoming = reader.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => match parse_channel_event(text.as_str()) {
                    Ok(Some(event)) => {
                        if !end.events.send(event).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(session_id = %session_id, error = %e, "dropping channel frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(session_id = %session_id, frame = ?frame, "message channel closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "message channel error");
                    break;
                }
                None => {
                    info!(session_id = %session_id, "message channel ended");
                    break;
                }
            },
        }
    }

    end.mark_closed();
}
