// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owned handles for the two channel kinds.
//!
//! A transport hands the session a [`Subscription`] (receive-only) or a
//! [`Connection`] (duplex) and keeps the matching sink end for its pump
//! task. Closing a handle cancels the shared [`CancellationToken`], which
//! the pump observes to tear the underlying socket down. Dropping a handle
//! closes it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::error::AdmitError;
use crate::types::{ChannelEvent, OutgoingMessage};

/// Receive-only channel handle.
#[derive(Debug)]
pub struct Subscription<E> {
    events: mpsc::Receiver<E>,
    cancel: CancellationToken,
    terminated: bool,
}

/// Transport side of a [`Subscription`].
#[derive(Debug)]
pub struct EventSink<E> {
    tx: mpsc::Sender<E>,
    cancel: CancellationToken,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<E> Subscription<E> {
    /// Creates a connected handle/sink pair with a bounded event buffer.
    pub fn pair(buffer: usize) -> (Subscription<E>, EventSink<E>) {
        let (tx, events) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        let sink = EventSink {
            tx,
            cancel: cancel.clone(),
        };
        (
            Subscription {
                events,
                cancel,
                terminated: false,
            },
            sink,
        )
    }

    /// Next event in transport order. `None` once the stream ended or was closed.
    pub async fn recv(&mut self) -> Option<E> {
        if self.terminated {
            return None;
        }
        let next = self.events.recv().await;
        if next.is_none() {
            self.terminated = true;
        }
        next
    }

    /// Closes the handle. Returns `true` only for the call that closed it.
    pub fn close(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        self.events.close();
        self.terminated = true;
        true
    }

    /// Whether the handle can still yield events.
    pub fn is_open(&self) -> bool {
        !self.terminated && !self.cancel.is_cancelled()
    }

    /// Token cancelled when the handle is closed or dropped.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<E> EventSink<E> {
    /// Forwards an event. Returns `false` when the consumer is gone.
    pub async fn send(&self, event: E) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    /// Resolves when the consumer closes or drops the handle.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

/// Duplex message-channel handle.
#[derive(Debug)]
pub struct Connection {
    events: Subscription<ChannelEvent>,
    outbound: mpsc::Sender<OutgoingMessage>,
    open: Arc<AtomicBool>,
}

/// Transport side of a [`Connection`].
#[derive(Debug)]
pub struct ConnectionEnd {
    pub events: EventSink<ChannelEvent>,
    pub outbound: mpsc::Receiver<OutgoingMessage>,
    open: Arc<AtomicBool>,
}

impl Connection {
    /// Creates a handle/end pair. The handle starts not-ready until the
    /// transport calls [`ConnectionEnd::mark_open`].
    pub fn pair(buffer: usize) -> (Connection, ConnectionEnd) {
        let (events, sink) = Subscription::pair(buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer.max(1));
        let open = Arc::new(AtomicBool::new(false));
        (
            Connection {
                events,
                outbound: outbound_tx,
                open: Arc::clone(&open),
            },
            ConnectionEnd {
                events: sink,
                outbound: outbound_rx,
                open,
            },
        )
    }

    /// Queues a payload for transmission. Fails fast when not open.
    pub fn send(&self, msg: OutgoingMessage) -> Result<(), AdmitError> {
        if !self.is_open() {
            return Err(AdmitError::ChannelNotOpen);
        }
        self.outbound.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => AdmitError::channel("outbound buffer full"),
            TrySendError::Closed(_) => AdmitError::ChannelNotOpen,
        })
    }

    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        let next = self.events.recv().await;
        if next.is_none() {
            self.open.store(false, Ordering::SeqCst);
        }
        next
    }

    /// Closes the connection. Returns `true` only for the call that closed it.
    pub fn close(&mut self) -> bool {
        self.open.store(false, Ordering::SeqCst);
        self.events.close()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && self.events.is_open()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.events.cancellation()
    }
}

impl ConnectionEnd {
    /// Marks the channel ready for sends.
    pub fn mark_open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    /// Marks the channel not ready, e.g. after the socket dropped.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}
