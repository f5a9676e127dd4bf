// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted support backend.
//!
//! Records every call and answers from configurable state. History fetches
//! can be held back to simulate a slow server.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use admit_core::{
    AdmitError, EndSessionRequest, ErrorCategory, HistoryEntry, HistoryLoader, QueueClient,
    QueueId, QueueTicket, SessionId, SessionTerminator, UserId,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Join(UserId),
    Cancel(UserId),
    History(SessionId),
    End(EndSessionRequest),
}

struct BackendState {
    calls: Vec<BackendCall>,
    queue_id: QueueId,
    history: Vec<HistoryEntry>,
    history_gate: Option<Arc<Semaphore>>,
    fail_join: Option<ErrorCategory>,
    fail_cancel: bool,
    fail_history: bool,
    fail_end: bool,
}

pub struct MockSupportBackend {
    state: Mutex<BackendState>,
}

impl Default for MockSupportBackend {
    fn default() -> Self {
        Self::new(QueueId::from(7))
    }
}

impl MockSupportBackend {
    /// A backend whose `join_queue` answers with `queue_id`.
    pub fn new(queue_id: QueueId) -> Self {
        Self {
            state: Mutex::new(BackendState {
                calls: Vec::new(),
                queue_id,
                history: Vec::new(),
                history_gate: None,
                fail_join: None,
                fail_cancel: false,
                fail_history: false,
                fail_end: false,
            }),
        }
    }

    /// Same backend, answering history fetches with `entries`.
    pub fn with_history(mut self, entries: Vec<HistoryEntry>) -> Self {
        self.state.get_mut().history = entries;
        self
    }

    pub async fn set_queue_id(&self, queue_id: QueueId) {
        self.state.lock().await.queue_id = queue_id;
    }

    pub async fn set_history(&self, entries: Vec<HistoryEntry>) {
        self.state.lock().await.history = entries;
    }

    /// Makes history fetches wait until [`release_history`](Self::release_history).
    pub async fn hold_history(&self) {
        self.state.lock().await.history_gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets every held history fetch complete.
    pub async fn release_history(&self) {
        if let Some(gate) = self.state.lock().await.history_gate.take() {
            gate.add_permits(Semaphore::MAX_PERMITS >> 4);
        }
    }

    pub async fn fail_next_join(&self, category: ErrorCategory) {
        self.state.lock().await.fail_join = Some(category);
    }

    pub async fn fail_next_cancel(&self) {
        self.state.lock().await.fail_cancel = true;
    }

    pub async fn fail_history(&self) {
        self.state.lock().await.fail_history = true;
    }

    pub async fn fail_next_end(&self) {
        self.state.lock().await.fail_end = true;
    }

    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().await.calls.clone()
    }

    /// Every `endSession` request received, in order.
    pub async fn end_requests(&self) -> Vec<EndSessionRequest> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::End(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub async fn cancel_count(&self) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|call| matches!(call, BackendCall::Cancel(_)))
            .count()
    }
}

#[async_trait]
impl QueueClient for MockSupportBackend {
    async fn join_queue(&self, customer_id: UserId) -> Result<QueueTicket, AdmitError> {
        let mut state = self.state.lock().await;
        state.calls.push(BackendCall::Join(customer_id));
        if let Some(category) = state.fail_join.take() {
            return Err(AdmitError::queue_join("mock join failure", category));
        }
        Ok(QueueTicket {
            queue_id: state.queue_id.clone(),
        })
    }

    async fn cancel_queue(&self, customer_id: UserId) -> Result<(), AdmitError> {
        let mut state = self.state.lock().await;
        state.calls.push(BackendCall::Cancel(customer_id));
        if std::mem::take(&mut state.fail_cancel) {
            return Err(AdmitError::QueueCancel {
                message: "mock cancel failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryLoader for MockSupportBackend {
    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<HistoryEntry>, AdmitError> {
        let gate = {
            let mut state = self.state.lock().await;
            state.calls.push(BackendCall::History(session_id.clone()));
            state.history_gate.clone()
        };
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| AdmitError::Internal("history gate closed".to_string()))?;
        }

        let state = self.state.lock().await;
        if state.fail_history {
            return Err(AdmitError::HistoryFetch {
                message: "mock history failure".to_string(),
                source: None,
            });
        }
        Ok(state.history.clone())
    }
}

#[async_trait]
impl SessionTerminator for MockSupportBackend {
    async fn end_session(&self, request: &EndSessionRequest) -> Result<(), AdmitError> {
        let mut state = self.state.lock().await;
        state.calls.push(BackendCall::End(request.clone()));
        if std::mem::take(&mut state.fail_end) {
            let message = "mock end failure".to_string();
            let category = ErrorCategory::Server;
            return Err(match request.rating {
                Some(_) => AdmitError::RatingSubmit {
                    message,
                    category,
                    source: None,
                },
                None => AdmitError::SessionEnd {
                    message,
                    category,
                    source: None,
                },
            });
        }
        Ok(())
    }
}
