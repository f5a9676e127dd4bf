// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-slot inactivity timer.
//!
//! At most one timer is armed at a time. Re-arming aborts the previous
//! task first, and every armed timer carries an id so that a fire which
//! raced with a disarm can be recognised and ignored.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Identifies one arming of the timer.
pub type TimerId = u64;

#[derive(Debug)]
struct Armed {
    id: TimerId,
    task: JoinHandle<()>,
}

/// Owned timer slot. Dropping it disarms.
#[derive(Debug)]
pub struct InactivityTimer {
    duration: Duration,
    slot: Option<Armed>,
    next_id: TimerId,
}

impl InactivityTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            slot: None,
            next_id: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Arms the timer, disarming any previous one. `on_fire` runs once the
    /// duration elapses, unless the timer is disarmed first.
    pub fn arm<F, Fut>(&mut self, on_fire: F) -> TimerId
    where
        F: FnOnce(TimerId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();
        self.next_id += 1;
        let id = self.next_id;
        let duration = self.duration;
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_fire(id).await;
        });
        debug!(timer = id, secs = duration.as_secs(), "inactivity timer armed");
        self.slot = Some(Armed { id, task });
        id
    }

    /// Disarms the current timer. Returns `true` if one was armed.
    pub fn disarm(&mut self) -> bool {
        match self.slot.take() {
            Some(armed) => {
                armed.task.abort();
                debug!(timer = armed.id, "inactivity timer disarmed");
                true
            }
            None => false,
        }
    }

    /// Consumes a fire notification. Returns `true` only when `id` is the
    /// currently armed timer, which is then cleared.
    pub fn take_fired(&mut self, id: TimerId) -> bool {
        match &self.slot {
            Some(armed) if armed.id == id => {
                self.slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
