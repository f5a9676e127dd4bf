// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merging fetched session history with messages that arrived live.

use admit_core::{HistoryEntry, Message, UserId};

/// Builds the message list once history for the current session resolved.
///
/// History entries come first, in the order the server returned them. Live
/// messages received while the fetch was in flight follow, minus any whose
/// interaction id already appears in the history.
pub fn hydrate(entries: &[HistoryEntry], live: Vec<Message>, local_user: Option<UserId>) -> Vec<Message> {
    let mut merged: Vec<Message> = entries
        .iter()
        .map(|entry| Message::from_history(entry, local_user))
        .collect();
    let history_len = merged.len();

    for message in live {
        let duplicate = merged[..history_len].iter().any(|m| m.id == message.id);
        if !duplicate {
            merged.push(message);
        }
    }
    merged
}

/// Whether `messages` already holds a message with this interaction id.
pub fn contains_interaction(messages: &[Message], interaction_id: Option<&str>) -> bool {
    match interaction_id {
        Some(id) => messages.iter().any(|m| m.id == id),
        None => false,
    }
}
