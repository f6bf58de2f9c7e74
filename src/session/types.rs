//! Chat log types — senders, messages, session state.

use crate::render;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who a chat message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// Where the session is in its lifecycle. `ShuttingDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
    ShuttingDown,
}

/// One exchanged message. Immutable once created; `rendered_html` is
/// derived exactly once from `raw_text` — the full formatting pipeline for
/// assistant and system senders, escape-and-line-breaks only for users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub raw_text: String,
    pub rendered_html: String,
    pub created_at: u64,
}

impl ChatMessage {
    pub fn new(sender: Sender, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let rendered_html = match sender {
            Sender::User => render::format_user(&raw_text),
            Sender::Assistant | Sender::System => render::format_assistant(&raw_text),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            raw_text,
            rendered_html,
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// Append-only, chronological message log. Never empty once the session
/// has added its welcome entry; clearing keeps exactly that first entry.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<ChatMessage>,
}

impl ChatLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    pub(crate) fn reset_to_first(&mut self) {
        self.entries.truncate(1);
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.entries.last()
    }
}
