//! Chat session — the state machine around submit, typing indicator, and
//! reply handling.
//!
//! The session exclusively owns the [`ChatLog`] and [`SessionState`]. All
//! transitions happen on the single logical flow that calls its async
//! methods; the UI observes them through the [`SessionEventBus`]. At most
//! one query is in flight at a time: `submit` is rejected outside `Idle`,
//! and every completion is funneled through a sequence-numbered `finish`
//! so a reply that arrives after its request has timed out is discarded
//! instead of being attributed to a later exchange.

pub mod events;
pub mod types;

pub use events::{SessionEvent, SessionEventBus};
pub use types::{ChatLog, ChatMessage, Sender, SessionState};

use crate::backend::{AssistantBackend, BackendError};
use std::sync::Arc;
use std::time::Duration;

/// First entry of every log; `clear` keeps exactly this message.
pub const WELCOME_TEXT: &str =
    "Hello! I'm your course assistant. Ask me about your courses, assignments, and upcoming deadlines.";

const GENERIC_FAILURE_TEXT: &str = "Sorry, there was an error processing your request.";
const CLEARED_TEXT: &str = "Chat history has been cleared.";
const SHUTDOWN_STARTED_TEXT: &str = "Shutting down the application...";
const SHUTDOWN_OK_TEXT: &str = "Shutdown successful. It is now safe to close this session.";
const SHUTDOWN_FAILED_TEXT: &str =
    "Failed to shut down the application. Please close it manually.";

/// How a dispatched query resolved.
#[derive(Debug)]
enum ReplyOutcome {
    Reply(String),
    ApplicationError(String),
    TransportFailure,
}

pub struct ChatSession {
    backend: Arc<dyn AssistantBackend>,
    log: ChatLog,
    state: SessionState,
    reply_timeout: Duration,
    next_seq: u64,
    in_flight: Option<u64>,
    bus: SessionEventBus,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn AssistantBackend>, reply_timeout: Duration) -> Self {
        let mut session = Self {
            backend,
            log: ChatLog::new(),
            state: SessionState::Idle,
            reply_timeout,
            next_seq: 0,
            in_flight: None,
            bus: SessionEventBus::new(),
        };
        session.append(Sender::System, WELCOME_TEXT);
        session
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Subscribe to session events. Returns a handle for `unsubscribe`.
    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + Send + Sync + 'static) -> u64 {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.bus.unsubscribe(id)
    }

    /// Submit a user query. Empty or whitespace-only text is ignored, as is
    /// any submit while a reply is pending or after shutdown.
    pub async fn submit(&mut self, text: &str) {
        let Some(seq) = self.begin_submit(text) else {
            return;
        };
        let query = text.trim().to_string();
        let backend = Arc::clone(&self.backend);

        let outcome =
            match tokio::time::timeout(self.reply_timeout, backend.send_query(&query)).await {
                Ok(Ok(reply)) => ReplyOutcome::Reply(reply),
                Ok(Err(BackendError::Application(message))) => {
                    ReplyOutcome::ApplicationError(message)
                }
                Ok(Err(BackendError::Transport(error))) => {
                    tracing::warn!("query transport failure: {error}");
                    ReplyOutcome::TransportFailure
                }
                Err(_) => {
                    tracing::warn!(
                        "no reply within {}s, giving up on request {seq}",
                        self.reply_timeout.as_secs()
                    );
                    ReplyOutcome::TransportFailure
                }
            };

        self.finish(seq, outcome);
    }

    /// Validate and record a submission. Returns the request sequence
    /// number, or `None` when the submit is a no-op.
    fn begin_submit(&mut self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.state != SessionState::Idle {
            tracing::debug!("submit rejected in state {:?}", self.state);
            return None;
        }

        self.append(Sender::User, text);
        self.set_state(SessionState::AwaitingReply);
        self.bus.emit(&SessionEvent::IndicatorShown);

        self.next_seq += 1;
        self.in_flight = Some(self.next_seq);
        Some(self.next_seq)
    }

    /// Consume a query completion. A completion whose sequence number no
    /// longer matches the in-flight request — it already timed out, or the
    /// session has since shut down — is discarded.
    fn finish(&mut self, seq: u64, outcome: ReplyOutcome) {
        if self.in_flight != Some(seq) || self.state != SessionState::AwaitingReply {
            tracing::debug!("discarding stale completion for request {seq}");
            return;
        }
        self.in_flight = None;

        match outcome {
            ReplyOutcome::Reply(body) => self.append(Sender::Assistant, body),
            ReplyOutcome::ApplicationError(message) => {
                self.append(Sender::Assistant, format!("Error: {message}"));
            }
            ReplyOutcome::TransportFailure => {
                self.append(Sender::Assistant, GENERIC_FAILURE_TEXT);
            }
        }

        self.set_state(SessionState::Idle);
        self.bus.emit(&SessionEvent::IndicatorHidden);
    }

    /// Reset the log to the welcome entry. Only valid while idle; the
    /// caller is responsible for confirming with the user first. Returns
    /// whether the log was cleared.
    pub fn clear(&mut self) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.log.reset_to_first();
        self.bus.emit(&SessionEvent::LogCleared);
        self.append(Sender::System, CLEARED_TEXT);
        true
    }

    /// Ask the backend to shut down. On acknowledgment the session becomes
    /// terminal; on failure it stays usable and shutdown can be retried.
    pub async fn request_shutdown(&mut self) {
        if self.state == SessionState::ShuttingDown {
            return;
        }
        self.append(Sender::System, SHUTDOWN_STARTED_TEXT);

        let backend = Arc::clone(&self.backend);
        let acked =
            match tokio::time::timeout(self.reply_timeout, backend.request_shutdown()).await {
                Ok(Ok(())) => true,
                Ok(Err(error)) => {
                    tracing::warn!("shutdown request failed: {error}");
                    false
                }
                Err(_) => {
                    tracing::warn!("shutdown request timed out");
                    false
                }
            };

        if acked {
            // Any still-pending reply is now moot, and its indicator with it.
            self.in_flight = None;
            if self.state == SessionState::AwaitingReply {
                self.bus.emit(&SessionEvent::IndicatorHidden);
            }
            self.set_state(SessionState::ShuttingDown);
            self.append(Sender::System, SHUTDOWN_OK_TEXT);
        } else {
            self.append(Sender::System, SHUTDOWN_FAILED_TEXT);
        }
    }

    fn append(&mut self, sender: Sender, raw_text: impl Into<String>) {
        let message = ChatMessage::new(sender, raw_text);
        self.bus.emit(&SessionEvent::MessageAppended(message.clone()));
        self.log.push(message);
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
            self.bus.emit(&SessionEvent::StateChanged(state));
        }
    }
}
