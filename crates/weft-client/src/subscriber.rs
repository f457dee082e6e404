//! Subscriber pipeline: ordered observers over a thread's event stream.

use async_trait::async_trait;
use serde_json::Value;
use weft_protocol_ag_ui::{Event, Message};

use crate::error::AgentError;

/// Identity of the run a callback refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub thread_id: String,
    pub run_id: String,
    pub parent_run_id: Option<String>,
}

/// Replacement values returned by a subscriber.
///
/// Fields left `None` keep the current value. `stop_propagation` ends the
/// chain for this event: later subscribers do not run and the built-in
/// handling is skipped.
#[derive(Debug, Clone, Default)]
pub struct Mutation {
    pub messages: Option<Vec<Message>>,
    pub state: Option<Value>,
    pub stop_propagation: bool,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_stop_propagation(mut self) -> Self {
        self.stop_propagation = true;
        self
    }
}

/// Observer over a thread's event pipeline.
///
/// Subscribers run sequentially in registration order, exactly once per
/// event. `on_event` may return a [`Mutation`] to rewrite the messages or
/// state that the next subscriber and the built-in handler see. Every
/// method defaults to a no-op so implementations pick only what they need.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &str {
        "subscriber"
    }

    /// A run was accepted and is about to process events.
    async fn on_run_initialized(&self, _run: &RunInfo, _messages: &[Message], _state: &Value) {}

    /// Inspect one event, optionally overriding messages or state.
    async fn on_event(
        &self,
        _event: &Event,
        _messages: &[Message],
        _state: &Value,
    ) -> Option<Mutation> {
        None
    }

    /// The visible message list changed.
    async fn on_messages_changed(&self, _messages: &[Message]) {}

    /// The visible state document changed.
    async fn on_state_changed(&self, _state: &Value) {}

    /// The run failed; `error` is about to surface to the consumer.
    async fn on_run_failed(&self, _run: &RunInfo, _error: &AgentError) {}

    /// The run reached a terminal state and the thread is idle again.
    async fn on_run_finalized(&self, _run: &RunInfo, _messages: &[Message], _state: &Value) {}
}
