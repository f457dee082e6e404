//! Run lifecycle management and the canonical thread view.
//!
//! A [`ThreadRuntime`] owns everything one conversation accumulates: the
//! message history, the state document, per-run transients, and the
//! subscriber chain. It enforces the run state machine (`Idle -> Running ->
//! {Finished, Errored} -> Idle`), applies the protocol's default handling
//! for each event, and keeps messages and state monotonic across runs.
//!
//! One instance per thread, owned by whoever composes it. There is no
//! process-wide registry of threads.

use std::collections::HashMap;
use std::sync::Arc;

use jsonptr::Pointer;
use serde_json::Value;
use tracing::{debug, warn};
use weft_protocol_ag_ui::{Event, Message, Role, ToolCall, gen_message_id};

use crate::error::AgentError;
use crate::subscriber::{RunInfo, Subscriber};
use crate::sync::{MessageAliases, apply_delta, reconcile_messages};

/// Violation of the run state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// RUN_STARTED arrived while another run is active on the thread.
    #[error("RUN_STARTED while run {run_id} is active")]
    RunAlreadyActive { run_id: String },
    /// A non-lifecycle event arrived with no run to attach it to.
    #[error("{event} without an active run")]
    NoActiveRun { event: &'static str },
}

/// Where the thread is in its run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    /// No run active; waiting for RUN_STARTED.
    #[default]
    Idle,
    /// A run is streaming events.
    Running,
    /// The active run saw its terminal RUN_FINISHED.
    Finished,
    /// The active run failed. Further events are rejected until a terminal
    /// event closes it out.
    Errored,
}

/// Terminal result of the most recent run, consumed by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Finished { result: Option<Value> },
    Failed { message: String, code: Option<String> },
}

/// Reasoning text streamed for the current run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThinkingBuffer {
    pub title: Option<String>,
    pub text: String,
}

/// One in-flight tool call, keyed by its id in [`RunTransients`].
#[derive(Debug)]
struct ToolBuffer {
    name: String,
    parent_message_id: Option<String>,
    arguments: String,
}

/// Per-run working structures, dropped whenever the thread returns to idle.
#[derive(Debug, Default)]
struct RunTransients {
    tools: HashMap<String, ToolBuffer>,
    steps: Vec<String>,
    thinking: Option<ThinkingBuffer>,
}

/// What a processed event changed in the visible view.
#[derive(Debug, Clone, Copy, Default)]
struct ViewChanges {
    messages: bool,
    state: bool,
}

struct ChainOutcome {
    changes: ViewChanges,
    stopped: bool,
}

/// Canonical state of one conversation thread across its runs.
pub struct ThreadRuntime {
    thread_id: String,
    phase: RunPhase,
    run: Option<RunInfo>,
    messages: Vec<Message>,
    state: Value,
    transients: RunTransients,
    subscribers: Vec<Arc<dyn Subscriber>>,
    aliases: MessageAliases,
    outcome: Option<RunOutcome>,
}

impl ThreadRuntime {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            phase: RunPhase::default(),
            run: None,
            messages: Vec::new(),
            state: Value::Null,
            transients: RunTransients::default(),
            subscribers: Vec::new(),
            aliases: MessageAliases::default(),
            outcome: None,
        }
    }

    /// Register a subscriber, builder style.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Register a subscriber at the end of the chain.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Identity of the run currently holding the thread, if any.
    pub fn run(&self) -> Option<&RunInfo> {
        self.run.as_ref()
    }

    /// The accumulated message history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The accumulated state document. `Null` until a snapshot or delta
    /// establishes one.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Resolve a JSON Pointer (RFC 6901) into the state document.
    ///
    /// Returns `None` for an invalid pointer or a path the state does not
    /// contain.
    pub fn state_at(&self, pointer: &str) -> Option<&Value> {
        let pointer = Pointer::parse(pointer).ok()?;
        pointer.resolve(&self.state).ok()
    }

    /// Steps currently in flight, in start order.
    pub fn active_steps(&self) -> &[String] {
        &self.transients.steps
    }

    /// Reasoning streamed for the current run, if any.
    pub fn thinking(&self) -> Option<&ThinkingBuffer> {
        self.transients.thinking.as_ref()
    }

    /// Take the terminal outcome of the last run, leaving `None`.
    pub fn take_outcome(&mut self) -> Option<RunOutcome> {
        self.outcome.take()
    }

    /// Declare `alias` to mean the message with id `canonical` in every
    /// subsequent event and snapshot.
    pub fn alias_message_id(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias, canonical);
    }

    /// Merge already-known history into the thread, replacing by id.
    ///
    /// Called with the run input's messages before the stream starts so the
    /// local view includes what the client itself sent.
    pub fn seed_messages(&mut self, incoming: &[Message]) {
        for message in incoming {
            match self.find_message(message.id()) {
                Some(pos) => self.messages[pos] = message.clone(),
                None => self.messages.push(message.clone()),
            }
        }
    }

    /// Process one event through the subscriber chain and the default
    /// handling, advancing the lifecycle state machine.
    ///
    /// Lifecycle violations, patch failures and the like poison the current
    /// run: the error is reported once, and later events are quietly
    /// rejected until a terminal event returns the thread to idle.
    pub async fn process(&mut self, event: Event) -> Result<(), AgentError> {
        match self.phase {
            RunPhase::Idle => self.process_idle(event).await,
            RunPhase::Running => self.process_running(event).await,
            RunPhase::Finished | RunPhase::Errored => self.process_poisoned(event).await,
        }
    }

    async fn process_idle(&mut self, event: Event) -> Result<(), AgentError> {
        match &event {
            Event::RunStarted {
                thread_id,
                run_id,
                parent_run_id,
                ..
            } => {
                let run = RunInfo {
                    thread_id: thread_id.clone(),
                    run_id: run_id.clone(),
                    parent_run_id: parent_run_id.clone(),
                };
                if run.thread_id != self.thread_id {
                    warn!(
                        thread = %self.thread_id,
                        event_thread = %run.thread_id,
                        "run started with a different thread id"
                    );
                }
                self.outcome = None;
                self.phase = RunPhase::Running;
                self.run = Some(run.clone());
                for sub in &self.subscribers {
                    sub.on_run_initialized(&run, &self.messages, &self.state)
                        .await;
                }
                let chain = self.run_chain(&event).await;
                self.notify_changes(chain.changes).await;
                Ok(())
            }
            _ => Err(LifecycleError::NoActiveRun {
                event: event.name(),
            }
            .into()),
        }
    }

    async fn process_running(&mut self, event: Event) -> Result<(), AgentError> {
        match &event {
            Event::RunStarted { .. } => {
                let run_id = self
                    .run
                    .as_ref()
                    .map(|run| run.run_id.clone())
                    .unwrap_or_default();
                let err = AgentError::Lifecycle(LifecycleError::RunAlreadyActive { run_id });
                Err(self.fail_run(err).await)
            }
            Event::RunFinished { result, .. } => {
                let result = result.clone();
                let chain = self.run_chain(&event).await;
                self.notify_changes(chain.changes).await;
                self.outcome = Some(RunOutcome::Finished { result });
                self.phase = RunPhase::Finished;
                self.finalize().await;
                Ok(())
            }
            Event::RunError { message, code, .. } => {
                let (message, code) = (message.clone(), code.clone());
                let chain = self.run_chain(&event).await;
                self.notify_changes(chain.changes).await;
                let err = AgentError::Run {
                    message: message.clone(),
                    code: code.clone(),
                };
                if let Some(run) = self.run.clone() {
                    for sub in &self.subscribers {
                        sub.on_run_failed(&run, &err).await;
                    }
                }
                self.outcome = Some(RunOutcome::Failed { message, code });
                self.phase = RunPhase::Errored;
                self.finalize().await;
                Ok(())
            }
            _ => {
                let chain = self.run_chain(&event).await;
                let mut changes = chain.changes;
                if !chain.stopped {
                    match self.apply_default(&event).await {
                        Ok(applied) => {
                            changes.messages |= applied.messages;
                            changes.state |= applied.state;
                        }
                        Err(err) => return Err(self.fail_run(err).await),
                    }
                }
                self.notify_changes(changes).await;
                Ok(())
            }
        }
    }

    /// The run already failed; swallow everything except the terminal event
    /// that lets the thread go idle again.
    async fn process_poisoned(&mut self, event: Event) -> Result<(), AgentError> {
        match &event {
            Event::RunFinished { .. } | Event::RunError { .. } => {
                // The recorded failure stays the run's outcome.
                self.finalize().await;
                Ok(())
            }
            _ => {
                debug!(event = event.name(), "event rejected after run failure");
                Ok(())
            }
        }
    }

    /// Report a fatal run error once and poison the run.
    async fn fail_run(&mut self, error: AgentError) -> AgentError {
        if let Some(run) = self.run.clone() {
            for sub in &self.subscribers {
                sub.on_run_failed(&run, &error).await;
            }
        }
        self.outcome = Some(RunOutcome::Failed {
            message: error.to_string(),
            code: None,
        });
        self.phase = RunPhase::Errored;
        error
    }

    /// Close out the active run and return the thread to idle.
    async fn finalize(&mut self) {
        if let Some(run) = self.run.take() {
            for sub in &self.subscribers {
                sub.on_run_finalized(&run, &self.messages, &self.state).await;
            }
        }
        self.transients = RunTransients::default();
        self.phase = RunPhase::Idle;
    }

    /// Run the subscriber chain for one event, committing any overrides.
    async fn run_chain(&mut self, event: &Event) -> ChainOutcome {
        let mut messages_override: Option<Vec<Message>> = None;
        let mut state_override: Option<Value> = None;
        let mut stopped = false;

        for sub in &self.subscribers {
            let messages = messages_override.as_deref().unwrap_or(&self.messages);
            let state = state_override.as_ref().unwrap_or(&self.state);
            let Some(mutation) = sub.on_event(event, messages, state).await else {
                continue;
            };
            if let Some(messages) = mutation.messages {
                messages_override = Some(messages);
            }
            if let Some(state) = mutation.state {
                state_override = Some(state);
            }
            if mutation.stop_propagation {
                debug!(subscriber = sub.id(), event = event.name(), "propagation stopped");
                stopped = true;
                break;
            }
        }

        let changes = ViewChanges {
            messages: messages_override.is_some(),
            state: state_override.is_some(),
        };
        if let Some(messages) = messages_override {
            self.messages = messages;
        }
        if let Some(state) = state_override {
            self.state = state;
        }
        ChainOutcome { changes, stopped }
    }

    async fn notify_changes(&self, changes: ViewChanges) {
        if changes.messages {
            for sub in &self.subscribers {
                sub.on_messages_changed(&self.messages).await;
            }
        }
        if changes.state {
            for sub in &self.subscribers {
                sub.on_state_changed(&self.state).await;
            }
        }
    }

    /// The protocol's built-in handling for non-lifecycle events.
    async fn apply_default(&mut self, event: &Event) -> Result<ViewChanges, AgentError> {
        let mut changes = ViewChanges::default();
        match event {
            Event::TextMessageStart {
                message_id, role, ..
            } => {
                if self.find_message(message_id).is_none() {
                    let id = self.aliases.resolve(message_id).to_string();
                    self.messages.push(new_message(*role, id));
                    changes.messages = true;
                }
            }
            Event::TextMessageContent {
                message_id, delta, ..
            } => {
                match self.find_message(message_id) {
                    Some(pos) => self.messages[pos].append_content(delta),
                    None => {
                        // Content for an unannounced message still renders.
                        let id = self.aliases.resolve(message_id).to_string();
                        self.messages.push(Message::Assistant {
                            id,
                            content: Some(delta.clone()),
                            tool_calls: Vec::new(),
                        });
                    }
                }
                changes.messages = true;
            }
            Event::TextMessageEnd { .. } => {}
            Event::ToolCallStart {
                tool_call_id,
                tool_call_name,
                parent_message_id,
                ..
            } => {
                self.transients.tools.insert(
                    tool_call_id.clone(),
                    ToolBuffer {
                        name: tool_call_name.clone(),
                        parent_message_id: parent_message_id.clone(),
                        arguments: String::new(),
                    },
                );
            }
            Event::ToolCallArgs {
                tool_call_id,
                delta,
                ..
            } => match self.transients.tools.get_mut(tool_call_id) {
                Some(buffer) => buffer.arguments.push_str(delta),
                None => debug!(tool_call = %tool_call_id, "args for unknown tool call"),
            },
            Event::ToolCallEnd { tool_call_id, .. } => {
                if self.close_tool_call(tool_call_id) {
                    changes.messages = true;
                }
            }
            Event::ToolCallResult {
                message_id,
                tool_call_id,
                content,
                ..
            } => {
                let message = Message::Tool {
                    id: self.aliases.resolve(message_id).to_string(),
                    content: content.clone(),
                    tool_call_id: tool_call_id.clone(),
                };
                match self.find_message(message_id) {
                    Some(pos) => self.messages[pos] = message,
                    None => self.messages.push(message),
                }
                changes.messages = true;
            }
            Event::StateSnapshot { snapshot, .. } => {
                self.state = snapshot.clone();
                changes.state = true;
            }
            Event::StateDelta { delta, .. } => {
                self.state = apply_delta(&self.state, delta)?;
                changes.state = true;
            }
            Event::MessagesSnapshot { messages, .. } => {
                self.messages = reconcile_messages(messages.clone(), &self.aliases);
                changes.messages = true;
            }
            Event::StepStarted { step_name, .. } => {
                self.transients.steps.push(step_name.clone());
            }
            Event::StepFinished { step_name, .. } => {
                match self.transients.steps.iter().position(|s| s == step_name) {
                    Some(pos) => {
                        self.transients.steps.remove(pos);
                    }
                    None => debug!(step = %step_name, "finish for unknown step"),
                }
            }
            Event::ThinkingStart { title, .. } => {
                self.transients.thinking = Some(ThinkingBuffer {
                    title: title.clone(),
                    text: String::new(),
                });
            }
            Event::ThinkingTextMessageContent { delta, .. } => {
                self.transients
                    .thinking
                    .get_or_insert_with(ThinkingBuffer::default)
                    .text
                    .push_str(delta);
            }
            Event::ThinkingEnd { .. }
            | Event::ThinkingTextMessageStart { .. }
            | Event::ThinkingTextMessageEnd { .. } => {}
            // Raw and custom events carry no default semantics; chunk events
            // are expanded before they reach the runtime.
            _ => {}
        }
        Ok(changes)
    }

    /// Turn a finished tool buffer into a `ToolCall` on its parent message.
    /// Returns whether the message list changed.
    fn close_tool_call(&mut self, tool_call_id: &str) -> bool {
        let Some(buffer) = self.transients.tools.remove(tool_call_id) else {
            debug!(tool_call = %tool_call_id, "end for unknown tool call");
            return false;
        };
        let call = ToolCall::new(tool_call_id, buffer.name, buffer.arguments);
        match buffer.parent_message_id {
            Some(parent) => match self.find_message(&parent) {
                Some(pos) => self.messages[pos].push_tool_call(call),
                None => {
                    let id = self.aliases.resolve(&parent).to_string();
                    self.messages.push(Message::Assistant {
                        id,
                        content: None,
                        tool_calls: vec![call],
                    });
                }
            },
            None => {
                let last_assistant = self
                    .messages
                    .iter()
                    .rposition(|m| matches!(m, Message::Assistant { .. }));
                match last_assistant {
                    Some(pos) => self.messages[pos].push_tool_call(call),
                    None => self.messages.push(Message::Assistant {
                        id: gen_message_id(),
                        content: None,
                        tool_calls: vec![call],
                    }),
                }
            }
        }
        true
    }

    /// Index of the message `id` names, resolved through the alias table.
    fn find_message(&self, id: &str) -> Option<usize> {
        let target = self.aliases.resolve(id);
        self.messages
            .iter()
            .position(|m| self.aliases.resolve(m.id()) == target)
    }
}

/// Fresh, empty message for a streamed text start. Tool is not a streaming
/// role; it falls back to assistant.
fn new_message(role: Role, id: String) -> Message {
    match role {
        Role::User => Message::User {
            id,
            content: String::new(),
        },
        Role::System => Message::System {
            id,
            content: String::new(),
        },
        Role::Developer => Message::Developer {
            id,
            content: String::new(),
        },
        Role::Assistant | Role::Tool => Message::Assistant {
            id,
            content: None,
            tool_calls: Vec::new(),
        },
    }
}
