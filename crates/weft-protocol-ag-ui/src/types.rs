use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role of a message author in the AG-UI protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    System,
    #[default]
    Assistant,
    User,
    Tool,
}

/// A single tool invocation recorded on an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ToolCall {
    /// Identifier shared with the TOOL_CALL_* events that streamed it.
    pub id: String,
    /// Name of the tool being invoked.
    pub name: String,
    /// Arguments as a raw string, typically JSON accumulated from deltas.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A conversation message, discriminated by `role` on the wire.
///
/// Each role carries a different shape: assistant messages may have tool
/// calls and optional content, tool messages reference the call they answer,
/// and the remaining roles are plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    Developer {
        id: String,
        content: String,
    },
    System {
        id: String,
        content: String,
    },
    Assistant {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(rename = "toolCalls", default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    User {
        id: String,
        content: String,
    },
    Tool {
        id: String,
        content: String,
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
    },
}

impl Message {
    /// Create a user message with a generated id.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            id: gen_message_id(),
            content: content.into(),
        }
    }

    /// Create an assistant message with a generated id.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            id: gen_message_id(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create a system message with a generated id.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            id: gen_message_id(),
            content: content.into(),
        }
    }

    /// Create a developer message with a generated id.
    pub fn developer(content: impl Into<String>) -> Self {
        Self::Developer {
            id: gen_message_id(),
            content: content.into(),
        }
    }

    /// Create a tool result message with a generated id.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::Tool {
            id: gen_message_id(),
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Replace the message id.
    pub fn with_id(mut self, new_id: impl Into<String>) -> Self {
        match &mut self {
            Self::Developer { id, .. }
            | Self::System { id, .. }
            | Self::Assistant { id, .. }
            | Self::User { id, .. }
            | Self::Tool { id, .. } => *id = new_id.into(),
        }
        self
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Developer { id, .. }
            | Self::System { id, .. }
            | Self::Assistant { id, .. }
            | Self::User { id, .. }
            | Self::Tool { id, .. } => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Developer { .. } => Role::Developer,
            Self::System { .. } => Role::System,
            Self::Assistant { .. } => Role::Assistant,
            Self::User { .. } => Role::User,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if present. Assistant messages may have none.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Developer { content, .. }
            | Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Tool { content, .. } => Some(content),
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls recorded on this message. Empty for non-assistant roles.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Id of the tool call a tool message answers.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Append streamed text to the message content.
    pub fn append_content(&mut self, delta: &str) {
        match self {
            Self::Developer { content, .. }
            | Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Tool { content, .. } => content.push_str(delta),
            Self::Assistant { content, .. } => {
                content.get_or_insert_with(String::new).push_str(delta);
            }
        }
    }

    /// Record a completed tool call. Only assistant messages carry tool
    /// calls; other roles ignore the push.
    pub fn push_tool_call(&mut self, call: ToolCall) {
        if let Self::Assistant { tool_calls, .. } = self {
            tool_calls.push(call);
        }
    }
}

/// Contextual information passed to the agent alongside the run input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Context {
    pub description: String,
    pub value: String,
}

impl Context {
    pub fn new(description: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            value: value.into(),
        }
    }
}

/// A tool the frontend makes available to the agent for this run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Input payload for starting an agent run.
///
/// This is the request body a client POSTs to an AG-UI endpoint. Identity
/// fields are required; everything else defaults to empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    pub thread_id: String,
    pub run_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub context: Vec<Context>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(alias = "forwarded_props", skip_serializing_if = "Option::is_none")]
    pub forwarded_props: Option<Value>,
}

impl RunAgentInput {
    /// Create an input with explicit thread and run identifiers.
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// Create an input for a fresh run on an existing thread.
    pub fn fresh(thread_id: impl Into<String>) -> Self {
        Self::new(thread_id, format!("run_{}", Uuid::new_v4().simple()))
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context.push(context);
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_forwarded_props(mut self, props: Value) -> Self {
        self.forwarded_props = Some(props);
        self
    }

    /// Validate required fields before sending the input anywhere.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.thread_id.is_empty() {
            return Err(InputError::invalid_field("threadId"));
        }
        if self.run_id.is_empty() {
            return Err(InputError::invalid_field("runId"));
        }
        for tool in &self.tools {
            if tool.name.is_empty() {
                return Err(InputError::invalid_field("tools[].name"));
            }
        }
        Ok(())
    }
}

/// Error describing an invalid run input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    pub code: String,
    pub message: String,
}

impl InputError {
    pub fn invalid_field(field: &str) -> Self {
        Self {
            code: "INVALID_FIELD".to_string(),
            message: format!("field '{field}' is missing or empty"),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: "VALIDATION".to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for InputError {}

impl From<String> for InputError {
    fn from(message: String) -> Self {
        Self::validation(message)
    }
}

/// Generate a message id in the `msg_` namespace.
pub fn gen_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}
