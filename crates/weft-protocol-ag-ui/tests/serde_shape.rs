#![allow(missing_docs)]

use serde_json::{Value, json};
use weft_protocol_ag_ui::{Event, Message, Role, RunAgentInput, Tool, ToolCall};

#[test]
fn run_started_serializes_camel_case_identity() {
    let value = serde_json::to_value(Event::run_started("t1", "r1", None)).unwrap();
    assert_eq!(
        value,
        json!({ "type": "RUN_STARTED", "threadId": "t1", "runId": "r1" })
    );

    let nested = serde_json::to_value(Event::run_started("t1", "r2", Some("r1".into()))).unwrap();
    assert_eq!(nested["parentRunId"], json!("r1"));
}

#[test]
fn text_message_start_defaults_role_to_assistant() {
    let event: Event =
        serde_json::from_value(json!({ "type": "TEXT_MESSAGE_START", "messageId": "m1" })).unwrap();
    assert!(matches!(
        event,
        Event::TextMessageStart { role: Role::Assistant, .. }
    ));
}

#[test]
fn messages_are_tagged_by_role() {
    let user = serde_json::to_value(Message::user("hi").with_id("m1")).unwrap();
    assert_eq!(user, json!({ "role": "user", "id": "m1", "content": "hi" }));

    let mut assistant = Message::assistant("done").with_id("m2");
    assistant.push_tool_call(ToolCall::new("c1", "search", "{\"q\":\"rust\"}"));
    let assistant = serde_json::to_value(assistant).unwrap();
    assert_eq!(assistant["role"], json!("assistant"));
    assert_eq!(assistant["toolCalls"][0]["id"], json!("c1"));

    let tool = serde_json::to_value(Message::tool("42", "c1").with_id("m3")).unwrap();
    assert_eq!(
        tool,
        json!({ "role": "tool", "id": "m3", "content": "42", "toolCallId": "c1" })
    );
}

#[test]
fn assistant_without_content_or_tool_calls_decodes() {
    let message: Message =
        serde_json::from_value(json!({ "role": "assistant", "id": "m1" })).unwrap();
    assert_eq!(message.content(), None);
    assert!(message.tool_calls().is_empty());

    // And serializing it back omits the empty fields.
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value, json!({ "role": "assistant", "id": "m1" }));
}

#[test]
fn messages_snapshot_decodes_typed_history() {
    let event: Event = serde_json::from_value(json!({
        "type": "MESSAGES_SNAPSHOT",
        "messages": [
            { "role": "user", "id": "m1", "content": "hello" },
            { "role": "assistant", "id": "m2", "content": "hi there" }
        ]
    }))
    .unwrap();

    let Event::MessagesSnapshot { messages, .. } = event else {
        panic!("expected MessagesSnapshot");
    };
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[1].content(), Some("hi there"));
}

#[test]
fn run_input_serializes_wire_shape() {
    let input = RunAgentInput::new("t1", "r1")
        .with_message(Message::user("hello").with_id("m1"))
        .with_tool(Tool::new("search", "web search").with_parameters(json!({"type": "object"})));

    let value = serde_json::to_value(&input).unwrap();
    assert_eq!(value["threadId"], json!("t1"));
    assert_eq!(value["runId"], json!("r1"));
    assert_eq!(value["messages"][0]["id"], json!("m1"));
    assert_eq!(value["tools"][0]["name"], json!("search"));
    assert_eq!(value["context"], json!([]));
    assert!(value.get("state").is_none());
    assert!(value.get("forwardedProps").is_none());
}

#[test]
fn run_input_deserializes_forwarded_props_aliases() {
    let camel: RunAgentInput = serde_json::from_value(json!({
        "threadId": "t1",
        "runId": "r1",
        "forwardedProps": { "foo": 1 }
    }))
    .unwrap();
    assert_eq!(camel.forwarded_props, Some(json!({ "foo": 1 })));

    let snake: RunAgentInput = serde_json::from_value(json!({
        "threadId": "t1",
        "runId": "r1",
        "forwarded_props": { "bar": 2 }
    }))
    .unwrap();
    assert_eq!(snake.forwarded_props, Some(json!({ "bar": 2 })));
}

#[test]
fn input_validation_rejects_blank_identity() {
    let missing_thread = RunAgentInput::new("", "r1");
    let err = missing_thread.validate().unwrap_err();
    assert_eq!(err.code, "INVALID_FIELD");
    assert_eq!(err.to_string(), "[INVALID_FIELD] field 'threadId' is missing or empty");

    assert!(RunAgentInput::new("t1", "").validate().is_err());
    assert!(RunAgentInput::fresh("t1").validate().is_ok());
}

#[test]
fn state_delta_carries_patch_operations_verbatim() {
    let ops = vec![json!({ "op": "replace", "path": "/count", "value": 2 })];
    let value = serde_json::to_value(Event::state_delta(ops.clone())).unwrap();
    assert_eq!(value["delta"], Value::Array(ops));
}
