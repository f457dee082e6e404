#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use weft_client::{
    AgentClient, AgentError, ChannelTransport, ChunkSequenceError, Event, Message, Mutation,
    RawFrame, Role, RunAgentInput, RunCancellation, RunPhase, Subscriber, ThreadRuntime,
    TransportError,
};

/// Collects the canonical event names a run delivers, post-assembly.
#[derive(Default)]
struct EventLog {
    names: Mutex<Vec<String>>,
}

impl EventLog {
    fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

#[async_trait]
impl Subscriber for EventLog {
    async fn on_event(&self, event: &Event, _: &[Message], _: &Value) -> Option<Mutation> {
        self.names.lock().unwrap().push(event.name().to_string());
        None
    }
}

fn send(
    sender: &tokio::sync::mpsc::UnboundedSender<Result<RawFrame, TransportError>>,
    event: &Event,
) {
    sender
        .send(Ok(RawFrame::from_event(event).unwrap()))
        .unwrap();
}

#[tokio::test]
async fn chunked_stream_expands_and_accumulates_one_message() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(
        &sender,
        &Event::text_message_chunk(Some("m1".into()), None, Some("He".into())),
    );
    send(
        &sender,
        &Event::text_message_chunk(Some("m1".into()), None, Some("llo".into())),
    );
    send(&sender, &Event::run_finished("t1", "r1", None));
    drop(sender);

    let log = Arc::new(EventLog::default());
    let mut thread = ThreadRuntime::new("t1").with_subscriber(log.clone());
    let client = AgentClient::new(transport);
    let summary = client
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap();

    assert_eq!(summary.thread_id, "t1");
    assert_eq!(summary.run_id, "r1");
    assert_eq!(summary.result, None);

    // The chunks were rewritten into the canonical sequence.
    assert_eq!(
        log.names(),
        vec![
            "RUN_STARTED",
            "TEXT_MESSAGE_START",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_END",
            "RUN_FINISHED",
        ]
    );

    assert_eq!(thread.phase(), RunPhase::Idle);
    assert_eq!(thread.messages().len(), 1);
    assert_eq!(thread.messages()[0].role(), Role::Assistant);
    assert_eq!(thread.messages()[0].content(), Some("Hello"));
}

#[tokio::test]
async fn tool_chunks_build_a_tool_call_on_the_assistant_message() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(
        &sender,
        &Event::text_message_chunk(Some("m1".into()), None, Some("checking".into())),
    );
    send(
        &sender,
        &Event::tool_call_chunk(
            Some("c1".into()),
            Some("search".into()),
            Some("m1".into()),
            Some("{\"q\":".into()),
        ),
    );
    send(
        &sender,
        &Event::tool_call_chunk(None, None, None, Some("\"rust\"}".into())),
    );
    send(&sender, &Event::run_finished("t1", "r1", None));
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let client = AgentClient::new(transport);
    client
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap();

    assert_eq!(thread.messages().len(), 1);
    let message = &thread.messages()[0];
    assert_eq!(message.content(), Some("checking"));
    assert_eq!(message.tool_calls().len(), 1);
    assert_eq!(message.tool_calls()[0].name, "search");
    assert_eq!(message.tool_calls()[0].arguments, "{\"q\":\"rust\"}");
}

#[tokio::test]
async fn run_result_payload_reaches_the_summary() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(
        &sender,
        &Event::run_finished("t1", "r1", Some(json!({ "tokens": 42 }))),
    );
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let summary = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap();
    assert_eq!(summary.result, Some(json!({ "tokens": 42 })));
}

#[tokio::test]
async fn server_run_error_surfaces_with_its_code() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(
        &sender,
        &Event::run_error("model overloaded", Some("OVERLOADED".into())),
    );
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();
    match err {
        AgentError::Run { message, code } => {
            assert_eq!(message, "model overloaded");
            assert_eq!(code.as_deref(), Some("OVERLOADED"));
        }
        other => panic!("expected run error, got {other}"),
    }
    assert_eq!(thread.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn malformed_frames_are_dropped_not_fatal() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    sender
        .send(Ok(RawFrame::new("TEXT_MESSAGE_CONTENT", "{broken")))
        .unwrap();
    send(&sender, &Event::run_finished("t1", "r1", None));
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let client = AgentClient::new(transport);
    client
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap();
    assert_eq!(client.dropped_frames(), 1);
}

#[tokio::test]
async fn anonymous_chunk_fails_the_run_but_not_the_thread() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(&sender, &Event::text_message_chunk(None, None, Some("hi".into())));
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Chunk(ChunkSequenceError::AnonymousTextChunk)
    ));
    assert_eq!(thread.phase(), RunPhase::Idle);

    // The same thread accepts a well-formed follow-up run.
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r2", None));
    send(&sender, &Event::run_finished("t1", "r2", None));
    drop(sender);
    AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r2"))
        .await
        .unwrap();
}

#[tokio::test]
async fn mid_stream_transport_error_fails_the_run() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    sender
        .send(Err(TransportError::Stream("connection reset".into())))
        .unwrap();
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Transport(TransportError::Stream(_))));
    // The synthesized terminal closed the run out.
    assert_eq!(thread.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn stream_ending_without_terminal_is_reported() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Transport(TransportError::Closed)
    ));
    assert_eq!(thread.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_the_transport_opens() {
    let (_sender, transport) = ChannelTransport::channel();
    let mut thread = ThreadRuntime::new("t1");
    let client = AgentClient::new(transport);

    let err = client
        .run(&mut thread, &RunAgentInput::new("", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Input(_)));

    // The channel was not consumed by the rejected call.
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(&sender, &Event::run_finished("t1", "r1", None));
    drop(sender);
    AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn seeded_input_messages_appear_in_the_final_view() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(
        &sender,
        &Event::text_message_chunk(Some("m2".into()), None, Some("hi!".into())),
    );
    send(&sender, &Event::run_finished("t1", "r1", None));
    drop(sender);

    let mut thread = ThreadRuntime::new("t1");
    let input = RunAgentInput::new("t1", "r1")
        .with_message(Message::user("hello there").with_id("m1"));
    AgentClient::new(transport)
        .run(&mut thread, &input)
        .await
        .unwrap();

    let contents: Vec<_> = thread
        .messages()
        .iter()
        .map(|m| m.content().unwrap_or(""))
        .collect();
    assert_eq!(contents, vec!["hello there", "hi!"]);
}

#[tokio::test]
async fn cancelled_before_start_nothing_is_processed() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    drop(sender);

    let cancellation = RunCancellation::new();
    cancellation.cancel();

    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run_with_cancellation(&mut thread, &RunAgentInput::new("t1", "r1"), cancellation)
        .await
        .unwrap_err();
    match err {
        AgentError::Run { message, code } => {
            assert_eq!(message, "run cancelled");
            assert_eq!(code.as_deref(), Some("CANCELLED"));
        }
        other => panic!("expected cancellation, got {other}"),
    }
    assert!(thread.messages().is_empty());
    assert_eq!(thread.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn cancellation_mid_run_closes_open_streams() {
    let (sender, transport) = ChannelTransport::channel();
    send(&sender, &Event::run_started("t1", "r1", None));
    send(
        &sender,
        &Event::text_message_chunk(Some("m1".into()), None, Some("He".into())),
    );

    let cancellation = RunCancellation::new();
    let handle = cancellation.clone();

    let mut thread = ThreadRuntime::new("t1");
    let log = Arc::new(EventLog::default());
    thread.subscribe(log.clone());

    let client = AgentClient::new(transport);
    let input = RunAgentInput::new("t1", "r1");
    let err = {
        let run = client.run_with_cancellation(&mut thread, &input, cancellation);
        tokio::pin!(run);

        // One poll drains the two buffered frames and parks the driver on
        // the empty channel. Cancel, then wake it with one more frame so
        // the flag is observed.
        assert!(futures::poll!(run.as_mut()).is_pending());
        handle.cancel();
        send(&sender, &Event::custom("noop", json!(null)));
        run.await.unwrap_err()
    };
    assert!(matches!(err, AgentError::Run { code: Some(ref c), .. } if c == "CANCELLED"));

    // The open text stream was closed on the way out, and the partial
    // content survived.
    assert!(log.names().contains(&"TEXT_MESSAGE_END".to_string()));
    assert_eq!(thread.messages()[0].content(), Some("He"));
    assert_eq!(thread.phase(), RunPhase::Idle);
}
