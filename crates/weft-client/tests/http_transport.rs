#![allow(missing_docs)]

use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;
use weft_client::{
    AgentClient, AgentError, HttpTransport, RunAgentInput, RunPhase, ThreadRuntime, Transport,
    TransportError,
};
use weft_protocol_ag_ui::{Event, Role, encode_frame};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(events: &[Event]) -> String {
    events
        .iter()
        .map(|e| encode_frame(e).unwrap())
        .collect::<Vec<_>>()
        .join("")
}

#[tokio::test]
async fn streaming_run_round_trips_over_http() {
    let server = MockServer::start().await;

    let mut body = String::from(": tick\n\n");
    body.push_str(&sse_body(&[
        Event::run_started("t1", "r1", None),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_content("m1", "Hello from the wire"),
        Event::text_message_end("m1"),
    ]));
    // A bare keep-alive frame between real events.
    body.push_str("data:\n\n");
    body.push_str(&sse_body(&[Event::run_finished("t1", "r1", None)]));

    Mock::given(method("POST"))
        .and(path("/awp"))
        .and(header("accept", "text/event-stream"))
        .and(header("x-api-key", "secret"))
        .and(body_partial_json(json!({ "threadId": "t1", "runId": "r1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(body, "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(format!("{}/awp", server.uri())).with_header(
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_static("secret"),
    );
    let mut thread = ThreadRuntime::new("t1");
    let summary = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap();

    assert_eq!(summary.run_id, "r1");
    assert_eq!(thread.phase(), RunPhase::Idle);
    assert_eq!(thread.messages().len(), 1);
    assert_eq!(thread.messages()[0].content(), Some("Hello from the wire"));
}

#[tokio::test]
async fn open_failure_falls_back_to_blocking_fetch_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "type": "RUN_STARTED", "threadId": "t1", "runId": "r1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();

    // The fallback frame made it into the pipeline; a one-event response
    // cannot reach a terminal state, and that is what surfaces.
    assert!(matches!(err, AgentError::Transport(TransportError::Closed)));
    assert_eq!(thread.phase(), RunPhase::Idle);
    assert!(thread.run().is_none());
}

#[tokio::test]
async fn fallback_failure_surfaces_the_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Transport(TransportError::Status(500))
    ));
    // Nothing reached the thread.
    assert_eq!(thread.phase(), RunPhase::Idle);
    assert!(thread.messages().is_empty());
}

#[tokio::test]
async fn fallback_body_without_an_event_type_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let err = transport
        .fetch(&RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Stream(_)));
}

#[tokio::test]
async fn mid_stream_disconnect_fails_the_run() {
    let server = MockServer::start().await;

    // A body that opens a run and then stops mid-stream.
    let body = sse_body(&[
        Event::run_started("t1", "r1", None),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_content("m1", "partial"),
    ]);
    Mock::given(method("POST"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let mut thread = ThreadRuntime::new("t1");
    let err = AgentClient::new(transport)
        .run(&mut thread, &RunAgentInput::new("t1", "r1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AgentError::Transport(TransportError::Closed)
    ));
    // The partial message is kept; the run is closed out as failed.
    assert_eq!(thread.messages()[0].content(), Some("partial"));
    assert_eq!(thread.phase(), RunPhase::Idle);
}
