//! SSE frame codec for AG-UI events.
//!
//! A frame on the wire is `event: <NAME>` followed by `data: <json>`. The
//! frame name is the authoritative discriminator: it overrides any `type`
//! field inside the payload. Unknown names are preserved as [`Event::Raw`]
//! so forward-compatible servers do not break older clients.

use crate::events::{Event, ValidationError};
use serde_json::Value;

/// Error decoding a single wire frame into an [`Event`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload could not be parsed into the event named by the frame.
    #[error("malformed {name} payload: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    /// The event decoded but violates a field invariant.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Whether `name` is one of the event types this crate models.
pub fn is_known(name: &str) -> bool {
    matches!(
        name,
        "RUN_STARTED"
            | "RUN_FINISHED"
            | "RUN_ERROR"
            | "STEP_STARTED"
            | "STEP_FINISHED"
            | "TEXT_MESSAGE_START"
            | "TEXT_MESSAGE_CONTENT"
            | "TEXT_MESSAGE_END"
            | "TEXT_MESSAGE_CHUNK"
            | "THINKING_START"
            | "THINKING_END"
            | "THINKING_TEXT_MESSAGE_START"
            | "THINKING_TEXT_MESSAGE_CONTENT"
            | "THINKING_TEXT_MESSAGE_END"
            | "TOOL_CALL_START"
            | "TOOL_CALL_ARGS"
            | "TOOL_CALL_END"
            | "TOOL_CALL_RESULT"
            | "TOOL_CALL_CHUNK"
            | "STATE_SNAPSHOT"
            | "STATE_DELTA"
            | "MESSAGES_SNAPSHOT"
            | "RAW"
            | "CUSTOM"
    )
}

/// Decode one wire frame into an event.
///
/// Known names deserialize into their typed variant and are validated.
/// Unknown names never fail: the payload is wrapped in [`Event::Raw`] with
/// the frame name as its source.
pub fn decode_frame(name: &str, data: &str) -> Result<Event, DecodeError> {
    if !is_known(name) {
        let payload =
            serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string()));
        return Ok(Event::raw(payload, Some(name.to_string())));
    }

    let mut payload: serde_json::Map<String, Value> =
        serde_json::from_str(data).map_err(|source| DecodeError::Malformed {
            name: name.to_string(),
            source,
        })?;
    // The frame name wins over any "type" the payload carries.
    payload.insert("type".to_string(), Value::String(name.to_string()));

    let event: Event =
        serde_json::from_value(Value::Object(payload)).map_err(|source| DecodeError::Malformed {
            name: name.to_string(),
            source,
        })?;
    event.validate()?;
    Ok(event)
}

/// Encode an event as a complete SSE frame, terminator included.
pub fn encode_frame(event: &Event) -> Result<String, serde_json::Error> {
    let data = serde_json::to_string(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", event.name(), data))
}
