//! Expansion of chunk events into canonical start/content/end sequences.
//!
//! Servers may compress a streamed message or tool call into `*_CHUNK`
//! events that omit ids to mean "continue the current item". The assembler
//! rewrites those into explicit `TEXT_MESSAGE_START/CONTENT/END` and
//! `TOOL_CALL_START/ARGS/END` sequences so everything downstream only ever
//! sees the canonical form. All non-chunk events pass through unchanged.
//!
//! Two tracks (text and tool call) are tracked independently, with one
//! shared rule: a chunk that starts a new stream closes whatever stream the
//! assembler itself still has open, so synthesized sequences never nest or
//! overlap. Streams opened by explicit events belong to the server and are
//! never closed mid-stream on its behalf.

use weft_protocol_ag_ui::{Event, Role};

/// Error for a chunk event the assembler cannot place.
///
/// These are fatal to the run: an anonymous chunk with nothing open means
/// the client and server disagree about stream state, and guessing an id
/// would corrupt the message history.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkSequenceError {
    /// A text chunk tried to start a stream without a `messageId`.
    #[error("text chunk without messageId and no open message stream")]
    AnonymousTextChunk,
    /// A tool chunk tried to start a stream without the named field.
    #[error("tool chunk without {missing} and no open tool call stream")]
    AnonymousToolChunk { missing: &'static str },
}

/// One open streamed item on a track.
#[derive(Debug, Clone)]
struct Cursor {
    id: String,
    /// Accumulated deltas, kept for diagnostics.
    buffer: String,
    /// Whether this assembler opened the stream and owes it an end event.
    implicit: bool,
}

impl Cursor {
    fn implicit(id: String) -> Self {
        Self {
            id,
            buffer: String::new(),
            implicit: true,
        }
    }

    fn explicit(id: String) -> Self {
        Self {
            id,
            buffer: String::new(),
            implicit: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
enum Track {
    #[default]
    Idle,
    Open(Cursor),
}

impl Track {
    fn open_id(&self) -> Option<&str> {
        match self {
            Track::Open(cursor) => Some(&cursor.id),
            Track::Idle => None,
        }
    }

    fn is_implicit(&self) -> bool {
        matches!(self, Track::Open(cursor) if cursor.implicit)
    }

    fn append(&mut self, delta: &str) {
        if let Track::Open(cursor) = self {
            cursor.buffer.push_str(delta);
        }
    }
}

/// Per-run state machine turning chunk events into balanced sequences.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    text: Track,
    tool: Track,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event and get the events to emit downstream, in order.
    ///
    /// Chunk events are replaced by their expansion; every other event is
    /// passed through, preceded by any end events needed to keep the
    /// assembler's own streams balanced. On error no state changes and
    /// nothing is emitted.
    pub fn feed(&mut self, event: Event) -> Result<Vec<Event>, ChunkSequenceError> {
        match event {
            Event::TextMessageChunk {
                message_id,
                role,
                delta,
                ..
            } => self.feed_text_chunk(message_id, role, delta),
            Event::ToolCallChunk {
                tool_call_id,
                tool_call_name,
                parent_message_id,
                delta,
                ..
            } => self.feed_tool_chunk(tool_call_id, tool_call_name, parent_message_id, delta),
            other => Ok(self.feed_passthrough(other)),
        }
    }

    /// Close every stream still open, text before tool, and reset.
    ///
    /// Called when the upstream completes (or is cancelled) so that every
    /// opened sequence reaches downstream balanced.
    pub fn finish(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        if let Track::Open(cursor) = std::mem::take(&mut self.text) {
            out.push(Event::text_message_end(cursor.id));
        }
        if let Track::Open(cursor) = std::mem::take(&mut self.tool) {
            out.push(Event::tool_call_end(cursor.id));
        }
        out
    }

    fn feed_text_chunk(
        &mut self,
        message_id: Option<String>,
        role: Option<Role>,
        delta: Option<String>,
    ) -> Result<Vec<Event>, ChunkSequenceError> {
        let continuing = match (&self.text, &message_id) {
            (Track::Open(_), None) => true,
            (Track::Open(cursor), Some(id)) => cursor.id == *id,
            (Track::Idle, _) => false,
        };

        let mut out = Vec::new();
        if !continuing {
            // Validate the cold start before touching any state.
            let id = message_id.ok_or(ChunkSequenceError::AnonymousTextChunk)?;
            self.close_implicit(&mut out);
            out.push(Event::text_message_start(
                id.clone(),
                role.unwrap_or_default(),
            ));
            self.text = Track::Open(Cursor::implicit(id));
        }

        if let Some(delta) = delta.filter(|d| !d.is_empty()) {
            if let Track::Open(cursor) = &mut self.text {
                cursor.buffer.push_str(&delta);
                out.push(Event::text_message_content(cursor.id.clone(), delta));
            }
        }
        Ok(out)
    }

    fn feed_tool_chunk(
        &mut self,
        tool_call_id: Option<String>,
        tool_call_name: Option<String>,
        parent_message_id: Option<String>,
        delta: Option<String>,
    ) -> Result<Vec<Event>, ChunkSequenceError> {
        let continuing = match (&self.tool, &tool_call_id) {
            (Track::Open(_), None) => true,
            (Track::Open(cursor), Some(id)) => cursor.id == *id,
            (Track::Idle, _) => false,
        };

        let mut out = Vec::new();
        if !continuing {
            let id = tool_call_id.ok_or(ChunkSequenceError::AnonymousToolChunk {
                missing: "toolCallId",
            })?;
            let name = tool_call_name.ok_or(ChunkSequenceError::AnonymousToolChunk {
                missing: "toolCallName",
            })?;
            self.close_implicit(&mut out);
            out.push(Event::tool_call_start(id.clone(), name, parent_message_id));
            self.tool = Track::Open(Cursor::implicit(id));
        }

        if let Some(delta) = delta.filter(|d| !d.is_empty()) {
            if let Track::Open(cursor) = &mut self.tool {
                cursor.buffer.push_str(&delta);
                out.push(Event::tool_call_args(cursor.id.clone(), delta));
            }
        }
        Ok(out)
    }

    fn feed_passthrough(&mut self, event: Event) -> Vec<Event> {
        let mut out = Vec::new();
        match &event {
            Event::TextMessageStart { message_id, .. } => {
                if self.text.open_id() == Some(message_id) {
                    // The server re-announced a stream this assembler already
                    // opened; it now owns the matching end event.
                    if let Track::Open(cursor) = &mut self.text {
                        cursor.implicit = false;
                    }
                } else {
                    self.close_implicit(&mut out);
                    self.text = Track::Open(Cursor::explicit(message_id.clone()));
                }
            }
            Event::TextMessageContent {
                message_id, delta, ..
            } => {
                if self.text.open_id() == Some(message_id) {
                    self.text.append(delta);
                } else {
                    self.close_implicit(&mut out);
                }
            }
            Event::TextMessageEnd { message_id, .. } => {
                if self.text.open_id() == Some(message_id) {
                    self.text = Track::Idle;
                } else {
                    self.close_implicit(&mut out);
                }
            }
            Event::ToolCallStart { tool_call_id, .. } => {
                if self.tool.open_id() == Some(tool_call_id) {
                    if let Track::Open(cursor) = &mut self.tool {
                        cursor.implicit = false;
                    }
                } else {
                    self.close_implicit(&mut out);
                    self.tool = Track::Open(Cursor::explicit(tool_call_id.clone()));
                }
            }
            Event::ToolCallArgs {
                tool_call_id, delta, ..
            } => {
                if self.tool.open_id() == Some(tool_call_id) {
                    self.tool.append(delta);
                } else {
                    self.close_implicit(&mut out);
                }
            }
            Event::ToolCallEnd { tool_call_id, .. } => {
                if self.tool.open_id() == Some(tool_call_id) {
                    self.tool = Track::Idle;
                } else {
                    self.close_implicit(&mut out);
                }
            }
            // Anything else interrupts whatever chunk stream is open.
            _ => self.close_implicit(&mut out),
        }
        out.push(event);
        out
    }

    /// Close the chunk-opened stream, if any. At most one exists across the
    /// two tracks because opening one always closes the other.
    fn close_implicit(&mut self, out: &mut Vec<Event>) {
        if self.text.is_implicit() {
            if let Track::Open(cursor) = std::mem::take(&mut self.text) {
                out.push(Event::text_message_end(cursor.id));
            }
        }
        if self.tool.is_implicit() {
            if let Track::Open(cursor) = std::mem::take(&mut self.tool) {
                out.push(Event::tool_call_end(cursor.id));
            }
        }
    }
}
