//! AG-UI protocol event model, message types, and wire codec.

#![allow(missing_docs)]

pub mod events;
pub mod types;
pub mod wire;

// Re-export the protocol surface at the crate root.
pub use events::{BaseEvent, Event, ValidationError};
pub use types::{
    Context, InputError, Message, Role, RunAgentInput, Tool, ToolCall, gen_message_id,
};
pub use wire::{DecodeError, decode_frame, encode_frame, is_known};
