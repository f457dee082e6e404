//! AG-UI client runtime: transports, stream decoding, chunk assembly, and
//! per-thread run lifecycle management.

#![allow(missing_docs)]

pub mod assembler;
pub mod client;
pub mod decode;
pub mod error;
pub mod subscriber;
pub mod sync;
pub mod thread;
pub mod transport;

pub use assembler::{ChunkAssembler, ChunkSequenceError};
pub use client::{AgentClient, RunCancellation, RunSummary};
pub use decode::{DecodeStats, EventStream, decode_frames};
pub use error::AgentError;
pub use subscriber::{Mutation, RunInfo, Subscriber};
pub use sync::{MessageAliases, PatchError, apply_delta, reconcile_messages};
pub use thread::{LifecycleError, RunOutcome, RunPhase, ThinkingBuffer, ThreadRuntime};
pub use transport::{
    ChannelTransport, FrameStream, HttpTransport, RawFrame, Transport, TransportError,
};

// The protocol surface, re-exported for convenience.
pub use weft_protocol_ag_ui::{
    Context, Event, InputError, Message, Role, RunAgentInput, Tool, ToolCall,
};
