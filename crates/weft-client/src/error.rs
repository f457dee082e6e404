use crate::assembler::ChunkSequenceError;
use crate::sync::PatchError;
use crate::thread::LifecycleError;
use crate::transport::TransportError;
use weft_protocol_ag_ui::InputError;

/// Top-level error for driving an agent run.
///
/// Each variant wraps the error of one pipeline stage, except [`Run`],
/// which carries a RUN_ERROR reported by the agent itself.
///
/// [`Run`]: AgentError::Run
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Chunk(#[from] ChunkSequenceError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The agent reported a RUN_ERROR event.
    #[error("run error: {message}")]
    Run {
        message: String,
        code: Option<String>,
    },
}
