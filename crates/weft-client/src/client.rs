//! The run driver: one sequential pipeline from transport frames to the
//! thread's canonical view.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};
use weft_protocol_ag_ui::{Event, RunAgentInput};

use crate::assembler::ChunkAssembler;
use crate::decode::{DecodeStats, decode_frames};
use crate::error::AgentError;
use crate::thread::{RunOutcome, RunPhase, ThreadRuntime};
use crate::transport::{FrameStream, RawFrame, Transport, TransportError};

/// Cooperative cancellation flag for a run.
///
/// Clones share the flag, so one handle can be kept by the caller while
/// another travels into [`AgentClient::run_with_cancellation`].
#[derive(Debug, Clone, Default)]
pub struct RunCancellation {
    cancelled: Arc<AtomicBool>,
}

impl RunCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub thread_id: String,
    pub run_id: String,
    /// Payload the agent attached to RUN_FINISHED, if any.
    pub result: Option<Value>,
}

/// Drives agent runs over a [`Transport`] into a [`ThreadRuntime`].
///
/// Processing is strictly sequential per run: decode, assemble, process,
/// one event at a time, in arrival order. Concurrency belongs to callers
/// running independent threads on separate tasks.
pub struct AgentClient<T: Transport> {
    transport: T,
    stats: DecodeStats,
}

impl<T: Transport> AgentClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            stats: DecodeStats::default(),
        }
    }

    /// Malformed frames dropped by the decoder since this client was built.
    pub fn dropped_frames(&self) -> u64 {
        self.stats.dropped()
    }

    /// Run the agent to completion on `thread`.
    pub async fn run(
        &self,
        thread: &mut ThreadRuntime,
        input: &RunAgentInput,
    ) -> Result<RunSummary, AgentError> {
        self.run_with_cancellation(thread, input, RunCancellation::new())
            .await
    }

    /// Like [`run`](Self::run), but stops between events once `cancellation`
    /// fires. A cancelled run closes its open streams, reaches a terminal
    /// state, and surfaces as a run error with code `CANCELLED`.
    pub async fn run_with_cancellation(
        &self,
        thread: &mut ThreadRuntime,
        input: &RunAgentInput,
        cancellation: RunCancellation,
    ) -> Result<RunSummary, AgentError> {
        input.validate()?;
        thread.seed_messages(&input.messages);

        let frames: FrameStream = match self.transport.open(input).await {
            Ok(frames) => frames,
            Err(e) => {
                // One shot at the blocking fallback, then give up.
                warn!(error = %e, "stream open failed, trying blocking fallback");
                let frame = self.transport.fetch(input).await?;
                let single: Vec<Result<RawFrame, TransportError>> = vec![Ok(frame)];
                Box::pin(futures::stream::iter(single))
            }
        };

        let mut events = decode_frames(frames, self.stats.clone());
        let mut assembler = ChunkAssembler::new();
        let mut failure: Option<AgentError> = None;
        let mut cancelled = false;

        loop {
            if cancellation.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(next) = events.next().await else {
                break;
            };
            let expanded = match next {
                Ok(event) => match assembler.feed(event) {
                    Ok(expanded) => expanded,
                    Err(e) => {
                        failure = Some(e.into());
                        break;
                    }
                },
                Err(e) => {
                    failure = Some(e.into());
                    break;
                }
            };
            for event in expanded {
                if let Err(e) = thread.process(event).await {
                    failure = Some(e);
                    break;
                }
            }
            if failure.is_some() {
                break;
            }
        }

        // Balance whatever the assembler still holds open. Also the release
        // path for cancellation.
        for event in assembler.finish() {
            if let Err(e) = thread.process(event).await {
                debug!(error = %e, "flush event rejected");
            }
        }

        if cancelled {
            let message = "run cancelled".to_string();
            let code = Some("CANCELLED".to_string());
            self.close_with_error(thread, &message, code.clone()).await;
            return Err(AgentError::Run { message, code });
        }

        if let Some(failure) = failure {
            self.close_with_error(thread, &failure.to_string(), None)
                .await;
            return Err(failure);
        }

        if thread.phase() == RunPhase::Running {
            // The stream dried up without a terminal event.
            self.close_with_error(
                thread,
                "stream closed before terminal event",
                Some("STREAM_CLOSED".to_string()),
            )
            .await;
            return Err(AgentError::Transport(TransportError::Closed));
        }

        match thread.take_outcome() {
            Some(RunOutcome::Finished { result }) => Ok(RunSummary {
                thread_id: input.thread_id.clone(),
                run_id: input.run_id.clone(),
                result,
            }),
            Some(RunOutcome::Failed { message, code }) => Err(AgentError::Run { message, code }),
            None => Err(AgentError::Transport(TransportError::Closed)),
        }
    }

    /// Deliver the terminal RUN_ERROR that lets the runtime reach idle.
    async fn close_with_error(
        &self,
        thread: &mut ThreadRuntime,
        message: &str,
        code: Option<String>,
    ) {
        if matches!(thread.phase(), RunPhase::Running | RunPhase::Errored) {
            if let Err(e) = thread.process(Event::run_error(message, code)).await {
                debug!(error = %e, "terminal close rejected");
            }
        }
    }
}
