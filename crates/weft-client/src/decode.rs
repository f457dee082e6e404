//! Frame decoding with skip-and-continue semantics.
//!
//! One malformed frame must not kill a run: the decoder logs it, bumps a
//! counter, and moves on to the next frame. Only transport failures travel
//! through as errors.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::warn;
use weft_protocol_ag_ui::{Event, decode_frame};

use crate::transport::{FrameStream, TransportError};

/// Stream of decoded events, boxed like [`FrameStream`].
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, TransportError>> + Send>>;

/// Shared counter of frames dropped by the decoder.
#[derive(Debug, Clone, Default)]
pub struct DecodeStats {
    dropped: Arc<AtomicU64>,
}

impl DecodeStats {
    /// Number of malformed frames dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decode transport frames into protocol events.
pub fn decode_frames(mut frames: FrameStream, stats: DecodeStats) -> EventStream {
    Box::pin(stream! {
        while let Some(next) = frames.next().await {
            match next {
                Ok(frame) => match decode_frame(&frame.name, &frame.data) {
                    Ok(event) => yield Ok(event),
                    Err(e) => {
                        stats.record_drop();
                        warn!(error = %e, event = %frame.name, "dropping malformed frame");
                    }
                },
                Err(e) => yield Err(e),
            }
        }
    })
}
