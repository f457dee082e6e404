//! Transports deliver AG-UI frames from an agent endpoint to the client.
//!
//! A transport speaks frames, not events: decoding the payload into a typed
//! [`Event`](weft_protocol_ag_ui::Event) happens downstream so that transport
//! implementations stay oblivious to the protocol's event set.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use weft_protocol_ag_ui::{Event, RunAgentInput};

pub mod http;

pub use http::HttpTransport;

/// One transport-level frame: an event name plus its JSON payload text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub name: String,
    pub data: String,
}

impl RawFrame {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Encode an event into the frame a conforming server would send for it.
    pub fn from_event(event: &Event) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name: event.name().to_string(),
            data: serde_json::to_string(event)?,
        })
    }
}

/// Stream of transport frames, boxed so trait methods can return it.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<RawFrame, TransportError>> + Send>>;

/// Transport-level failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish the connection.
    #[error("connect: {0}")]
    Connect(String),
    /// Server answered with a non-success status.
    #[error("status {0}")]
    Status(u16),
    /// The stream failed mid-flight.
    #[error("stream: {0}")]
    Stream(String),
    /// The transport has no more frames to give.
    #[error("closed")]
    Closed,
}

/// A way to reach an AG-UI agent endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a streaming connection for the run and return its frames.
    async fn open(&self, input: &RunAgentInput) -> Result<FrameStream, TransportError>;

    /// Fetch the run outcome as a single frame, for endpoints that cannot
    /// stream. Used as a fallback when [`open`](Transport::open) fails.
    async fn fetch(&self, input: &RunAgentInput) -> Result<RawFrame, TransportError>;
}

/// In-process transport fed by an unbounded channel.
///
/// The receiver is taken on first [`open`](Transport::open); later opens
/// report [`TransportError::Closed`]. There is no request/response side, so
/// [`fetch`](Transport::fetch) always fails.
#[derive(Debug)]
pub struct ChannelTransport {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<RawFrame, TransportError>>>>,
}

impl ChannelTransport {
    /// Create a transport and the sender that feeds it.
    pub fn channel() -> (
        mpsc::UnboundedSender<Result<RawFrame, TransportError>>,
        Self,
    ) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            Self {
                receiver: Mutex::new(Some(receiver)),
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn open(&self, _input: &RunAgentInput) -> Result<FrameStream, TransportError> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or(TransportError::Closed)?;
        Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
    }

    async fn fetch(&self, _input: &RunAgentInput) -> Result<RawFrame, TransportError> {
        Err(TransportError::Closed)
    }
}
