//! HTTP transport speaking the AG-UI wire protocol: POST the run input,
//! read the response as a server-sent event stream.

use async_stream::stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use weft_protocol_ag_ui::RunAgentInput;

use super::{FrameStream, RawFrame, Transport, TransportError};

/// Transport for a remote AG-UI endpoint.
///
/// [`open`](Transport::open) negotiates `text/event-stream` and yields one
/// [`RawFrame`] per SSE frame. [`fetch`](Transport::fetch) asks for a plain
/// JSON body instead, for servers that answer a run with a single event.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Create a transport for the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, TLS settings).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Attach a header to every request, e.g. an authorization token.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    async fn post(
        &self,
        input: &RunAgentInput,
        accept: &'static str,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(ACCEPT, accept)
            .json(input)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, input: &RunAgentInput) -> Result<FrameStream, TransportError> {
        let response = self.post(input, "text/event-stream").await?;

        let mut events = response.bytes_stream().eventsource();
        let frames = stream! {
            while let Some(next) = events.next().await {
                match next {
                    Ok(event) => {
                        // Keep-alive comments arrive as frames with no data.
                        if event.data.is_empty() {
                            continue;
                        }
                        yield Ok(RawFrame::new(event.event, event.data));
                    }
                    Err(e) => {
                        yield Err(TransportError::Stream(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(frames))
    }

    async fn fetch(&self, input: &RunAgentInput) -> Result<RawFrame, TransportError> {
        let response = self.post(input, "application/json").await?;

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Stream(e.to_string()))?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| TransportError::Stream(format!("invalid json body: {e}")))?;
        let name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Stream("response is not a protocol event".to_string()))?
            .to_string();
        Ok(RawFrame::new(name, body))
    }
}
