use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, TryStreamExt};

use crate::errors::TransportError;
use crate::models::ChatStreamRequest;

/// Raw response body: byte chunks with no alignment to frame boundaries.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Network seam for one streaming chat turn. The session takes this as an
/// injected dependency; tests script their own implementations.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POSTs the request and hands back the response body stream.
    /// A non-success response status is an error here, not a body to decode.
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<ByteStream, TransportError>;
}

/// HTTP implementation against the real chat service.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16() });
        }

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| TransportError::interrupted(e.to_string()))
            .boxed())
    }
}
