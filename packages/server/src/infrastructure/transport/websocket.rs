//! WebSocket implementation of the `Transport` seam.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{sink::SinkExt, stream::SplitSink};

use crate::domain::{Frame, Transport, TransportError};

/// Write half of one WebSocket connection.
///
/// Owned by exactly one send loop for the lifetime of the connection.
pub struct WebSocketTransport {
    sink: SplitSink<WebSocket, Message>,
}

impl WebSocketTransport {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn write_batch(&mut self, frames: Vec<Frame>) -> Result<(), TransportError> {
        // Queue every frame as its own message, then push them out in one flush.
        for frame in frames {
            self.sink
                .feed(Message::Text(frame.to_string().into()))
                .await
                .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        }
        self.sink
            .flush()
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}
