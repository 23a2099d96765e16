//! In-process `SessionTransport` backed by tokio channels.
//!
//! Lets embedders (and tests) drive a tutoring session without a socket:
//! the `ChannelClient` half plays the learner.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ports::{InboundEvent, OutboundEvent, SessionTransport, TransportError};

/// Server half handed to the session manager.
pub struct ChannelTransport {
    inbound: mpsc::Receiver<Result<InboundEvent, TransportError>>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    disconnect: CancellationToken,
}

/// Learner half.
pub struct ChannelClient {
    inbound: mpsc::Sender<Result<InboundEvent, TransportError>>,
    outbound: mpsc::UnboundedReceiver<OutboundEvent>,
    disconnect: CancellationToken,
}

impl ChannelTransport {
    /// Creates a connected transport/client pair.
    pub fn pair(buffer: usize) -> (ChannelTransport, ChannelClient) {
        let (in_tx, in_rx) = mpsc::channel(buffer.max(1));
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let disconnect = CancellationToken::new();

        (
            ChannelTransport {
                inbound: in_rx,
                outbound: out_tx,
                disconnect: disconnect.clone(),
            },
            ChannelClient {
                inbound: in_tx,
                outbound: out_rx,
                disconnect,
            },
        )
    }
}

#[async_trait]
impl SessionTransport for ChannelTransport {
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>> {
        self.inbound.recv().await
    }

    async fn emit(&mut self, event: OutboundEvent) -> Result<(), TransportError> {
        self.outbound.send(event).map_err(|_| TransportError::Closed)
    }

    fn disconnect_signal(&self) -> CancellationToken {
        self.disconnect.clone()
    }
}

impl ChannelClient {
    pub async fn send(&self, event: InboundEvent) -> Result<(), TransportError> {
        self.inbound
            .send(Ok(event))
            .await
            .map_err(|_| TransportError::Closed)
    }

    pub async fn send_message(&self, content: impl Into<String>) -> Result<(), TransportError> {
        self.send(InboundEvent::SendMessage {
            content: content.into(),
        })
        .await
    }

    /// Delivers a frame the server could not decode.
    pub async fn send_malformed(&self, reason: impl Into<String>) -> Result<(), TransportError> {
        self.inbound
            .send(Err(TransportError::Malformed(reason.into())))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Next event from the server; `None` once the server half is gone.
    pub async fn recv(&mut self) -> Option<OutboundEvent> {
        self.outbound.recv().await
    }

    /// Like `recv`, bounded by `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<OutboundEvent> {
        tokio::time::timeout(timeout, self.outbound.recv())
            .await
            .ok()
            .flatten()
    }

    /// Simulates the connection dropping.
    pub fn disconnect(&self) {
        self.disconnect.cancel();
    }
}
