//! `SessionTransport` over an axum WebSocket.
//!
//! A reader task owns the receiving half so a disconnect is noticed (and the
//! disconnect token cancelled) even while the session manager is busy inside
//! an exchange.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, Stream, StreamExt};
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::messages::{ClientMessage, ServerMessage};
use crate::ports::{InboundEvent, OutboundEvent, SessionTransport, TransportError};

const INBOUND_BUFFER: usize = 32;

/// One learner's WebSocket connection.
pub struct WebSocketTransport {
    sender: SplitSink<WebSocket, Message>,
    inbound: mpsc::Receiver<Result<InboundEvent, TransportError>>,
    disconnect: CancellationToken,
    reader: JoinHandle<()>,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        let (sender, receiver) = socket.split();
        let (tx, inbound) = mpsc::channel(INBOUND_BUFFER);
        let disconnect = CancellationToken::new();
        let reader = tokio::spawn(read_loop(receiver, tx, disconnect.clone()));

        Self {
            sender,
            inbound,
            disconnect,
            reader,
        }
    }

    /// Sends a close frame; errors are ignored since the peer may be gone.
    pub async fn close(mut self) {
        let _ = self.sender.send(Message::Close(None)).await;
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Decodes one text frame into an inbound event.
pub fn decode_frame(text: &str) -> Result<InboundEvent, TransportError> {
    serde_json::from_str::<ClientMessage>(text)
        .map(InboundEvent::from)
        .map_err(|e| TransportError::Malformed(e.to_string()))
}

/// What one WebSocket frame means for the session.
enum Frame {
    Event(Result<InboundEvent, TransportError>),
    /// Control traffic with no session meaning.
    Skip,
    Closed,
}

fn classify<E: fmt::Display>(frame: Result<Message, E>) -> Frame {
    match frame {
        Ok(Message::Text(text)) => Frame::Event(decode_frame(&text)),
        Ok(Message::Binary(_)) => Frame::Event(Err(TransportError::Malformed(
            "binary frames are not supported".to_string(),
        ))),
        // Protocol-level ping/pong is answered by axum.
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => Frame::Skip,
        Ok(Message::Close(_)) => {
            tracing::debug!("Client sent close frame");
            Frame::Closed
        }
        Err(e) => {
            tracing::debug!("WebSocket receive error: {}", e);
            Frame::Closed
        }
    }
}

/// Forwards decoded frames until the socket closes, then cancels the
/// disconnect token.
///
/// While the buffer is full the socket is still watched, so a close frame
/// behind a burst of messages is noticed before the queue drains. A further
/// message in that state closes the session.
async fn read_loop<S, E>(
    mut receiver: S,
    tx: mpsc::Sender<Result<InboundEvent, TransportError>>,
    disconnect: CancellationToken,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    while let Some(frame) = receiver.next().await {
        let event = match classify(frame) {
            Frame::Event(event) => event,
            Frame::Skip => continue,
            Frame::Closed => break,
        };

        let permit = loop {
            tokio::select! {
                biased;
                permit = tx.reserve() => break permit.ok(),
                next = receiver.next() => match next.map(classify) {
                    Some(Frame::Skip) => continue,
                    Some(Frame::Event(_)) => {
                        tracing::warn!(buffered = INBOUND_BUFFER, "Inbound buffer full, closing session");
                        break None;
                    }
                    Some(Frame::Closed) | None => break None,
                },
            }
        };

        match permit {
            Some(permit) => permit.send(event),
            None => break,
        }
    }

    disconnect.cancel();
}

#[async_trait]
impl SessionTransport for WebSocketTransport {
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>> {
        self.inbound.recv().await
    }

    async fn emit(&mut self, event: OutboundEvent) -> Result<(), TransportError> {
        let json = serde_json::to_string(&ServerMessage::from(event))
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.sender
            .send(Message::Text(json))
            .await
            .map_err(|_| TransportError::Closed)
    }

    fn disconnect_signal(&self) -> CancellationToken {
        self.disconnect.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn text(content: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(format!(
            r#"{{"type":"send_message","content":"{}"}}"#,
            content
        )))
    }

    mod reader {
        use super::*;

        #[tokio::test]
        async fn forwards_events_in_order_and_cancels_on_close() {
            let frames = vec![
                text("first?"),
                Ok(Message::Ping(vec![1])),
                text("second?"),
                Ok(Message::Close(None)),
                text("after close"),
            ];
            let (tx, mut rx) = mpsc::channel(INBOUND_BUFFER);
            let disconnect = CancellationToken::new();

            read_loop(futures::stream::iter(frames), tx, disconnect.clone()).await;

            assert!(disconnect.is_cancelled());
            let mut contents = Vec::new();
            while let Ok(Ok(InboundEvent::SendMessage { content })) = rx.try_recv() {
                contents.push(content);
            }
            assert_eq!(contents, vec!["first?", "second?"]);
        }

        #[tokio::test]
        async fn close_behind_full_buffer_still_cancels() {
            let mut frames: Vec<_> = (0..=INBOUND_BUFFER)
                .map(|i| text(&format!("flood {}", i)))
                .collect();
            frames.push(Ok(Message::Close(None)));
            // Nobody drains the receiver, as during a running exchange.
            let (tx, _rx) = mpsc::channel(INBOUND_BUFFER);
            let disconnect = CancellationToken::new();

            let reader = tokio::spawn(read_loop(
                futures::stream::iter(frames),
                tx,
                disconnect.clone(),
            ));

            tokio::time::timeout(Duration::from_secs(1), disconnect.cancelled())
                .await
                .expect("disconnect was not signalled");
            reader.await.unwrap();
        }

        #[tokio::test]
        async fn message_overflow_closes_session() {
            let frames: Vec<_> = (0..INBOUND_BUFFER + 2)
                .map(|i| text(&format!("flood {}", i)))
                .chain(std::iter::once(Ok(Message::Ping(vec![]))))
                .collect();
            let (tx, mut rx) = mpsc::channel(INBOUND_BUFFER);
            let disconnect = CancellationToken::new();

            let stream = futures::stream::iter(frames).chain(futures::stream::pending());
            let reader = tokio::spawn(read_loop(Box::pin(stream), tx, disconnect.clone()));

            tokio::time::timeout(Duration::from_secs(1), disconnect.cancelled())
                .await
                .expect("overflow did not close the session");
            reader.await.unwrap();

            let mut queued = 0;
            while rx.try_recv().is_ok() {
                queued += 1;
            }
            assert_eq!(queued, INBOUND_BUFFER);
        }
    }

    #[test]
    fn decode_frame_accepts_protocol_messages() {
        assert_eq!(
            decode_frame(r#"{"type":"send_message","content":"Why?"}"#),
            Ok(InboundEvent::SendMessage {
                content: "Why?".to_string()
            })
        );
        assert_eq!(decode_frame(r#"{"type":"ping"}"#), Ok(InboundEvent::Ping));
    }

    #[test]
    fn decode_frame_flags_malformed_json() {
        match decode_frame("{not json") {
            Err(TransportError::Malformed(_)) => {}
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn decode_frame_flags_missing_content() {
        assert!(matches!(
            decode_frame(r#"{"type":"send_message"}"#),
            Err(TransportError::Malformed(_))
        ));
    }
}
