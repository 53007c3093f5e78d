//! Connection plumbing.
//!
//! Exactly one reader task owns the inbound half and routes every decoded
//! message:
//! - Action, Snapshot, Ready go to the turn channel (consumed by the turn loop)
//! - Chat, Disconnect go to the side channel (consumed by the listener)
//!
//! Disconnect, end of stream and read errors are also signalled on the turn
//! channel so a blocked turn wait ends. Outbound writes share one writer
//! behind a `tokio::sync::Mutex`.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use duel_core::protocol::Message;

use crate::codec::{FrameReader, FrameWriter, WireFormat};
use crate::error::{Result, SessionError};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Routed to the turn loop.
#[derive(Debug)]
pub enum TurnEvent {
    /// An Action, Snapshot or Ready message.
    Message(Message),
    /// The peer sent Disconnect or the stream ended.
    Disconnected,
    /// Reading failed; the reader has stopped.
    Failed(SessionError),
}

/// Routed to the background listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEvent {
    /// Free text from the peer.
    Chat(String),
    /// The peer is gone.
    Disconnected,
}

/// Cloneable handle to the shared writer.
#[derive(Clone)]
pub struct MessageSender {
    writer: Arc<Mutex<FrameWriter<BoxedWriter>>>,
}

impl std::fmt::Debug for MessageSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSender").finish_non_exhaustive()
    }
}

impl MessageSender {
    /// Write one message.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub async fn send(&self, message: &Message) -> Result<()> {
        tracing::trace!(kind = %message.kind(), "Sending message");
        self.writer.lock().await.write_message(message).await
    }

    /// Send a chat line.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn send_chat(&self, text: impl Into<String>) -> Result<()> {
        self.send(&Message::Chat { text: text.into() }).await
    }
}

/// One peer connection.
#[derive(Debug)]
pub struct Connection {
    sender: MessageSender,
    turn_rx: mpsc::UnboundedReceiver<TurnEvent>,
    side_rx: Option<mpsc::UnboundedReceiver<SideEvent>>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Split a stream and start the reader task.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new<S>(stream: S, format: WireFormat) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (turn_tx, turn_rx) = mpsc::unbounded_channel();
        let (side_tx, side_rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(
            FrameReader::new(read_half, format),
            turn_tx,
            side_tx,
        ));
        let writer: BoxedWriter = Box::new(write_half);

        Self {
            sender: MessageSender {
                writer: Arc::new(Mutex::new(FrameWriter::new(writer, format))),
            },
            turn_rx,
            side_rx: Some(side_rx),
            reader,
        }
    }

    /// Handle to the shared writer.
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    /// Take the side channel (once) for a listener task.
    pub fn take_side_events(&mut self) -> Option<mpsc::UnboundedReceiver<SideEvent>> {
        self.side_rx.take()
    }

    /// Wait for the next turn-sequence message.
    ///
    /// # Errors
    ///
    /// - [`SessionError::PeerDisconnected`] on Disconnect or end of stream
    /// - the reader's error if reading failed
    pub async fn recv_turn(&mut self) -> Result<Message> {
        match self.turn_rx.recv().await {
            Some(TurnEvent::Message(message)) => Ok(message),
            Some(TurnEvent::Failed(error)) => Err(error),
            Some(TurnEvent::Disconnected) | None => Err(SessionError::PeerDisconnected),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop<R>(
    mut reader: FrameReader<R>,
    turn_tx: mpsc::UnboundedSender<TurnEvent>,
    side_tx: mpsc::UnboundedSender<SideEvent>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.read_message().await {
            Ok(Some(message)) if message.is_turn_message() => {
                tracing::trace!(kind = %message.kind(), "Received message");
                if turn_tx.send(TurnEvent::Message(message)).is_err() {
                    return;
                }
            }
            Ok(Some(Message::Chat { text })) => {
                let _ = side_tx.send(SideEvent::Chat(text));
            }
            Ok(Some(_)) => {
                tracing::info!("Peer sent Disconnect");
                break;
            }
            Ok(None) => {
                tracing::info!("Peer closed the connection");
                break;
            }
            Err(error) => {
                tracing::warn!(%error, "Read failed");
                let _ = turn_tx.send(TurnEvent::Failed(error));
                let _ = side_tx.send(SideEvent::Disconnected);
                return;
            }
        }
    }
    let _ = turn_tx.send(TurnEvent::Disconnected);
    let _ = side_tx.send(SideEvent::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_routes_turn_and_side_messages() {
        let (local, remote) = tokio::io::duplex(4096);
        let mut connection = Connection::new(local, WireFormat::Json);
        let mut side = connection.take_side_events().unwrap();
        let mut peer = FrameWriter::new(remote, WireFormat::Json);

        peer.write_message(&Message::Chat { text: "hi".into() }).await.unwrap();
        peer.write_message(&Message::Ready).await.unwrap();
        peer.write_message(&Message::Disconnect).await.unwrap();

        assert_eq!(connection.recv_turn().await.unwrap(), Message::Ready);
        assert_eq!(side.recv().await, Some(SideEvent::Chat("hi".into())));
        assert!(matches!(
            connection.recv_turn().await,
            Err(SessionError::PeerDisconnected)
        ));
        assert_eq!(side.recv().await, Some(SideEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_decode_error_reaches_turn_loop() {
        let (local, remote) = tokio::io::duplex(4096);
        let mut connection = Connection::new(local, WireFormat::Json);
        let mut peer = FrameWriter::new(remote, WireFormat::Bincode);
        peer.write_message(&Message::Ready).await.unwrap();
        drop(peer);
        assert!(matches!(
            connection.recv_turn().await,
            Err(SessionError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_sender_reaches_peer() {
        let (local, remote) = tokio::io::duplex(4096);
        let connection = Connection::new(local, WireFormat::Bincode);
        let mut peer = FrameReader::new(remote, WireFormat::Bincode);
        connection.sender().send_chat("gg").await.unwrap();
        assert_eq!(
            peer.read_message().await.unwrap(),
            Some(Message::Chat { text: "gg".into() })
        );
    }
}
