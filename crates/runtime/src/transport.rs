//! Socket transport for the shell automation protocol.
//!
//! Frames are `<length>:<body>` where `<length>` is the ASCII decimal byte
//! length of `<body>` and `<body>` is one JSON document. The same framing is
//! used in both directions.
//!
//! The transport is split into a sender half (used by the connection's writer
//! task) and a receiver half (a read loop that decodes frames and pushes them
//! into an mpsc channel for the connection's dispatch loop).

use crate::error::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Longest accepted frame header, in decimal digits. A 10-digit length
/// already describes a frame of several gigabytes.
const MAX_HEADER_DIGITS: usize = 10;

/// Sending half of a transport.
pub trait Transport: Send {
    /// Send one JSON message as a single frame.
    fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport.
pub trait TransportReceiver: Send {
    /// Run the read loop until the peer closes the socket.
    ///
    /// Returns `Ok(())` on a clean close at a frame boundary; an error for a
    /// close mid-frame or a malformed header.
    fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// The pieces a [`Connection`](crate::Connection) is built from.
pub struct TransportParts {
    pub sender: Box<dyn Transport>,
    pub receiver: Box<dyn TransportReceiver>,
    pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// A framed socket transport.
///
/// Usually constructed with [`SocketTransport::connect`]; [`SocketTransport::new`]
/// accepts arbitrary stream halves so tests can run over in-memory duplex pipes.
pub struct SocketTransport {
    sender: SocketTransportSender,
    receiver: SocketTransportReceiver,
}

/// Writer half of a [`SocketTransport`].
pub struct SocketTransportSender {
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

/// Reader half of a [`SocketTransport`].
pub struct SocketTransportReceiver {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    message_tx: mpsc::UnboundedSender<Value>,
}

impl SocketTransport {
    /// Create a transport over the given stream halves.
    ///
    /// Returns the transport and the receiving end of the inbound message
    /// channel fed by the receiver's read loop.
    pub fn new<W, R>(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>)
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let transport = Self {
            sender: SocketTransportSender {
                writer: Box::new(writer),
            },
            receiver: SocketTransportReceiver {
                reader: Box::new(reader),
                message_tx,
            },
        };
        (transport, message_rx)
    }

    /// Open a TCP connection to the remote shell's automation port.
    pub async fn connect(host: &str, port: u16) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{host}:{port}: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| Error::ConnectionFailed(format!("{host}:{port}: {e}")))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self::new(write_half, read_half))
    }

    /// Read one frame directly, bypassing the message channel.
    ///
    /// The server announces itself with one unsolicited frame before the
    /// request/response flow starts; this is how that hello is consumed,
    /// since the read loop only runs once the connection takes over.
    /// Returns `Ok(None)` when the peer closes before sending a frame.
    pub async fn read_frame(&mut self) -> Result<Option<Value>> {
        self.receiver.read_frame().await
    }

    /// Split into sender and receiver halves.
    pub fn into_parts(self) -> (SocketTransportSender, SocketTransportReceiver) {
        (self.sender, self.receiver)
    }

    /// Package the transport for [`Connection::new`](crate::Connection::new).
    pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
        let (sender, receiver) = self.into_parts();
        TransportParts {
            sender: Box::new(sender),
            receiver: Box::new(receiver),
            message_rx,
        }
    }
}

/// Encode one message as a `<length>:<body>` frame.
fn encode_frame(message: &Value) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(message)?;
    let header = body.len().to_string();
    let mut frame = Vec::with_capacity(header.len() + 1 + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.push(b':');
    frame.extend_from_slice(&body);
    Ok(frame)
}

impl SocketTransportSender {
    async fn send_frame(&mut self, message: Value) -> Result<()> {
        let frame = encode_frame(&message)?;
        self.writer
            .write_all(&frame)
            .await
            .map_err(|e| Error::TransportError(format!("write failed: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| Error::TransportError(format!("flush failed: {e}")))?;
        Ok(())
    }
}

impl Transport for SocketTransportSender {
    fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.send_frame(message))
    }
}

impl SocketTransportReceiver {
    /// Read one frame; `Ok(None)` on a clean close at a frame boundary.
    async fn read_frame(&mut self) -> Result<Option<Value>> {
        // Header: ASCII decimal digits terminated by ':'
        let mut length: usize = 0;
        let mut digits = 0;
        loop {
            let mut byte = [0u8; 1];
            match self.reader.read_exact(&mut byte).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && digits == 0 => {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(Error::TransportError(format!("read failed: {e}")));
                }
            }
            match byte[0] {
                b'0'..=b'9' => {
                    if digits == MAX_HEADER_DIGITS {
                        return Err(Error::TransportError("frame header too long".to_string()));
                    }
                    length = length * 10 + usize::from(byte[0] - b'0');
                    digits += 1;
                }
                b':' if digits > 0 => break,
                other => {
                    return Err(Error::TransportError(format!(
                        "invalid frame header byte: {other:#04x}"
                    )));
                }
            }
        }

        let mut body = vec![0u8; length];
        self.reader
            .read_exact(&mut body)
            .await
            .map_err(|e| Error::TransportError(format!("truncated frame: {e}")))?;

        let message: Value = serde_json::from_slice(&body)?;
        tracing::trace!(bytes = length, "frame received");
        Ok(Some(message))
    }

    async fn run_loop(mut self) -> Result<()> {
        while let Some(message) = self.read_frame().await? {
            if self.message_tx.send(message).is_err() {
                // Dispatch loop is gone; nothing left to read for.
                return Ok(());
            }
        }
        Ok(())
    }
}

impl TransportReceiver for SocketTransportReceiver {
    fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(self.run_loop())
    }
}
