//! Request/response correlation for the shell automation protocol.
//!
//! The protocol is strictly sequential from the client's point of view, but
//! correlation is still done by id so a late or unsolicited frame can never be
//! mistaken for the answer to the current command:
//!
//! 1. Client calls `send_command()` with a command name and parameters
//! 2. Connection assigns a unique id and creates a oneshot channel
//! 3. The request is queued for the writer task and sent as one frame
//! 4. The dispatch loop receives the response frame from the transport
//! 5. The response is correlated by id and resolved through the oneshot
//!
//! Frames without an id (the server hello, forward-compatible extensions) are
//! surfaced as [`Message::Unknown`] and ignored by the dispatch loop.

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// Command request sent to the shell's automation server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request id for correlating responses
    pub id: u32,
    /// Command name (e.g. "executeScript", "switchToFrame")
    pub name: String,
    /// Command parameters as a JSON object
    pub parameters: Value,
}

/// Response message from the automation server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request id this response correlates to
    pub id: u32,
    /// Success result (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Error result (mutually exclusive with value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// Remote error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error status (e.g. "no such element", "script timeout")
    #[serde(default)]
    pub error: Option<String>,
    /// Error message
    pub message: String,
    /// Remote stack trace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

/// Discriminated union of inbound frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Response frame (has an `id` field)
    Response(Response),
    /// Anything else: the server hello, forward-compatible extensions
    Unknown(Value),
}

/// Pending request callbacks keyed by request id.
type CallbackMap = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// Guard ensuring callback cleanup when a request future is dropped mid-flight.
struct CancelGuard {
    id: u32,
    callbacks: CallbackMap,
    completed: bool,
}

impl CancelGuard {
    fn new(id: u32, callbacks: CallbackMap) -> Self {
        Self {
            id,
            callbacks,
            completed: false,
        }
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if self.callbacks.lock().remove(&self.id).is_some() {
            tracing::debug!(id = self.id, "removed orphaned callback");
        }
    }
}

/// Future returned by [`Connection::send_command`] with cancellation cleanup.
struct ResponseFuture {
    rx: oneshot::Receiver<Result<Value>>,
    guard: CancelGuard,
}

impl Future for ResponseFuture {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(result) => {
                self.guard.complete();
                Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Connection to the shell's automation server.
///
/// Owns the transport halves until `run()` is called, then correlates
/// responses with pending requests by id.
pub struct Connection {
    /// Sequential request id counter
    last_id: AtomicU32,
    /// Pending request callbacks keyed by request id
    callbacks: CallbackMap,
    /// Channel for queuing outbound messages for the writer task
    outbound_tx: mpsc::UnboundedSender<Value>,
    /// Transport sender (taken by run() to start the writer task)
    transport_sender: Mutex<Option<Box<dyn Transport>>>,
    /// Receiver half of the transport (taken by run() to start the reader task)
    transport_receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
    /// Inbound messages from the transport (taken by run())
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    /// Outbound message queue (taken by run() to start the writer task)
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl Connection {
    /// Create a new Connection over the given transport parts.
    pub fn new(parts: TransportParts) -> Self {
        let TransportParts {
            sender,
            receiver,
            message_rx,
        } = parts;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            last_id: AtomicU32::new(0),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            outbound_tx,
            transport_sender: Mutex::new(Some(sender)),
            transport_receiver: Mutex::new(Some(receiver)),
            message_rx: Mutex::new(Some(message_rx)),
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    /// Send a command to the automation server and await its response value.
    pub async fn send_command(&self, name: &str, parameters: Value) -> Result<Value> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(id, name, "sending command");

        let (tx, rx) = oneshot::channel();
        self.callbacks.lock().insert(id, tx);

        let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

        let request = Request {
            id,
            name: name.to_string(),
            parameters,
        };

        let request_value = serde_json::to_value(&request)?;

        if self.outbound_tx.send(request_value).is_err() {
            tracing::error!("failed to queue command: outbound channel closed");
            return Err(Error::ChannelClosed);
        }

        ResponseFuture { rx, guard }.await
    }

    /// Run the message dispatch loop.
    ///
    /// Spawns the transport reader and writer tasks, then dispatches inbound
    /// frames until the transport closes. Can only be called once.
    pub async fn run(self: &Arc<Self>) {
        let transport_receiver = self
            .transport_receiver
            .lock()
            .take()
            .expect("run() can only be called once - transport receiver already taken");

        let mut transport_sender = self
            .transport_sender
            .lock()
            .take()
            .expect("run() can only be called once - transport sender already taken");

        let mut outbound_rx = self
            .outbound_rx
            .lock()
            .take()
            .expect("run() can only be called once - outbound receiver already taken");

        let reader_handle = tokio::spawn(async move {
            if let Err(e) = transport_receiver.run().await {
                tracing::error!("transport read error: {}", e);
            }
        });

        let writer_handle = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = transport_sender.send(message).await {
                    tracing::error!("transport write error: {}", e);
                    break;
                }
            }
        });

        let mut message_rx = self
            .message_rx
            .lock()
            .take()
            .expect("run() can only be called once - message receiver already taken");

        while let Some(message_value) = message_rx.recv().await {
            match serde_json::from_value::<Message>(message_value) {
                Ok(message) => {
                    if let Err(e) = self.dispatch_internal(message) {
                        tracing::error!("error dispatching message: {}", e);
                    }
                }
                Err(e) => {
                    tracing::error!("failed to parse message: {}", e);
                }
            }
        }

        // Resolve anything still pending so callers fail fast instead of hanging.
        let pending: Vec<_> = {
            let mut callbacks = self.callbacks.lock();
            callbacks.drain().collect()
        };
        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ChannelClosed));
        }

        let _ = reader_handle.await;
        let _ = writer_handle.await;
    }

    /// Dispatch an incoming message (test-only public version).
    #[cfg(test)]
    pub fn dispatch(self: &Arc<Self>, message: Message) -> Result<()> {
        self.dispatch_internal(message)
    }

    fn dispatch_internal(self: &Arc<Self>, message: Message) -> Result<()> {
        match message {
            Message::Response(response) => {
                tracing::debug!(id = response.id, "processing response");
                let callback =
                    self.callbacks.lock().remove(&response.id).ok_or_else(|| {
                        Error::ProtocolError(format!(
                            "Cannot find request to respond: id={}",
                            response.id
                        ))
                    })?;

                let result = if let Some(payload) = response.error {
                    Err(parse_remote_error(payload))
                } else {
                    Ok(response.value.unwrap_or(Value::Null))
                };

                let _ = callback.send(result);
                Ok(())
            }
            Message::Unknown(value) => {
                tracing::debug!(
                    "unsolicited frame (ignored): {}",
                    serde_json::to_string(&value)
                        .unwrap_or_else(|_| "<serialization failed>".to_string())
                );
                Ok(())
            }
        }
    }
}

/// Converts an [`ErrorPayload`] from the server into [`Error::Remote`].
fn parse_remote_error(payload: ErrorPayload) -> Error {
    Error::Remote {
        error: payload.error.unwrap_or_else(|| "error".to_string()),
        message: payload.message,
        stacktrace: payload.stacktrace,
    }
}
