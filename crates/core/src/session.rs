//! Session handle: one connection to the remote shell.
//!
//! The session owns the mutable remote-side state the rest of the crate
//! depends on: the active execution context (content or chrome), the active
//! frame target, and the default script timeout. All of it lives behind this
//! handle; nothing else in the crate touches the connection directly.
//!
//! Lifecycle: `Connected` after [`Session::connect`], `SessionActive` after
//! [`Session::start_session`], `Closed` after [`Session::delete_session`].
//! Commands are only accepted while the session is active.

use crate::DEFAULT_SCRIPT_TIMEOUT;
use parking_lot::Mutex;
use serde_json::{Value, json};
use shellpilot_runtime::error::SCRIPT_TIMEOUT;
use shellpilot_runtime::{Connection, Error, Result, SocketTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long to wait for the server hello after the socket opens.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Privilege context for remote script execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Context {
    /// Page-level execution inside the targeted frame
    #[default]
    Content,
    /// Elevated system-level execution (settings, contacts, radio access)
    Chrome,
}

impl Context {
    pub fn as_str(self) -> &'static str {
        match self {
            Context::Content => "content",
            Context::Chrome => "chrome",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Connected,
    Active,
    Closed,
}

struct SessionState {
    lifecycle: Lifecycle,
    context: Context,
    frame: Option<String>,
    session_id: Option<String>,
    capabilities: Value,
    default_timeout: Duration,
}

struct SessionInner {
    connection: Arc<Connection>,
    endpoint: String,
    /// Dispatch loop task, aborted on delete_session
    dispatch: Mutex<Option<JoinHandle<()>>>,
    state: Mutex<SessionState>,
}

/// Handle to one automation session.
///
/// Cloning is cheap and yields another handle to the same session; the
/// context/frame state is shared. The client issues one command at a time -
/// independent automation flows need their own sessions, not clones.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Connect to the shell's automation server.
    ///
    /// Fails with [`Error::ConnectionFailed`] when the host is unreachable or
    /// the server hello does not arrive.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let (mut transport, message_rx) = SocketTransport::connect(host, port).await?;

        // The server announces itself with one unsolicited frame before
        // accepting commands.
        let hello = tokio::time::timeout(HANDSHAKE_TIMEOUT, transport.read_frame())
            .await
            .map_err(|_| Error::ConnectionFailed(format!("{host}:{port}: no server hello")))?
            .map_err(|e| Error::ConnectionFailed(format!("{host}:{port}: {e}")))?
            .ok_or_else(|| {
                Error::ConnectionFailed(format!("{host}:{port}: closed during handshake"))
            })?;
        if hello.get("protocolVersion").is_none() {
            return Err(Error::ConnectionFailed(format!(
                "{host}:{port}: unexpected hello: {hello}"
            )));
        }
        tracing::debug!(host, port, %hello, "connected to remote shell");

        let parts = transport.into_transport_parts(message_rx);
        let connection = Arc::new(Connection::new(parts));
        let dispatch = {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move { connection.run().await })
        };

        Ok(Self {
            inner: Arc::new(SessionInner {
                connection,
                endpoint: format!("{host}:{port}"),
                dispatch: Mutex::new(Some(dispatch)),
                state: Mutex::new(SessionState {
                    lifecycle: Lifecycle::Connected,
                    context: Context::Content,
                    frame: None,
                    session_id: None,
                    capabilities: Value::Null,
                    default_timeout: DEFAULT_SCRIPT_TIMEOUT,
                }),
            }),
        })
    }

    /// Start the logical automation session.
    pub async fn start_session(&self) -> Result<()> {
        {
            let state = self.inner.state.lock();
            match state.lifecycle {
                Lifecycle::Connected => {}
                Lifecycle::Active => {
                    return Err(Error::Session("session already started".to_string()));
                }
                Lifecycle::Closed => {
                    return Err(Error::Session("session is closed".to_string()));
                }
            }
        }

        let value = self
            .inner
            .connection
            .send_command("newSession", json!({}))
            .await?;

        let mut state = self.inner.state.lock();
        state.session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string);
        state.capabilities = value.get("capabilities").cloned().unwrap_or(Value::Null);
        state.lifecycle = Lifecycle::Active;
        tracing::debug!(session_id = ?state.session_id, "session started");
        Ok(())
    }

    /// End the session and release the transport.
    ///
    /// Safe to call in any order and any number of times: from an active
    /// session it issues `deleteSession` best-effort (teardown must succeed
    /// even when prior commands failed), from a merely connected session it
    /// only releases the transport, and on a closed session it is a no-op.
    pub async fn delete_session(&self) -> Result<()> {
        let lifecycle = self.inner.state.lock().lifecycle;
        if lifecycle == Lifecycle::Active {
            if let Err(err) = self
                .inner
                .connection
                .send_command("deleteSession", json!({}))
                .await
            {
                tracing::warn!(error = %err, "deleteSession failed; closing transport anyway");
            }
        }

        {
            let mut state = self.inner.state.lock();
            state.lifecycle = Lifecycle::Closed;
            state.session_id = None;
        }

        if let Some(handle) = self.inner.dispatch.lock().take() {
            handle.abort();
        }
        Ok(())
    }

    /// Set the privilege context for subsequent script executions.
    ///
    /// Callers switching to chrome must pair the switch with a restore so
    /// elevated state never leaks into unrelated commands; use
    /// [`Session::run_scoped`](crate::executor) instead of calling this
    /// directly wherever possible.
    pub async fn set_context(&self, context: Context) -> Result<()> {
        self.command("setContext", json!({"value": context.as_str()}))
            .await?;
        self.inner.state.lock().context = context;
        Ok(())
    }

    /// Target a frame; `None` targets the top-level document.
    pub async fn switch_to_frame(&self, frame: Option<&str>) -> Result<()> {
        self.command("switchToFrame", json!({"id": frame})).await?;
        self.inner.state.lock().frame = frame.map(str::to_string);
        Ok(())
    }

    /// Return the frame target to the outermost content document. The
    /// execution context is left as-is.
    pub async fn switch_to_default_content(&self) -> Result<()> {
        self.switch_to_frame(None).await
    }

    /// Run a script against the current context/frame and return its value.
    pub async fn execute_script(&self, script: &str, args: Value) -> Result<Value> {
        self.command("executeScript", json!({"script": script, "args": args}))
            .await
    }

    /// Run a script that signals completion asynchronously.
    ///
    /// Waits for the remote completion callback or for the timeout, whichever
    /// comes first; on timeout fails with [`Error::ScriptTimeout`]. `None`
    /// falls back to the session default.
    pub async fn execute_async_script(
        &self,
        script: &str,
        args: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());
        self.command(
            "executeAsyncScript",
            json!({
                "script": script,
                "args": args,
                "scriptTimeout": timeout.as_millis() as u64,
            }),
        )
        .await
    }

    /// Inject a remote-side script library (atom) into the session.
    pub async fn import_script(&self, source: &str) -> Result<()> {
        self.command("importScript", json!({"script": source}))
            .await?;
        Ok(())
    }

    /// Find an element in the targeted frame by CSS selector.
    ///
    /// The remote answers with "no such element" when the element is absent,
    /// which poll-waits treat as a transient condition.
    pub async fn find_element(&self, selector: &str) -> Result<Value> {
        self.command(
            "findElement",
            json!({"using": "css selector", "value": selector}),
        )
        .await
    }

    /// The remote endpoint this session is connected to.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// The currently active execution context.
    pub fn context(&self) -> Context {
        self.inner.state.lock().context
    }

    /// The currently targeted frame, `None` for the top-level document.
    pub fn frame(&self) -> Option<String> {
        self.inner.state.lock().frame.clone()
    }

    /// Session id assigned by the server, when a session is active.
    pub fn session_id(&self) -> Option<String> {
        self.inner.state.lock().session_id.clone()
    }

    /// Capabilities reported by the server at session start.
    pub fn capabilities(&self) -> Value {
        self.inner.state.lock().capabilities.clone()
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.state.lock().default_timeout
    }

    pub fn set_default_timeout(&self, timeout: Duration) {
        self.inner.state.lock().default_timeout = timeout;
    }

    /// Snapshot of the active context/frame pair, for scoped execution.
    pub(crate) fn target(&self) -> (Context, Option<String>) {
        let state = self.inner.state.lock();
        (state.context, state.frame.clone())
    }

    fn ensure_active(&self) -> Result<()> {
        match self.inner.state.lock().lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::Connected => Err(Error::Session(
                "no active session; call start_session first".to_string(),
            )),
            Lifecycle::Closed => Err(Error::Session("session is closed".to_string())),
        }
    }

    async fn command(&self, name: &str, parameters: Value) -> Result<Value> {
        self.ensure_active()?;
        match self.inner.connection.send_command(name, parameters).await {
            Err(Error::Remote { error, message, .. }) if error == SCRIPT_TIMEOUT => {
                Err(Error::ScriptTimeout(message))
            }
            other => other,
        }
    }
}
