//! Context-scoped command execution and bounded poll-waits.
//!
//! Operations that need a context or frame other than the session's current
//! one go through [`Session::run_scoped`]: record the current target, switch,
//! execute, and ALWAYS switch back - also when the command failed. This is
//! what keeps a chrome-context screenshot or settings write from leaking
//! elevated state into the next, unrelated command.

use crate::session::{Context, Session};
use serde_json::Value;
use shellpilot_runtime::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Default polling interval for [`wait_until`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Frame requirement of a scoped command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameTarget {
    /// Run in whatever frame is currently targeted
    Preserve,
    /// Run against the top-level document
    TopLevel,
    /// Run against a specific frame
    Id(String),
}

/// Execution target of a scoped command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub context: Context,
    pub frame: FrameTarget,
}

impl Scope {
    /// Content context at the top-level document.
    pub fn content_top() -> Self {
        Self {
            context: Context::Content,
            frame: FrameTarget::TopLevel,
        }
    }

    /// Elevated context; the frame target is left untouched.
    pub fn chrome() -> Self {
        Self {
            context: Context::Chrome,
            frame: FrameTarget::Preserve,
        }
    }
}

/// Whether a snippet returns directly or signals completion asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMode {
    Sync,
    Async,
}

impl Session {
    /// Run a snippet against `scope`, restoring the previously active
    /// context/frame pair afterwards on every exit path.
    ///
    /// A command failure wins over a restore failure. A restore failure after
    /// a successful command propagates: the session target is no longer the
    /// one the caller left behind, and hiding that would let elevated context
    /// leak silently.
    pub async fn run_scoped(
        &self,
        scope: &Scope,
        mode: ScriptMode,
        script: &str,
        args: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let (prev_context, prev_frame) = self.target();
        let outcome = self.run_in_scope(scope, mode, script, args, timeout).await;
        let restored = self.restore_target(prev_context, prev_frame).await;
        match (outcome, restored) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    async fn run_in_scope(
        &self,
        scope: &Scope,
        mode: ScriptMode,
        script: &str,
        args: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        if scope.context != self.context() {
            self.set_context(scope.context).await?;
        }
        match &scope.frame {
            FrameTarget::Preserve => {}
            FrameTarget::TopLevel => {
                if self.frame().is_some() {
                    self.switch_to_frame(None).await?;
                }
            }
            FrameTarget::Id(id) => {
                if self.frame().as_deref() != Some(id.as_str()) {
                    self.switch_to_frame(Some(id)).await?;
                }
            }
        }
        match mode {
            ScriptMode::Sync => self.execute_script(script, args).await,
            ScriptMode::Async => self.execute_async_script(script, args, timeout).await,
        }
    }

    async fn restore_target(&self, prev_context: Context, prev_frame: Option<String>) -> Result<()> {
        if self.frame() != prev_frame {
            self.switch_to_frame(prev_frame.as_deref()).await?;
        }
        if self.context() != prev_context {
            self.set_context(prev_context).await?;
        }
        Ok(())
    }
}

/// Repeatedly evaluate `probe` until it returns true or `timeout` elapses.
///
/// A transient "no such element" failure is swallowed and retried; any other
/// failure aborts the wait immediately. A probe that becomes true at time `t`
/// completes within `t + poll_interval`; one that never does fails with
/// [`Error::WaitTimeout`] at or after the deadline, never before.
pub async fn wait_until<F>(
    condition: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<()>
where
    F: AsyncFnMut() -> Result<bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match probe().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) if err.is_no_such_element() => {
                tracing::trace!(condition, "probe target not present yet");
            }
            Err(err) => return Err(err),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::WaitTimeout {
                condition: condition.to_string(),
                ms: timeout.as_millis() as u64,
            });
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
