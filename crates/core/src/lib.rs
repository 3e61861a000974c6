//! shellpilot: remote control for a mobile device's UI shell
//!
//! This crate drives the home screen, installed apps, settings, and radios of
//! a device by sending script-execution commands to the automation server
//! embedded in the shell and interpreting the JSON results.
//!
//! # Example
//!
//! ```ignore
//! use shellpilot::{Apps, Device, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::connect("localhost", 2828).await?;
//!     session.start_session().await?;
//!
//!     let device = Device::new(&session);
//!     let apps = Apps::attach(&session).await?;
//!
//!     device.turn_screen_on().await?;
//!     let camera = apps.launch("camera", None).await?;
//!     assert!(camera.frame_id().is_some());
//!
//!     apps.kill_all().await?;
//!     session.delete_session().await?;
//!     Ok(())
//! }
//! ```
//!
//! The interesting part of the client is the session/context state machine:
//! every command runs against the session's current execution context
//! (content or chrome) and frame target, and operations that need a different
//! target acquire it through the scoped executor, which always restores the
//! previous target afterwards. See [`Session::run_scoped`].

pub mod app;
pub mod apps;
mod atoms;
pub mod contact;
pub mod data;
pub mod device;
pub mod executor;
pub mod screenshot;
pub mod session;

pub use app::App;
pub use apps::{Apps, FIRST_TIME_USE_ORIGIN, LaunchOptions};
pub use contact::{Contact, ContactField};
pub use data::DataLayer;
pub use device::{Device, Orientation, SHELL_EVENT_BUTTONS};
pub use executor::{DEFAULT_POLL_INTERVAL, FrameTarget, Scope, ScriptMode, wait_until};
pub use screenshot::Screenshot;
pub use session::{Context, Session};

// Re-export the runtime error types; there is one error enum for the stack.
pub use shellpilot_runtime;
pub use shellpilot_runtime::{Error, Result};

use std::time::Duration;

/// Default timeout for remote script execution.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// JavaScript truthiness of a remote result, used by the facade assertions
/// that turn falsy/absent results into named errors.
pub(crate) fn truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
