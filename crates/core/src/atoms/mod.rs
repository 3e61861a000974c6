//! Remote-side script libraries (atoms), injected with
//! [`Session::import_script`](crate::Session::import_script).
//!
//! Async entry points report their result through `__shellScriptFinished`,
//! the completion callback the remote async-script executor installs.

/// App management entry points (`ShellApps.*`).
pub const SHELL_APPS: &str = include_str!("shell_apps.js");

/// Settings, preference, radio, and contact entry points (`ShellDataLayer.*`).
pub const SHELL_DATA_LAYER: &str = include_str!("shell_data_layer.js");

/// Lock screen helper (`ShellLockScreen.unlock`).
pub const SHELL_LOCK_SCREEN: &str = include_str!("shell_lock_screen.js");
