//! Application descriptors returned by shell queries.

use serde::Deserialize;
use serde_json::Value;

/// A running or installed application.
///
/// Instances are snapshots: never mutated after construction, a fresh query
/// yields a fresh instance. Equality is structural across all fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct App {
    /// Unique app origin (e.g. `app://camera.shell.os`)
    #[serde(default)]
    pub origin: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Frame id hosting the app; `None` until launched/displayed
    #[serde(default)]
    pub frame: Option<String>,
    /// Source reference of the app frame
    #[serde(default)]
    pub src: Option<String>,
}

impl App {
    /// Map a loose remote payload to a descriptor, tolerating absent fields.
    pub(crate) fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// The frame hosting the app, when it has one.
    pub fn frame_id(&self) -> Option<&str> {
        self.frame.as_deref()
    }
}
