//! Captured screen images.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use shellpilot_runtime::{Error, Result};
use std::path::Path;

/// A captured screenshot, held as the base64 data URL the shell returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    data_url: String,
}

impl Screenshot {
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
        }
    }

    /// The raw data URL (`data:image/png;base64,...`).
    pub fn as_data_url(&self) -> &str {
        &self.data_url
    }

    /// Decode to raw PNG bytes.
    ///
    /// Strips the URL-scheme prefix up to the first `,`, then base64-decodes
    /// the remainder. A payload without a prefix is decoded as-is.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = match self.data_url.split_once(',') {
            Some((_, payload)) => payload,
            None => self.data_url.as_str(),
        };
        STANDARD
            .decode(payload)
            .map_err(|e| Error::ProtocolError(format!("invalid screenshot payload: {e}")))
    }

    /// Write the decoded image bytes to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
