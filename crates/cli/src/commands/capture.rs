use std::path::Path;

use crate::error::{CliError, Result};
use shellpilot::{Device, Session};
use tracing::info;

pub async fn execute(session: &Session, output: &Path) -> Result<()> {
    let device = Device::new(session);

    let width = device.screen_width().await?;
    info!(
        target = "shellpilot",
        width,
        path = %output.display(),
        "capturing screen"
    );

    let shot = device.take_screenshot().await?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    shot.save(output).map_err(|source| CliError::Screenshot {
        path: output.to_path_buf(),
        source,
    })?;

    info!(target = "shellpilot", path = %output.display(), "screenshot saved");
    Ok(())
}
