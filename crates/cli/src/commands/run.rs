use crate::error::Result;
use shellpilot::{Apps, Device, Orientation, Session};
use tracing::info;

pub async fn execute(session: &Session, name: &str) -> Result<()> {
    let device = Device::new(session);
    let apps = Apps::attach(session).await?;

    device.turn_screen_on().await?;
    let orientation = device.screen_orientation().await?;
    info!(
        target = "shellpilot",
        current = orientation.as_str(),
        "normalizing orientation"
    );
    device.change_orientation(Orientation::PortraitPrimary).await?;

    // The screen may still need unlocking before the app can come up.
    info!(target = "shellpilot", app = name, "launching");
    let app = apps.launch(name, None).await?;
    apps.switch_to_displayed_app().await?;
    let displayed = apps.displayed_app().await?;

    println!(
        "{} ({}) is running in frame {}",
        displayed.name.as_deref().unwrap_or(name),
        displayed.origin.as_deref().unwrap_or("unknown origin"),
        app.frame_id().unwrap_or("?"),
    );
    Ok(())
}
