use crate::error::Result;
use shellpilot::{Apps, Device, Session};
use tracing::info;

pub async fn execute(session: &Session, button: &str) -> Result<()> {
    let device = Device::new(session);
    let apps = Apps::attach(session).await?;

    device.turn_screen_on().await?;
    let displayed = apps.displayed_app().await?;
    info!(
        target = "shellpilot",
        app = ?displayed.name,
        button,
        "pressing into displayed app"
    );
    apps.switch_to_displayed_app().await?;
    device.press_button(button).await?;
    Ok(())
}
