use crate::args::{display_value, split_assignment};
use crate::error::{CliError, Result};
use serde_json::Value;
use shellpilot::{DataLayer, Session};
use tracing::info;

pub async fn get(session: &Session, name: &str) -> Result<()> {
    let data = DataLayer::attach(session).await?;
    let value = data.get_setting(name).await?;
    println!("{name}={}", display_value(&value));
    Ok(())
}

/// Write a setting, then re-read it to report whether the value stuck.
pub async fn set(session: &Session, assignment: &str) -> Result<()> {
    let (name, raw) = split_assignment(assignment)?;
    let data = DataLayer::attach(session).await?;

    let value = Value::from(raw);
    data.set_setting(name, &value).await?;

    let written = data.get_setting(name).await?;
    if written == value {
        info!(target = "shellpilot", name, "setting verified");
        println!("{name} successfully changed to {raw}");
        Ok(())
    } else {
        Err(CliError::Verify {
            name: name.to_string(),
            expected: raw.to_string(),
            actual: display_value(&written),
        })
    }
}

pub async fn get_all(session: &Session) -> Result<()> {
    let data = DataLayer::attach(session).await?;
    let settings = data.all_settings().await?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
