use crate::args::{display_value, infer_value, split_assignment};
use crate::error::{CliError, Result};
use serde_json::Value;
use shellpilot::{DataLayer, Session};
use tracing::info;

pub async fn get(session: &Session, name: &str) -> Result<()> {
    let data = DataLayer::attach(session).await?;
    let value = data.get_pref(name).await?;
    println!("{name}={}", display_value(&value));
    Ok(())
}

/// Write a preference, then re-read it to report whether the value stuck.
/// The data layer setter itself does not verify; the re-read is this
/// command's job.
pub async fn set(session: &Session, assignment: &str) -> Result<()> {
    let (name, raw) = split_assignment(assignment)?;
    let value = infer_value(raw);
    let data = DataLayer::attach(session).await?;

    match &value {
        Value::Bool(flag) => data.set_bool_pref(name, *flag).await?,
        Value::Number(n) => {
            data.set_int_pref(name, n.as_i64().unwrap_or_default())
                .await?
        }
        _ => data.set_char_pref(name, raw).await?,
    }

    let written = data.get_pref(name).await?;
    if written == value {
        info!(target = "shellpilot", name, "pref verified");
        println!("{name} successfully changed to {}", display_value(&written));
        Ok(())
    } else {
        Err(CliError::Verify {
            name: name.to_string(),
            expected: display_value(&value),
            actual: display_value(&written),
        })
    }
}
