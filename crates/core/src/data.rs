//! Data layer facade: shell settings, engine preferences, radios, contacts.
//!
//! No value is ever cached locally; every read and write round-trips to the
//! remote host. Setters assert the remote reported success and fail with
//! [`Error::Update`] otherwise. They do NOT re-read the written value -
//! verification is the caller's responsibility.

use crate::atoms;
use crate::contact::Contact;
use crate::executor::{Scope, ScriptMode};
use crate::session::{Context, Session};
use crate::truthy;
use serde_json::{Value, json};
use shellpilot_runtime::{Error, Result};
use std::time::Duration;

/// Audio channels covered by [`DataLayer::set_volume`].
const VOLUME_CHANNELS: [&str; 3] = ["alarm", "content", "notification"];

/// Settings, preference, radio, and contact operations.
#[derive(Clone)]
pub struct DataLayer {
    session: Session,
}

impl DataLayer {
    /// Attach to a session, loading the data layer atom.
    ///
    /// Contact operations run from the chrome context, so the atom is loaded
    /// there as well; the content context is restored whether or not the
    /// chrome import succeeds.
    pub async fn attach(session: &Session) -> Result<Self> {
        session.import_script(atoms::SHELL_DATA_LAYER).await?;

        session.set_context(Context::Chrome).await?;
        let imported = session.import_script(atoms::SHELL_DATA_LAYER).await;
        session.set_context(Context::Content).await?;
        imported?;

        Ok(Self {
            session: session.clone(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ----- shell settings -----

    /// Read one shell setting. Settings hold arbitrary JSON values.
    pub async fn get_setting(&self, name: &str) -> Result<Value> {
        self.session
            .execute_async_script(
                "return ShellDataLayer.getSetting(arguments[0]);",
                json!([name]),
                None,
            )
            .await
    }

    /// Read every shell setting (wildcard read).
    pub async fn all_settings(&self) -> Result<Value> {
        self.get_setting("*").await
    }

    /// Write one shell setting.
    pub async fn set_setting(&self, name: &str, value: &Value) -> Result<()> {
        let result = self
            .session
            .execute_async_script(
                "return ShellDataLayer.setSetting(arguments[0], arguments[1]);",
                json!([name, value]),
                None,
            )
            .await?;
        self.check_update(&result, name, value)
    }

    /// Set every audio channel volume to `level`.
    pub async fn set_volume(&self, level: i64) -> Result<()> {
        for channel in VOLUME_CHANNELS {
            self.set_setting(&format!("audio.volume.{channel}"), &json!(level))
                .await?;
        }
        Ok(())
    }

    // ----- engine preferences -----
    //
    // Prefs are an engine-level store distinct from shell settings. Reads and
    // writes run at the top-level frame; the frame target is restored after.

    async fn pref_call(&self, script: &str, args: Value) -> Result<Value> {
        self.session
            .run_scoped(&Scope::content_top(), ScriptMode::Sync, script, args, None)
            .await
    }

    /// Untyped preference read, for callers that do not know the type.
    pub async fn get_pref(&self, name: &str) -> Result<Value> {
        self.pref_call("return Prefs.getPref(arguments[0]);", json!([name]))
            .await
    }

    pub async fn get_bool_pref(&self, name: &str) -> Result<bool> {
        let value = self
            .pref_call("return Prefs.getBoolPref(arguments[0]);", json!([name]))
            .await?;
        value
            .as_bool()
            .ok_or_else(|| Error::ProtocolError(format!("pref '{name}' is not a boolean")))
    }

    pub async fn set_bool_pref(&self, name: &str, value: bool) -> Result<()> {
        let result = self
            .pref_call(
                "return Prefs.setBoolPref(arguments[0], arguments[1]);",
                json!([name, value]),
            )
            .await?;
        self.check_update(&result, name, &json!(value))
    }

    pub async fn get_int_pref(&self, name: &str) -> Result<i64> {
        let value = self
            .pref_call("return Prefs.getIntPref(arguments[0]);", json!([name]))
            .await?;
        value
            .as_i64()
            .ok_or_else(|| Error::ProtocolError(format!("pref '{name}' is not an integer")))
    }

    pub async fn set_int_pref(&self, name: &str, value: i64) -> Result<()> {
        let result = self
            .pref_call(
                "return Prefs.setIntPref(arguments[0], arguments[1]);",
                json!([name, value]),
            )
            .await?;
        self.check_update(&result, name, &json!(value))
    }

    pub async fn get_char_pref(&self, name: &str) -> Result<String> {
        let value = self
            .pref_call("return Prefs.getCharPref(arguments[0]);", json!([name]))
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::ProtocolError(format!("pref '{name}' is not a string")))
    }

    pub async fn set_char_pref(&self, name: &str, value: &str) -> Result<()> {
        let result = self
            .pref_call(
                "return Prefs.setCharPref(arguments[0], arguments[1]);",
                json!([name, value]),
            )
            .await?;
        self.check_update(&result, name, &json!(value))
    }

    // ----- radios -----

    pub async fn is_bluetooth_enabled(&self) -> Result<bool> {
        let value = self
            .session
            .execute_script("return window.navigator.bluetooth.enabled;", json!([]))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn enable_bluetooth(&self) -> Result<()> {
        self.toggle_radio("return ShellDataLayer.enableBluetooth();", "bluetooth.enabled", true)
            .await
    }

    pub async fn disable_bluetooth(&self) -> Result<()> {
        self.toggle_radio(
            "return ShellDataLayer.disableBluetooth();",
            "bluetooth.enabled",
            false,
        )
        .await
    }

    pub async fn is_cell_data_enabled(&self) -> Result<bool> {
        Ok(self
            .get_setting("ril.data.enabled")
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    pub async fn connect_to_cell_data(&self) -> Result<()> {
        self.toggle_radio(
            "return ShellDataLayer.connectToCellData();",
            "ril.data.enabled",
            true,
        )
        .await
    }

    pub async fn disable_cell_data(&self) -> Result<()> {
        self.toggle_radio(
            "return ShellDataLayer.disableCellData();",
            "ril.data.enabled",
            false,
        )
        .await
    }

    pub async fn is_cell_data_connected(&self) -> Result<bool> {
        let value = self
            .session
            .execute_script(
                "return window.navigator.mobileConnections && \
                 window.navigator.mobileConnections[0].data.connected;",
                json!([]),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn enable_cell_roaming(&self) -> Result<()> {
        self.set_setting("ril.data.roaming_enabled", &json!(true))
            .await
    }

    pub async fn disable_cell_roaming(&self) -> Result<()> {
        self.set_setting("ril.data.roaming_enabled", &json!(false))
            .await
    }

    async fn toggle_radio(&self, script: &str, name: &str, target: bool) -> Result<()> {
        let result = self
            .session
            .run_scoped(&Scope::content_top(), ScriptMode::Async, script, json!([]), None)
            .await?;
        self.check_update(&result, name, &json!(target))
    }

    // ----- contacts (chrome context; target restored afterwards) -----

    pub async fn all_contacts(&self) -> Result<Vec<Value>> {
        let value = self
            .session
            .run_scoped(
                &Scope::chrome(),
                ScriptMode::Async,
                "return ShellDataLayer.getAllContacts();",
                json!([]),
                None,
            )
            .await?;
        value
            .as_array()
            .cloned()
            .ok_or_else(|| Error::ProtocolError("contacts query: expected a list".to_string()))
    }

    pub async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        let payload = contact.to_remote()?;
        let result = self
            .session
            .run_scoped(
                &Scope::chrome(),
                ScriptMode::Async,
                "return ShellDataLayer.insertContact(arguments[0]);",
                json!([payload]),
                None,
            )
            .await?;
        if !truthy(&result) {
            return Err(Error::OperationFailed {
                operation: format!("insert contact {}", contact.display_name()),
            });
        }
        Ok(())
    }

    /// Remove every stored contact.
    ///
    /// The script timeout scales with the number of contacts to delete.
    pub async fn remove_all_contacts(&self) -> Result<()> {
        let count = self.all_contacts().await?.len() as u64;
        let timeout = self.session.default_timeout().max(Duration::from_secs(count));
        let result = self
            .session
            .run_scoped(
                &Scope::chrome(),
                ScriptMode::Async,
                "return ShellDataLayer.removeAllContacts();",
                json!([]),
                Some(timeout),
            )
            .await?;
        if !truthy(&result) {
            return Err(Error::OperationFailed {
                operation: "remove all contacts".to_string(),
            });
        }
        Ok(())
    }

    fn check_update(&self, result: &Value, name: &str, value: &Value) -> Result<()> {
        if !truthy(result) {
            return Err(Error::Update {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}
