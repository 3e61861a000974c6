//! Device facade: screen power, lock state, orientation, buttons, screenshots.

use crate::apps::Apps;
use crate::atoms;
use crate::executor::{self, DEFAULT_POLL_INTERVAL, Scope, ScriptMode};
use crate::screenshot::Screenshot;
use crate::session::Session;
use crate::truthy;
use serde_json::json;
use shellpilot_runtime::{Error, Result};
use std::str::FromStr;

/// Button names the shell handles as generic UI events. Anything else is
/// dispatched as a synthetic key-down/key-up pair.
pub const SHELL_EVENT_BUTTONS: [&str; 5] =
    ["home", "volumeup", "volumedown", "holdstar", "holdhash"];

/// The four orientation states the screen can be locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    PortraitPrimary,
    LandscapePrimary,
    PortraitSecondary,
    LandscapeSecondary,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::PortraitPrimary => "portrait-primary",
            Orientation::LandscapePrimary => "landscape-primary",
            Orientation::PortraitSecondary => "portrait-secondary",
            Orientation::LandscapeSecondary => "landscape-secondary",
        }
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "portrait-primary" => Ok(Orientation::PortraitPrimary),
            "landscape-primary" => Ok(Orientation::LandscapePrimary),
            "portrait-secondary" => Ok(Orientation::PortraitSecondary),
            "landscape-secondary" => Ok(Orientation::LandscapeSecondary),
            other => Err(Error::InvalidArgument(format!(
                "unknown orientation: {other}"
            ))),
        }
    }
}

const DISPATCH_SHELL_EVENT: &str =
    "window.wrappedJSObject.dispatchEvent(new Event(arguments[0]));";

const DISPATCH_KEY_DOWN: &str =
    "window.wrappedJSObject.dispatchEvent(new KeyboardEvent('keydown', { key: arguments[0] }));";

const DISPATCH_KEY_UP: &str =
    "window.wrappedJSObject.dispatchEvent(new KeyboardEvent('keyup', { key: arguments[0] }));";

const PRESS_SLEEP_BUTTON: &str = "window.wrappedJSObject.dispatchEvent(\
     new KeyboardEvent('beforekeydown', { key: 'Power' }));";

const VOLUME_UP_DOWN_TIMES: &str = r#"
function sendEvent(key, type) {
  var name = type === 'press' ? 'afterkeydown' : 'afterkeyup';
  window.wrappedJSObject.dispatchEvent(new KeyboardEvent(name, { key: key }));
}
for (var i = 0; i < arguments[0]; ++i) {
  sendEvent('VolumeUp', 'press');
  sendEvent('VolumeUp', 'release');
  sendEvent('VolumeDown', 'press');
  sendEvent('VolumeDown', 'release');
}
"#;

/// Locks the orientation and waits for the change to land. Completes right
/// away when the screen already matches, so callers never hang on a change
/// that will not happen.
const CHANGE_ORIENTATION: &str = r#"
if (arguments[0] === arguments[1]) {
  __shellScriptFinished(true);
} else {
  var expected = arguments[1];
  window.screen.addEventListener('orientationchange', function onChange() {
    if (window.screen.orientation === expected) {
      window.screen.removeEventListener('orientationchange', onChange);
      __shellScriptFinished(true);
    }
  });
  window.screen.lockOrientation(expected);
}
"#;

const TAKE_SCREENSHOT: &str = r#"
return (function takeScreenshot() {
  var canvas = document.createElementNS('http://www.w3.org/1999/xhtml', 'canvas');
  var width = window.innerWidth;
  var height = window.innerHeight;
  canvas.setAttribute('width', width);
  canvas.setAttribute('height', height);

  var context = canvas.getContext('2d');
  var flags =
    context.DRAWWINDOW_DRAW_CARET |
    context.DRAWWINDOW_DRAW_VIEW |
    context.DRAWWINDOW_USE_WIDGET_LAYERS;

  context.drawWindow(window, 0, 0, width, height, 'rgb(255,255,255)', flags);

  return context.canvas.toDataURL('image/png');
}.apply(this, arguments));
"#;

/// Device-level operations.
#[derive(Clone)]
pub struct Device {
    session: Session,
}

impl Device {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn turn_screen_on(&self) -> Result<()> {
        self.session
            .execute_script(
                "window.wrappedJSObject.ScreenManager.turnScreenOn(true);",
                json!([]),
            )
            .await?;
        Ok(())
    }

    pub async fn turn_screen_off(&self) -> Result<()> {
        self.session
            .execute_script(
                "window.wrappedJSObject.ScreenManager.turnScreenOff(true);",
                json!([]),
            )
            .await?;
        Ok(())
    }

    pub async fn is_screen_enabled(&self) -> Result<bool> {
        let value = self
            .session
            .execute_script(
                "return window.wrappedJSObject.ScreenManager.screenEnabled;",
                json!([]),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn is_locked(&self) -> Result<bool> {
        let value = self
            .session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Sync,
                "return window.wrappedJSObject.Service.locked;",
                json!([]),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Lock the screen.
    ///
    /// Cycling the screen off and on engages the lock; the call then asserts
    /// the locked flag and waits for the lock UI to animate in.
    pub async fn lock(&self) -> Result<()> {
        self.turn_screen_off().await?;
        self.turn_screen_on().await?;
        if !self.is_locked().await? {
            return Err(Error::OperationFailed {
                operation: "lock screen".to_string(),
            });
        }

        let session = self.session.clone();
        executor::wait_until(
            "lock screen visible",
            self.session.default_timeout(),
            DEFAULT_POLL_INTERVAL,
            async move || {
                session.find_element("div.lockScreenWindow.active").await?;
                Ok(true)
            },
        )
        .await
    }

    /// Unlock the screen via the injected lock-screen helper.
    pub async fn unlock(&self) -> Result<()> {
        self.session.import_script(atoms::SHELL_LOCK_SCREEN).await?;
        self.session.switch_to_frame(None).await?;
        let result = self
            .session
            .execute_async_script("return ShellLockScreen.unlock();", json!([]), None)
            .await?;
        if !truthy(&result) {
            return Err(Error::OperationFailed {
                operation: "unlock screen".to_string(),
            });
        }
        Ok(())
    }

    /// Press a hardware or keyboard button.
    ///
    /// Names in [`SHELL_EVENT_BUTTONS`] dispatch one generic UI event at the
    /// top-level document; everything else dispatches a key-down/key-up pair
    /// carrying the name as the key.
    pub async fn press_button(&self, button: &str) -> Result<()> {
        if SHELL_EVENT_BUTTONS.contains(&button) {
            tracing::debug!(button, "dispatching shell event");
            self.session
                .run_scoped(
                    &Scope::content_top(),
                    ScriptMode::Sync,
                    DISPATCH_SHELL_EVENT,
                    json!([button]),
                    None,
                )
                .await?;
        } else {
            tracing::debug!(key = button, "dispatching key pair");
            self.session
                .execute_script(DISPATCH_KEY_DOWN, json!([button]))
                .await?;
            self.session
                .execute_script(DISPATCH_KEY_UP, json!([button]))
                .await?;
        }
        Ok(())
    }

    pub async fn press_sleep_button(&self) -> Result<()> {
        self.session
            .execute_script(PRESS_SLEEP_BUTTON, json!([]))
            .await?;
        Ok(())
    }

    pub async fn hold_home_button(&self) -> Result<()> {
        self.dispatch_shell_event("holdhome").await
    }

    pub async fn hold_sleep_button(&self) -> Result<()> {
        self.dispatch_shell_event("holdsleep").await
    }

    /// Press and release volume up then down, `times` times.
    pub async fn press_release_volume_up_then_down(&self, times: u32) -> Result<()> {
        self.session
            .execute_script(VOLUME_UP_DOWN_TIMES, json!([times]))
            .await?;
        Ok(())
    }

    /// Return to the homescreen and leave the session targeting its frame.
    pub async fn touch_home_button(&self, apps: &Apps) -> Result<()> {
        let displayed = apps.displayed_app().await?;
        let on_home = displayed
            .name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case("homescreen"));

        if !on_home {
            self.dispatch_shell_event("home").await?;
            let apps_probe = apps.clone();
            executor::wait_until(
                "homescreen displayed",
                self.session.default_timeout(),
                DEFAULT_POLL_INTERVAL,
                async move || {
                    let app = apps_probe.displayed_app().await?;
                    Ok(app
                        .name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case("homescreen")))
                },
            )
            .await?;
            apps.switch_to_displayed_app().await
        } else {
            // Already home: the home event scrolls the homescreen to the top.
            apps.switch_to_displayed_app().await?;
            self.dispatch_shell_event("home").await?;
            let session = self.session.clone();
            executor::wait_until(
                "homescreen scrolled to top",
                self.session.default_timeout(),
                DEFAULT_POLL_INTERVAL,
                async move || {
                    let y = session
                        .execute_script("return window.wrappedJSObject.scrollY;", json!([]))
                        .await?;
                    Ok(y.as_f64() == Some(0.0))
                },
            )
            .await
        }
    }

    async fn dispatch_shell_event(&self, name: &str) -> Result<()> {
        self.session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Sync,
                DISPATCH_SHELL_EVENT,
                json!([name]),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn screen_orientation(&self) -> Result<Orientation> {
        let value = self
            .session
            .execute_script("return window.screen.orientation;", json!([]))
            .await?;
        value
            .as_str()
            .ok_or_else(|| Error::ProtocolError("orientation query returned no string".to_string()))?
            .parse()
    }

    /// Lock the screen orientation and wait for the change to apply.
    ///
    /// Completes immediately when the screen is already oriented as
    /// requested; there is no remote event to wait for in that case.
    pub async fn change_orientation(&self, orientation: Orientation) -> Result<()> {
        let current = self.screen_orientation().await?;
        self.session
            .execute_async_script(
                CHANGE_ORIENTATION,
                json!([current.as_str(), orientation.as_str()]),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn screen_width(&self) -> Result<u64> {
        let value = self
            .session
            .execute_script("return window.screen.width;", json!([]))
            .await?;
        value
            .as_u64()
            .ok_or_else(|| Error::ProtocolError("screen width query returned no number".to_string()))
    }

    /// Capture the screen.
    ///
    /// Runs in the elevated context; the previous context is restored before
    /// returning.
    pub async fn take_screenshot(&self) -> Result<Screenshot> {
        let value = self
            .session
            .run_scoped(
                &Scope::chrome(),
                ScriptMode::Sync,
                TAKE_SCREENSHOT,
                json!([]),
                None,
            )
            .await?;
        let data_url = value.as_str().ok_or_else(|| {
            Error::ProtocolError("screenshot did not return a data URL".to_string())
        })?;
        Ok(Screenshot::from_data_url(data_url))
    }

    /// Whether the device has any network connection established.
    pub async fn is_online(&self) -> Result<bool> {
        let value = self
            .session
            .execute_script("return window.navigator.onLine;", json!([]))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Platform name reported by the session capabilities.
    pub fn platform_name(&self) -> Option<String> {
        self.session
            .capabilities()
            .get("platformName")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}
