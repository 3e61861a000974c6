//! App management facade.
//!
//! Stateless wrappers over scoped script calls into the `ShellApps` atom.
//! Queries go through the scoped executor and leave the session target
//! untouched; `launch` and `switch_to_displayed_app` deliberately move the
//! frame target and use raw switches instead.

use crate::app::App;
use crate::atoms;
use crate::executor::{Scope, ScriptMode};
use crate::session::Session;
use crate::truthy;
use serde_json::{Value, json};
use shellpilot_runtime::{Error, Result};
use std::time::Duration;

/// Origin of the first-time-use app.
///
/// [`Apps::kill_all`] terminates it before sweeping the remaining user apps;
/// left running it interferes with the sweep.
pub const FIRST_TIME_USE_ORIGIN: &str = "app://ftu.shell.os";

/// Options for [`Apps::launch`] and [`Apps::launch_with_manifest_url`].
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Entry point within the app manifest
    pub entry_point: Option<String>,
    /// Switch the session frame into the launched app (default true)
    pub switch_to_frame: bool,
    /// Per-call launch timeout; `None` uses the session default
    pub timeout: Option<Duration>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            entry_point: None,
            switch_to_frame: true,
            timeout: None,
        }
    }
}

/// App management operations.
#[derive(Clone)]
pub struct Apps {
    session: Session,
}

impl Apps {
    /// Attach to a session, loading the app management atom.
    pub async fn attach(session: &Session) -> Result<Self> {
        session.import_script(atoms::SHELL_APPS).await?;
        Ok(Self {
            session: session.clone(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Launch an app by display name.
    ///
    /// Fails with [`Error::Launch`] when the remote call returns no frame id.
    /// On success the session frame is switched into the app unless
    /// `switch_to_frame` was disabled.
    pub async fn launch(&self, name: &str, options: Option<LaunchOptions>) -> Result<App> {
        let options = options.unwrap_or_default();
        self.session.switch_to_frame(None).await?;
        let result = self
            .session
            .execute_async_script(
                "return ShellApps.launchWithName(arguments[0], arguments[1]);",
                json!([name, options.entry_point]),
                options.timeout,
            )
            .await?;
        self.launched(result, name, options.switch_to_frame).await
    }

    /// Launch an app by manifest URL.
    pub async fn launch_with_manifest_url(
        &self,
        manifest_url: &str,
        options: Option<LaunchOptions>,
    ) -> Result<App> {
        let options = options.unwrap_or_default();
        self.session.switch_to_frame(None).await?;
        let result = self
            .session
            .execute_async_script(
                "return ShellApps.launchWithManifestURL(arguments[0], arguments[1]);",
                json!([manifest_url, options.entry_point]),
                options.timeout,
            )
            .await?;
        self.launched(result, manifest_url, options.switch_to_frame)
            .await
    }

    async fn launched(&self, result: Value, requested: &str, switch_to_frame: bool) -> Result<App> {
        if !truthy(&result) {
            return Err(Error::Launch {
                app: requested.to_string(),
            });
        }
        let app = App::from_value(&result);
        // No app frame means the launch did not actually bring anything up.
        let frame = app.frame.clone().ok_or_else(|| Error::Launch {
            app: requested.to_string(),
        })?;
        if switch_to_frame {
            self.session.switch_to_frame(Some(&frame)).await?;
        }
        tracing::debug!(app = ?app.name, frame, "app launched");
        Ok(app)
    }

    /// The currently displayed app.
    ///
    /// Top-level content query; the session target is restored afterwards.
    pub async fn displayed_app(&self) -> Result<App> {
        let value = self
            .session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Sync,
                "return ShellApps.getDisplayedApp();",
                json!([]),
                None,
            )
            .await?;
        Ok(App::from_value(&value))
    }

    /// Point the session at the displayed app's frame.
    pub async fn switch_to_displayed_app(&self) -> Result<()> {
        let displayed = self.displayed_app().await?;
        self.session.switch_to_default_content().await?;
        self.session
            .switch_to_frame(displayed.frame.as_deref())
            .await
    }

    /// Running apps; `include_system` also lists otherwise hidden system apps.
    pub async fn running_apps(&self, include_system: bool) -> Result<Vec<App>> {
        let value = self
            .session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Sync,
                "return ShellApps.getRunningApps(arguments[0]);",
                json!([include_system]),
                None,
            )
            .await?;
        let by_origin = value
            .as_object()
            .ok_or_else(|| Error::ProtocolError("running apps: expected an object".to_string()))?;
        Ok(by_origin.values().map(App::from_value).collect())
    }

    /// Installed apps, one entry per manifest entry point.
    ///
    /// Role-bearing apps (system, keyboard, ...) are not user-launchable and
    /// are filtered out.
    pub async fn installed_apps(&self) -> Result<Vec<App>> {
        let value = self
            .session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Async,
                "return ShellApps.getInstalledApps();",
                json!([]),
                None,
            )
            .await?;
        let entries = value
            .as_array()
            .ok_or_else(|| Error::ProtocolError("installed apps: expected a list".to_string()))?;

        let mut apps = Vec::new();
        for entry in entries {
            let manifest = &entry["manifest"];
            if !manifest["role"].is_null() {
                continue;
            }
            let origin = entry["origin"].as_str().map(str::to_string);
            match manifest["entry_points"].as_object() {
                Some(entry_points) => {
                    for entry_point in entry_points.values() {
                        apps.push(App {
                            origin: origin.clone(),
                            name: entry_point["name"].as_str().map(str::to_string),
                            ..App::default()
                        });
                    }
                }
                None => apps.push(App {
                    origin: origin.clone(),
                    name: manifest["name"].as_str().map(str::to_string),
                    ..App::default()
                }),
            }
        }
        Ok(apps)
    }

    /// Whether an app with the given name is installed.
    pub async fn is_app_installed(&self, name: &str) -> Result<bool> {
        let value = self
            .session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Async,
                "return ShellApps.locateWithName(arguments[0]);",
                json!([name]),
                None,
            )
            .await?;
        Ok(truthy(&value))
    }

    /// Terminate one running app.
    pub async fn kill(&self, app: &App) -> Result<()> {
        let origin = app
            .origin
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("kill: app has no origin".to_string()))?;
        let value = self
            .session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Async,
                "return ShellApps.kill(arguments[0]);",
                json!([origin]),
                None,
            )
            .await?;
        if !truthy(&value) {
            return Err(Error::OperationFailed {
                operation: format!("kill {origin}"),
            });
        }
        tracing::debug!(origin, "app killed");
        Ok(())
    }

    /// Terminate all user apps.
    ///
    /// Two-phase teardown: the first-time-use app is terminated first when
    /// present, then the remaining user apps are swept in one call.
    pub async fn kill_all(&self) -> Result<()> {
        for app in self.running_apps(true).await? {
            if app.origin.as_deref() == Some(FIRST_TIME_USE_ORIGIN) {
                self.kill(&app).await?;
                break;
            }
        }

        self.session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Async,
                "return ShellApps.killAll();",
                json!([]),
                None,
            )
            .await?;
        Ok(())
    }

    /// Read one permission of an installed app.
    pub async fn permission(&self, app_name: &str, permission: &str) -> Result<Value> {
        self.session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Async,
                "return ShellApps.getPermission(arguments[0], arguments[1]);",
                json!([app_name, permission]),
                None,
            )
            .await
    }

    /// Set one permission of an installed app.
    pub async fn set_permission(
        &self,
        app_name: &str,
        permission: &str,
        value: &str,
    ) -> Result<()> {
        self.session
            .run_scoped(
                &Scope::content_top(),
                ScriptMode::Async,
                "return ShellApps.setPermission(arguments[0], arguments[1], arguments[2]);",
                json!([app_name, permission, value]),
                None,
            )
            .await?;
        Ok(())
    }
}
