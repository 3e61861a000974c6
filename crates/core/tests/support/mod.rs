//! A scripted in-process stand-in for the shell's automation server.
//!
//! Speaks the real wire protocol over a loopback socket: hello frame on
//! accept, then `<length>:<body>` framed request/response JSON. Script
//! execution is emulated by matching on the snippet text and mutating a
//! shared [`ShellState`] that tests inspect afterwards.

#![allow(dead_code)]

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use serde_json::{Value, json};
use shellpilot::Session;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const LOCK_UI_SELECTOR: &str = "div.lockScreenWindow.active";
pub const SCREENSHOT_BYTES: &[u8] = b"fake-png-bytes";

/// Marker the fake pushes into the kill log when `killAll` sweeps.
pub const KILL_ALL_MARKER: &str = "__all__";

#[derive(Debug)]
pub struct ShellState {
    pub context: String,
    pub frame: Option<String>,
    /// Every command received, in order: (name, parameters)
    pub command_log: Vec<(String, Value)>,
    /// Generic shell events dispatched via `new Event(name)`
    pub shell_events: Vec<String>,
    /// Keyboard events dispatched: (event type, key)
    pub key_events: Vec<(String, String)>,
    /// Kill order: origins, then the kill-all marker
    pub kills: Vec<String>,
    /// Apps launchable by name: name -> full app payload
    pub launchable: HashMap<String, Value>,
    /// Currently running apps
    pub running: Vec<Value>,
    pub displayed: Option<Value>,
    pub installed: Vec<Value>,
    pub settings: HashMap<String, Value>,
    pub prefs: HashMap<String, Value>,
    pub contacts: Vec<Value>,
    /// CSS selectors currently present in the document
    pub elements: HashSet<String>,
    pub orientation: String,
    pub screen_enabled: bool,
    pub locked: bool,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            context: "content".to_string(),
            frame: None,
            command_log: Vec::new(),
            shell_events: Vec::new(),
            key_events: Vec::new(),
            kills: Vec::new(),
            launchable: HashMap::new(),
            running: Vec::new(),
            displayed: None,
            installed: Vec::new(),
            settings: HashMap::new(),
            prefs: HashMap::new(),
            contacts: Vec::new(),
            elements: HashSet::new(),
            orientation: "portrait-primary".to_string(),
            screen_enabled: false,
            locked: false,
        }
    }
}

impl ShellState {
    /// Register an app that `launchWithName` can bring up.
    pub fn install_app(&mut self, name: &str, origin: &str, frame: &str) {
        self.launchable.insert(
            name.to_string(),
            json!({
                "origin": origin,
                "name": name,
                "frame": frame,
                "src": format!("{origin}/index.html"),
            }),
        );
    }

    /// Names of the commands received, for sequence assertions.
    pub fn command_names(&self) -> Vec<String> {
        self.command_log.iter().map(|(name, _)| name.clone()).collect()
    }
}

pub struct FakeShell {
    pub state: Arc<Mutex<ShellState>>,
    port: u16,
}

impl FakeShell {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(ShellState::default()));

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            // One connection per session; tests reconnect for a fresh one.
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    serve(stream, state).await;
                });
            }
        });

        Self { state, port }
    }

    /// Connect and start a session against this fake.
    pub async fn session(&self) -> Session {
        let session = Session::connect("127.0.0.1", self.port).await.unwrap();
        session.start_session().await.unwrap();
        session
    }

    /// Connect without starting the logical session.
    pub async fn connect_only(&self) -> Session {
        Session::connect("127.0.0.1", self.port).await.unwrap()
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

async fn serve(mut stream: TcpStream, state: Arc<Mutex<ShellState>>) {
    write_frame(
        &mut stream,
        &json!({"applicationType": "shell", "protocolVersion": 3}),
    )
    .await;

    loop {
        let Some(request) = read_frame(&mut stream).await else {
            return;
        };
        let id = request["id"].as_u64().unwrap();
        let name = request["name"].as_str().unwrap().to_string();
        let parameters = request["parameters"].clone();

        state
            .lock()
            .command_log
            .push((name.clone(), parameters.clone()));

        let frame = match handle(&name, &parameters, &state) {
            Ok(value) => json!({"id": id, "value": value}),
            Err((error, message)) => {
                json!({"id": id, "error": {"error": error, "message": message}})
            }
        };
        write_frame(&mut stream, &frame).await;
    }
}

async fn write_frame(stream: &mut TcpStream, message: &Value) {
    let body = serde_json::to_vec(message).unwrap();
    let mut frame = format!("{}:", body.len()).into_bytes();
    frame.extend_from_slice(&body);
    stream.write_all(&frame).await.unwrap();
    stream.flush().await.unwrap();
}

async fn read_frame(stream: &mut TcpStream) -> Option<Value> {
    let mut length: usize = 0;
    loop {
        let mut byte = [0u8; 1];
        if stream.read_exact(&mut byte).await.is_err() {
            return None;
        }
        match byte[0] {
            b'0'..=b'9' => length = length * 10 + usize::from(byte[0] - b'0'),
            b':' => break,
            _ => return None,
        }
    }
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await.ok()?;
    serde_json::from_slice(&body).ok()
}

type Reply = Result<Value, (String, String)>;

fn handle(name: &str, parameters: &Value, state: &Arc<Mutex<ShellState>>) -> Reply {
    let mut st = state.lock();
    match name {
        "newSession" => Ok(json!({
            "sessionId": "fake-session",
            "capabilities": {"platformName": "shellos", "device": "emulator"},
        })),
        "deleteSession" => Ok(Value::Null),
        "setContext" => {
            st.context = parameters["value"].as_str().unwrap().to_string();
            Ok(Value::Null)
        }
        "switchToFrame" => {
            st.frame = parameters["id"].as_str().map(str::to_string);
            Ok(Value::Null)
        }
        "importScript" => Ok(Value::Null),
        "findElement" => {
            let selector = parameters["value"].as_str().unwrap();
            if st.elements.contains(selector) {
                Ok(json!({"element": selector}))
            } else {
                Err(("no such element".to_string(), selector.to_string()))
            }
        }
        "executeScript" | "executeAsyncScript" => run_script(&mut st, parameters),
        other => Err(("unknown command".to_string(), other.to_string())),
    }
}

fn run_script(st: &mut ShellState, parameters: &Value) -> Reply {
    let script = parameters["script"].as_str().unwrap();
    let args = &parameters["args"];

    if script.contains("explode()") {
        return Err(("javascript error".to_string(), "explode is not defined".to_string()));
    }

    // --- apps ---
    if script.contains("ShellApps.getDisplayedApp") {
        return Ok(st.displayed.clone().unwrap_or(Value::Null));
    }
    if script.contains("ShellApps.launchWithName") {
        let name = args[0].as_str().unwrap();
        return match st.launchable.get(name).cloned() {
            Some(app) => {
                if !st.running.iter().any(|a| a["origin"] == app["origin"]) {
                    st.running.push(app.clone());
                }
                st.displayed = Some(app.clone());
                Ok(app)
            }
            None => Ok(Value::Null),
        };
    }
    if script.contains("ShellApps.locateWithName") {
        let name = args[0].as_str().unwrap();
        return Ok(st.launchable.get(name).cloned().unwrap_or(json!(false)));
    }
    if script.contains("ShellApps.getRunningApps") {
        let include_system = args[0].as_bool().unwrap_or(false);
        let mut running = serde_json::Map::new();
        for app in &st.running {
            if !include_system && app["system"].as_bool().unwrap_or(false) {
                continue;
            }
            running.insert(
                app["origin"].as_str().unwrap().to_string(),
                json!({"origin": app["origin"], "name": app["name"]}),
            );
        }
        return Ok(Value::Object(running));
    }
    if script.contains("ShellApps.getInstalledApps") {
        return Ok(Value::Array(st.installed.clone()));
    }
    if script.contains("ShellApps.killAll") {
        st.kills.push(KILL_ALL_MARKER.to_string());
        st.running.retain(|app| app["system"].as_bool().unwrap_or(false));
        return Ok(json!(true));
    }
    if script.contains("ShellApps.kill") {
        let origin = args[0].as_str().unwrap().to_string();
        st.running.retain(|app| app["origin"] != origin.as_str());
        st.kills.push(origin);
        return Ok(json!(true));
    }
    if script.contains("ShellApps.getPermission") {
        return Ok(json!("prompt"));
    }
    if script.contains("ShellApps.setPermission") {
        return Ok(json!(true));
    }

    // --- device ---
    if script.contains("ScreenManager.turnScreenOn") {
        st.screen_enabled = true;
        return Ok(Value::Null);
    }
    if script.contains("ScreenManager.turnScreenOff") {
        // Cutting the screen engages the lock, and the lock UI slides in.
        st.screen_enabled = false;
        st.locked = true;
        st.elements.insert(LOCK_UI_SELECTOR.to_string());
        return Ok(Value::Null);
    }
    if script.contains("ScreenManager.screenEnabled") {
        return Ok(json!(st.screen_enabled));
    }
    if script.contains("Service.locked") {
        return Ok(json!(st.locked));
    }
    if script.contains("ShellLockScreen.unlock") {
        st.locked = false;
        st.elements.remove(LOCK_UI_SELECTOR);
        return Ok(json!(true));
    }
    if script.contains("lockOrientation") {
        let current = args[0].as_str().unwrap();
        let target = args[1].as_str().unwrap();
        if current != target {
            st.orientation = target.to_string();
        }
        return Ok(json!(true));
    }
    if script.contains("return window.screen.orientation") {
        return Ok(json!(st.orientation));
    }
    if script.contains("return window.screen.width") {
        return Ok(json!(320));
    }
    if script.contains("toDataURL") {
        return Ok(json!(format!(
            "data:image/png;base64,{}",
            STANDARD.encode(SCREENSHOT_BYTES)
        )));
    }
    if script.contains("new Event(arguments[0])") {
        st.shell_events.push(args[0].as_str().unwrap().to_string());
        return Ok(Value::Null);
    }
    if script.contains("KeyboardEvent('keydown'") {
        st.key_events
            .push(("keydown".to_string(), args[0].as_str().unwrap().to_string()));
        return Ok(Value::Null);
    }
    if script.contains("KeyboardEvent('keyup'") {
        st.key_events
            .push(("keyup".to_string(), args[0].as_str().unwrap().to_string()));
        return Ok(Value::Null);
    }
    if script.contains("'beforekeydown'") {
        st.key_events
            .push(("beforekeydown".to_string(), "Power".to_string()));
        return Ok(Value::Null);
    }
    if script.contains("navigator.onLine") {
        return Ok(json!(true));
    }
    if script.contains("scrollY") {
        return Ok(json!(0));
    }

    // --- data layer ---
    if script.contains("ShellDataLayer.getSetting") {
        let name = args[0].as_str().unwrap();
        if name == "*" {
            return Ok(json!(st.settings));
        }
        return Ok(st.settings.get(name).cloned().unwrap_or(Value::Null));
    }
    if script.contains("ShellDataLayer.setSetting") {
        let name = args[0].as_str().unwrap();
        if name.starts_with("readonly.") {
            return Ok(json!(false));
        }
        st.settings.insert(name.to_string(), args[1].clone());
        return Ok(json!(true));
    }
    if script.contains("ShellDataLayer.enableBluetooth") {
        st.settings.insert("bluetooth.enabled".to_string(), json!(true));
        return Ok(json!(true));
    }
    if script.contains("ShellDataLayer.disableBluetooth") {
        st.settings.insert("bluetooth.enabled".to_string(), json!(false));
        return Ok(json!(true));
    }
    if script.contains("ShellDataLayer.connectToCellData") {
        st.settings.insert("ril.data.enabled".to_string(), json!(true));
        return Ok(json!(true));
    }
    if script.contains("ShellDataLayer.disableCellData") {
        st.settings.insert("ril.data.enabled".to_string(), json!(false));
        return Ok(json!(true));
    }
    if script.contains("ShellDataLayer.getAllContacts") {
        return Ok(Value::Array(st.contacts.clone()));
    }
    if script.contains("ShellDataLayer.insertContact") {
        st.contacts.push(args[0].clone());
        return Ok(json!(true));
    }
    if script.contains("ShellDataLayer.removeAllContacts") {
        st.contacts.clear();
        return Ok(json!(true));
    }
    if script.starts_with("return Prefs.get") {
        let name = args[0].as_str().unwrap();
        return Ok(st.prefs.get(name).cloned().unwrap_or(Value::Null));
    }
    if script.contains("Prefs.set") {
        let name = args[0].as_str().unwrap();
        st.prefs.insert(name.to_string(), args[1].clone());
        return Ok(json!(true));
    }

    Err(("javascript error".to_string(), format!("unhandled script: {script}")))
}
