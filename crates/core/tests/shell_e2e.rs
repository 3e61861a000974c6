//! End-to-end facade behavior against the scripted fake shell.

mod support;

use serde_json::json;
use shellpilot::{
    Apps, Contact, Context, DataLayer, Device, Error, FIRST_TIME_USE_ORIGIN, Orientation,
};
use support::{FakeShell, KILL_ALL_MARKER, SCREENSHOT_BYTES};

#[tokio::test]
async fn launch_returns_app_with_frame_and_displayed_app_matches() {
    let shell = FakeShell::spawn().await;
    shell
        .state
        .lock()
        .install_app("camera", "app://camera.shell.os", "frame-camera");

    let session = shell.session().await;
    let apps = Apps::attach(&session).await.unwrap();

    let camera = apps.launch("camera", None).await.unwrap();
    assert_eq!(camera.frame_id(), Some("frame-camera"));
    assert_eq!(camera.origin.as_deref(), Some("app://camera.shell.os"));

    // Default options switch the session into the app frame.
    assert_eq!(session.frame().as_deref(), Some("frame-camera"));

    let displayed = apps.displayed_app().await.unwrap();
    assert_eq!(displayed.origin, camera.origin);

    // The displayed-app query is scoped: the frame target survives it.
    assert_eq!(session.frame().as_deref(), Some("frame-camera"));
}

#[tokio::test]
async fn launch_of_unknown_app_fails_with_launch_error() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let apps = Apps::attach(&session).await.unwrap();

    let result = apps.launch("no-such-app", None).await;
    match result {
        Err(Error::Launch { app }) => assert_eq!(app, "no-such-app"),
        other => panic!("expected Launch error, got {other:?}"),
    }
}

#[tokio::test]
async fn kill_all_terminates_first_time_use_app_first() {
    let shell = FakeShell::spawn().await;
    {
        let mut st = shell.state.lock();
        st.running.push(json!({"origin": "app://sms.shell.os", "name": "Messages"}));
        st.running
            .push(json!({"origin": FIRST_TIME_USE_ORIGIN, "name": "First Run"}));
        st.running
            .push(json!({"origin": "app://system.shell.os", "name": "System", "system": true}));
    }

    let session = shell.session().await;
    let apps = Apps::attach(&session).await.unwrap();
    apps.kill_all().await.unwrap();

    let st = shell.state.lock();
    assert_eq!(st.kills, [FIRST_TIME_USE_ORIGIN, KILL_ALL_MARKER]);
    // Only the system app survives the sweep.
    assert_eq!(st.running.len(), 1);
    assert_eq!(st.running[0]["origin"], "app://system.shell.os");
}

#[tokio::test]
async fn kill_all_without_first_time_use_app_just_sweeps() {
    let shell = FakeShell::spawn().await;
    shell
        .state
        .lock()
        .running
        .push(json!({"origin": "app://sms.shell.os", "name": "Messages"}));

    let session = shell.session().await;
    let apps = Apps::attach(&session).await.unwrap();
    apps.kill_all().await.unwrap();

    assert_eq!(shell.state.lock().kills, [KILL_ALL_MARKER]);
}

#[tokio::test]
async fn running_apps_filters_system_apps_by_default() {
    let shell = FakeShell::spawn().await;
    {
        let mut st = shell.state.lock();
        st.running.push(json!({"origin": "app://sms.shell.os", "name": "Messages"}));
        st.running
            .push(json!({"origin": "app://system.shell.os", "name": "System", "system": true}));
    }

    let session = shell.session().await;
    let apps = Apps::attach(&session).await.unwrap();

    let user_apps = apps.running_apps(false).await.unwrap();
    assert_eq!(user_apps.len(), 1);
    assert_eq!(user_apps[0].name.as_deref(), Some("Messages"));

    let all_apps = apps.running_apps(true).await.unwrap();
    assert_eq!(all_apps.len(), 2);
}

#[tokio::test]
async fn is_app_installed_reflects_the_catalog() {
    let shell = FakeShell::spawn().await;
    shell
        .state
        .lock()
        .install_app("calendar", "app://calendar.shell.os", "frame-cal");

    let session = shell.session().await;
    let apps = Apps::attach(&session).await.unwrap();

    assert!(apps.is_app_installed("calendar").await.unwrap());
    assert!(!apps.is_app_installed("missing").await.unwrap());
}

#[tokio::test]
async fn press_home_dispatches_exactly_one_shell_event() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let device = Device::new(&session);

    device.press_button("home").await.unwrap();

    let st = shell.state.lock();
    assert_eq!(st.shell_events, ["home"]);
    assert!(st.key_events.is_empty());
}

#[tokio::test]
async fn press_enter_dispatches_key_down_then_key_up() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let device = Device::new(&session);

    device.press_button("Enter").await.unwrap();

    let st = shell.state.lock();
    assert!(st.shell_events.is_empty());
    assert_eq!(
        st.key_events,
        [
            ("keydown".to_string(), "Enter".to_string()),
            ("keyup".to_string(), "Enter".to_string()),
        ]
    );
}

#[tokio::test]
async fn change_orientation_to_current_completes_immediately() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let device = Device::new(&session);

    assert_eq!(
        device.screen_orientation().await.unwrap(),
        Orientation::PortraitPrimary
    );
    device
        .change_orientation(Orientation::PortraitPrimary)
        .await
        .unwrap();
    assert_eq!(shell.state.lock().orientation, "portrait-primary");
}

#[tokio::test]
async fn change_orientation_applies_a_real_change() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let device = Device::new(&session);

    device
        .change_orientation(Orientation::LandscapePrimary)
        .await
        .unwrap();
    assert_eq!(
        device.screen_orientation().await.unwrap(),
        Orientation::LandscapePrimary
    );
}

#[tokio::test]
async fn screenshot_runs_in_chrome_and_decodes_to_the_captured_bytes() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let device = Device::new(&session);

    let shot = device.take_screenshot().await.unwrap();
    assert!(shot.as_data_url().starts_with("data:image/png;base64,"));
    assert_eq!(shot.to_bytes().unwrap(), SCREENSHOT_BYTES);

    // Elevated context did not leak.
    assert_eq!(session.context(), Context::Content);
    assert_eq!(shell.state.lock().context, "content");
}

#[tokio::test]
async fn lock_engages_and_unlock_releases() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let device = Device::new(&session);

    device.lock().await.unwrap();
    assert!(device.is_locked().await.unwrap());

    device.unlock().await.unwrap();
    assert!(!device.is_locked().await.unwrap());
}

#[tokio::test]
async fn setting_round_trips_for_bool_int_and_string() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let data = DataLayer::attach(&session).await.unwrap();

    for value in [json!(true), json!(42), json!("vibrate")] {
        data.set_setting("test.setting", &value).await.unwrap();
        assert_eq!(data.get_setting("test.setting").await.unwrap(), value);
    }
}

#[tokio::test]
async fn rejected_setting_write_is_an_update_error() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let data = DataLayer::attach(&session).await.unwrap();

    let result = data.set_setting("readonly.locale", &json!("en-US")).await;
    match result {
        Err(Error::Update { name, .. }) => assert_eq!(name, "readonly.locale"),
        other => panic!("expected Update error, got {other:?}"),
    }
}

#[tokio::test]
async fn typed_prefs_round_trip_and_restore_the_frame() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let data = DataLayer::attach(&session).await.unwrap();

    session.switch_to_frame(Some("frame-app")).await.unwrap();

    data.set_bool_pref("ui.prefers.dark", true).await.unwrap();
    assert!(data.get_bool_pref("ui.prefers.dark").await.unwrap());

    data.set_int_pref("ui.font.size", 14).await.unwrap();
    assert_eq!(data.get_int_pref("ui.font.size").await.unwrap(), 14);

    data.set_char_pref("ui.locale", "en-US").await.unwrap();
    assert_eq!(data.get_char_pref("ui.locale").await.unwrap(), "en-US");

    // Untyped read sees the same store.
    assert_eq!(data.get_pref("ui.font.size").await.unwrap(), json!(14));

    // Pref calls run at the top level but hand the frame back.
    assert_eq!(session.frame().as_deref(), Some("frame-app"));
}

#[tokio::test]
async fn contacts_round_trip_through_the_chrome_context() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let data = DataLayer::attach(&session).await.unwrap();

    let contact = Contact::new("Ada", "Lovelace");
    data.insert_contact(&contact).await.unwrap();

    let contacts = data.all_contacts().await.unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["givenName"][0], "Ada");

    data.remove_all_contacts().await.unwrap();
    assert!(data.all_contacts().await.unwrap().is_empty());

    assert_eq!(session.context(), Context::Content);
}

#[tokio::test]
async fn radio_toggles_write_through_to_settings() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let data = DataLayer::attach(&session).await.unwrap();

    data.enable_bluetooth().await.unwrap();
    assert_eq!(
        shell.state.lock().settings.get("bluetooth.enabled"),
        Some(&json!(true))
    );

    data.connect_to_cell_data().await.unwrap();
    assert!(data.is_cell_data_enabled().await.unwrap());

    data.disable_cell_data().await.unwrap();
    assert!(!data.is_cell_data_enabled().await.unwrap());
}

#[tokio::test]
async fn set_volume_fans_out_to_every_audio_channel() {
    let shell = FakeShell::spawn().await;
    let session = shell.session().await;
    let data = DataLayer::attach(&session).await.unwrap();

    data.set_volume(7).await.unwrap();

    let st = shell.state.lock();
    for channel in ["alarm", "content", "notification"] {
        assert_eq!(
            st.settings.get(&format!("audio.volume.{channel}")),
            Some(&json!(7)),
            "channel {channel}"
        );
    }
}
