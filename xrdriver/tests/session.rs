/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use common::Harness;
use common::TIMEOUT;

use xrdriver::headless::Call;
use xrdriver::headless::HandleKind;
use xrdriver::headless::HeadlessInit;
use xrdriver::AppState;
use xrdriver::DriverConfig;
use xrdriver::StartMode;
use xrdriver::StateChange;
use xrdriver_api::Error;
use xrdriver_api::Plugin;
use xrdriver_api::PluginContext;
use xrdriver_api::ResultCode;
use xrdriver_api::RuntimeEvent;
use xrdriver_api::SessionHandle;
use xrdriver_api::SessionState;
use xrdriver_api::SpaceHandle;
use xrdriver_api::Time;

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

#[test]
fn dispose_releases_every_handle() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();
    assert_eq!(harness.app_state(), AppState::Started);
    assert_eq!(harness.controller.live(HandleKind::Instance), 1);
    assert_eq!(harness.controller.live(HandleKind::Session), 1);

    harness.driver.dispose();
    assert_eq!(harness.app_state(), AppState::Disposed);
    assert_eq!(harness.controller.live_handles(), 0);
    assert!(harness.driver.teardown_failures().is_empty());

    harness.driver.dispose();
    assert_eq!(harness.app_state(), AppState::Disposed);
    assert_eq!(harness.controller.calls(Call::DestroyInstance), 1);
}

#[test]
fn teardown_failure_is_recorded_and_stop_completes() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();
    harness
        .controller
        .fail_next(Call::DestroySession, ResultCode::ERROR_RUNTIME_FAILURE);

    harness.driver.stop();
    assert_eq!(harness.app_state(), AppState::Stopped);
    let failures = harness.driver.teardown_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].result(), Some(ResultCode::ERROR_RUNTIME_FAILURE));
    assert_eq!(harness.controller.live(HandleKind::Session), 1);
    for kind in &[
        HandleKind::Instance,
        HandleKind::Space,
        HandleKind::Swapchain,
        HandleKind::ActionSet,
        HandleKind::Action,
    ] {
        assert_eq!(harness.controller.live(*kind), 0, "{:?}", kind);
    }

    harness.start_focused();
    assert_eq!(harness.app_state(), AppState::Started);
    assert_eq!(harness.controller.live(HandleKind::Session), 2);
}

#[test]
fn failed_local_space_releases_the_view_space() {
    let mut harness = Harness::with_defaults();
    harness.controller.fail_after(
        Call::CreateReferenceSpace,
        1,
        ResultCode::ERROR_RUNTIME_FAILURE,
    );
    let err = harness.driver.start(StartMode::Render).unwrap_err();
    assert_eq!(err.result(), Some(ResultCode::ERROR_RUNTIME_FAILURE));
    assert_eq!(harness.app_state(), AppState::Initialized);
    assert_eq!(harness.controller.calls(Call::DestroySpace), 1);
    assert_eq!(harness.controller.live(HandleKind::Space), 0);
    assert_eq!(harness.controller.live(HandleKind::Session), 0);
}

#[test]
fn disposed_driver_does_not_start() {
    let mut harness = Harness::with_defaults();
    harness.driver.dispose();
    assert_eq!(harness.driver.start(StartMode::Render), Err(Error::Cancelled));
    assert_eq!(harness.controller.calls(Call::CreateInstance), 0);
}

#[test]
fn stop_then_start_negotiates_the_same_options() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();
    let first = harness.driver.render_options().cloned().unwrap();

    harness.driver.stop();
    assert_eq!(harness.app_state(), AppState::Stopped);
    assert_eq!(harness.driver.session(), SessionHandle::NULL);
    assert_eq!(harness.controller.live_handles(), 0);

    harness.start_focused();
    assert_eq!(harness.driver.render_options(), Some(&first));
    assert_eq!(harness.controller.calls(Call::CreateInstance), 2);
}

#[test]
fn stopping_session_restarts_once() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();
    let changes = harness.driver.monitor().subscribe();

    harness.controller.set_session_state(SessionState::Stopping);
    assert!(harness.wait_for_session(SessionState::Stopping));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(false));
    assert_eq!(harness.app_state(), AppState::Started);
    assert_eq!(harness.controller.calls(Call::EndSession), 1);
    assert_eq!(harness.controller.calls(Call::BeginSession), 2);

    let apps: Vec<_> = changes
        .try_iter()
        .filter_map(|change| match change {
            StateChange::App { to, .. } => Some(to),
            StateChange::Session { .. } => None,
        })
        .collect();
    assert_eq!(apps, vec![AppState::Restarting, AppState::Started]);

    assert!(harness.wait_for_session(SessionState::Focused));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
}

#[test]
fn exit_request_ends_in_a_stop_request() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();

    harness.driver.request_exit().unwrap();
    assert!(harness.wait_for_session(SessionState::Stopping));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(false));
    assert!(harness
        .driver
        .monitor()
        .wait_timeout(|s| s.app == AppState::StopRequested, TIMEOUT)
        .is_some());
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(false));

    harness.driver.stop();
    assert_eq!(harness.app_state(), AppState::Stopped);
    assert_eq!(harness.controller.live_handles(), 0);
}

#[test]
fn start_waits_for_the_runtime() {
    let init = HeadlessInit {
        auto_lifecycle: false,
        ..HeadlessInit::default()
    };
    let mut harness = Harness::new(init, DriverConfig::default());
    let stop = harness.driver.stop_handle();
    let controller = harness.controller.clone();
    let helper = thread::spawn(move || {
        let created = stop
            .monitor()
            .wait_timeout(|s| s.app == AppState::SessionCreated, TIMEOUT);
        assert!(created.is_some());
        controller.set_session_state(SessionState::Ready);
    });

    harness.driver.start(StartMode::Render).unwrap();
    helper.join().unwrap();
    assert_eq!(harness.app_state(), AppState::Started);
    assert_eq!(harness.controller.calls(Call::BeginSession), 1);
}

#[test]
fn stop_request_cancels_a_pending_start() {
    let init = HeadlessInit {
        auto_lifecycle: false,
        ..HeadlessInit::default()
    };
    let mut harness = Harness::new(init, DriverConfig::default());
    let stop = harness.driver.stop_handle();
    let helper = thread::spawn(move || {
        let created = stop
            .monitor()
            .wait_timeout(|s| s.app == AppState::SessionCreated, TIMEOUT);
        assert!(created.is_some());
        assert!(stop.request_stop());
    });

    assert_eq!(harness.driver.start(StartMode::Render), Err(Error::Cancelled));
    helper.join().unwrap();
    assert_eq!(harness.app_state(), AppState::Initialized);
    assert_eq!(harness.controller.live(HandleKind::Session), 0);
    assert_eq!(harness.controller.live(HandleKind::Instance), 1);
    assert_eq!(harness.controller.calls(Call::BeginSession), 0);
}

#[test]
fn failed_initialize_returns_to_created() {
    let mut harness = Harness::with_defaults();
    harness
        .controller
        .fail_next(Call::CreateInstance, ResultCode::ERROR_RUNTIME_FAILURE);

    let err = harness.driver.start(StartMode::Render).unwrap_err();
    assert_eq!(err.result(), Some(ResultCode::ERROR_RUNTIME_FAILURE));
    assert_eq!(harness.app_state(), AppState::Created);
    assert_eq!(harness.controller.live_handles(), 0);

    harness.start_focused();
    assert_eq!(harness.app_state(), AppState::Started);
}

#[test]
fn failed_session_creation_keeps_the_instance() {
    let mut harness = Harness::with_defaults();
    harness
        .controller
        .fail_next(Call::CreateSession, ResultCode::ERROR_RUNTIME_FAILURE);

    let err = harness.driver.start(StartMode::Render).unwrap_err();
    assert_eq!(err.result(), Some(ResultCode::ERROR_RUNTIME_FAILURE));
    assert_eq!(harness.app_state(), AppState::Initialized);
    assert_eq!(harness.controller.live(HandleKind::Instance), 1);

    harness.start_focused();
    assert_eq!(harness.controller.calls(Call::CreateInstance), 1);
}

#[test]
fn query_mode_never_begins() {
    let mut harness = Harness::with_defaults();
    harness.driver.start(StartMode::Query).unwrap();
    assert_eq!(harness.app_state(), AppState::Started);
    assert!(harness.driver.render_options().is_some());
    assert!(harness.driver.view_info().is_some());
    assert_eq!(harness.controller.calls(Call::BeginSession), 0);
    assert_eq!(harness.controller.live(HandleKind::Swapchain), 0);

    match harness.driver.render_frame(SpaceHandle::NULL) {
        Err(Error::InvalidState { operation, .. }) => assert_eq!(operation, "render_frame"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn events_for_stale_sessions_are_ignored() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();

    harness.controller.push_event(RuntimeEvent::SessionStateChanged {
        session: SessionHandle(0xdead),
        state: SessionState::Exiting,
        time: Time(0),
    });
    harness.controller.set_session_state(SessionState::Visible);
    assert!(harness.wait_for_session(SessionState::Visible));
    assert_eq!(harness.app_state(), AppState::Started);
}

#[test]
fn instance_loss_requests_a_stop() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();

    harness
        .controller
        .push_event(RuntimeEvent::InstanceLossPending { loss_time: Time(0) });
    assert!(harness
        .driver
        .monitor()
        .wait_timeout(|s| s.app == AppState::StopRequested, TIMEOUT)
        .is_some());
}

#[test]
fn plugins_and_layers_are_added_while_idle() {
    let mut harness = Harness::with_defaults();
    harness.start_focused();
    let counter = Arc::new(AtomicUsize::new(0));
    match harness.driver.add_plugin(Box::new(Counting::new("late", &counter))) {
        Err(Error::InvalidState { operation, .. }) => assert_eq!(operation, "add_plugin"),
        other => panic!("unexpected {:?}", other),
    }

    harness.driver.stop();
    harness
        .driver
        .add_plugin(Box::new(Counting::new("late", &counter)))
        .unwrap();
}

struct Counting {
    name: &'static str,
    sessions: Arc<AtomicUsize>,
    fail_session: bool,
    fail_instance: bool,
}

impl Counting {
    fn new(name: &'static str, sessions: &Arc<AtomicUsize>) -> Self {
        Counting {
            name,
            sessions: sessions.clone(),
            fail_session: false,
            fail_instance: false,
        }
    }
}

impl Plugin for Counting {
    fn name(&self) -> &str {
        self.name
    }

    fn on_instance_created(&mut self, _ctx: &PluginContext) -> Result<(), Error> {
        if self.fail_instance {
            return Err(Error::BackendSpecific("no device".into()));
        }
        Ok(())
    }

    fn on_session_created(&mut self, _ctx: &PluginContext) -> Result<(), Error> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        if self.fail_session {
            return Err(Error::BackendSpecific("broken".into()));
        }
        Ok(())
    }
}

#[test]
fn failing_plugin_hook_does_not_stop_the_others() {
    let mut harness = Harness::with_defaults();
    let counter = Arc::new(AtomicUsize::new(0));
    let mut broken = Counting::new("broken", &counter);
    broken.fail_session = true;
    harness.driver.add_plugin(Box::new(broken)).unwrap();
    harness
        .driver
        .add_plugin(Box::new(Counting::new("healthy", &counter)))
        .unwrap();

    harness.start_focused();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(harness.app_state(), AppState::Started);
}

#[test]
fn plugin_failing_on_instance_creation_fails_initialize() {
    let mut harness = Harness::with_defaults();
    let counter = Arc::new(AtomicUsize::new(0));
    let mut plugin = Counting::new("device", &counter);
    plugin.fail_instance = true;
    harness.driver.add_plugin(Box::new(plugin)).unwrap();

    match harness.driver.start(StartMode::Render) {
        Err(Error::Plugin { name, .. }) => assert_eq!(name, "device"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(harness.app_state(), AppState::Created);
    assert_eq!(harness.controller.live_handles(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}
