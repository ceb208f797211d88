/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use common::Harness;

use xrdriver::headless::Call;
use xrdriver::headless::HandleKind;
use xrdriver::headless::HeadlessInit;
use xrdriver::headless::HeadlessInput;
use xrdriver::profiles;
use xrdriver::DriverConfig;
use xrdriver::InteractionProfile;
use xrdriver::EXT_HAND_TRACKING;
use xrdriver_api::ActionType;
use xrdriver_api::Error;
use xrdriver_api::Hand;
use xrdriver_api::HapticVibration;
use xrdriver_api::Posef;
use xrdriver_api::SessionState;
use xrdriver_api::SpaceHandle;
use xrdriver_api::Vector2f;
use xrdriver_api::Vector3f;
use xrdriver_api::XrDuration;
use xrdriver_api::HAND_JOINT_COUNT;

const SELECT: &str = "/user/hand/right/input/select/click";
const TRIGGER: &str = "/user/hand/right/input/trigger/value";

fn declare_controls(harness: &mut Harness) {
    let actions = harness.driver.actions_mut();
    actions.declare("select", ActionType::Bool, None).unwrap();
    actions.declare("trigger", ActionType::Float, None).unwrap();
    actions.declare("move", ActionType::Vector2, None).unwrap();
    actions
        .declare("aim", ActionType::Pose, Some(profiles::RIGHT_HAND))
        .unwrap();
    actions
        .declare("buzz", ActionType::Haptic, Some(profiles::RIGHT_HAND))
        .unwrap();
    actions
        .bind(profiles::KHR_SIMPLE_CONTROLLER, "select", SELECT)
        .unwrap();
    actions
        .with_profile(
            InteractionProfile::new(profiles::OCULUS_TOUCH_CONTROLLER)
                .bind("trigger", TRIGGER)
                .bind("move", "/user/hand/right/input/thumbstick")
                .bind("aim", "/user/hand/right/input/aim/pose")
                .bind("buzz", "/user/hand/right/output/haptic"),
        )
        .unwrap();
}

#[test]
fn inputs_are_read_while_focused() {
    let mut harness = Harness::with_defaults();
    declare_controls(&mut harness);
    harness.start_focused();
    assert!(harness.driver.actions().is_attached());
    assert_eq!(harness.controller.live(HandleKind::Action), 5);

    harness.controller.set_input("select", HeadlessInput::Bool(true));
    harness.controller.set_input("trigger", HeadlessInput::Float(0.75));
    harness
        .controller
        .set_input("move", HeadlessInput::Vector2(Vector2f { x: 0.5, y: -1. }));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));

    let actions = harness.driver.actions();
    assert_eq!(actions.bool_value("select"), Ok(true));
    assert_eq!(actions.float_value("trigger"), Ok(0.75));
    assert_eq!(actions.vector2_value("move"), Ok(Vector2f { x: 0.5, y: -1. }));
    let select = actions.state("select").unwrap();
    assert!(select.is_active);
    assert!(select.changed_since_last_sync);

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    let select = harness.driver.actions().state("select").unwrap();
    assert!(select.is_active);
    assert!(!select.changed_since_last_sync);
    assert_eq!(harness.driver.actions().bool_value("select"), Ok(true));
}

#[test]
fn inputs_are_inactive_without_focus() {
    let mut harness = Harness::with_defaults();
    declare_controls(&mut harness);
    harness.start_focused();
    harness.controller.set_input("select", HeadlessInput::Bool(true));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert!(harness.driver.actions().state("select").unwrap().is_active);

    harness.controller.set_session_state(SessionState::Visible);
    assert!(harness.wait_for_session(SessionState::Visible));
    let syncs = harness.controller.calls(Call::SyncActions);
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.calls(Call::SyncActions), syncs);
    assert!(!harness.driver.actions().state("select").unwrap().is_active);
}

#[test]
fn pose_actions_are_located_in_the_render_space() {
    let mut harness = Harness::with_defaults();
    declare_controls(&mut harness);
    harness.start_focused();
    assert!(harness.driver.actions().action_space("aim").is_some());
    assert_eq!(harness.driver.actions().pose_value("aim"), Ok(None));

    let pose = Posef {
        position: Vector3f {
            x: 0.2,
            y: 1.1,
            z: -0.4,
        },
        ..Posef::IDENTITY
    };
    harness.controller.set_input("aim", HeadlessInput::Pose(pose));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    let location = harness.driver.actions().pose_value("aim").unwrap().unwrap();
    assert_eq!(location.pose, pose);
    assert!(harness.driver.actions().state("aim").unwrap().changed_since_last_sync);

    harness.controller.clear_input("aim");
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.driver.actions().pose_value("aim"), Ok(None));
    assert!(!harness.driver.actions().state("aim").unwrap().is_active);
}

#[test]
fn unchanged_pose_keeps_its_change_time() {
    let mut harness = Harness::with_defaults();
    declare_controls(&mut harness);
    harness.start_focused();
    harness
        .controller
        .set_input("aim", HeadlessInput::Pose(Posef::IDENTITY));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    let first = *harness.driver.actions().state("aim").unwrap();
    assert!(first.changed_since_last_sync);

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    let second = *harness.driver.actions().state("aim").unwrap();
    assert!(second.is_active);
    assert!(!second.changed_since_last_sync);
    assert_eq!(second.last_change_time, first.last_change_time);
}

#[test]
fn tracked_hands_report_joints_while_focused() {
    let mut harness = Harness::with_defaults();
    harness.driver.actions_mut().add_hand(Hand::Left).unwrap();
    harness.driver.actions_mut().add_hand(Hand::Right).unwrap();
    harness.start_focused();
    assert!(harness
        .driver
        .enabled_extensions()
        .iter()
        .any(|e| e == EXT_HAND_TRACKING));
    assert_eq!(harness.controller.live(HandleKind::HandTracker), 2);

    let pose = Posef {
        position: Vector3f {
            x: -0.1,
            y: 1.2,
            z: -0.3,
        },
        ..Posef::IDENTITY
    };
    harness.controller.set_hand_pose(Hand::Left, Some(pose));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.calls(Call::LocateHandJoints), 2);
    let left = harness.driver.actions().hand(Hand::Left).unwrap();
    let joints = left.joints.as_ref().unwrap();
    assert_eq!(joints.len(), HAND_JOINT_COUNT);
    assert!(joints.iter().all(|j| j.pose == pose));
    assert_eq!(harness.driver.actions().hand(Hand::Right).unwrap().joints, None);

    harness.controller.set_session_state(SessionState::Visible);
    assert!(harness.wait_for_session(SessionState::Visible));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.calls(Call::LocateHandJoints), 2);
    assert_eq!(harness.driver.actions().hand(Hand::Left).unwrap().joints, None);

    harness.driver.stop();
    assert_eq!(harness.controller.live(HandleKind::HandTracker), 0);
    assert!(harness.driver.teardown_failures().is_empty());
}

#[test]
fn hands_stay_untracked_without_the_extension() {
    let init = HeadlessInit {
        extensions: vec![],
        ..HeadlessInit::default()
    };
    let mut harness = Harness::new(init, DriverConfig::default());
    harness.driver.actions_mut().add_hand(Hand::Left).unwrap();
    harness.start_focused();
    assert!(harness.driver.enabled_extensions().is_empty());
    assert_eq!(harness.controller.calls(Call::CreateHandTracker), 0);

    harness
        .controller
        .set_hand_pose(Hand::Left, Some(Posef::IDENTITY));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.calls(Call::LocateHandJoints), 0);
    assert_eq!(harness.driver.actions().hand(Hand::Left).unwrap().joints, None);
}

#[test]
fn rejected_profile_is_skipped() {
    let init = HeadlessInit {
        unsupported_profiles: vec![profiles::OCULUS_TOUCH_CONTROLLER.into()],
        ..HeadlessInit::default()
    };
    let mut harness = Harness::new(init, DriverConfig::default());
    declare_controls(&mut harness);
    harness.start_focused();
    assert!(harness.driver.actions().is_attached());
    assert_eq!(harness.controller.calls(Call::SuggestBindings), 2);

    harness.controller.set_input("select", HeadlessInput::Bool(true));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.driver.actions().bool_value("select"), Ok(true));
}

#[test]
fn declarations_close_once_attached() {
    let mut harness = Harness::with_defaults();
    declare_controls(&mut harness);
    harness.start_focused();
    assert_eq!(
        harness
            .driver
            .actions_mut()
            .declare("grab", ActionType::Bool, None),
        Err(Error::ActionsAttached)
    );
    assert_eq!(
        harness
            .driver
            .actions_mut()
            .bind(profiles::KHR_SIMPLE_CONTROLLER, "select", SELECT),
        Err(Error::ActionsAttached)
    );

    harness.driver.stop();
    assert_eq!(harness.controller.live(HandleKind::Action), 0);
    harness
        .driver
        .actions_mut()
        .declare("grab", ActionType::Bool, None)
        .unwrap();
    harness.start_focused();
    assert_eq!(harness.controller.live(HandleKind::Action), 6);
}

#[test]
fn cancelled_start_recreates_the_action_set() {
    let init = HeadlessInit {
        auto_lifecycle: false,
        ..HeadlessInit::default()
    };
    let mut harness = Harness::new(init, DriverConfig::default());
    declare_controls(&mut harness);
    let stop = harness.driver.stop_handle();
    let helper = std::thread::spawn(move || {
        let attached = stop.monitor().wait_timeout(
            |s| s.app == xrdriver::AppState::SessionCreated,
            common::TIMEOUT,
        );
        assert!(attached.is_some());
        stop.request_stop();
    });
    assert_eq!(
        harness.driver.start(xrdriver::StartMode::Render),
        Err(Error::Cancelled)
    );
    helper.join().unwrap();
    assert_eq!(harness.controller.live(HandleKind::ActionSet), 0);
    assert_eq!(harness.controller.live(HandleKind::Action), 0);

    let controller = harness.controller.clone();
    let ready = std::thread::spawn(move || {
        while controller.live(HandleKind::Session) == 0 {
            std::thread::yield_now();
        }
        controller.set_session_state(SessionState::Ready);
    });
    harness.driver.start(xrdriver::StartMode::Render).unwrap();
    ready.join().unwrap();
    assert_eq!(harness.controller.live(HandleKind::ActionSet), 1);
    assert_eq!(harness.controller.live(HandleKind::Action), 5);
}

#[test]
fn haptics_reach_the_runtime() {
    let mut harness = Harness::with_defaults();
    declare_controls(&mut harness);
    harness.start_focused();

    let duration = XrDuration::from_nanos(20_000_000);
    harness.driver.vibrate("buzz", 0.5, 160., duration).unwrap();
    harness.driver.stop_haptic("buzz").unwrap();
    assert_eq!(
        harness.controller.haptics(),
        vec![(
            "buzz".to_owned(),
            HapticVibration {
                duration,
                frequency: 160.,
                amplitude: 0.5,
            }
        )]
    );
    assert_eq!(harness.controller.calls(Call::StopHapticFeedback), 1);
    assert_eq!(
        harness.driver.vibrate("select", 1., 0., duration),
        Err(Error::ActionKindMismatch("select".into()))
    );
}
