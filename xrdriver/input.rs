/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Action declarations, binding suggestions and per-frame input state.

use crate::config::EXT_HAND_TRACKING;
use crate::resources::note_failure;

use xrdriver_api::check;
use xrdriver_api::ActionHandle;
use xrdriver_api::ActionSetHandle;
use xrdriver_api::ActionState;
use xrdriver_api::ActionType;
use xrdriver_api::Error;
use xrdriver_api::Hand;
use xrdriver_api::HandJointLocation;
use xrdriver_api::HandTrackerHandle;
use xrdriver_api::HapticVibration;
use xrdriver_api::InstanceHandle;
use xrdriver_api::PathHandle;
use xrdriver_api::Posef;
use xrdriver_api::ResultCode;
use xrdriver_api::Runtime;
use xrdriver_api::SessionHandle;
use xrdriver_api::SpaceHandle;
use xrdriver_api::SpaceLocation;
use xrdriver_api::Time;
use xrdriver_api::Vector2f;
use xrdriver_api::XrDuration;

use log::debug;
use log::info;
use log::warn;

/// The latest value of an input action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputValue {
    Bool(bool),
    Float(f32),
    Vector2(Vector2f),
    /// The action space located in the render space, if tracked.
    Pose(Option<SpaceLocation>),
    /// Haptic outputs carry no value.
    None,
}

impl InputValue {
    fn default_for(kind: ActionType) -> InputValue {
        match kind {
            ActionType::Bool => InputValue::Bool(false),
            ActionType::Float => InputValue::Float(0.),
            ActionType::Vector2 => InputValue::Vector2(Vector2f::default()),
            ActionType::Pose => InputValue::Pose(None),
            ActionType::Haptic => InputValue::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputState {
    pub is_active: bool,
    pub changed_since_last_sync: bool,
    pub last_change_time: Time,
    pub value: InputValue,
}

/// A set of suggested bindings for one interaction profile.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionProfile {
    path: String,
    bindings: Vec<(String, String)>,
}

impl InteractionProfile {
    pub fn new(path: &str) -> Self {
        InteractionProfile {
            path: path.into(),
            bindings: vec![],
        }
    }

    pub fn bind(mut self, action: &str, path: &str) -> Self {
        self.bindings.push((action.into(), path.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bindings(&self) -> &[(String, String)] {
        &self.bindings
    }
}

struct Input {
    name: String,
    kind: ActionType,
    subaction_path: Option<String>,
    handle: ActionHandle,
    subaction: PathHandle,
    space: SpaceHandle,
    state: InputState,
}

impl Input {
    fn update(
        &mut self,
        runtime: &dyn Runtime,
        session: SessionHandle,
        base: SpaceHandle,
        time: Time,
    ) {
        let state = match self.kind {
            ActionType::Bool => runtime
                .action_state_bool(session, self.handle, self.subaction)
                .map(|s| from_action_state(s, InputValue::Bool)),
            ActionType::Float => runtime
                .action_state_float(session, self.handle, self.subaction)
                .map(|s| from_action_state(s, InputValue::Float)),
            ActionType::Vector2 => runtime
                .action_state_vector2(session, self.handle, self.subaction)
                .map(|s| from_action_state(s, InputValue::Vector2)),
            ActionType::Pose => {
                let space = self.space;
                runtime
                    .action_state_pose(session, self.handle, self.subaction)
                    .map(|is_active| {
                        let location = if is_active && !space.is_null() {
                            runtime.locate_space(space, base, time).ok()
                        } else {
                            None
                        };
                        let changed = location != self.pose();
                        InputState {
                            is_active,
                            changed_since_last_sync: changed,
                            last_change_time: if changed {
                                time
                            } else {
                                self.state.last_change_time
                            },
                            value: InputValue::Pose(location),
                        }
                    })
            }
            ActionType::Haptic => return,
        };
        match state {
            Ok(state) => self.state = state,
            Err(result) => {
                debug!("Failed to read action {}: {}", self.name, result);
                self.state.is_active = false;
            }
        }
    }

    fn pose(&self) -> Option<SpaceLocation> {
        match self.state.value {
            InputValue::Pose(location) => location,
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.handle = ActionHandle::NULL;
        self.subaction = PathHandle::NULL;
        self.space = SpaceHandle::NULL;
        self.state = InputState {
            is_active: false,
            changed_since_last_sync: false,
            last_change_time: Time::default(),
            value: InputValue::default_for(self.kind),
        };
    }
}

fn from_action_state<T: Copy>(state: ActionState<T>, wrap: fn(T) -> InputValue) -> InputState {
    InputState {
        is_active: state.is_active,
        changed_since_last_sync: state.changed_since_last_sync,
        last_change_time: state.last_change_time,
        value: wrap(state.current_state),
    }
}

/// The joints of one hand as of the last focused frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandState {
    pub hand: Hand,
    /// `None` while the runtime doesn't track the hand.
    pub joints: Option<Vec<HandJointLocation>>,
}

struct HandInput {
    tracker: HandTrackerHandle,
    state: HandState,
}

/// Declares actions, suggests their bindings and tracks their state.
///
/// Actions are declared before the session starts. They are created and
/// attached while the session starts and survive a stop, so the next
/// start recreates them. Tracked hands follow the same rules.
#[derive(Default)]
pub struct ActionBinder {
    inputs: Vec<Input>,
    hands: Vec<HandInput>,
    profiles: Vec<InteractionProfile>,
    action_set: ActionSetHandle,
    attached: bool,
}

impl ActionBinder {
    pub fn new() -> Self {
        ActionBinder::default()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn declare(
        &mut self,
        name: &str,
        kind: ActionType,
        subaction_path: Option<&str>,
    ) -> Result<(), Error> {
        if self.attached {
            return Err(Error::ActionsAttached);
        }
        if self.inputs.iter().any(|i| i.name == name) {
            return Err(Error::Protocol {
                result: ResultCode::ERROR_NAME_DUPLICATED,
                context: format!("declare {}", name),
            });
        }
        self.inputs.push(Input {
            name: name.into(),
            kind,
            subaction_path: subaction_path.map(Into::into),
            handle: ActionHandle::NULL,
            subaction: PathHandle::NULL,
            space: SpaceHandle::NULL,
            state: InputState {
                is_active: false,
                changed_since_last_sync: false,
                last_change_time: Time::default(),
                value: InputValue::default_for(kind),
            },
        });
        Ok(())
    }

    /// Tracks the joints of `hand`. Needs the hand tracking extension;
    /// without it the hand never reports joints.
    pub fn add_hand(&mut self, hand: Hand) -> Result<(), Error> {
        if self.attached {
            return Err(Error::ActionsAttached);
        }
        if self.hands.iter().any(|h| h.state.hand == hand) {
            return Err(Error::Protocol {
                result: ResultCode::ERROR_NAME_DUPLICATED,
                context: format!("add_hand {:?}", hand),
            });
        }
        self.hands.push(HandInput {
            tracker: HandTrackerHandle::NULL,
            state: HandState { hand, joints: None },
        });
        Ok(())
    }

    /// Adds the extensions the declarations need to `extensions`.
    pub fn request_extensions(&self, extensions: &mut Vec<String>) {
        if !self.hands.is_empty() && !extensions.iter().any(|e| e == EXT_HAND_TRACKING) {
            extensions.push(EXT_HAND_TRACKING.into());
        }
    }

    /// Suggests `path` for `action` under `profile`.
    pub fn bind(&mut self, profile: &str, action: &str, path: &str) -> Result<(), Error> {
        if self.attached {
            return Err(Error::ActionsAttached);
        }
        if !self.inputs.iter().any(|i| i.name == action) {
            return Err(Error::UnknownAction(action.into()));
        }
        match self.profiles.iter_mut().find(|p| p.path == profile) {
            Some(existing) => existing.bindings.push((action.into(), path.into())),
            None => self
                .profiles
                .push(InteractionProfile::new(profile).bind(action, path)),
        }
        Ok(())
    }

    pub fn with_profile(&mut self, profile: InteractionProfile) -> Result<(), Error> {
        for (action, path) in &profile.bindings {
            self.bind(&profile.path, action, path)?;
        }
        Ok(())
    }

    pub fn profiles(&self) -> &[InteractionProfile] {
        &self.profiles
    }

    /// Creates the declared actions, suggests every profile and attaches
    /// the action set to the session.
    ///
    /// An action or profile the runtime rejects is skipped with a warning.
    /// Only a failed attach is an error.
    pub fn initialize(
        &mut self,
        runtime: &dyn Runtime,
        instance: InstanceHandle,
        session: SessionHandle,
        action_set: ActionSetHandle,
    ) -> Result<(), Error> {
        if self.attached {
            return Err(Error::ActionsAttached);
        }
        self.action_set = action_set;

        for input in self.inputs.iter_mut() {
            if let Err(e) = create_action(runtime, instance, session, action_set, input) {
                warn!("Skipping action {}: {}", input.name, e);
                let handle = input.handle.take();
                if !handle.is_null() {
                    if let Err(result) = runtime.destroy_action(handle) {
                        warn!("Failed to destroy action {}: {}", input.name, result);
                    }
                }
                input.reset();
            }
        }

        for profile in &self.profiles {
            match suggest(runtime, instance, profile, &self.inputs) {
                Ok(count) => info!("Suggested {} bindings for {}", count, profile.path),
                Err(e) => warn!("Interaction profile {} rejected: {}", profile.path, e),
            }
        }

        check(
            runtime.attach_action_sets(session, &[action_set]),
            "xrAttachSessionActionSets",
        )?;
        self.attached = true;
        Ok(())
    }

    /// Creates a tracker for every added hand. A hand the runtime can't
    /// track is skipped with a warning.
    pub fn create_hand_trackers(&mut self, runtime: &dyn Runtime, session: SessionHandle) {
        for hand in self.hands.iter_mut().filter(|h| h.tracker.is_null()) {
            match check(
                runtime.create_hand_tracker(session, hand.state.hand),
                "xrCreateHandTrackerEXT",
            ) {
                Ok(tracker) => {
                    debug!("Tracking the {:?} hand", hand.state.hand);
                    hand.tracker = tracker;
                }
                Err(e) => warn!("Skipping the {:?} hand: {}", hand.state.hand, e),
            }
        }
    }

    /// Locates the joints of every tracked hand in `base`.
    pub fn locate_hands(&mut self, runtime: &dyn Runtime, base: SpaceHandle, time: Time) {
        for hand in self.hands.iter_mut().filter(|h| !h.tracker.is_null()) {
            hand.state.joints = match runtime.locate_hand_joints(hand.tracker, base, time) {
                Ok(joints) => joints,
                Err(result) => {
                    debug!("Failed to locate the {:?} hand: {}", hand.state.hand, result);
                    None
                }
            };
        }
    }

    /// Syncs the action set and refreshes every input. On failure every
    /// input reads as inactive for this frame.
    pub fn sync(
        &mut self,
        runtime: &dyn Runtime,
        session: SessionHandle,
        base: SpaceHandle,
        time: Time,
    ) -> bool {
        if !self.attached {
            return false;
        }
        if let Err(result) = runtime.sync_actions(session, &[self.action_set]) {
            warn!("Failed to sync actions: {}", result);
            self.mark_inactive();
            return false;
        }
        for input in self.inputs.iter_mut().filter(|i| !i.handle.is_null()) {
            input.update(runtime, session, base, time);
        }
        true
    }

    pub fn mark_inactive(&mut self) {
        for input in self.inputs.iter_mut() {
            input.state.is_active = false;
            input.state.changed_since_last_sync = false;
        }
        for hand in self.hands.iter_mut() {
            hand.state.joints = None;
        }
    }

    pub fn state(&self, name: &str) -> Option<&InputState> {
        self.inputs.iter().find(|i| i.name == name).map(|i| &i.state)
    }

    pub fn hand(&self, hand: Hand) -> Option<&HandState> {
        self.hands
            .iter()
            .find(|h| h.state.hand == hand)
            .map(|h| &h.state)
    }

    pub fn action(&self, name: &str) -> Option<ActionHandle> {
        self.find(name).ok().map(|i| i.handle)
    }

    pub fn action_space(&self, name: &str) -> Option<SpaceHandle> {
        self.find(name)
            .ok()
            .map(|i| i.space)
            .filter(|s| !s.is_null())
    }

    pub fn bool_value(&self, name: &str) -> Result<bool, Error> {
        match self.find(name)?.state.value {
            InputValue::Bool(v) => Ok(v),
            _ => Err(Error::ActionKindMismatch(name.into())),
        }
    }

    pub fn float_value(&self, name: &str) -> Result<f32, Error> {
        match self.find(name)?.state.value {
            InputValue::Float(v) => Ok(v),
            _ => Err(Error::ActionKindMismatch(name.into())),
        }
    }

    pub fn vector2_value(&self, name: &str) -> Result<Vector2f, Error> {
        match self.find(name)?.state.value {
            InputValue::Vector2(v) => Ok(v),
            _ => Err(Error::ActionKindMismatch(name.into())),
        }
    }

    pub fn pose_value(&self, name: &str) -> Result<Option<SpaceLocation>, Error> {
        match self.find(name)?.state.value {
            InputValue::Pose(v) => Ok(v),
            _ => Err(Error::ActionKindMismatch(name.into())),
        }
    }

    pub fn vibrate(
        &self,
        runtime: &dyn Runtime,
        session: SessionHandle,
        name: &str,
        amplitude: f32,
        frequency: f32,
        duration: XrDuration,
    ) -> Result<(), Error> {
        let input = self.haptic(name)?;
        let vibration = HapticVibration {
            duration,
            frequency,
            amplitude,
        };
        check(
            runtime.apply_haptic_feedback(session, input.handle, input.subaction, &vibration),
            "xrApplyHapticFeedback",
        )
    }

    pub fn stop_haptic(
        &self,
        runtime: &dyn Runtime,
        session: SessionHandle,
        name: &str,
    ) -> Result<(), Error> {
        let input = self.haptic(name)?;
        check(
            runtime.stop_haptic_feedback(session, input.handle, input.subaction),
            "xrStopHapticFeedback",
        )
    }

    /// Destroys hand trackers, action spaces and actions; declarations
    /// are kept.
    pub fn destroy(&mut self, runtime: &dyn Runtime, failures: &mut Vec<Error>) {
        for hand in self.hands.iter_mut().rev() {
            let tracker = hand.tracker.take();
            if !tracker.is_null() {
                note_failure(
                    failures,
                    runtime.destroy_hand_tracker(tracker),
                    "xrDestroyHandTrackerEXT",
                );
            }
            hand.state.joints = None;
        }
        for input in self.inputs.iter_mut().rev() {
            let space = input.space.take();
            if !space.is_null() {
                note_failure(failures, runtime.destroy_space(space), "xrDestroySpace");
            }
            let handle = input.handle.take();
            if !handle.is_null() {
                note_failure(failures, runtime.destroy_action(handle), "xrDestroyAction");
            }
            input.reset();
        }
        self.action_set = ActionSetHandle::NULL;
        self.attached = false;
    }

    fn find(&self, name: &str) -> Result<&Input, Error> {
        self.inputs
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::UnknownAction(name.into()))
    }

    fn haptic(&self, name: &str) -> Result<&Input, Error> {
        let input = self.find(name)?;
        if input.kind != ActionType::Haptic {
            return Err(Error::ActionKindMismatch(name.into()));
        }
        if input.handle.is_null() {
            return Err(Error::InvalidState {
                operation: "vibrate",
                state: "action not created".into(),
            });
        }
        Ok(input)
    }
}

fn create_action(
    runtime: &dyn Runtime,
    instance: InstanceHandle,
    session: SessionHandle,
    action_set: ActionSetHandle,
    input: &mut Input,
) -> Result<(), Error> {
    let subactions = match input.subaction_path {
        Some(ref path) => {
            input.subaction = check(runtime.string_to_path(instance, path), "xrStringToPath")?;
            vec![input.subaction]
        }
        None => vec![],
    };
    input.handle = check(
        runtime.create_action(action_set, &input.name, &input.name, input.kind, &subactions),
        "xrCreateAction",
    )?;
    if input.kind == ActionType::Pose {
        input.space = check(
            runtime.create_action_space(session, input.handle, input.subaction, Posef::IDENTITY),
            "xrCreateActionSpace",
        )?;
    }
    debug!("Created {:?} action {}", input.kind, input.name);
    Ok(())
}

fn suggest(
    runtime: &dyn Runtime,
    instance: InstanceHandle,
    profile: &InteractionProfile,
    inputs: &[Input],
) -> Result<usize, Error> {
    let profile_path = check(
        runtime.string_to_path(instance, &profile.path),
        "xrStringToPath",
    )?;
    let mut bindings = Vec::with_capacity(profile.bindings.len());
    for (action, path) in &profile.bindings {
        let handle = match inputs.iter().find(|i| &i.name == action) {
            Some(input) if !input.handle.is_null() => input.handle,
            _ => {
                debug!("Leaving out binding of missing action {}", action);
                continue;
            }
        };
        let path = check(runtime.string_to_path(instance, path), "xrStringToPath")?;
        bindings.push((handle, path));
    }
    check(
        runtime.suggest_interaction_profile_bindings(instance, profile_path, &bindings),
        "xrSuggestInteractionProfileBindings",
    )?;
    Ok(bindings.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles;

    #[test]
    fn duplicate_declaration_is_rejected() {
        let mut binder = ActionBinder::new();
        binder.declare("select", ActionType::Bool, None).unwrap();
        let err = binder.declare("select", ActionType::Float, None).unwrap_err();
        assert_eq!(err.result(), Some(ResultCode::ERROR_NAME_DUPLICATED));
    }

    #[test]
    fn binding_needs_a_declared_action() {
        let mut binder = ActionBinder::new();
        assert_eq!(
            binder.bind(
                profiles::KHR_SIMPLE_CONTROLLER,
                "grab",
                "/user/hand/left/input/select/click"
            ),
            Err(Error::UnknownAction("grab".into()))
        );
    }

    #[test]
    fn bindings_are_grouped_by_profile() {
        let mut binder = ActionBinder::new();
        binder.declare("select", ActionType::Bool, None).unwrap();
        binder.declare("menu", ActionType::Bool, None).unwrap();
        binder
            .with_profile(
                InteractionProfile::new(profiles::KHR_SIMPLE_CONTROLLER)
                    .bind("select", "/user/hand/right/input/select/click"),
            )
            .unwrap();
        binder
            .bind(
                profiles::KHR_SIMPLE_CONTROLLER,
                "menu",
                "/user/hand/left/input/menu/click",
            )
            .unwrap();
        assert_eq!(binder.profiles().len(), 1);
        assert_eq!(binder.profiles()[0].bindings().len(), 2);
    }

    #[test]
    fn hands_are_added_once_and_request_the_extension() {
        let mut binder = ActionBinder::new();
        let mut extensions = vec![];
        binder.request_extensions(&mut extensions);
        assert!(extensions.is_empty());

        binder.add_hand(Hand::Left).unwrap();
        binder.add_hand(Hand::Right).unwrap();
        let err = binder.add_hand(Hand::Left).unwrap_err();
        assert_eq!(err.result(), Some(ResultCode::ERROR_NAME_DUPLICATED));
        assert_eq!(binder.hand(Hand::Right).unwrap().joints, None);

        binder.request_extensions(&mut extensions);
        binder.request_extensions(&mut extensions);
        assert_eq!(extensions, vec![EXT_HAND_TRACKING.to_owned()]);
    }

    #[test]
    fn typed_getters_check_the_kind() {
        let mut binder = ActionBinder::new();
        binder.declare("trigger", ActionType::Float, None).unwrap();
        assert_eq!(binder.float_value("trigger"), Ok(0.));
        assert_eq!(
            binder.bool_value("trigger"),
            Err(Error::ActionKindMismatch("trigger".into()))
        );
        assert_eq!(
            binder.bool_value("missing"),
            Err(Error::UnknownAction("missing".into()))
        );
    }
}
