/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! An in-process runtime with no display, driven by a controller.
//!
//! It keeps just enough state to validate call order and to count every
//! live handle, so that hosts can exercise the driver without a device.

use crate::config::EXT_HAND_TRACKING;
use crate::config::EXT_PERFORMANCE_SETTINGS;
use crate::layers::FB_PASSTHROUGH;
use crate::layers::FB_TRIANGLE_MESH;

use xrdriver_api::ActionHandle;
use xrdriver_api::ActionSetHandle;
use xrdriver_api::ActionState;
use xrdriver_api::ActionType;
use xrdriver_api::ApplicationInfo;
use xrdriver_api::CompositionLayer;
use xrdriver_api::EnvironmentBlendMode;
use xrdriver_api::EyeView;
use xrdriver_api::FormFactor;
use xrdriver_api::Fovf;
use xrdriver_api::FrameState;
use xrdriver_api::Hand;
use xrdriver_api::HandJointLocation;
use xrdriver_api::HandTrackerHandle;
use xrdriver_api::HapticVibration;
use xrdriver_api::InstanceHandle;
use xrdriver_api::InstanceProperties;
use xrdriver_api::LayerHandle;
use xrdriver_api::LocatedViews;
use xrdriver_api::PathHandle;
use xrdriver_api::PerformanceDomain;
use xrdriver_api::PerformanceLevel;
use xrdriver_api::Posef;
use xrdriver_api::ReferenceSpaceType;
use xrdriver_api::ResultCode;
use xrdriver_api::Runtime;
use xrdriver_api::RuntimeEvent;
use xrdriver_api::SessionHandle;
use xrdriver_api::SessionState;
use xrdriver_api::SpaceHandle;
use xrdriver_api::SpaceLocation;
use xrdriver_api::SpaceLocationFlags;
use xrdriver_api::SwapchainCreateInfo;
use xrdriver_api::SwapchainHandle;
use xrdriver_api::SwapchainImage;
use xrdriver_api::SystemId;
use xrdriver_api::SystemProperties;
use xrdriver_api::Time;
use xrdriver_api::Vector2f;
use xrdriver_api::Vector3f;
use xrdriver_api::ViewConfigurationProperties;
use xrdriver_api::ViewConfigurationType;
use xrdriver_api::ViewConfigurationView;
use xrdriver_api::ViewStateFlags;
use xrdriver_api::XrDuration;
use xrdriver_api::XrResult;
use xrdriver_api::HAND_JOINT_COUNT;

use euclid::Size2D;
use log::debug;

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

pub const GL_RGBA8: i64 = 0x8058;
pub const GL_SRGB8_ALPHA8: i64 = 0x8C43;
pub const GL_DEPTH_COMPONENT24: i64 = 0x81A6;

const SYSTEM: SystemId = SystemId(1);
const IPD: f32 = 0.064;
const JOINT_RADIUS: f32 = 0.01;

/// One view configuration offered by the headless system.
#[derive(Clone, Debug)]
pub struct HeadlessViewConfiguration {
    pub ty: ViewConfigurationType,
    pub fov_mutable: bool,
    pub blend_modes: Vec<EnvironmentBlendMode>,
    pub views: Vec<ViewConfigurationView>,
}

impl HeadlessViewConfiguration {
    pub fn new(ty: ViewConfigurationType, count: usize, width: i32, height: i32) -> Self {
        let view = ViewConfigurationView {
            recommended_size: Size2D::new(width, height),
            max_size: Size2D::new(width * 2, height * 2),
            recommended_sample_count: 1,
            max_sample_count: 4,
        };
        HeadlessViewConfiguration {
            ty,
            fov_mutable: true,
            blend_modes: vec![EnvironmentBlendMode::Opaque],
            views: vec![view; count],
        }
    }

    pub fn with_blend_modes(mut self, modes: &[EnvironmentBlendMode]) -> Self {
        self.blend_modes = modes.to_vec();
        self
    }
}

#[derive(Clone, Debug)]
pub struct HeadlessInit {
    pub runtime_name: String,
    pub system_name: String,
    pub extensions: Vec<String>,
    pub view_configurations: Vec<HeadlessViewConfiguration>,
    pub swapchain_formats: Vec<i64>,
    pub images_per_swapchain: u32,
    /// Interaction profiles whose suggestions are rejected.
    pub unsupported_profiles: Vec<String>,
    pub stage_available: bool,
    pub head_tracked: bool,
    /// Walks the session through its states the way a real runtime
    /// would: ready after creation, focused after begin, ready again after
    /// a stop.
    pub auto_lifecycle: bool,
    pub frame_period: XrDuration,
}

impl Default for HeadlessInit {
    fn default() -> Self {
        HeadlessInit {
            runtime_name: "Headless".into(),
            system_name: "Headless Display".into(),
            extensions: vec![
                EXT_PERFORMANCE_SETTINGS.into(),
                EXT_HAND_TRACKING.into(),
                FB_PASSTHROUGH.into(),
                FB_TRIANGLE_MESH.into(),
            ],
            view_configurations: vec![HeadlessViewConfiguration::new(
                ViewConfigurationType::PrimaryStereo,
                2,
                1440,
                1600,
            )],
            swapchain_formats: vec![GL_SRGB8_ALPHA8, GL_RGBA8, GL_DEPTH_COMPONENT24],
            images_per_swapchain: 3,
            unsupported_profiles: vec![],
            stage_available: true,
            head_tracked: true,
            auto_lifecycle: true,
            frame_period: XrDuration::from_nanos(11_111_111),
        }
    }
}

/// The runtime calls the controller can count and fail.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Call {
    EnumerateExtensions,
    CreateInstance,
    DestroyInstance,
    GetInstanceProperties,
    GetSystem,
    GetSystemProperties,
    PollEvent,
    EnumerateViewConfigurations,
    GetViewConfigurationProperties,
    EnumerateViewConfigurationViews,
    EnumerateBlendModes,
    CreateSession,
    DestroySession,
    BeginSession,
    EndSession,
    RequestExitSession,
    SetPerformanceLevel,
    CreateReferenceSpace,
    CreateActionSpace,
    DestroySpace,
    LocateSpace,
    LocateViews,
    EnumerateSwapchainFormats,
    CreateSwapchain,
    DestroySwapchain,
    EnumerateSwapchainImages,
    AcquireSwapchainImage,
    WaitSwapchainImage,
    ReleaseSwapchainImage,
    WaitFrame,
    BeginFrame,
    EndFrame,
    StringToPath,
    CreateActionSet,
    DestroyActionSet,
    CreateAction,
    DestroyAction,
    SuggestBindings,
    AttachActionSets,
    SyncActions,
    GetActionState,
    ApplyHapticFeedback,
    StopHapticFeedback,
    CreatePassthroughLayer,
    DestroyPassthroughLayer,
    CreateHandTracker,
    DestroyHandTracker,
    LocateHandJoints,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HandleKind {
    Instance,
    Session,
    Space,
    Swapchain,
    ActionSet,
    Action,
    PassthroughLayer,
    HandTracker,
}

/// A simulated input value, keyed by action name.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HeadlessInput {
    Bool(bool),
    Float(f32),
    Vector2(Vector2f),
    Pose(Posef),
}

/// What the compositor received at the end of a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedFrame {
    pub display_time: Time,
    pub blend_mode: EnvironmentBlendMode,
    pub layers: Vec<CompositionLayer>,
}

pub enum HeadlessMsg {
    SetSessionState(SessionState),
    PushEvent(RuntimeEvent),
    /// Fails `call` after letting the given number of calls through.
    FailAfter(Call, usize, ResultCode),
    SetInput(String, Option<HeadlessInput>),
    /// Every joint of the hand sits at the pose; `None` loses tracking.
    SetHandPose(Hand, Option<Posef>),
    SetHeadTracked(bool),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FramePhase {
    Idle,
    Waited,
    Begun,
}

struct SessionData {
    instance: u64,
    state: SessionState,
    view_configuration: Option<ViewConfigurationType>,
    exit_requested: bool,
    attached: bool,
    frame: FramePhase,
}

struct SwapchainData {
    images: u32,
    next: u32,
    acquired: VecDeque<u32>,
    waited: usize,
}

enum SpaceData {
    Reference,
    Action(u64),
}

struct ActionData {
    set: u64,
    name: String,
    ty: ActionType,
}

struct Fault {
    skip: usize,
    result: ResultCode,
}

struct HeadlessData {
    init: HeadlessInit,
    epoch: u64,
    next_handle: u64,
    live: HashMap<u64, HandleKind>,
    extensions: HashMap<u64, Vec<String>>,
    events: VecDeque<RuntimeEvent>,
    sessions: HashMap<u64, SessionData>,
    current_session: u64,
    spaces: HashMap<u64, SpaceData>,
    swapchains: HashMap<u64, SwapchainData>,
    actions: HashMap<u64, ActionData>,
    attached_sets: HashSet<u64>,
    paths: Vec<String>,
    inputs: HashMap<String, HeadlessInput>,
    pending_changes: HashSet<String>,
    changed: HashSet<String>,
    hands: HashMap<Hand, Posef>,
    hand_trackers: HashMap<u64, Hand>,
    faults: HashMap<Call, Fault>,
    calls: HashMap<Call, usize>,
    frames: Vec<SubmittedFrame>,
    released: Vec<SwapchainHandle>,
    haptics: Vec<(String, HapticVibration)>,
    performance: Vec<(PerformanceDomain, PerformanceLevel)>,
    head_tracked: bool,
}

/// The runtime half, handed to the session driver.
pub struct HeadlessRuntime {
    data: Arc<Mutex<HeadlessData>>,
}

/// The device half, kept by the host or test to script the runtime.
#[derive(Clone)]
pub struct HeadlessController {
    data: Arc<Mutex<HeadlessData>>,
}

fn lock(data: &Mutex<HeadlessData>) -> MutexGuard<HeadlessData> {
    data.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HeadlessRuntime {
    pub fn new(init: HeadlessInit) -> Self {
        let head_tracked = init.head_tracked;
        let data = HeadlessData {
            init,
            epoch: time::precise_time_ns(),
            next_handle: 1,
            live: HashMap::new(),
            extensions: HashMap::new(),
            events: VecDeque::new(),
            sessions: HashMap::new(),
            current_session: 0,
            spaces: HashMap::new(),
            swapchains: HashMap::new(),
            actions: HashMap::new(),
            attached_sets: HashSet::new(),
            paths: vec![],
            inputs: HashMap::new(),
            pending_changes: HashSet::new(),
            changed: HashSet::new(),
            hands: HashMap::new(),
            hand_trackers: HashMap::new(),
            faults: HashMap::new(),
            calls: HashMap::new(),
            frames: vec![],
            released: vec![],
            haptics: vec![],
            performance: vec![],
            head_tracked,
        };
        HeadlessRuntime {
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub fn controller(&self) -> HeadlessController {
        HeadlessController {
            data: self.data.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<HeadlessData> {
        lock(&self.data)
    }
}

impl HeadlessController {
    pub fn send(&self, msg: HeadlessMsg) {
        lock(&self.data).handle_msg(msg)
    }

    /// Moves the current session to `state` and queues the event.
    pub fn set_session_state(&self, state: SessionState) {
        self.send(HeadlessMsg::SetSessionState(state))
    }

    pub fn push_event(&self, event: RuntimeEvent) {
        self.send(HeadlessMsg::PushEvent(event))
    }

    /// Makes the next `call` fail with `result`.
    pub fn fail_next(&self, call: Call, result: ResultCode) {
        self.send(HeadlessMsg::FailAfter(call, 0, result))
    }

    /// Lets `skip` calls through, then fails the one after.
    pub fn fail_after(&self, call: Call, skip: usize, result: ResultCode) {
        self.send(HeadlessMsg::FailAfter(call, skip, result))
    }

    pub fn set_input(&self, action: &str, value: HeadlessInput) {
        self.send(HeadlessMsg::SetInput(action.into(), Some(value)))
    }

    pub fn clear_input(&self, action: &str) {
        self.send(HeadlessMsg::SetInput(action.into(), None))
    }

    pub fn set_head_tracked(&self, tracked: bool) {
        self.send(HeadlessMsg::SetHeadTracked(tracked))
    }

    pub fn set_hand_pose(&self, hand: Hand, pose: Option<Posef>) {
        self.send(HeadlessMsg::SetHandPose(hand, pose))
    }

    /// How often `call` was made, failed attempts included.
    pub fn calls(&self, call: Call) -> usize {
        lock(&self.data).calls.get(&call).copied().unwrap_or(0)
    }

    pub fn live(&self, kind: HandleKind) -> usize {
        lock(&self.data)
            .live
            .values()
            .filter(|k| **k == kind)
            .count()
    }

    pub fn live_handles(&self) -> usize {
        lock(&self.data).live.len()
    }

    pub fn session_state(&self) -> SessionState {
        let data = lock(&self.data);
        data.sessions
            .get(&data.current_session)
            .map_or(SessionState::Unknown, |s| s.state)
    }

    pub fn frames(&self) -> Vec<SubmittedFrame> {
        lock(&self.data).frames.clone()
    }

    /// The swapchain of every released image, in release order.
    pub fn released_images(&self) -> Vec<SwapchainHandle> {
        lock(&self.data).released.clone()
    }

    pub fn haptics(&self) -> Vec<(String, HapticVibration)> {
        lock(&self.data).haptics.clone()
    }

    pub fn performance_levels(&self) -> Vec<(PerformanceDomain, PerformanceLevel)> {
        lock(&self.data).performance.clone()
    }
}

impl HeadlessData {
    fn handle_msg(&mut self, msg: HeadlessMsg) {
        match msg {
            HeadlessMsg::SetSessionState(state) => {
                let session = self.current_session;
                if self.sessions.contains_key(&session) {
                    self.set_state(session, state);
                }
            }
            HeadlessMsg::PushEvent(event) => self.events.push_back(event),
            HeadlessMsg::FailAfter(call, skip, result) => {
                self.faults.insert(call, Fault { skip, result });
            }
            HeadlessMsg::SetInput(action, value) => {
                match value {
                    Some(value) => self.inputs.insert(action.clone(), value),
                    None => self.inputs.remove(&action),
                };
                self.pending_changes.insert(action);
            }
            HeadlessMsg::SetHeadTracked(tracked) => self.head_tracked = tracked,
            HeadlessMsg::SetHandPose(hand, pose) => {
                match pose {
                    Some(pose) => self.hands.insert(hand, pose),
                    None => self.hands.remove(&hand),
                };
            }
        }
    }

    /// Counts the call and consumes a pending fault for it.
    fn call(&mut self, call: Call) -> XrResult<()> {
        *self.calls.entry(call).or_insert(0) += 1;
        let result = match self.faults.get_mut(&call) {
            None => return Ok(()),
            Some(fault) if fault.skip > 0 => {
                fault.skip -= 1;
                return Ok(());
            }
            Some(fault) => fault.result,
        };
        self.faults.remove(&call);
        debug!("Failing {:?} with {}", call, result);
        Err(result)
    }

    fn now(&self) -> Time {
        Time(time::precise_time_ns().saturating_sub(self.epoch) as i64)
    }

    fn alloc(&mut self, kind: HandleKind) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.live.insert(handle, kind);
        handle
    }

    fn expect(&self, handle: u64, kind: HandleKind) -> XrResult<()> {
        match self.live.get(&handle) {
            Some(k) if *k == kind => Ok(()),
            _ => Err(ResultCode::ERROR_HANDLE_INVALID),
        }
    }

    fn free(&mut self, handle: u64, kind: HandleKind) -> XrResult<()> {
        self.expect(handle, kind)?;
        self.live.remove(&handle);
        Ok(())
    }

    fn session(&mut self, session: SessionHandle) -> XrResult<&mut SessionData> {
        self.expect(session.0, HandleKind::Session)?;
        self.sessions
            .get_mut(&session.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    fn set_state(&mut self, session: u64, state: SessionState) {
        let time = self.now();
        if let Some(data) = self.sessions.get_mut(&session) {
            data.state = state;
        }
        self.events.push_back(RuntimeEvent::SessionStateChanged {
            session: SessionHandle(session),
            state,
            time,
        });
    }

    fn has_extension(&self, session: u64, extension: &str) -> bool {
        self.sessions
            .get(&session)
            .and_then(|s| self.extensions.get(&s.instance))
            .map_or(false, |exts| exts.iter().any(|e| e == extension))
    }

    fn view_configuration(&self, ty: ViewConfigurationType) -> XrResult<&HeadlessViewConfiguration> {
        self.init
            .view_configurations
            .iter()
            .find(|c| c.ty == ty)
            .ok_or(ResultCode::ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED)
    }

    fn check_system(&self, instance: InstanceHandle, system: SystemId) -> XrResult<()> {
        self.expect(instance.0, HandleKind::Instance)?;
        if system != SYSTEM {
            return Err(ResultCode::ERROR_SYSTEM_INVALID);
        }
        Ok(())
    }

    /// The simulated value of an action and whether it changed at the
    /// last sync.
    fn input(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        ty: ActionType,
    ) -> XrResult<(Option<HeadlessInput>, bool)> {
        let attached = self
            .sessions
            .get(&session.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?
            .attached;
        let action = self
            .actions
            .get(&action.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
        if action.ty != ty {
            return Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH);
        }
        if !attached {
            return Err(ResultCode::ERROR_ACTIONSET_NOT_ATTACHED);
        }
        Ok((
            self.inputs.get(&action.name).copied(),
            self.changed.contains(&action.name),
        ))
    }

    fn tracked_flags(&self) -> SpaceLocationFlags {
        if self.head_tracked {
            SpaceLocationFlags::all()
        } else {
            SpaceLocationFlags::empty()
        }
    }
}

fn active<T>(value: T, changed: bool, time: Time) -> ActionState<T> {
    ActionState {
        current_state: value,
        changed_since_last_sync: changed,
        last_change_time: time,
        is_active: true,
    }
}

fn inactive<T: Default>() -> ActionState<T> {
    ActionState {
        current_state: T::default(),
        changed_since_last_sync: false,
        last_change_time: Time(0),
        is_active: false,
    }
}

fn valid_path(path: &str) -> bool {
    path.starts_with('/') && path.len() > 1 && !path.ends_with('/') && !path.contains("//")
}

impl Runtime for HeadlessRuntime {
    fn enumerate_extensions(&self) -> XrResult<Vec<String>> {
        let mut data = self.lock();
        data.call(Call::EnumerateExtensions)?;
        Ok(data.init.extensions.clone())
    }

    fn create_instance(
        &self,
        app: &ApplicationInfo,
        extensions: &[String],
    ) -> XrResult<InstanceHandle> {
        let mut data = self.lock();
        data.call(Call::CreateInstance)?;
        if app.application_name.is_empty() {
            return Err(ResultCode::ERROR_VALIDATION_FAILURE);
        }
        if let Some(missing) = extensions.iter().find(|e| !data.init.extensions.contains(e)) {
            debug!("Extension {} is not present", missing);
            return Err(ResultCode::ERROR_EXTENSION_NOT_PRESENT);
        }
        let instance = data.alloc(HandleKind::Instance);
        data.extensions.insert(instance, extensions.to_vec());
        Ok(InstanceHandle(instance))
    }

    fn destroy_instance(&self, instance: InstanceHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroyInstance)?;
        data.free(instance.0, HandleKind::Instance)?;
        data.extensions.remove(&instance.0);
        data.events.clear();
        Ok(())
    }

    fn instance_properties(&self, instance: InstanceHandle) -> XrResult<InstanceProperties> {
        let mut data = self.lock();
        data.call(Call::GetInstanceProperties)?;
        data.expect(instance.0, HandleKind::Instance)?;
        Ok(InstanceProperties {
            runtime_name: data.init.runtime_name.clone(),
            runtime_version: 1 << 48,
        })
    }

    fn system(&self, instance: InstanceHandle, form_factor: FormFactor) -> XrResult<SystemId> {
        let mut data = self.lock();
        data.call(Call::GetSystem)?;
        data.expect(instance.0, HandleKind::Instance)?;
        match form_factor {
            FormFactor::HeadMountedDisplay => Ok(SYSTEM),
            FormFactor::HandheldDisplay => Err(ResultCode::ERROR_FORM_FACTOR_UNAVAILABLE),
        }
    }

    fn system_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<SystemProperties> {
        let mut data = self.lock();
        data.call(Call::GetSystemProperties)?;
        data.check_system(instance, system)?;
        Ok(SystemProperties {
            system_name: data.init.system_name.clone(),
            vendor_id: 0,
            max_layer_count: 16,
            orientation_tracking: true,
            position_tracking: true,
        })
    }

    fn poll_event(&self, instance: InstanceHandle) -> XrResult<Option<RuntimeEvent>> {
        let mut data = self.lock();
        data.call(Call::PollEvent)?;
        data.expect(instance.0, HandleKind::Instance)?;
        Ok(data.events.pop_front())
    }

    fn enumerate_view_configurations(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<Vec<ViewConfigurationType>> {
        let mut data = self.lock();
        data.call(Call::EnumerateViewConfigurations)?;
        data.check_system(instance, system)?;
        Ok(data.init.view_configurations.iter().map(|c| c.ty).collect())
    }

    fn view_configuration_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<ViewConfigurationProperties> {
        let mut data = self.lock();
        data.call(Call::GetViewConfigurationProperties)?;
        data.check_system(instance, system)?;
        let config = data.view_configuration(ty)?;
        Ok(ViewConfigurationProperties {
            view_configuration_type: ty,
            fov_mutable: config.fov_mutable,
        })
    }

    fn enumerate_view_configuration_views(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<ViewConfigurationView>> {
        let mut data = self.lock();
        data.call(Call::EnumerateViewConfigurationViews)?;
        data.check_system(instance, system)?;
        Ok(data.view_configuration(ty)?.views.clone())
    }

    fn enumerate_environment_blend_modes(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<EnvironmentBlendMode>> {
        let mut data = self.lock();
        data.call(Call::EnumerateBlendModes)?;
        data.check_system(instance, system)?;
        Ok(data.view_configuration(ty)?.blend_modes.clone())
    }

    fn create_session(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<SessionHandle> {
        let mut data = self.lock();
        data.call(Call::CreateSession)?;
        data.check_system(instance, system)?;
        let session = data.alloc(HandleKind::Session);
        data.sessions.insert(
            session,
            SessionData {
                instance: instance.0,
                state: SessionState::Unknown,
                view_configuration: None,
                exit_requested: false,
                attached: false,
                frame: FramePhase::Idle,
            },
        );
        data.current_session = session;
        data.set_state(session, SessionState::Idle);
        if data.init.auto_lifecycle {
            data.set_state(session, SessionState::Ready);
        }
        Ok(SessionHandle(session))
    }

    fn destroy_session(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroySession)?;
        data.free(session.0, HandleKind::Session)?;
        data.sessions.remove(&session.0);
        if data.current_session == session.0 {
            data.current_session = 0;
        }
        Ok(())
    }

    fn begin_session(&self, session: SessionHandle, ty: ViewConfigurationType) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::BeginSession)?;
        data.view_configuration(ty)?;
        let auto = data.init.auto_lifecycle;
        let state = data.session(session)?;
        if state.view_configuration.is_some() {
            return Err(ResultCode::ERROR_SESSION_RUNNING);
        }
        if state.state != SessionState::Ready {
            return Err(ResultCode::ERROR_SESSION_NOT_READY);
        }
        state.view_configuration = Some(ty);
        if auto {
            data.set_state(session.0, SessionState::Synchronized);
            data.set_state(session.0, SessionState::Visible);
            data.set_state(session.0, SessionState::Focused);
        }
        Ok(())
    }

    fn end_session(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::EndSession)?;
        let auto = data.init.auto_lifecycle;
        let state = data.session(session)?;
        if state.state != SessionState::Stopping {
            return Err(ResultCode::ERROR_SESSION_NOT_STOPPING);
        }
        state.view_configuration = None;
        state.frame = FramePhase::Idle;
        let exiting = state.exit_requested;
        data.set_state(session.0, SessionState::Idle);
        if exiting {
            data.set_state(session.0, SessionState::Exiting);
        } else if auto {
            data.set_state(session.0, SessionState::Ready);
        }
        Ok(())
    }

    fn request_exit_session(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::RequestExitSession)?;
        let state = data.session(session)?;
        if state.view_configuration.is_none() {
            return Err(ResultCode::ERROR_SESSION_NOT_RUNNING);
        }
        state.exit_requested = true;
        data.set_state(session.0, SessionState::Stopping);
        Ok(())
    }

    fn set_performance_level(
        &self,
        session: SessionHandle,
        domain: PerformanceDomain,
        level: PerformanceLevel,
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::SetPerformanceLevel)?;
        data.session(session)?;
        if !data.has_extension(session.0, EXT_PERFORMANCE_SETTINGS) {
            return Err(ResultCode::ERROR_FUNCTION_UNSUPPORTED);
        }
        data.performance.push((domain, level));
        Ok(())
    }

    fn create_reference_space(
        &self,
        session: SessionHandle,
        ty: ReferenceSpaceType,
        _pose: Posef,
    ) -> XrResult<SpaceHandle> {
        let mut data = self.lock();
        data.call(Call::CreateReferenceSpace)?;
        data.session(session)?;
        if ty == ReferenceSpaceType::Stage && !data.init.stage_available {
            return Err(ResultCode::ERROR_REFERENCE_SPACE_UNSUPPORTED);
        }
        let space = data.alloc(HandleKind::Space);
        data.spaces.insert(space, SpaceData::Reference);
        Ok(SpaceHandle(space))
    }

    fn destroy_space(&self, space: SpaceHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroySpace)?;
        data.free(space.0, HandleKind::Space)?;
        data.spaces.remove(&space.0);
        Ok(())
    }

    fn locate_space(
        &self,
        space: SpaceHandle,
        base: SpaceHandle,
        _time: Time,
    ) -> XrResult<SpaceLocation> {
        let mut data = self.lock();
        data.call(Call::LocateSpace)?;
        data.expect(base.0, HandleKind::Space)?;
        let location = match data.spaces.get(&space.0) {
            Some(SpaceData::Reference) => SpaceLocation {
                flags: data.tracked_flags(),
                pose: Posef::IDENTITY,
            },
            Some(SpaceData::Action(action)) => {
                let pose = data
                    .actions
                    .get(action)
                    .and_then(|a| data.inputs.get(&a.name));
                match pose {
                    Some(HeadlessInput::Pose(pose)) => SpaceLocation {
                        flags: SpaceLocationFlags::all(),
                        pose: *pose,
                    },
                    _ => SpaceLocation::default(),
                }
            }
            None => return Err(ResultCode::ERROR_HANDLE_INVALID),
        };
        Ok(location)
    }

    fn locate_views(
        &self,
        session: SessionHandle,
        ty: ViewConfigurationType,
        _time: Time,
        space: SpaceHandle,
    ) -> XrResult<LocatedViews> {
        let mut data = self.lock();
        data.call(Call::LocateViews)?;
        data.session(session)?;
        data.expect(space.0, HandleKind::Space)?;
        let count = data.view_configuration(ty)?.views.len();
        let flags = if data.head_tracked {
            ViewStateFlags::all()
        } else {
            ViewStateFlags::empty()
        };
        let fov = Fovf {
            angle_left: -FRAC_PI_4,
            angle_right: FRAC_PI_4,
            angle_up: FRAC_PI_4,
            angle_down: -FRAC_PI_4,
        };
        let views = (0..count)
            .map(|i| {
                let x = if count == 2 {
                    (i as f32 - 0.5) * IPD
                } else {
                    0.
                };
                EyeView {
                    pose: Posef {
                        position: Vector3f { x, y: 0., z: 0. },
                        ..Posef::IDENTITY
                    },
                    fov,
                }
            })
            .collect();
        Ok(LocatedViews { flags, views })
    }

    fn enumerate_swapchain_formats(&self, session: SessionHandle) -> XrResult<Vec<i64>> {
        let mut data = self.lock();
        data.call(Call::EnumerateSwapchainFormats)?;
        data.session(session)?;
        Ok(data.init.swapchain_formats.clone())
    }

    fn create_swapchain(
        &self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> XrResult<SwapchainHandle> {
        let mut data = self.lock();
        data.call(Call::CreateSwapchain)?;
        data.session(session)?;
        if !data.init.swapchain_formats.contains(&info.format) {
            return Err(ResultCode::ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED);
        }
        if info.width == 0 || info.height == 0 || info.array_size == 0 {
            return Err(ResultCode::ERROR_VALIDATION_FAILURE);
        }
        let images = data.init.images_per_swapchain.max(1);
        let swapchain = data.alloc(HandleKind::Swapchain);
        data.swapchains.insert(
            swapchain,
            SwapchainData {
                images,
                next: 0,
                acquired: VecDeque::new(),
                waited: 0,
            },
        );
        Ok(SwapchainHandle(swapchain))
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroySwapchain)?;
        data.free(swapchain.0, HandleKind::Swapchain)?;
        data.swapchains.remove(&swapchain.0);
        Ok(())
    }

    fn enumerate_swapchain_images(
        &self,
        swapchain: SwapchainHandle,
    ) -> XrResult<Vec<SwapchainImage>> {
        let mut data = self.lock();
        data.call(Call::EnumerateSwapchainImages)?;
        let images = data
            .swapchains
            .get(&swapchain.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?
            .images;
        Ok((0..images)
            .map(|i| SwapchainImage((swapchain.0 << 8) | u64::from(i)))
            .collect())
    }

    fn acquire_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<u32> {
        let mut data = self.lock();
        data.call(Call::AcquireSwapchainImage)?;
        let swapchain = data
            .swapchains
            .get_mut(&swapchain.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
        if swapchain.acquired.len() as u32 >= swapchain.images {
            return Err(ResultCode::ERROR_CALL_ORDER_INVALID);
        }
        let index = swapchain.next;
        swapchain.next = (index + 1) % swapchain.images;
        swapchain.acquired.push_back(index);
        Ok(index)
    }

    fn wait_swapchain_image(
        &self,
        swapchain: SwapchainHandle,
        _timeout: XrDuration,
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::WaitSwapchainImage)?;
        let swapchain = data
            .swapchains
            .get_mut(&swapchain.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
        if swapchain.waited >= swapchain.acquired.len() {
            return Err(ResultCode::ERROR_CALL_ORDER_INVALID);
        }
        swapchain.waited += 1;
        Ok(())
    }

    fn release_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<()> {
        let handle = swapchain;
        let mut data = self.lock();
        data.call(Call::ReleaseSwapchainImage)?;
        let swapchain = data
            .swapchains
            .get_mut(&swapchain.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
        if swapchain.acquired.pop_front().is_none() {
            return Err(ResultCode::ERROR_CALL_ORDER_INVALID);
        }
        swapchain.waited = swapchain.waited.saturating_sub(1);
        data.released.push(handle);
        Ok(())
    }

    fn wait_frame(&self, session: SessionHandle) -> XrResult<FrameState> {
        let mut data = self.lock();
        data.call(Call::WaitFrame)?;
        let period = data.init.frame_period;
        let now = data.now();
        let state = data.session(session)?;
        if state.view_configuration.is_none() {
            return Err(ResultCode::ERROR_SESSION_NOT_RUNNING);
        }
        state.frame = FramePhase::Waited;
        Ok(FrameState {
            predicted_display_time: Time(now.0 + period.0),
            predicted_display_period: period,
            should_render: matches!(state.state, SessionState::Visible | SessionState::Focused),
        })
    }

    fn begin_frame(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::BeginFrame)?;
        let state = data.session(session)?;
        if state.frame != FramePhase::Waited {
            return Err(ResultCode::ERROR_CALL_ORDER_INVALID);
        }
        state.frame = FramePhase::Begun;
        Ok(())
    }

    fn end_frame(
        &self,
        session: SessionHandle,
        display_time: Time,
        blend_mode: EnvironmentBlendMode,
        layers: &[CompositionLayer],
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::EndFrame)?;
        let state = data.session(session)?;
        if state.frame != FramePhase::Begun {
            return Err(ResultCode::ERROR_CALL_ORDER_INVALID);
        }
        state.frame = FramePhase::Idle;

        if data.swapchains.values().any(|s| !s.acquired.is_empty()) {
            return Err(ResultCode::ERROR_CALL_ORDER_INVALID);
        }
        for layer in layers {
            let valid = match layer {
                CompositionLayer::Projection { views, .. } => views.iter().all(|v| {
                    data.swapchains.contains_key(&v.sub_image.swapchain.0)
                        && v.depth
                            .map_or(true, |d| data.swapchains.contains_key(&d.swapchain.0))
                }),
                CompositionLayer::Passthrough { layer, .. } => data
                    .expect(layer.0, HandleKind::PassthroughLayer)
                    .is_ok(),
            };
            if !valid {
                return Err(ResultCode::ERROR_LAYER_INVALID);
            }
        }
        data.frames.push(SubmittedFrame {
            display_time,
            blend_mode,
            layers: layers.to_vec(),
        });
        Ok(())
    }

    fn string_to_path(&self, instance: InstanceHandle, path: &str) -> XrResult<PathHandle> {
        let mut data = self.lock();
        data.call(Call::StringToPath)?;
        data.expect(instance.0, HandleKind::Instance)?;
        if !valid_path(path) {
            return Err(ResultCode::ERROR_PATH_INVALID);
        }
        let index = match data.paths.iter().position(|p| p == path) {
            Some(index) => index,
            None => {
                data.paths.push(path.to_owned());
                data.paths.len() - 1
            }
        };
        Ok(PathHandle(index as u64 + 1))
    }

    fn create_action_set(
        &self,
        instance: InstanceHandle,
        _name: &str,
        _localized_name: &str,
        _priority: u32,
    ) -> XrResult<ActionSetHandle> {
        let mut data = self.lock();
        data.call(Call::CreateActionSet)?;
        data.expect(instance.0, HandleKind::Instance)?;
        Ok(ActionSetHandle(data.alloc(HandleKind::ActionSet)))
    }

    fn destroy_action_set(&self, action_set: ActionSetHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroyActionSet)?;
        data.free(action_set.0, HandleKind::ActionSet)?;
        data.attached_sets.remove(&action_set.0);
        Ok(())
    }

    fn create_action(
        &self,
        action_set: ActionSetHandle,
        name: &str,
        _localized_name: &str,
        ty: ActionType,
        subaction_paths: &[PathHandle],
    ) -> XrResult<ActionHandle> {
        let mut data = self.lock();
        data.call(Call::CreateAction)?;
        data.expect(action_set.0, HandleKind::ActionSet)?;
        if data.attached_sets.contains(&action_set.0) {
            return Err(ResultCode::ERROR_ACTIONSETS_ALREADY_ATTACHED);
        }
        if subaction_paths
            .iter()
            .any(|p| p.0 == 0 || p.0 as usize > data.paths.len())
        {
            return Err(ResultCode::ERROR_PATH_INVALID);
        }
        if data
            .actions
            .values()
            .any(|a| a.set == action_set.0 && a.name == name)
        {
            return Err(ResultCode::ERROR_NAME_DUPLICATED);
        }
        let action = data.alloc(HandleKind::Action);
        data.actions.insert(
            action,
            ActionData {
                set: action_set.0,
                name: name.to_owned(),
                ty,
            },
        );
        Ok(ActionHandle(action))
    }

    fn destroy_action(&self, action: ActionHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroyAction)?;
        data.free(action.0, HandleKind::Action)?;
        data.actions.remove(&action.0);
        Ok(())
    }

    fn suggest_interaction_profile_bindings(
        &self,
        instance: InstanceHandle,
        profile: PathHandle,
        bindings: &[(ActionHandle, PathHandle)],
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::SuggestBindings)?;
        data.expect(instance.0, HandleKind::Instance)?;
        let path = data
            .paths
            .get((profile.0 as usize).wrapping_sub(1))
            .ok_or(ResultCode::ERROR_PATH_INVALID)?;
        if data.init.unsupported_profiles.contains(path) {
            return Err(ResultCode::ERROR_PATH_UNSUPPORTED);
        }
        for (action, binding) in bindings {
            data.expect(action.0, HandleKind::Action)?;
            if binding.0 == 0 || binding.0 as usize > data.paths.len() {
                return Err(ResultCode::ERROR_PATH_INVALID);
            }
        }
        Ok(())
    }

    fn attach_action_sets(
        &self,
        session: SessionHandle,
        action_sets: &[ActionSetHandle],
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::AttachActionSets)?;
        for set in action_sets {
            data.expect(set.0, HandleKind::ActionSet)?;
        }
        let state = data.session(session)?;
        if state.attached {
            return Err(ResultCode::ERROR_ACTIONSETS_ALREADY_ATTACHED);
        }
        state.attached = true;
        data.attached_sets
            .extend(action_sets.iter().map(|s| s.0));
        Ok(())
    }

    fn sync_actions(
        &self,
        session: SessionHandle,
        _action_sets: &[ActionSetHandle],
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::SyncActions)?;
        if !data.session(session)?.attached {
            return Err(ResultCode::ERROR_ACTIONSET_NOT_ATTACHED);
        }
        let pending = std::mem::take(&mut data.pending_changes);
        data.changed = pending;
        Ok(())
    }

    fn create_action_space(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        _subaction: PathHandle,
        _pose: Posef,
    ) -> XrResult<SpaceHandle> {
        let mut data = self.lock();
        data.call(Call::CreateActionSpace)?;
        data.session(session)?;
        match data.actions.get(&action.0) {
            Some(a) if a.ty == ActionType::Pose => {}
            Some(_) => return Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
            None => return Err(ResultCode::ERROR_HANDLE_INVALID),
        }
        let space = data.alloc(HandleKind::Space);
        data.spaces.insert(space, SpaceData::Action(action.0));
        Ok(SpaceHandle(space))
    }

    fn action_state_bool(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        _subaction: PathHandle,
    ) -> XrResult<ActionState<bool>> {
        let mut data = self.lock();
        data.call(Call::GetActionState)?;
        let now = data.now();
        Ok(match data.input(session, action, ActionType::Bool)? {
            (Some(HeadlessInput::Bool(v)), changed) => active(v, changed, now),
            _ => inactive(),
        })
    }

    fn action_state_float(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        _subaction: PathHandle,
    ) -> XrResult<ActionState<f32>> {
        let mut data = self.lock();
        data.call(Call::GetActionState)?;
        let now = data.now();
        Ok(match data.input(session, action, ActionType::Float)? {
            (Some(HeadlessInput::Float(v)), changed) => active(v, changed, now),
            _ => inactive(),
        })
    }

    fn action_state_vector2(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        _subaction: PathHandle,
    ) -> XrResult<ActionState<Vector2f>> {
        let mut data = self.lock();
        data.call(Call::GetActionState)?;
        let now = data.now();
        Ok(match data.input(session, action, ActionType::Vector2)? {
            (Some(HeadlessInput::Vector2(v)), changed) => active(v, changed, now),
            _ => inactive(),
        })
    }

    fn action_state_pose(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        _subaction: PathHandle,
    ) -> XrResult<bool> {
        let mut data = self.lock();
        data.call(Call::GetActionState)?;
        let (value, _) = data.input(session, action, ActionType::Pose)?;
        Ok(matches!(value, Some(HeadlessInput::Pose(_))))
    }

    fn apply_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        _subaction: PathHandle,
        vibration: &HapticVibration,
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::ApplyHapticFeedback)?;
        data.input(session, action, ActionType::Haptic)?;
        let name = data
            .actions
            .get(&action.0)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        data.haptics.push((name, *vibration));
        Ok(())
    }

    fn stop_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        _subaction: PathHandle,
    ) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::StopHapticFeedback)?;
        data.input(session, action, ActionType::Haptic)?;
        Ok(())
    }

    fn create_hand_tracker(
        &self,
        session: SessionHandle,
        hand: Hand,
    ) -> XrResult<HandTrackerHandle> {
        let mut data = self.lock();
        data.call(Call::CreateHandTracker)?;
        data.session(session)?;
        if !data.has_extension(session.0, EXT_HAND_TRACKING) {
            return Err(ResultCode::ERROR_FUNCTION_UNSUPPORTED);
        }
        if data.hand_trackers.values().any(|h| *h == hand) {
            return Err(ResultCode::ERROR_VALIDATION_FAILURE);
        }
        let tracker = data.alloc(HandleKind::HandTracker);
        data.hand_trackers.insert(tracker, hand);
        Ok(HandTrackerHandle(tracker))
    }

    fn destroy_hand_tracker(&self, tracker: HandTrackerHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroyHandTracker)?;
        data.free(tracker.0, HandleKind::HandTracker)?;
        data.hand_trackers.remove(&tracker.0);
        Ok(())
    }

    fn locate_hand_joints(
        &self,
        tracker: HandTrackerHandle,
        base: SpaceHandle,
        _time: Time,
    ) -> XrResult<Option<Vec<HandJointLocation>>> {
        let mut data = self.lock();
        data.call(Call::LocateHandJoints)?;
        data.expect(base.0, HandleKind::Space)?;
        let hand = data
            .hand_trackers
            .get(&tracker.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
        Ok(data.hands.get(hand).map(|pose| {
            let joint = HandJointLocation {
                flags: SpaceLocationFlags::all(),
                pose: *pose,
                radius: JOINT_RADIUS,
            };
            vec![joint; HAND_JOINT_COUNT]
        }))
    }

    fn create_passthrough_layer(&self, session: SessionHandle) -> XrResult<LayerHandle> {
        let mut data = self.lock();
        data.call(Call::CreatePassthroughLayer)?;
        data.session(session)?;
        if !data.has_extension(session.0, FB_PASSTHROUGH) {
            return Err(ResultCode::ERROR_FEATURE_UNSUPPORTED);
        }
        Ok(LayerHandle(data.alloc(HandleKind::PassthroughLayer)))
    }

    fn destroy_passthrough_layer(&self, layer: LayerHandle) -> XrResult<()> {
        let mut data = self.lock();
        data.call(Call::DestroyPassthroughLayer)?;
        data.free(layer.0, HandleKind::PassthroughLayer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(runtime: &HeadlessRuntime) -> InstanceHandle {
        let app = ApplicationInfo {
            application_name: "test".into(),
            application_version: 1,
            engine_name: "test".into(),
            engine_version: 1,
        };
        runtime.create_instance(&app, &[]).unwrap()
    }

    #[test]
    fn auto_lifecycle_queues_ready() {
        let runtime = HeadlessRuntime::new(HeadlessInit::default());
        let instance = instance(&runtime);
        let session = runtime.create_session(instance, SYSTEM).unwrap();
        let mut states = vec![];
        while let Some(event) = runtime.poll_event(instance).unwrap() {
            if let RuntimeEvent::SessionStateChanged { state, .. } = event {
                states.push(state);
            }
        }
        assert_eq!(states, vec![SessionState::Idle, SessionState::Ready]);
        assert_eq!(
            runtime.end_session(session),
            Err(ResultCode::ERROR_SESSION_NOT_STOPPING)
        );
    }

    #[test]
    fn faults_are_consumed_once() {
        let runtime = HeadlessRuntime::new(HeadlessInit::default());
        let controller = runtime.controller();
        controller.fail_next(Call::EnumerateExtensions, ResultCode::ERROR_RUNTIME_FAILURE);
        assert_eq!(
            runtime.enumerate_extensions(),
            Err(ResultCode::ERROR_RUNTIME_FAILURE)
        );
        assert!(runtime.enumerate_extensions().is_ok());
        assert_eq!(controller.calls(Call::EnumerateExtensions), 2);
    }

    #[test]
    fn swapchain_images_cycle_in_order() {
        let runtime = HeadlessRuntime::new(HeadlessInit::default());
        let instance = instance(&runtime);
        let session = runtime.create_session(instance, SYSTEM).unwrap();
        let info = SwapchainCreateInfo {
            usage_flags: Default::default(),
            format: GL_RGBA8,
            sample_count: 1,
            width: 16,
            height: 16,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        };
        let swapchain = runtime.create_swapchain(session, &info).unwrap();
        let mut indices = vec![];
        for _ in 0..4 {
            indices.push(runtime.acquire_swapchain_image(swapchain).unwrap());
            runtime
                .wait_swapchain_image(swapchain, XrDuration::INFINITE)
                .unwrap();
            runtime.release_swapchain_image(swapchain).unwrap();
        }
        assert_eq!(indices, vec![0, 1, 2, 0]);
        assert_eq!(
            runtime.release_swapchain_image(swapchain),
            Err(ResultCode::ERROR_CALL_ORDER_INVALID)
        );
    }

    #[test]
    fn delayed_fault_lets_earlier_calls_through() {
        let runtime = HeadlessRuntime::new(HeadlessInit::default());
        let controller = runtime.controller();
        controller.fail_after(Call::EnumerateExtensions, 1, ResultCode::ERROR_RUNTIME_FAILURE);
        assert!(runtime.enumerate_extensions().is_ok());
        assert_eq!(
            runtime.enumerate_extensions(),
            Err(ResultCode::ERROR_RUNTIME_FAILURE)
        );
        assert!(runtime.enumerate_extensions().is_ok());
    }

    #[test]
    fn hand_joints_follow_the_simulated_pose() {
        let runtime = HeadlessRuntime::new(HeadlessInit::default());
        let controller = runtime.controller();
        let app = ApplicationInfo {
            application_name: "test".into(),
            application_version: 1,
            engine_name: "test".into(),
            engine_version: 1,
        };
        let instance = runtime
            .create_instance(&app, &[EXT_HAND_TRACKING.to_owned()])
            .unwrap();
        let session = runtime.create_session(instance, SYSTEM).unwrap();
        let space = runtime
            .create_reference_space(session, ReferenceSpaceType::Local, Posef::IDENTITY)
            .unwrap();
        let tracker = runtime.create_hand_tracker(session, Hand::Left).unwrap();
        assert_eq!(
            runtime.create_hand_tracker(session, Hand::Left),
            Err(ResultCode::ERROR_VALIDATION_FAILURE)
        );
        assert_eq!(runtime.locate_hand_joints(tracker, space, Time(0)), Ok(None));

        controller.set_hand_pose(Hand::Left, Some(Posef::IDENTITY));
        let joints = runtime
            .locate_hand_joints(tracker, space, Time(0))
            .unwrap()
            .unwrap();
        assert_eq!(joints.len(), HAND_JOINT_COUNT);
        assert!(joints.iter().all(|j| j.pose == Posef::IDENTITY));

        runtime.destroy_hand_tracker(tracker).unwrap();
        assert_eq!(controller.live(HandleKind::HandTracker), 0);
    }

    #[test]
    fn hand_tracking_needs_the_extension() {
        let runtime = HeadlessRuntime::new(HeadlessInit::default());
        let instance = instance(&runtime);
        let session = runtime.create_session(instance, SYSTEM).unwrap();
        assert_eq!(
            runtime.create_hand_tracker(session, Hand::Right),
            Err(ResultCode::ERROR_FUNCTION_UNSUPPORTED)
        );
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let runtime = HeadlessRuntime::new(HeadlessInit::default());
        let app = ApplicationInfo {
            application_name: "test".into(),
            application_version: 1,
            engine_name: "test".into(),
            engine_version: 1,
        };
        assert_eq!(
            runtime.create_instance(&app, &["XR_KHR_missing".to_owned()]),
            Err(ResultCode::ERROR_EXTENSION_NOT_PRESENT)
        );
    }
}
