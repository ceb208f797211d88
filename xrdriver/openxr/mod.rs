/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A runtime backed by a system OpenXR loader.
//!
//! Runtime objects are owned here and handed out as plain handles. The
//! graphics binding is supplied by the host through a session factory,
//! since it needs the host's device or context.

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
use xrdriver_api::LocatedViews;
use xrdriver_api::PathHandle;
use xrdriver_api::PerformanceDomain;
use xrdriver_api::PerformanceLevel;
use xrdriver_api::Posef;
use xrdriver_api::Quaternionf;
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

use openxr as xr;

use euclid::Size2D;
use log::debug;
use log::warn;

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

/// Creates the graphics-bound session for a system.
pub type SessionFactory<G> = Box<
    dyn Fn(
            &xr::Instance,
            xr::SystemId,
        ) -> xr::Result<(xr::Session<G>, xr::FrameWaiter, xr::FrameStream<G>)>
        + Send
        + Sync,
>;

macro_rules! known_extensions {
    ($($(#[$meta:meta])* $field:ident => $name:literal,)*) => {
        fn extension_names(set: &xr::ExtensionSet) -> Vec<String> {
            let mut names = vec![];
            $(
                $(#[$meta])*
                {
                    if set.$field {
                        names.push($name.to_owned());
                    }
                }
            )*
            // Unknown names are stored nul-terminated.
            names.extend(set.other.iter().map(|bytes| {
                let bytes = bytes.as_slice();
                let bytes = bytes.strip_suffix(b"\0").unwrap_or(bytes);
                String::from_utf8_lossy(bytes).into_owned()
            }));
            names
        }

        fn extension_set(names: &[String]) -> xr::ExtensionSet {
            let mut set = xr::ExtensionSet::default();
            for name in names {
                match name.as_str() {
                    $($(#[$meta])* $name => set.$field = true,)*
                    other => {
                        let mut bytes = other.as_bytes().to_vec();
                        bytes.push(0);
                        set.other.push(bytes);
                    }
                }
            }
            set
        }
    };
}

known_extensions! {
    khr_opengl_enable => "XR_KHR_opengl_enable",
    khr_vulkan_enable2 => "XR_KHR_vulkan_enable2",
    #[cfg(windows)]
    khr_d3d11_enable => "XR_KHR_D3D11_enable",
    khr_composition_layer_depth => "XR_KHR_composition_layer_depth",
    ext_performance_settings => "XR_EXT_performance_settings",
    ext_hand_tracking => "XR_EXT_hand_tracking",
    fb_passthrough => "XR_FB_passthrough",
    fb_triangle_mesh => "XR_FB_triangle_mesh",
}

enum AnyAction {
    Bool(xr::Action<bool>),
    Float(xr::Action<f32>),
    Vector2(xr::Action<xr::Vector2f>),
    Pose(xr::Action<xr::Posef>),
    Haptic(xr::Action<xr::Haptic>),
}

struct Objects<G: xr::Graphics> {
    next_handle: u64,
    instance: Option<(u64, xr::Instance)>,
    system: Option<xr::SystemId>,
    session: Option<(u64, xr::Session<G>)>,
    spaces: HashMap<u64, xr::Space>,
    swapchains: HashMap<u64, Arc<Mutex<xr::Swapchain<G>>>>,
    action_sets: HashMap<u64, xr::ActionSet>,
    actions: HashMap<u64, AnyAction>,
    hand_trackers: HashMap<u64, xr::HandTracker>,
}

impl<G: xr::Graphics> Objects<G> {
    fn alloc(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn instance(&self, handle: InstanceHandle) -> XrResult<&xr::Instance> {
        match self.instance {
            Some((h, ref instance)) if h == handle.0 => Ok(instance),
            _ => Err(ResultCode::ERROR_HANDLE_INVALID),
        }
    }

    fn system(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<(&xr::Instance, xr::SystemId)> {
        let instance = self.instance(instance)?;
        match self.system {
            Some(id) if id.into_raw() == system.0 => Ok((instance, id)),
            _ => Err(ResultCode::ERROR_SYSTEM_INVALID),
        }
    }

    fn session(&self, handle: SessionHandle) -> XrResult<&xr::Session<G>> {
        match self.session {
            Some((h, ref session)) if h == handle.0 => Ok(session),
            _ => Err(ResultCode::ERROR_HANDLE_INVALID),
        }
    }

    fn space(&self, handle: SpaceHandle) -> XrResult<&xr::Space> {
        self.spaces
            .get(&handle.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    /// Image waits block, so callers lock the swapchain after releasing
    /// the object table.
    fn swapchain(&self, handle: SwapchainHandle) -> XrResult<Arc<Mutex<xr::Swapchain<G>>>> {
        self.swapchains
            .get(&handle.0)
            .cloned()
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    fn action(&self, handle: ActionHandle) -> XrResult<&AnyAction> {
        self.actions
            .get(&handle.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }
}

pub struct OpenXrRuntime<G: xr::Graphics> {
    entry: xr::Entry,
    factory: SessionFactory<G>,
    objects: Mutex<Objects<G>>,
    events: Mutex<xr::EventDataBuffer>,
    frame_waiter: Mutex<Option<xr::FrameWaiter>>,
    frame_stream: Mutex<Option<xr::FrameStream<G>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn code(result: xr::sys::Result) -> ResultCode {
    ResultCode(result.into_raw())
}

impl<G: xr::Graphics> OpenXrRuntime<G> {
    /// Loads the system loader.
    ///
    /// # Safety
    ///
    /// Loading the loader runs arbitrary initialization code from the
    /// installed runtime.
    pub unsafe fn load(factory: SessionFactory<G>) -> Result<Self, String> {
        let entry = xr::Entry::load().map_err(|e| format!("{:?}", e))?;
        Ok(Self::with_entry(entry, factory))
    }

    pub fn with_entry(entry: xr::Entry, factory: SessionFactory<G>) -> Self {
        OpenXrRuntime {
            entry,
            factory,
            objects: Mutex::new(Objects {
                next_handle: 1,
                instance: None,
                system: None,
                session: None,
                spaces: HashMap::new(),
                swapchains: HashMap::new(),
                action_sets: HashMap::new(),
                actions: HashMap::new(),
                hand_trackers: HashMap::new(),
            }),
            events: Mutex::new(xr::EventDataBuffer::new()),
            frame_waiter: Mutex::new(None),
            frame_stream: Mutex::new(None),
        }
    }

    fn objects(&self) -> MutexGuard<Objects<G>> {
        lock(&self.objects)
    }
}

fn view_configuration(ty: ViewConfigurationType) -> xr::ViewConfigurationType {
    match ty {
        ViewConfigurationType::PrimaryMono => xr::ViewConfigurationType::PRIMARY_MONO,
        ViewConfigurationType::PrimaryStereo => xr::ViewConfigurationType::PRIMARY_STEREO,
        ViewConfigurationType::PrimaryQuad => xr::ViewConfigurationType::PRIMARY_QUAD_VARJO,
        ViewConfigurationType::SecondaryMonoFirstPersonObserver => {
            xr::ViewConfigurationType::SECONDARY_MONO_FIRST_PERSON_OBSERVER_MSFT
        }
    }
}

fn from_view_configuration(ty: xr::ViewConfigurationType) -> Option<ViewConfigurationType> {
    match ty {
        xr::ViewConfigurationType::PRIMARY_MONO => Some(ViewConfigurationType::PrimaryMono),
        xr::ViewConfigurationType::PRIMARY_STEREO => Some(ViewConfigurationType::PrimaryStereo),
        xr::ViewConfigurationType::PRIMARY_QUAD_VARJO => Some(ViewConfigurationType::PrimaryQuad),
        xr::ViewConfigurationType::SECONDARY_MONO_FIRST_PERSON_OBSERVER_MSFT => {
            Some(ViewConfigurationType::SecondaryMonoFirstPersonObserver)
        }
        _ => None,
    }
}

fn blend_mode(mode: EnvironmentBlendMode) -> xr::EnvironmentBlendMode {
    match mode {
        EnvironmentBlendMode::Opaque => xr::EnvironmentBlendMode::OPAQUE,
        EnvironmentBlendMode::Additive => xr::EnvironmentBlendMode::ADDITIVE,
        EnvironmentBlendMode::AlphaBlend => xr::EnvironmentBlendMode::ALPHA_BLEND,
    }
}

fn from_blend_mode(mode: xr::EnvironmentBlendMode) -> Option<EnvironmentBlendMode> {
    match mode {
        xr::EnvironmentBlendMode::OPAQUE => Some(EnvironmentBlendMode::Opaque),
        xr::EnvironmentBlendMode::ADDITIVE => Some(EnvironmentBlendMode::Additive),
        xr::EnvironmentBlendMode::ALPHA_BLEND => Some(EnvironmentBlendMode::AlphaBlend),
        _ => None,
    }
}

fn session_state(state: xr::SessionState) -> SessionState {
    match state {
        xr::SessionState::IDLE => SessionState::Idle,
        xr::SessionState::READY => SessionState::Ready,
        xr::SessionState::SYNCHRONIZED => SessionState::Synchronized,
        xr::SessionState::VISIBLE => SessionState::Visible,
        xr::SessionState::FOCUSED => SessionState::Focused,
        xr::SessionState::STOPPING => SessionState::Stopping,
        xr::SessionState::LOSS_PENDING => SessionState::LossPending,
        xr::SessionState::EXITING => SessionState::Exiting,
        _ => SessionState::Unknown,
    }
}

fn from_reference_space(ty: xr::ReferenceSpaceType) -> ReferenceSpaceType {
    match ty {
        xr::ReferenceSpaceType::VIEW => ReferenceSpaceType::View,
        xr::ReferenceSpaceType::STAGE => ReferenceSpaceType::Stage,
        _ => ReferenceSpaceType::Local,
    }
}

fn to_pose(pose: &Posef) -> xr::Posef {
    xr::Posef {
        orientation: xr::Quaternionf {
            x: pose.orientation.x,
            y: pose.orientation.y,
            z: pose.orientation.z,
            w: pose.orientation.w,
        },
        position: xr::Vector3f {
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
        },
    }
}

fn from_pose(pose: xr::Posef) -> Posef {
    Posef {
        orientation: Quaternionf {
            x: pose.orientation.x,
            y: pose.orientation.y,
            z: pose.orientation.z,
            w: pose.orientation.w,
        },
        position: Vector3f {
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
        },
    }
}

fn to_fov(fov: &Fovf) -> xr::Fovf {
    xr::Fovf {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

fn from_fov(fov: xr::Fovf) -> Fovf {
    Fovf {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

fn from_action_state<T, U>(state: xr::ActionState<T>, f: impl FnOnce(T) -> U) -> ActionState<U>
where
    T: xr::ActionInput,
{
    ActionState {
        current_state: f(state.current_state),
        changed_since_last_sync: state.changed_since_last_sync,
        last_change_time: Time(state.last_change_time.as_nanos()),
        is_active: state.is_active,
    }
}

fn perf_domain(domain: PerformanceDomain) -> xr::sys::PerfSettingsDomainEXT {
    match domain {
        PerformanceDomain::Cpu => xr::sys::PerfSettingsDomainEXT::CPU,
        PerformanceDomain::Gpu => xr::sys::PerfSettingsDomainEXT::GPU,
    }
}

fn perf_level(level: PerformanceLevel) -> xr::sys::PerfSettingsLevelEXT {
    match level {
        PerformanceLevel::PowerSavings => xr::sys::PerfSettingsLevelEXT::POWER_SAVINGS,
        PerformanceLevel::SustainedLow => xr::sys::PerfSettingsLevelEXT::SUSTAINED_LOW,
        PerformanceLevel::SustainedHigh => xr::sys::PerfSettingsLevelEXT::SUSTAINED_HIGH,
        PerformanceLevel::Boost => xr::sys::PerfSettingsLevelEXT::BOOST,
    }
}

impl<G> Runtime for OpenXrRuntime<G>
where
    G: xr::Graphics,
    G::Format: Copy + Into<i64> + TryFrom<i64>,
    G::SwapchainImage: Copy + Into<u64>,
    OpenXrRuntime<G>: Send + Sync,
{
    fn enumerate_extensions(&self) -> XrResult<Vec<String>> {
        let set = self.entry.enumerate_extensions().map_err(code)?;
        Ok(extension_names(&set))
    }

    fn create_instance(
        &self,
        app: &ApplicationInfo,
        extensions: &[String],
    ) -> XrResult<InstanceHandle> {
        let info = xr::ApplicationInfo {
            application_name: &app.application_name,
            application_version: app.application_version,
            engine_name: &app.engine_name,
            engine_version: app.engine_version,
            api_version: xr::Version::new(1, 0, 0),
        };
        let instance = self
            .entry
            .create_instance(&info, &extension_set(extensions), &[])
            .map_err(code)?;
        let mut objects = self.objects();
        let handle = objects.alloc();
        objects.instance = Some((handle, instance));
        Ok(InstanceHandle(handle))
    }

    fn destroy_instance(&self, instance: InstanceHandle) -> XrResult<()> {
        let mut objects = self.objects();
        objects.instance(instance)?;
        objects.instance = None;
        objects.system = None;
        Ok(())
    }

    fn instance_properties(&self, instance: InstanceHandle) -> XrResult<InstanceProperties> {
        let objects = self.objects();
        let properties = objects.instance(instance)?.properties().map_err(code)?;
        let version = properties.runtime_version;
        Ok(InstanceProperties {
            runtime_name: properties.runtime_name,
            runtime_version: (u64::from(version.major()) << 48)
                | (u64::from(version.minor()) << 32)
                | u64::from(version.patch()),
        })
    }

    fn system(&self, instance: InstanceHandle, form_factor: FormFactor) -> XrResult<SystemId> {
        let mut objects = self.objects();
        let form_factor = match form_factor {
            FormFactor::HeadMountedDisplay => xr::FormFactor::HEAD_MOUNTED_DISPLAY,
            FormFactor::HandheldDisplay => xr::FormFactor::HANDHELD_DISPLAY,
        };
        let system = objects
            .instance(instance)?
            .system(form_factor)
            .map_err(code)?;
        objects.system = Some(system);
        Ok(SystemId(system.into_raw()))
    }

    fn system_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<SystemProperties> {
        let objects = self.objects();
        let (instance, system) = objects.system(instance, system)?;
        let properties = instance.system_properties(system).map_err(code)?;
        Ok(SystemProperties {
            system_name: properties.system_name,
            vendor_id: properties.vendor_id,
            max_layer_count: properties.graphics_properties.max_layer_count,
            orientation_tracking: properties.tracking_properties.orientation_tracking,
            position_tracking: properties.tracking_properties.position_tracking,
        })
    }

    fn poll_event(&self, instance: InstanceHandle) -> XrResult<Option<RuntimeEvent>> {
        let objects = self.objects();
        let xr_instance = objects.instance(instance)?;
        let session = objects.session.as_ref();
        let mut buffer = lock(&self.events);
        loop {
            let event = match xr_instance.poll_event(&mut buffer).map_err(code)? {
                Some(event) => event,
                None => return Ok(None),
            };
            let event = match event {
                xr::Event::SessionStateChanged(e) => {
                    let handle = match session {
                        Some((h, s)) if s.as_raw() == e.session() => SessionHandle(*h),
                        _ => SessionHandle::NULL,
                    };
                    RuntimeEvent::SessionStateChanged {
                        session: handle,
                        state: session_state(e.state()),
                        time: Time(e.time().as_nanos()),
                    }
                }
                xr::Event::InstanceLossPending(e) => RuntimeEvent::InstanceLossPending {
                    loss_time: Time(e.loss_time().as_nanos()),
                },
                xr::Event::EventsLost(e) => RuntimeEvent::EventsLost {
                    count: e.lost_event_count(),
                },
                xr::Event::ReferenceSpaceChangePending(e) => {
                    RuntimeEvent::ReferenceSpaceChangePending {
                        session: session.map_or(SessionHandle::NULL, |(h, _)| SessionHandle(*h)),
                        space_type: from_reference_space(e.reference_space_type()),
                    }
                }
                xr::Event::InteractionProfileChanged(_) => RuntimeEvent::InteractionProfileChanged {
                    session: session.map_or(SessionHandle::NULL, |(h, _)| SessionHandle(*h)),
                },
                _ => {
                    debug!("Skipping an unhandled OpenXR event");
                    continue;
                }
            };
            return Ok(Some(event));
        }
    }

    fn enumerate_view_configurations(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<Vec<ViewConfigurationType>> {
        let objects = self.objects();
        let (instance, system) = objects.system(instance, system)?;
        let types = instance
            .enumerate_view_configurations(system)
            .map_err(code)?;
        Ok(types.into_iter().filter_map(from_view_configuration).collect())
    }

    fn view_configuration_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<ViewConfigurationProperties> {
        let objects = self.objects();
        let (instance, system) = objects.system(instance, system)?;
        let properties = instance
            .view_configuration_properties(system, view_configuration(ty))
            .map_err(code)?;
        Ok(ViewConfigurationProperties {
            view_configuration_type: ty,
            fov_mutable: properties.fov_mutable,
        })
    }

    fn enumerate_view_configuration_views(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<ViewConfigurationView>> {
        let objects = self.objects();
        let (instance, system) = objects.system(instance, system)?;
        let views = instance
            .enumerate_view_configuration_views(system, view_configuration(ty))
            .map_err(code)?;
        Ok(views
            .into_iter()
            .map(|v| ViewConfigurationView {
                recommended_size: Size2D::new(
                    v.recommended_image_rect_width as i32,
                    v.recommended_image_rect_height as i32,
                ),
                max_size: Size2D::new(
                    v.max_image_rect_width as i32,
                    v.max_image_rect_height as i32,
                ),
                recommended_sample_count: v.recommended_swapchain_sample_count,
                max_sample_count: v.max_swapchain_sample_count,
            })
            .collect())
    }

    fn enumerate_environment_blend_modes(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<EnvironmentBlendMode>> {
        let objects = self.objects();
        let (instance, system) = objects.system(instance, system)?;
        let modes = instance
            .enumerate_environment_blend_modes(system, view_configuration(ty))
            .map_err(code)?;
        Ok(modes.into_iter().filter_map(from_blend_mode).collect())
    }

    fn create_session(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<SessionHandle> {
        let mut objects = self.objects();
        if objects.session.is_some() {
            return Err(ResultCode::ERROR_CALL_ORDER_INVALID);
        }
        let (session, waiter, stream) = {
            let (instance, system) = objects.system(instance, system)?;
            (self.factory)(instance, system).map_err(code)?
        };
        let handle = objects.alloc();
        objects.session = Some((handle, session));
        *lock(&self.frame_waiter) = Some(waiter);
        *lock(&self.frame_stream) = Some(stream);
        Ok(SessionHandle(handle))
    }

    fn destroy_session(&self, session: SessionHandle) -> XrResult<()> {
        let mut objects = self.objects();
        objects.session(session)?;
        *lock(&self.frame_stream) = None;
        *lock(&self.frame_waiter) = None;
        objects.session = None;
        Ok(())
    }

    fn begin_session(&self, session: SessionHandle, ty: ViewConfigurationType) -> XrResult<()> {
        self.objects()
            .session(session)?
            .begin(view_configuration(ty))
            .map(|_| ())
            .map_err(code)
    }

    fn end_session(&self, session: SessionHandle) -> XrResult<()> {
        self.objects()
            .session(session)?
            .end()
            .map(|_| ())
            .map_err(code)
    }

    fn request_exit_session(&self, session: SessionHandle) -> XrResult<()> {
        self.objects()
            .session(session)?
            .request_exit()
            .map_err(code)
    }

    fn set_performance_level(
        &self,
        session: SessionHandle,
        domain: PerformanceDomain,
        level: PerformanceLevel,
    ) -> XrResult<()> {
        let objects = self.objects();
        let xr_session = objects.session(session)?;
        let instance = match objects.instance {
            Some((_, ref instance)) => instance,
            None => return Err(ResultCode::ERROR_HANDLE_INVALID),
        };
        let ext = instance
            .exts()
            .ext_performance_settings
            .ok_or(ResultCode::ERROR_FUNCTION_UNSUPPORTED)?;
        let result = unsafe {
            (ext.perf_settings_set_performance_level)(
                xr_session.as_raw(),
                perf_domain(domain),
                perf_level(level),
            )
        };
        if result.into_raw() < 0 {
            return Err(code(result));
        }
        Ok(())
    }

    fn create_reference_space(
        &self,
        session: SessionHandle,
        ty: ReferenceSpaceType,
        pose: Posef,
    ) -> XrResult<SpaceHandle> {
        let mut objects = self.objects();
        let ty = match ty {
            ReferenceSpaceType::View => xr::ReferenceSpaceType::VIEW,
            ReferenceSpaceType::Local => xr::ReferenceSpaceType::LOCAL,
            ReferenceSpaceType::Stage => xr::ReferenceSpaceType::STAGE,
        };
        let space = objects
            .session(session)?
            .create_reference_space(ty, to_pose(&pose))
            .map_err(code)?;
        let handle = objects.alloc();
        objects.spaces.insert(handle, space);
        Ok(SpaceHandle(handle))
    }

    fn destroy_space(&self, space: SpaceHandle) -> XrResult<()> {
        self.objects()
            .spaces
            .remove(&space.0)
            .map(|_| ())
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    fn locate_space(
        &self,
        space: SpaceHandle,
        base: SpaceHandle,
        time: Time,
    ) -> XrResult<SpaceLocation> {
        let objects = self.objects();
        let location = objects
            .space(space)?
            .locate(objects.space(base)?, xr::Time::from_nanos(time.0))
            .map_err(code)?;
        Ok(SpaceLocation {
            flags: SpaceLocationFlags::from_bits_truncate(location.location_flags.into_raw()),
            pose: from_pose(location.pose),
        })
    }

    fn locate_views(
        &self,
        session: SessionHandle,
        ty: ViewConfigurationType,
        time: Time,
        space: SpaceHandle,
    ) -> XrResult<LocatedViews> {
        let objects = self.objects();
        let (flags, views) = objects
            .session(session)?
            .locate_views(
                view_configuration(ty),
                xr::Time::from_nanos(time.0),
                objects.space(space)?,
            )
            .map_err(code)?;
        Ok(LocatedViews {
            flags: ViewStateFlags::from_bits_truncate(flags.into_raw()),
            views: views
                .into_iter()
                .map(|v| EyeView {
                    pose: from_pose(v.pose),
                    fov: from_fov(v.fov),
                })
                .collect(),
        })
    }

    fn enumerate_swapchain_formats(&self, session: SessionHandle) -> XrResult<Vec<i64>> {
        let formats = self
            .objects()
            .session(session)?
            .enumerate_swapchain_formats()
            .map_err(code)?;
        Ok(formats.into_iter().map(Into::into).collect())
    }

    fn create_swapchain(
        &self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> XrResult<SwapchainHandle> {
        let format = G::Format::try_from(info.format)
            .map_err(|_| ResultCode::ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED)?;
        let create_info = xr::SwapchainCreateInfo::<G> {
            create_flags: xr::SwapchainCreateFlags::EMPTY,
            usage_flags: xr::SwapchainUsageFlags::from_raw(info.usage_flags.bits()),
            format,
            sample_count: info.sample_count,
            width: info.width,
            height: info.height,
            face_count: info.face_count,
            array_size: info.array_size,
            mip_count: info.mip_count,
        };
        let mut objects = self.objects();
        let swapchain = objects
            .session(session)?
            .create_swapchain(&create_info)
            .map_err(code)?;
        let handle = objects.alloc();
        objects
            .swapchains
            .insert(handle, Arc::new(Mutex::new(swapchain)));
        Ok(SwapchainHandle(handle))
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) -> XrResult<()> {
        self.objects()
            .swapchains
            .remove(&swapchain.0)
            .map(|_| ())
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    fn enumerate_swapchain_images(
        &self,
        swapchain: SwapchainHandle,
    ) -> XrResult<Vec<SwapchainImage>> {
        let swapchain = self.objects().swapchain(swapchain)?;
        let images = lock(&swapchain).enumerate_images().map_err(code)?;
        Ok(images
            .into_iter()
            .map(|image| SwapchainImage(image.into()))
            .collect())
    }

    fn acquire_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<u32> {
        let swapchain = self.objects().swapchain(swapchain)?;
        let index = lock(&swapchain).acquire_image().map_err(code)?;
        Ok(index)
    }

    fn wait_swapchain_image(
        &self,
        swapchain: SwapchainHandle,
        timeout: XrDuration,
    ) -> XrResult<()> {
        let swapchain = self.objects().swapchain(swapchain)?;
        let result = lock(&swapchain).wait_image(xr::Duration::from_nanos(timeout.0));
        result.map_err(code)
    }

    fn release_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<()> {
        let swapchain = self.objects().swapchain(swapchain)?;
        let result = lock(&swapchain).release_image();
        result.map_err(code)
    }

    fn wait_frame(&self, session: SessionHandle) -> XrResult<FrameState> {
        self.objects().session(session)?;
        let mut waiter = lock(&self.frame_waiter);
        let state = waiter
            .as_mut()
            .ok_or(ResultCode::ERROR_SESSION_NOT_RUNNING)?
            .wait()
            .map_err(code)?;
        Ok(FrameState {
            predicted_display_time: Time(state.predicted_display_time.as_nanos()),
            predicted_display_period: XrDuration(state.predicted_display_period.as_nanos()),
            should_render: state.should_render,
        })
    }

    fn begin_frame(&self, session: SessionHandle) -> XrResult<()> {
        self.objects().session(session)?;
        lock(&self.frame_stream)
            .as_mut()
            .ok_or(ResultCode::ERROR_SESSION_NOT_RUNNING)?
            .begin()
            .map_err(code)
    }

    fn end_frame(
        &self,
        session: SessionHandle,
        display_time: Time,
        blend: EnvironmentBlendMode,
        layers: &[CompositionLayer],
    ) -> XrResult<()> {
        let objects = self.objects();
        objects.session(session)?;

        let mut projections = vec![];
        for layer in layers {
            match layer {
                CompositionLayer::Projection { flags, space, views } => {
                    let space = objects.space(*space)?;
                    let mut projection_views = Vec::with_capacity(views.len());
                    for view in views {
                        let swapchain = objects
                            .swapchains
                            .get(&view.sub_image.swapchain.0)
                            .ok_or(ResultCode::ERROR_LAYER_INVALID)?;
                        let raw_swapchain = lock(swapchain).as_raw();
                        let rect = view.sub_image.image_rect;
                        let sub_image = unsafe {
                            xr::SwapchainSubImage::from_raw(xr::sys::SwapchainSubImage {
                                swapchain: raw_swapchain,
                                image_rect: xr::Rect2Di {
                                    offset: xr::Offset2Di {
                                        x: rect.origin.x,
                                        y: rect.origin.y,
                                    },
                                    extent: xr::Extent2Di {
                                        width: rect.size.width,
                                        height: rect.size.height,
                                    },
                                },
                                image_array_index: view.sub_image.image_array_index,
                            })
                        };
                        projection_views.push(
                            xr::CompositionLayerProjectionView::new()
                                .pose(to_pose(&view.pose))
                                .fov(to_fov(&view.fov))
                                .sub_image(sub_image),
                        );
                    }
                    projections.push((flags.bits(), space, projection_views));
                }
                CompositionLayer::Passthrough { .. } => {
                    warn!("Passthrough layers are not submitted by this backend");
                }
            }
        }

        let built: Vec<_> = projections
            .iter()
            .map(|(flags, space, views)| {
                xr::CompositionLayerProjection::new()
                    .layer_flags(xr::CompositionLayerFlags::from_raw(*flags))
                    .space(space)
                    .views(views)
            })
            .collect();
        let bases: Vec<&xr::CompositionLayerBase<G>> = built.iter().map(|l| &**l).collect();

        lock(&self.frame_stream)
            .as_mut()
            .ok_or(ResultCode::ERROR_SESSION_NOT_RUNNING)?
            .end(
                xr::Time::from_nanos(display_time.0),
                blend_mode(blend),
                &bases,
            )
            .map_err(code)
    }

    fn string_to_path(&self, instance: InstanceHandle, path: &str) -> XrResult<PathHandle> {
        let path = self
            .objects()
            .instance(instance)?
            .string_to_path(path)
            .map_err(code)?;
        Ok(PathHandle(path.into_raw()))
    }

    fn create_action_set(
        &self,
        instance: InstanceHandle,
        name: &str,
        localized_name: &str,
        priority: u32,
    ) -> XrResult<ActionSetHandle> {
        let mut objects = self.objects();
        let set = objects
            .instance(instance)?
            .create_action_set(name, localized_name, priority)
            .map_err(code)?;
        let handle = objects.alloc();
        objects.action_sets.insert(handle, set);
        Ok(ActionSetHandle(handle))
    }

    fn destroy_action_set(&self, action_set: ActionSetHandle) -> XrResult<()> {
        self.objects()
            .action_sets
            .remove(&action_set.0)
            .map(|_| ())
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    fn create_action(
        &self,
        action_set: ActionSetHandle,
        name: &str,
        localized_name: &str,
        ty: ActionType,
        subaction_paths: &[PathHandle],
    ) -> XrResult<ActionHandle> {
        let mut objects = self.objects();
        let paths: Vec<xr::Path> = subaction_paths
            .iter()
            .map(|p| xr::Path::from_raw(p.0))
            .collect();
        let action = {
            let set = objects
                .action_sets
                .get(&action_set.0)
                .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
            match ty {
                ActionType::Bool => set
                    .create_action(name, localized_name, &paths)
                    .map(AnyAction::Bool),
                ActionType::Float => set
                    .create_action(name, localized_name, &paths)
                    .map(AnyAction::Float),
                ActionType::Vector2 => set
                    .create_action(name, localized_name, &paths)
                    .map(AnyAction::Vector2),
                ActionType::Pose => set
                    .create_action(name, localized_name, &paths)
                    .map(AnyAction::Pose),
                ActionType::Haptic => set
                    .create_action(name, localized_name, &paths)
                    .map(AnyAction::Haptic),
            }
            .map_err(code)?
        };
        let handle = objects.alloc();
        objects.actions.insert(handle, action);
        Ok(ActionHandle(handle))
    }

    fn destroy_action(&self, action: ActionHandle) -> XrResult<()> {
        self.objects()
            .actions
            .remove(&action.0)
            .map(|_| ())
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    fn suggest_interaction_profile_bindings(
        &self,
        instance: InstanceHandle,
        profile: PathHandle,
        bindings: &[(ActionHandle, PathHandle)],
    ) -> XrResult<()> {
        let objects = self.objects();
        let mut suggested = Vec::with_capacity(bindings.len());
        for (action, path) in bindings {
            let path = xr::Path::from_raw(path.0);
            suggested.push(match objects.action(*action)? {
                AnyAction::Bool(a) => xr::Binding::new(a, path),
                AnyAction::Float(a) => xr::Binding::new(a, path),
                AnyAction::Vector2(a) => xr::Binding::new(a, path),
                AnyAction::Pose(a) => xr::Binding::new(a, path),
                AnyAction::Haptic(a) => xr::Binding::new(a, path),
            });
        }
        objects
            .instance(instance)?
            .suggest_interaction_profile_bindings(xr::Path::from_raw(profile.0), &suggested)
            .map_err(code)
    }

    fn attach_action_sets(
        &self,
        session: SessionHandle,
        action_sets: &[ActionSetHandle],
    ) -> XrResult<()> {
        let objects = self.objects();
        let mut sets = Vec::with_capacity(action_sets.len());
        for set in action_sets {
            sets.push(
                objects
                    .action_sets
                    .get(&set.0)
                    .ok_or(ResultCode::ERROR_HANDLE_INVALID)?,
            );
        }
        objects
            .session(session)?
            .attach_action_sets(&sets)
            .map_err(code)
    }

    fn sync_actions(
        &self,
        session: SessionHandle,
        action_sets: &[ActionSetHandle],
    ) -> XrResult<()> {
        let objects = self.objects();
        let mut active = Vec::with_capacity(action_sets.len());
        for set in action_sets {
            let set = objects
                .action_sets
                .get(&set.0)
                .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
            active.push(xr::ActiveActionSet::new(set));
        }
        objects
            .session(session)?
            .sync_actions(&active)
            .map_err(code)
    }

    fn create_action_space(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
        pose: Posef,
    ) -> XrResult<SpaceHandle> {
        let mut objects = self.objects();
        let space = match objects.action(action)? {
            AnyAction::Pose(a) => a
                .create_space(
                    objects.session(session)?,
                    xr::Path::from_raw(subaction.0),
                    to_pose(&pose),
                )
                .map_err(code)?,
            _ => return Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
        };
        let handle = objects.alloc();
        objects.spaces.insert(handle, space);
        Ok(SpaceHandle(handle))
    }

    fn action_state_bool(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<ActionState<bool>> {
        let objects = self.objects();
        match objects.action(action)? {
            AnyAction::Bool(a) => a
                .state(objects.session(session)?, xr::Path::from_raw(subaction.0))
                .map(|s| from_action_state(s, |v| v))
                .map_err(code),
            _ => Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
        }
    }

    fn action_state_float(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<ActionState<f32>> {
        let objects = self.objects();
        match objects.action(action)? {
            AnyAction::Float(a) => a
                .state(objects.session(session)?, xr::Path::from_raw(subaction.0))
                .map(|s| from_action_state(s, |v| v))
                .map_err(code),
            _ => Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
        }
    }

    fn action_state_vector2(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<ActionState<Vector2f>> {
        let objects = self.objects();
        match objects.action(action)? {
            AnyAction::Vector2(a) => a
                .state(objects.session(session)?, xr::Path::from_raw(subaction.0))
                .map(|s| from_action_state(s, |v| Vector2f { x: v.x, y: v.y }))
                .map_err(code),
            _ => Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
        }
    }

    fn action_state_pose(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<bool> {
        let objects = self.objects();
        match objects.action(action)? {
            AnyAction::Pose(a) => a
                .is_active(objects.session(session)?, xr::Path::from_raw(subaction.0))
                .map_err(code),
            _ => Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
        }
    }

    fn apply_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
        vibration: &HapticVibration,
    ) -> XrResult<()> {
        let objects = self.objects();
        let event = xr::HapticVibration::new()
            .amplitude(vibration.amplitude)
            .frequency(vibration.frequency)
            .duration(xr::Duration::from_nanos(vibration.duration.0));
        match objects.action(action)? {
            AnyAction::Haptic(a) => a
                .apply_feedback(
                    objects.session(session)?,
                    xr::Path::from_raw(subaction.0),
                    &event,
                )
                .map_err(code),
            _ => Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
        }
    }

    fn create_hand_tracker(
        &self,
        session: SessionHandle,
        hand: Hand,
    ) -> XrResult<HandTrackerHandle> {
        let mut objects = self.objects();
        let hand = match hand {
            Hand::Left => xr::Hand::LEFT,
            Hand::Right => xr::Hand::RIGHT,
        };
        let tracker = objects
            .session(session)?
            .create_hand_tracker(hand)
            .map_err(code)?;
        let handle = objects.alloc();
        objects.hand_trackers.insert(handle, tracker);
        Ok(HandTrackerHandle(handle))
    }

    fn destroy_hand_tracker(&self, tracker: HandTrackerHandle) -> XrResult<()> {
        self.objects()
            .hand_trackers
            .remove(&tracker.0)
            .map(|_| ())
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)
    }

    fn locate_hand_joints(
        &self,
        tracker: HandTrackerHandle,
        base: SpaceHandle,
        time: Time,
    ) -> XrResult<Option<Vec<HandJointLocation>>> {
        let objects = self.objects();
        let tracker = objects
            .hand_trackers
            .get(&tracker.0)
            .ok_or(ResultCode::ERROR_HANDLE_INVALID)?;
        let joints = objects
            .space(base)?
            .locate_hand_joints(tracker, xr::Time::from_nanos(time.0))
            .map_err(code)?;
        Ok(joints.map(|joints| {
            joints
                .iter()
                .map(|joint| HandJointLocation {
                    flags: SpaceLocationFlags::from_bits_truncate(
                        joint.location_flags.into_raw(),
                    ),
                    pose: from_pose(joint.pose),
                    radius: joint.radius,
                })
                .collect()
        }))
    }

    fn stop_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<()> {
        let objects = self.objects();
        match objects.action(action)? {
            AnyAction::Haptic(a) => a
                .stop_feedback(objects.session(session)?, xr::Path::from_raw(subaction.0))
                .map_err(code),
            _ => Err(ResultCode::ERROR_ACTION_TYPE_MISMATCH),
        }
    }
}
