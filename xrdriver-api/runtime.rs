/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The runtime protocol, one method per runtime call.
//!
//! Implemented by the session driver's backends. Every call reports
//! failures as the raw `ResultCode`; the driver adds the call context.

use crate::error::ResultCode;
use crate::handle::ActionHandle;
use crate::handle::ActionSetHandle;
use crate::handle::HandTrackerHandle;
use crate::handle::InstanceHandle;
use crate::handle::LayerHandle;
use crate::handle::PathHandle;
use crate::handle::SessionHandle;
use crate::handle::SpaceHandle;
use crate::handle::SwapchainHandle;
use crate::handle::SystemId;
use crate::layer::CompositionLayer;
use crate::swapchain::SwapchainCreateInfo;
use crate::swapchain::SwapchainImage;
use crate::types::ActionState;
use crate::types::ActionType;
use crate::types::ApplicationInfo;
use crate::types::EnvironmentBlendMode;
use crate::types::FormFactor;
use crate::types::FrameState;
use crate::types::Hand;
use crate::types::HandJointLocation;
use crate::types::HapticVibration;
use crate::types::InstanceProperties;
use crate::types::LocatedViews;
use crate::types::PerformanceDomain;
use crate::types::PerformanceLevel;
use crate::types::Posef;
use crate::types::ReferenceSpaceType;
use crate::types::RuntimeEvent;
use crate::types::SpaceLocation;
use crate::types::SystemProperties;
use crate::types::Time;
use crate::types::Vector2f;
use crate::types::ViewConfigurationProperties;
use crate::types::ViewConfigurationType;
use crate::types::ViewConfigurationView;
use crate::types::XrDuration;

pub type XrResult<T> = Result<T, ResultCode>;

pub trait Runtime: Send + Sync {
    // Instance and system

    fn enumerate_extensions(&self) -> XrResult<Vec<String>>;

    fn create_instance(
        &self,
        app: &ApplicationInfo,
        extensions: &[String],
    ) -> XrResult<InstanceHandle>;

    fn destroy_instance(&self, instance: InstanceHandle) -> XrResult<()>;

    fn instance_properties(&self, instance: InstanceHandle) -> XrResult<InstanceProperties>;

    fn system(&self, instance: InstanceHandle, form_factor: FormFactor) -> XrResult<SystemId>;

    fn system_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<SystemProperties>;

    /// Pops the next queued event, or `None` if the queue is empty.
    fn poll_event(&self, instance: InstanceHandle) -> XrResult<Option<RuntimeEvent>>;

    // View configurations

    fn enumerate_view_configurations(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> XrResult<Vec<ViewConfigurationType>>;

    fn view_configuration_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<ViewConfigurationProperties>;

    fn enumerate_view_configuration_views(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<ViewConfigurationView>>;

    fn enumerate_environment_blend_modes(
        &self,
        instance: InstanceHandle,
        system: SystemId,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<EnvironmentBlendMode>>;

    // Session

    /// Creates a session bound to the backend's graphics device.
    fn create_session(&self, instance: InstanceHandle, system: SystemId)
        -> XrResult<SessionHandle>;

    fn destroy_session(&self, session: SessionHandle) -> XrResult<()>;

    fn begin_session(&self, session: SessionHandle, ty: ViewConfigurationType) -> XrResult<()>;

    fn end_session(&self, session: SessionHandle) -> XrResult<()>;

    fn request_exit_session(&self, session: SessionHandle) -> XrResult<()>;

    fn set_performance_level(
        &self,
        _session: SessionHandle,
        _domain: PerformanceDomain,
        _level: PerformanceLevel,
    ) -> XrResult<()> {
        Err(ResultCode::ERROR_FUNCTION_UNSUPPORTED)
    }

    // Spaces

    fn create_reference_space(
        &self,
        session: SessionHandle,
        ty: ReferenceSpaceType,
        pose: Posef,
    ) -> XrResult<SpaceHandle>;

    fn destroy_space(&self, space: SpaceHandle) -> XrResult<()>;

    fn locate_space(&self, space: SpaceHandle, base: SpaceHandle, time: Time)
        -> XrResult<SpaceLocation>;

    fn locate_views(
        &self,
        session: SessionHandle,
        ty: ViewConfigurationType,
        time: Time,
        space: SpaceHandle,
    ) -> XrResult<LocatedViews>;

    // Swapchains

    fn enumerate_swapchain_formats(&self, session: SessionHandle) -> XrResult<Vec<i64>>;

    fn create_swapchain(
        &self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> XrResult<SwapchainHandle>;

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) -> XrResult<()>;

    fn enumerate_swapchain_images(&self, swapchain: SwapchainHandle)
        -> XrResult<Vec<SwapchainImage>>;

    fn acquire_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<u32>;

    fn wait_swapchain_image(&self, swapchain: SwapchainHandle, timeout: XrDuration)
        -> XrResult<()>;

    fn release_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<()>;

    // Frames

    fn wait_frame(&self, session: SessionHandle) -> XrResult<FrameState>;

    fn begin_frame(&self, session: SessionHandle) -> XrResult<()>;

    fn end_frame(
        &self,
        session: SessionHandle,
        display_time: Time,
        blend_mode: EnvironmentBlendMode,
        layers: &[CompositionLayer],
    ) -> XrResult<()>;

    // Actions

    fn string_to_path(&self, instance: InstanceHandle, path: &str) -> XrResult<PathHandle>;

    fn create_action_set(
        &self,
        instance: InstanceHandle,
        name: &str,
        localized_name: &str,
        priority: u32,
    ) -> XrResult<ActionSetHandle>;

    fn destroy_action_set(&self, action_set: ActionSetHandle) -> XrResult<()>;

    fn create_action(
        &self,
        action_set: ActionSetHandle,
        name: &str,
        localized_name: &str,
        ty: ActionType,
        subaction_paths: &[PathHandle],
    ) -> XrResult<ActionHandle>;

    fn destroy_action(&self, action: ActionHandle) -> XrResult<()>;

    fn suggest_interaction_profile_bindings(
        &self,
        instance: InstanceHandle,
        profile: PathHandle,
        bindings: &[(ActionHandle, PathHandle)],
    ) -> XrResult<()>;

    fn attach_action_sets(
        &self,
        session: SessionHandle,
        action_sets: &[ActionSetHandle],
    ) -> XrResult<()>;

    fn sync_actions(&self, session: SessionHandle, action_sets: &[ActionSetHandle])
        -> XrResult<()>;

    fn create_action_space(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
        pose: Posef,
    ) -> XrResult<SpaceHandle>;

    fn action_state_bool(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<ActionState<bool>>;

    fn action_state_float(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<ActionState<f32>>;

    fn action_state_vector2(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<ActionState<Vector2f>>;

    /// Pose actions only report whether they are active.
    fn action_state_pose(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<bool>;

    fn apply_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
        vibration: &HapticVibration,
    ) -> XrResult<()>;

    fn stop_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: PathHandle,
    ) -> XrResult<()>;

    // Hand tracking

    fn create_hand_tracker(
        &self,
        _session: SessionHandle,
        _hand: Hand,
    ) -> XrResult<HandTrackerHandle> {
        Err(ResultCode::ERROR_FEATURE_UNSUPPORTED)
    }

    fn destroy_hand_tracker(&self, _tracker: HandTrackerHandle) -> XrResult<()> {
        Err(ResultCode::ERROR_FEATURE_UNSUPPORTED)
    }

    /// Locates every joint in `base`, or `None` while the hand is not
    /// tracked.
    fn locate_hand_joints(
        &self,
        _tracker: HandTrackerHandle,
        _base: SpaceHandle,
        _time: Time,
    ) -> XrResult<Option<Vec<HandJointLocation>>> {
        Err(ResultCode::ERROR_FEATURE_UNSUPPORTED)
    }

    // Vendor layers

    fn create_passthrough_layer(&self, _session: SessionHandle) -> XrResult<LayerHandle> {
        Err(ResultCode::ERROR_FEATURE_UNSUPPORTED)
    }

    fn destroy_passthrough_layer(&self, _layer: LayerHandle) -> XrResult<()> {
        Err(ResultCode::ERROR_FEATURE_UNSUPPORTED)
    }
}
