/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::flags::SpaceLocationFlags;
use crate::flags::ViewStateFlags;
use crate::handle::SessionHandle;
use crate::view::Viewport;

use euclid::Size2D;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::fmt;

/// A runtime timestamp in nanoseconds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Time(pub i64);

impl Time {
    pub fn as_nanos(self) -> i64 {
        self.0
    }
}

/// A duration in nanoseconds, as taken by the runtime's timeouts.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct XrDuration(pub i64);

impl XrDuration {
    pub const INFINITE: XrDuration = XrDuration(i64::MAX);
    pub const ZERO: XrDuration = XrDuration(0);

    pub fn from_nanos(nanos: i64) -> XrDuration {
        XrDuration(nanos)
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }
}

impl From<std::time::Duration> for XrDuration {
    fn from(d: std::time::Duration) -> XrDuration {
        if d.as_nanos() >= i64::MAX as u128 {
            XrDuration::INFINITE
        } else {
            XrDuration(d.as_nanos() as i64)
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FormFactor {
    HeadMountedDisplay,
    HandheldDisplay,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViewConfigurationType {
    PrimaryMono,
    PrimaryStereo,
    PrimaryQuad,
    SecondaryMonoFirstPersonObserver,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EnvironmentBlendMode {
    Opaque,
    Additive,
    AlphaBlend,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReferenceSpaceType {
    View,
    Local,
    Stage,
}

/// The session lifecycle as reported by the runtime.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionState {
    Unknown,
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

impl SessionState {
    /// Frames may be submitted in these states.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            SessionState::Ready
                | SessionState::Synchronized
                | SessionState::Visible
                | SessionState::Focused
        )
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Unknown
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActionType {
    Bool,
    Float,
    Vector2,
    Pose,
    Haptic,
}

/// How the views of a configuration are laid out in swapchains.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RenderMode {
    /// One swapchain per view.
    SingleEye,
    /// One double-width swapchain holding the views side by side.
    Stereo,
    /// One array swapchain with a layer per view.
    MultiView,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PerformanceDomain {
    Cpu,
    Gpu,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PerformanceLevel {
    PowerSavings,
    SustainedLow,
    SustainedHigh,
    Boost,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector2f {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quaternionf {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quaternionf {
    fn default() -> Self {
        Quaternionf {
            x: 0.,
            y: 0.,
            z: 0.,
            w: 1.,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Posef {
    pub orientation: Quaternionf,
    pub position: Vector3f,
}

impl Posef {
    pub const IDENTITY: Posef = Posef {
        orientation: Quaternionf {
            x: 0.,
            y: 0.,
            z: 0.,
            w: 1.,
        },
        position: Vector3f {
            x: 0.,
            y: 0.,
            z: 0.,
        },
    };
}

/// Half-angles of a view frustum, in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fovf {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplicationInfo {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceProperties {
    pub runtime_name: String,
    pub runtime_version: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemProperties {
    pub system_name: String,
    pub vendor_id: u32,
    pub max_layer_count: u32,
    pub orientation_tracking: bool,
    pub position_tracking: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewConfigurationProperties {
    pub view_configuration_type: ViewConfigurationType,
    pub fov_mutable: bool,
}

/// Per-view image limits of a view configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewConfigurationView {
    pub recommended_size: Size2D<i32, Viewport>,
    pub max_size: Size2D<i32, Viewport>,
    pub recommended_sample_count: u32,
    pub max_sample_count: u32,
}

/// Everything enumerated about one view configuration of a system.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewInfo {
    pub view_configuration: ViewConfigurationType,
    pub fov_mutable: bool,
    pub blend_modes: Vec<EnvironmentBlendMode>,
    pub recommended_size: Size2D<i32, Viewport>,
    pub max_size: Size2D<i32, Viewport>,
    pub recommended_sample_count: u32,
    pub max_sample_count: u32,
    pub view_count: u32,
    pub swapchain_formats: Vec<i64>,
}

/// The negotiated rendering parameters of a session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderOptions {
    pub view_configuration: ViewConfigurationType,
    pub view_count: u32,
    pub blend_mode: EnvironmentBlendMode,
    /// Size of a single view's image.
    pub size: Size2D<i32, Viewport>,
    pub sample_count: u32,
    pub render_mode: RenderMode,
    pub color_format: i64,
    pub depth_format: Option<i64>,
    pub resolution_scale: f32,
    pub cpu_level: Option<PerformanceLevel>,
    pub gpu_level: Option<PerformanceLevel>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameState {
    pub predicted_display_time: Time,
    pub predicted_display_period: XrDuration,
    pub should_render: bool,
}

/// A view located in a reference space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EyeView {
    pub pose: Posef,
    pub fov: Fovf,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocatedViews {
    pub flags: ViewStateFlags,
    pub views: Vec<EyeView>,
}

impl LocatedViews {
    pub fn is_tracked(&self) -> bool {
        self.flags
            .contains(ViewStateFlags::ORIENTATION_VALID | ViewStateFlags::POSITION_VALID)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpaceLocation {
    pub flags: SpaceLocationFlags,
    pub pose: Posef,
}

impl SpaceLocation {
    pub fn is_valid(&self) -> bool {
        self.flags.contains(
            SpaceLocationFlags::ORIENTATION_VALID | SpaceLocationFlags::POSITION_VALID,
        )
    }
}

/// Joints in the default hand joint set, wrist and palm included.
pub const HAND_JOINT_COUNT: usize = 26;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Hand {
    Left,
    Right,
}

/// One tracked hand joint, indexed like the runtime's joint set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandJointLocation {
    pub flags: SpaceLocationFlags,
    pub pose: Posef,
    pub radius: f32,
}

/// The state of an input action after the last sync.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionState<T> {
    pub current_state: T,
    pub changed_since_last_sync: bool,
    pub last_change_time: Time,
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HapticVibration {
    pub duration: XrDuration,
    /// Zero lets the runtime pick a frequency.
    pub frequency: f32,
    pub amplitude: f32,
}

/// An event polled from the runtime's queue.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeEvent {
    SessionStateChanged {
        session: SessionHandle,
        state: SessionState,
        time: Time,
    },
    InstanceLossPending {
        loss_time: Time,
    },
    EventsLost {
        count: u32,
    },
    ReferenceSpaceChangePending {
        session: SessionHandle,
        space_type: ReferenceSpaceType,
    },
    InteractionProfileChanged {
        session: SessionHandle,
    },
}
