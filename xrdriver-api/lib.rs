/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This crate defines the runtime protocol used by the XR session driver.
//! It is implemented by the backends of the `xrdriver` crate.

mod error;
mod flags;
mod handle;
mod layer;
mod plugin;
mod renderer;
mod runtime;
mod swapchain;
mod types;
mod view;

pub mod util;

pub use error::check;
pub use error::Error;
pub use error::ResultCode;
pub use error::ResultExt;

pub use flags::CompositionLayerFlags;
pub use flags::SpaceLocationFlags;
pub use flags::SwapchainUsageFlags;
pub use flags::ViewStateFlags;

pub use handle::ActionHandle;
pub use handle::ActionSetHandle;
pub use handle::HandTrackerHandle;
pub use handle::InstanceHandle;
pub use handle::LayerHandle;
pub use handle::PathHandle;
pub use handle::SessionHandle;
pub use handle::SpaceHandle;
pub use handle::SwapchainHandle;
pub use handle::SystemId;

pub use layer::CompositionLayer;
pub use layer::Layer;
pub use layer::LayerFrame;
pub use layer::ProjectionView;
pub use layer::SubImage;

pub use plugin::Plugin;
pub use plugin::PluginContext;

pub use renderer::Camera;
pub use renderer::RenderTarget;
pub use renderer::Renderer;

pub use runtime::Runtime;
pub use runtime::XrResult;

pub use swapchain::AcquiredImage;
pub use swapchain::SwapchainAllocator;
pub use swapchain::SwapchainCreateInfo;
pub use swapchain::SwapchainImage;
pub use swapchain::SwapchainImages;
pub use swapchain::SwapchainInfo;
pub use swapchain::SwapchainUsage;

pub use types::ActionState;
pub use types::ActionType;
pub use types::ApplicationInfo;
pub use types::EnvironmentBlendMode;
pub use types::EyeView;
pub use types::FormFactor;
pub use types::Fovf;
pub use types::FrameState;
pub use types::Hand;
pub use types::HandJointLocation;
pub use types::HapticVibration;
pub use types::InstanceProperties;
pub use types::LocatedViews;
pub use types::PerformanceDomain;
pub use types::PerformanceLevel;
pub use types::Posef;
pub use types::Quaternionf;
pub use types::ReferenceSpaceType;
pub use types::RenderMode;
pub use types::RenderOptions;
pub use types::RuntimeEvent;
pub use types::SessionState;
pub use types::SpaceLocation;
pub use types::SystemProperties;
pub use types::Time;
pub use types::Vector2f;
pub use types::Vector3f;
pub use types::ViewConfigurationProperties;
pub use types::ViewConfigurationType;
pub use types::ViewConfigurationView;
pub use types::ViewInfo;
pub use types::XrDuration;
pub use types::HAND_JOINT_COUNT;

pub use view::Display;
pub use view::Eye;
pub use view::Input;
pub use view::Native;
pub use view::Viewer;
pub use view::Viewport;
