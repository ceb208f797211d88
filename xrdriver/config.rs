/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use xrdriver_api::ApplicationInfo;
use xrdriver_api::EnvironmentBlendMode;
use xrdriver_api::FormFactor;
use xrdriver_api::PerformanceLevel;
use xrdriver_api::RenderMode;
use xrdriver_api::ViewConfigurationType;
use xrdriver_api::XrDuration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::time::Duration;

pub const EXT_PERFORMANCE_SETTINGS: &str = "XR_EXT_performance_settings";
pub const EXT_HAND_TRACKING: &str = "XR_EXT_hand_tracking";

/// Host-provided settings for a `SessionDriver`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DriverConfig {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub form_factor: FormFactor,
    /// Extensions requested in addition to those of plugins and layers.
    pub extensions: Vec<String>,
    /// View configurations in order of preference.
    pub view_configuration_preference: Vec<ViewConfigurationType>,
    /// Blend modes in order of preference.
    pub blend_mode_preference: Vec<EnvironmentBlendMode>,
    pub render_mode: RenderMode,
    pub resolution_scale: f32,
    pub use_recommended_sample_count: bool,
    /// Swapchain formats in order of preference. The runtime's first
    /// format is used when none of these are offered.
    pub color_formats: Vec<i64>,
    pub depth_formats: Vec<i64>,
    pub depth_swapchain: bool,
    pub swapchain_timeout: XrDuration,
    /// How long the event pump sleeps when the queue is empty.
    pub event_poll_interval: Duration,
    /// Render into the stage space instead of the local space.
    pub use_stage_space: bool,
    pub cpu_level: Option<PerformanceLevel>,
    pub gpu_level: Option<PerformanceLevel>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            application_name: "xrdriver".into(),
            application_version: 1,
            engine_name: "xrdriver".into(),
            engine_version: 1,
            form_factor: FormFactor::HeadMountedDisplay,
            extensions: vec![],
            view_configuration_preference: vec![ViewConfigurationType::PrimaryStereo],
            blend_mode_preference: vec![
                EnvironmentBlendMode::AlphaBlend,
                EnvironmentBlendMode::Opaque,
            ],
            render_mode: RenderMode::Stereo,
            resolution_scale: 1.0,
            use_recommended_sample_count: false,
            color_formats: vec![],
            depth_formats: vec![],
            depth_swapchain: false,
            swapchain_timeout: XrDuration::INFINITE,
            event_poll_interval: Duration::from_millis(5),
            use_stage_space: false,
            cpu_level: None,
            gpu_level: None,
        }
    }
}

impl DriverConfig {
    pub fn with_application(mut self, name: &str, version: u32) -> Self {
        self.application_name = name.into();
        self.application_version = version;
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extensions.push(extension.into());
        self
    }

    pub fn with_view_configurations(mut self, preference: &[ViewConfigurationType]) -> Self {
        self.view_configuration_preference = preference.to_vec();
        self
    }

    pub fn with_blend_modes(mut self, preference: &[EnvironmentBlendMode]) -> Self {
        self.blend_mode_preference = preference.to_vec();
        self
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn with_resolution_scale(mut self, scale: f32) -> Self {
        self.resolution_scale = scale;
        self
    }

    pub fn with_color_formats(mut self, formats: &[i64]) -> Self {
        self.color_formats = formats.to_vec();
        self
    }

    pub fn with_depth(mut self, formats: &[i64]) -> Self {
        self.depth_swapchain = true;
        self.depth_formats = formats.to_vec();
        self
    }

    pub fn with_swapchain_timeout(mut self, timeout: XrDuration) -> Self {
        self.swapchain_timeout = timeout;
        self
    }

    pub fn with_performance_levels(
        mut self,
        cpu: Option<PerformanceLevel>,
        gpu: Option<PerformanceLevel>,
    ) -> Self {
        self.cpu_level = cpu;
        self.gpu_level = gpu;
        if !self
            .extensions
            .iter()
            .any(|e| e == EXT_PERFORMANCE_SETTINGS)
        {
            self.extensions.push(EXT_PERFORMANCE_SETTINGS.into());
        }
        self
    }

    pub(crate) fn application_info(&self) -> ApplicationInfo {
        ApplicationInfo {
            application_name: self.application_name.clone(),
            application_version: self.application_version,
            engine_name: self.engine_name.clone(),
            engine_version: self.engine_version,
        }
    }
}
