/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Picks the view configuration and render options of a session.

use crate::config::DriverConfig;

use xrdriver_api::Error;
use xrdriver_api::RenderOptions;
use xrdriver_api::ViewInfo;

use euclid::Size2D;

use log::info;
use log::warn;

/// Selects a view configuration and derives the render options for it.
///
/// The configuration preference is applied first; the blend mode is then
/// picked among those the chosen configuration supports.
pub fn negotiate(
    config: &DriverConfig,
    infos: &[ViewInfo],
) -> Result<(ViewInfo, RenderOptions), Error> {
    let view = config
        .view_configuration_preference
        .iter()
        .find_map(|ty| infos.iter().find(|info| info.view_configuration == *ty))
        .ok_or(Error::NoViewConfiguration)?;

    let blend_mode = config
        .blend_mode_preference
        .iter()
        .copied()
        .find(|mode| view.blend_modes.contains(mode))
        .ok_or(Error::NoBlendMode)?;

    let scale = config.resolution_scale;
    let width = scaled(view.recommended_size.width, scale, view.max_size.width);
    let height = scaled(view.recommended_size.height, scale, view.max_size.height);

    let sample_count = if config.use_recommended_sample_count {
        view.recommended_sample_count.max(1)
    } else {
        1
    };

    let color_format = config
        .color_formats
        .iter()
        .copied()
        .find(|f| view.swapchain_formats.contains(f))
        .or_else(|| view.swapchain_formats.first().copied())
        .ok_or(Error::NoSwapchainFormat)?;

    let depth_format = if config.depth_swapchain {
        let format = config
            .depth_formats
            .iter()
            .copied()
            .find(|f| view.swapchain_formats.contains(f));
        if format.is_none() {
            warn!("No requested depth format is supported, rendering without depth");
        }
        format
    } else {
        None
    };

    let options = RenderOptions {
        view_configuration: view.view_configuration,
        view_count: view.view_count,
        blend_mode,
        size: Size2D::new(width, height),
        sample_count,
        render_mode: config.render_mode,
        color_format,
        depth_format,
        resolution_scale: scale,
        cpu_level: config.cpu_level,
        gpu_level: config.gpu_level,
    };
    info!(
        "Selected {:?} with {:?} at {}x{}",
        options.view_configuration, options.blend_mode, width, height
    );
    Ok((view.clone(), options))
}

fn scaled(recommended: i32, scale: f32, max: i32) -> i32 {
    let value = (recommended as f32 * scale) as i32;
    let value = if max > 0 { value.min(max) } else { value };
    value.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrdriver_api::EnvironmentBlendMode;
    use xrdriver_api::ViewConfigurationType;

    fn info(ty: ViewConfigurationType, blend_modes: &[EnvironmentBlendMode]) -> ViewInfo {
        ViewInfo {
            view_configuration: ty,
            fov_mutable: true,
            blend_modes: blend_modes.to_vec(),
            recommended_size: Size2D::new(1000, 800),
            max_size: Size2D::new(2000, 1600),
            recommended_sample_count: 4,
            max_sample_count: 8,
            view_count: if ty == ViewConfigurationType::PrimaryStereo {
                2
            } else {
                1
            },
            swapchain_formats: vec![10, 20, 30],
        }
    }

    #[test]
    fn configuration_preference_wins_over_blend_preference() {
        let infos = vec![
            info(
                ViewConfigurationType::PrimaryStereo,
                &[EnvironmentBlendMode::Opaque],
            ),
            info(
                ViewConfigurationType::PrimaryMono,
                &[EnvironmentBlendMode::AlphaBlend, EnvironmentBlendMode::Opaque],
            ),
        ];
        let (view, options) = negotiate(&DriverConfig::default(), &infos).unwrap();
        assert_eq!(view.view_configuration, ViewConfigurationType::PrimaryStereo);
        assert_eq!(options.blend_mode, EnvironmentBlendMode::Opaque);
        assert_eq!(options.view_count, 2);
    }

    #[test]
    fn no_matching_configuration() {
        let infos = vec![info(
            ViewConfigurationType::PrimaryMono,
            &[EnvironmentBlendMode::Opaque],
        )];
        assert_eq!(
            negotiate(&DriverConfig::default(), &infos),
            Err(Error::NoViewConfiguration)
        );
    }

    #[test]
    fn no_matching_blend_mode() {
        let infos = vec![info(
            ViewConfigurationType::PrimaryStereo,
            &[EnvironmentBlendMode::Additive],
        )];
        assert_eq!(
            negotiate(&DriverConfig::default(), &infos),
            Err(Error::NoBlendMode)
        );
    }

    #[test]
    fn size_is_scaled_and_clamped() {
        let infos = vec![info(
            ViewConfigurationType::PrimaryStereo,
            &[EnvironmentBlendMode::Opaque],
        )];
        let config = DriverConfig::default().with_resolution_scale(0.5);
        let (_, options) = negotiate(&config, &infos).unwrap();
        assert_eq!(options.size, Size2D::new(500, 400));

        let config = DriverConfig::default().with_resolution_scale(4.0);
        let (_, options) = negotiate(&config, &infos).unwrap();
        assert_eq!(options.size, Size2D::new(2000, 1600));
    }

    #[test]
    fn preferred_format_or_runtime_default() {
        let infos = vec![info(
            ViewConfigurationType::PrimaryStereo,
            &[EnvironmentBlendMode::Opaque],
        )];
        let config = DriverConfig::default().with_color_formats(&[99, 30]);
        let (_, options) = negotiate(&config, &infos).unwrap();
        assert_eq!(options.color_format, 30);

        let config = DriverConfig::default().with_color_formats(&[99]);
        let (_, options) = negotiate(&config, &infos).unwrap();
        assert_eq!(options.color_format, 10);
    }

    #[test]
    fn identical_capabilities_give_identical_options() {
        let infos = vec![info(
            ViewConfigurationType::PrimaryStereo,
            &[EnvironmentBlendMode::AlphaBlend],
        )];
        let config = DriverConfig::default().with_depth(&[20]);
        let first = negotiate(&config, &infos).unwrap();
        let second = negotiate(&config, &infos).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.1.depth_format, Some(20));
    }
}
