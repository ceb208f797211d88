/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Queries of what the runtime and the system offer.

use xrdriver_api::check;
use xrdriver_api::Error;
use xrdriver_api::InstanceHandle;
use xrdriver_api::Runtime;
use xrdriver_api::SessionHandle;
use xrdriver_api::SystemId;
use xrdriver_api::ViewInfo;

use log::debug;
use log::warn;

/// Keeps the requested extensions the runtime supports, in request order
/// and without duplicates.
pub fn supported_extensions(
    runtime: &dyn Runtime,
    requested: &[String],
) -> Result<Vec<String>, Error> {
    let available = check(
        runtime.enumerate_extensions(),
        "xrEnumerateInstanceExtensionProperties",
    )?;
    let mut enabled: Vec<String> = Vec::with_capacity(requested.len());
    for ext in requested {
        if enabled.contains(ext) {
            continue;
        }
        if available.contains(ext) {
            enabled.push(ext.clone());
        } else {
            warn!("Extension {} is not supported by the runtime", ext);
        }
    }
    Ok(enabled)
}

/// Collects every view configuration of the system, with the session's
/// swapchain formats attached to each.
pub fn view_infos(
    runtime: &dyn Runtime,
    instance: InstanceHandle,
    system: SystemId,
    session: SessionHandle,
) -> Result<Vec<ViewInfo>, Error> {
    let formats = check(
        runtime.enumerate_swapchain_formats(session),
        "xrEnumerateSwapchainFormats",
    )?;
    let types = check(
        runtime.enumerate_view_configurations(instance, system),
        "xrEnumerateViewConfigurations",
    )?;

    let mut infos = Vec::with_capacity(types.len());
    for ty in types {
        let properties = check(
            runtime.view_configuration_properties(instance, system, ty),
            "xrGetViewConfigurationProperties",
        )?;
        let blend_modes = check(
            runtime.enumerate_environment_blend_modes(instance, system, ty),
            "xrEnumerateEnvironmentBlendModes",
        )?;
        let views = check(
            runtime.enumerate_view_configuration_views(instance, system, ty),
            "xrEnumerateViewConfigurationViews",
        )?;
        let first = match views.first() {
            Some(first) => *first,
            None => {
                warn!("View configuration {:?} has no views", ty);
                continue;
            }
        };
        let info = ViewInfo {
            view_configuration: ty,
            fov_mutable: properties.fov_mutable,
            blend_modes,
            recommended_size: first.recommended_size,
            max_size: first.max_size,
            recommended_sample_count: first.recommended_sample_count,
            max_sample_count: first.max_sample_count,
            view_count: views.len() as u32,
            swapchain_formats: formats.clone(),
        };
        debug!("Found view configuration {:?}", info);
        infos.push(info);
    }
    Ok(infos)
}
