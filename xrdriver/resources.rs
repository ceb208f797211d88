/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Creation and teardown of the session's spaces and swapchains.

use crate::plugins::PluginSet;

use xrdriver_api::check;
use xrdriver_api::Error;
use xrdriver_api::Posef;
use xrdriver_api::ReferenceSpaceType;
use xrdriver_api::RenderMode;
use xrdriver_api::RenderOptions;
use xrdriver_api::Runtime;
use xrdriver_api::SessionHandle;
use xrdriver_api::SpaceHandle;
use xrdriver_api::SwapchainAllocator;
use xrdriver_api::SwapchainCreateInfo;
use xrdriver_api::SwapchainHandle;
use xrdriver_api::SwapchainImages;
use xrdriver_api::SwapchainInfo;
use xrdriver_api::SwapchainUsage;

use log::debug;
use log::warn;

/// Records a teardown failure without interrupting the teardown.
pub(crate) fn note_failure<T>(
    failures: &mut Vec<Error>,
    result: Result<T, xrdriver_api::ResultCode>,
    context: &str,
) {
    if let Err(e) = check(result, context) {
        warn!("{}", e);
        failures.push(e);
    }
}

/// The reference spaces created with every session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReferenceSpaces {
    pub head: SpaceHandle,
    pub local: SpaceHandle,
    pub stage: SpaceHandle,
}

impl ReferenceSpaces {
    pub fn create(runtime: &dyn Runtime, session: SessionHandle) -> Result<Self, Error> {
        let head = check(
            runtime.create_reference_space(session, ReferenceSpaceType::View, Posef::IDENTITY),
            "xrCreateReferenceSpace(VIEW)",
        )?;
        let local = match check(
            runtime.create_reference_space(session, ReferenceSpaceType::Local, Posef::IDENTITY),
            "xrCreateReferenceSpace(LOCAL)",
        ) {
            Ok(local) => local,
            Err(e) => {
                if let Err(result) = runtime.destroy_space(head) {
                    warn!("Failed to destroy the view space: {}", result);
                }
                return Err(e);
            }
        };
        let stage =
            match runtime.create_reference_space(session, ReferenceSpaceType::Stage, Posef::IDENTITY) {
                Ok(stage) => stage,
                Err(result) => {
                    warn!("No stage space available: {}", result);
                    SpaceHandle::NULL
                }
            };
        Ok(ReferenceSpaces { head, local, stage })
    }

    /// Destroys the spaces in reverse creation order and nulls them.
    pub fn destroy(&mut self, runtime: &dyn Runtime, failures: &mut Vec<Error>) {
        for space in [&mut self.stage, &mut self.local, &mut self.head].iter_mut() {
            let handle = space.take();
            if !handle.is_null() {
                note_failure(failures, runtime.destroy_space(handle), "xrDestroySpace");
            }
        }
    }

    /// The space frames are rendered in.
    pub fn render_space(&self, use_stage: bool) -> SpaceHandle {
        if use_stage && !self.stage.is_null() {
            self.stage
        } else {
            self.local
        }
    }
}

/// Tracks every live swapchain of a session so that teardown can reclaim
/// whatever the layers didn't destroy themselves.
#[derive(Debug, Default)]
pub struct SwapchainRegistry {
    live: Vec<SwapchainHandle>,
}

impl SwapchainRegistry {
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Destroys the remaining swapchains, newest first.
    pub fn destroy_all(&mut self, runtime: &dyn Runtime, failures: &mut Vec<Error>) {
        while let Some(handle) = self.live.pop() {
            note_failure(
                failures,
                runtime.destroy_swapchain(handle),
                "xrDestroySwapchain",
            );
        }
    }
}

/// Builds the create-info of a swapchain for the negotiated options.
pub fn swapchain_create_info(
    options: &RenderOptions,
    usage: SwapchainUsage,
) -> Option<SwapchainCreateInfo> {
    let format = match usage {
        SwapchainUsage::Color => options.color_format,
        SwapchainUsage::Depth => options.depth_format?,
    };
    let view_width = options.size.width.max(1) as u32;
    let (width, array_size) = match options.render_mode {
        RenderMode::SingleEye => (view_width, 1),
        RenderMode::Stereo => (view_width * 2, 1),
        RenderMode::MultiView => (view_width, options.view_count.max(1)),
    };
    Some(SwapchainCreateInfo {
        usage_flags: usage.flags(),
        format,
        sample_count: options.sample_count,
        width,
        height: options.size.height.max(1) as u32,
        face_count: 1,
        array_size,
        mip_count: 1,
    })
}

/// The allocator seen by layers while they create or destroy resources.
pub struct Allocator<'a> {
    pub runtime: &'a dyn Runtime,
    pub session: SessionHandle,
    pub options: &'a RenderOptions,
    pub plugins: &'a mut PluginSet,
    pub registry: &'a mut SwapchainRegistry,
}

impl<'a> SwapchainAllocator for Allocator<'a> {
    fn runtime(&self) -> &dyn Runtime {
        self.runtime
    }

    fn session(&self) -> SessionHandle {
        self.session
    }

    fn render_options(&self) -> &RenderOptions {
        self.options
    }

    fn create_swapchain(&mut self, usage: SwapchainUsage) -> Result<SwapchainInfo, Error> {
        let mut info =
            swapchain_create_info(self.options, usage).ok_or(Error::NoSwapchainFormat)?;
        if usage == SwapchainUsage::Color {
            self.plugins
                .invoke("configure_swapchain", |p| p.configure_swapchain(&mut info));
        }

        let handle = check(
            self.runtime.create_swapchain(self.session, &info),
            "xrCreateSwapchain",
        )?;
        let images = match self.runtime.enumerate_swapchain_images(handle) {
            Ok(images) => images,
            Err(result) => {
                if let Err(destroyed) = self.runtime.destroy_swapchain(handle) {
                    warn!("Failed to destroy swapchain {:?}: {}", handle, destroyed);
                }
                return check(Err(result), "xrEnumerateSwapchainImages");
            }
        };
        self.registry.live.push(handle);
        debug!(
            "Created {:?} swapchain {:?} {}x{}x{} with {} images",
            usage,
            handle,
            info.width,
            info.height,
            info.array_size,
            images.len()
        );
        Ok(SwapchainInfo {
            handle,
            images: SwapchainImages::new(images),
            view_size: self.options.size,
            array_size: info.array_size,
            format: info.format,
            usage,
        })
    }

    fn destroy_swapchain(&mut self, swapchain: &mut SwapchainInfo) {
        let handle = swapchain.handle.take();
        if handle.is_null() {
            return;
        }
        if let Some(pos) = self.registry.live.iter().position(|h| *h == handle) {
            self.registry.live.remove(pos);
            if let Err(result) = self.runtime.destroy_swapchain(handle) {
                warn!("Failed to destroy swapchain {:?}: {}", handle, result);
            }
        }
    }
}
