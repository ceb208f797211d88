/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::error::check;
use crate::error::Error;
use crate::flags::SwapchainUsageFlags;
use crate::handle::SessionHandle;
use crate::handle::SwapchainHandle;
use crate::runtime::Runtime;
use crate::types::RenderOptions;
use crate::types::XrDuration;
use crate::view::Viewport;

use euclid::Size2D;

use log::warn;

use std::fmt;

/// A native image owned by a swapchain (a texture name or a pointer,
/// depending on the graphics API).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SwapchainImage(pub u64);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SwapchainUsage {
    Color,
    Depth,
}

impl SwapchainUsage {
    pub fn flags(self) -> SwapchainUsageFlags {
        match self {
            SwapchainUsage::Color => {
                SwapchainUsageFlags::COLOR_ATTACHMENT | SwapchainUsageFlags::SAMPLED
            }
            SwapchainUsage::Depth => SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwapchainCreateInfo {
    pub usage_flags: SwapchainUsageFlags,
    pub format: i64,
    pub sample_count: u32,
    pub width: u32,
    pub height: u32,
    pub face_count: u32,
    pub array_size: u32,
    pub mip_count: u32,
}

/// The images of a swapchain, enumerated once at creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwapchainImages(Vec<SwapchainImage>);

impl SwapchainImages {
    pub fn new(images: Vec<SwapchainImage>) -> Self {
        SwapchainImages(images)
    }

    pub fn get(&self, index: u32) -> Result<SwapchainImage, Error> {
        self.0
            .get(index as usize)
            .copied()
            .ok_or(Error::ImageIndex {
                index,
                len: self.0.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SwapchainImage> {
        self.0.iter()
    }
}

/// A created swapchain together with what the driver knows about it.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapchainInfo {
    pub handle: SwapchainHandle,
    pub images: SwapchainImages,
    /// Size of one view's region in the swapchain.
    pub view_size: Size2D<i32, Viewport>,
    pub array_size: u32,
    pub format: i64,
    pub usage: SwapchainUsage,
}

impl SwapchainInfo {
    /// Acquires the next image and waits until it can be written to.
    ///
    /// The image is released when the returned guard drops, including
    /// when the wait itself fails.
    pub fn acquire<'a>(
        &self,
        runtime: &'a dyn Runtime,
        timeout: XrDuration,
    ) -> Result<AcquiredImage<'a>, Error> {
        let index = check(
            runtime.acquire_swapchain_image(self.handle),
            "xrAcquireSwapchainImage",
        )?;
        let mut acquired = AcquiredImage {
            runtime,
            swapchain: self.handle,
            index,
            image: SwapchainImage::default(),
            released: false,
        };
        check(
            runtime.wait_swapchain_image(self.handle, timeout),
            "xrWaitSwapchainImage",
        )?;
        acquired.image = self.images.get(index)?;
        Ok(acquired)
    }
}

/// An acquired swapchain image, released on drop.
pub struct AcquiredImage<'a> {
    runtime: &'a dyn Runtime,
    swapchain: SwapchainHandle,
    index: u32,
    image: SwapchainImage,
    released: bool,
}

impl<'a> AcquiredImage<'a> {
    pub fn swapchain(&self) -> SwapchainHandle {
        self.swapchain
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn image(&self) -> SwapchainImage {
        self.image
    }

    /// Releases the image now and reports the outcome.
    pub fn release(mut self) -> Result<(), Error> {
        self.released = true;
        check(
            self.runtime.release_swapchain_image(self.swapchain),
            "xrReleaseSwapchainImage",
        )
    }
}

impl<'a> fmt::Debug for AcquiredImage<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AcquiredImage")
            .field("swapchain", &self.swapchain)
            .field("index", &self.index)
            .field("image", &self.image)
            .finish()
    }
}

impl<'a> Drop for AcquiredImage<'a> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(result) = self.runtime.release_swapchain_image(self.swapchain) {
            warn!(
                "Failed to release image {} of {:?}: {}",
                self.index, self.swapchain, result
            );
        }
    }
}

/// Creates and destroys swapchains on behalf of a layer.
pub trait SwapchainAllocator {
    fn runtime(&self) -> &dyn Runtime;

    fn session(&self) -> SessionHandle;

    fn render_options(&self) -> &RenderOptions;

    /// Creates a swapchain sized for the negotiated render mode.
    fn create_swapchain(&mut self, usage: SwapchainUsage) -> Result<SwapchainInfo, Error>;

    /// Destroys the swapchain and nulls the handle. Destroying a null
    /// or already destroyed swapchain does nothing.
    fn destroy_swapchain(&mut self, swapchain: &mut SwapchainInfo);
}
