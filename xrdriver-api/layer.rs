/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::error::Error;
use crate::flags::CompositionLayerFlags;
use crate::handle::LayerHandle;
use crate::handle::SessionHandle;
use crate::handle::SpaceHandle;
use crate::handle::SwapchainHandle;
use crate::runtime::Runtime;
use crate::swapchain::AcquiredImage;
use crate::swapchain::SwapchainAllocator;
use crate::swapchain::SwapchainInfo;
use crate::types::Fovf;
use crate::types::LocatedViews;
use crate::types::Posef;
use crate::types::RenderOptions;
use crate::types::Time;
use crate::view::Viewport;

use euclid::Rect;

/// The region of a swapchain image a layer samples from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubImage {
    pub swapchain: SwapchainHandle,
    pub image_rect: Rect<i32, Viewport>,
    pub image_array_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionView {
    pub pose: Posef,
    pub fov: Fovf,
    pub sub_image: SubImage,
    pub depth: Option<SubImage>,
}

/// One entry of the list handed to the compositor at the end of a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum CompositionLayer {
    Projection {
        flags: CompositionLayerFlags,
        space: SpaceHandle,
        views: Vec<ProjectionView>,
    },
    /// A layer with no swapchain content of its own.
    Passthrough {
        flags: CompositionLayerFlags,
        layer: LayerHandle,
    },
}

/// What a layer gets to see while rendering one frame.
pub struct LayerFrame<'a> {
    pub runtime: &'a dyn Runtime,
    pub session: SessionHandle,
    pub space: SpaceHandle,
    pub display_time: Time,
    pub views: &'a LocatedViews,
    pub options: &'a RenderOptions,
    /// One acquired image per entry of `Layer::swapchains`, in order.
    pub images: &'a [AcquiredImage<'a>],
}

/// A composition layer producer, driven by the frame loop.
pub trait Layer {
    fn name(&self) -> &str;

    /// Layers are submitted in ascending priority.
    fn priority(&self) -> i32;

    /// Layers that return `false` render without swapchain images.
    fn occupies_swapchain(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        true
    }

    /// Adds the extensions this layer needs.
    fn initialize(&mut self, _extensions: &mut Vec<String>) -> Result<(), Error> {
        Ok(())
    }

    fn create(&mut self, allocator: &mut dyn SwapchainAllocator) -> Result<(), Error>;

    fn destroy(&mut self, allocator: &mut dyn SwapchainAllocator);

    fn on_begin_frame(&mut self, _space: SpaceHandle, _display_time: Time) {}

    fn on_end_frame(&mut self) {}

    fn swapchains(&self) -> &[SwapchainInfo] {
        &[]
    }

    /// Renders the layer, or returns `None` to leave it out of this frame.
    fn render(&mut self, frame: &LayerFrame) -> Result<Option<CompositionLayer>, Error>;
}
