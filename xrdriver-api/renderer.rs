/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::error::Error;
use crate::swapchain::SwapchainImage;
use crate::types::Fovf;
use crate::view::Display;
use crate::view::Eye;
use crate::view::Native;
use crate::view::Viewport;

use euclid::Rect;
use euclid::RigidTransform3D;
use euclid::Transform3D;

/// The camera of a single eye for one frame.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: usize,
    pub transform: RigidTransform3D<f32, Eye, Native>,
    pub projection: Transform3D<f32, Eye, Display>,
    pub fov: Fovf,
}

impl Camera {
    /// The world-to-eye transform.
    pub fn view_matrix(&self) -> Transform3D<f32, Native, Eye> {
        self.transform.inverse().to_transform()
    }
}

/// Where a single eye should be drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    pub color: SwapchainImage,
    pub depth: Option<SwapchainImage>,
    pub array_index: u32,
    pub viewport: Rect<i32, Viewport>,
}

/// Draws the scene for one eye. Implemented by the host's graphics code.
pub trait Renderer {
    fn render_view(&mut self, camera: &Camera, target: &RenderTarget) -> Result<(), Error>;
}
